mod availability;
mod bookings;
mod lifecycle;
mod queries;

pub use queries::{DriverListing, StoreFailurePolicy};

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::Booking;
use crate::models::event::{BookingEvent, BookingEventKind};
use crate::observability::metrics::Metrics;
use crate::store::BookingStore;

type VehicleLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Held for the whole check-and-write of one operation; one guard per vehicle touched.
pub(crate) type WriteScope = Vec<VehicleGuard>;

/// Writer lock on one vehicle. On drop the lock entry is pruned once no
/// other writer holds or waits on it.
pub(crate) struct VehicleGuard {
    vehicle_id: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: VehicleLocks,
}

impl Drop for VehicleGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Clones are only taken under the shard lock, so a count of one
        // means nobody can be waiting on this mutex.
        self.locks
            .remove_if(&self.vehicle_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Booking lifecycle engine.
///
/// All booking state lives in the store. The engine only keeps one writer
/// lock per vehicle id, so an availability check and the write that depends
/// on it are atomic relative to every other writer on the same vehicle.
/// Reads never take these locks.
pub struct BookingEngine {
    store: Arc<dyn BookingStore>,
    vehicle_locks: VehicleLocks,
    events_tx: broadcast::Sender<BookingEvent>,
    metrics: Metrics,
}

impl BookingEngine {
    pub fn new(store: Arc<dyn BookingStore>, metrics: Metrics, event_buffer_size: usize) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size.max(1));

        Self {
            store,
            vehicle_locks: Arc::new(DashMap::new()),
            events_tx,
            metrics,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.events_tx.subscribe()
    }

    pub async fn booking_count(&self) -> Result<usize, AppError> {
        self.store.count().await
    }

    pub(super) async fn load(&self, id: Uuid) -> Result<Booking, AppError> {
        self.store.get(id).await?.ok_or(AppError::NotFound(id))
    }

    fn vehicle_lock(&self, vehicle_id: &str) -> Arc<Mutex<()>> {
        self.vehicle_locks
            .entry(vehicle_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Locks every listed vehicle in sorted order so two writers never wait on each other.
    pub(super) async fn lock_vehicles(&self, vehicle_ids: &[&str]) -> WriteScope {
        let mut ordered: Vec<&str> = vehicle_ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for vehicle_id in ordered {
            let guard = self.vehicle_lock(vehicle_id).lock_owned().await;
            guards.push(VehicleGuard {
                vehicle_id: vehicle_id.to_string(),
                guard: Some(guard),
                locks: self.vehicle_locks.clone(),
            });
        }
        guards
    }

    /// Loads a booking with its vehicle locked, plus `also_lock` if given.
    ///
    /// The booking is re-read under the lock; if it moved to another vehicle
    /// while we waited, the lock is released and taken again.
    pub(super) async fn lock_booking(
        &self,
        id: Uuid,
        also_lock: Option<&str>,
    ) -> Result<(Booking, WriteScope), AppError> {
        loop {
            let seen = self.load(id).await?;

            let mut vehicles = vec![seen.vehicle_id.as_str()];
            vehicles.extend(also_lock);
            let scope = self.lock_vehicles(&vehicles).await;

            let current = self.load(id).await?;
            if current.vehicle_id == seen.vehicle_id {
                return Ok((current, scope));
            }
        }
    }

    pub(super) fn publish(&self, kind: BookingEventKind, booking: &Booking) {
        let _ = self.events_tx.send(BookingEvent::new(kind, booking));
    }

    pub(super) fn record<T>(&self, operation: &str, started: Instant, result: &Result<T, AppError>) {
        self.metrics
            .observe_operation(operation, result.is_ok(), started.elapsed().as_secs_f64());
        if let Err(AppError::Conflict { .. }) = result {
            self.metrics.booking_conflicts_total.inc();
        }
    }
}
