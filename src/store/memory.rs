use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus};
use crate::store::{sort_by_start, BookingStore};

type VehicleIndex = DashMap<String, HashSet<Uuid>>;

/// Process-local store with per-vehicle indexes of booking ids: one over
/// every booking, one over live bookings only.
#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: DashMap<Uuid, Booking>,
    by_vehicle: VehicleIndex,
    live_by_vehicle: VehicleIndex,
}

fn index(map: &VehicleIndex, vehicle_id: &str, id: Uuid) {
    map.entry(vehicle_id.to_string()).or_default().insert(id);
}

fn unindex(map: &VehicleIndex, vehicle_id: &str, id: Uuid) {
    if let Some(mut ids) = map.get_mut(vehicle_id) {
        ids.remove(&id);
    }
    map.remove_if(vehicle_id, |_, ids| ids.is_empty());
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn place(&self, booking: &Booking) {
        index(&self.by_vehicle, &booking.vehicle_id, booking.id);
        if booking.status.is_live() {
            index(&self.live_by_vehicle, &booking.vehicle_id, booking.id);
        }
    }

    /// Drops index entries `previous` holds that `current` no longer needs.
    fn retire(&self, previous: &Booking, current: Option<&Booking>) {
        let moved = current.is_none_or(|c| c.vehicle_id != previous.vehicle_id);
        if moved {
            unindex(&self.by_vehicle, &previous.vehicle_id, previous.id);
        }

        let still_live = !moved && current.is_some_and(|c| c.status.is_live());
        if previous.status.is_live() && !still_live {
            unindex(&self.live_by_vehicle, &previous.vehicle_id, previous.id);
        }
    }

    fn indexed(&self, map: &VehicleIndex, vehicle_id: &str) -> Vec<Booking> {
        let ids: Vec<Uuid> = match map.get(vehicle_id) {
            Some(ids) => ids.iter().copied().collect(),
            None => return Vec::new(),
        };

        // The index entry may briefly point at a record mid-move between vehicles.
        let mut bookings: Vec<Booking> = ids
            .iter()
            .filter_map(|id| self.bookings.get(id).map(|entry| entry.value().clone()))
            .filter(|b| b.vehicle_id == vehicle_id)
            .collect();
        sort_by_start(&mut bookings);
        bookings
    }

    fn collect<F>(&self, predicate: F) -> Vec<Booking>
    where
        F: Fn(&Booking) -> bool,
    {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        sort_by_start(&mut bookings);
        bookings
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn get(&self, id: Uuid) -> Result<Option<Booking>, AppError> {
        Ok(self.bookings.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_all(&self) -> Result<Vec<Booking>, AppError> {
        Ok(self.collect(|_| true))
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Booking>, AppError> {
        Ok(self.collect(|b| b.user_id == user_id))
    }

    async fn list_by_vehicle(&self, vehicle_id: &str) -> Result<Vec<Booking>, AppError> {
        Ok(self.indexed(&self.by_vehicle, vehicle_id))
    }

    async fn list_live_by_vehicle(&self, vehicle_id: &str) -> Result<Vec<Booking>, AppError> {
        let mut bookings = self.indexed(&self.live_by_vehicle, vehicle_id);
        bookings.retain(|b| b.status.is_live());
        Ok(bookings)
    }

    async fn list_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>, AppError> {
        Ok(self.collect(|b| b.status == status))
    }

    async fn list_by_driver(&self, driver_id: &str) -> Result<Vec<Booking>, AppError> {
        Ok(self.collect(|b| b.assigned_driver_id.as_deref() == Some(driver_id)))
    }

    async fn insert(&self, mut booking: Booking) -> Result<Booking, AppError> {
        if self.bookings.contains_key(&booking.id) {
            return Err(AppError::Store(format!("booking {} already exists", booking.id)));
        }

        let now = Utc::now();
        booking.created_at = now;
        booking.updated_at = now;

        self.place(&booking);
        self.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn update(&self, mut booking: Booking) -> Result<Booking, AppError> {
        let previous = match self.bookings.get(&booking.id) {
            Some(existing) => existing.value().clone(),
            None => return Err(AppError::NotFound(booking.id)),
        };

        // Index the new placement before the swap so readers never miss the record.
        self.place(&booking);

        {
            let mut entry = self
                .bookings
                .get_mut(&booking.id)
                .ok_or(AppError::NotFound(booking.id))?;
            booking.created_at = entry.created_at;
            booking.updated_at = Utc::now();
            *entry = booking.clone();
        }

        self.retire(&previous, Some(&booking));
        Ok(booking)
    }

    async fn delete(&self, id: Uuid) -> Result<Booking, AppError> {
        let (_, booking) = self.bookings.remove(&id).ok_or(AppError::NotFound(id))?;
        self.retire(&booking, None);
        Ok(booking)
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.bookings.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::InMemoryBookingStore;
    use crate::error::AppError;
    use crate::models::booking::{Booking, BookingStatus, TripDetails};
    use crate::store::BookingStore;

    fn booking(vehicle: &str, start_offset_h: i64) -> Booking {
        let start = crate::time::now() + Duration::hours(start_offset_h);
        Booking {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            vehicle_id: vehicle.to_string(),
            start_date: start,
            end_date: start + Duration::hours(1),
            status: BookingStatus::Pending,
            assigned_driver_id: None,
            assigned_driver_name: None,
            assigned_route_id: None,
            details: TripDetails::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn vehicle_listing_follows_vehicle_changes() {
        let store = InMemoryBookingStore::new();
        let stored = store.insert(booking("van-1", 2)).await.unwrap();

        let mut moved = stored.clone();
        moved.vehicle_id = "van-2".to_string();
        store.update(moved).await.unwrap();

        assert!(store.list_by_vehicle("van-1").await.unwrap().is_empty());
        let on_van_2 = store.list_by_vehicle("van-2").await.unwrap();
        assert_eq!(on_van_2.len(), 1);
        assert_eq!(on_van_2[0].id, stored.id);
        assert_eq!(on_van_2[0].created_at, stored.created_at);
    }

    #[tokio::test]
    async fn listings_are_ordered_by_start() {
        let store = InMemoryBookingStore::new();
        let late = store.insert(booking("van-1", 5)).await.unwrap();
        let early = store.insert(booking("van-1", 1)).await.unwrap();

        let ids: Vec<Uuid> = store
            .list_by_vehicle("van-1")
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_record_are_not_found() {
        let store = InMemoryBookingStore::new();
        let ghost = booking("van-1", 1);

        assert!(matches!(store.update(ghost.clone()).await, Err(AppError::NotFound(id)) if id == ghost.id));
        assert!(matches!(store.delete(ghost.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_drops_the_vehicle_index_entry() {
        let store = InMemoryBookingStore::new();
        let stored = store.insert(booking("van-1", 1)).await.unwrap();

        store.delete(stored.id).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.list_by_vehicle("van-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn live_index_drops_terminal_bookings() {
        let store = InMemoryBookingStore::new();
        let kept = store.insert(booking("van-1", 1)).await.unwrap();
        let finished = store.insert(booking("van-1", 3)).await.unwrap();

        let mut cancelled = finished.clone();
        cancelled.status = BookingStatus::Cancelled;
        store.update(cancelled).await.unwrap();

        let live: Vec<Uuid> = store
            .list_live_by_vehicle("van-1")
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(live, vec![kept.id]);
        assert_eq!(store.list_by_vehicle("van-1").await.unwrap().len(), 2);
        assert!(!store.live_by_vehicle.get("van-1").unwrap().contains(&finished.id));
    }

    #[tokio::test]
    async fn live_index_follows_vehicle_moves_and_deletes() {
        let store = InMemoryBookingStore::new();
        let stored = store.insert(booking("van-1", 1)).await.unwrap();

        let mut moved = stored.clone();
        moved.vehicle_id = "van-2".to_string();
        store.update(moved).await.unwrap();

        assert!(store.list_live_by_vehicle("van-1").await.unwrap().is_empty());
        assert_eq!(store.list_live_by_vehicle("van-2").await.unwrap().len(), 1);

        store.delete(stored.id).await.unwrap();
        assert!(store.by_vehicle.is_empty());
        assert!(store.live_by_vehicle.is_empty());
    }

    #[tokio::test]
    async fn driver_listing_matches_assigned_driver_only() {
        let store = InMemoryBookingStore::new();
        let mut assigned = booking("van-1", 1);
        assigned.assigned_driver_id = Some("driver-7".to_string());
        store.insert(assigned.clone()).await.unwrap();
        store.insert(booking("van-1", 3)).await.unwrap();

        let listed = store.list_by_driver("driver-7").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, assigned.id);
    }
}
