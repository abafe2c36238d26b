use chrono::NaiveDateTime;
use tracing::debug;
use uuid::Uuid;

use super::bookings::{require_id, validate_window};
use super::BookingEngine;
use crate::error::AppError;
use crate::models::booking::{Availability, Booking};

impl BookingEngine {
    /// Live bookings of `vehicle_id` whose interval overlaps `[start, end)`.
    pub async fn find_conflicts(
        &self,
        vehicle_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Booking>, AppError> {
        self.conflicts_excluding(vehicle_id, start, end, None).await
    }

    pub async fn is_available(
        &self,
        vehicle_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<bool, AppError> {
        Ok(self.find_conflicts(vehicle_id, start, end).await?.is_empty())
    }

    /// Validating entry point for callers outside the engine.
    pub async fn check_availability(
        &self,
        vehicle_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Availability, AppError> {
        let vehicle_id = require_id("vehicleId", vehicle_id)?;
        validate_window(start, end, true)?;

        let conflicts = self.find_conflicts(vehicle_id, start, end).await?;
        let availability = Availability {
            available: conflicts.is_empty(),
            conflict_count: conflicts.len(),
            conflicting_ids: conflicts.iter().map(|b| b.id).collect(),
        };

        let result = if availability.available { "available" } else { "unavailable" };
        self.metrics
            .availability_checks_total
            .with_label_values(&[result])
            .inc();
        debug!(
            vehicle_id,
            %start,
            %end,
            conflicts = availability.conflict_count,
            "availability checked"
        );

        Ok(availability)
    }

    pub(super) async fn conflicts_excluding(
        &self,
        vehicle_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Booking>, AppError> {
        let candidates = self.store.list_live_by_vehicle(vehicle_id).await?;

        Ok(candidates
            .into_iter()
            .filter(|b| Some(b.id) != exclude)
            .filter(|b| b.status.is_live() && b.overlaps(start, end))
            .collect())
    }

    /// Fails with `Conflict` unless `[start, end)` is free on `vehicle_id`.
    /// Callers hold the vehicle's write lock.
    pub(super) async fn ensure_available(
        &self,
        vehicle_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude: Option<Uuid>,
    ) -> Result<(), AppError> {
        let conflicts = self
            .conflicts_excluding(vehicle_id, start, end, exclude)
            .await?;
        if conflicts.is_empty() {
            return Ok(());
        }

        Err(AppError::Conflict {
            count: conflicts.len(),
            ids: conflicts.into_iter().map(|b| b.id).collect(),
        })
    }
}
