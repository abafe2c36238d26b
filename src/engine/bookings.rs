use std::time::Instant;

use chrono::{NaiveDateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::BookingEngine;
use crate::error::AppError;
use crate::models::booking::{
    Booking, BookingDraft, BookingPatch, BookingStatus, DriverAssignment,
};
use crate::models::event::BookingEventKind;

/// Returns the id with surrounding whitespace removed; ids are stored trimmed.
pub(super) fn require_id<'a>(field: &str, value: &'a str) -> Result<&'a str, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed)
}

/// `start < end`, and with `reject_past` also `start >= now`.
pub(super) fn validate_window(
    start: NaiveDateTime,
    end: NaiveDateTime,
    reject_past: bool,
) -> Result<(), AppError> {
    if start >= end {
        return Err(AppError::Validation(format!(
            "start date {start} must be before end date {end}"
        )));
    }
    if reject_past && start < crate::time::now() {
        return Err(AppError::Validation(format!(
            "start date {start} cannot be in the past"
        )));
    }
    Ok(())
}

impl BookingEngine {
    pub async fn create(&self, draft: BookingDraft) -> Result<Booking, AppError> {
        let started = Instant::now();
        let result = self.create_inner(draft).await;
        self.record("create", started, &result);
        result
    }

    async fn create_inner(&self, draft: BookingDraft) -> Result<Booking, AppError> {
        let user_id = require_id("userId", &draft.user_id)?.to_string();
        let vehicle_id = require_id("vehicleId", &draft.vehicle_id)?.to_string();
        validate_window(draft.start_date, draft.end_date, true)?;

        let _scope = self.lock_vehicles(&[vehicle_id.as_str()]).await;

        if let Err(err) = self
            .ensure_available(&vehicle_id, draft.start_date, draft.end_date, None)
            .await
        {
            warn!(vehicle_id = %vehicle_id, error = %err, "booking rejected");
            return Err(err);
        }

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            user_id,
            vehicle_id,
            start_date: draft.start_date,
            end_date: draft.end_date,
            status: BookingStatus::Pending,
            assigned_driver_id: None,
            assigned_driver_name: None,
            assigned_route_id: None,
            details: draft.details,
            created_at: now,
            updated_at: now,
        };

        let stored = self.store.insert(booking).await?;
        self.publish(BookingEventKind::Created, &stored);

        info!(
            booking_id = %stored.id,
            vehicle_id = %stored.vehicle_id,
            start = %stored.start_date,
            end = %stored.end_date,
            "booking created"
        );

        Ok(stored)
    }

    pub async fn update(&self, id: Uuid, patch: BookingPatch) -> Result<Booking, AppError> {
        let started = Instant::now();
        let result = self.update_inner(id, patch).await;
        self.record("update", started, &result);
        result
    }

    async fn update_inner(&self, id: Uuid, patch: BookingPatch) -> Result<Booking, AppError> {
        let vehicle_id = match &patch.vehicle_id {
            Some(raw) => Some(require_id("vehicleId", raw)?.to_string()),
            None => None,
        };

        let (existing, _scope) = self.lock_booking(id, vehicle_id.as_deref()).await?;

        let mut updated = existing.clone();
        if let Some(vehicle_id) = vehicle_id {
            updated.vehicle_id = vehicle_id;
        }
        if let Some(start) = patch.start_date {
            updated.start_date = start;
        }
        if let Some(end) = patch.end_date {
            updated.end_date = end;
        }
        updated.details.merge(patch.details);

        let placement_changed = updated.vehicle_id != existing.vehicle_id
            || updated.start_date != existing.start_date
            || updated.end_date != existing.end_date;

        if placement_changed {
            // A running booking may extend its end without its past start failing validation.
            let start_moved = updated.start_date != existing.start_date;
            validate_window(updated.start_date, updated.end_date, start_moved)?;
            self.ensure_available(
                &updated.vehicle_id,
                updated.start_date,
                updated.end_date,
                Some(id),
            )
            .await?;
        }

        let stored = self.store.update(updated).await?;
        self.publish(BookingEventKind::Updated, &stored);

        info!(
            booking_id = %stored.id,
            vehicle_id = %stored.vehicle_id,
            revalidated = placement_changed,
            "booking updated"
        );

        Ok(stored)
    }

    pub async fn assign_driver(
        &self,
        id: Uuid,
        assignment: DriverAssignment,
    ) -> Result<Booking, AppError> {
        let started = Instant::now();
        let result = self.assign_driver_inner(id, assignment).await;
        self.record("assign_driver", started, &result);
        result
    }

    async fn assign_driver_inner(
        &self,
        id: Uuid,
        assignment: DriverAssignment,
    ) -> Result<Booking, AppError> {
        let (mut booking, _scope) = self.lock_booking(id, None).await?;

        booking.assigned_driver_id = assignment.driver_id;
        booking.assigned_driver_name = assignment.driver_name;
        booking.assigned_route_id = assignment.route_id;

        let stored = self.store.update(booking).await?;
        self.publish(BookingEventKind::DriverAssigned, &stored);

        info!(
            booking_id = %stored.id,
            driver_id = stored.assigned_driver_id.as_deref().unwrap_or_default(),
            route_id = stored.assigned_route_id.as_deref().unwrap_or_default(),
            "driver assigned"
        );

        Ok(stored)
    }

    pub async fn delete(&self, id: Uuid) -> Result<Booking, AppError> {
        let started = Instant::now();
        let result = self.delete_inner(id).await;
        self.record("delete", started, &result);
        result
    }

    async fn delete_inner(&self, id: Uuid) -> Result<Booking, AppError> {
        let (_, _scope) = self.lock_booking(id, None).await?;

        let removed = self.store.delete(id).await?;
        self.publish(BookingEventKind::Deleted, &removed);

        info!(booking_id = %id, vehicle_id = %removed.vehicle_id, "booking deleted");
        Ok(removed)
    }
}
