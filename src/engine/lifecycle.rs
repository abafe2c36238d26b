use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use super::BookingEngine;
use crate::error::AppError;
use crate::models::booking::{Booking, Transition};

impl BookingEngine {
    pub async fn confirm(&self, id: Uuid) -> Result<Booking, AppError> {
        self.transition(id, Transition::Confirm).await
    }

    pub async fn start(&self, id: Uuid) -> Result<Booking, AppError> {
        self.transition(id, Transition::Start).await
    }

    pub async fn complete(&self, id: Uuid) -> Result<Booking, AppError> {
        self.transition(id, Transition::Complete).await
    }

    pub async fn cancel(&self, id: Uuid) -> Result<Booking, AppError> {
        self.transition(id, Transition::Cancel).await
    }

    /// Status changes never re-run conflict detection: a live booking's
    /// interval was validated when it was written.
    pub async fn transition(&self, id: Uuid, transition: Transition) -> Result<Booking, AppError> {
        let started = Instant::now();
        let result = self.transition_inner(id, transition).await;
        self.record(transition.name(), started, &result);
        result
    }

    async fn transition_inner(&self, id: Uuid, transition: Transition) -> Result<Booking, AppError> {
        let (mut booking, _scope) = self.lock_booking(id, None).await?;

        let previous = booking.status;
        booking.status = match transition.apply(previous) {
            Ok(next) => next,
            Err(err) => {
                warn!(
                    booking_id = %id,
                    status = %previous,
                    transition = transition.name(),
                    "transition refused"
                );
                return Err(err);
            }
        };

        let stored = self.store.update(booking).await?;
        self.publish(transition.into(), &stored);

        info!(
            booking_id = %stored.id,
            vehicle_id = %stored.vehicle_id,
            from = %previous,
            to = %stored.status,
            "booking status changed"
        );

        Ok(stored)
    }
}
