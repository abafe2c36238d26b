use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use super::BookingEngine;
use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus};

/// What a read does when the store fails underneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailurePolicy {
    Propagate,
    /// Answer with an empty listing and a note. Read paths only.
    DegradeToEmpty,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverListing {
    pub bookings: Vec<Booking>,
    pub note: Option<String>,
}

impl BookingEngine {
    pub async fn get(&self, id: Uuid) -> Result<Option<Booking>, AppError> {
        self.store.get(id).await
    }

    pub async fn list_all(&self) -> Result<Vec<Booking>, AppError> {
        self.store.list_all().await
    }

    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<Booking>, AppError> {
        self.store.list_by_user(user_id).await
    }

    pub async fn list_by_vehicle(&self, vehicle_id: &str) -> Result<Vec<Booking>, AppError> {
        self.store.list_by_vehicle(vehicle_id).await
    }

    pub async fn list_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>, AppError> {
        self.store.list_by_status(status).await
    }

    pub async fn list_by_driver(
        &self,
        driver_id: &str,
        policy: StoreFailurePolicy,
    ) -> Result<DriverListing, AppError> {
        match self.store.list_by_driver(driver_id).await {
            Ok(bookings) => Ok(DriverListing {
                bookings,
                note: None,
            }),
            Err(err) if policy == StoreFailurePolicy::DegradeToEmpty => {
                warn!(driver_id, error = %err, "driver listing degraded to empty");
                Ok(DriverListing {
                    bookings: Vec::new(),
                    note: Some("No bookings found".to_string()),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Live bookings of the vehicle that have not ended yet.
    pub async fn list_active_by_vehicle(&self, vehicle_id: &str) -> Result<Vec<Booking>, AppError> {
        let now = crate::time::now();
        let bookings = self.store.list_by_vehicle(vehicle_id).await?;

        Ok(bookings
            .into_iter()
            .filter(|b| b.status.is_live() && b.end_date > now)
            .collect())
    }

    /// Pending or confirmed bookings of the user starting now or later.
    pub async fn list_upcoming_by_user(&self, user_id: &str) -> Result<Vec<Booking>, AppError> {
        let now = crate::time::now();
        let bookings = self.store.list_by_user(user_id).await?;

        Ok(bookings
            .into_iter()
            .filter(|b| matches!(b.status, BookingStatus::Pending | BookingStatus::Confirmed))
            .filter(|b| b.start_date >= now)
            .collect())
    }
}
