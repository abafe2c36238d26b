pub mod memory;

pub use memory::InMemoryBookingStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus};

/// Keyed booking collection the engine reads and writes through.
///
/// Implementations own `created_at`/`updated_at`: `insert` stamps both,
/// `update` refreshes `updated_at`. Listings come back ordered by start date.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Booking>, AppError>;

    async fn list_all(&self) -> Result<Vec<Booking>, AppError>;

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Booking>, AppError>;

    async fn list_by_vehicle(&self, vehicle_id: &str) -> Result<Vec<Booking>, AppError>;

    /// Pending, confirmed and active bookings of one vehicle; the conflict
    /// scan reads only these.
    async fn list_live_by_vehicle(&self, vehicle_id: &str) -> Result<Vec<Booking>, AppError> {
        let mut bookings = self.list_by_vehicle(vehicle_id).await?;
        bookings.retain(|b| b.status.is_live());
        Ok(bookings)
    }

    async fn list_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>, AppError>;

    async fn list_by_driver(&self, driver_id: &str) -> Result<Vec<Booking>, AppError>;

    async fn insert(&self, booking: Booking) -> Result<Booking, AppError>;

    /// Replaces the stored record with the same id. `NotFound` if absent.
    async fn update(&self, booking: Booking) -> Result<Booking, AppError>;

    /// Removes and returns the record. `NotFound` if absent.
    async fn delete(&self, id: Uuid) -> Result<Booking, AppError>;

    async fn count(&self) -> Result<usize, AppError>;
}

pub(crate) fn sort_by_start(bookings: &mut [Booking]) {
    bookings.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
}
