use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::booking::{Booking, BookingStatus, Transition};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingEventKind {
    Created,
    Updated,
    Confirmed,
    Started,
    Completed,
    Cancelled,
    DriverAssigned,
    Deleted,
}

impl From<Transition> for BookingEventKind {
    fn from(transition: Transition) -> Self {
        match transition {
            Transition::Confirm => BookingEventKind::Confirmed,
            Transition::Start => BookingEventKind::Started,
            Transition::Complete => BookingEventKind::Completed,
            Transition::Cancel => BookingEventKind::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingEvent {
    pub kind: BookingEventKind,
    pub booking_id: Uuid,
    pub vehicle_id: String,
    pub status: BookingStatus,
    pub at: DateTime<Utc>,
}

impl BookingEvent {
    pub fn new(kind: BookingEventKind, booking: &Booking) -> Self {
        Self {
            kind,
            booking_id: booking.id,
            vehicle_id: booking.vehicle_id.clone(),
            status: booking.status,
            at: Utc::now(),
        }
    }
}
