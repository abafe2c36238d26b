use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Active,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    /// Live bookings hold their vehicle and take part in conflict checks.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::Active
        )
    }

    pub fn is_terminal(self) -> bool {
        !self.is_live()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "unknown status {s:?}, expected pending/confirmed/active/completed/cancelled"
                ))
            })
    }
}

/// Status-changing operations of the booking lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Confirm,
    Start,
    Complete,
    Cancel,
}

impl Transition {
    pub fn allowed_from(self) -> &'static [BookingStatus] {
        match self {
            Transition::Confirm => &[BookingStatus::Pending],
            Transition::Start => &[BookingStatus::Confirmed],
            Transition::Complete => &[BookingStatus::Active],
            Transition::Cancel => &[
                BookingStatus::Pending,
                BookingStatus::Confirmed,
                BookingStatus::Active,
            ],
        }
    }

    pub fn target(self) -> BookingStatus {
        match self {
            Transition::Confirm => BookingStatus::Confirmed,
            Transition::Start => BookingStatus::Active,
            Transition::Complete => BookingStatus::Completed,
            Transition::Cancel => BookingStatus::Cancelled,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Transition::Confirm => "confirm",
            Transition::Start => "start",
            Transition::Complete => "complete",
            Transition::Cancel => "cancel",
        }
    }

    pub fn apply(self, current: BookingStatus) -> Result<BookingStatus, AppError> {
        if self.allowed_from().contains(&current) {
            Ok(self.target())
        } else {
            Err(AppError::InvalidTransition {
                current,
                attempted: self.target(),
            })
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: String,
    pub vehicle_id: String,
    #[serde(with = "crate::time::wire")]
    pub start_date: NaiveDateTime,
    #[serde(with = "crate::time::wire")]
    pub end_date: NaiveDateTime,
    pub status: BookingStatus,
    pub assigned_driver_id: Option<String>,
    pub assigned_driver_name: Option<String>,
    pub assigned_route_id: Option<String>,
    #[serde(flatten)]
    pub details: TripDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Half-open overlap test: touching endpoints do not overlap.
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start_date < end && self.end_date > start
    }
}

/// Free-text trip details collected by the booking form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TripDetails {
    pub purpose: Option<String>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    pub contact_number: Option<String>,
    pub notes: Option<String>,
}

impl TripDetails {
    /// Overwrites every field that `patch` sets.
    pub fn merge(&mut self, patch: TripDetails) {
        let TripDetails {
            purpose,
            pickup_location,
            dropoff_location,
            contact_number,
            notes,
        } = patch;

        if purpose.is_some() {
            self.purpose = purpose;
        }
        if pickup_location.is_some() {
            self.pickup_location = pickup_location;
        }
        if dropoff_location.is_some() {
            self.dropoff_location = dropoff_location;
        }
        if contact_number.is_some() {
            self.contact_number = contact_number;
        }
        if notes.is_some() {
            self.notes = notes;
        }
    }
}

#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub user_id: String,
    pub vehicle_id: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub details: TripDetails,
}

#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub vehicle_id: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub details: TripDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverAssignment {
    pub driver_id: Option<String>,
    pub driver_name: Option<String>,
    pub route_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub available: bool,
    pub conflict_count: usize,
    pub conflicting_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::{BookingStatus, Transition};
    use crate::error::AppError;

    const TRANSITIONS: [Transition; 4] = [
        Transition::Confirm,
        Transition::Start,
        Transition::Complete,
        Transition::Cancel,
    ];

    #[test]
    fn transition_table_is_exhaustive() {
        use BookingStatus::*;

        let expected = |transition: Transition, from: BookingStatus| -> Option<BookingStatus> {
            match (transition, from) {
                (Transition::Confirm, Pending) => Some(Confirmed),
                (Transition::Start, Confirmed) => Some(Active),
                (Transition::Complete, Active) => Some(Completed),
                (Transition::Cancel, Pending | Confirmed | Active) => Some(Cancelled),
                _ => None,
            }
        };

        for transition in TRANSITIONS {
            for from in BookingStatus::ALL {
                match (transition.apply(from), expected(transition, from)) {
                    (Ok(to), Some(want)) => assert_eq!(to, want),
                    (Err(AppError::InvalidTransition { current, attempted }), None) => {
                        assert_eq!(current, from);
                        assert_eq!(attempted, transition.target());
                    }
                    (got, want) => panic!("{transition:?} from {from}: got {got:?}, want {want:?}"),
                }
            }
        }
    }

    #[test]
    fn terminal_statuses_allow_nothing() {
        for from in [BookingStatus::Completed, BookingStatus::Cancelled] {
            assert!(from.is_terminal());
            assert!(TRANSITIONS.iter().all(|t| t.apply(from).is_err()));
        }
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Confirmed".parse::<BookingStatus>().unwrap(), BookingStatus::Confirmed);
        assert!("archived".parse::<BookingStatus>().is_err());
    }
}
