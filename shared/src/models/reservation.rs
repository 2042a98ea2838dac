//! Reservation Model

use serde::{Deserialize, Serialize};

use super::UnknownStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<String> for ReservationStatus {
    type Error = UnknownStatus;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(UnknownStatus(s)),
        }
    }
}

/// Reservation entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Reservation {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub party_size: i32,
    /// Seating start, Unix millis
    pub starts_at: i64,
    /// Seating end (exclusive), Unix millis
    pub ends_at: i64,
    pub notes: Option<String>,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub status: ReservationStatus,
    pub created_at: i64,
}

/// Create reservation payload
///
/// `date` is `YYYY-MM-DD` and `time` is `HH:MM`, both in the restaurant's
/// local timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationCreate {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date: String,
    pub time: String,
    pub party_size: i32,
    pub notes: Option<String>,
}

/// Cancel reservation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationCancel {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub reservation: Reservation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Why a slot cannot be booked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotUnavailableReason {
    /// Starts before now + minimum lead time
    Past,
    /// Overlaps an event that closes the dining room
    Event,
    /// Not enough covers left
    Full,
}

/// One bookable start time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Local wall-clock time, `HH:MM`
    pub time: String,
    /// Unix millis
    pub starts_at: i64,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SlotUnavailableReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
    pub party_size: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub date: String,
    pub party_size: i32,
    pub timezone: String,
    pub slots: Vec<TimeSlot>,
}
