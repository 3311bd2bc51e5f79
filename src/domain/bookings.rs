//! Booking availability types

use serde::{Deserialize, Serialize};

/// A bookable window offered by a service, e.g. `09:00` to `10:00`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start_time: String,
    pub end_time: String,
}

impl TimeSlot {
    pub fn new(start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }

    /// Label stored on bookings, `"<start> - <end>"`.
    pub fn label(&self) -> String {
        format!("{} - {}", self.start_time, self.end_time)
    }
}

/// Request body for `POST /api/bookings/availability`.
///
/// `booked_slots` are the labels of approved bookings for the chosen date,
/// as loaded by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    #[serde(default)]
    pub time_slots: Vec<TimeSlot>,
    #[serde(default)]
    pub booked_slots: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub available_slots: Vec<TimeSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
