//! Free-slot computation for service bookings.

use std::collections::HashSet;

use crate::domain::TimeSlot;

/// Defined slots whose label is not among the booked labels, in their
/// original order.
pub fn available_slots(defined: &[TimeSlot], booked: &[String]) -> Vec<TimeSlot> {
    let booked: HashSet<&str> = booked.iter().map(String::as_str).collect();

    defined
        .iter()
        .filter(|slot| !booked.contains(slot.label().as_str()))
        .cloned()
        .collect()
}
