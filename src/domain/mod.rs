//! Domain types and DTOs
//!
//! Everything here lives for one request; nothing is persisted.

pub mod ai;
pub mod bookings;

pub use bookings::*;

// AI types are accessed via crate::domain::ai:: to avoid namespace pollution
