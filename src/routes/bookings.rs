use axum::Json;

use crate::api::ApiJson;
use crate::domain::{AvailabilityRequest, AvailabilityResponse};
use crate::error::ApiResult;
use crate::services::availability::available_slots;

pub const NO_SLOTS_MESSAGE: &str = "No slots available for this date";

/// Free time slots for one service on one date.
///
/// POST /api/bookings/availability
pub async fn check_availability(
    ApiJson(req): ApiJson<AvailabilityRequest>,
) -> ApiResult<Json<AvailabilityResponse>> {
    let available = available_slots(&req.time_slots, &req.booked_slots);

    tracing::debug!(
        defined = req.time_slots.len(),
        booked = req.booked_slots.len(),
        available = available.len(),
        "Availability computed"
    );

    let message = available.is_empty().then(|| NO_SLOTS_MESSAGE.to_string());

    Ok(Json(AvailabilityResponse {
        available_slots: available,
        message,
    }))
}
