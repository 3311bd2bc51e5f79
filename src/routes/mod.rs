pub mod ai;
pub mod bookings;
pub mod health;

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // AI assistant
        .route("/api/ai_chat", post(ai::ai_chat))
        .route("/api/smart_reply", post(ai::smart_reply))
        // Bookings
        .route("/api/bookings/availability", post(bookings::check_availability))
}
