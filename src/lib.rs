//! AI gateway for the SIDEHustle marketplace.
//!
//! Proxies the marketplace assistant and smart-reply suggestions to an
//! external text-generation endpoint and computes booking availability.

pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod services;

pub use app::{create_app, AppState};
pub use config::Settings;
