//! Request extraction shared by the API handlers

pub mod json;

pub use json::ApiJson;
