use axum::extract::DefaultBodyLimit;
use tower_http::limit::RequestBodyLimitLayer;

/// Replaces axum's 2 MiB default with a configured cap, since chat bodies
/// carry base64-encoded images.
pub fn body_limit_layers(max_bytes: usize) -> (DefaultBodyLimit, RequestBodyLimitLayer) {
    (DefaultBodyLimit::disable(), RequestBodyLimitLayer::new(max_bytes))
}
