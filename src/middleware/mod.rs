//! Tower middleware wired into the router in `app.rs`

pub mod limits;
pub mod request_id;

pub use limits::body_limit_layers;
pub use request_id::{request_id_layer, RequestIdExt};
