//! HTTP surface: health probes, metrics and DM conversation endpoints.

pub mod extractors;
pub mod handlers;
pub mod routes;

pub use routes::create_router;
