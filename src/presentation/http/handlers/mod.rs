//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints.

pub mod dm;
pub mod health;
