//! Infrastructure Layer
//!
//! - In-memory persistence collaborator implementing the repository traits
//! - Built-in link previewer
//! - Prometheus metrics

pub mod link_preview;
pub mod memory;
pub mod metrics;
