//! # Domain Layer
//!
//! Entities, value objects and the in-memory registries of the real-time
//! core. Independent of the transport and storage layers.
//!
//! - **entities**: durable objects and their repository traits
//! - **value_objects**: connection and room identifiers
//! - **services**: room membership, typing, presence and voice registries

pub mod entities;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use value_objects::*;
