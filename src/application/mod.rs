//! Application Layer
//!
//! Services that coordinate the persistence collaborator on behalf of the
//! gateway and the HTTP surface, plus the DTOs they share.

pub mod dto;
pub mod services;
