//! # Huddle
//!
//! Real-time chat gateway:
//! - WebSocket gateway with channel rooms, typing, presence and DMs
//! - Voice room coordination for full-mesh peer-to-peer calls
//! - A separate media-signaling broker for peer-id discovery
//! - A client-side call-state manager
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: entities, repository traits and the real-time registries
//! - **Application Layer**: message, DM and auth services and DTOs
//! - **Infrastructure Layer**: in-memory store, link previews, metrics
//! - **Presentation Layer**: HTTP handlers, WebSocket gateway, signaling broker
//!
//! ## Module Structure
//!
//! ```text
//! huddle/
//! +-- config/         Configuration management
//! +-- domain/         Entities, value objects, registries
//! +-- application/    Services and DTOs
//! +-- infrastructure/ In-memory persistence, link previews, metrics
//! +-- presentation/   HTTP routes, gateway, signaling broker
//! +-- client/         Voice call state for gateway clients
//! +-- shared/         Errors, validation, snowflake IDs
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP, WebSocket and signaling handlers
pub mod presentation;

// Client-side voice call state
pub mod client;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
