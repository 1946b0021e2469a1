//! # Wayzer Relay Library
//!
//! Real-time chat notifications for the Wayzer trip planner:
//! - WebSocket endpoint with first-frame bearer authentication
//! - Connection registry with per-user fan-out
//! - Event relay triggered by the message write path
//! - Optional Redis pub/sub for fan-out across instances
//! - A reconnecting native client
//!
//! ## Architecture
//!
//! - **Domain Layer**: Chat messages, participation and wire events
//! - **Application Layer**: Token verification, message service, relay
//! - **Infrastructure Layer**: PostgreSQL, Redis pub/sub, metrics
//! - **Presentation Layer**: HTTP handlers and the WebSocket endpoint
//! - **Client**: Socket client with handshake and backoff
//!
//! ## Module Structure
//!
//! ```text
//! wayzer_relay/
//! +-- config/         Configuration management
//! +-- domain/         Entities, repository traits, relay events
//! +-- application/    Services and DTOs
//! +-- infrastructure/ Database, pub/sub and metrics
//! +-- presentation/   HTTP routes and WebSocket handlers
//! +-- client/         Reconnecting relay client
//! +-- shared/         Common utilities (errors)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Relay client
pub mod client;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
