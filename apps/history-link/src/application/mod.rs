//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for external systems (terminal session).
pub mod ports;

/// Application services: response collection and the bridge call.
pub mod services;
