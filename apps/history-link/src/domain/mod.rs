//! Domain Layer - Core bridge types and business logic.
//!
//! This layer contains the element tree, session events, the historical
//! data request and the response formatter. Everything here is pure Rust
//! with no I/O.

/// Self-describing element tree.
pub mod element;

/// Inbound session events and messages.
pub mod event;

/// Host call arguments and the historical data request.
pub mod request;

/// Response formatting into host text.
pub mod response;

/// Session lifecycle state.
pub mod session;
