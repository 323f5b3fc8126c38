//! Configuration Module
//!
//! Configuration loading for the bridge.

mod settings;

pub use settings::{BridgeConfig, ConfigError, SessionSettings};
