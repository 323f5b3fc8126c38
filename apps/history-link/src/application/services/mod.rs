//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `ResponseCollector`: Pulls events until a terminal event arrives
//! - `SessionGuard`: Stops the session exactly once on every exit path
//! - `run_history`: One host call, end to end

pub mod bridge;
pub mod collector;
pub mod guard;

pub use bridge::{BridgeOptions, REFDATA_SERVICE, START_FAILED, run_history};
pub use collector::{CollectorFault, CollectorState, ResponseCollector};
pub use guard::SessionGuard;
