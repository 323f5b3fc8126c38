//! Terminal Gateway Adapter
//!
//! WebSocket session to the terminal gateway, speaking a JSON rendition
//! of the session/service/request event model.
//!
//! # Protocol
//!
//! Client frames are tagged by `op` (`openService`, `sendRequest`). Every
//! gateway frame is one event:
//!
//! ```json
//! {"eventType":"RESPONSE","messages":[
//!   {"messageType":"HistoricalDataResponse","correlationIds":[2],
//!    "element":{"securityData":{"security":"IBM US Equity","fieldData":[]}}}]}
//! ```

pub mod codec;
pub mod messages;
pub mod session;

pub use codec::{CodecError, JsonCodec};
pub use messages::{ClientFrame, WireEvent, WireMessage};
pub use session::{TerminalSession, TerminalSessionConfig};
