//! docfix remote script channel
//!
//! A single long-lived, newline-framed JSON connection to the document
//! editing host. Provides:
//!
//! - [`RemoteScriptChannel`]: correlated `execute_script` calls with
//!   per-call timeouts and a pending-request table
//! - [`ScriptExecutor`]: the seam the execution engine consumes
//! - [`Connector`] implementations for TCP and pre-established streams
//! - [`ChannelStats`]: per-channel counters

pub mod channel;
pub mod connector;
pub mod error;
pub mod protocol;
pub mod stats;

use std::time::Duration;

pub use channel::{RemoteScriptChannel, ScriptExecutor};
pub use connector::{BoxedStream, Connector, DuplexStream, PreparedConnector, TcpConnector};
pub use error::{ChannelError, ChannelResult};
pub use protocol::{RpcErrorBody, RpcRequest, RpcResponse, EXECUTE_SCRIPT};
pub use stats::ChannelStats;

/// Per-call timeout applied when the caller does not pick one.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS);
