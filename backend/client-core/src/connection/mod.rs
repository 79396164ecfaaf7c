pub mod ws;

pub use ws::{ServerConnection, WsConnectionFactory};

use crate::error::connection::ConnectionError;
use crate::launcher::ProcessHandle;
use crate::marker::Port;

use std::sync::Arc;

/// Receives out-of-band protocol text for the lifetime of a connection.
///
/// Called zero or more times, from a background task. Must not panic.
pub type MessageHandler = Arc<dyn Fn(String) + Send + Sync>;

/// Turns a known port into a live, handshaked connection.
pub trait ConnectionFactory: Send + Sync {
    type Connection: Send + 'static;

    /// `process` is the launched server when one is known at connect time.
    /// It is diagnostic only and may be `None` even for a fresh launch.
    fn connect(
        &self,
        port: Port,
        on_message: MessageHandler,
        process: Option<ProcessHandle>,
    ) -> impl Future<Output = Result<Self::Connection, ConnectionError>> + Send;
}
