//! WebSocket connection to a running analysis server.
//!
//! The server accepts WebSocket clients on `ws://127.0.0.1:<port>/<endpoint>`
//! once it has written its marker. Text frames that arrive on the socket are
//! handed to the [`MessageHandler`] unchanged; framing beyond that belongs to
//! the protocol layer.

use crate::connection::{ConnectionFactory, MessageHandler};
use crate::error::connection::ConnectionError;
use crate::launcher::ProcessHandle;
use crate::marker::Port;
use crate::{ANALYSIS_SERVER_WS_BASE_URL, DEFAULT_WS_ENDPOINT};

use common::ErrorLocation;

use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use tokio::net::TcpStream;
use tokio::spawn as TokioSpawn;
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, spawn_blocking as TokioSpawnBlocking};
use tokio::time::sleep as TokioSleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

const CONNECT_MAX_ELAPSED: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct WsConnectionFactory {
    endpoint: String,
    connect_max_elapsed: Duration,
}

impl Default for WsConnectionFactory {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_WS_ENDPOINT.to_string(),
            connect_max_elapsed: CONNECT_MAX_ELAPSED,
        }
    }
}

impl WsConnectionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_start_matches('/').to_string();
        self
    }

    /// Upper bound on connection retries before giving up.
    pub fn with_connect_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.connect_max_elapsed = max_elapsed;
        self
    }

    pub fn url_for(&self, port: Port) -> String {
        format!("{ANALYSIS_SERVER_WS_BASE_URL}:{port}/{}", self.endpoint)
    }

    async fn open_stream(
        &self,
        url: &str,
        process: Option<ProcessHandle>,
    ) -> Result<WsStream, ConnectionError> {
        let mut backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.connect_max_elapsed),
            ..Default::default()
        };

        loop {
            match connect_async(url).await {
                Ok((stream, _response)) => return Ok(stream),
                Err(e) => match backoff.next_backoff() {
                    Some(duration) => {
                        trace!("Connect to {url} failed ({e}), retrying after {duration:?}");
                        TokioSleep(duration).await;
                    }
                    None => {
                        let process_state = describe_process(process).await;
                        return Err(ConnectionError::Handshake {
                            message: format!("Failed to connect to {url}{process_state}: {e}"),
                            location: ErrorLocation::caller(),
                            source: Box::new(e),
                        });
                    }
                },
            }
        }
    }
}

/// Process table lookups block, so they run off the async workers.
async fn describe_process(process: Option<ProcessHandle>) -> String {
    let Some(handle) = process else {
        return String::new();
    };

    match TokioSpawnBlocking(move || handle.is_running()).await {
        Ok(true) => format!(" (server {handle} still running)"),
        Ok(false) => format!(" (server {handle} is no longer running)"),
        Err(e) => {
            debug!("Could not check server {handle}: {e}");
            String::new()
        }
    }
}

impl ConnectionFactory for WsConnectionFactory {
    type Connection = ServerConnection;

    async fn connect(
        &self,
        port: Port,
        on_message: MessageHandler,
        process: Option<ProcessHandle>,
    ) -> Result<ServerConnection, ConnectionError> {
        let url = self.url_for(port);
        debug!("Connecting to {url} (process: {process:?})");

        let stream = self.open_stream(&url, process).await?;
        let (sink, stream) = stream.split();
        let reader = TokioSpawn(read_loop(stream, on_message, port));

        info!("Connected to analysis server at {url}");

        Ok(ServerConnection {
            port,
            process,
            sink: Mutex::new(sink),
            reader,
        })
    }
}

async fn read_loop(mut stream: SplitStream<WsStream>, on_message: MessageHandler, port: Port) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => on_message(text.as_str().to_owned()),
            Ok(Message::Close(frame)) => {
                debug!("Server on port {port} closed the connection: {frame:?}");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Connection to port {port} failed: {e}");
                break;
            }
        }
    }
}

/// A live connection. Owned by the caller; [`ServerConnection::close`] or
/// dropping it releases the socket and stops message delivery.
pub struct ServerConnection {
    port: Port,
    process: Option<ProcessHandle>,
    sink: Mutex<SplitSink<WsStream, Message>>,
    reader: JoinHandle<()>,
}

impl ServerConnection {
    pub fn port(&self) -> Port {
        self.port
    }

    pub fn process(&self) -> Option<ProcessHandle> {
        self.process
    }

    /// False once the server closed the socket or the read side failed.
    pub fn is_open(&self) -> bool {
        !self.reader.is_finished()
    }

    pub async fn send(&self, text: impl Into<String>) -> Result<(), ConnectionError> {
        if !self.is_open() {
            return Err(ConnectionError::Closed {
                message: format!("Connection to port {} is closed", self.port),
                location: ErrorLocation::caller(),
            });
        }

        let text: String = text.into();
        self.sink
            .lock()
            .await
            .send(Message::text(text))
            .await
            .map_err(|e| ConnectionError::Send {
                message: format!("Failed to send to port {}: {e}", self.port),
                location: ErrorLocation::caller(),
            })
    }

    pub async fn close(self) -> Result<(), ConnectionError> {
        let result = self.sink.lock().await.close().await;
        self.reader.abort();

        result.map_err(|e| ConnectionError::Closed {
            message: format!("Failed to close connection to port {}: {e}", self.port),
            location: ErrorLocation::caller(),
        })
    }
}

impl Drop for ServerConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
