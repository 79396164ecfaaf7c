use crate::cli::Cli;
use crate::session::{build_coordinator, forward_lines};

use client_core::connection::WsConnectionFactory;
use client_core::{ConnectionFactory, MessageHandler, Port};

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::time::timeout as TokioTimeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Accepts one client and forwards its text frames to the returned channel.
async fn spawn_sink_server() -> (Port, UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = Port::new(listener.local_addr().unwrap().port()).unwrap();
    let (tx, rx) = unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        while let Some(Ok(frame)) = ws.next().await {
            if let Message::Text(text) = frame {
                let _ = tx.send(text.as_str().to_owned());
            }
        }
    });

    (port, rx)
}

/// **VALUE**: Verifies that stdin lines reach the server and blank lines are skipped.
///
/// **WHY THIS MATTERS**: The CLI is driven by piping requests in. A trailing newline or a
/// blank separator must not turn into an empty frame the server rejects.
#[tokio::test]
async fn given_input_lines_when_forwarded_then_server_receives_non_blank_lines() {
    // GIVEN: A live connection and three lines of input, one blank
    let (port, mut received) = spawn_sink_server().await;
    let handler: MessageHandler = Arc::new(|_message: String| {});
    let connection = WsConnectionFactory::new()
        .connect(port, handler, None)
        .await
        .unwrap();
    let input: &[u8] = b"first request\n\n  second request  \n";

    // WHEN: Forwarding until EOF
    let sent = forward_lines(&connection, input).await.unwrap();

    // THEN: Two trimmed messages, in order
    assert_eq!(sent, 2);
    let wait = Duration::from_secs(5);
    let first = TokioTimeout(wait, received.recv()).await.unwrap();
    let second = TokioTimeout(wait, received.recv()).await.unwrap();
    assert_eq!(first.as_deref(), Some("first request"));
    assert_eq!(second.as_deref(), Some("second request"));

    connection.close().await.unwrap();
}

#[test]
fn given_cli_flags_when_building_coordinator_then_timeout_is_applied() {
    let cli = Cli::try_parse_from([
        "analysis-client",
        "--config",
        "project.toml",
        "--startup-timeout-secs",
        "7",
    ])
    .unwrap();

    let coordinator = build_coordinator(&cli);

    assert_eq!(coordinator.startup_timeout(), Duration::from_secs(7));
}
