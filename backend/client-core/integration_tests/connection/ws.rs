use client_core::connection::{ServerConnection, WsConnectionFactory};
use client_core::error::connection::ConnectionError;
use client_core::{ConnectionFactory, MessageHandler, Port, ProcessHandle};

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::time::timeout as TokioTimeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn channel_handler() -> (MessageHandler, UnboundedReceiver<String>) {
    let (tx, rx) = unbounded_channel();
    let handler: MessageHandler = Arc::new(move |message: String| {
        let _ = tx.send(message);
    });
    (handler, rx)
}

/// Server that forwards every text frame it receives to the returned channel
/// and pushes `greeting` to each client.
async fn spawn_server(greeting: &'static str) -> (Port, UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = Port::new(listener.local_addr().unwrap().port()).unwrap();
    let (tx, rx) = unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::text(greeting)).await.unwrap();
        while let Some(Ok(frame)) = ws.next().await {
            if let Message::Text(text) = frame {
                let _ = tx.send(text.as_str().to_owned());
            }
        }
    });

    (port, rx)
}

#[test]
fn given_port_when_url_built_then_uses_loopback_and_endpoint() {
    let factory = WsConnectionFactory::new().with_endpoint("/events");

    let url = factory.url_for(Port::new(9090).unwrap());

    assert_eq!(url, "ws://127.0.0.1:9090/events");
}

#[test]
fn given_default_factory_when_url_built_then_uses_default_endpoint() {
    let url = WsConnectionFactory::default().url_for(Port::new(9090).unwrap());

    assert_eq!(url, "ws://127.0.0.1:9090/jerky");
}

/// **VALUE**: Verifies that server-pushed text reaches the message handler.
///
/// **WHY THIS MATTERS**: The handler is the only path for out-of-band messages such as
/// indexing progress. If the reader task never starts, the editor never sees them.
#[tokio::test]
async fn given_server_pushes_text_when_connected_then_handler_receives_it() {
    // GIVEN: A server that greets on connect
    let (port, _server_rx) = spawn_server("indexer: 10%").await;
    let (handler, mut rx) = channel_handler();

    // WHEN: Connecting
    let connection = WsConnectionFactory::new()
        .connect(port, handler, None)
        .await
        .unwrap();

    // THEN: The greeting is delivered to the handler
    let message = TokioTimeout(RECV_TIMEOUT, rx.recv()).await.unwrap();
    assert_eq!(message.as_deref(), Some("indexer: 10%"));
    assert_eq!(connection.port(), port);
    assert!(connection.process().is_none());
}

#[tokio::test]
async fn given_connection_when_sending_then_server_receives_text() {
    // GIVEN: A live connection carrying a process handle
    let (port, mut server_rx) = spawn_server("ready").await;
    let (handler, _rx) = channel_handler();
    let process = ProcessHandle::new(std::process::id());
    let connection: ServerConnection = WsConnectionFactory::new()
        .connect(port, handler, Some(process))
        .await
        .unwrap();

    // WHEN: Sending a request
    connection.send(r#"{"typehint":"ConnectionInfoReq"}"#).await.unwrap();

    // THEN: The server gets it verbatim
    let received = TokioTimeout(RECV_TIMEOUT, server_rx.recv()).await.unwrap();
    assert_eq!(
        received.as_deref(),
        Some(r#"{"typehint":"ConnectionInfoReq"}"#)
    );
    assert_eq!(connection.process(), Some(process));

    connection.close().await.unwrap();
}

/// **VALUE**: Verifies that an unreachable port fails with a Handshake error once the retry
/// budget is spent, and that the error reports the server process state.
///
/// **WHY THIS MATTERS**: When a server writes its marker and then dies, the user needs to
/// know the process is gone rather than see a bare "connection refused".
#[tokio::test]
async fn given_nothing_listening_when_connecting_then_returns_handshake_error() {
    // GIVEN: A port that was bound and released
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = Port::new(listener.local_addr().unwrap().port()).unwrap();
    drop(listener);
    let (handler, _rx) = channel_handler();
    let process = ProcessHandle::new(std::process::id());

    // WHEN: Connecting with a short retry budget
    let result = WsConnectionFactory::new()
        .with_connect_max_elapsed(Duration::from_millis(300))
        .connect(port, handler, Some(process))
        .await;

    // THEN: Handshake error that mentions the still-running process
    match result {
        Err(ConnectionError::Handshake { message, .. }) => {
            assert!(message.contains("still running"), "got: {message}");
        }
        Err(other) => panic!("Expected Handshake, got {other:?}"),
        Ok(_) => panic!("Expected Handshake, got a connection"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn given_exited_process_when_connect_fails_then_error_says_no_longer_running() {
    // GIVEN: A process that has already exited and been reaped, and a dead port
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let process = ProcessHandle::new(child.id());
    child.wait().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = Port::new(listener.local_addr().unwrap().port()).unwrap();
    drop(listener);
    let (handler, _rx) = channel_handler();

    // WHEN: Connecting with a short retry budget
    let result = WsConnectionFactory::new()
        .with_connect_max_elapsed(Duration::from_millis(300))
        .connect(port, handler, Some(process))
        .await;

    // THEN: The message reports the process as gone
    match result {
        Err(ConnectionError::Handshake { message, .. }) => {
            assert!(message.contains("no longer running"), "got: {message}");
        }
        Err(other) => panic!("Expected Handshake, got {other:?}"),
        Ok(_) => panic!("Expected Handshake, got a connection"),
    }
}
