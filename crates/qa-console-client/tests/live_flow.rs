//! End-to-end flow against loopback stand-ins for the QA server.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::SinkExt;
use qa_console_client::{ConnectionManager, QaConsole, ReadyState};
use qa_console_core::{MemorySurface, QaForm, RunId, SubmissionAck};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

/// One-shot WebSocket server: accepts a single connection and streams the
/// given text frames, then closes.
async fn spawn_ws_server(frames: Vec<&'static str>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for frame in frames {
            ws.send(Message::Text(frame.to_string())).await.unwrap();
        }
        let _ = ws.send(Message::Close(None)).await;
    });
    addr
}

/// Minimal HTTP server answering one queued response per request.
async fn spawn_http_server(responses: Vec<(&'static str, String)>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let queue = Arc::new(Mutex::new(responses.into_iter().collect::<Vec<_>>()));
    tokio::spawn(async move {
        loop {
            let (mut stream, _) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => return,
            };
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                read_request(&mut stream).await;
                let (content_type, body) = {
                    let mut queue = queue.lock().await;
                    if queue.is_empty() {
                        ("text/plain", "exhausted".to_string())
                    } else {
                        queue.remove(0)
                    }
                };
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    addr
}

/// Drain one HTTP request: headers, then a content-length body if present.
async fn read_request(stream: &mut tokio::net::TcpStream) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let read = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(read) => read,
        };
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(position) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let mut remaining = content_length.saturating_sub(buffer.len() - header_end);
    while remaining > 0 {
        let read = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(read) => read,
        };
        remaining = remaining.saturating_sub(read);
    }
}

fn json(body: &str) -> (&'static str, String) {
    ("application/json", body.to_string())
}

#[tokio::test]
async fn submit_stream_and_complete_a_run() {
    let http_addr = spawn_http_server(vec![json(r#"{"run": 7}"#)]).await;
    let ws_addr = spawn_ws_server(vec![
        r#"{"output":"<b>ok</b>"}"#,
        "definitely not json",
        r#"{"output":" more"}"#,
        r#"{"result":"success"}"#,
    ])
    .await;

    let mut console = QaConsole::with_urls(
        &format!("http://{http_addr}"),
        &format!("ws://{ws_addr}/ws"),
        MemorySurface::new(),
    )
    .unwrap();

    let ack = console.start(&QaForm::default()).await.unwrap();
    assert_eq!(ack, SubmissionAck::Run(RunId::new("7")));
    assert!(console.surface().is_busy());
    assert!(
        console
            .surface()
            .pane("run-header-7")
            .unwrap()
            .content
            .contains('7')
    );

    let result = timeout(WAIT, console.follow_to_completion()).await.unwrap();
    assert_eq!(result.as_deref(), Some("success"));

    let surface = console.surface();
    assert!(!surface.is_busy());
    let pane = surface.pane("qa-output-7").unwrap();
    assert_eq!(pane.content, "<b>ok</b> more");
    assert_eq!(pane.scroll_top, pane.scroll_height());
    assert_eq!(surface.summaries(), vec![("success", "success")]);
}

#[tokio::test]
async fn ack_running_goes_busy_without_a_new_pane() {
    let http_addr = spawn_http_server(vec![json(r#"{"status":"running"}"#)]).await;
    let ws_addr = spawn_ws_server(vec![]).await;

    let mut console = QaConsole::with_urls(
        &format!("http://{http_addr}"),
        &format!("ws://{ws_addr}/ws"),
        MemorySurface::new(),
    )
    .unwrap();

    let ack = console.start(&QaForm::default()).await.unwrap();
    assert_eq!(ack, SubmissionAck::AlreadyRunning);
    assert!(console.surface().is_busy());
    assert!(console.surface().region_order().is_empty());
    assert!(console.registry().current().is_none());
}

#[tokio::test]
async fn debug_info_loads_into_a_single_refreshing_region() {
    let http_addr = spawn_http_server(vec![
        json(r#"{"run": 5}"#),
        ("text/html", "<pre>first</pre>".to_string()),
        ("text/html", "<pre>second</pre>".to_string()),
    ])
    .await;
    let ws_addr = spawn_ws_server(vec![]).await;

    let mut console = QaConsole::with_urls(
        &format!("http://{http_addr}"),
        &format!("ws://{ws_addr}/ws"),
        MemorySurface::new(),
    )
    .unwrap();
    console.start(&QaForm::default()).await.unwrap();

    let id = RunId::new("5");
    console.load_debug(&id).await.unwrap();
    console.load_debug(&id).await.unwrap();

    let regions = console
        .surface()
        .region_order()
        .iter()
        .filter(|region| region.as_str() == "debug-info-5")
        .count();
    assert_eq!(regions, 1);
    assert_eq!(
        console.surface().pane("debug-info-5").unwrap().content,
        "<pre>second</pre>"
    );
    assert_eq!(
        console.registry().get(&id).unwrap().debug_text(),
        Some("<pre>second</pre>")
    );
}

#[tokio::test]
async fn a_closed_channel_is_reopened_on_demand() {
    // First connection closes right away; the second one streams a frame
    // and stays open.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let ws_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let _ = ws.send(Message::Close(None)).await;

        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text(r#"{"output":"back"}"#.to_string()))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let (manager, mut events) = ConnectionManager::new(&format!("ws://{ws_addr}/ws")).unwrap();

    manager.ensure_connected().await.unwrap();
    assert_eq!(
        timeout(WAIT, events.recv()).await.unwrap(),
        Some(qa_console_client::ChannelEvent::Opened)
    );
    assert_eq!(
        timeout(WAIT, events.recv()).await.unwrap(),
        Some(qa_console_client::ChannelEvent::Closed)
    );
    assert_eq!(manager.state().await, ReadyState::Closed);

    manager.ensure_connected().await.unwrap();
    assert_eq!(manager.state().await, ReadyState::Open);
    assert_eq!(
        timeout(WAIT, events.recv()).await.unwrap(),
        Some(qa_console_client::ChannelEvent::Opened)
    );
    assert_eq!(
        timeout(WAIT, events.recv()).await.unwrap(),
        Some(qa_console_client::ChannelEvent::Frame(
            r#"{"output":"back"}"#.to_string()
        ))
    );
}

#[tokio::test]
async fn an_open_channel_is_reused_instead_of_reopened() {
    // This server accepts exactly once and then holds the connection open,
    // so a second handshake attempt would fail the test.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let ws_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text(r#"{"status":"running"}"#.to_string()))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });
    let (manager, mut events) =
        ConnectionManager::new(&format!("ws://{ws_addr}/ws")).unwrap();

    manager.ensure_connected().await.unwrap();
    assert_eq!(manager.state().await, ReadyState::Open);

    // The server only accepts once; a reconnect attempt would fail here.
    manager.ensure_connected().await.unwrap();

    let first = timeout(WAIT, events.recv()).await.unwrap();
    assert_eq!(first, Some(qa_console_client::ChannelEvent::Opened));
    let frame = timeout(WAIT, events.recv()).await.unwrap();
    assert_eq!(
        frame,
        Some(qa_console_client::ChannelEvent::Frame(
            r#"{"status":"running"}"#.to_string()
        ))
    );
}
