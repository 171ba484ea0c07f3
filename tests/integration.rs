//! End-to-end chat turns against a wiremock completion endpoint.

use novachat::{
    ChatClient, ChatConfig, ChatError, ChatMessage, ChatSession, MemoryStore, MessageStore,
    RenderSink,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records every render callback a turn makes.
#[derive(Default)]
struct RecordingSink {
    frames: Vec<String>,
    errors: usize,
}

impl RenderSink for RecordingSink {
    fn on_fragment(&mut self, cumulative: &str) {
        self.frames.push(cumulative.to_string());
    }

    fn on_turn_error(&mut self) {
        self.errors += 1;
    }
}

/// Helper to build an SSE body string from a slice of data payloads.
fn sse_body(data_lines: &[&str]) -> String {
    let mut body = String::new();
    for line in data_lines {
        body.push_str(&format!("data: {line}\r\n\r\n"));
    }
    body
}

fn session_for(server: &MockServer) -> ChatSession<MemoryStore> {
    let config = ChatConfig::new(format!("{}/v1/chat/completions", server.uri()))
        .with_api_key("test-api-key");
    ChatSession::new(ChatClient::new(config), MemoryStore::new())
}

/// Read one HTTP request (headers plus content-length body) off a socket.
async fn read_http_request(socket: &mut TcpStream) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        request.extend_from_slice(&buf[..n]);
        if let Some(headers_end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&request[..headers_end]);
            let content_length = headers
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if request.len() >= headers_end + 4 + content_length {
                return;
            }
        }
    }
}

// --- Happy path ---

#[tokio::test]
async fn send_streams_reply_and_persists_turn() {
    let mock_server = MockServer::start().await;

    let sse = sse_body(&[
        r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
        r#"{"choices":[{"delta":{"content":"Hello"}}]}"#,
        r#"{"choices":[{"delta":{"content":" world"}}]}"#,
        r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        "[DONE]",
    ]);

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-api-key"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({
            "messages": [{"role": "user", "content": "Hello?"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut session = session_for(&mock_server);
    let mut sink = RecordingSink::default();

    let reply = session.send("Hello?", &mut sink).await.unwrap();
    assert_eq!(reply, "Hello world");

    // The sink sees the cumulative text at each growth step.
    assert_eq!(sink.frames, vec!["Hello", "Hello world"]);
    assert_eq!(sink.errors, 0);

    assert_eq!(
        session.history(),
        &[
            ChatMessage::user("Hello?"),
            ChatMessage::assistant("Hello world"),
        ]
    );
    assert_eq!(
        session.store().list().await.unwrap(),
        vec![
            ChatMessage::user("Hello?"),
            ChatMessage::assistant("Hello world"),
        ]
    );
}

#[tokio::test]
async fn send_includes_prior_history_in_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_json(serde_json::json!({
            "messages": [{"role": "user", "content": "first"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[r#"{"choices":[{"delta":{"content":"Hi!"}}]}"#, "[DONE]"]),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The second request must carry the whole conversation so far.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_json(serde_json::json!({
            "messages": [
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "Hi!"},
                {"role": "user", "content": "second"},
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[r#"{"choices":[{"delta":{"content":"Again!"}}]}"#, "[DONE]"]),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut session = session_for(&mock_server);
    let mut sink = RecordingSink::default();

    session.send("first", &mut sink).await.unwrap();
    let reply = session.send("second", &mut sink).await.unwrap();
    assert_eq!(reply, "Again!");
    assert_eq!(session.history().len(), 4);
}

#[tokio::test]
async fn keep_alive_comments_are_ignored_end_to_end() {
    let mock_server = MockServer::start().await;

    let sse = format!(
        ": keep-alive\r\n\r\n{}: keep-alive\r\n\r\n",
        sse_body(&[r#"{"choices":[{"delta":{"content":"steady"}}]}"#, "[DONE]"])
    );

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&mock_server)
        .await;

    let mut session = session_for(&mock_server);
    let mut sink = RecordingSink::default();

    let reply = session.send("ping", &mut sink).await.unwrap();
    assert_eq!(reply, "steady");
    assert_eq!(sink.frames, vec!["steady"]);
}

#[tokio::test]
async fn stream_without_sentinel_still_completes_turn() {
    let mock_server = MockServer::start().await;

    // No [DONE]: the body just ends after the last event.
    let sse = sse_body(&[
        r#"{"choices":[{"delta":{"content":"partial but "}}]}"#,
        r#"{"choices":[{"delta":{"content":"kept"}}]}"#,
    ]);

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&mock_server)
        .await;

    let mut session = session_for(&mock_server);
    let mut sink = RecordingSink::default();

    let reply = session.send("go", &mut sink).await.unwrap();
    assert_eq!(reply, "partial but kept");
    assert_eq!(sink.errors, 0);
    assert_eq!(session.store().list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn empty_reply_is_not_persisted() {
    let mock_server = MockServer::start().await;

    let sse = sse_body(&[r#"{"choices":[{"delta":{"role":"assistant"}}]}"#, "[DONE]"]);

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&mock_server)
        .await;

    let mut session = session_for(&mock_server);
    let mut sink = RecordingSink::default();

    let reply = session.send("anyone?", &mut sink).await.unwrap();
    assert_eq!(reply, "");
    assert!(sink.frames.is_empty());

    // The turn succeeded, so the user entry stays, but no assistant row.
    assert_eq!(session.history(), &[ChatMessage::user("anyone?")]);
    assert_eq!(
        session.store().list().await.unwrap(),
        vec![ChatMessage::user("anyone?")]
    );
}

// --- Failure and rollback ---

#[tokio::test]
async fn send_rejects_on_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(serde_json::json!({"error": {"message": "boom"}})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut session = session_for(&mock_server);
    let mut sink = RecordingSink::default();

    let err = session.send("Hello?", &mut sink).await.unwrap_err();
    match err {
        ChatError::TransportRejected(msg) => assert!(msg.contains("boom"), "got: {}", msg),
        other => panic!("unexpected error: {:?}", other),
    }

    // In-memory history rolled back, error surfaced exactly once.
    assert!(session.history().is_empty());
    assert!(sink.frames.is_empty());
    assert_eq!(sink.errors, 1);

    // The persisted user row is not deleted by the rollback.
    assert_eq!(
        session.store().list().await.unwrap(),
        vec![ChatMessage::user("Hello?")]
    );
}

#[tokio::test]
async fn mid_stream_disconnect_discards_partial_reply() {
    // wiremock cannot truncate a response body, so serve this turn from a raw
    // socket: one complete chunk, then a connection drop mid-chunk.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_http_request(&mut socket).await;

        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\n\
                  content-type: text/event-stream\r\n\
                  transfer-encoding: chunked\r\n\
                  \r\n",
            )
            .await
            .unwrap();

        // A complete chunk carrying a whole event, so one fragment renders.
        let event = "data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n\n";
        let chunk = format!("{:x}\r\n{}\r\n", event.len(), event);
        socket.write_all(chunk.as_bytes()).await.unwrap();

        // Declare another chunk and hang up before delivering it.
        socket.write_all(b"40\r\ndata: {\"choices\"").await.unwrap();
    });

    let config = ChatConfig::new(format!("http://{}/v1/chat/completions", addr))
        .with_api_key("test-api-key");
    let mut session = ChatSession::new(ChatClient::new(config), MemoryStore::new());
    let mut sink = RecordingSink::default();

    let err = session.send("go", &mut sink).await.unwrap_err();
    assert!(matches!(err, ChatError::StreamTransport(_)), "got: {:?}", err);

    // The fragment rendered before the drop, then the turn rolled back.
    assert_eq!(sink.frames, vec!["par"]);
    assert_eq!(sink.errors, 1);
    assert!(session.history().is_empty());

    // Partial assistant text is never persisted; the user row stays.
    assert_eq!(
        session.store().list().await.unwrap(),
        vec![ChatMessage::user("go")]
    );
}

#[tokio::test]
async fn send_without_api_key_is_config_error() {
    let config = ChatConfig::new("http://127.0.0.1:9/v1/chat/completions");
    let mut session = ChatSession::new(ChatClient::new(config), MemoryStore::new());
    let mut sink = RecordingSink::default();

    let err = session.send("Hello?", &mut sink).await.unwrap_err();
    assert!(matches!(err, ChatError::Config(_)), "got: {:?}", err);
    assert!(session.history().is_empty());
    assert_eq!(sink.errors, 1);
}

// --- History management ---

#[tokio::test]
async fn load_hydrates_history_from_store() {
    let store = MemoryStore::new();
    store.append(ChatMessage::user("old question")).await.unwrap();
    store
        .append(ChatMessage::assistant("old answer"))
        .await
        .unwrap();

    let config = ChatConfig::new("http://127.0.0.1:9/v1/chat/completions").with_api_key("k");
    let mut session = ChatSession::new(ChatClient::new(config), store);
    assert!(session.history().is_empty());

    session.load().await.unwrap();
    assert_eq!(
        session.history(),
        &[
            ChatMessage::user("old question"),
            ChatMessage::assistant("old answer"),
        ]
    );
}

#[tokio::test]
async fn clear_wipes_store_and_history() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[r#"{"choices":[{"delta":{"content":"bye"}}]}"#, "[DONE]"]),
            "text/event-stream",
        ))
        .mount(&mock_server)
        .await;

    let mut session = session_for(&mock_server);
    let mut sink = RecordingSink::default();
    session.send("hi", &mut sink).await.unwrap();
    assert!(!session.history().is_empty());

    session.clear().await.unwrap();
    assert!(session.history().is_empty());
    assert!(session.store().list().await.unwrap().is_empty());
}
