use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Instant;

use futures_util::StreamExt;
use openrouter_api::{
    ChatMessage, CompletionPayload, OpenRouterClient, OpenRouterConfig, RetryPolicy,
    TransportError,
};
use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};

#[derive(Clone)]
struct ResponseChunk {
    delay_ms: u64,
    bytes: Vec<u8>,
}

#[derive(Clone)]
enum ScriptedResponse {
    Respond {
        status: u16,
        content_type: &'static str,
        headers: Vec<(&'static str, &'static str)>,
        chunks: Vec<ResponseChunk>,
    },
    Reset,
}

struct ScriptedServer {
    base_url: String,
    request_count: Arc<AtomicUsize>,
    request_heads: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    async fn new(scripts: Vec<ScriptedResponse>) -> Self {
        let scripts = Arc::new(scripts);
        let request_count = Arc::new(AtomicUsize::new(0));
        let request_heads = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let base_url = format!("http://{addr}/api/v1");

        let handle = tokio::spawn({
            let scripts = Arc::clone(&scripts);
            let request_count = Arc::clone(&request_count);
            let request_heads = Arc::clone(&request_heads);

            async move {
                loop {
                    let (socket, _) = match listener.accept().await {
                        Ok(pair) => pair,
                        Err(_) => break,
                    };
                    let scripts = Arc::clone(&scripts);
                    let request_count = Arc::clone(&request_count);
                    let request_heads = Arc::clone(&request_heads);
                    tokio::spawn(async move {
                        serve_one(socket, scripts, request_count, request_heads).await;
                    });
                }
            }
        });

        Self {
            base_url,
            request_count,
            request_heads,
            handle,
        }
    }

    fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Acquire)
    }

    fn request_heads(&self) -> Vec<String> {
        self.request_heads
            .lock()
            .map(|heads| heads.clone())
            .unwrap_or_default()
    }

    fn client(&self, retry: RetryPolicy) -> OpenRouterClient {
        let config = OpenRouterConfig::new()
            .with_base_url(&self.base_url)
            .with_referer("https://ide.example/editor")
            .with_retry_policy(retry);
        OpenRouterClient::new(config).expect("client")
    }

    fn shutdown(&self) {
        self.handle.abort();
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::default()
        .with_flat_backoff(Duration::from_millis(10))
        .with_default_retry_after(Duration::from_millis(10))
}

fn respond(status: u16, content_type: &'static str, body: &str) -> ScriptedResponse {
    ScriptedResponse::Respond {
        status,
        content_type,
        headers: Vec::new(),
        chunks: vec![ResponseChunk {
            delay_ms: 0,
            bytes: body.as_bytes().to_vec(),
        }],
    }
}

fn response_json(status: u16, body: &str) -> ScriptedResponse {
    respond(status, "application/json", body)
}

fn response_sse(frames: &[&str]) -> ScriptedResponse {
    let mut body = String::new();
    for frame in frames {
        body.push_str("data: ");
        body.push_str(frame);
        body.push_str("\n\n");
    }
    respond(200, "text/event-stream", &body)
}

fn completion_body(content: &str) -> String {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}

fn payload() -> CompletionPayload {
    CompletionPayload::new(
        "mistralai/mixtral-8x7b-instruct",
        vec![ChatMessage::system("sys"), ChatMessage::user("hello")],
    )
}

#[tokio::test]
async fn complete_returns_first_choice_content_with_caller_headers() {
    let server = ScriptedServer::new(vec![response_json(200, &completion_body("hi there"))]).await;
    let client = server.client(fast_retry());

    let content = client
        .complete(&payload(), "sk-or-v1-test", |_| {})
        .await
        .expect("completion should succeed");

    assert_eq!(content, "hi there");
    assert_eq!(server.request_count(), 1);

    let head = server.request_heads().pop().expect("request recorded").to_ascii_lowercase();
    assert!(head.starts_with("post /api/v1/chat/completions"));
    assert!(head.contains("authorization: bearer sk-or-v1-test"));
    assert!(head.contains("http-referer: https://ide.example/editor"));
    assert!(head.contains("x-title: advanced web ide"));

    server.shutdown();
}

#[tokio::test]
async fn complete_without_content_is_malformed_response() {
    let server = ScriptedServer::new(vec![response_json(200, r#"{"choices":[]}"#)]).await;
    let client = server.client(fast_retry());

    let error = client
        .complete(&payload(), "tok", |_| {})
        .await
        .expect_err("empty choices should fail");
    assert!(matches!(error, TransportError::MalformedResponse(_)));

    server.shutdown();
}

#[tokio::test]
async fn unauthorized_is_surfaced_after_a_single_attempt() {
    let server = ScriptedServer::new(vec![
        response_json(401, r#"{"error":{"code":401,"message":"No auth credentials found"}}"#),
        response_json(200, &completion_body("never reached")),
    ])
    .await;
    let client = server.client(fast_retry());

    let mut notices = 0;
    let error = client
        .complete(&payload(), "sk-bad", |_| notices += 1)
        .await
        .expect_err("401 should fail");

    assert!(matches!(
        error,
        TransportError::Auth { ref message } if message == "No auth credentials found"
    ));
    assert_eq!(server.request_count(), 1);
    assert_eq!(notices, 0);

    server.shutdown();
}

#[tokio::test]
async fn rate_limit_waits_for_retry_after_before_next_attempt() {
    let server = ScriptedServer::new(vec![
        ScriptedResponse::Respond {
            status: 429,
            content_type: "application/json",
            headers: vec![("Retry-After", "2")],
            chunks: vec![ResponseChunk {
                delay_ms: 0,
                bytes: br#"{"error":{"message":"slow down"}}"#.to_vec(),
            }],
        },
        response_json(200, &completion_body("after wait")),
    ])
    .await;
    let client = server.client(fast_retry());

    let mut delays = Vec::new();
    let started = Instant::now();
    let content = timeout(
        Duration::from_secs(10),
        client.complete(&payload(), "tok", |notice| delays.push(notice.delay)),
    )
    .await
    .expect("retry path should be bounded")
    .expect("second attempt should succeed");

    assert_eq!(content, "after wait");
    assert!(started.elapsed() >= Duration::from_millis(2000));
    assert_eq!(delays, vec![Duration::from_secs(2)]);
    assert_eq!(server.request_count(), 2);

    server.shutdown();
}

#[tokio::test]
async fn api_error_is_retried_then_succeeds() {
    let server = ScriptedServer::new(vec![
        response_json(503, r#"{"error":{"message":"overloaded"}}"#),
        response_json(200, &completion_body("recovered")),
    ])
    .await;
    let client = server.client(fast_retry());

    let content = client
        .complete(&payload(), "tok", |_| {})
        .await
        .expect("retry should recover");

    assert_eq!(content, "recovered");
    assert_eq!(server.request_count(), 2);

    server.shutdown();
}

#[tokio::test]
async fn persistent_api_error_exhausts_attempt_budget() {
    let server = ScriptedServer::new(vec![
        response_json(500, "boom 1"),
        response_json(500, "boom 2"),
        response_json(500, "boom 3"),
        response_json(200, &completion_body("too late")),
    ])
    .await;
    let client = server.client(fast_retry());

    let mut notices = Vec::new();
    let error = client
        .complete(&payload(), "tok", |notice| notices.push(notice.attempt))
        .await
        .expect_err("three failures should exhaust retries");

    match error {
        TransportError::RetryExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(
                *last,
                TransportError::Api { status, ref message }
                    if status == StatusCode::INTERNAL_SERVER_ERROR && message == "boom 3"
            ));
        }
        other => panic!("expected retry exhaustion, got {other:?}"),
    }
    assert_eq!(notices, vec![1, 2]);
    assert_eq!(server.request_count(), 3);

    server.shutdown();
}

#[tokio::test]
async fn connection_reset_exhausts_as_network_failure() {
    let server = ScriptedServer::new(vec![
        ScriptedResponse::Reset,
        ScriptedResponse::Reset,
        ScriptedResponse::Reset,
    ])
    .await;
    let client = server.client(fast_retry());

    let error = timeout(Duration::from_secs(10), client.complete(&payload(), "tok", |_| {}))
        .await
        .expect("retry path should resolve")
        .expect_err("connection reset should surface as failure");

    assert!(matches!(error.root_cause(), TransportError::Network(_)));
    assert!(matches!(error, TransportError::RetryExhausted { attempts: 3, .. }));
    assert_eq!(server.request_count(), 3);

    server.shutdown();
}

#[tokio::test]
async fn stream_yields_deltas_until_done() {
    let server = ScriptedServer::new(vec![response_sse(&[
        r#"{"choices":[{"delta":{"content":"body {"}}]}"#,
        r#"{"choices":[{"delta":{"content":" color: red; }"}}]}"#,
        "[DONE]",
        r#"{"choices":[{"delta":{"content":"after done"}}]}"#,
    ])])
    .await;
    let client = server.client(fast_retry());

    let deltas = client
        .stream(&payload(), "tok", |_| {})
        .await
        .expect("stream should open");
    let text = deltas.collect_text().await.expect("stream should finish");

    assert_eq!(text, "body { color: red; }");
    let head = server.request_heads().pop().expect("request recorded").to_ascii_lowercase();
    assert!(head.contains("accept: text/event-stream"));

    server.shutdown();
}

#[tokio::test]
async fn stream_delivers_chunks_as_they_arrive() {
    let server = ScriptedServer::new(vec![ScriptedResponse::Respond {
        status: 200,
        content_type: "text/event-stream",
        headers: Vec::new(),
        chunks: vec![
            ResponseChunk {
                delay_ms: 0,
                bytes: b"data: {\"choices\":[{\"delta\":{\"content\":\"first\"}}]}\n\n".to_vec(),
            },
            ResponseChunk {
                delay_ms: 150,
                bytes: b"data: {\"choices\":[{\"delta\":{\"content\":\"second\"}}]}\n\ndata: [DONE]\n\n"
                    .to_vec(),
            },
        ],
    }])
    .await;
    let client = server.client(fast_retry());

    let mut deltas = client
        .stream(&payload(), "tok", |_| {})
        .await
        .expect("stream should open");

    let first = deltas.next().await.expect("first item").expect("first delta");
    assert_eq!(first, "first");
    assert!(!deltas.is_released());

    let second = deltas.next().await.expect("second item").expect("second delta");
    assert_eq!(second, "second");
    assert!(deltas.next().await.is_none());
    assert!(deltas.is_released());

    server.shutdown();
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

async fn serve_one(
    mut socket: TcpStream,
    scripts: Arc<Vec<ScriptedResponse>>,
    request_count: Arc<AtomicUsize>,
    request_heads: Arc<Mutex<Vec<String>>>,
) {
    let Ok(head) = read_request_head(&mut socket).await else {
        return;
    };
    if let Ok(mut heads) = request_heads.lock() {
        heads.push(head);
    }

    let index = request_count.fetch_add(1, Ordering::AcqRel);
    let response = scripts
        .get(index)
        .cloned()
        .unwrap_or_else(|| response_json(500, r#"{"error":{"message":"unexpected request"}}"#));

    match response {
        ScriptedResponse::Reset => {}
        ScriptedResponse::Respond {
            status,
            content_type,
            headers,
            chunks,
        } => {
            let mut head = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: {content_type}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n",
                status_reason(status),
            );
            for (key, value) in headers {
                head.push_str(&format!("{key}: {value}\r\n"));
            }
            head.push_str("\r\n");

            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }

            for chunk in chunks {
                if chunk.delay_ms > 0 {
                    sleep(Duration::from_millis(chunk.delay_ms)).await;
                }
                let prefix = format!("{:X}\r\n", chunk.bytes.len());
                if socket.write_all(prefix.as_bytes()).await.is_err() {
                    return;
                }
                if socket.write_all(&chunk.bytes).await.is_err() {
                    return;
                }
                if socket.write_all(b"\r\n").await.is_err() {
                    return;
                }
            }

            let _ = socket.write_all(b"0\r\n\r\n").await;
            let _ = socket.shutdown().await;
        }
    }
}

async fn read_request_head(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 2048];

    loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..n]);
        if request.windows(4).any(|window| window == b"\r\n\r\n") {
            break;
        }
    }

    Ok(String::from_utf8_lossy(&request).into_owned())
}
