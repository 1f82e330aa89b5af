//! Minimal HTTP/1.1 handling for the assistant API
//!
//! `POST /ask` with `{"question": "..."}` answers the question,
//! `GET /health` reports liveness, `OPTIONS` answers CORS preflight.

use crate::assistant::{AskRequest, CollegeAssistant};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

const READ_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REQUEST_BYTES: usize = 1_000_000;

/// Accept connections forever, one task per connection.
pub async fn serve(listener: TcpListener, assistant: Arc<CollegeAssistant>) -> std::io::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        debug!("New connection from: {}", addr);
        tokio::spawn(handle_connection(stream, Arc::clone(&assistant)));
    }
}

async fn handle_connection(mut stream: TcpStream, assistant: Arc<CollegeAssistant>) {
    let request = match tokio::time::timeout(READ_TIMEOUT, read_request(&mut stream)).await {
        Ok(Ok(request)) => request,
        Ok(Err(e)) => {
            warn!("Failed to read from stream: {}", e);
            return;
        }
        Err(_) => {
            warn!("Request read timeout");
            return;
        }
    };

    if request.is_empty() {
        return;
    }

    let response = handle_request(&request, &assistant).await;
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        warn!("Failed to write response: {}", e);
    }
}

/// Read until the headers and `Content-Length` bytes of body have arrived.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);

        if let Some(headers_end) = find_headers_end(&buffer) {
            let head = String::from_utf8_lossy(&buffer[..headers_end]);
            let content_length = extract_content_length(&head).unwrap_or(0);
            if buffer.len() >= headers_end + content_length {
                break;
            }
        }
        if buffer.len() > MAX_REQUEST_BYTES {
            break;
        }
    }

    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn find_headers_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|idx| idx + 4)
}

pub fn extract_content_length(head: &str) -> Option<usize> {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
}

/// Route a raw request and produce the full raw response.
pub async fn handle_request(request: &str, assistant: &CollegeAssistant) -> String {
    let request_line = request.lines().next().unwrap_or_default();
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return create_response(400, "Bad Request", r#"{"error":"Malformed request line"}"#);
    }

    let method = parts[0];
    let path = parts[1].split('?').next().unwrap_or("/").trim_end_matches('/');
    let body = request
        .find("\r\n\r\n")
        .map(|idx| request[idx + 4..].trim())
        .unwrap_or("");

    info!("Request: {} {}", method, path);

    match (method, path) {
        ("GET", "/health") => create_response(200, "OK", r#"{"status":"ok"}"#),
        ("OPTIONS", _) => create_response(204, "No Content", ""),
        ("POST", "/ask") => match serde_json::from_str::<AskRequest>(body) {
            Ok(ask) => {
                let response = assistant.handle(ask).await;
                match serde_json::to_string(&response) {
                    Ok(json) => create_response(200, "OK", &json),
                    Err(e) => error_response(500, "Internal Server Error", &e.to_string()),
                }
            }
            Err(e) => error_response(400, "Bad Request", &format!("Invalid request body: {}", e)),
        },
        _ => create_response(404, "Not Found", r#"{"error":"Not found"}"#),
    }
}

fn error_response(status: u16, status_text: &str, message: &str) -> String {
    let body = serde_json::json!({ "error": message });
    create_response(status, status_text, &body.to_string())
}

pub fn create_response(status: u16, status_text: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         \r\n\
         {}",
        status,
        status_text,
        body.len(),
        body
    )
}
