//! Mock classification server for testing
//!
//! A small HTTP server that answers `POST /classify` with a canned reply and
//! records every request it receives, so tests can assert on the multipart
//! body and on whether a request was made at all.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Canned reply configuration
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub status: u16,
    pub body: String,
    /// Delay in milliseconds before responding
    pub delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            status: 200,
            body: r#"{"bank": null, "transactions": []}"#.to_string(),
            delay_ms: 0,
        }
    }
}

impl MockConfig {
    pub fn json(body: serde_json::Value) -> Self {
        Self {
            body: body.to_string(),
            ..Default::default()
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            ..Default::default()
        }
    }
}

/// A request as the server saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Mock classification server
pub struct MockClassifierServer {
    port: u16,
    running: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockClassifierServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let requests = Arc::new(Mutex::new(Vec::new()));

        // Set listener to non-blocking for graceful shutdown
        listener.set_nonblocking(true)?;

        let running_clone = Arc::clone(&running);
        let requests_clone = Arc::clone(&requests);
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let log = Arc::clone(&requests_clone);
                        thread::spawn(move || handle_connection(stream, &cfg, &log));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            requests,
            thread_handle: Some(thread_handle),
        })
    }

    /// Get the base URL for this mock server
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockClassifierServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, log: &Mutex<Vec<RecordedRequest>>) {
    // Accepted sockets may inherit the listener's non-blocking flag
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));

    let Some(request) = read_request(&mut stream) else {
        send_response(&mut stream, 400, r#"{"error": "Invalid request"}"#);
        return;
    };

    let route_ok = request.method == "POST" && request.path == "/classify";
    if let Ok(mut requests) = log.lock() {
        requests.push(request);
    }

    if config.delay_ms > 0 {
        thread::sleep(Duration::from_millis(config.delay_ms));
    }

    if !route_ok {
        send_response(&mut stream, 404, r#"{"error": "Endpoint not found"}"#);
        return;
    }

    send_response(&mut stream, config.status, &config.body);
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut data = Vec::new();
    let mut buffer = [0u8; 8192];

    // Read until the end of the header block
    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = data[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buffer[..n]);
    }

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn send_response(stream: &mut TcpStream, status: u16, body: &str) {
    let status_text = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::classifier_api::ClassifierClient;
    use crate::domain::result::ImportError;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn test_successful_classification() {
        let server = MockClassifierServer::start(MockConfig::json(json!({
            "bank": "Kaspi",
            "transactions": [
                {"date": "2024-01-05", "amount": -2500, "category": "покупки", "merchant": "Shop"}
            ]
        })))
        .unwrap();

        let client = ClassifierClient::new(&server.base_url()).unwrap();
        let statement = client.classify(b"%PDF-1.4 test", "jan.pdf").unwrap();

        assert_eq!(statement.transactions.len(), 1);
        let tx = &statement.transactions[0];
        assert!(tx.is_expense);
        assert_eq!(tx.amount, Decimal::new(2500, 0));
        assert_eq!(tx.category, "Shopping");
        assert_eq!(tx.title, "Shop");
    }

    #[test]
    fn test_request_is_single_pdf_part() {
        let server = MockClassifierServer::start(MockConfig::default()).unwrap();
        let client = ClassifierClient::new(&server.base_url()).unwrap();
        client.classify(b"%PDF-1.4 body", "feb.pdf").unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/classify");

        let content_type = request.header("content-type").unwrap();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();

        let body = String::from_utf8_lossy(&request.body);
        assert!(body.starts_with(&format!("--{}\r\n", boundary)));
        assert!(body.contains("name=\"file\"; filename=\"feb.pdf\""));
        assert!(body.contains("Content-Type: application/pdf"));
        assert!(body.contains("%PDF-1.4 body"));
        assert!(body.ends_with(&format!("--{}--\r\n", boundary)));
        assert_eq!(body.matches("Content-Disposition").count(), 1);
    }

    #[test]
    fn test_each_call_uses_new_boundary() {
        let server = MockClassifierServer::start(MockConfig::default()).unwrap();
        let client = ClassifierClient::new(&server.base_url()).unwrap();
        client.classify(b"a", "a.pdf").unwrap();
        client.classify(b"b", "b.pdf").unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_ne!(
            requests[0].header("content-type"),
            requests[1].header("content-type")
        );
    }

    #[test]
    fn test_server_error_ignores_body() {
        let server = MockClassifierServer::start(MockConfig::status(
            500,
            r#"{"transactions": [{"date": "2024-01-05", "amount": -1}]}"#,
        ))
        .unwrap();

        let client = ClassifierClient::new(&server.base_url()).unwrap();
        match client.classify(b"x", "x.pdf") {
            Err(ImportError::ParseError(msg)) => assert_eq!(msg, "Server error: 500"),
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_field_with_200() {
        let server = MockClassifierServer::start(MockConfig::json(json!({
            "transactions": [],
            "error": "busy"
        })))
        .unwrap();

        let client = ClassifierClient::new(&server.base_url()).unwrap();
        match client.classify(b"x", "x.pdf") {
            Err(ImportError::ParseError(msg)) => assert_eq!(msg, "busy"),
            other => panic!("expected embedded error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_field_with_null_transactions() {
        let server = MockClassifierServer::start(MockConfig::status(
            200,
            r#"{"error": "busy", "transactions": null}"#,
        ))
        .unwrap();

        let client = ClassifierClient::new(&server.base_url()).unwrap();
        match client.classify(b"x", "x.pdf") {
            Err(ImportError::ParseError(msg)) => assert_eq!(msg, "busy"),
            other => panic!("expected embedded error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let server = MockClassifierServer::start(MockConfig::status(200, "<html>oops</html>")).unwrap();
        let client = ClassifierClient::new(&server.base_url()).unwrap();
        assert!(matches!(client.classify(b"x", "x.pdf"), Err(ImportError::Decode(_))));
    }

    #[test]
    fn test_timeout_is_network_error() {
        let server = MockClassifierServer::start(MockConfig {
            delay_ms: 1500,
            ..Default::default()
        })
        .unwrap();

        let client =
            ClassifierClient::with_timeout(&server.base_url(), Duration::from_millis(200)).unwrap();
        assert!(matches!(client.classify(b"x", "x.pdf"), Err(ImportError::NetworkError(_))));
    }

    #[test]
    fn test_connection_refused_is_network_error() {
        // Grab a free port, then release it so nothing is listening
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let client = ClassifierClient::new(&format!("http://127.0.0.1:{}", port)).unwrap();
        assert!(matches!(client.classify(b"x", "x.pdf"), Err(ImportError::NetworkError(_))));
    }
}
