//! Minimal HTTP/1.1 request/response over a Unix domain socket
//!
//! The exchange node is reachable only over a local socket, not a
//! routable address, and speaks three fixed endpoints. No crate in our
//! stack carries HTTP over Unix sockets, so the framing is carried by
//! hand: one request per connection, `Connection: close`, bodies sized
//! by `Content-Length`.

use crate::config::Timeouts;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::time::timeout;
use veil_core::{Error, Result};

/// A decoded response: status code and raw body.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issue a single request and read the full response.
///
/// Each phase is bounded separately: connection establishment, request
/// write and body read, and the wait for response headers.
pub async fn request(
    socket_path: &Path,
    timeouts: &Timeouts,
    method: &str,
    path: &str,
    json_body: Option<&[u8]>,
) -> Result<Response> {
    let mut stream = timeout(timeouts.connect(), UnixStream::connect(socket_path))
        .await
        .map_err(|_| Error::Timeout("connection"))??;

    let mut head = format!("{method} {path} HTTP/1.1\r\nHost: exchange\r\nConnection: close\r\n");
    if let Some(body) = json_body {
        head.push_str("Content-Type: application/json\r\n");
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    head.push_str("\r\n");

    timeout(timeouts.request(), async {
        stream.write_all(head.as_bytes()).await?;
        if let Some(body) = json_body {
            stream.write_all(body).await?;
        }
        stream.flush().await
    })
    .await
    .map_err(|_| Error::Timeout("request write"))??;

    let mut reader = BufReader::new(stream);

    let (status, content_length) = timeout(timeouts.response_header(), async {
        let mut status_line = String::new();
        reader.read_line(&mut status_line).await?;
        let status = parse_status_line(&status_line)?;

        let mut content_length: Option<usize> = None;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).await?;
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = Some(value.trim().parse().map_err(|_| {
                        Error::Protocol(format!("invalid Content-Length: {value}"))
                    })?);
                }
            }
        }
        Ok::<_, Error>((status, content_length))
    })
    .await
    .map_err(|_| Error::Timeout("response headers"))??;

    let body = timeout(timeouts.request(), async {
        match content_length {
            Some(len) => {
                let mut body = vec![0u8; len];
                reader.read_exact(&mut body).await?;
                Ok::<_, Error>(body)
            }
            None => {
                let mut body = Vec::new();
                reader.read_to_end(&mut body).await?;
                Ok(body)
            }
        }
    })
    .await
    .map_err(|_| Error::Timeout("response body"))??;

    Ok(Response { status, body })
}

fn parse_status_line(line: &str) -> Result<u16> {
    let mut parts = line.split_whitespace();
    let version = parts
        .next()
        .ok_or_else(|| Error::Protocol("empty status line".to_string()))?;
    if !version.starts_with("HTTP/1.") {
        return Err(Error::Protocol(format!("unexpected status line: {line:?}")));
    }
    parts
        .next()
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| Error::Protocol(format!("unexpected status line: {line:?}")))
}

/// In-process stand-in for the exchange node, used by tests.
pub mod mock {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{UnixListener, UnixStream};
    use tokio::task::JoinHandle;

    /// Build a canned HTTP response with a sized body.
    pub fn canned_response(status: u16, reason: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        )
    }

    /// Serves one canned response per accepted connection, in order,
    /// and records the raw requests it saw.
    pub struct MockExchangeNode {
        socket_path: PathBuf,
        requests: Arc<Mutex<Vec<String>>>,
        handle: JoinHandle<()>,
    }

    impl MockExchangeNode {
        pub fn spawn(socket_path: &Path, responses: Vec<String>) -> std::io::Result<Self> {
            let listener = UnixListener::bind(socket_path)?;
            let requests = Arc::new(Mutex::new(Vec::new()));
            let seen = requests.clone();
            let handle = tokio::spawn(async move {
                for response in responses {
                    let Ok((mut stream, _)) = listener.accept().await else {
                        break;
                    };
                    if let Ok(raw) = read_request(&mut stream).await {
                        seen.lock().unwrap().push(raw);
                    }
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                }
            });
            Ok(Self {
                socket_path: socket_path.to_path_buf(),
                requests,
                handle,
            })
        }

        pub fn socket_path(&self) -> &Path {
            &self.socket_path
        }

        /// Raw requests received so far.
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Drop for MockExchangeNode {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    async fn read_request(stream: &mut UnixStream) -> std::io::Result<String> {
        let mut reader = BufReader::new(stream);
        let mut raw = String::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).await?;
            if let Some((name, value)) = line.trim_end().split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
            let done = line == "\r\n" || line == "\n" || line.is_empty();
            raw.push_str(&line);
            if done {
                break;
            }
        }
        if content_length > 0 {
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).await?;
            raw.push_str(&String::from_utf8_lossy(&body));
        }
        Ok(raw)
    }
}
