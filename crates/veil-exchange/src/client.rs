//! Exchange node client
//!
//! Talks to the external payload-exchange node over its Unix domain
//! socket. Construction probes the node's liveness endpoint and fails
//! fatally when it does not answer, so a half-initialized client can
//! never be handed to the dispatcher.

use crate::config::ExchangeConfig;
use crate::http;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use veil_core::{Error, ExchangeKey, PrivateTransactionManager, Result};

#[derive(Serialize)]
struct SendRequest<'a> {
    payload: String,
    from: &'a str,
    to: &'a [String],
}

#[derive(Deserialize)]
struct SendResponse {
    key: String,
}

#[derive(Serialize)]
struct ReceiveRequest<'a> {
    key: String,
    to: &'a str,
}

#[derive(Deserialize)]
struct ReceiveResponse {
    payload: String,
}

/// Client for the exchange node's send/receive API.
pub struct ExchangeClient {
    config: ExchangeConfig,
    /// Base64 public key of the local exchange endpoint.
    identity: String,
}

impl ExchangeClient {
    /// Load the local identity, connect, and verify the node is up.
    pub async fn connect(config: &ExchangeConfig) -> Result<Self> {
        let identity = std::fs::read_to_string(&config.identity_file)?
            .trim()
            .to_string();
        let client = Self {
            config: config.clone(),
            identity,
        };
        client.upcheck().await?;
        tracing::info!(
            socket = %client.config.socket_path.display(),
            "connected to payload exchange node"
        );
        Ok(client)
    }

    async fn upcheck(&self) -> Result<()> {
        let response = http::request(
            &self.config.socket_path,
            &self.config.timeouts,
            "GET",
            "/upcheck",
            None,
        )
        .await?;
        if response.is_ok() {
            Ok(())
        } else {
            Err(Error::Transport(format!(
                "exchange node did not respond to upcheck request (status {})",
                response.status
            )))
        }
    }

    /// Transmit a payload to the named recipients, returning its key.
    async fn send_payload(&self, payload: &[u8], from: &str, to: &[String]) -> Result<ExchangeKey> {
        let from = if from.is_empty() {
            self.identity.as_str()
        } else {
            from
        };
        let body = serde_json::to_vec(&SendRequest {
            payload: BASE64.encode(payload),
            from,
            to,
        })?;

        let response = http::request(
            &self.config.socket_path,
            &self.config.timeouts,
            "POST",
            "/send",
            Some(&body),
        )
        .await?;
        if !response.is_ok() {
            return Err(Error::Status {
                status: response.status,
                body: response.body_text(),
            });
        }

        let decoded: SendResponse = serde_json::from_slice(&response.body)?;
        let key = BASE64.decode(decoded.key)?;
        tracing::debug!(recipients = to.len(), key = %hex::encode(&key), "payload exchanged");
        Ok(key)
    }

    /// Fetch the payload a key refers to.
    ///
    /// `Ok(None)` means the node answered but the local endpoint is not
    /// a recipient of the referenced payload, which callers must not
    /// treat as a failure.
    async fn receive_payload(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let body = serde_json::to_vec(&ReceiveRequest {
            key: BASE64.encode(key),
            to: &self.identity,
        })?;

        let response = http::request(
            &self.config.socket_path,
            &self.config.timeouts,
            "POST",
            "/receive",
            Some(&body),
        )
        .await?;
        if response.status == 404 {
            tracing::debug!(key = %hex::encode(key), "not a recipient of payload");
            return Ok(None);
        }
        if !response.is_ok() {
            return Err(Error::Status {
                status: response.status,
                body: response.body_text(),
            });
        }

        let decoded: ReceiveResponse = serde_json::from_slice(&response.body)?;
        Ok(Some(BASE64.decode(decoded.payload)?))
    }
}

#[async_trait::async_trait]
impl PrivateTransactionManager for ExchangeClient {
    async fn send(&self, payload: &[u8], from: &str, to: &[String]) -> Result<ExchangeKey> {
        if payload.is_empty() {
            return Ok(Vec::new());
        }
        if to.is_empty() {
            // Local-only: never exchanged, the copy stands in for a key.
            return Ok(payload.to_vec());
        }
        self.send_payload(payload, from, to).await
    }

    async fn receive(&self, key: &[u8]) -> Result<Vec<u8>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.receive_payload(key).await?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeouts;
    use crate::http::mock::{canned_response, MockExchangeNode};
    use std::path::Path;

    const UPCHECK_OK: &str = "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nOK";

    fn write_identity(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("node.pub");
        std::fs::write(&path, "BULeR8JyUWhiuuCMU/HLA0Q5pzkYT+cHII3ZKBey3Bo=\n").unwrap();
        path
    }

    fn config(dir: &Path) -> ExchangeConfig {
        ExchangeConfig {
            socket_path: dir.join("exchange.ipc"),
            identity_file: write_identity(dir),
            timeouts: Timeouts::default(),
        }
    }

    #[tokio::test]
    async fn construction_upchecks_the_node() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let node =
            MockExchangeNode::spawn(&cfg.socket_path, vec![UPCHECK_OK.to_string()]).unwrap();

        let client = ExchangeClient::connect(&cfg).await.unwrap();
        assert_eq!(client.identity, "BULeR8JyUWhiuuCMU/HLA0Q5pzkYT+cHII3ZKBey3Bo=");
        assert!(node.requests()[0].starts_with("GET /upcheck"));
    }

    #[tokio::test]
    async fn failed_upcheck_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let _node = MockExchangeNode::spawn(
            &cfg.socket_path,
            vec![canned_response(503, "Service Unavailable", "")],
        )
        .unwrap();

        assert!(matches!(
            ExchangeClient::connect(&cfg).await,
            Err(Error::Transport(_))
        ));
    }

    #[tokio::test]
    async fn send_encodes_and_decodes_base64() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let key_bytes = vec![0x42u8; 64];
        let send_ok = canned_response(
            200,
            "OK",
            &format!(r#"{{"key":"{}"}}"#, BASE64.encode(&key_bytes)),
        );
        let node = MockExchangeNode::spawn(
            &cfg.socket_path,
            vec![UPCHECK_OK.to_string(), send_ok],
        )
        .unwrap();

        let client = ExchangeClient::connect(&cfg).await.unwrap();
        let key = client
            .send(b"payload", "", &["tm1".to_string()])
            .await
            .unwrap();
        assert_eq!(key, key_bytes);

        // Empty `from` defaults to the local identity on the wire.
        let sent = node.requests()[1].clone();
        assert!(sent.contains(r#""from":"BULeR8JyUWhiuuCMU/HLA0Q5pzkYT+cHII3ZKBey3Bo=""#));
        assert!(sent.contains(&format!(r#""payload":"{}""#, BASE64.encode(b"payload"))));
    }

    #[tokio::test]
    async fn receive_resolves_a_payload() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let receive_ok = canned_response(
            200,
            "OK",
            &format!(r#"{{"payload":"{}"}}"#, BASE64.encode(b"the payload")),
        );
        let _node = MockExchangeNode::spawn(
            &cfg.socket_path,
            vec![UPCHECK_OK.to_string(), receive_ok],
        )
        .unwrap();

        let client = ExchangeClient::connect(&cfg).await.unwrap();
        assert_eq!(
            client.receive(&[0x42u8; 64]).await.unwrap(),
            b"the payload"
        );
    }

    #[tokio::test]
    async fn not_a_recipient_is_an_empty_payload_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let _node = MockExchangeNode::spawn(
            &cfg.socket_path,
            vec![
                UPCHECK_OK.to_string(),
                canned_response(404, "Not Found", ""),
            ],
        )
        .unwrap();

        let client = ExchangeClient::connect(&cfg).await.unwrap();
        assert!(client.receive(&[0x42u8; 64]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_failure_statuses_are_hard_errors() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let _node = MockExchangeNode::spawn(
            &cfg.socket_path,
            vec![
                UPCHECK_OK.to_string(),
                canned_response(500, "Internal Server Error", "boom"),
            ],
        )
        .unwrap();

        let client = ExchangeClient::connect(&cfg).await.unwrap();
        assert!(matches!(
            client.receive(&[0x42u8; 64]).await,
            Err(Error::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn malformed_response_body_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let _node = MockExchangeNode::spawn(
            &cfg.socket_path,
            vec![
                UPCHECK_OK.to_string(),
                canned_response(200, "OK", "not json"),
            ],
        )
        .unwrap();

        let client = ExchangeClient::connect(&cfg).await.unwrap();
        assert!(matches!(
            client.send(b"payload", "", &["tm1".to_string()]).await,
            Err(Error::Json(_))
        ));
    }

    #[tokio::test]
    async fn facade_guards_never_touch_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let node =
            MockExchangeNode::spawn(&cfg.socket_path, vec![UPCHECK_OK.to_string()]).unwrap();
        let client = ExchangeClient::connect(&cfg).await.unwrap();

        // Empty payload and empty recipient set short-circuit locally.
        assert!(client
            .send(&[], "", &["tm1".to_string()])
            .await
            .unwrap()
            .is_empty());
        assert_eq!(client.send(b"echo", "", &[]).await.unwrap(), b"echo");
        assert!(client.receive(&[]).await.unwrap().is_empty());

        // Only the construction upcheck reached the socket.
        assert_eq!(node.requests().len(), 1);
    }
}
