//! Error types for Veil

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid privacy options: {0}")]
    InvalidPrivacyOptions(String),

    #[error("private transaction manager is not in use")]
    ManagerNotInUse,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("Exchange returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Signing error: {0}")]
    Signing(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
