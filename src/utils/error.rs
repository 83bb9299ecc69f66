//! Error types for the bums runner
//!
//! This module defines the error taxonomy used by the remote client, the
//! account pipeline and the input loaders.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the remote API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Transport-level failure (connect, TLS, proxy handshake, body read)
    #[error("HTTP request failed: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("Server error: {0}")]
    Status(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// The API answered with a non-zero business code
    #[error("API rejected request (code {code}): {message}")]
    Api { code: i64, message: String },

    /// Body could not be decoded into the expected shape
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Proxy URI could not be used
    #[error("Invalid proxy: {0}")]
    InvalidProxy(String),

    /// The account's cancellation token fired while the call was in flight
    #[error("Request cancelled")]
    Cancelled,
}

impl RemoteError {
    /// Map a reqwest error onto the taxonomy
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Per-account pipeline failure classification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Login failed; the account is skipped for this pass
    #[error("Authentication failed: {0}")]
    Auth(RemoteError),

    /// External IP lookup through the proxy failed (log context only)
    #[error("Proxy resolution failed: {0}")]
    ProxyResolution(RemoteError),

    /// Shutdown interrupted the account before it authenticated
    #[error("Account run cancelled")]
    Cancelled,

    /// The whole account pipeline exceeded its wall-clock budget
    #[error("Account pipeline timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl PipelineError {
    /// Short machine-friendly label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Cancelled => "cancelled",
            Self::ProxyResolution(_) => "proxy_resolution",
            Self::Timeout(_) => "timeout",
        }
    }
}

/// Errors raised while loading account and proxy lists
#[derive(Error, Debug)]
pub enum InputError {
    /// The account file does not exist
    #[error("Account file not found: {0}")]
    AccountsNotFound(String),

    /// The account file contains no usable lines
    #[error("Account file is empty: {0}")]
    NoAccounts(String),

    /// Read failure
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
