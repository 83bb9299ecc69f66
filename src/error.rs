//! Error classification for the bums runner
//!
//! The domain errors live in [`crate::utils::error`]. This module gives them
//! a common interface so the scheduler can report every account failure the
//! same way.
//!
//! # Architecture
//!
//! - [`ClassifiedError`] - Common interface implemented by the domain errors
//! - [`ErrorCategory`] - Classification of errors for handling strategies

pub use crate::utils::error::{InputError, PipelineError, RemoteError};

/// Common trait for runner error types
pub trait ClassifiedError: std::error::Error {
    /// Check if this error is transient (the next pass may succeed)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Transport and API errors
    Network,
    /// Login rejected
    Auth,
    /// Per-account wall-clock budget exceeded
    Timeout,
    /// Unusable proxy configuration
    Config,
    /// Shutdown interrupted the work
    Cancelled,
}

impl ErrorCategory {
    /// Human readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "network error",
            Self::Auth => "authentication error",
            Self::Timeout => "timeout",
            Self::Config => "configuration error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl ClassifiedError for RemoteError {
    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidProxy(_) | Self::Cancelled)
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidProxy(_) => ErrorCategory::Config,
            Self::Timeout => ErrorCategory::Timeout,
            Self::Cancelled => ErrorCategory::Cancelled,
            _ => ErrorCategory::Network,
        }
    }
}

impl ClassifiedError for PipelineError {
    fn is_recoverable(&self) -> bool {
        match self {
            // every pass re-authenticates from scratch
            Self::Auth(e) | Self::ProxyResolution(e) => e.is_recoverable(),
            Self::Timeout(_) => true,
            Self::Cancelled => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Auth(RemoteError::InvalidProxy(_)) => ErrorCategory::Config,
            Self::Auth(_) => ErrorCategory::Auth,
            Self::ProxyResolution(e) => e.category(),
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Cancelled => ErrorCategory::Cancelled,
        }
    }
}
