// Remote call errors
// Carries enough context (status, retry hint) for callers to classify the failure.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Transport,
    Timeout,
    RateLimited,
    Http,
    GraphQl,
    Malformed,
    NotFound,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteErrorKind::Transport => "transport",
            RemoteErrorKind::Timeout => "timeout",
            RemoteErrorKind::RateLimited => "rate_limited",
            RemoteErrorKind::Http => "http",
            RemoteErrorKind::GraphQl => "graphql",
            RemoteErrorKind::Malformed => "malformed",
            RemoteErrorKind::NotFound => "not_found",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind} error (status={status:?}): {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub status: Option<u16>,
    pub retry_after: Option<Duration>,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            retry_after: None,
            message: message.into(),
        }
    }

    pub fn http(status: u16, retry_after: Option<Duration>, message: impl Into<String>) -> Self {
        let kind = if status == 429 {
            RemoteErrorKind::RateLimited
        } else {
            RemoteErrorKind::Http
        };
        Self {
            kind,
            status: Some(status),
            retry_after,
            message: message.into(),
        }
    }

    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self {
            kind: RemoteErrorKind::RateLimited,
            status: Some(429),
            retry_after,
            message: "rate limit exceeded".to_string(),
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            RemoteErrorKind::Timeout,
            format!("deadline of {}ms exceeded", after.as_millis()),
        )
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Malformed, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, message)
    }
}
