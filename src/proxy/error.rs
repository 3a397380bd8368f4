use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProxyError {
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },
    #[error("request to {endpoint} failed: {reason}")]
    Transport {
        endpoint: &'static str,
        reason: String,
    },
    #[error("malformed response from {endpoint}: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },
    #[error("failed to encode request for {endpoint}: {reason}")]
    Encode {
        endpoint: &'static str,
        reason: String,
    },
    #[error("text is required")]
    EmptyText,
    #[error("proxy worker failed: {0}")]
    Worker(String),
}

impl ProxyError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ProxyError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
