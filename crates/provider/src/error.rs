use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("failed to deserialize provider response: {0}")]
    Deserialization(String),

    #[error("provider rate-limited the request")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("provider call timed out")]
    Timeout,

    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Whether the loop's caller might reasonably retry this call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. } | ProviderError::Timeout | ProviderError::Request(_)
        )
    }

    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => *retry_after_ms,
            _ => None,
        }
    }
}
