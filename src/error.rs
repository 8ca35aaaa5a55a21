//! Error types for the garimpo-search crate.
//!
//! All errors use stable string messages suitable for display to callers
//! and programmatic handling. Tokens and credentials never appear in
//! error messages.

/// Errors that can occur during the search-acquisition and curation pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Token issuance failed after exhausting all retries.
    #[error("auth unavailable: {0}")]
    AuthUnavailable(String),

    /// Every upstream endpoint failed or returned an unacceptable outcome
    /// in every retry round.
    #[error("all endpoints exhausted: {0}")]
    AllEndpointsExhausted(String),

    /// The generation job did not complete within its wall-clock deadline.
    #[error("generation timed out: {0}")]
    GenerationTimeout(String),

    /// The generation job completed but produced no usable text segment.
    #[error("empty generation result: {0}")]
    EmptyGenerationResult(String),

    /// The generation job's text output was not the expected serialized payload.
    #[error("malformed generation output: {0}")]
    MalformedGenerationOutput(String),

    /// An HTTP request to an upstream service failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Invalid pipeline configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl SearchError {
    /// The HTTP status class this error maps to at the (external) routing layer.
    ///
    /// Upstream-availability failures are 503-class; generation failures and
    /// everything else are 500-class.
    pub fn status_class(&self) -> u16 {
        match self {
            Self::AuthUnavailable(_) | Self::AllEndpointsExhausted(_) => 503,
            _ => 500,
        }
    }

    /// Whether another attempt against the same service could plausibly succeed.
    ///
    /// Used by the retry policy: transport-level failures are worth retrying,
    /// terminal classifications are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

/// Convenience type alias for garimpo-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
