//! Pipeline configuration with sensible defaults.
//!
//! [`SearchConfig`] controls the endpoint pool, retry caps, timeouts, token
//! renewal and generation polling. The defaults are tuned for a small pool
//! of self-hosted SearXNG proxies behind token gating.

use crate::error::SearchError;

/// Configuration for the search-acquisition pipeline.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Base URLs of the interchangeable upstream search proxies. Tried in
    /// shuffled-but-sequential order within each request.
    pub endpoints: Vec<String>,
    /// Base URL of the token-issuing proxy. `None` designates the first
    /// pool endpoint.
    pub token_endpoint: Option<String>,
    /// Maximum outer retry rounds across the shuffled pool.
    pub max_attempts: u32,
    /// Per-call HTTP timeout in seconds (search, token and generation calls).
    pub timeout_seconds: u64,
    /// Random pre-request delay range in milliseconds `(min, max)`. Spreads
    /// request timing across the pool and avoids thundering herds.
    pub request_jitter_ms: (u64, u64),
    /// Renew the cached credential once its remaining validity drops to or
    /// below this many seconds.
    pub token_low_water_seconds: u64,
    /// Attempt cap for token issuance (exponential backoff between attempts).
    pub token_retry_attempts: u32,
    /// Interval between generation job status polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Wall-clock deadline for a generation job, measured from submission.
    pub generation_deadline_seconds: u64,
    /// Attempt cap for the reformulated fallback query after core-engine
    /// degradation.
    pub fallback_attempts: u32,
    /// Custom User-Agent string. If `None`, rotates through a built-in list
    /// of realistic browser User-Agents.
    pub user_agent: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://127.0.0.1:8080".into()],
            token_endpoint: None,
            max_attempts: 3,
            timeout_seconds: 30,
            request_jitter_ms: (500, 2000),
            token_low_water_seconds: 300,
            token_retry_attempts: 3,
            poll_interval_ms: 500,
            generation_deadline_seconds: 30,
            fallback_attempts: 2,
            user_agent: None,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `endpoints` must not be empty and must all parse as absolute URLs
    /// - `max_attempts`, `fallback_attempts` and `token_retry_attempts` must be > 0
    /// - `timeout_seconds`, `poll_interval_ms` and `generation_deadline_seconds`
    ///   must be > 0
    /// - `request_jitter_ms.0` must be <= `request_jitter_ms.1`
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.endpoints.is_empty() {
            return Err(SearchError::Config(
                "at least one endpoint must be configured".into(),
            ));
        }
        for endpoint in self.endpoints.iter().chain(self.token_endpoint.iter()) {
            url::Url::parse(endpoint).map_err(|e| {
                SearchError::Config(format!("invalid endpoint URL {endpoint:?}: {e}"))
            })?;
        }
        if self.max_attempts == 0 {
            return Err(SearchError::Config(
                "max_attempts must be greater than 0".into(),
            ));
        }
        if self.token_retry_attempts == 0 {
            return Err(SearchError::Config(
                "token_retry_attempts must be greater than 0".into(),
            ));
        }
        if self.fallback_attempts == 0 {
            return Err(SearchError::Config(
                "fallback_attempts must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(SearchError::Config(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }
        if self.generation_deadline_seconds == 0 {
            return Err(SearchError::Config(
                "generation_deadline_seconds must be greater than 0".into(),
            ));
        }
        if self.request_jitter_ms.0 > self.request_jitter_ms.1 {
            return Err(SearchError::Config(
                "request_jitter_ms min must be <= max".into(),
            ));
        }
        Ok(())
    }

    /// The endpoint that issues bearer tokens: `token_endpoint` when set,
    /// otherwise the first configured pool endpoint.
    pub fn issuing_endpoint(&self) -> &str {
        self.token_endpoint
            .as_deref()
            .unwrap_or_else(|| self.endpoints[0].as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let config = SearchConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.request_jitter_ms, (500, 2000));
        assert_eq!(config.token_low_water_seconds, 300);
        assert_eq!(config.token_retry_attempts, 3);
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.generation_deadline_seconds, 30);
        assert_eq!(config.fallback_attempts, 2);
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_endpoints_rejected() {
        let config = SearchConfig {
            endpoints: vec![],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn malformed_endpoint_rejected() {
        let config = SearchConfig {
            endpoints: vec!["not a url".into()],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("invalid endpoint URL"));
    }

    #[test]
    fn malformed_token_endpoint_rejected() {
        let config = SearchConfig {
            token_endpoint: Some("::::".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_attempts_rejected() {
        let config = SearchConfig {
            max_attempts: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = SearchConfig {
            timeout_seconds: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_seconds"));
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let config = SearchConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_generation_deadline_rejected() {
        let config = SearchConfig {
            generation_deadline_seconds: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_jitter_range_rejected() {
        let config = SearchConfig {
            request_jitter_ms: (2000, 500),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jitter"));
    }

    #[test]
    fn zero_jitter_range_valid() {
        let config = SearchConfig {
            request_jitter_ms: (0, 0),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn issuing_endpoint_defaults_to_first_pool_endpoint() {
        let config = SearchConfig {
            endpoints: vec!["http://proxy-a:8080".into(), "http://proxy-b:8080".into()],
            ..Default::default()
        };
        assert_eq!(config.issuing_endpoint(), "http://proxy-a:8080");
    }

    #[test]
    fn issuing_endpoint_prefers_dedicated_token_endpoint() {
        let config = SearchConfig {
            endpoints: vec!["http://proxy-a:8080".into()],
            token_endpoint: Some("http://auth:8080".into()),
            ..Default::default()
        };
        assert_eq!(config.issuing_endpoint(), "http://auth:8080");
    }
}
