//! Wire protocol for the upstream search proxies.
//!
//! Each proxy exposes `POST /generate_token` (bearer token in a response
//! header) and `POST /search` with `q` / `format` / `engines` query
//! parameters behind an `Authorization` header. [`SearchProxyClient`] is
//! the seam the gateway talks through; [`HttpProxyClient`] is the real
//! implementation, and tests substitute mocks.

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::http;
use crate::pool::Endpoint;
use crate::token::TokenIssuer;
use crate::types::{Credential, SearchOutcome, SearchQuery};
use std::future::Future;
use std::time::Duration;

/// Response header that carries the issued bearer token.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Optional response header with the token's validity in seconds.
pub const TOKEN_TTL_HEADER: &str = "x-auth-expires-in";

/// Token validity assumed when the issuer sends no TTL header.
const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// A client capable of issuing one search query against one endpoint.
///
/// Implementations must be `Send + Sync` so a single client can serve all
/// concurrent batch pipelines.
pub trait SearchProxyClient: Send + Sync {
    /// Issue `query` against `endpoint` using `credential`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] for transport failures, non-2xx
    /// statuses and unparseable bodies. The gateway swallows these and
    /// moves on to the next endpoint.
    fn search(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
        query: &SearchQuery,
    ) -> impl Future<Output = Result<SearchOutcome>> + Send;
}

/// Production proxy client over a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpProxyClient {
    client: reqwest::Client,
}

impl HttpProxyClient {
    /// Build a client configured from `config` (timeout, User-Agent).
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the underlying client cannot be
    /// constructed.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config)?,
        })
    }
}

impl SearchProxyClient for HttpProxyClient {
    async fn search(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
        query: &SearchQuery,
    ) -> Result<SearchOutcome> {
        tracing::trace!(%endpoint, term = query.term(), "issuing search");

        let mut params: Vec<(&str, String)> = vec![
            ("q", query.term().to_owned()),
            ("format", query.format().to_owned()),
        ];
        if let Some(engines) = query.engines() {
            params.push(("engines", engines.join(",")));
        }

        let response = self
            .client
            .post(endpoint.search_url())
            .query(&params)
            .bearer_auth(credential.token())
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("{endpoint} request failed: {e}")))?
            .error_for_status()
            .map_err(|e| SearchError::Http(format!("{endpoint} HTTP error: {e}")))?;

        let outcome: SearchOutcome = response
            .json()
            .await
            .map_err(|e| SearchError::Http(format!("{endpoint} body unreadable: {e}")))?;

        tracing::trace!(
            %endpoint,
            results = outcome.results.len(),
            unresponsive = outcome.unresponsive_engines.len(),
            "search response received"
        );
        Ok(outcome)
    }
}

/// Token issuer speaking the proxy's `POST /generate_token` operation.
///
/// The issued credential's identity is the issuing endpoint's host; its
/// TTL comes from the [`TOKEN_TTL_HEADER`] header when present.
#[derive(Debug, Clone)]
pub struct HttpTokenIssuer {
    client: reqwest::Client,
    endpoint: Endpoint,
}

impl HttpTokenIssuer {
    /// Build an issuer against the designated issuing endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for an invalid issuing URL or
    /// [`SearchError::Http`] if the client cannot be constructed.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config)?,
            endpoint: Endpoint::new(config.issuing_endpoint())?,
        })
    }
}

impl TokenIssuer for HttpTokenIssuer {
    async fn issue(&self) -> Result<Credential> {
        let response = self
            .client
            .post(self.endpoint.token_url())
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("token request failed: {e}")))?
            .error_for_status()
            .map_err(|e| SearchError::Http(format!("token HTTP error: {e}")))?;

        let token = response
            .headers()
            .get(AUTH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| {
                SearchError::Http(format!("token response missing {AUTH_TOKEN_HEADER} header"))
            })?;

        let ttl_secs = response
            .headers()
            .get(TOKEN_TTL_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);

        tracing::debug!(issuer = self.endpoint.host(), ttl_secs, "token issued");
        Ok(Credential::new(
            token,
            self.endpoint.host(),
            Duration::from_secs(ttl_secs),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A mock proxy for testing trait bounds and async execution.
    struct MockProxy {
        outcome: SearchOutcome,
    }

    impl SearchProxyClient for MockProxy {
        async fn search(
            &self,
            _endpoint: &Endpoint,
            _credential: &Credential,
            _query: &SearchQuery,
        ) -> Result<SearchOutcome> {
            if self.outcome.results.is_empty() && self.outcome.error.is_none() {
                return Err(SearchError::Http("mock proxy failure".into()));
            }
            Ok(self.outcome.clone())
        }
    }

    #[test]
    fn http_proxy_client_builds_from_default_config() {
        let config = SearchConfig::default();
        assert!(HttpProxyClient::new(&config).is_ok());
    }

    #[test]
    fn http_token_issuer_builds_from_default_config() {
        let config = SearchConfig::default();
        assert!(HttpTokenIssuer::new(&config).is_ok());
    }

    #[test]
    fn http_token_issuer_rejects_invalid_issuing_endpoint() {
        let config = SearchConfig {
            endpoints: vec!["http://proxy-a:8080".into()],
            token_endpoint: Some("data:text/plain,nope".into()),
            ..Default::default()
        };
        assert!(HttpTokenIssuer::new(&config).is_err());
    }

    #[test]
    fn clients_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpProxyClient>();
        assert_send_sync::<HttpTokenIssuer>();
    }

    #[tokio::test]
    async fn mock_proxy_returns_outcome() {
        let proxy = MockProxy {
            outcome: SearchOutcome {
                results: vec![serde_json::json!({"title": "Tablet 10\""})],
                unresponsive_engines: vec![],
                error: None,
            },
        };
        let endpoint = Endpoint::new("http://proxy-a:8080").expect("endpoint");
        let credential = Credential::new("tok", "proxy-a", Duration::from_secs(3600));
        let query = SearchQuery::new("tablet");

        let outcome = proxy
            .search(&endpoint, &credential, &query)
            .await
            .expect("mock search");
        assert_eq!(outcome.results.len(), 1);
    }

    #[tokio::test]
    async fn mock_proxy_propagates_errors() {
        let proxy = MockProxy {
            outcome: SearchOutcome::empty(),
        };
        let endpoint = Endpoint::new("http://proxy-a:8080").expect("endpoint");
        let credential = Credential::new("tok", "proxy-a", Duration::from_secs(3600));
        let query = SearchQuery::new("tablet");

        let err = proxy
            .search(&endpoint, &credential, &query)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("mock proxy failure"));
    }
}
