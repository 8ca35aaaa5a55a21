//! Search gateway: shuffle/jitter/failover across the endpoint pool.
//!
//! One gateway call tries the pool in shuffled-but-sequential order for up
//! to `max_attempts` rounds, sleeping a small randomized delay before each
//! request. Endpoints are never queried concurrently within one request —
//! the point is to bound load on any single upstream. Transport failures
//! exclude an endpoint for the remainder of the request; empty result sets
//! keep it in rotation for the next round.
//!
//! On top of the raw loop, [`SearchGateway::search_product`] watches for
//! the core-engine degradation signal and re-issues the search with a
//! broadened fallback query before surfacing partial results.

use crate::config::SearchConfig;
use crate::degradation;
use crate::error::{Result, SearchError};
use crate::http;
use crate::pool::{EndpointPool, ExclusionSet};
use crate::proxy::{HttpProxyClient, HttpTokenIssuer, SearchProxyClient};
use crate::reformulate;
use crate::retry::RetryPolicy;
use crate::token::{TokenIssuer, TokenStore};
use crate::types::{SearchOutcome, SearchQuery};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Backoff base between token issuance attempts.
const TOKEN_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Proxy error codes that end the failover loop immediately — another
/// endpoint would reject the same query the same way.
const NON_RETRYABLE_UPSTREAM_CODES: &[&str] = &["invalid_query", "unauthorized", "forbidden"];

/// Issues search queries against the endpoint pool with failover.
pub struct SearchGateway<P: SearchProxyClient, I: TokenIssuer> {
    proxy: P,
    tokens: TokenStore<I>,
    pool: EndpointPool,
    config: SearchConfig,
}

impl SearchGateway<HttpProxyClient, HttpTokenIssuer> {
    /// Build a production gateway (HTTP proxy client, HTTP token issuer)
    /// from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for invalid configuration or
    /// [`SearchError::Http`] if a client cannot be constructed.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        config.validate()?;
        let pool = EndpointPool::new(&config.endpoints)?;
        let proxy = HttpProxyClient::new(config)?;
        let issuer = HttpTokenIssuer::new(config)?;
        let tokens = TokenStore::new(
            issuer,
            Duration::from_secs(config.token_low_water_seconds),
            RetryPolicy::new(config.token_retry_attempts, TOKEN_RETRY_BASE_DELAY),
        );
        Ok(Self::new(proxy, tokens, pool, config.clone()))
    }
}

impl<P: SearchProxyClient, I: TokenIssuer> SearchGateway<P, I> {
    /// Assemble a gateway from its parts. Tests inject mock proxies and
    /// issuers here.
    pub fn new(proxy: P, tokens: TokenStore<I>, pool: EndpointPool, config: SearchConfig) -> Self {
        Self {
            proxy,
            tokens,
            pool,
            config,
        }
    }

    /// The token store shared by every request through this gateway.
    pub fn tokens(&self) -> &TokenStore<I> {
        &self.tokens
    }

    /// The proxy client behind this gateway.
    pub fn proxy(&self) -> &P {
        &self.proxy
    }

    /// Issue `query` against the pool until an endpoint returns an
    /// acceptable outcome.
    ///
    /// An outcome is acceptable when its result set is non-empty. A proxy
    /// body carrying a known non-retryable error code fails the call
    /// immediately; any other per-endpoint failure is logged and the loop
    /// moves on.
    ///
    /// # Errors
    ///
    /// - [`SearchError::AuthUnavailable`] if no credential can be obtained
    ///   (fatal, not retried here).
    /// - [`SearchError::AllEndpointsExhausted`] once every endpoint in
    ///   every round has failed or answered unacceptably.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome> {
        let mut excluded = ExclusionSet::new();
        let mut failures: Vec<String> = Vec::new();

        for round in 1..=self.config.max_attempts {
            if excluded.covers(&self.pool) {
                debug!(round, "every endpoint excluded, ending rounds early");
                break;
            }

            for endpoint in self.pool.shuffled() {
                if excluded.contains(endpoint) {
                    continue;
                }

                tokio::time::sleep(http::sample_jitter(self.config.request_jitter_ms)).await;
                let credential = self.tokens.acquire().await?;

                match self.proxy.search(endpoint, &credential, query).await {
                    Ok(outcome) => {
                        if let Some(code) = outcome.error.as_deref() {
                            if NON_RETRYABLE_UPSTREAM_CODES.contains(&code) {
                                return Err(SearchError::Http(format!(
                                    "{endpoint} rejected query: {code}"
                                )));
                            }
                            debug!(%endpoint, code, round, "proxy error code, trying next endpoint");
                            failures.push(format!("{endpoint}: {code}"));
                            continue;
                        }
                        if outcome.is_acceptable() {
                            debug!(
                                %endpoint,
                                round,
                                results = outcome.results.len(),
                                "endpoint returned acceptable outcome"
                            );
                            return Ok(outcome);
                        }
                        debug!(%endpoint, round, "empty result set, trying next endpoint");
                        failures.push(format!("{endpoint}: empty result set"));
                    }
                    Err(err) => {
                        warn!(endpoint = %endpoint, error = %err, round, "endpoint query failed");
                        failures.push(format!("{endpoint}: {err}"));
                        excluded.exclude(endpoint);
                    }
                }
            }
        }

        Err(SearchError::AllEndpointsExhausted(failures.join("; ")))
    }

    /// Search for a product term, falling back to a broadened query when
    /// both core engines are reported degraded.
    ///
    /// The fallback is retried up to `fallback_attempts` times; if it never
    /// yields anything, the original (partial) outcome is surfaced rather
    /// than hidden.
    ///
    /// # Errors
    ///
    /// Same as [`SearchGateway::search`] for the primary query.
    pub async fn search_product(&self, term: &str) -> Result<SearchOutcome> {
        let primary = SearchQuery::new(term);
        let outcome = self.search(&primary).await?;

        let degraded = degradation::degraded_engines(&outcome);
        if !degradation::core_pair_degraded(&degraded) {
            return Ok(outcome);
        }

        info!(
            term,
            degraded = degraded.len(),
            "core engines degraded, retrying with broadened query"
        );
        let fallback = reformulate::reformulate(term);
        for attempt in 1..=self.config.fallback_attempts {
            match self.search(&fallback).await {
                Ok(broadened) => return Ok(broadened),
                Err(err) => {
                    warn!(attempt, error = %err, "broadened query failed");
                }
            }
        }

        // Partial results are acceptable and must be surfaced, not hidden.
        Ok(outcome)
    }
}
