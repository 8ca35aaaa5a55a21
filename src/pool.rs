//! The immutable endpoint pool and its request-scoped exclusion set.
//!
//! Endpoints are read-only configuration for the lifetime of the process.
//! A failing endpoint is never removed from the shared pool; instead each
//! request carries its own [`ExclusionSet`] that dies with the request, so
//! concurrent requests never observe each other's failures.

use crate::error::{Result, SearchError};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::fmt;

/// Base address of one upstream search proxy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    base_url: String,
    host: String,
}

impl Endpoint {
    /// Parse and validate an endpoint base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the URL is not absolute or has
    /// no host component.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let parsed = url::Url::parse(&base_url)
            .map_err(|e| SearchError::Config(format!("invalid endpoint URL {base_url:?}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| {
                SearchError::Config(format!("endpoint URL {base_url:?} has no host"))
            })?
            .to_owned();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            host,
        })
    }

    /// The configured base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The host component, used as the issuing identity on credentials.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// URL of the proxy's search operation.
    pub fn search_url(&self) -> String {
        format!("{}/search", self.base_url)
    }

    /// URL of the proxy's token issuance operation.
    pub fn token_url(&self) -> String {
        format!("{}/generate_token", self.base_url)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

/// The fixed set of interchangeable upstream search proxies.
#[derive(Debug, Clone)]
pub struct EndpointPool {
    endpoints: Vec<Endpoint>,
}

impl EndpointPool {
    /// Build a pool from configured base URLs.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the list is empty or any URL is
    /// invalid.
    pub fn new(base_urls: &[String]) -> Result<Self> {
        if base_urls.is_empty() {
            return Err(SearchError::Config(
                "endpoint pool must not be empty".into(),
            ));
        }
        let endpoints = base_urls
            .iter()
            .map(|u| Endpoint::new(u.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { endpoints })
    }

    /// Number of configured endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether the pool has no endpoints. Never true for a constructed pool.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// The configured endpoints in configuration order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// The endpoints in a fresh random order. Called once per retry round
    /// to spread load across the pool without a central coordinator.
    pub fn shuffled(&self) -> Vec<&Endpoint> {
        let mut order: Vec<&Endpoint> = self.endpoints.iter().collect();
        order.shuffle(&mut rand::thread_rng());
        order
    }
}

/// Request-scoped set of endpoints excluded from further attempts.
///
/// Populated when an endpoint fails at the transport level; consulted on
/// every subsequent attempt of the same request. Dropped with the request.
#[derive(Debug, Default)]
pub struct ExclusionSet {
    excluded: HashSet<String>,
}

impl ExclusionSet {
    /// An empty exclusion set for a new request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude an endpoint for the remainder of this request.
    pub fn exclude(&mut self, endpoint: &Endpoint) {
        self.excluded.insert(endpoint.base_url().to_owned());
    }

    /// Whether the endpoint has been excluded.
    pub fn contains(&self, endpoint: &Endpoint) -> bool {
        self.excluded.contains(endpoint.base_url())
    }

    /// Number of excluded endpoints.
    pub fn len(&self) -> usize {
        self.excluded.len()
    }

    /// Whether nothing has been excluded yet.
    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty()
    }

    /// Whether every endpoint of `pool` is excluded — the request has no
    /// endpoint left to try.
    pub fn covers(&self, pool: &EndpointPool) -> bool {
        pool.endpoints().iter().all(|e| self.contains(e))
    }
}
