//! Token store: cached short-lived credential with low-water renewal.
//!
//! The store owns the credential's whole lifecycle behind `acquire` /
//! `invalidate`. Renewal is a critical section — the cache lives behind an
//! async mutex that is held across the renewal await, so concurrent callers
//! queue on the in-flight renewal instead of triggering redundant issuance
//! storms.

use crate::error::{Result, SearchError};
use crate::retry::RetryPolicy;
use crate::types::Credential;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// A source of fresh credentials.
///
/// Implementors issue a new credential from the designated issuing
/// endpoint. Implementations must be `Send + Sync` so the store can be
/// shared across concurrent pipelines.
pub trait TokenIssuer: Send + Sync {
    /// Request one new credential.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] for transport failures; the store's
    /// retry policy decides whether to try again.
    fn issue(&self) -> impl Future<Output = Result<Credential>> + Send;
}

/// Holds the shared credential and refreshes it before expiry.
pub struct TokenStore<I: TokenIssuer> {
    issuer: I,
    low_water: Duration,
    retry: RetryPolicy,
    cached: tokio::sync::Mutex<Option<Credential>>,
}

impl<I: TokenIssuer> TokenStore<I> {
    /// Create a store over `issuer`.
    ///
    /// `low_water` is the remaining-validity threshold below which the
    /// cached credential is renewed; `retry` bounds issuance attempts.
    pub fn new(issuer: I, low_water: Duration, retry: RetryPolicy) -> Self {
        Self {
            issuer,
            low_water,
            retry,
            cached: tokio::sync::Mutex::new(None),
        }
    }

    /// Return a credential with remaining validity above the low-water mark.
    ///
    /// Returns the cached credential when it is still fresh; otherwise
    /// renews under the critical section. Every credential handed out has
    /// strictly positive remaining validity.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::AuthUnavailable`] once issuance retries are
    /// exhausted. This is fatal for the current request; callers must not
    /// retry it further upstream.
    pub async fn acquire(&self) -> Result<Credential> {
        let mut cached = self.cached.lock().await;

        if let Some(credential) = cached.as_ref() {
            if credential.is_fresh(self.low_water) {
                return Ok(credential.clone());
            }
            debug!(
                remaining_secs = credential.remaining_validity().as_secs(),
                "credential below low-water mark, renewing"
            );
        }

        // Renewal happens while the lock is held: concurrent acquirers wait
        // here and then see the fresh credential instead of re-issuing.
        let credential = self
            .retry
            .run(|| self.issuer.issue(), SearchError::is_transient)
            .await
            .map_err(|e| SearchError::AuthUnavailable(e.to_string()))?;

        info!(issued_to = credential.issued_to(), "credential renewed");
        *cached = Some(credential.clone());
        Ok(credential)
    }

    /// Drop the cached credential; the next `acquire` renews unconditionally.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}
