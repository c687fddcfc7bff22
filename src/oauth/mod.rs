//! OAuth 2.0 authorization-code flow for linking a chat identity to GitHub.
//!
//! 1. The chat bot asks for a link URL for identity X
//! 2. A single-use state token is registered for X and embedded in the URL
//! 3. The user authorizes on GitHub
//! 4. GitHub redirects to `/callback?state=…&code=…`
//! 5. The state is consumed, the code exchanged, the GitHub login resolved
//! 6. The token is stored encrypted under X

mod exchange;
mod pending;
mod provider;

pub use pending::{run_pending_cleanup, PendingLinks};
pub use provider::OAuthProvider;

use crate::config::LinkConfig;
use crate::credentials::{CredentialStore, LinkedAccount};
use crate::error::LinkError;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Outcome of a completed link
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkedIdentity {
    pub identity: String,
    pub account_name: String,
}

/// Drives the authorization-code exchange and writes the result to the store.
pub struct LinkCoordinator {
    provider: OAuthProvider,
    pending: PendingLinks,
    store: Arc<CredentialStore>,
    http: reqwest::Client,
}

impl LinkCoordinator {
    /// # Arguments
    /// * `timeout` - Bound on each provider request (exchange, identity lookup)
    pub fn new(
        provider: OAuthProvider,
        pending: PendingLinks,
        store: Arc<CredentialStore>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ghlink/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            provider,
            pending,
            store,
            http,
        })
    }

    pub fn from_config(config: &LinkConfig, store: Arc<CredentialStore>) -> Result<Self> {
        Self::new(
            OAuthProvider::from(&config.github),
            PendingLinks::new(config.state_ttl()),
            store,
            config.provider_timeout(),
        )
    }

    pub fn pending(&self) -> &PendingLinks {
        &self.pending
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Register a pending link for `identity` and return the GitHub
    /// authorization URL that completes it.
    pub fn build_authorization_url(&self, identity: &str) -> String {
        let state = self.pending.begin_link(identity);
        debug!(identity = %identity, pending = self.pending.len(), "Pending link registered");
        self.provider.build_auth_url(&state)
    }

    /// Complete a link from the OAuth callback parameters.
    ///
    /// The state is consumed before any network call, so an unknown, replayed
    /// or expired state never reaches the provider. Provider failures are not
    /// retried.
    pub async fn handle_callback(
        &self,
        state: Option<&str>,
        code: Option<&str>,
    ) -> Result<LinkedIdentity, LinkError> {
        let state = state.filter(|s| !s.is_empty());
        let code = code.filter(|c| !c.is_empty());
        let (Some(state), Some(code)) = (state, code) else {
            return Err(LinkError::InvalidRequest(
                "missing state or code parameter".to_string(),
            ));
        };

        let identity = self.pending.consume(state).ok_or_else(|| {
            warn!("Callback with unknown, reused or expired state");
            LinkError::ExpiredOrInvalidState
        })?;

        debug!(identity = %identity, "State validated, exchanging code");

        let credential = exchange::exchange_code_for_token(&self.http, &self.provider, code)
            .await
            .map_err(|e| {
                let reason = format!("{:#}", e);
                error!(identity = %identity, error = %reason, "Token exchange failed");
                LinkError::ExchangeFailed(reason)
            })?;

        let account_name =
            exchange::fetch_account_name(&self.http, &self.provider.api_url, &credential)
                .await
                .map_err(|e| {
                    let reason = format!("{:#}", e);
                    error!(identity = %identity, error = %reason, "GitHub user lookup failed");
                    LinkError::IdentityLookupFailed(reason)
                })?;

        self.store
            .put(&LinkedAccount {
                identity: identity.clone(),
                account_name: account_name.clone(),
                credential,
            })
            .map_err(|e| {
                error!(identity = %identity, error = %e, "Failed to store credentials");
                LinkError::from(e)
            })?;

        info!(identity = %identity, account = %account_name, "Account linked");

        Ok(LinkedIdentity {
            identity,
            account_name,
        })
    }
}
