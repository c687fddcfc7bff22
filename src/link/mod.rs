//! Entry point for the chat application.
//!
//! [`AccountLinker`] is what command handlers call: start a link, fetch the
//! stored token, unlink, and read or change per-channel defaults. It validates
//! parameters and translates errors; everything else is delegated.

use crate::error::LinkError;
use crate::oauth::LinkCoordinator;
use crate::settings::{self, ChannelSettings, ChannelSettingsStore};
use std::sync::Arc;
use tracing::{debug, error, info};

#[cfg(test)]
mod tests;

/// Longest accepted identity or channel id, in bytes
const MAX_ID_LEN: usize = 128;

/// A link URL to show the user, with how long it stays valid
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkInvitation {
    pub url: String,
    pub expires_in_seconds: u64,
}

#[derive(Clone)]
pub struct AccountLinker {
    coordinator: Arc<LinkCoordinator>,
    settings: Arc<ChannelSettingsStore>,
}

impl AccountLinker {
    pub fn new(coordinator: Arc<LinkCoordinator>, settings: Arc<ChannelSettingsStore>) -> Self {
        Self {
            coordinator,
            settings,
        }
    }

    /// Begin linking `identity` to a GitHub account.
    ///
    /// Does not check for an existing link; callers enforcing one account at
    /// a time should consult [`linked_account`](Self::linked_account) first.
    pub fn start_link(&self, identity: &str) -> Result<LinkInvitation, LinkError> {
        validate_id("identity", identity)?;

        let url = self.coordinator.build_authorization_url(identity);

        Ok(LinkInvitation {
            url,
            expires_in_seconds: self.coordinator.pending().ttl().as_secs(),
        })
    }

    /// The stored bearer token for `identity`.
    ///
    /// Returns [`LinkError::Unauthenticated`] when nothing is on file, and
    /// [`LinkError::DecryptionFailed`] when the stored token is unreadable.
    pub fn credential_for(&self, identity: &str) -> Result<String, LinkError> {
        validate_id("identity", identity)?;

        match self.coordinator.store().get(identity) {
            Ok(Some(account)) => Ok(account.credential),
            Ok(None) => {
                debug!(identity = %identity, "No credential on file");
                Err(LinkError::Unauthenticated)
            }
            Err(e) => {
                error!(identity = %identity, error = %e, "Failed to load credential");
                Err(e.into())
            }
        }
    }

    /// GitHub login linked to `identity`, if any.
    pub fn linked_account(&self, identity: &str) -> Result<Option<String>, LinkError> {
        validate_id("identity", identity)?;
        Ok(self.coordinator.store().account_name(identity)?)
    }

    /// Remove the stored credential. Succeeds when nothing was linked.
    pub fn unlink(&self, identity: &str) -> Result<(), LinkError> {
        validate_id("identity", identity)?;

        let removed = self.coordinator.store().delete(identity).map_err(|e| {
            error!(identity = %identity, error = %e, "Failed to delete credential");
            LinkError::from(e)
        })?;

        if removed {
            info!(identity = %identity, "Account unlinked");
        }
        Ok(())
    }

    pub fn channel_settings(&self, channel_id: &str) -> Result<ChannelSettings, LinkError> {
        validate_id("channel id", channel_id)?;
        self.settings.get(channel_id).map_err(storage_error)
    }

    /// Set the channel's default repository (`owner/repo`).
    pub fn set_default_repo(
        &self,
        channel_id: &str,
        repo: &str,
    ) -> Result<ChannelSettings, LinkError> {
        validate_id("channel id", channel_id)?;
        settings::validate_repo(repo).map_err(LinkError::InvalidRequest)?;

        let mut current = self.settings.get(channel_id).map_err(storage_error)?;
        current.default_repo = repo.trim().to_string();
        self.settings.save(&current).map_err(storage_error)?;

        Ok(current)
    }

    /// Set the channel's default project (`org/number` or a project URL).
    pub fn set_default_project(
        &self,
        channel_id: &str,
        project: &str,
    ) -> Result<ChannelSettings, LinkError> {
        validate_id("channel id", channel_id)?;
        let project = settings::normalize_project(project).map_err(LinkError::InvalidRequest)?;

        let mut current = self.settings.get(channel_id).map_err(storage_error)?;
        current.default_project = project;
        self.settings.save(&current).map_err(storage_error)?;

        Ok(current)
    }
}

fn storage_error(e: anyhow::Error) -> LinkError {
    let reason = format!("{:#}", e);
    error!(error = %reason, "Channel settings storage failed");
    LinkError::Storage(reason)
}

fn validate_id(kind: &str, id: &str) -> Result<(), LinkError> {
    if id.trim().is_empty() {
        return Err(LinkError::InvalidRequest(format!("{} must not be empty", kind)));
    }
    if id.len() > MAX_ID_LEN {
        return Err(LinkError::InvalidRequest(format!(
            "{} longer than {} bytes",
            kind, MAX_ID_LEN
        )));
    }
    if id.chars().any(char::is_control) {
        return Err(LinkError::InvalidRequest(format!(
            "{} contains control characters",
            kind
        )));
    }
    Ok(())
}
