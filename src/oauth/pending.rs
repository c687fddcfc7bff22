//! Pending link registry for CSRF protection.
//!
//! Maps the OAuth `state` token handed to the provider back to the chat
//! identity that asked for the link. Entries are single-use and expire after a
//! fixed TTL. Held in memory only; a restart simply forces users to start over.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use dashmap::{mapref::entry::Entry, DashMap};
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Random bytes per state token (256 bits)
const TOKEN_BYTES: usize = 32;

/// A link request waiting for its OAuth callback
#[derive(Clone, Debug)]
struct PendingLink {
    identity: String,
    created_at: Instant,
}

impl PendingLink {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Pending link registry with automatic expiration
#[derive(Clone)]
pub struct PendingLinks {
    entries: Arc<DashMap<String, PendingLink>>,
    ttl: Duration,
}

impl PendingLinks {
    /// Create an empty registry
    ///
    /// # Arguments
    /// * `ttl` - How long a pending link remains valid (normally 10 minutes)
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Register a pending link for `identity` and return its state token.
    ///
    /// Every call yields a new token, even for an identity that already has
    /// one outstanding.
    pub fn begin_link(&self, identity: &str) -> String {
        loop {
            let token = generate_token();
            match self.entries.entry(token.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    slot.insert(PendingLink {
                        identity: identity.to_string(),
                        created_at: Instant::now(),
                    });
                    return token;
                }
            }
        }
    }

    /// Validate and consume a state token.
    ///
    /// The entry is removed before the expiry check, so a token can succeed at
    /// most once and an expired token is discarded on first sight. Returns the
    /// identity that started the link, or `None` if the token is unknown,
    /// already used, or expired.
    pub fn consume(&self, token: &str) -> Option<String> {
        let (_, entry) = self.entries.remove(token)?;

        if entry.is_expired(self.ttl) {
            return None;
        }

        Some(entry.identity)
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(self.ttl));
        before.saturating_sub(self.entries.len())
    }

    /// Number of live entries (including expired ones not yet swept)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 256 bits from the OS CSPRNG, URL-safe base64 without padding
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Background task to periodically sweep expired pending links
pub async fn run_pending_cleanup(registry: PendingLinks, interval: Duration) {
    let mut interval = tokio::time::interval(interval);

    loop {
        interval.tick().await;
        let removed = registry.cleanup_expired();
        tracing::debug!(
            removed,
            remaining = registry.len(),
            "Pending link cleanup complete"
        );
    }
}
