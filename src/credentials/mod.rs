//! Encrypted storage for linked GitHub accounts.
//!
//! One record per chat identity, holding the GitHub login in plaintext and
//! the OAuth bearer token encrypted with AES-256-GCM, backed by SQLite.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       CredentialStore                    │
//! │  - put / get / delete by identity        │
//! │  - Transparent encryption/decryption     │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//!    (encrypt)            (decrypt)
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       Encryption Module                  │
//! │  - AES-256-GCM                           │
//! │  - base64(nonce ‖ ciphertext)            │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       SQLite Database                    │
//! │  - linked_accounts table                 │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use ghlink::credentials::{CredentialStore, LinkedAccount};
//!
//! # fn main() -> anyhow::Result<()> {
//! let encryption_key = std::env::var("ENCRYPTION_KEY")?;
//! let store = CredentialStore::new("bot.db", &encryption_key)?;
//!
//! store.put(&LinkedAccount {
//!     identity: "42".to_string(),
//!     account_name: "octocat".to_string(),
//!     credential: "gho_xyz".to_string(),
//! })?;
//!
//! if let Some(account) = store.get("42")? {
//!     println!("Linked to {}", account.account_name);
//! }
//!
//! store.delete("42")?;
//! # Ok(())
//! # }
//! ```

use std::fmt;

mod encryption;
mod storage;

pub use encryption::validate_key;
pub use storage::CredentialStore;

/// A chat identity linked to a GitHub account.
///
/// Created when an OAuth callback completes; replaced wholesale on re-link.
#[derive(Clone, PartialEq, Eq)]
pub struct LinkedAccount {
    /// Chat-platform user id (primary key)
    pub identity: String,

    /// GitHub login resolved with the credential
    pub account_name: String,

    /// OAuth bearer token (encrypted at rest)
    pub credential: String,
}

impl fmt::Debug for LinkedAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedAccount")
            .field("identity", &self.identity)
            .field("account_name", &self.account_name)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// Credential store errors.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Bad encoding, truncated blob, wrong key or tag mismatch.
    #[error("decryption failed (wrong key or corrupted data)")]
    DecryptionFailed,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("credential store lock poisoned")]
    LockPoisoned,
}
