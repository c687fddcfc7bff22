//! SQLite-backed credential storage.
//!
//! One row per chat identity. The GitHub login is stored in plaintext, the
//! bearer token as an AES-256-GCM blob.

use super::{encryption, CredentialError, LinkedAccount};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Encrypted credential storage backed by SQLite.
///
/// # Schema
/// ```sql
/// CREATE TABLE linked_accounts (
///     identity TEXT PRIMARY KEY,
///     account_name TEXT NOT NULL,
///     credential TEXT NOT NULL,   -- base64(nonce ‖ ciphertext)
///     created_at TEXT NOT NULL,   -- RFC 3339
///     updated_at TEXT NOT NULL    -- RFC 3339
/// );
/// ```
///
/// # Thread Safety
/// - Connection is wrapped in a Mutex held for one statement at a time
/// - Encryption and decryption run outside the lock
pub struct CredentialStore {
    conn: Mutex<Connection>,
    encryption_key: Vec<u8>,
}

impl CredentialStore {
    /// Creates or opens a credential store.
    ///
    /// # Arguments
    /// * `db_path` - Path to SQLite database file (or `":memory:"`)
    /// * `encryption_key` - Base64-encoded 32-byte master key
    pub fn new<P: AsRef<Path>>(db_path: P, encryption_key: &str) -> Result<Self, CredentialError> {
        let key_bytes = encryption::validate_key(encryption_key)?;

        let conn = Connection::open(db_path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS linked_accounts (
                identity TEXT PRIMARY KEY,
                account_name TEXT NOT NULL,
                credential TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            encryption_key: key_bytes,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CredentialError> {
        self.conn.lock().map_err(|_| CredentialError::LockPoisoned)
    }

    /// Stores a linked account, replacing any previous record for the identity.
    ///
    /// The credential is re-encrypted with a fresh nonce on every call, even
    /// when it is unchanged.
    pub fn put(&self, account: &LinkedAccount) -> Result<(), CredentialError> {
        let encrypted = encryption::encrypt(&account.credential, &self.encryption_key)?;
        let now = Utc::now().to_rfc3339();

        self.conn()?.execute(
            r#"
            INSERT INTO linked_accounts (identity, account_name, credential, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT(identity) DO UPDATE SET
                account_name = excluded.account_name,
                credential = excluded.credential,
                updated_at = excluded.updated_at
            "#,
            params![account.identity, account.account_name, encrypted, now],
        )?;

        Ok(())
    }

    /// Retrieves and decrypts the linked account for an identity.
    ///
    /// # Returns
    /// * `Ok(Some(LinkedAccount))` - Record found and authenticated
    /// * `Ok(None)` - Identity is not linked
    /// * `Err(CredentialError::DecryptionFailed)` - Stored blob failed authentication
    pub fn get(&self, identity: &str) -> Result<Option<LinkedAccount>, CredentialError> {
        let row: Option<(String, String)> = self
            .conn()?
            .query_row(
                "SELECT account_name, credential FROM linked_accounts WHERE identity = ?1",
                params![identity],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((account_name, encrypted)) = row else {
            return Ok(None);
        };

        let credential = encryption::decrypt(&encrypted, &self.encryption_key)?;

        Ok(Some(LinkedAccount {
            identity: identity.to_string(),
            account_name,
            credential,
        }))
    }

    /// Returns the GitHub login for an identity without decrypting the token.
    pub fn account_name(&self, identity: &str) -> Result<Option<String>, CredentialError> {
        let name = self
            .conn()?
            .query_row(
                "SELECT account_name FROM linked_accounts WHERE identity = ?1",
                params![identity],
                |row| row.get(0),
            )
            .optional()?;

        Ok(name)
    }

    /// Deletes the record for an identity.
    ///
    /// # Returns
    /// * `Ok(true)` - A record was removed
    /// * `Ok(false)` - Nothing was stored for the identity
    pub fn delete(&self, identity: &str) -> Result<bool, CredentialError> {
        let rows_affected = self.conn()?.execute(
            "DELETE FROM linked_accounts WHERE identity = ?1",
            params![identity],
        )?;

        Ok(rows_affected > 0)
    }

    /// Number of linked identities.
    pub fn count(&self) -> Result<usize, CredentialError> {
        let count: i64 =
            self.conn()?
                .query_row("SELECT COUNT(*) FROM linked_accounts", [], |row| row.get(0))?;

        Ok(count as usize)
    }
}
