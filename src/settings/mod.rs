//! Per-channel defaults storage.
//!
//! Stores the default repository and project a chat channel works against.
//! Plain SQLite rows, no encryption: nothing in here is secret.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const PROJECT_URL_PREFIX: &str = "https://github.com/orgs/";

/// Defaults for a single chat channel.
///
/// Empty strings mean "not set".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSettings {
    pub channel_id: String,
    /// `owner/repo`
    pub default_repo: String,
    /// `org/number`
    pub default_project: String,
}

/// Persists channel settings in SQLite.
pub struct ChannelSettingsStore {
    conn: Mutex<Connection>,
}

impl ChannelSettingsStore {
    /// Opens (or creates) the database and ensures the table exists.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).with_context(|| {
            format!(
                "Failed to open settings DB at {}",
                db_path.as_ref().display()
            )
        })?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS channel_settings (
                channel_id      TEXT PRIMARY KEY,
                default_repo    TEXT NOT NULL DEFAULT '',
                default_project TEXT NOT NULL DEFAULT '',
                updated_at      TEXT NOT NULL
            );",
        )
        .context("Failed to create channel_settings table")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("channel settings lock poisoned"))
    }

    /// Returns the settings for a channel, or empty settings if none are stored.
    pub fn get(&self, channel_id: &str) -> Result<ChannelSettings> {
        let row: Option<(String, String)> = self
            .conn()?
            .query_row(
                "SELECT default_repo, default_project FROM channel_settings WHERE channel_id = ?1",
                params![channel_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("Failed to read channel settings")?;

        let (default_repo, default_project) = row.unwrap_or_default();

        Ok(ChannelSettings {
            channel_id: channel_id.to_string(),
            default_repo,
            default_project,
        })
    }

    /// Upserts both fields for a channel.
    pub fn save(&self, settings: &ChannelSettings) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO channel_settings (channel_id, default_repo, default_project, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(channel_id) DO UPDATE SET
                    default_repo = excluded.default_repo,
                    default_project = excluded.default_project,
                    updated_at = excluded.updated_at",
                params![
                    settings.channel_id,
                    settings.default_repo,
                    settings.default_project,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("Failed to save channel settings")?;

        Ok(())
    }
}

/// Checks a repository reference has the `owner/repo` shape.
pub fn validate_repo(repo: &str) -> Result<(), String> {
    match repo.trim().split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(())
        }
        _ => Err("Repository must be in format: owner/repo".to_string()),
    }
}

/// Normalises a project reference to `org/number`.
///
/// Accepts either `org/number` or a project URL of the form
/// `https://github.com/orgs/{org}/projects/{number}`. Anything else that is
/// not a URL is stored as given.
pub fn normalize_project(project: &str) -> Result<String, String> {
    let project = project.trim();

    let Some(rest) = project.strip_prefix(PROJECT_URL_PREFIX) else {
        if project.is_empty() {
            return Err("Project must not be empty".to_string());
        }
        return Ok(project.to_string());
    };

    let parts: Vec<&str> = rest.split('/').collect();
    match parts.as_slice() {
        [org, "projects", number, ..] if !org.is_empty() && !number.is_empty() => {
            Ok(format!("{}/{}", org, number))
        }
        _ => Err(
            "Invalid GitHub project URL format. Expected: https://github.com/orgs/{org}/projects/{number}"
                .to_string(),
        ),
    }
}
