use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::credentials::validate_key;

/// Complete service configuration.
///
/// Loaded from an optional TOML file, then overridden from environment
/// variables, then validated. Validation failures are fatal at startup.
#[derive(Clone, Deserialize)]
pub struct LinkConfig {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub link: LinkFlowConfig,
    /// Base64-encoded 32-byte AES-256 key
    #[serde(default)]
    pub encryption_key: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

/// GitHub OAuth application settings
#[derive(Clone, Deserialize)]
pub struct GitHubConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// REST API base used for the identity lookup
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

/// Callback server bind settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Timing of the link flow
#[derive(Debug, Clone, Deserialize)]
pub struct LinkFlowConfig {
    /// How long a pending link stays valid (seconds)
    #[serde(default = "default_state_ttl")]
    pub state_ttl_seconds: u64,
    /// How often expired pending links are swept (seconds)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
    /// Request timeout for token exchange and identity lookup (seconds)
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_seconds: u64,
}

fn default_database_path() -> String {
    "./bot.db".to_string()
}

fn default_redirect_url() -> String {
    "http://localhost:8080/callback".to_string()
}

fn default_scopes() -> Vec<String> {
    vec![
        "repo".to_string(),
        "user:email".to_string(),
        "read:org".to_string(),
    ]
}

fn default_auth_url() -> String {
    "https://github.com/login/oauth/authorize".to_string()
}

fn default_token_url() -> String {
    "https://github.com/login/oauth/access_token".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_state_ttl() -> u64 {
    600
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_provider_timeout() -> u64 {
    5
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: default_redirect_url(),
            scopes: default_scopes(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            api_url: default_api_url(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LinkFlowConfig {
    fn default() -> Self {
        Self {
            state_ttl_seconds: default_state_ttl(),
            cleanup_interval_seconds: default_cleanup_interval(),
            provider_timeout_seconds: default_provider_timeout(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            github: GitHubConfig::default(),
            server: ServerConfig::default(),
            link: LinkFlowConfig::default(),
            encryption_key: String::new(),
            database_path: default_database_path(),
        }
    }
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .field("scopes", &self.scopes)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl fmt::Debug for LinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkConfig")
            .field("github", &self.github)
            .field("server", &self.server)
            .field("link", &self.link)
            .field("encryption_key", &"<redacted>")
            .field("database_path", &self.database_path)
            .finish()
    }
}

impl LinkConfig {
    /// Override fields from process environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Override fields from a key lookup (env var names).
    ///
    /// Unset or empty values leave the current field untouched. A value that
    /// does not parse is an error naming the variable.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("GITHUB_CLIENT_ID") {
            self.github.client_id = v;
        }
        if let Some(v) = get("GITHUB_CLIENT_SECRET") {
            self.github.client_secret = v;
        }
        if let Some(v) = get("GITHUB_REDIRECT_URL") {
            self.github.redirect_url = v;
        }
        if let Some(v) = get("GITHUB_SCOPES") {
            self.github.scopes = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = get("GITHUB_AUTH_URL") {
            self.github.auth_url = v;
        }
        if let Some(v) = get("GITHUB_TOKEN_URL") {
            self.github.token_url = v;
        }
        if let Some(v) = get("GITHUB_API_URL") {
            self.github.api_url = v;
        }
        if let Some(v) = get("ENCRYPTION_KEY") {
            self.encryption_key = v;
        }
        if let Some(v) = get("OAUTH_SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("OAUTH_SERVER_PORT") {
            self.server.port = parse_var("OAUTH_SERVER_PORT", &v)?;
        }
        if let Some(v) = get("DATABASE_PATH") {
            self.database_path = v;
        }
        if let Some(v) = get("LINK_STATE_TTL_SECONDS") {
            self.link.state_ttl_seconds = parse_var("LINK_STATE_TTL_SECONDS", &v)?;
        }
        if let Some(v) = get("PROVIDER_TIMEOUT_SECONDS") {
            self.link.provider_timeout_seconds = parse_var("PROVIDER_TIMEOUT_SECONDS", &v)?;
        }
        Ok(())
    }

    /// Rejects configurations the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.github.client_id.is_empty() {
            bail!("GITHUB_CLIENT_ID is required");
        }
        if self.github.client_secret.is_empty() {
            bail!("GITHUB_CLIENT_SECRET is required");
        }
        if self.github.scopes.is_empty() {
            bail!("At least one GitHub scope is required");
        }
        if self.encryption_key.is_empty() {
            bail!("ENCRYPTION_KEY is required (base64-encoded 32-byte key)");
        }
        validate_key(&self.encryption_key).map_err(|e| anyhow!("ENCRYPTION_KEY: {}", e))?;
        if self.link.state_ttl_seconds == 0 {
            bail!("LINK_STATE_TTL_SECONDS must be greater than zero");
        }
        if self.link.provider_timeout_seconds == 0 {
            bail!("PROVIDER_TIMEOUT_SECONDS must be greater than zero");
        }
        if self.link.cleanup_interval_seconds == 0 {
            bail!("cleanup_interval_seconds must be greater than zero");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.link.state_ttl_seconds)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.link.provider_timeout_seconds)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow!("{}={:?} is invalid: {}", key, value, e))
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<LinkConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: LinkConfig = toml::from_str(&contents).context("Failed to parse config file")?;
    Ok(config)
}
