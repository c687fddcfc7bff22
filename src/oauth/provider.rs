//! GitHub OAuth application settings and authorization URL construction.

use crate::config::GitHubConfig;

/// Forces the provider's account picker instead of silently reusing whatever
/// GitHub session the browser already holds.
const PROMPT: &str = "select_account";

/// OAuth provider configuration
#[derive(Clone)]
pub struct OAuthProvider {
    /// OAuth authorization endpoint URL
    pub auth_url: String,

    /// OAuth token exchange endpoint URL
    pub token_url: String,

    /// REST API base URL (identity lookup)
    pub api_url: String,

    /// Redirect URI registered with the OAuth app
    pub redirect_url: String,

    /// Requested OAuth scopes
    pub scopes: Vec<String>,

    pub client_id: String,

    pub client_secret: String,
}

impl OAuthProvider {
    /// Build the authorization URL carrying `state` as the correlation token
    pub fn build_auth_url(&self, state: &str) -> String {
        let scopes = self.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&prompt={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(&scopes),
            urlencoding::encode(state),
            PROMPT,
        )
    }
}

impl From<&GitHubConfig> for OAuthProvider {
    fn from(config: &GitHubConfig) -> Self {
        Self {
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            redirect_url: config.redirect_url.clone(),
            scopes: config.scopes.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }
}
