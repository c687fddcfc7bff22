//! Provider calls made while completing a link.
//!
//! Exchanges the authorization code for a bearer token, then uses the token to
//! resolve the GitHub login. Neither call is retried: codes are single-use.

use super::provider::OAuthProvider;
use anyhow::{anyhow, Context, Result};
use reqwest::{header, Client};
use serde::Deserialize;

/// OAuth token response.
///
/// GitHub answers a bad code with `200 OK` and an `error` field, so every
/// field is optional and the body is checked explicitly.
#[derive(Deserialize, Debug)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Subset of `GET /user`
#[derive(Deserialize, Debug)]
struct GitHubUser {
    login: String,
}

/// Exchange an authorization code for a bearer token.
pub async fn exchange_code_for_token(
    client: &Client,
    provider: &OAuthProvider,
    code: &str,
) -> Result<String> {
    let form = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", provider.redirect_url.as_str()),
        ("client_id", provider.client_id.as_str()),
        ("client_secret", provider.client_secret.as_str()),
    ];

    tracing::debug!(token_url = %provider.token_url, "Exchanging authorization code");

    let response = client
        .post(&provider.token_url)
        .header(header::ACCEPT, "application/json")
        .form(&form)
        .send()
        .await
        .context("Failed to send token exchange request")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!(
            "Token endpoint returned status {}: {}",
            status,
            body
        ));
    }

    let token_response: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;

    if let Some(error) = token_response.error {
        return Err(anyhow!(
            "Token endpoint rejected code: {} ({})",
            error,
            token_response.error_description.unwrap_or_default()
        ));
    }

    let access_token = token_response
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow!("Token response did not include an access_token"))?;

    tracing::debug!(
        token_type = ?token_response.token_type,
        scope = ?token_response.scope,
        "Token exchange successful"
    );

    Ok(access_token)
}

/// Resolve the GitHub login that owns `access_token`.
pub async fn fetch_account_name(
    client: &Client,
    api_url: &str,
    access_token: &str,
) -> Result<String> {
    let url = format!("{}/user", api_url);

    let response = client
        .get(&url)
        .bearer_auth(access_token)
        .header(header::ACCEPT, "application/vnd.github+json")
        .send()
        .await
        .context("Failed to send user lookup request")?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("GitHub user lookup returned status {}", status));
    }

    let user: GitHubUser = response
        .json()
        .await
        .context("Failed to parse user response")?;

    if user.login.is_empty() {
        return Err(anyhow!("GitHub user response had an empty login"));
    }

    Ok(user.login)
}
