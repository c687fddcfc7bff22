//! GET /callback
//!
//! Receives the provider redirect, completes the link and shows the user a
//! short confirmation page. Error responses carry only a generic message.

use crate::error::LinkError;
use crate::oauth::LinkCoordinator;
use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// OAuth callback query parameters
#[derive(Debug, Default, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

pub(super) async fn oauth_callback(
    State(coordinator): State<Arc<LinkCoordinator>>,
    Query(callback): Query<OAuthCallback>,
) -> Result<Html<String>, LinkError> {
    debug!("OAuth callback received");

    // User declined on the provider's consent screen
    if let Some(error) = callback.error {
        let description = callback.error_description.unwrap_or_default();
        warn!(error = %error, description = %description, "OAuth authorization denied");
        return Err(LinkError::InvalidRequest(format!(
            "authorization denied: {}",
            error
        )));
    }

    let linked = coordinator
        .handle_callback(callback.state.as_deref(), callback.code.as_deref())
        .await?;

    Ok(Html(success_page(&linked.account_name)))
}

fn success_page(account_name: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html><head><meta charset=\"utf-8\"><title>GitHub account linked</title></head>\n",
            "<body><h1>Linked to <strong>{}</strong></h1>\n",
            "<p>You can close this window and return to the chat.</p></body></html>\n",
        ),
        escape_html(account_name)
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
