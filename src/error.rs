//! Error taxonomy for the account-linking core.
//!
//! [`LinkError`] is the only error type that crosses the façade and the
//! callback HTTP boundary. Provider, transport and storage failures are
//! translated into it before they leave the coordinator.

use crate::credentials::CredentialError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, warn};

/// Errors surfaced by the linking flow.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Callback or façade parameters are missing or malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Correlation token is unknown, already used, or past its TTL.
    #[error("expired or invalid state")]
    ExpiredOrInvalidState,

    /// The provider's token endpoint rejected the code or could not be reached.
    #[error("code exchange failed: {0}")]
    ExchangeFailed(String),

    /// The fresh credential could not be used to resolve the remote account.
    #[error("identity lookup failed: {0}")]
    IdentityLookupFailed(String),

    /// A stored credential failed authentication on decrypt.
    #[error("stored credential could not be decrypted")]
    DecryptionFailed,

    /// No credential is on file for the identity.
    #[error("identity is not linked")]
    Unauthenticated,

    /// The credential database failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl LinkError {
    /// Short, non-technical text safe to show an end user.
    ///
    /// Never includes tokens, credentials or provider response bodies.
    pub fn user_message(&self) -> &'static str {
        match self {
            LinkError::InvalidRequest(_) => "The link request was incomplete. Please start again.",
            LinkError::ExpiredOrInvalidState => {
                "This link has expired or was already used. Please request a new one."
            }
            LinkError::ExchangeFailed(_) => "GitHub did not accept the authorization. Please try again.",
            LinkError::IdentityLookupFailed(_) => {
                "Could not read your GitHub profile. Please try again."
            }
            LinkError::DecryptionFailed => {
                "Your stored GitHub authorization is unreadable. Please unlink and link again."
            }
            LinkError::Unauthenticated => "Please link your GitHub account first.",
            LinkError::Storage(_) => "Something went wrong on our side. Please try again later.",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            LinkError::InvalidRequest(_) | LinkError::ExpiredOrInvalidState => {
                StatusCode::BAD_REQUEST
            }
            LinkError::ExchangeFailed(_) | LinkError::IdentityLookupFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
            LinkError::Unauthenticated => StatusCode::UNAUTHORIZED,
            LinkError::DecryptionFailed | LinkError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<CredentialError> for LinkError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::DecryptionFailed => LinkError::DecryptionFailed,
            other => LinkError::Storage(other.to_string()),
        }
    }
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl IntoResponse for LinkError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            LinkError::InvalidRequest(_) | LinkError::ExpiredOrInvalidState => {
                warn!(%status, error = %self, "link request rejected");
            }
            LinkError::Unauthenticated => {}
            _ => error!(%status, error = %self, "link request failed"),
        }

        let body = Json(ErrorResponse {
            error: self.user_message(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_provider_detail() {
        let err = LinkError::ExchangeFailed("bad_verification_code: secret body".to_string());
        assert!(!err.user_message().contains("bad_verification_code"));
        assert!(err.to_string().contains("bad_verification_code"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            LinkError::InvalidRequest("missing code".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(LinkError::ExpiredOrInvalidState.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            LinkError::ExchangeFailed("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            LinkError::IdentityLookupFailed("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(LinkError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            LinkError::DecryptionFailed.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_credential_error_translation() {
        let err: LinkError = CredentialError::DecryptionFailed.into();
        assert!(matches!(err, LinkError::DecryptionFailed));

        let err: LinkError = CredentialError::Encryption("cipher".to_string()).into();
        assert!(matches!(err, LinkError::Storage(_)));
    }
}
