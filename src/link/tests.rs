use super::*;
use crate::config::GitHubConfig;
use crate::credentials::{CredentialStore, LinkedAccount};
use crate::oauth::{OAuthProvider, PendingLinks};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::time::Duration;

fn create_test_linker() -> AccountLinker {
    let mut config = GitHubConfig::default();
    config.client_id = "client-id".to_string();
    config.client_secret = "client-secret".to_string();

    let store = Arc::new(CredentialStore::new(":memory:", &BASE64.encode([0u8; 32])).unwrap());
    let coordinator = LinkCoordinator::new(
        OAuthProvider::from(&config),
        PendingLinks::new(Duration::from_secs(600)),
        store,
        Duration::from_secs(5),
    )
    .unwrap();
    let settings = ChannelSettingsStore::new(":memory:").unwrap();

    AccountLinker::new(Arc::new(coordinator), Arc::new(settings))
}

fn link(linker: &AccountLinker, identity: &str, account: &str, credential: &str) {
    linker
        .coordinator
        .store()
        .put(&LinkedAccount {
            identity: identity.to_string(),
            account_name: account.to_string(),
            credential: credential.to_string(),
        })
        .unwrap();
}

#[test]
fn test_start_link_returns_url_and_expiry() {
    let linker = create_test_linker();

    let invitation = linker.start_link("42").unwrap();

    assert!(invitation
        .url
        .starts_with("https://github.com/login/oauth/authorize?"));
    assert!(invitation.url.contains("state="));
    assert_eq!(invitation.expires_in_seconds, 600);
}

#[test]
fn test_start_link_twice_yields_distinct_urls() {
    let linker = create_test_linker();

    let first = linker.start_link("42").unwrap();
    let second = linker.start_link("42").unwrap();

    assert_ne!(first.url, second.url);
    assert_eq!(linker.coordinator.pending().len(), 2);
}

#[test]
fn test_start_link_rejects_bad_identity() {
    let linker = create_test_linker();

    assert!(matches!(
        linker.start_link(""),
        Err(LinkError::InvalidRequest(_))
    ));
    assert!(matches!(
        linker.start_link(&"9".repeat(MAX_ID_LEN + 1)),
        Err(LinkError::InvalidRequest(_))
    ));
    assert!(matches!(
        linker.start_link("42\n"),
        Err(LinkError::InvalidRequest(_))
    ));
    assert!(linker.coordinator.pending().is_empty());
}

#[test]
fn test_credential_for_unlinked_identity() {
    let linker = create_test_linker();

    assert!(matches!(
        linker.credential_for("42"),
        Err(LinkError::Unauthenticated)
    ));
    assert_eq!(linker.linked_account("42").unwrap(), None);
}

#[test]
fn test_credential_for_linked_identity() {
    let linker = create_test_linker();
    link(&linker, "42", "octocat", "gh_xyz");

    assert_eq!(linker.credential_for("42").unwrap(), "gh_xyz");
    assert_eq!(linker.linked_account("42").unwrap().as_deref(), Some("octocat"));
}

#[test]
fn test_unlink_is_idempotent() {
    let linker = create_test_linker();
    link(&linker, "42", "octocat", "gh_xyz");

    linker.unlink("42").unwrap();
    assert!(matches!(
        linker.credential_for("42"),
        Err(LinkError::Unauthenticated)
    ));

    // Second unlink is a no-op success
    linker.unlink("42").unwrap();
}

#[test]
fn test_channel_settings_defaults_and_updates() {
    let linker = create_test_linker();

    let settings = linker.channel_settings("chan").unwrap();
    assert!(settings.default_repo.is_empty());

    linker.set_default_repo("chan", "octo/widgets").unwrap();
    let updated = linker
        .set_default_project("chan", "https://github.com/orgs/octo/projects/5")
        .unwrap();

    assert_eq!(updated.default_repo, "octo/widgets");
    assert_eq!(updated.default_project, "octo/5");
    assert_eq!(linker.channel_settings("chan").unwrap(), updated);
}

#[test]
fn test_channel_settings_rejects_bad_input() {
    let linker = create_test_linker();

    assert!(matches!(
        linker.set_default_repo("chan", "widgets"),
        Err(LinkError::InvalidRequest(_))
    ));
    assert!(matches!(
        linker.set_default_project("chan", "https://github.com/orgs/octo"),
        Err(LinkError::InvalidRequest(_))
    ));
    assert!(linker.channel_settings("chan").unwrap().default_repo.is_empty());
}
