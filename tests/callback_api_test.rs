// Integration tests for the OAuth callback server and the link façade

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ghlink::config::LinkConfig;
use ghlink::credentials::CredentialStore;
use ghlink::oauth::LinkCoordinator;
use ghlink::settings::ChannelSettingsStore;
use ghlink::{api::create_router, AccountLinker, LinkError};
use mockito::{Mock, Server, ServerGuard};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    linker: AccountLinker,
}

fn create_test_app(server: &ServerGuard) -> TestApp {
    let mut config = LinkConfig::default();
    config.github.client_id = "client-id".to_string();
    config.github.client_secret = "client-secret".to_string();
    config.github.token_url = format!("{}/login/oauth/access_token", server.url());
    config.github.api_url = server.url();
    config.encryption_key = BASE64.encode([5u8; 32]);
    config.validate().unwrap();

    let store = Arc::new(CredentialStore::new(":memory:", &config.encryption_key).unwrap());
    let coordinator = Arc::new(LinkCoordinator::from_config(&config, store).unwrap());
    let settings = Arc::new(ChannelSettingsStore::new(":memory:").unwrap());

    TestApp {
        router: create_router(Arc::clone(&coordinator)),
        linker: AccountLinker::new(coordinator, settings),
    }
}

fn state_from(url: &str) -> String {
    url.split(['?', '&'])
        .find_map(|pair| pair.strip_prefix("state="))
        .expect("state parameter missing")
        .to_string()
}

async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn mock_github(server: &mut ServerGuard) -> Vec<Mock> {
    let token = server
        .mock("POST", "/login/oauth/access_token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"gh_xyz","token_type":"bearer","scope":"repo"}"#)
        .create_async()
        .await;
    let user = server
        .mock("GET", "/user")
        .match_header("authorization", "Bearer gh_xyz")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"login":"octocat"}"#)
        .create_async()
        .await;
    vec![token, user]
}

#[tokio::test]
async fn test_link_scenario_end_to_end() {
    let mut server = Server::new_async().await;
    let _mocks = mock_github(&mut server).await;
    let app = create_test_app(&server);

    assert!(matches!(
        app.linker.credential_for("42"),
        Err(LinkError::Unauthenticated)
    ));

    let invitation = app.linker.start_link("42").unwrap();
    assert_eq!(invitation.expires_in_seconds, 600);
    let state = state_from(&invitation.url);

    let (status, body) = get(&app.router, &format!("/callback?state={}&code=abc", state)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("octocat"));
    assert!(!body.contains(&state));
    assert!(!body.contains("gh_xyz"));

    assert_eq!(app.linker.credential_for("42").unwrap(), "gh_xyz");
    assert_eq!(
        app.linker.linked_account("42").unwrap().as_deref(),
        Some("octocat")
    );
}

#[tokio::test]
async fn test_replayed_callback_rejected() {
    let mut server = Server::new_async().await;
    let _mocks = mock_github(&mut server).await;
    let app = create_test_app(&server);

    let state = state_from(&app.linker.start_link("42").unwrap().url);
    let uri = format!("/callback?state={}&code=abc", state);

    let (status, _) = get(&app.router, &uri).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&app.router, &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("expired or was already used"));
    assert!(!body.contains(&state));
}

#[tokio::test]
async fn test_unknown_state_rejected() {
    let server = Server::new_async().await;
    let app = create_test_app(&server);

    let (status, body) = get(&app.router, "/callback?state=unknown&code=abc").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.contains("unknown"));
    assert!(matches!(
        app.linker.credential_for("42"),
        Err(LinkError::Unauthenticated)
    ));
}

#[tokio::test]
async fn test_missing_parameters_rejected() {
    let server = Server::new_async().await;
    let app = create_test_app(&server);

    let (status, _) = get(&app.router, "/callback").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app.router, "/callback?state=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app.router, "/callback?code=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_provider_denial_rejected() {
    let server = Server::new_async().await;
    let app = create_test_app(&server);
    let state = state_from(&app.linker.start_link("42").unwrap().url);

    let (status, body) = get(
        &app.router,
        &format!(
            "/callback?error=access_denied&error_description=User+cancelled&state={}",
            state
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.contains("access_denied"));
}

#[tokio::test]
async fn test_exchange_failure_returns_generic_message() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/login/oauth/access_token")
        .with_status(401)
        .with_body("very secret provider body")
        .create_async()
        .await;
    let app = create_test_app(&server);
    let state = state_from(&app.linker.start_link("42").unwrap().url);

    let (status, body) = get(&app.router, &format!("/callback?state={}&code=abc", state)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!body.contains("very secret provider body"));
    assert!(matches!(
        app.linker.credential_for("42"),
        Err(LinkError::Unauthenticated)
    ));
}

#[tokio::test]
async fn test_unlink_after_link() {
    let mut server = Server::new_async().await;
    let _mocks = mock_github(&mut server).await;
    let app = create_test_app(&server);

    let state = state_from(&app.linker.start_link("42").unwrap().url);
    get(&app.router, &format!("/callback?state={}&code=abc", state)).await;
    assert!(app.linker.credential_for("42").is_ok());

    app.linker.unlink("42").unwrap();
    assert!(matches!(
        app.linker.credential_for("42"),
        Err(LinkError::Unauthenticated)
    ));
    app.linker.unlink("42").unwrap();
}

#[tokio::test]
async fn test_health() {
    let server = Server::new_async().await;
    let app = create_test_app(&server);

    let (status, body) = get(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
}
