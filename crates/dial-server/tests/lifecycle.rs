//! End-to-end lifecycle tests driving the real router over HTTP (spec.md §8), grounded
//! on `octofhir-server`'s integration-test pattern: bind an ephemeral `TcpListener`,
//! spawn `axum::serve` in the background, then drive it with `reqwest`.

use std::net::SocketAddr;
use std::sync::Arc;

use dial_core::{AppState, AppStatus};
use dial_registry::AppRegistration;
use dial_server::config::DialConfig;
use dial_server::platform::fake::FakePlatformLauncher;
use dial_server::router::build_router;
use dial_server::server::ServerState;
use dial_statecache::AppStateCache;
use tokio::task::JoinHandle;

struct TestServer {
    base_url: String,
    state: ServerState,
    _handle: JoinHandle<()>,
}

async fn spawn_server(local_only: bool) -> TestServer {
    let config = Arc::new(DialConfig::default());
    let cache = AppStateCache::new();
    let platform = Arc::new(FakePlatformLauncher::new(cache));
    let state = ServerState::new(config, platform, local_only);

    let router = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().unwrap();
    // The single ephemeral listener stands in for both the public and loopback
    // servers here, so both recorded ports point at it (spec.md §4.7 LAUNCH step 3).
    state.ports.set_public(addr.port());
    state.ports.set_local(addr.port());

    let handle = tokio::spawn(async move {
        let _ = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;
    });

    TestServer {
        base_url: format!("http://{addr}"),
        state,
        _handle: handle,
    }
}

fn register(server: &TestServer, registration: AppRegistration) {
    server.state.registry.register(registration).unwrap();
}

#[tokio::test]
async fn launch_creates_running_instance_and_get_reports_it() {
    let server = spawn_server(false).await;
    register(&server, AppRegistration::new("Netflix"));

    let client = reqwest::Client::new();
    let launch = client
        .post(format!("{}/apps/Netflix", server.base_url))
        .body("v=1")
        .send()
        .await
        .unwrap();
    assert_eq!(launch.status(), reqwest::StatusCode::CREATED);
    let location = launch.headers().get(reqwest::header::LOCATION).unwrap();
    assert!(location.to_str().unwrap().ends_with("/apps/Netflix/run"));

    let get = client
        .get(format!("{}/apps/Netflix", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(get.status(), reqwest::StatusCode::OK);
    let body = get.text().await.unwrap();
    assert!(body.contains("<state>running</state>"));
    assert!(body.contains("<link rel=\"run\" href=\"run\"/>"));
}

#[tokio::test]
async fn get_unregistered_app_returns_404() {
    let server = spawn_server(false).await;
    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/apps/Hulu", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stop_on_an_app_that_never_launched_is_not_found() {
    let server = spawn_server(false).await;
    register(&server, AppRegistration::new("Netflix"));

    let client = reqwest::Client::new();
    let resp = client
        .delete(format!("{}/apps/Netflix/run", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn launch_then_hide_then_stop_round_trip() {
    let server = spawn_server(false).await;
    register(&server, AppRegistration::new("Netflix"));
    let client = reqwest::Client::new();

    let launch = client
        .post(format!("{}/apps/Netflix", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(launch.status(), reqwest::StatusCode::CREATED);

    let hide = client
        .post(format!("{}/apps/Netflix/run/hide", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(hide.status(), reqwest::StatusCode::OK);

    let get = client
        .get(format!("{}/apps/Netflix", server.base_url))
        .send()
        .await
        .unwrap();
    let body = get.text().await.unwrap();
    assert!(body.contains("<state>hidden</state>"));

    let stop = client
        .delete(format!("{}/apps/Netflix/run", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(stop.status(), reqwest::StatusCode::OK);

    let get_after_stop = client
        .get(format!("{}/apps/Netflix", server.base_url))
        .send()
        .await
        .unwrap();
    let body = get_after_stop.text().await.unwrap();
    assert!(body.contains("<state>stopped</state>"));
    assert!(!body.contains("<link"));
}

#[tokio::test]
async fn origin_not_on_the_allow_list_is_rejected() {
    let server = spawn_server(false).await;
    register(
        &server,
        AppRegistration::new("Netflix").with_allowed_origins(vec!["netflix.com".to_string()]),
    );

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/apps/Netflix", server.base_url))
        .header(reqwest::header::ORIGIN, "https://evil.example")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
    assert_eq!(
        resp.headers().get(reqwest::header::CONNECTION).unwrap(),
        "close"
    );
}

#[tokio::test]
async fn options_request_reports_allowed_methods() {
    let server = spawn_server(false).await;
    register(&server, AppRegistration::new("Netflix"));

    let client = reqwest::Client::new();
    let resp = client
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/apps/Netflix", server.base_url),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);
    assert_eq!(
        resp.headers()
            .get("access-control-allow-methods")
            .unwrap(),
        "GET, POST, OPTIONS"
    );
}

#[tokio::test]
async fn dial_data_is_rejected_on_the_public_listener() {
    let server = spawn_server(false).await;
    register(&server, AppRegistration::new("Netflix").with_additional_data(true));

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/apps/Netflix/dial_data", server.base_url))
        .body("k=v")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn dial_data_set_on_loopback_listener_is_reflected_in_get_app() {
    let server = spawn_server(true).await;
    register(&server, AppRegistration::new("Netflix").with_additional_data(true));
    // A real app must be RUNNING for GET_app to be meaningful, but additionalData
    // is surfaced regardless of state (spec.md §4.9).
    server
        .state
        .state_cache
        .update(AppStatus::new("Netflix", AppState::Running))
        .await;

    let client = reqwest::Client::new();
    let set = client
        .post(format!("{}/apps/Netflix/dial_data", server.base_url))
        .header(
            reqwest::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body("pairingCode=abc123")
        .send()
        .await
        .unwrap();
    assert_eq!(set.status(), reqwest::StatusCode::OK);

    let get = client
        .get(format!("{}/apps/Netflix", server.base_url))
        .send()
        .await
        .unwrap();
    let body = get.text().await.unwrap();
    assert!(body.contains("<additionalData>pairingCode=abc123</additionalData>"));

    let clear = client
        .post(format!("{}/apps/Netflix/dial_data", server.base_url))
        .body("")
        .send()
        .await
        .unwrap();
    assert_eq!(clear.status(), reqwest::StatusCode::OK);

    let get_after_clear = client
        .get(format!("{}/apps/Netflix", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(!get_after_clear.text().await.unwrap().contains("<additionalData>"));
}

#[tokio::test]
async fn system_endpoint_invokes_the_platform_hook() {
    let server = spawn_server(false).await;
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/apps/system?action=reboot", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn malformed_path_is_rejected() {
    let server = spawn_server(false).await;
    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/apps/Netflix/", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_IMPLEMENTED);
}
