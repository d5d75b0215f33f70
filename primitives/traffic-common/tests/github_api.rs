//! End-to-end tests of the GitHub accessor against a local stand-in server.
//!
//! The server answers `/repos/{org}/{repo}/traffic/{kind}` like GitHub does
//! and remembers the `Authorization` header of every request it receives.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use traffic_common::{
    ApiError, Fetch, GithubApi, TrafficTable, build_client, build_table, get_clones, get_views,
};

struct Fixture {
    status: Option<StatusCode>,
    auth_seen: Mutex<Vec<Option<String>>>,
}

fn traffic(kind: &str) -> Value {
    let days = [
        ("2024-05-01T00:00:00Z", 4),
        ("2024-05-02T00:00:00Z", 6),
        ("2024-05-03T00:00:00Z", 1),
    ];
    let entries: Vec<Value> = days
        .iter()
        .map(|(ts, count)| json!({"timestamp": ts, "count": count, "uniques": 1}))
        .collect();

    let mut body = json!({"count": 11, "uniques": 3});
    body[kind] = Value::Array(entries);
    body
}

async fn handle_traffic(
    State(fixture): State<Arc<Fixture>>,
    Path((_org, _repo, kind)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);
    fixture.auth_seen.lock().unwrap().push(auth);

    if let Some(status) = fixture.status {
        return (status, Json(json!({"message": "nope"}))).into_response();
    }

    match kind.as_str() {
        "views" | "clones" => Json(traffic(&kind)).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_github(status: Option<StatusCode>) -> (String, Arc<Fixture>) {
    let fixture = Arc::new(Fixture {
        status,
        auth_seen: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/repos/{org}/{repo}/traffic/{kind}", get(handle_traffic))
        .with_state(fixture.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}"), fixture)
}

fn accessor(base: &str, token: Option<&str>) -> GithubApi<Option<String>> {
    let client = build_client(Duration::from_secs(5)).expect("client");
    GithubApi::new(client, token.map(str::to_string)).with_base_url(base)
}

#[tokio::test]
async fn sends_token_header_when_configured() {
    let (base, fixture) = spawn_github(None).await;
    let api = accessor(&base, Some("s3cret"));

    let views = get_views(&api, "octo", "hello").await.expect("views");

    assert_eq!(views.len(), 3);
    assert_eq!(
        *fixture.auth_seen.lock().unwrap(),
        vec![Some("token s3cret".to_string())]
    );
}

#[tokio::test]
async fn omits_header_without_token() {
    let (base, fixture) = spawn_github(None).await;
    let api = accessor(&base, None);

    let clones = get_clones(&api, "octo", "hello").await.expect("clones");

    assert_eq!(clones[1].count, 6);
    assert_eq!(*fixture.auth_seen.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn returns_response_headers() {
    let (base, _fixture) = spawn_github(None).await;
    let api = accessor(&base, None);

    let response = api
        .fetch_json(&["repos", "octo", "hello", "traffic", "views"])
        .await
        .expect("fetch");

    assert_eq!(
        response.headers.get("content-type").map(String::as_str),
        Some("application/json")
    );
    assert_eq!(response.body["count"], 11);
}

#[tokio::test]
async fn forbidden_is_auth_error() {
    let (base, _fixture) = spawn_github(Some(StatusCode::FORBIDDEN)).await;
    let api = accessor(&base, None);

    let err = get_views(&api, "octo", "hello").await.expect_err("403");

    assert!(err.is_auth());
}

#[tokio::test]
async fn other_status_is_http_error() {
    let (base, _fixture) = spawn_github(Some(StatusCode::NOT_FOUND)).await;
    let api = accessor(&base, None);

    let err = get_views(&api, "octo", "missing").await.expect_err("404");

    match err {
        ApiError::Http { status, url, .. } => {
            assert_eq!(status, 404);
            assert!(url.ends_with("/repos/octo/missing/traffic/views"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn builds_table_from_server() {
    let (base, fixture) = spawn_github(None).await;
    let api = accessor(&base, Some("t"));

    let table = build_table(&api, "octo", "hello", None)
        .await
        .expect("build")
        .expect("table");

    assert_eq!(table.len(), 2);
    let first = table.rows()[0];
    assert_eq!(first.count_view, Some(4));
    assert_eq!(first.count_clone, Some(4));
    assert_eq!(fixture.auth_seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn forbidden_build_keeps_old_table() {
    let (base, _fixture) = spawn_github(Some(StatusCode::FORBIDDEN)).await;
    let api = accessor(&base, None);
    let old = TrafficTable::new();

    let table = build_table(&api, "octo", "hello", Some(old.clone()))
        .await
        .expect("403 is recovered");

    assert_eq!(table, Some(old));
}
