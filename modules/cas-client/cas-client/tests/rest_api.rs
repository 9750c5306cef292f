#![allow(clippy::unwrap_used, clippy::expect_used)]

//! The axum adapter, exercised with `tower::ServiceExt::oneshot`.

mod common;

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use cas_client::api::rest::handlers::PROXY_SUCCESS_BODY;
use cas_client::api::rest::{SessionCookie, register_routes};
use cas_client::infra::SessionLimits;
use cas_client_sdk::SessionId;
use tower::ServiceExt;

use common::{App, config, logout_request, success};

fn router(app: &App) -> Router {
    register_routes(Router::new(), app.service.clone(), SessionCookie::new("sid"))
}

async fn body_text(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn anonymous_visit_redirects_and_starts_a_session() {
    let app = App::new(&config());
    let resp = router(&app)
        .oneshot(
            Request::get("/cas/service?returnto=node%2F7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers()[header::LOCATION],
        "https://app.example.org/node/7"
    );
    let cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("sid="));
}

fn session_cookie(resp: &Response) -> SessionId {
    let header = resp.headers()[header::SET_COOKIE].to_str().unwrap();
    let value = header
        .strip_prefix("sid=")
        .and_then(|rest| rest.split(';').next())
        .unwrap();
    SessionId::new(value)
}

#[tokio::test]
async fn login_replaces_the_presented_session_cookie() {
    let app = App::new(&config());
    app.cas.push(&success("alice", None));

    let resp = router(&app)
        .oneshot(
            Request::get("/cas/service?ticket=ST-1")
                .header(header::COOKIE, "sid=attacker-planted-id")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FOUND);
    let issued = session_cookie(&resp);
    assert_ne!(issued, SessionId::new("attacker-planted-id"));
    assert!(app.sessions.user(&SessionId::new("attacker-planted-id")).is_none());
    assert_eq!(app.sessions.user(&issued).unwrap().name, "alice");
}

#[tokio::test]
async fn failed_login_keeps_the_presented_cookie() {
    let app = App::new(&config());
    let resp = router(&app)
        .oneshot(
            Request::get("/cas/service?ticket=ST-1")
                .header(header::COOKIE, "sid=browser-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(app.notifier.take_messages(&SessionId::new("browser-1")).len(), 1);
}

#[tokio::test]
async fn logout_post_answers_empty_200() {
    let app = App::new(&config());
    app.cas.push(&success("alice", None));
    let login = router(&app)
        .oneshot(
            Request::get("/cas/service?ticket=ST-9")
                .header(header::COOKIE, "sid=browser-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let session = session_cookie(&login);

    let form = serde_urlencoded::to_string([("logoutRequest", logout_request("ST-9"))]).unwrap();
    let resp = router(&app)
        .oneshot(
            Request::post("/cas/service")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.is_empty());
    assert!(!app.sessions.contains(&session));
}

#[tokio::test]
async fn garbage_logout_post_still_answers_200() {
    let app = App::new(&config());
    let resp = router(&app)
        .oneshot(
            Request::post("/cas/service")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("logoutRequest=%3Cbroken"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.is_empty());
}

#[tokio::test]
async fn proxy_callback_probe_and_delivery() {
    let app = App::new(&config());

    let probe = router(&app)
        .oneshot(Request::get("/cas/proxy-callback").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(probe.status(), StatusCode::OK);
    assert!(probe.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/xml"));
    assert_eq!(body_text(probe).await, PROXY_SUCCESS_BODY);
    assert!(app.pgt_store.is_empty());

    let delivery = router(&app)
        .oneshot(
            Request::get("/cas/proxy-callback?pgtIou=PGTIOU-1&pgtId=PGT-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(delivery.status(), StatusCode::OK);
    assert_eq!(app.pgt_store.len(), 1);
}

#[tokio::test]
async fn incomplete_proxy_callback_is_a_bad_request() {
    let app = App::new(&config());
    let resp = router(&app)
        .oneshot(
            Request::get("/cas/proxy-callback?pgtIou=PGTIOU-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(app.pgt_store.is_empty());
}

#[tokio::test]
async fn proxy_callback_over_plain_http_is_forbidden() {
    let app = App::new(&config());
    let resp = router(&app)
        .oneshot(
            Request::get("/cas/proxy-callback?pgtIou=PGTIOU-1&pgtId=PGT-1")
                .header("x-forwarded-proto", "http")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(app.pgt_store.is_empty());
}

#[tokio::test]
async fn anonymous_traffic_cannot_grow_session_state_without_bound() {
    let limits = SessionLimits {
        max_sessions: 5,
        idle_timeout: Duration::from_secs(3600),
    };
    let app = App::with_limits(&config(), limits);
    for _ in 0..50 {
        let resp = router(&app)
            .oneshot(
                Request::get("/cas/service?ticket=&cas_temp_disable=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
    }
    assert_eq!(app.sessions.len(), 5);
    assert_eq!(app.notifier.pending_sessions(), 5);
}
