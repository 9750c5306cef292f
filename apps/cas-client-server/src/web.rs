//! Application pages around the CAS endpoints: login, logout, current user,
//! pending notices.

use std::sync::Arc;

use axum::extract::{Extension, RawQuery};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use cas_client::api::rest::SessionCookie;
use cas_client::infra::{FlashNotifier, InMemorySessionStore};
use cas_client_sdk::{CasClientApi, Notifier, ServiceParams, SessionStore, Severity};
use serde::Serialize;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub cas: Arc<dyn CasClientApi>,
    pub sessions: Arc<InMemorySessionStore>,
    pub notifier: Arc<FlashNotifier>,
    pub cookie: SessionCookie,
}

#[derive(Debug, Serialize)]
struct WhoAmI {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct Notice {
    severity: Severity,
    message: String,
}

#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/logout", get(logout))
        .route("/whoami", get(whoami))
        .route("/messages", get(messages))
        .layer(Extension(state))
}

/// `?gateway` asks the CAS server not to prompt; other parameters come back
/// on the service URL.
#[allow(clippy::unused_async)]
async fn login(Extension(state): Extension<AppState>, RawQuery(query): RawQuery) -> Redirect {
    let mut params = ServiceParams::from_query(query.as_deref().unwrap_or_default());
    let gateway = params.remove("gateway").is_some();
    Redirect::to(&state.cas.login_url(&params, gateway))
}

async fn logout(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Redirect {
    if let Some(session) = state.cookie.read(&headers) {
        if let Err(e) = state.sessions.destroy(&session).await {
            warn!(error = %e, "cannot destroy session on logout");
        }
        state.notifier.discard(&session).await;
    }
    let params = ServiceParams::from_query(query.as_deref().unwrap_or_default());
    Redirect::to(&state.cas.logout_url(params.get("returnto")))
}

#[allow(clippy::unused_async)]
async fn whoami(Extension(state): Extension<AppState>, headers: HeaderMap) -> Response {
    let user = state
        .cookie
        .read(&headers)
        .and_then(|session| state.sessions.user(&session));
    match user {
        Some(user) => Json(WhoAmI {
            id: user.id,
            name: user.name,
        })
        .into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

/// Notices queued for the caller's session, oldest first. Each is shown once.
#[allow(clippy::unused_async)]
async fn messages(Extension(state): Extension<AppState>, headers: HeaderMap) -> Json<Vec<Notice>> {
    let pending = state
        .cookie
        .read(&headers)
        .map(|session| state.notifier.take_messages(&session))
        .unwrap_or_default();
    Json(
        pending
            .into_iter()
            .map(|(severity, message)| Notice { severity, message })
            .collect(),
    )
}
