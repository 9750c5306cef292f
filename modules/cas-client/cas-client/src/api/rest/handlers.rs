use std::sync::Arc;

use axum::extract::{Extension, Query, RawQuery};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use cas_client_sdk::ServiceParams;
use serde::Deserialize;
use tracing::{debug, warn};

use super::session_cookie::SessionCookie;
use crate::domain::entry_point::{InboundRequest, LOGOUT_REQUEST_PARAM, ServiceOutcome};
use crate::domain::error::DomainError;
use crate::domain::service::CasService;

pub const PROXY_SUCCESS_BODY: &str = "<?xml version=\"1.0\"?>\n\
<casClient:proxySuccess xmlns:casClient=\"http://www.yale.edu/tp/casClient\"/>\n";

const FORWARDED_PROTO: &str = "x-forwarded-proto";

#[derive(Debug, Deserialize)]
struct LogoutForm {
    #[serde(rename = "logoutRequest")]
    logout_request: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProxyCallbackQuery {
    #[serde(rename = "pgtIou")]
    pub pgt_iou: Option<String>,
    #[serde(rename = "pgtId")]
    pub pgt_id: Option<String>,
}

/// Protocol entry point: return from login, single logout, or neither.
#[tracing::instrument(skip_all, fields(method = %method))]
pub async fn service(
    Extension(svc): Extension<Arc<CasService>>,
    Extension(cookie): Extension<SessionCookie>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (session, fresh) = cookie.resolve(&headers);
    let logout_request = if method == Method::POST {
        logout_request(&body)
    } else {
        None
    };

    let request = InboundRequest {
        session: session.clone(),
        query: ServiceParams::from_query(query.as_deref().unwrap_or_default()),
        logout_request,
    };

    match svc.handle_service_request(request).await {
        ServiceOutcome::Acknowledged => StatusCode::OK.into_response(),
        ServiceOutcome::Redirect {
            location,
            session: issued,
        } => {
            let mut resp = (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
            let to_send = issued.or_else(|| fresh.then_some(session));
            if let Some(id) = to_send
                && let Some(value) = cookie.set_cookie(&id)
            {
                resp.headers_mut().insert(header::SET_COOKIE, value);
            }
            resp
        }
    }
}

fn logout_request(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    match serde_urlencoded::from_bytes::<LogoutForm>(body) {
        Ok(form) => form.logout_request,
        Err(e) => {
            debug!(error = %e, param = LOGOUT_REQUEST_PARAM, "unreadable form body");
            None
        }
    }
}

/// Endpoint the CAS server calls to deliver a proxy-granting ticket.
///
/// # Errors
///
/// Incomplete callbacks (400) and PGT store failures (503).
#[tracing::instrument(skip_all)]
pub async fn proxy_callback(
    Extension(svc): Extension<Arc<CasService>>,
    headers: HeaderMap,
    Query(query): Query<ProxyCallbackQuery>,
) -> Result<Response, DomainError> {
    if forwarded_over_plain_http(&headers) {
        warn!("proxy callback received over plain http");
        return Ok(StatusCode::FORBIDDEN.into_response());
    }

    svc.handle_proxy_callback(query.pgt_iou.as_deref(), query.pgt_id.as_deref())
        .await?;

    Ok((
        [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
        PROXY_SUCCESS_BODY,
    )
        .into_response())
}

fn forwarded_over_plain_http(headers: &HeaderMap) -> bool {
    headers
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("http"))
}
