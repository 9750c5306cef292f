use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use super::handlers;
use super::session_cookie::SessionCookie;
use crate::domain::service::CasService;

/// Mount the service endpoint (GET and POST) and the proxy callback at the
/// configured paths.
#[must_use]
pub fn register_routes(router: Router, svc: Arc<CasService>, cookie: SessionCookie) -> Router {
    let settings = svc.settings();
    let service_path = settings.service_path.clone();
    let callback_path = settings.proxy_callback_path.clone();

    tracing::debug!(
        service_path = %service_path,
        callback_path = %callback_path,
        "registering CAS client routes"
    );

    let cas_routes = Router::new()
        .route(
            &service_path,
            get(handlers::service).post(handlers::service),
        )
        .route(&callback_path, get(handlers::proxy_callback))
        .layer(Extension(svc))
        .layer(Extension(cookie));

    router.merge(cas_routes)
}
