//! Standalone CAS client server.
//!
//! Serves the CAS service endpoint and proxy callback, plus `/login`,
//! `/logout`, `/whoami` and `/messages`. Sessions live in memory; PGT mappings live in
//! memory or in a database shared by all instances.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use cas_client::api::rest::{SessionCookie, register_routes};
use cas_client::infra::{
    ConfiguredAccountResolver, FlashNotifier, HyperTransport, InMemoryPgtStore,
    InMemorySessionStore, SeaOrmPgtStore,
};
use cas_client::{CasClientLocalClient, CasService, Collaborators};
use cas_client_sdk::PgtStore;
use clap::Parser;
use secrecy::ExposeSecret;
use time::OffsetDateTime;
use tokio::signal;
use tracing::{error, info};

mod config;
mod logging;
mod web;

use config::{AppConfig, StorageConfig};

#[derive(Parser, Debug)]
#[command(name = "cas-client-server")]
#[command(version, about, long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref()).context("loading configuration")?;
    logging::init(&cfg.logging)?;

    let app = build_app(&cfg).await?;
    if cli.check {
        info!("configuration is valid");
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    info!(addr = %cfg.bind_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let limits = cfg.session.limits();
    let sessions = Arc::new(InMemorySessionStore::with_limits(limits));
    let notifier = Arc::new(FlashNotifier::with_limits(limits));
    let deps = Collaborators {
        transport: Arc::new(HyperTransport::new()),
        pgt_store: build_pgt_store(&cfg.storage).await?,
        sessions: sessions.clone(),
        accounts: Arc::new(ConfiguredAccountResolver::from_config(&cfg.accounts)),
        notifier: notifier.clone(),
    };
    let svc = Arc::new(CasService::from_config(&cfg.cas, deps).context("invalid cas settings")?);
    let cookie = SessionCookie::new(cfg.session.cookie_name.clone());

    let pages = web::router(web::AppState {
        cas: Arc::new(CasClientLocalClient::new(svc.clone())),
        sessions,
        notifier,
        cookie: cookie.clone(),
    });
    Ok(register_routes(pages, svc, cookie))
}

async fn build_pgt_store(storage: &StorageConfig) -> anyhow::Result<Arc<dyn PgtStore>> {
    match storage {
        StorageConfig::Memory => Ok(Arc::new(InMemoryPgtStore::new())),
        StorageConfig::Database {
            dsn,
            pgt_max_age_secs,
        } => {
            let store = SeaOrmPgtStore::connect(dsn.expose_secret().to_owned())
                .await
                .context("connecting to the PGT database")?;
            let max_age = time::Duration::seconds(
                i64::try_from(*pgt_max_age_secs).context("storage.pgt_max_age_secs")?,
            );
            let cutoff = OffsetDateTime::now_utc()
                .checked_sub(max_age)
                .context("storage.pgt_max_age_secs out of range")?;
            let purged = store.purge_older_than(cutoff).await?;
            info!(purged, "purged stale PGT mappings");
            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;

    fn app_config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.cas.server.hostname = "cas.example.org".to_owned();
        cfg.cas.service.base_url = "https://app.example.org".to_owned();
        cfg
    }

    #[tokio::test]
    async fn login_redirects_to_cas_server() {
        let app = build_app(&app_config()).await.unwrap();
        let resp = app
            .oneshot(
                Request::get("/login?returnto=node%2F1&gateway")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let location = resp.headers()[header::LOCATION].to_str().unwrap();
        assert_eq!(
            location,
            "https://cas.example.org/cas/login?service=https%3A%2F%2Fapp.example.org%2Fcas%2Fservice%3Freturnto%3Dnode%252F1&gateway=true"
        );
    }

    #[tokio::test]
    async fn whoami_requires_a_session() {
        let app = build_app(&app_config()).await.unwrap();
        let resp = app
            .oneshot(Request::get("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    async fn get(app: &Router, uri: &str, cookie: &str) -> axum::response::Response {
        app.clone()
            .oneshot(
                Request::get(uri)
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn messages_are_shown_once() {
        let app = build_app(&app_config()).await.unwrap();
        let cookie = "cas_client_session=browser-1";

        let resp = get(&app, "/cas/service?ticket=", cookie).await;
        assert_eq!(resp.status(), StatusCode::FOUND);

        let notices = body_json(get(&app, "/messages", cookie).await).await;
        assert_eq!(notices.as_array().unwrap().len(), 1);
        assert_eq!(notices[0]["severity"], "error");

        let again = body_json(get(&app, "/messages", cookie).await).await;
        assert!(again.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn logout_drops_pending_messages() {
        let app = build_app(&app_config()).await.unwrap();
        let cookie = "cas_client_session=browser-1";
        get(&app, "/cas/service?ticket=", cookie).await;

        let resp = get(&app, "/logout", cookie).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let notices = body_json(get(&app, "/messages", cookie).await).await;
        assert!(notices.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_cas_settings_fail_startup() {
        let mut cfg = app_config();
        cfg.cas.server.hostname.clear();
        assert!(build_app(&cfg).await.is_err());
    }

    #[tokio::test]
    async fn database_storage_is_migrated_at_startup() {
        let mut cfg = app_config();
        cfg.storage = StorageConfig::Database {
            dsn: "sqlite::memory:".to_owned().into(),
            pgt_max_age_secs: 60,
        };
        assert!(build_app(&cfg).await.is_ok());
    }
}
