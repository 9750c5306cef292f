#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Shared fixtures for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cas_client_sdk::{Transport, TransportError, TransportRequest};

use crate::config::{AccountsConfig, CasClientConfig};
use crate::domain::settings::ServiceConfiguration;
use crate::domain::url_builder::UrlBuilder;
use crate::domain::{CasService, Collaborators};
use crate::infra::{ConfiguredAccountResolver, FlashNotifier, InMemoryPgtStore, InMemorySessionStore};

/// CAS server `https://example.com/cas/`, application `https://example.com`,
/// service endpoint `/client`.
pub fn test_config() -> CasClientConfig {
    let mut cfg = CasClientConfig::default();
    cfg.server.hostname = "example.com".to_owned();
    cfg.server.port = Some(443);
    cfg.server.path = "/cas".to_owned();
    cfg.service.base_url = "https://example.com".to_owned();
    cfg.service.service_path = "/client".to_owned();
    cfg
}

pub fn settings(cfg: &CasClientConfig) -> Arc<ServiceConfiguration> {
    Arc::new(ServiceConfiguration::from_config(cfg).unwrap())
}

pub fn test_urls(cfg: CasClientConfig) -> UrlBuilder {
    UrlBuilder::new(settings(&cfg))
}

enum Reply {
    Body(String),
    Error(TransportError),
    Hang,
}

/// Scripted CAS server recording every request it receives.
pub struct FakeTransport {
    reply: Mutex<Reply>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl FakeTransport {
    fn with(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(reply),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(body: &str) -> Arc<Self> {
        Self::with(Reply::Body(body.to_owned()))
    }

    pub fn failing(error: TransportError) -> Arc<Self> {
        Self::with(Reply::Error(error))
    }

    pub fn hanging() -> Arc<Self> {
        Self::with(Reply::Hang)
    }

    pub fn set_reply(&self, body: &str) {
        *self.reply.lock().unwrap() = Reply::Body(body.to_owned());
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, request: &TransportRequest) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let outcome = match &*self.reply.lock().unwrap() {
            Reply::Body(body) => Some(Ok(body.clone())),
            Reply::Error(e) => Some(Err(e.clone())),
            Reply::Hang => None,
        };
        match outcome {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

/// A [`CasService`] wired to in-memory adapters and a [`FakeTransport`].
pub struct Harness {
    pub service: Arc<CasService>,
    pub sessions: Arc<InMemorySessionStore>,
    pub notifier: Arc<FlashNotifier>,
    pub pgt_store: Arc<InMemoryPgtStore>,
    pub transport: Arc<FakeTransport>,
}

impl Harness {
    pub fn new(cfg: CasClientConfig) -> Self {
        Self::with_accounts(cfg, &AccountsConfig::default())
    }

    pub fn with_accounts(cfg: CasClientConfig, accounts: &AccountsConfig) -> Self {
        let sessions = Arc::new(InMemorySessionStore::new());
        let notifier = Arc::new(FlashNotifier::new());
        let pgt_store = Arc::new(InMemoryPgtStore::new());
        let transport = FakeTransport::replying("no\n");
        let deps = Collaborators {
            transport: transport.clone(),
            pgt_store: pgt_store.clone(),
            sessions: sessions.clone(),
            accounts: Arc::new(ConfiguredAccountResolver::from_config(accounts)),
            notifier: notifier.clone(),
        };
        let service = Arc::new(CasService::from_config(&cfg, deps).unwrap());
        Self {
            service,
            sessions,
            notifier,
            pgt_store,
            transport,
        }
    }
}
