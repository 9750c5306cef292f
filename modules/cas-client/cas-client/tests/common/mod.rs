#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cas_client::config::AccountsConfig;
use cas_client::infra::{
    ConfiguredAccountResolver, FlashNotifier, InMemoryPgtStore, InMemorySessionStore,
    SessionLimits,
};
use cas_client::{CasClientConfig, CasService, Collaborators};
use cas_client_sdk::{Transport, TransportError, TransportRequest};

/// CAS server answering from a queue of canned bodies, then with a
/// connection error.
#[derive(Default)]
pub struct ScriptedCasServer {
    replies: Mutex<VecDeque<String>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedCasServer {
    pub fn push(&self, body: &str) {
        self.replies.lock().unwrap().push_back(body.to_owned());
    }

    pub fn urls(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedCasServer {
    async fn get(&self, request: &TransportRequest) -> Result<String, TransportError> {
        self.seen.lock().unwrap().push(request.url.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Connect("no scripted reply".to_owned()))
    }
}

pub fn config() -> CasClientConfig {
    let mut cfg = CasClientConfig::default();
    cfg.server.hostname = "cas.example.org".to_owned();
    cfg.service.base_url = "https://app.example.org".to_owned();
    cfg
}

pub struct App {
    pub service: Arc<CasService>,
    pub cas: Arc<ScriptedCasServer>,
    pub sessions: Arc<InMemorySessionStore>,
    pub notifier: Arc<FlashNotifier>,
    pub pgt_store: Arc<InMemoryPgtStore>,
}

impl App {
    pub fn new(cfg: &CasClientConfig) -> Self {
        Self::with_limits(cfg, SessionLimits::default())
    }

    pub fn with_limits(cfg: &CasClientConfig, limits: SessionLimits) -> Self {
        let cas = Arc::new(ScriptedCasServer::default());
        let sessions = Arc::new(InMemorySessionStore::with_limits(limits));
        let notifier = Arc::new(FlashNotifier::with_limits(limits));
        let pgt_store = Arc::new(InMemoryPgtStore::new());
        let service = CasService::from_config(
            cfg,
            Collaborators {
                transport: cas.clone(),
                pgt_store: pgt_store.clone(),
                sessions: sessions.clone(),
                accounts: Arc::new(ConfiguredAccountResolver::from_config(
                    &AccountsConfig::default(),
                )),
                notifier: notifier.clone(),
            },
        )
        .expect("valid test configuration");
        Self {
            service: Arc::new(service),
            cas,
            sessions,
            notifier,
            pgt_store,
        }
    }
}

pub fn success(user: &str, pgt_iou: Option<&str>) -> String {
    let pgt = pgt_iou
        .map(|iou| format!("<cas:proxyGrantingTicket>{iou}</cas:proxyGrantingTicket>"))
        .unwrap_or_default();
    format!(
        r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationSuccess>
    <cas:user>{user}</cas:user>
    {pgt}
  </cas:authenticationSuccess>
</cas:serviceResponse>"#
    )
}

pub fn logout_request(session_index: &str) -> String {
    format!(
        r#"<samlp:LogoutRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="LR-1" Version="2.0" IssueInstant="2026-01-01T00:00:00Z">
  <saml:NameID xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion">@NOT_USED@</saml:NameID>
  <samlp:SessionIndex>{session_index}</samlp:SessionIndex>
</samlp:LogoutRequest>"#
    )
}
