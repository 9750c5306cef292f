//! Wiring of the CAS client components.

use std::sync::Arc;

use cas_client_sdk::{
    AccountResolver, Notifier, PgtStore, ServiceParams, SessionId, SessionStore, Transport,
};
use tracing::info;

use super::entry_point::{InboundRequest, ProtocolEntryPoint, ServiceOutcome};
use super::error::DomainError;
use super::login::LoginOrchestrator;
use super::proxy::{CallbackOutcome, ProxyManager};
use super::settings::ServiceConfiguration;
use super::slo::SingleLogoutHandler;
use super::url_builder::UrlBuilder;
use super::validator::TicketValidator;
use crate::config::CasClientConfig;

/// Everything the CAS client needs from the host application.
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub pgt_store: Arc<dyn PgtStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub accounts: Arc<dyn AccountResolver>,
    pub notifier: Arc<dyn Notifier>,
}

/// The CAS client: protocol entry point, proxy callback, and proxy tickets.
pub struct CasService {
    settings: Arc<ServiceConfiguration>,
    urls: UrlBuilder,
    proxy: Arc<ProxyManager>,
    entry_point: ProtocolEntryPoint,
}

impl CasService {
    #[must_use]
    pub fn new(settings: ServiceConfiguration, deps: Collaborators) -> Self {
        let settings = Arc::new(settings);
        let proxy = Arc::new(ProxyManager::new(
            settings.clone(),
            deps.pgt_store,
            deps.sessions.clone(),
            deps.transport.clone(),
        ));
        let validator = TicketValidator::new(settings.clone(), deps.transport);
        let login = LoginOrchestrator::new(
            settings.clone(),
            deps.accounts,
            deps.sessions.clone(),
            proxy.clone(),
        );
        let slo = SingleLogoutHandler::new(deps.sessions.clone(), deps.notifier.clone());
        let entry_point = ProtocolEntryPoint::new(
            settings.clone(),
            validator,
            login,
            slo,
            deps.sessions,
            deps.notifier,
        );
        Self {
            urls: UrlBuilder::new(settings.clone()),
            settings,
            proxy,
            entry_point,
        }
    }

    /// Validate `cfg` and build the service.
    ///
    /// # Errors
    ///
    /// `Configuration` when the configuration is invalid.
    pub fn from_config(cfg: &CasClientConfig, deps: Collaborators) -> Result<Self, DomainError> {
        let settings = ServiceConfiguration::from_config(cfg)?;
        info!(
            server = %settings.server_base_url,
            version = %settings.version,
            proxy_initiator = settings.is_proxy_initiator,
            can_be_proxied = settings.can_be_proxied,
            "CAS client configured"
        );
        Ok(Self::new(settings, deps))
    }

    #[must_use]
    pub fn settings(&self) -> &ServiceConfiguration {
        &self.settings
    }

    #[must_use]
    pub fn urls(&self) -> &UrlBuilder {
        &self.urls
    }

    pub async fn handle_service_request(&self, request: InboundRequest) -> ServiceOutcome {
        self.entry_point.handle(request).await
    }

    /// # Errors
    ///
    /// `InvalidRequest` for incomplete callbacks, `Storage` when the PGT
    /// cannot be stored.
    #[tracing::instrument(skip_all, name = "cas_proxy_callback")]
    pub async fn handle_proxy_callback(
        &self,
        pgt_iou: Option<&str>,
        pgt: Option<&str>,
    ) -> Result<CallbackOutcome, DomainError> {
        self.proxy.receive_proxy_callback(pgt_iou, pgt).await
    }

    /// # Errors
    ///
    /// See [`ProxyManager::request_proxy_ticket`].
    #[tracing::instrument(skip_all, fields(target_service = %target_service))]
    pub async fn proxy_ticket(
        &self,
        session: &SessionId,
        target_service: &str,
    ) -> Result<String, DomainError> {
        self.proxy
            .request_proxy_ticket(session, target_service)
            .await
    }

    #[must_use]
    pub fn login_url(&self, params: &ServiceParams, gateway: bool) -> String {
        self.urls.login_url(params, gateway)
    }

    #[must_use]
    pub fn logout_url(&self, return_to: Option<&str>) -> String {
        self.urls.logout_url(return_to)
    }
}
