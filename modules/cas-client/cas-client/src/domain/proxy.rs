//! Proxy-granting ticket handshake and proxy ticket acquisition.

use std::sync::Arc;

use cas_client_sdk::{PgtMapping, PgtStore, SessionId, SessionStore, Transport};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use super::error::DomainError;
use super::response::ProxyResponse;
use super::settings::ServiceConfiguration;
use super::url_builder::UrlBuilder;
use super::validator::{call_cas_server, ticket_prefix};

/// What a proxy callback request turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Reachability check by the CAS server, nothing stored.
    Probe,
    Stored,
}

pub struct ProxyManager {
    settings: Arc<ServiceConfiguration>,
    urls: UrlBuilder,
    pgt_store: Arc<dyn PgtStore>,
    sessions: Arc<dyn SessionStore>,
    transport: Arc<dyn Transport>,
}

impl ProxyManager {
    #[must_use]
    pub fn new(
        settings: Arc<ServiceConfiguration>,
        pgt_store: Arc<dyn PgtStore>,
        sessions: Arc<dyn SessionStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            urls: UrlBuilder::new(settings.clone()),
            settings,
            pgt_store,
            sessions,
            transport,
        }
    }

    /// Store a PGT delivered by the CAS server. Repeated IOUs overwrite.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` when only one parameter is present or either is
    /// empty; `Storage` when the mapping cannot be saved.
    pub async fn receive_proxy_callback(
        &self,
        pgt_iou: Option<&str>,
        pgt: Option<&str>,
    ) -> Result<CallbackOutcome, DomainError> {
        let (pgt_iou, pgt) = match (pgt_iou, pgt) {
            (None, None) => {
                debug!("proxy callback probe");
                return Ok(CallbackOutcome::Probe);
            }
            (Some(iou), Some(pgt)) if !iou.trim().is_empty() && !pgt.trim().is_empty() => {
                (iou.trim(), pgt.trim())
            }
            _ => {
                return Err(DomainError::invalid_request(
                    "pgtIou and pgtId must both be non-empty",
                ));
            }
        };

        self.pgt_store
            .save(PgtMapping::new(
                pgt_iou,
                SecretString::from(pgt.to_owned()),
            ))
            .await?;
        debug!(pgt_iou = %pgt_iou, "stored proxy-granting ticket");
        Ok(CallbackOutcome::Stored)
    }

    /// Look up and delete the PGT for `pgt_iou` in one step. The IOU is
    /// trimmed the same way the callback trims it before storing.
    ///
    /// # Errors
    ///
    /// `Storage` when the store fails.
    pub async fn resolve_pgt(&self, pgt_iou: &str) -> Result<Option<SecretString>, DomainError> {
        let pgt_iou = pgt_iou.trim();
        if pgt_iou.is_empty() {
            return Ok(None);
        }
        let pgt = self.pgt_store.take(pgt_iou).await?;
        if pgt.is_none() {
            debug!(pgt_iou = %pgt_iou, "no proxy-granting ticket stored for IOU");
        }
        Ok(pgt)
    }

    /// Obtain a proxy ticket for `target_service` using the PGT bound to
    /// `session`.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for an empty target; `ProxyUnavailable` when proxy
    /// mode is off, no PGT is bound, or the CAS server does not issue one.
    pub async fn request_proxy_ticket(
        &self,
        session: &SessionId,
        target_service: &str,
    ) -> Result<String, DomainError> {
        let target_service = target_service.trim();
        if target_service.is_empty() {
            return Err(DomainError::invalid_request("target service is required"));
        }
        if !self.settings.is_proxy_initiator {
            return Err(DomainError::proxy_unavailable("proxy mode is disabled"));
        }
        let pgt = self.sessions.pgt(session).await?.ok_or_else(|| {
            DomainError::proxy_unavailable("no proxy-granting ticket bound to the session")
        })?;

        let url = self.urls.proxy_url(pgt.expose_secret(), target_service);
        let body = call_cas_server(self.transport.as_ref(), &self.settings, url)
            .await
            .map_err(|e| DomainError::proxy_unavailable(format!("CAS server call failed: {e}")))?;

        match ProxyResponse::decode(&body) {
            Ok(ProxyResponse::Ticket(ticket)) => {
                info!(
                    target_service = %target_service,
                    ticket = ticket_prefix(&ticket),
                    "proxy ticket issued"
                );
                Ok(ticket)
            }
            Ok(ProxyResponse::Failure { code, reason }) => {
                warn!(code = ?code, reason = %reason, "CAS server refused a proxy ticket");
                Err(DomainError::proxy_unavailable(format!(
                    "proxy ticket refused ({}): {reason}",
                    code.as_deref().unwrap_or("no code")
                )))
            }
            Err(e) => Err(DomainError::proxy_unavailable(format!(
                "unparsable proxy response: {e}"
            ))),
        }
    }
}
