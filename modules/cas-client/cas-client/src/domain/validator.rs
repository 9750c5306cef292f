//! Service ticket validation.

use std::sync::Arc;

use cas_client_sdk::{
    AuthenticationResult, ServiceParams, Transport, TransportError, TransportRequest,
};
use tracing::{debug, warn};

use super::error::DomainError;
use super::response::ValidationResponse;
use super::settings::ServiceConfiguration;
use super::url_builder::UrlBuilder;

/// Perform one bounded GET against the CAS server. Never retried.
///
/// # Errors
///
/// The transport failure, or `Timeout` when the bound elapses first.
pub async fn call_cas_server(
    transport: &dyn Transport,
    settings: &ServiceConfiguration,
    url: String,
) -> Result<String, TransportError> {
    let request = TransportRequest {
        url,
        ca_cert: settings.ca_cert.clone(),
        timeout: settings.timeout,
    };
    tokio::time::timeout(settings.timeout, transport.get(&request))
        .await
        .map_err(|_| TransportError::Timeout(settings.timeout))?
}

/// Shortened ticket for log lines.
pub(crate) fn ticket_prefix(ticket: &str) -> &str {
    let end = ticket
        .char_indices()
        .nth(8)
        .map_or(ticket.len(), |(i, _)| i);
    &ticket[..end]
}

/// Validates service tickets against the CAS server.
pub struct TicketValidator {
    settings: Arc<ServiceConfiguration>,
    urls: UrlBuilder,
    transport: Arc<dyn Transport>,
}

impl TicketValidator {
    #[must_use]
    pub fn new(settings: Arc<ServiceConfiguration>, transport: Arc<dyn Transport>) -> Self {
        Self {
            urls: UrlBuilder::new(settings.clone()),
            settings,
            transport,
        }
    }

    /// Validate `ticket` for the service URL rebuilt from `params`.
    ///
    /// # Errors
    ///
    /// `TicketValidation` when the server cannot be reached, answers with
    /// something other than a complete envelope, rejects the ticket, or the
    /// ticket came through a proxy that is not allowed.
    pub async fn validate(
        &self,
        ticket: &str,
        params: &ServiceParams,
    ) -> Result<AuthenticationResult, DomainError> {
        let url = self.urls.validate_url(ticket, params);
        debug!(
            version = %self.settings.version,
            ticket = ticket_prefix(ticket),
            "validating service ticket"
        );

        let body = call_cas_server(self.transport.as_ref(), &self.settings, url)
            .await
            .map_err(|e| DomainError::ticket_validation(format!("CAS server call failed: {e}")))?;
        debug!(bytes = body.len(), "received validation response");

        let response = ValidationResponse::decode(self.settings.version, &body).map_err(|e| {
            DomainError::ticket_validation(format!("unparsable validation response: {e}"))
        })?;

        let result = match response {
            ValidationResponse::Failure { code, reason } => {
                warn!(code = ?code, reason = %reason, "CAS server rejected the ticket");
                return Err(DomainError::ticket_validation(format!(
                    "ticket rejected ({}): {reason}",
                    code.as_deref().unwrap_or("no code")
                )));
            }
            ok => ok.into_result().ok_or_else(|| {
                DomainError::ticket_validation("validation response without a principal")
            })?,
        };

        if !self.settings.proxy_chains.allows(result.proxy_chain()) {
            warn!(
                principal = %result.principal(),
                proxies = ?result.proxy_chain().map(|c| c.as_slice()),
                "proxy chain not allowed"
            );
            return Err(DomainError::ticket_validation(
                "ticket was relayed through a proxy that is not allowed",
            ));
        }

        debug!(principal = %result.principal(), "service ticket validated");
        Ok(result)
    }
}
