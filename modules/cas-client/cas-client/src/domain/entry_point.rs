//! Dispatch of requests arriving at the CAS `service` endpoint.

use std::sync::Arc;

use cas_client_sdk::{Notifier, ServiceParams, SessionId, SessionStore, Severity};
use tracing::{debug, error, warn};

use super::login::{LoginOrchestrator, apply_return_to, redirect_target};
use super::settings::ServiceConfiguration;
use super::slo::SingleLogoutHandler;
use super::validator::{TicketValidator, ticket_prefix};

pub const TICKET_PARAM: &str = "ticket";
pub const LOGOUT_REQUEST_PARAM: &str = "logoutRequest";

pub const VALIDATION_FAILED_MESSAGE: &str =
    "There was a problem validating your login, please contact a site administrator.";
pub const LOGIN_FAILED_MESSAGE: &str =
    "There was a problem logging in, please contact a site administrator.";
pub const LOGGED_IN_MESSAGE: &str = "You have been logged in.";

/// One request to the service endpoint, already lifted out of HTTP.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub session: SessionId,
    pub query: ServiceParams,
    /// The `logoutRequest` body parameter, if any.
    pub logout_request: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceOutcome {
    /// Single logout processed; answer 200 with an empty body.
    Acknowledged,
    /// Answer with a redirect to `location`. `session` is set when login
    /// issued a new session id the client must switch to.
    Redirect {
        location: String,
        session: Option<SessionId>,
    },
}

pub struct ProtocolEntryPoint {
    settings: Arc<ServiceConfiguration>,
    validator: TicketValidator,
    login: LoginOrchestrator,
    slo: SingleLogoutHandler,
    sessions: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
}

impl ProtocolEntryPoint {
    #[must_use]
    pub fn new(
        settings: Arc<ServiceConfiguration>,
        validator: TicketValidator,
        login: LoginOrchestrator,
        slo: SingleLogoutHandler,
        sessions: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            validator,
            login,
            slo,
            sessions,
            notifier,
        }
    }

    /// Classify and process one request. Never fails: every error ends in a
    /// notice and a redirect, or, for single logout, in a plain 200.
    #[tracing::instrument(skip_all, name = "cas_service")]
    pub async fn handle(&self, request: InboundRequest) -> ServiceOutcome {
        let InboundRequest {
            session,
            mut query,
            logout_request,
        } = request;

        if let Some(body) = logout_request {
            if let Err(e) = self.slo.handle_logout(&body).await {
                warn!(error = %e, "ignoring single logout request");
            }
            return ServiceOutcome::Acknowledged;
        }

        if query.contains(&self.settings.temp_disable_param) {
            debug!("temporary disable flag set on session");
            if let Err(e) = self
                .sessions
                .set(&session, &self.settings.temp_disable_param, "true".to_owned())
                .await
            {
                warn!(error = %e, "cannot store temporary disable flag");
            }
        }

        let Some(ticket) = query.remove(TICKET_PARAM) else {
            debug!("no ticket, redirecting");
            return self.redirect(query);
        };

        if ticket.trim().is_empty() {
            warn!("empty service ticket");
            self.notify(&session, VALIDATION_FAILED_MESSAGE, Severity::Error)
                .await;
            return self.redirect(query);
        }

        let result = match self.validator.validate(&ticket, &query).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, ticket = ticket_prefix(&ticket), "service ticket validation failed");
                self.notify(&session, VALIDATION_FAILED_MESSAGE, Severity::Error)
                    .await;
                return self.redirect(query);
            }
        };

        match self.login.login(&session, &result, &ticket).await {
            Ok(logged_in) => {
                self.notifier.discard(&session).await;
                self.notify(&logged_in.session, LOGGED_IN_MESSAGE, Severity::Status)
                    .await;
                ServiceOutcome::Redirect {
                    location: self.location(query),
                    session: Some(logged_in.session),
                }
            }
            Err(e) => {
                error!(error = %e, principal = %result.principal(), "local login failed");
                self.notify(&session, LOGIN_FAILED_MESSAGE, Severity::Error)
                    .await;
                self.redirect(query)
            }
        }
    }

    fn redirect(&self, params: ServiceParams) -> ServiceOutcome {
        ServiceOutcome::Redirect {
            location: self.location(params),
            session: None,
        }
    }

    fn location(&self, mut params: ServiceParams) -> String {
        apply_return_to(&mut params, &self.settings.destination_param);
        redirect_target(&self.settings, &params)
    }

    async fn notify(&self, session: &SessionId, message: &str, severity: Severity) {
        self.notifier.notify(session, message, severity).await;
    }
}
