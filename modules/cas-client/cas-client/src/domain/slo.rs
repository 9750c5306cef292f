//! Single logout notifications pushed by the CAS server.

use std::sync::Arc;

use cas_client_sdk::{Notifier, SessionStore};
use tracing::{debug, info, warn};

use super::error::DomainError;
use super::validator::ticket_prefix;
use super::xml;

const MAX_LOGOUT_REQUEST_BYTES: usize = 64 * 1024;

/// Extract the `SessionIndex` from a SAML `LogoutRequest`.
///
/// # Errors
///
/// `SloParse` when the body is oversized, not well formed, not a
/// `LogoutRequest`, or has no non-empty `SessionIndex`.
pub fn parse_logout_request(body: &str) -> Result<String, DomainError> {
    if body.len() > MAX_LOGOUT_REQUEST_BYTES {
        return Err(DomainError::slo_parse(format!(
            "logout request exceeds {MAX_LOGOUT_REQUEST_BYTES} bytes"
        )));
    }
    let root = xml::parse(body).map_err(DomainError::slo_parse)?;
    if root.name != "LogoutRequest" {
        return Err(DomainError::slo_parse(format!(
            "unexpected root element <{}>",
            root.name
        )));
    }
    root.child_text("SessionIndex")
        .map(str::to_owned)
        .ok_or_else(|| DomainError::slo_parse("LogoutRequest without a SessionIndex"))
}

pub struct SingleLogoutHandler {
    sessions: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
}

impl SingleLogoutHandler {
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { sessions, notifier }
    }

    /// Terminate the local session bound to the request's session index.
    ///
    /// A missing session and store failures are logged, not returned; the
    /// CAS server does not act on the answer.
    ///
    /// # Errors
    ///
    /// `SloParse` when the body is not a usable `LogoutRequest`.
    pub async fn handle_logout(&self, body: &str) -> Result<(), DomainError> {
        let index = parse_logout_request(body)?;
        match self.sessions.destroy_by_external_index(&index).await {
            Ok(Some(session)) => {
                self.notifier.discard(&session).await;
                info!(session_index = ticket_prefix(&index), "single logout: session destroyed");
            }
            Ok(None) => debug!(
                session_index = ticket_prefix(&index),
                "single logout: no session bound to index"
            ),
            Err(e) => warn!(error = %e, "single logout: session store failed"),
        }
        Ok(())
    }
}
