//! Public API trait for the CAS client.
//!
//! Other parts of the host application use this trait to send users to the
//! CAS server and, when the client acts as a CAS proxy, to obtain proxy
//! tickets for back-end services.

use async_trait::async_trait;

use crate::error::CasClientError;
use crate::models::{ServiceParams, SessionId};

/// Public API trait for the CAS client.
///
/// ```ignore
/// let cas: Arc<dyn CasClientApi> = ...;
///
/// // Redirect an anonymous user to the CAS login page
/// let url = cas.login_url(&ServiceParams::new(), false);
/// ```
#[async_trait]
pub trait CasClientApi: Send + Sync {
    /// Absolute URL of the CAS server login page.
    ///
    /// `params` are reattached to the service URL the CAS server redirects
    /// back to. A `gateway` login returns without prompting for credentials
    /// when the user has no CAS session.
    fn login_url(&self, params: &ServiceParams, gateway: bool) -> String;

    /// Absolute URL of the CAS server logout page.
    fn logout_url(&self, return_to: Option<&str>) -> String;

    /// Obtain a proxy ticket for `target_service` on behalf of the user
    /// owning `session`.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if `target_service` is empty
    /// - `ProxyUnavailable` if proxy mode is disabled, no proxy-granting
    ///   ticket is bound to the session, or the CAS server refused
    /// - `Internal` for unexpected errors
    async fn proxy_ticket(
        &self,
        session: &SessionId,
        target_service: &str,
    ) -> Result<String, CasClientError>;
}
