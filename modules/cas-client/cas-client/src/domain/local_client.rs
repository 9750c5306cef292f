//! Local (in-process) client for the CAS client module.

use std::sync::Arc;

use async_trait::async_trait;
use cas_client_sdk::{CasClientApi, CasClientError, ServiceParams, SessionId};

use super::{CasService, DomainError};

/// Local client wrapping the service.
///
/// Handed to other parts of the host application as `Arc<dyn CasClientApi>`.
pub struct CasClientLocalClient {
    svc: Arc<CasService>,
}

impl CasClientLocalClient {
    #[must_use]
    pub fn new(svc: Arc<CasService>) -> Self {
        Self { svc }
    }
}

fn log_and_convert(op: &str, e: DomainError) -> CasClientError {
    tracing::error!(operation = op, error = ?e, "cas_client call failed");
    e.into()
}

#[async_trait]
impl CasClientApi for CasClientLocalClient {
    fn login_url(&self, params: &ServiceParams, gateway: bool) -> String {
        self.svc.login_url(params, gateway)
    }

    fn logout_url(&self, return_to: Option<&str>) -> String {
        self.svc.logout_url(return_to)
    }

    async fn proxy_ticket(
        &self,
        session: &SessionId,
        target_service: &str,
    ) -> Result<String, CasClientError> {
        self.svc
            .proxy_ticket(session, target_service)
            .await
            .map_err(|e| log_and_convert("proxy_ticket", e))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::test_support::{Harness, test_config};

    #[tokio::test]
    async fn proxy_ticket_errors_map_to_public_kinds() {
        let harness = Harness::new(test_config());
        let client = CasClientLocalClient::new(harness.service.clone());

        let err = client
            .proxy_ticket(&SessionId::new("s1"), "")
            .await
            .unwrap_err();
        assert!(matches!(err, CasClientError::InvalidRequest(_)));

        let err = client
            .proxy_ticket(&SessionId::new("s1"), "https://backend.example.com/")
            .await
            .unwrap_err();
        assert!(matches!(err, CasClientError::ProxyUnavailable(_)));
    }

    #[tokio::test]
    async fn urls_come_from_the_service() {
        let harness = Harness::new(test_config());
        let client: Arc<dyn CasClientApi> =
            Arc::new(CasClientLocalClient::new(harness.service.clone()));
        assert_eq!(
            client.login_url(&ServiceParams::new(), true),
            "https://example.com/cas/login?service=https%3A%2F%2Fexample.com%2Fclient&gateway=true"
        );
        assert_eq!(client.logout_url(None), "https://example.com/cas/logout");
    }
}
