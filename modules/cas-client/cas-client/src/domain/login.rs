//! Turning a validated ticket into a local session.

use std::sync::Arc;

use cas_client_sdk::{
    AccountResolver, AuthenticationResult, LocalUser, ServiceParams, SessionId, SessionStore,
};
use tracing::{debug, info, warn};

use super::error::DomainError;
use super::proxy::ProxyManager;
use super::settings::ServiceConfiguration;

/// Query parameter carrying the page to return to after login.
pub const RETURN_TO_PARAM: &str = "returnto";

/// A completed local login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedIn {
    /// Session id issued at login; the client must switch to it.
    pub session: SessionId,
    pub user: LocalUser,
}

pub struct LoginOrchestrator {
    settings: Arc<ServiceConfiguration>,
    accounts: Arc<dyn AccountResolver>,
    sessions: Arc<dyn SessionStore>,
    proxy: Arc<ProxyManager>,
}

impl LoginOrchestrator {
    #[must_use]
    pub fn new(
        settings: Arc<ServiceConfiguration>,
        accounts: Arc<dyn AccountResolver>,
        sessions: Arc<dyn SessionStore>,
        proxy: Arc<ProxyManager>,
    ) -> Self {
        Self {
            settings,
            accounts,
            sessions,
            proxy,
        }
    }

    /// Log the principal in locally under a newly issued session id and bind
    /// that session to `ticket` for single logout. The PGT, if any, is bound
    /// only after that succeeds.
    ///
    /// # Errors
    ///
    /// `LocalLogin` when the account is rejected or the session cannot be
    /// established or bound for single logout.
    pub async fn login(
        &self,
        session: &SessionId,
        result: &AuthenticationResult,
        ticket: &str,
    ) -> Result<LoggedIn, DomainError> {
        let user = self
            .accounts
            .resolve_or_create(result.principal(), result.attributes())
            .await?;

        let session = self
            .sessions
            .regenerate(session)
            .await
            .map_err(|e| DomainError::local_login(format!("cannot issue session: {e}")))?;
        if let Err(e) = self.establish(&session, &user, ticket).await {
            if let Err(cleanup) = self.sessions.destroy(&session).await {
                warn!(error = %cleanup, "cannot discard half-established session");
            }
            return Err(e);
        }
        info!(principal = %result.principal(), user_id = %user.id, "CAS login succeeded");

        if self.settings.is_proxy_initiator
            && let Some(pgt_iou) = result.pgt_iou()
        {
            self.bind_pgt(&session, pgt_iou).await;
        }

        Ok(LoggedIn { session, user })
    }

    async fn establish(
        &self,
        session: &SessionId,
        user: &LocalUser,
        ticket: &str,
    ) -> Result<(), DomainError> {
        self.sessions
            .establish(session, user)
            .await
            .map_err(|e| DomainError::local_login(format!("cannot establish session: {e}")))?;
        self.sessions
            .bind_external_index(session, ticket)
            .await
            .map_err(|e| {
                DomainError::local_login(format!("cannot bind session for single logout: {e}"))
            })
    }

    async fn bind_pgt(&self, session: &SessionId, pgt_iou: &str) {
        match self.proxy.resolve_pgt(pgt_iou).await {
            Ok(Some(pgt)) => match self.sessions.bind_pgt(session, pgt).await {
                Ok(()) => debug!(pgt_iou = %pgt_iou, "proxy-granting ticket bound to session"),
                Err(e) => warn!(error = %e, "cannot bind proxy-granting ticket to session"),
            },
            Ok(None) => warn!(
                pgt_iou = %pgt_iou,
                "no proxy-granting ticket received for IOU; proxying unavailable for this session"
            ),
            Err(e) => warn!(error = %e, "proxy-granting ticket lookup failed"),
        }
    }
}

/// Move `returnto` into the native destination parameter.
pub fn apply_return_to(params: &mut ServiceParams, destination_param: &str) {
    if let Some(target) = params.remove(RETURN_TO_PARAM) {
        params.insert(destination_param, target);
    }
}

/// Absolute redirect target for the request: the destination parameter when
/// it stays on this site, home otherwise.
#[must_use]
pub fn redirect_target(settings: &ServiceConfiguration, params: &ServiceParams) -> String {
    let path = params
        .get(&settings.destination_param)
        .map(str::trim)
        .and_then(site_local_path)
        .unwrap_or_else(|| settings.home_path.clone());
    format!(
        "{}{path}",
        settings.app_base_url.as_str().trim_end_matches('/')
    )
}

/// Absolute paths pass through; scheme-less relative paths such as
/// `node/1` are anchored at the site root. Anything that could leave the
/// site yields `None`.
fn site_local_path(candidate: &str) -> Option<String> {
    if candidate.is_empty() || candidate.contains('\\') || candidate.chars().any(char::is_control)
    {
        return None;
    }
    if let Some(rest) = candidate.strip_prefix('/') {
        return (!rest.starts_with('/')).then(|| candidate.to_owned());
    }
    let first_segment = candidate.split(['/', '?', '#']).next().unwrap_or_default();
    (!first_segment.contains(':')).then(|| format!("/{candidate}"))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use cas_client_sdk::StoreError;
    use secrecy::SecretString;

    use super::*;
    use crate::config::AccountsConfig;
    use crate::infra::{ConfiguredAccountResolver, InMemoryPgtStore, InMemorySessionStore};
    use crate::test_support::{FakeTransport, settings, test_config};

    /// Session store whose single-logout index is down.
    struct IndexDown(Arc<InMemorySessionStore>);

    #[async_trait]
    impl SessionStore for IndexDown {
        async fn set(&self, s: &SessionId, k: &str, v: String) -> Result<(), StoreError> {
            self.0.set(s, k, v).await
        }
        async fn get(&self, s: &SessionId, k: &str) -> Result<Option<String>, StoreError> {
            self.0.get(s, k).await
        }
        async fn destroy(&self, s: &SessionId) -> Result<(), StoreError> {
            self.0.destroy(s).await
        }
        async fn establish(&self, s: &SessionId, u: &LocalUser) -> Result<(), StoreError> {
            self.0.establish(s, u).await
        }
        async fn bind_external_index(
            &self,
            _session: &SessionId,
            _index: &str,
        ) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("index offline".to_owned()))
        }
        async fn destroy_by_external_index(
            &self,
            index: &str,
        ) -> Result<Option<SessionId>, StoreError> {
            self.0.destroy_by_external_index(index).await
        }
        async fn regenerate(&self, s: &SessionId) -> Result<SessionId, StoreError> {
            self.0.regenerate(s).await
        }
        async fn bind_pgt(&self, s: &SessionId, pgt: SecretString) -> Result<(), StoreError> {
            self.0.bind_pgt(s, pgt).await
        }
        async fn pgt(&self, s: &SessionId) -> Result<Option<SecretString>, StoreError> {
            self.0.pgt(s).await
        }
    }

    fn orchestrator(sessions: Arc<dyn SessionStore>) -> LoginOrchestrator {
        let settings = settings(&test_config());
        let proxy = Arc::new(ProxyManager::new(
            settings.clone(),
            Arc::new(InMemoryPgtStore::new()),
            sessions.clone(),
            FakeTransport::replying("no\n"),
        ));
        LoginOrchestrator::new(
            settings,
            Arc::new(ConfiguredAccountResolver::from_config(&AccountsConfig::default())),
            sessions,
            proxy,
        )
    }

    #[tokio::test]
    async fn login_issues_a_new_session() {
        let store = Arc::new(InMemorySessionStore::new());
        let login = orchestrator(store.clone());
        let presented = SessionId::new("s1");

        let done = login
            .login(&presented, &AuthenticationResult::new("jdoe"), "ST-1")
            .await
            .unwrap();

        assert_ne!(done.session, presented);
        assert_eq!(store.user(&done.session), Some(done.user));
        assert!(store.user(&presented).is_none());
        assert_eq!(
            store.destroy_by_external_index("ST-1").await.unwrap(),
            Some(done.session)
        );
    }

    #[tokio::test]
    async fn login_fails_when_single_logout_cannot_be_bound() {
        let store = Arc::new(InMemorySessionStore::new());
        let login = orchestrator(Arc::new(IndexDown(store.clone())));

        let err = login
            .login(&SessionId::new("s1"), &AuthenticationResult::new("jdoe"), "ST-1")
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::LocalLogin { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn return_to_moves_into_destination() {
        let mut params: ServiceParams = [("returnto", "node/1"), ("q", "x")].into_iter().collect();
        apply_return_to(&mut params, "destination");
        assert_eq!(params.get("destination"), Some("node/1"));
        assert!(!params.contains("returnto"));

        let mut untouched: ServiceParams = [("q", "x")].into_iter().collect();
        apply_return_to(&mut untouched, "destination");
        assert_eq!(untouched.len(), 1);
    }

    #[test]
    fn only_site_local_destinations_are_followed() {
        let settings = settings(&test_config());
        let target = |dest: &str| {
            let params: ServiceParams = [("destination", dest)].into_iter().collect();
            redirect_target(&settings, &params)
        };
        assert_eq!(target("/node/1"), "https://example.com/node/1");
        assert_eq!(target("node/1"), "https://example.com/node/1");
        assert_eq!(target(""), "https://example.com/");
        assert_eq!(target("//evil.example.org"), "https://example.com/");
        assert_eq!(target("/\\evil.example.org"), "https://example.com/");
        assert_eq!(target("https://evil.example.org/"), "https://example.com/");
        assert_eq!(
            redirect_target(&settings, &ServiceParams::new()),
            "https://example.com/"
        );
    }
}
