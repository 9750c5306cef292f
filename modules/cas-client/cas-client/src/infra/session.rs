//! In-memory session store.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cas_client_sdk::{LocalUser, SessionId, SessionStore, StoreError};
use dashmap::DashMap;
use secrecy::SecretString;
use uuid::Uuid;

/// Bounds for the in-memory session and notice maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Sessions held at once. New sessions are refused beyond this.
    pub max_sessions: usize,
    /// Sessions untouched for this long are dropped when room is needed.
    pub idle_timeout: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 100_000,
            idle_timeout: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug)]
struct SessionData {
    values: HashMap<String, String>,
    user: Option<LocalUser>,
    pgt: Option<SecretString>,
    external_index: Option<String>,
    touched: Instant,
}

impl SessionData {
    fn new() -> Self {
        Self {
            values: HashMap::new(),
            user: None,
            pgt: None,
            external_index: None,
            touched: Instant::now(),
        }
    }
}

/// Process-local sessions keyed by [`SessionId`], with a reverse index
/// from CAS session index to session for single logout.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<SessionId, SessionData>,
    by_index: DashMap<String, SessionId>,
    limits: SessionLimits,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limits(limits: SessionLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// The user logged in on `session`, if any.
    #[must_use]
    pub fn user(&self, session: &SessionId) -> Option<LocalUser> {
        self.sessions.get_mut(session).and_then(|mut s| {
            s.touched = Instant::now();
            s.user.clone()
        })
    }

    #[must_use]
    pub fn contains(&self, session: &SessionId) -> bool {
        self.sessions.contains_key(session)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle for longer than the configured timeout. Returns
    /// how many were dropped.
    pub fn purge_idle(&self) -> usize {
        let timeout = self.limits.idle_timeout;
        let mut orphaned = Vec::new();
        self.sessions.retain(|id, data| {
            if data.touched.elapsed() < timeout {
                return true;
            }
            orphaned.push((id.clone(), data.external_index.take()));
            false
        });
        for (id, index) in &orphaned {
            if let Some(index) = index {
                self.unindex(id, index);
            }
        }
        orphaned.len()
    }

    fn unindex(&self, session: &SessionId, index: &str) {
        self.by_index.remove_if(index, |_, owner| owner == session);
    }

    fn ensure_room(&self, session: &SessionId) -> Result<(), StoreError> {
        if self.sessions.contains_key(session) || self.sessions.len() < self.limits.max_sessions {
            return Ok(());
        }
        let purged = self.purge_idle();
        tracing::debug!(purged, "session store full, dropped idle sessions");
        if self.sessions.len() < self.limits.max_sessions {
            Ok(())
        } else {
            Err(StoreError::Unavailable("session capacity reached".to_owned()))
        }
    }

    /// Run `f` on the session's data, creating it if there is room.
    fn update<R>(
        &self,
        session: &SessionId,
        f: impl FnOnce(&mut SessionData) -> R,
    ) -> Result<R, StoreError> {
        self.ensure_room(session)?;
        let mut data = self
            .sessions
            .entry(session.clone())
            .or_insert_with(SessionData::new);
        data.touched = Instant::now();
        Ok(f(&mut data))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn set(&self, session: &SessionId, key: &str, value: String) -> Result<(), StoreError> {
        self.update(session, |s| {
            s.values.insert(key.to_owned(), value);
        })
    }

    async fn get(&self, session: &SessionId, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.sessions.get_mut(session).and_then(|mut s| {
            s.touched = Instant::now();
            s.values.get(key).cloned()
        }))
    }

    async fn destroy(&self, session: &SessionId) -> Result<(), StoreError> {
        if let Some((_, data)) = self.sessions.remove(session)
            && let Some(index) = data.external_index
        {
            self.unindex(session, &index);
        }
        Ok(())
    }

    async fn establish(&self, session: &SessionId, user: &LocalUser) -> Result<(), StoreError> {
        self.update(session, |s| s.user = Some(user.clone()))
    }

    async fn bind_external_index(
        &self,
        session: &SessionId,
        index: &str,
    ) -> Result<(), StoreError> {
        let previous = self.update(session, |s| s.external_index.replace(index.to_owned()))?;
        if let Some(previous) = previous {
            self.unindex(session, &previous);
        }
        self.by_index.insert(index.to_owned(), session.clone());
        Ok(())
    }

    async fn destroy_by_external_index(
        &self,
        index: &str,
    ) -> Result<Option<SessionId>, StoreError> {
        let Some((_, session)) = self.by_index.remove(index) else {
            return Ok(None);
        };
        Ok(self.sessions.remove(&session).map(|(id, _)| id))
    }

    async fn regenerate(&self, session: &SessionId) -> Result<SessionId, StoreError> {
        let fresh = SessionId::new(Uuid::new_v4().to_string());
        let Some((_, mut data)) = self.sessions.remove(session) else {
            self.update(&fresh, |_| ())?;
            return Ok(fresh);
        };
        data.touched = Instant::now();
        if let Some(index) = &data.external_index {
            self.by_index.insert(index.clone(), fresh.clone());
        }
        self.sessions.insert(fresh.clone(), data);
        Ok(fresh)
    }

    async fn bind_pgt(&self, session: &SessionId, pgt: SecretString) -> Result<(), StoreError> {
        self.update(session, |s| s.pgt = Some(pgt))
    }

    async fn pgt(&self, session: &SessionId) -> Result<Option<SecretString>, StoreError> {
        Ok(self.sessions.get(session).and_then(|s| s.pgt.clone()))
    }
}
