//! Session-scoped flash messages.

use std::time::Instant;

use async_trait::async_trait;
use cas_client_sdk::{Notifier, SessionId, Severity};
use dashmap::DashMap;

use super::session::SessionLimits;

/// Notices kept per session; older ones are dropped first.
const MAX_NOTICES_PER_SESSION: usize = 16;

#[derive(Debug)]
struct Pending {
    messages: Vec<(Severity, String)>,
    queued: Instant,
}

/// Keeps notices per session until the host application displays them.
#[derive(Debug, Default)]
pub struct FlashNotifier {
    messages: DashMap<SessionId, Pending>,
    limits: SessionLimits,
}

impl FlashNotifier {
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

    /// Remove and return the pending notices for `session`, oldest first.
    #[must_use]
    pub fn take_messages(&self, session: &SessionId) -> Vec<(Severity, String)> {
        self.messages
            .remove(session)
            .map(|(_, pending)| pending.messages)
            .unwrap_or_default()
    }

    /// Sessions with notices waiting.
    #[must_use]
    pub fn pending_sessions(&self) -> usize {
        self.messages.len()
    }

    /// Drop notices nobody collected within the idle timeout.
    pub fn purge_stale(&self) -> usize {
        let timeout = self.limits.idle_timeout;
        let before = self.messages.len();
        self.messages
            .retain(|_, pending| pending.queued.elapsed() < timeout);
        before.saturating_sub(self.messages.len())
    }

    fn has_room(&self, session: &SessionId) -> bool {
        if self.messages.contains_key(session) || self.messages.len() < self.limits.max_sessions {
            return true;
        }
        self.purge_stale();
        self.messages.len() < self.limits.max_sessions
    }
}

#[async_trait]
impl Notifier for FlashNotifier {
    async fn notify(&self, session: &SessionId, message: &str, severity: Severity) {
        if !self.has_room(session) {
            tracing::warn!(?severity, message, "notice dropped, too many pending sessions");
            return;
        }
        tracing::debug!(?severity, message, "queued notice");
        let mut pending = self.messages.entry(session.clone()).or_insert_with(|| Pending {
            messages: Vec::new(),
            queued: Instant::now(),
        });
        if pending.messages.len() >= MAX_NOTICES_PER_SESSION {
            pending.messages.remove(0);
        }
        pending.messages.push((severity, message.to_owned()));
        pending.queued = Instant::now();
    }

    async fn discard(&self, session: &SessionId) {
        self.messages.remove(session);
    }
}
