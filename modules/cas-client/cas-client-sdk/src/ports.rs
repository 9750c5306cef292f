//! Collaborator ports.
//!
//! The CAS client core never talks to the network, a database, or the host
//! application's session machinery directly. It receives implementations of
//! these traits at construction time.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::{AccountError, StoreError, TransportError};
use crate::models::{LocalUser, PgtMapping, SessionId, Severity};

/// Outbound GET to the CAS server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub url: String,
    /// PEM bundle the server certificate must chain to. `None` means the
    /// platform trust store.
    pub ca_cert: Option<PathBuf>,
    pub timeout: Duration,
}

/// HTTP(S) client used to reach the CAS server.
///
/// Implementations must verify TLS against `ca_cert` and must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the GET and return the response body.
    ///
    /// # Errors
    ///
    /// Any connection, TLS, status, or body failure.
    async fn get(&self, request: &TransportRequest) -> Result<String, TransportError>;
}

/// Durable PGT IOU to PGT store.
///
/// `take` must be atomic with respect to other `take` calls for the same
/// key: a mapping is returned at most once.
#[async_trait]
pub trait PgtStore: Send + Sync {
    /// Store a mapping, overwriting any mapping with the same IOU.
    ///
    /// # Errors
    ///
    /// Backing store failures.
    async fn save(&self, mapping: PgtMapping) -> Result<(), StoreError>;

    /// Remove and return the PGT stored under `pgt_iou`.
    ///
    /// # Errors
    ///
    /// Backing store failures.
    async fn take(&self, pgt_iou: &str) -> Result<Option<SecretString>, StoreError>;
}

/// The host application's session store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// # Errors
    ///
    /// Backing store failures.
    async fn set(&self, session: &SessionId, key: &str, value: String) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Backing store failures.
    async fn get(&self, session: &SessionId, key: &str) -> Result<Option<String>, StoreError>;

    /// # Errors
    ///
    /// Backing store failures.
    async fn destroy(&self, session: &SessionId) -> Result<(), StoreError>;

    /// Mark the session as authenticated for `user`.
    ///
    /// # Errors
    ///
    /// Backing store failures.
    async fn establish(&self, session: &SessionId, user: &LocalUser) -> Result<(), StoreError>;

    /// Associate the session with the CAS session index used by single logout.
    ///
    /// # Errors
    ///
    /// Backing store failures.
    async fn bind_external_index(&self, session: &SessionId, index: &str)
    -> Result<(), StoreError>;

    /// Destroy the session bound to `index` and return its id. Returns `None`
    /// when no session is bound.
    ///
    /// # Errors
    ///
    /// Backing store failures.
    async fn destroy_by_external_index(&self, index: &str)
    -> Result<Option<SessionId>, StoreError>;

    /// Move the session's data under a newly issued id and destroy the old
    /// one. Called when the session changes privilege level, so an id chosen
    /// before login never carries an authenticated session.
    ///
    /// # Errors
    ///
    /// Backing store failures.
    async fn regenerate(&self, session: &SessionId) -> Result<SessionId, StoreError>;

    /// # Errors
    ///
    /// Backing store failures.
    async fn bind_pgt(&self, session: &SessionId, pgt: SecretString) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Backing store failures.
    async fn pgt(&self, session: &SessionId) -> Result<Option<SecretString>, StoreError>;
}

/// Maps a CAS principal to a local account, creating it if policy allows.
#[async_trait]
pub trait AccountResolver: Send + Sync {
    /// # Errors
    ///
    /// Rejection of the principal (unknown, blocked, denied) or lookup failure.
    async fn resolve_or_create(
        &self,
        principal: &str,
        attributes: &BTreeMap<String, Vec<String>>,
    ) -> Result<LocalUser, AccountError>;
}

/// User-facing notices (flash messages).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, session: &SessionId, message: &str, severity: Severity);

    /// Drop pending notices of a session that no longer exists.
    async fn discard(&self, session: &SessionId);
}
