//! Error types for the CAS client and its collaborators.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by the public [`CasClientApi`](crate::CasClientApi).
#[derive(Debug, Error)]
pub enum CasClientError {
    /// The request was rejected before reaching the CAS server.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No proxy ticket can be issued for this session.
    #[error("proxy ticket unavailable: {0}")]
    ProxyUnavailable(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failure of the outbound HTTPS call to the CAS server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("tls setup failed: {0}")]
    Tls(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("unexpected http status {0}")]
    Status(u16),

    #[error("invalid response body: {0}")]
    Body(String),
}

/// Failure of a PGT or session store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store error: {0}")]
    Internal(String),
}

/// Rejection raised by the host application's account resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("no local account for principal '{0}'")]
    Unknown(String),

    #[error("account for principal '{0}' is blocked")]
    Blocked(String),

    #[error("login denied by policy: {0}")]
    Denied(String),

    #[error("account lookup failed: {0}")]
    Internal(String),
}
