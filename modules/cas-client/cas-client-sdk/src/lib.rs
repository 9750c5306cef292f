//! CAS Client SDK
//!
//! This crate provides the public contract of the `cas_client` module:
//!
//! - [`CasClientApi`] - Public API trait for consumers (login URLs, proxy tickets)
//! - [`ports`] - Collaborator traits the host application implements
//!   ([`Transport`], [`PgtStore`], [`SessionStore`], [`AccountResolver`], [`Notifier`])
//! - [`AuthenticationResult`] - The CAS property bag produced by ticket validation
//! - [`CasClientError`] and the collaborator error types
//!
//! ## Usage
//!
//! ```ignore
//! use cas_client_sdk::{CasClientApi, ServiceParams};
//!
//! let mut params = ServiceParams::new();
//! params.insert("returnto", "/node/1");
//! let login = cas.login_url(&params, false);
//!
//! // Later, on behalf of the logged-in user
//! let ticket = cas.proxy_ticket(&session, "https://backend.example.com/").await?;
//! ```

pub mod api;
pub mod error;
pub mod models;
pub mod ports;

// Re-export main types at crate root
pub use api::CasClientApi;
pub use error::{AccountError, CasClientError, StoreError, TransportError};
pub use models::{
    AuthenticationResult, AuthenticationResultBuilder, LocalUser, PgtMapping, ProtocolVersion,
    ProxyChain, ServiceParams, SessionId, Severity,
};
pub use ports::{AccountResolver, Notifier, PgtStore, SessionStore, Transport, TransportRequest};
