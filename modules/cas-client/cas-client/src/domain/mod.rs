//! Domain layer for the CAS client.
//!
//! Components, leaves first: URL builder, ticket validator, proxy manager,
//! login orchestrator, single-logout handler, protocol entry point.

pub mod entry_point;
pub mod error;
pub mod local_client;
pub mod login;
pub mod proxy;
pub mod proxy_chain;
pub mod response;
pub mod service;
pub mod settings;
pub mod slo;
pub mod url_builder;
pub mod validator;
mod xml;

pub use error::DomainError;
pub use local_client::CasClientLocalClient;
pub use service::{CasService, Collaborators};
pub use settings::ServiceConfiguration;
