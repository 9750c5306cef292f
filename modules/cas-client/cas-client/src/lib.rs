//! CAS Client Module
//!
//! Authenticates users against a remote CAS server: builds protocol URLs,
//! validates service tickets, turns validation results into local sessions,
//! acts as a CAS proxy, and processes single-logout notifications.
//!
//! The domain layer only talks to the collaborator ports from
//! `cas_client_sdk`. Reference adapters live in [`infra`] (HTTPS transport,
//! PGT stores, session store) and [`api::rest`] (axum routes).
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::CasClientConfig;
pub use domain::error::DomainError;
pub use domain::local_client::CasClientLocalClient;
pub use domain::service::{CasService, Collaborators};
