//! Domain errors for the CAS client.

use cas_client_sdk::{AccountError, CasClientError, StoreError};
use thiserror::Error;

/// Internal domain errors.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Transport failure, unparsable response, explicit rejection, or a
    /// disallowed proxy chain.
    #[error("ticket validation failed: {message}")]
    TicketValidation { message: String },

    /// The host application refused to log the principal in.
    #[error("local login failed: {message}")]
    LocalLogin { message: String },

    #[error("invalid logout request: {message}")]
    SloParse { message: String },

    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("proxy ticket unavailable: {message}")]
    ProxyUnavailable { message: String },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl DomainError {
    pub fn ticket_validation(message: impl Into<String>) -> Self {
        Self::TicketValidation {
            message: message.into(),
        }
    }

    pub fn local_login(message: impl Into<String>) -> Self {
        Self::LocalLogin {
            message: message.into(),
        }
    }

    pub fn slo_parse(message: impl Into<String>) -> Self {
        Self::SloParse {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn proxy_unavailable(message: impl Into<String>) -> Self {
        Self::ProxyUnavailable {
            message: message.into(),
        }
    }
}

impl From<AccountError> for DomainError {
    fn from(e: AccountError) -> Self {
        Self::local_login(e.to_string())
    }
}

impl From<DomainError> for CasClientError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidRequest { message } => Self::InvalidRequest(message),
            DomainError::ProxyUnavailable { message } => Self::ProxyUnavailable(message),
            DomainError::TicketValidation { message }
            | DomainError::LocalLogin { message }
            | DomainError::SloParse { message }
            | DomainError::Configuration { message } => Self::Internal(message),
            DomainError::Storage(e) => Self::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_rejections_become_login_failures() {
        let err: DomainError = AccountError::Blocked("jdoe".to_owned()).into();
        assert!(matches!(err, DomainError::LocalLogin { .. }));
        assert!(err.to_string().contains("jdoe"));
    }

    #[test]
    fn public_error_keeps_caller_facing_kinds() {
        let e: CasClientError = DomainError::invalid_request("empty target").into();
        assert!(matches!(e, CasClientError::InvalidRequest(m) if m == "empty target"));

        let e: CasClientError = DomainError::proxy_unavailable("no pgt").into();
        assert!(matches!(e, CasClientError::ProxyUnavailable(_)));

        let e: CasClientError =
            DomainError::Storage(StoreError::Unavailable("db down".to_owned())).into();
        assert!(matches!(e, CasClientError::Internal(m) if m.contains("db down")));
    }
}
