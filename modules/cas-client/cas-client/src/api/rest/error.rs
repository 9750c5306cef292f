use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::domain::error::DomainError;

/// Status code for a domain error reaching HTTP.
#[must_use]
pub fn domain_error_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
        DomainError::ProxyUnavailable { .. } => StatusCode::CONFLICT,
        DomainError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::TicketValidation { .. }
        | DomainError::LocalLogin { .. }
        | DomainError::SloParse { .. }
        | DomainError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Details stay in the log; the client only sees the status text.
impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = domain_error_status(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = status.canonical_reason().unwrap_or("error");
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use cas_client_sdk::StoreError;

    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            domain_error_status(&DomainError::invalid_request("missing pgtId")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            domain_error_status(&DomainError::Storage(StoreError::Unavailable(
                "down".to_owned()
            ))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn body_hides_details() {
        let resp = DomainError::Storage(StoreError::Internal("secret dsn".to_owned()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
