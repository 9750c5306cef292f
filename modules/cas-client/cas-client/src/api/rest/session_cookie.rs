use axum::http::{HeaderMap, HeaderValue, header};
use cas_client_sdk::SessionId;
use uuid::Uuid;

pub const DEFAULT_COOKIE_NAME: &str = "cas_client_session";

/// Browser session identification through a cookie.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    name: String,
}

impl Default for SessionCookie {
    fn default() -> Self {
        Self::new(DEFAULT_COOKIE_NAME)
    }
}

impl SessionCookie {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Session carried by the request, if any.
    #[must_use]
    pub fn read(&self, headers: &HeaderMap) -> Option<SessionId> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == self.name && is_valid_id(value))
            .map(|(_, value)| SessionId::new(value))
    }

    /// The request's session, or a fresh one. The flag is `true` when the
    /// session is new and must be sent back with [`Self::set_cookie`].
    #[must_use]
    pub fn resolve(&self, headers: &HeaderMap) -> (SessionId, bool) {
        match self.read(headers) {
            Some(id) => (id, false),
            None => (SessionId::new(Uuid::new_v4().to_string()), true),
        }
    }

    /// `Set-Cookie` value for `session`.
    #[must_use]
    pub fn set_cookie(&self, session: &SessionId) -> Option<HeaderValue> {
        HeaderValue::from_str(&format!(
            "{}={}; Path=/; HttpOnly; Secure; SameSite=Lax",
            self.name,
            session.as_str()
        ))
        .ok()
    }
}

fn is_valid_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 128
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
