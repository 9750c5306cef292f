//! CAS protocol URLs.
//!
//! The service URL produced here is sent to the CAS server twice, once in
//! the login redirect and once at validation. The server compares them
//! byte for byte, so both calls must go through [`UrlBuilder::service_url`].

use std::sync::Arc;

use cas_client_sdk::{ProtocolVersion, ServiceParams};
use url::form_urlencoded;

use super::settings::ServiceConfiguration;

const DEFAULT_HTTPS_PORT: u16 = 443;

/// Base URL of the CAS server: `https://host[:port]/path/`.
///
/// The default HTTPS port is left out; the path ends in exactly one slash.
#[must_use]
pub fn server_base_url(hostname: &str, port: Option<u16>, path: &str) -> String {
    let mut url = format!("https://{hostname}");
    if let Some(port) = port.filter(|p| *p != DEFAULT_HTTPS_PORT) {
        url.push(':');
        url.push_str(&port.to_string());
    }
    let path = path.trim().trim_matches('/');
    url.push('/');
    if !path.is_empty() {
        url.push_str(path);
        url.push('/');
    }
    url
}

/// Builds login, validation, proxy, and logout URLs.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    settings: Arc<ServiceConfiguration>,
}

impl UrlBuilder {
    #[must_use]
    pub fn new(settings: Arc<ServiceConfiguration>) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn server_base_url(&self) -> &str {
        &self.settings.server_base_url
    }

    /// Absolute URL of the protocol entry point with `params` attached.
    #[must_use]
    pub fn service_url(&self, params: &ServiceParams) -> String {
        let mut url = self.settings.service_url.clone();
        if !params.is_empty() {
            url.set_query(Some(&params.to_query()));
        }
        url.into()
    }

    #[must_use]
    pub fn login_url(&self, params: &ServiceParams, gateway: bool) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("service", &self.service_url(params));
        if gateway {
            query.append_pair("gateway", "true");
        }
        self.endpoint("login", &query.finish())
    }

    /// Validation endpoint for the configured protocol version and proxy mode.
    #[must_use]
    pub fn validate_url(&self, ticket: &str, params: &ServiceParams) -> String {
        let path = match (self.settings.version, self.settings.can_be_proxied) {
            (ProtocolVersion::V1, _) => "validate",
            (ProtocolVersion::V2, true) => "proxyValidate",
            (ProtocolVersion::V2, false) => "serviceValidate",
        };
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("service", &self.service_url(params));
        query.append_pair("ticket", ticket);
        if self.settings.is_proxy_initiator {
            query.append_pair("pgtUrl", self.settings.proxy_callback_url.as_str());
        }
        self.endpoint(path, &query.finish())
    }

    /// Absolute HTTPS URL the CAS server delivers proxy-granting tickets to.
    #[must_use]
    pub fn proxy_callback_url(&self) -> &str {
        self.settings.proxy_callback_url.as_str()
    }

    #[must_use]
    pub fn proxy_url(&self, pgt: &str, target_service: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("pgt", pgt)
            .append_pair("targetService", target_service)
            .finish();
        self.endpoint("proxy", &query)
    }

    /// CAS logout URL. A relative `return_to` is resolved against the
    /// application base URL.
    #[must_use]
    pub fn logout_url(&self, return_to: Option<&str>) -> String {
        let target = return_to
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .and_then(|r| self.absolute(r));
        match target {
            Some(service) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair("service", &service)
                    .finish();
                self.endpoint("logout", &query)
            }
            None => format!("{}logout", self.settings.server_base_url),
        }
    }

    fn absolute(&self, location: &str) -> Option<String> {
        if location.starts_with('/') && !location.starts_with("//") {
            let base = self.settings.app_base_url.as_str().trim_end_matches('/');
            return Some(format!("{base}{location}"));
        }
        url::Url::parse(location)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .map(String::from)
    }

    fn endpoint(&self, path: &str, query: &str) -> String {
        format!("{}{path}?{query}", self.settings.server_base_url)
    }
}
