//! Validated, process-wide CAS client settings.

use std::path::PathBuf;
use std::time::Duration;

use cas_client_sdk::ProtocolVersion;
use url::Url;

use super::error::DomainError;
use super::proxy_chain::ProxyChainPolicy;
use super::url_builder::server_base_url;
use crate::config::CasClientConfig;

/// Settings read at request time. Only constructible from a valid
/// [`CasClientConfig`].
#[derive(Debug, Clone)]
pub struct ServiceConfiguration {
    /// `https://host[:port]/path/`, always with exactly one trailing slash.
    pub server_base_url: String,
    pub version: ProtocolVersion,
    pub is_proxy_initiator: bool,
    pub can_be_proxied: bool,
    pub ca_cert: Option<PathBuf>,
    pub proxy_chains: ProxyChainPolicy,
    pub timeout: Duration,

    /// Absolute URL of this application, without trailing slash.
    pub app_base_url: Url,
    /// Absolute URL of the protocol entry point, without query.
    pub service_url: Url,
    /// Absolute HTTPS URL of the proxy callback endpoint.
    pub proxy_callback_url: Url,
    pub service_path: String,
    pub proxy_callback_path: String,
    pub home_path: String,
    pub destination_param: String,
    pub temp_disable_param: String,
}

impl ServiceConfiguration {
    /// Validate the raw configuration.
    ///
    /// # Errors
    ///
    /// `Configuration` describing the first invalid setting.
    pub fn from_config(cfg: &CasClientConfig) -> Result<Self, DomainError> {
        let server = &cfg.server;
        let hostname = server.hostname.trim();
        if hostname.is_empty() {
            return Err(DomainError::configuration("server.hostname is required"));
        }
        if hostname.contains("://") || hostname.contains('/') {
            return Err(DomainError::configuration(format!(
                "server.hostname must be a bare host name, got '{hostname}'"
            )));
        }
        if server.port == Some(0) {
            return Err(DomainError::configuration("server.port must not be 0"));
        }
        if server.timeout_secs == 0 {
            return Err(DomainError::configuration(
                "server.timeout_secs must be positive",
            ));
        }
        if cfg.proxy.initialize && server.version != ProtocolVersion::V2 {
            return Err(DomainError::configuration(
                "proxy.initialize requires protocol version 2.0",
            ));
        }
        if let Some(ca) = &server.ca_cert
            && !ca.is_file()
        {
            return Err(DomainError::configuration(format!(
                "server.ca_cert '{}' is not a readable file",
                ca.display()
            )));
        }

        let svc = &cfg.service;
        let base = parse_app_base(&svc.base_url)?;
        let service_path = local_path("service.service_path", &svc.service_path)?;
        let proxy_callback_path =
            local_path("service.proxy_callback_path", &svc.proxy_callback_path)?;
        let home_path = local_path("service.home_path", &svc.home_path)?;
        if service_path == proxy_callback_path {
            return Err(DomainError::configuration(
                "service.service_path and service.proxy_callback_path must differ",
            ));
        }
        for (name, value) in [
            ("service.destination_param", &svc.destination_param),
            ("service.temp_disable_param", &svc.temp_disable_param),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::configuration(format!("{name} is required")));
            }
        }

        let service_url = join_path(&base, &service_path)?;
        let mut proxy_callback_url = join_path(&base, &proxy_callback_path)?;
        if proxy_callback_url.scheme() != "https" {
            proxy_callback_url.set_scheme("https").map_err(|()| {
                DomainError::configuration("proxy callback URL cannot use https")
            })?;
        }

        Ok(Self {
            server_base_url: server_base_url(hostname, server.port, &server.path),
            version: server.version,
            is_proxy_initiator: cfg.proxy.initialize,
            can_be_proxied: cfg.proxy.can_be_proxied,
            ca_cert: server.ca_cert.clone(),
            proxy_chains: ProxyChainPolicy::parse(&cfg.proxy.proxy_chains)?,
            timeout: Duration::from_secs(server.timeout_secs),
            app_base_url: base,
            service_url,
            proxy_callback_url,
            service_path,
            proxy_callback_path,
            home_path,
            destination_param: svc.destination_param.clone(),
            temp_disable_param: svc.temp_disable_param.clone(),
        })
    }
}

fn parse_app_base(raw: &str) -> Result<Url, DomainError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(DomainError::configuration("service.base_url is required"));
    }
    let url = Url::parse(trimmed).map_err(|e| {
        DomainError::configuration(format!("service.base_url '{raw}' is invalid: {e}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(DomainError::configuration(format!(
            "service.base_url '{raw}' must be an absolute http(s) URL"
        )));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(DomainError::configuration(format!(
            "service.base_url '{raw}' must not carry a query or fragment"
        )));
    }
    Ok(url)
}

fn local_path(name: &str, raw: &str) -> Result<String, DomainError> {
    let path = raw.trim();
    if !path.starts_with('/') || path.starts_with("//") || path.contains(['?', '#']) {
        return Err(DomainError::configuration(format!(
            "{name} must be an absolute path, got '{raw}'"
        )));
    }
    Ok(path.to_owned())
}

fn join_path(base: &Url, path: &str) -> Result<Url, DomainError> {
    let joined = format!("{}{path}", base.as_str().trim_end_matches('/'));
    Url::parse(&joined)
        .map_err(|e| DomainError::configuration(format!("cannot build URL '{joined}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_config;

    #[test]
    fn builds_absolute_endpoint_urls() {
        let mut cfg = test_config();
        cfg.service.base_url = "http://example.com/app/".to_owned();
        cfg.service.service_path = "/client".to_owned();

        let settings = ServiceConfiguration::from_config(&cfg).unwrap();
        assert_eq!(settings.service_url.as_str(), "http://example.com/app/client");
        assert_eq!(
            settings.proxy_callback_url.as_str(),
            "https://example.com/app/cas/proxy-callback"
        );
        assert_eq!(settings.server_base_url, "https://example.com/cas/");
    }

    #[test]
    fn missing_hostname_is_fatal() {
        let mut cfg = test_config();
        cfg.server.hostname = "  ".to_owned();
        let err = ServiceConfiguration::from_config(&cfg).unwrap_err();
        assert!(matches!(err, DomainError::Configuration { .. }));
    }

    #[test]
    fn hostname_with_scheme_is_rejected() {
        let mut cfg = test_config();
        cfg.server.hostname = "https://cas.example.com".to_owned();
        assert!(ServiceConfiguration::from_config(&cfg).is_err());
    }

    #[test]
    fn relative_base_url_is_rejected() {
        let mut cfg = test_config();
        cfg.service.base_url = "example.com".to_owned();
        assert!(ServiceConfiguration::from_config(&cfg).is_err());
    }

    #[test]
    fn proxy_initiator_requires_v2() {
        let mut cfg = test_config();
        cfg.server.version = ProtocolVersion::V1;
        cfg.proxy.initialize = true;
        let err = ServiceConfiguration::from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("2.0"));
    }

    #[test]
    fn missing_ca_bundle_is_fatal() {
        let mut cfg = test_config();
        cfg.server.ca_cert = Some(PathBuf::from("/nonexistent/ca.pem"));
        assert!(ServiceConfiguration::from_config(&cfg).is_err());
    }

    #[test]
    fn protocol_relative_home_is_rejected() {
        let mut cfg = test_config();
        cfg.service.home_path = "//evil.example.org".to_owned();
        assert!(ServiceConfiguration::from_config(&cfg).is_err());
    }

    #[test]
    fn endpoint_paths_must_differ() {
        let mut cfg = test_config();
        cfg.service.proxy_callback_path = "/client".to_owned();
        assert!(ServiceConfiguration::from_config(&cfg).is_err());
    }
}
