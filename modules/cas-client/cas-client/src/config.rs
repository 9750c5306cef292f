//! Configuration for the CAS client module.

use std::path::PathBuf;

use cas_client_sdk::ProtocolVersion;
use serde::{Deserialize, Serialize};

/// Module configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CasClientConfig {
    /// The CAS server this application authenticates against.
    pub server: ServerConfig,

    /// How this application is reachable by browsers and by the CAS server.
    pub service: ServiceEndpointConfig,

    /// Proxy mode.
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// CAS server hostname, without scheme.
    pub hostname: String,

    /// HTTPS port. `None` or 443 is left out of generated URLs.
    pub port: Option<u16>,

    /// Path the CAS server is mounted under, e.g. `/cas`.
    pub path: String,

    pub version: ProtocolVersion,

    /// PEM bundle used to verify the CAS server certificate.
    /// Platform roots are used when unset.
    pub ca_cert: Option<PathBuf>,

    /// Bound on every outbound call to the CAS server.
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            port: Some(443),
            path: "/cas".to_owned(),
            version: ProtocolVersion::V2,
            ca_cert: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceEndpointConfig {
    /// Absolute base URL of this application, e.g. `https://example.com`.
    pub base_url: String,

    /// Path of the protocol entry point (the CAS `service`).
    pub service_path: String,

    /// Path of the proxy callback endpoint (the CAS `pgtUrl`).
    pub proxy_callback_path: String,

    /// Where users land after login or on validation failure.
    pub home_path: String,

    /// Query parameter the application redirects to after login.
    pub destination_param: String,

    /// Query flag that disables automatic CAS login for the session.
    pub temp_disable_param: String,
}

impl Default for ServiceEndpointConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            service_path: "/cas/service".to_owned(),
            proxy_callback_path: "/cas/proxy-callback".to_owned(),
            home_path: "/".to_owned(),
            destination_param: "destination".to_owned(),
            temp_disable_param: "cas_temp_disable".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    /// Request proxy-granting tickets at login (`pgtUrl`).
    pub initialize: bool,

    /// Accept proxy tickets (validate against `proxyValidate`).
    pub can_be_proxied: bool,

    /// Allowed proxies. Each entry is a `/regex/` or a literal URL prefix.
    pub proxy_chains: Vec<String>,
}

/// Policy for mapping CAS principals to local accounts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccountsConfig {
    /// Create a local account on first login.
    pub auto_register: bool,

    /// Principals known locally when `auto_register` is off.
    pub allowed: Vec<String>,

    /// Principals that may never log in.
    pub blocked: Vec<String>,

    /// CAS attribute used as the local display name.
    pub name_attribute: String,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            auto_register: true,
            allowed: Vec::new(),
            blocked: Vec::new(),
            name_attribute: "displayName".to_owned(),
        }
    }
}
