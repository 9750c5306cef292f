//! HTTPS transport to the CAS server.

use std::error::Error as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use cas_client_sdk::{Transport, TransportError, TransportRequest};
use dashmap::DashMap;
use http::header::{ACCEPT, USER_AGENT};
use http_body_util::{BodyExt, Empty, Limited};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use rustls::{ClientConfig, RootCertStore};
use rustls_pki_types::CertificateDer;
use rustls_pki_types::pem::PemObject;
use tracing::{debug, warn};

type HttpsClient = Client<HttpsConnector<HttpConnector>, Empty<Bytes>>;

const MAX_BODY_BYTES: usize = 1024 * 1024;
const AGENT: &str = concat!("cas-client/", env!("CARGO_PKG_VERSION"));

/// `hyper` client speaking HTTPS only, verifying the server against either a
/// configured PEM bundle or the platform trust store.
///
/// One client is built per trust anchor and reused across requests.
#[derive(Default)]
pub struct HyperTransport {
    clients: DashMap<Option<PathBuf>, HttpsClient>,
}

impl HyperTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn client_for(&self, ca_cert: Option<&Path>) -> Result<HttpsClient, TransportError> {
        let key = ca_cert.map(Path::to_path_buf);
        let entry = self
            .clients
            .entry(key)
            .or_try_insert_with(|| build_client(ca_cert))?;
        Ok(entry.value().clone())
    }

    async fn fetch(&self, client: HttpsClient, uri: http::Uri) -> Result<String, TransportError> {
        let req = http::Request::get(uri)
            .header(ACCEPT, "text/xml, text/plain, */*")
            .header(USER_AGENT, AGENT)
            .body(Empty::<Bytes>::new())
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        let resp = client
            .request(req)
            .await
            .map_err(|e| TransportError::Connect(error_chain(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = Limited::new(resp.into_body(), MAX_BODY_BYTES)
            .collect()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?
            .to_bytes();
        String::from_utf8(body.to_vec()).map_err(|e| TransportError::Body(e.to_string()))
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn get(&self, request: &TransportRequest) -> Result<String, TransportError> {
        let uri: http::Uri = request
            .url
            .parse()
            .map_err(|e: http::uri::InvalidUri| TransportError::InvalidUrl(e.to_string()))?;
        if uri.scheme_str() != Some("https") {
            return Err(TransportError::InvalidUrl(
                "only https URLs are allowed".to_owned(),
            ));
        }
        let client = self.client_for(request.ca_cert.as_deref())?;

        debug!(host = uri.host().unwrap_or_default(), "calling CAS server");
        tokio::time::timeout(request.timeout, self.fetch(client, uri))
            .await
            .map_err(|_| TransportError::Timeout(request.timeout))?
    }
}

fn build_client(ca_cert: Option<&Path>) -> Result<HttpsClient, TransportError> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TransportError::Tls(e.to_string()))?
        .with_root_certificates(load_roots(ca_cert)?)
        .with_no_client_auth();

    let https = HttpsConnectorBuilder::new()
        .with_tls_config(config)
        .https_only()
        .enable_http1()
        .build();
    Ok(Client::builder(TokioExecutor::new()).build(https))
}

fn load_roots(ca_cert: Option<&Path>) -> Result<RootCertStore, TransportError> {
    let mut roots = RootCertStore::empty();
    match ca_cert {
        Some(path) => {
            let certs = CertificateDer::pem_file_iter(path)
                .and_then(Iterator::collect::<Result<Vec<_>, _>>)
                .map_err(|e| {
                    TransportError::Tls(format!("cannot read CA bundle {}: {e}", path.display()))
                })?;
            let (added, ignored) = roots.add_parsable_certificates(certs);
            if ignored > 0 {
                warn!(path = %path.display(), ignored, "skipped unparsable CA certificates");
            }
            if added == 0 {
                return Err(TransportError::Tls(format!(
                    "no usable certificates in {}",
                    path.display()
                )));
            }
        }
        None => {
            let native = rustls_native_certs::load_native_certs();
            for e in &native.errors {
                warn!(error = %e, "error loading platform certificates");
            }
            roots.add_parsable_certificates(native.certs);
            if roots.is_empty() {
                return Err(TransportError::Tls(
                    "no platform root certificates available".to_owned(),
                ));
            }
        }
    }
    Ok(roots)
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut msg = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        source = inner.source();
    }
    msg
}
