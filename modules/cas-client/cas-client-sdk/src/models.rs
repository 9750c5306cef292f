//! Domain models for the CAS client.

use std::collections::BTreeMap;
use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// CAS protocol version spoken with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// Plain-text `yes`/`no` validation responses.
    #[serde(rename = "1.0")]
    V1,
    /// XML validation responses with attributes and proxy support.
    #[default]
    #[serde(rename = "2.0")]
    V2,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => f.write_str("1.0"),
            Self::V2 => f.write_str("2.0"),
        }
    }
}

/// Ordered list of proxy URLs that relayed a ticket, outermost proxy first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProxyChain(Vec<String>);

impl ProxyChain {
    #[must_use]
    pub fn new(proxies: Vec<String>) -> Self {
        Self(proxies)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of a successful service ticket validation (the CAS property bag).
///
/// Immutable once built; compared by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationResult {
    principal: String,
    attributes: BTreeMap<String, Vec<String>>,
    pgt_iou: Option<String>,
    proxy_chain: Option<ProxyChain>,
}

impl AuthenticationResult {
    /// Result carrying only a principal, as produced by CAS 1.0.
    #[must_use]
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            attributes: BTreeMap::new(),
            pgt_iou: None,
            proxy_chain: None,
        }
    }

    #[must_use]
    pub fn builder(principal: impl Into<String>) -> AuthenticationResultBuilder {
        AuthenticationResultBuilder {
            inner: Self::new(principal),
        }
    }

    /// The authenticated user identifier.
    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Server-supplied attributes; each key maps to every value sent for it.
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, Vec<String>> {
        &self.attributes
    }

    /// First value of the named attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// The proxy-granting ticket IOU, present when a `pgtUrl` was sent.
    #[must_use]
    pub fn pgt_iou(&self) -> Option<&str> {
        self.pgt_iou.as_deref()
    }

    #[must_use]
    pub fn proxy_chain(&self) -> Option<&ProxyChain> {
        self.proxy_chain.as_ref()
    }
}

/// Builder for [`AuthenticationResult`].
#[derive(Debug, Clone)]
pub struct AuthenticationResultBuilder {
    inner: AuthenticationResult,
}

impl AuthenticationResultBuilder {
    /// Append one value to an attribute.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner
            .attributes
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Replace all attributes.
    #[must_use]
    pub fn attributes(mut self, attributes: BTreeMap<String, Vec<String>>) -> Self {
        self.inner.attributes = attributes;
        self
    }

    #[must_use]
    pub fn pgt_iou(mut self, pgt_iou: impl Into<String>) -> Self {
        self.inner.pgt_iou = Some(pgt_iou.into());
        self
    }

    /// Attach the proxy chain. An empty chain means the ticket was not proxied.
    #[must_use]
    pub fn proxy_chain(mut self, chain: ProxyChain) -> Self {
        self.inner.proxy_chain = (!chain.is_empty()).then_some(chain);
        self
    }

    #[must_use]
    pub fn build(self) -> AuthenticationResult {
        self.inner
    }
}

/// A proxy-granting ticket delivered to the proxy callback endpoint,
/// keyed by its IOU.
#[derive(Debug, Clone)]
pub struct PgtMapping {
    pgt_iou: String,
    pgt: SecretString,
}

impl PgtMapping {
    #[must_use]
    pub fn new(pgt_iou: impl Into<String>, pgt: SecretString) -> Self {
        Self {
            pgt_iou: pgt_iou.into(),
            pgt,
        }
    }

    #[must_use]
    pub fn pgt_iou(&self) -> &str {
        &self.pgt_iou
    }

    #[must_use]
    pub fn pgt(&self) -> &SecretString {
        &self.pgt
    }

    #[must_use]
    pub fn into_parts(self) -> (String, SecretString) {
        (self.pgt_iou, self.pgt)
    }
}

/// Identifier of the local (host application) session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Local account the CAS principal was mapped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUser {
    pub id: String,
    pub name: String,
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Status,
    Warning,
    Error,
}

/// Query parameters reattached to the service URL.
///
/// Keys are unique and keep their first insertion position, so the service
/// URL rebuilt at validation time matches the one sent at login time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceParams(Vec<(String, String)>);

impl ServiceParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    ///
    /// A repeated key keeps its first position and its last value.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Insert or replace a parameter, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.0.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(pos).1)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encode as a query string (without the leading `?`).
    #[must_use]
    pub fn to_query(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for ServiceParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}
