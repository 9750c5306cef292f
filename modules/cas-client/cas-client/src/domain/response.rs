//! Decoding of CAS server responses.

use std::collections::BTreeMap;

use cas_client_sdk::{AuthenticationResult, ProtocolVersion, ProxyChain};

use super::xml::{self, Element};

const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Children of `cas:authenticationSuccess` that are not attributes.
const SUCCESS_FIELDS: [&str; 4] = ["user", "attributes", "proxyGrantingTicket", "proxies"];

/// A validation response, decoded once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResponse {
    /// CAS 1.0 `yes` answer.
    PlainTextOk { principal: String },
    /// CAS 2.0 `cas:authenticationSuccess`.
    XmlOk {
        principal: String,
        attributes: BTreeMap<String, Vec<String>>,
        pgt_iou: Option<String>,
        proxy_chain: Option<ProxyChain>,
    },
    /// Explicit rejection by the server.
    Failure { code: Option<String>, reason: String },
}

impl ValidationResponse {
    /// Decode a response body for the given protocol version.
    ///
    /// # Errors
    ///
    /// A description of why the body is not a complete response envelope.
    pub fn decode(version: ProtocolVersion, body: &str) -> Result<Self, String> {
        if body.len() > MAX_RESPONSE_BYTES {
            return Err("response body too large".to_owned());
        }
        match version {
            ProtocolVersion::V1 => decode_plain_text(body),
            ProtocolVersion::V2 => decode_xml(body),
        }
    }

    /// The authentication result carried by a successful response.
    #[must_use]
    pub fn into_result(self) -> Option<AuthenticationResult> {
        match self {
            Self::PlainTextOk { principal } => Some(AuthenticationResult::new(principal)),
            Self::XmlOk {
                principal,
                attributes,
                pgt_iou,
                proxy_chain,
            } => {
                let mut builder = AuthenticationResult::builder(principal).attributes(attributes);
                if let Some(iou) = pgt_iou {
                    builder = builder.pgt_iou(iou);
                }
                if let Some(chain) = proxy_chain {
                    builder = builder.proxy_chain(chain);
                }
                Some(builder.build())
            }
            Self::Failure { .. } => None,
        }
    }
}

fn decode_plain_text(body: &str) -> Result<ValidationResponse, String> {
    let mut lines = body.lines().map(str::trim);
    match lines.next() {
        Some("yes") => {
            let principal = lines
                .next()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| "'yes' response without a principal".to_owned())?;
            Ok(ValidationResponse::PlainTextOk {
                principal: principal.to_owned(),
            })
        }
        Some("no") => Ok(ValidationResponse::Failure {
            code: None,
            reason: "ticket rejected".to_owned(),
        }),
        _ => Err("expected 'yes' or 'no' on the first line".to_owned()),
    }
}

fn service_response(body: &str) -> Result<Element, String> {
    let root = xml::parse(body)?;
    if root.name != "serviceResponse" {
        return Err(format!("unexpected root element <{}>", root.name));
    }
    Ok(root)
}

/// The single outcome element of a `serviceResponse`.
///
/// Exactly one child named `success` or `failure` must be present.
fn outcome<'a>(root: &'a Element, success: &str, failure: &str) -> Result<&'a Element, String> {
    let mut outcomes = root
        .children
        .iter()
        .filter(|c| c.name == success || c.name == failure);
    match (outcomes.next(), outcomes.next()) {
        (Some(only), None) => Ok(only),
        (None, _) => Err(format!(
            "serviceResponse carries neither {success} nor {failure}"
        )),
        (Some(_), Some(_)) => Err("serviceResponse carries more than one outcome".to_owned()),
    }
}

fn decode_xml(body: &str) -> Result<ValidationResponse, String> {
    let root = service_response(body)?;
    let outcome = outcome(&root, "authenticationSuccess", "authenticationFailure")?;

    if outcome.name == "authenticationFailure" {
        return Ok(ValidationResponse::Failure {
            code: outcome.attribute("code").map(str::to_owned),
            reason: outcome.text.clone(),
        });
    }

    let success = outcome;
    if success.children_named("user").count() > 1 {
        return Err("authenticationSuccess names more than one user".to_owned());
    }
    let principal = success
        .child_text("user")
        .ok_or_else(|| "authenticationSuccess without a user".to_owned())?
        .to_owned();

    let mut attributes: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let nested = success
        .child("attributes")
        .into_iter()
        .flat_map(|a| a.children.iter());
    let inline = success
        .children
        .iter()
        .filter(|c| !SUCCESS_FIELDS.contains(&c.name.as_str()));
    for attr in nested.chain(inline) {
        attributes
            .entry(attr.name.clone())
            .or_default()
            .push(attr.text.clone());
    }

    let proxies: Vec<String> = success
        .child("proxies")
        .into_iter()
        .flat_map(|p| p.children_named("proxy"))
        .map(|p| p.text.clone())
        .filter(|p| !p.is_empty())
        .collect();

    Ok(ValidationResponse::XmlOk {
        principal,
        attributes,
        pgt_iou: success.child_text("proxyGrantingTicket").map(str::to_owned),
        proxy_chain: (!proxies.is_empty()).then(|| ProxyChain::new(proxies)),
    })
}

/// Response of the `proxy` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyResponse {
    Ticket(String),
    Failure { code: Option<String>, reason: String },
}

impl ProxyResponse {
    /// # Errors
    ///
    /// A description of why the body is not a complete proxy response.
    pub fn decode(body: &str) -> Result<Self, String> {
        if body.len() > MAX_RESPONSE_BYTES {
            return Err("response body too large".to_owned());
        }
        let root = service_response(body)?;
        let outcome = outcome(&root, "proxySuccess", "proxyFailure")?;
        if outcome.name == "proxyFailure" {
            return Ok(Self::Failure {
                code: outcome.attribute("code").map(str::to_owned),
                reason: outcome.text.clone(),
            });
        }
        let ticket = outcome
            .child_text("proxyTicket")
            .ok_or_else(|| "proxySuccess without a proxyTicket".to_owned())?;
        Ok(Self::Ticket(ticket.to_owned()))
    }
}
