//! Allow-list for the proxies a ticket may have been relayed through.

use cas_client_sdk::ProxyChain;
use regex::Regex;

use super::error::DomainError;

#[derive(Debug, Clone)]
enum ChainPattern {
    Prefix(String),
    Regex(Regex),
}

impl ChainPattern {
    fn parse(entry: &str) -> Result<Self, DomainError> {
        if let Some(inner) = entry
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
        {
            let re = Regex::new(inner).map_err(|e| {
                DomainError::configuration(format!("invalid proxy chain pattern '{entry}': {e}"))
            })?;
            return Ok(Self::Regex(re));
        }
        Ok(Self::Prefix(entry.to_owned()))
    }

    fn matches(&self, proxy: &str) -> bool {
        match self {
            Self::Regex(re) => re.is_match(proxy),
            Self::Prefix(prefix) => {
                let Some(rest) = proxy.strip_prefix(prefix.as_str()) else {
                    return false;
                };
                rest.is_empty()
                    || prefix.ends_with('/')
                    || rest.starts_with(['/', '?', '#'])
            }
        }
    }
}

/// Configured proxy allow-list.
///
/// Entries written between slashes are regular expressions; anything else
/// is a literal URL prefix that only matches on a path boundary.
#[derive(Debug, Clone, Default)]
pub struct ProxyChainPolicy {
    patterns: Vec<ChainPattern>,
}

impl ProxyChainPolicy {
    /// Compile the configured entries. Blank entries are ignored.
    ///
    /// # Errors
    ///
    /// `Configuration` when a regular expression does not compile.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, DomainError> {
        let patterns = entries
            .iter()
            .map(|e| e.as_ref().trim())
            .filter(|e| !e.is_empty())
            .map(ChainPattern::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether a ticket relayed through `chain` may be accepted.
    ///
    /// Unproxied tickets are always accepted. Otherwise every proxy in the
    /// chain must match at least one entry.
    #[must_use]
    pub fn allows(&self, chain: Option<&ProxyChain>) -> bool {
        let Some(chain) = chain.filter(|c| !c.is_empty()) else {
            return true;
        };
        chain
            .iter()
            .all(|proxy| self.patterns.iter().any(|p| p.matches(proxy)))
    }
}
