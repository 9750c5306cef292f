//! Account resolution driven by configuration.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use cas_client_sdk::{AccountError, AccountResolver, LocalUser};

use crate::config::AccountsConfig;

/// Maps principals to local users from static policy: blocked principals
/// are refused, and without auto-registration only listed principals exist.
#[derive(Debug, Clone)]
pub struct ConfiguredAccountResolver {
    auto_register: bool,
    allowed: HashSet<String>,
    blocked: HashSet<String>,
    name_attribute: String,
}

impl ConfiguredAccountResolver {
    #[must_use]
    pub fn from_config(cfg: &AccountsConfig) -> Self {
        Self {
            auto_register: cfg.auto_register,
            allowed: cfg.allowed.iter().cloned().collect(),
            blocked: cfg.blocked.iter().cloned().collect(),
            name_attribute: cfg.name_attribute.clone(),
        }
    }
}

#[async_trait]
impl AccountResolver for ConfiguredAccountResolver {
    async fn resolve_or_create(
        &self,
        principal: &str,
        attributes: &BTreeMap<String, Vec<String>>,
    ) -> Result<LocalUser, AccountError> {
        let principal = principal.trim();
        if principal.is_empty() {
            return Err(AccountError::Denied("empty principal".to_owned()));
        }
        if self.blocked.contains(principal) {
            return Err(AccountError::Blocked(principal.to_owned()));
        }
        if !self.auto_register && !self.allowed.contains(principal) {
            return Err(AccountError::Unknown(principal.to_owned()));
        }

        let name = attributes
            .get(&self.name_attribute)
            .and_then(|values| values.first())
            .filter(|n| !n.trim().is_empty())
            .map_or_else(|| principal.to_owned(), Clone::clone);

        Ok(LocalUser {
            id: principal.to_owned(),
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(auto_register: bool) -> ConfiguredAccountResolver {
        ConfiguredAccountResolver::from_config(&AccountsConfig {
            auto_register,
            allowed: vec!["known".to_owned()],
            blocked: vec!["mallory".to_owned()],
            ..AccountsConfig::default()
        })
    }

    #[tokio::test]
    async fn display_name_from_attribute() {
        let attrs = BTreeMap::from([("displayName".to_owned(), vec!["Test User".to_owned()])]);
        let user = resolver(true).resolve_or_create("testuser", &attrs).await.unwrap();
        assert_eq!(user.id, "testuser");
        assert_eq!(user.name, "Test User");

        let user = resolver(true)
            .resolve_or_create("testuser", &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(user.name, "testuser");
    }

    #[tokio::test]
    async fn policy_rejections() {
        let none = BTreeMap::new();
        assert_eq!(
            resolver(true).resolve_or_create("mallory", &none).await,
            Err(AccountError::Blocked("mallory".to_owned()))
        );
        assert_eq!(
            resolver(false).resolve_or_create("stranger", &none).await,
            Err(AccountError::Unknown("stranger".to_owned()))
        );
        assert!(resolver(false).resolve_or_create("known", &none).await.is_ok());
        assert!(resolver(true).resolve_or_create(" ", &none).await.is_err());
    }
}
