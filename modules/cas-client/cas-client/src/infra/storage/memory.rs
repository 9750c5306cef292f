use async_trait::async_trait;
use cas_client_sdk::{PgtMapping, PgtStore, StoreError};
use dashmap::DashMap;
use secrecy::SecretString;

/// PGT store for single-process deployments.
///
/// `take` is a `DashMap::remove`, which hands the value to exactly one caller.
#[derive(Debug, Default)]
pub struct InMemoryPgtStore {
    mappings: DashMap<String, SecretString>,
}

impl InMemoryPgtStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

#[async_trait]
impl PgtStore for InMemoryPgtStore {
    async fn save(&self, mapping: PgtMapping) -> Result<(), StoreError> {
        let (pgt_iou, pgt) = mapping.into_parts();
        self.mappings.insert(pgt_iou, pgt);
        Ok(())
    }

    async fn take(&self, pgt_iou: &str) -> Result<Option<SecretString>, StoreError> {
        Ok(self.mappings.remove(pgt_iou).map(|(_, pgt)| pgt))
    }
}
