use async_trait::async_trait;
use dashmap::DashMap;

use crate::model::{Court, CourtId};
use crate::store::StoreError;

/// Read-only view of the court catalog. Court definitions are owned by the
/// administration surface outside this crate.
#[async_trait]
pub trait CourtCatalog: Send + Sync {
    async fn court(&self, id: CourtId) -> Result<Option<Court>, StoreError>;
}

/// In-memory catalog for tests and local tooling.
pub struct MemoryCatalog {
    courts: DashMap<CourtId, Court>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self { courts: DashMap::new() }
    }

    pub fn insert(&self, court: Court) {
        self.courts.insert(court.id, court);
    }
}

#[async_trait]
impl CourtCatalog for MemoryCatalog {
    async fn court(&self, id: CourtId) -> Result<Option<Court>, StoreError> {
        Ok(self.courts.get(&id).map(|e| e.value().clone()))
    }
}
