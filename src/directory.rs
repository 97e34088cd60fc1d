use async_trait::async_trait;
use dashmap::DashMap;

use crate::model::UserId;
use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub is_administrator: bool,
}

/// The identity subsystem: who is calling, and what people are called.
#[async_trait]
pub trait Identity: Send + Sync {
    async fn display_name(&self, user_id: &str) -> Result<String, StoreError>;
    fn current_user(&self) -> CurrentUser;
}

/// Fixed-identity implementation for tests and single-user tooling.
/// Unknown users resolve to their raw id.
pub struct StaticIdentity {
    current: CurrentUser,
    names: DashMap<UserId, String>,
}

impl StaticIdentity {
    pub fn new(current_id: &str, is_administrator: bool) -> Self {
        Self {
            current: CurrentUser { id: current_id.to_string(), is_administrator },
            names: DashMap::new(),
        }
    }

    pub fn set_name(&self, user_id: &str, name: &str) {
        self.names.insert(user_id.to_string(), name.to_string());
    }
}

#[async_trait]
impl Identity for StaticIdentity {
    async fn display_name(&self, user_id: &str) -> Result<String, StoreError> {
        Ok(self
            .names
            .get(user_id)
            .map(|e| e.value().clone())
            .unwrap_or_else(|| user_id.to_string()))
    }

    fn current_user(&self) -> CurrentUser {
        self.current.clone()
    }
}
