//! User storage behind the authentication service.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::AuthError;

/// A stored user: an id, its roles, and the configured fields by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub fields: BTreeMap<String, String>,
    pub roles: Vec<String>,
}

impl UserRecord {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// Persistence boundary for user accounts.
#[async_trait]
pub trait UserModel: Send + Sync {
    async fn count(&self) -> Result<u64, AuthError>;

    async fn create(&self, fields: BTreeMap<String, String>, roles: Vec<String>) -> Result<UserRecord, AuthError>;

    /// First user whose `field` equals `value`.
    async fn find_one(&self, field: &str, value: &str) -> Result<Option<UserRecord>, AuthError>;
}

/// In-process user store.
#[derive(Debug, Default)]
pub struct MemoryUserModel {
    users: RwLock<Vec<UserRecord>>,
}

impl MemoryUserModel {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserModel for MemoryUserModel {
    async fn count(&self) -> Result<u64, AuthError> {
        Ok(self.users.read().len() as u64)
    }

    async fn create(&self, fields: BTreeMap<String, String>, roles: Vec<String>) -> Result<UserRecord, AuthError> {
        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            fields,
            roles,
        };
        self.users.write().push(record.clone());
        Ok(record)
    }

    async fn find_one(&self, field: &str, value: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(self
            .users
            .read()
            .iter()
            .find(|user| user.get(field) == Some(value))
            .cloned())
    }
}

/// Named user models, looked up by the configured model name.
#[derive(Default)]
pub struct ModelRegistry {
    models: RwLock<HashMap<String, Arc<dyn UserModel>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, model: Arc<dyn UserModel>) {
        self.models.write().insert(name.into(), model);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn UserModel>> {
        self.models.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry").field("models", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn find_matches_on_named_field() {
        let model = MemoryUserModel::new();
        let fields = BTreeMap::from([("login".to_string(), "ana".to_string())]);
        let created = model.create(fields, vec![]).await.unwrap();

        assert_eq!(model.count().await.unwrap(), 1);
        assert_eq!(model.find_one("login", "ana").await.unwrap(), Some(created));
        assert!(model.find_one("username", "ana").await.unwrap().is_none());
    }
}
