//! Registry of per-user memory handles sharing one store and one extractor.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::config::MemoryConfig;
use crate::error::ZhimiResult;
use crate::traits::Llm;
use crate::types::Message;

use super::extractor::{ExtractorConfig, MemoryExtractor};
use super::storage::UserMemoryStorage;
use super::user_memory::UserMemory;

/// Owns every [`UserMemory`] handed out in this process.
pub struct UserMemoryManager {
    storage: Arc<UserMemoryStorage>,
    extractor: Arc<MemoryExtractor>,
    users: RwLock<HashMap<String, Arc<UserMemory>>>,
}

impl UserMemoryManager {
    pub fn new(storage: Arc<UserMemoryStorage>, extractor: Arc<MemoryExtractor>) -> Self {
        Self {
            storage,
            extractor,
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Build the store at `storage_path` and an extractor over `llm`.
    pub fn from_config(
        config: &MemoryConfig,
        storage_path: impl AsRef<Path>,
        llm: Arc<dyn Llm>,
    ) -> ZhimiResult<Self> {
        let storage = Arc::new(UserMemoryStorage::new(storage_path.as_ref())?);
        let extractor = Arc::new(MemoryExtractor::new(llm, ExtractorConfig::from(config)));
        Ok(Self::new(storage, extractor))
    }

    pub fn storage(&self) -> &Arc<UserMemoryStorage> {
        &self.storage
    }

    /// The handle for `user_id`, created on first request.
    pub fn user(&self, user_id: &str) -> Arc<UserMemory> {
        if let Some(memory) = self.read_users().get(user_id) {
            return memory.clone();
        }

        let mut users = self
            .users
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        users
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!(user_id, "Creating user memory handle");
                Arc::new(UserMemory::new(
                    user_id,
                    self.storage.clone(),
                    self.extractor.clone(),
                ))
            })
            .clone()
    }

    /// Summary text for prompt injection.
    pub fn memory_summary(&self, user_id: &str) -> String {
        self.user(user_id).get_memory_summary()
    }

    /// Run the extract-and-merge loop for one user.
    pub async fn update_from_messages(&self, user_id: &str, messages: &[Message]) -> bool {
        self.user(user_id).update_from_messages(messages).await
    }

    /// Drop every cached profile.
    pub fn invalidate_all(&self) {
        for memory in self.read_users().values() {
            memory.invalidate();
        }
    }

    fn read_users(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<UserMemory>>> {
        self.users
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
