//! Per-user memory handle: cached profile, summary rendering and the
//! extract-then-merge update loop.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, instrument};

use crate::types::Message;

use super::extractor::MemoryExtractor;
use super::profile::{is_blank, Background, Preferences, StructuredInfo, UserProfile};
use super::storage::UserMemoryStorage;

/// Memory for a single `user_id`.
pub struct UserMemory {
    user_id: String,
    storage: Arc<UserMemoryStorage>,
    extractor: Arc<MemoryExtractor>,
    cache: Mutex<Option<UserProfile>>,
}

impl UserMemory {
    pub fn new(
        user_id: impl Into<String>,
        storage: Arc<UserMemoryStorage>,
        extractor: Arc<MemoryExtractor>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            storage,
            extractor,
            cache: Mutex::new(None),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The profile, read from the store on first use and cached until the
    /// next successful write.
    pub fn load(&self) -> UserProfile {
        let mut cache = self.cache();
        cache
            .get_or_insert_with(|| self.storage.load_memory(&self.user_id))
            .clone()
    }

    pub fn preferences(&self) -> Preferences {
        self.load().preferences
    }

    pub fn background(&self) -> Background {
        self.load().background
    }

    pub fn get_all(&self) -> UserProfile {
        self.load()
    }

    /// Markdown block for prompt injection; empty when nothing is known.
    pub fn get_memory_summary(&self) -> String {
        render_summary(&self.load())
    }

    /// Extract from `"<role>: <text>"` turns and merge the result.
    ///
    /// Returns `false` without touching the store when nothing was extracted.
    #[instrument(skip(self, conversation), fields(user_id = %self.user_id))]
    pub async fn update_from_conversation(&self, conversation: &[String]) -> bool {
        let info = self.extractor.extract_user_info(conversation).await;
        self.commit_extracted(info)
    }

    /// Extract from chat messages and merge the result.
    #[instrument(skip(self, messages), fields(user_id = %self.user_id))]
    pub async fn update_from_messages(&self, messages: &[Message]) -> bool {
        let info = self.extractor.extract_from_messages(messages).await;
        self.commit_extracted(info)
    }

    /// Merge `info` into the stored profile.
    pub fn update_memory(&self, info: &StructuredInfo) -> bool {
        let saved = self.storage.update_memory(&self.user_id, info);
        if saved {
            self.invalidate();
        }
        saved
    }

    /// Reset the stored profile to empty defaults.
    pub fn clear(&self) -> bool {
        let cleared = self.storage.clear_memory(&self.user_id);
        if cleared {
            self.invalidate();
        }
        cleared
    }

    /// Drop the cached profile so the next read goes to the store.
    pub fn invalidate(&self) {
        *self.cache() = None;
    }

    fn commit_extracted(&self, info: StructuredInfo) -> bool {
        if !info.has_info() {
            debug!("Nothing extracted, memory unchanged");
            return false;
        }
        self.update_memory(&info)
    }

    fn cache(&self) -> MutexGuard<'_, Option<UserProfile>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Render the populated parts of a profile as Markdown.
pub fn render_summary(profile: &UserProfile) -> String {
    let mut parts: Vec<String> = Vec::new();

    let prefs = &profile.preferences;
    let pref_items: Vec<String> = [
        ("编程语言", &prefs.programming_languages),
        ("工具偏好", &prefs.tools),
        ("话题偏好", &prefs.topics),
    ]
    .into_iter()
    .filter(|(_, items)| !items.is_empty())
    .map(|(label, items)| format!("- {}：{}", label, items.join(", ")))
    .collect();

    if !pref_items.is_empty() {
        parts.push("### 用户偏好".to_string());
        parts.extend(pref_items);
    }

    let bg = &profile.background;
    let mut bg_items = Vec::new();
    if !is_blank(&bg.profession) {
        bg_items.push(format!("- 职业：{}", bg.profession));
    }
    if !is_blank(&bg.experience) {
        bg_items.push(format!("- 经验：{}", bg.experience));
    }
    if !bg.projects.is_empty() {
        bg_items.push(format!("- 项目：{}", bg.projects.join(", ")));
    }

    if !bg_items.is_empty() {
        parts.push("### 用户背景".to_string());
        parts.extend(bg_items);
    }

    if parts.is_empty() {
        String::new()
    } else {
        format!("## 用户记忆\n\n{}", parts.join("\n"))
    }
}
