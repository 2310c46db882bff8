//! User profile and extracted-information types.
//!
//! Decoding from JSON is lenient throughout: the values come either from a
//! language model or from a hand-editable file, so a field of the wrong type
//! falls back to its empty default instead of rejecting the whole record.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Languages, tools and topics the user favours.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub programming_languages: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    /// Keys outside the fixed schema, kept so they round-trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Preferences {
    fn from_map(map: &Map<String, Value>) -> Self {
        let mut prefs = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "programming_languages" => read_list(value, &mut prefs.programming_languages),
                "tools" => read_list(value, &mut prefs.tools),
                "topics" => read_list(value, &mut prefs.topics),
                _ => {
                    prefs.extra.insert(key.clone(), value.clone());
                }
            }
        }
        prefs
    }

    pub fn is_empty(&self) -> bool {
        self.programming_languages.is_empty() && self.tools.is_empty() && self.topics.is_empty()
    }
}

/// Profession, experience and projects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Background {
    #[serde(default)]
    pub profession: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Background {
    fn from_map(map: &Map<String, Value>) -> Self {
        let mut background = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "profession" => read_scalar(value, &mut background.profession),
                "experience" => read_scalar(value, &mut background.experience),
                "projects" => read_list(value, &mut background.projects),
                _ => {
                    background.extra.insert(key.clone(), value.clone());
                }
            }
        }
        background
    }

    pub fn is_empty(&self) -> bool {
        is_blank(&self.profession) && is_blank(&self.experience) && self.projects.is_empty()
    }
}

/// Whitespace-only scalars count as unset.
pub(crate) fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Fixed-schema record produced by one extraction pass.
///
/// `StructuredInfo::default()` is the all-empty sentinel returned whenever
/// extraction yields nothing usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredInfo {
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub background: Background,
}

impl StructuredInfo {
    /// Whether any list is non-empty or any scalar is non-blank.
    pub fn has_info(&self) -> bool {
        !self.preferences.is_empty() || !self.background.is_empty()
    }

    /// Read the known fields out of a decoded model response.
    ///
    /// Only the fixed schema is taken; unknown keys at either level are
    /// dropped. A list field given as a single non-blank string becomes a
    /// one-element list.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let mut info = Self::default();
        if let Some(Value::Object(prefs)) = object.get("preferences") {
            info.preferences = Preferences::from_map(prefs);
            info.preferences.extra.clear();
        }
        if let Some(Value::Object(background)) = object.get("background") {
            info.background = Background::from_map(background);
            info.background.extra.clear();
        }
        info
    }

    /// JSON object form used as the merge input.
    pub fn to_object(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// One user's persisted memory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub background: Background,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Empty profile stamped with the current time.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            preferences: Preferences::default(),
            background: Background::default(),
            updated_at: Utc::now(),
            extra: Map::new(),
        }
    }

    /// Decode a stored record, tolerating missing or mistyped fields.
    ///
    /// Returns `None` when the record is not a JSON object.
    pub fn from_value(user_id: &str, value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut profile = Self::new(user_id);

        for (key, value) in object {
            match key.as_str() {
                "user_id" => {
                    if let Some(id) = value.as_str() {
                        profile.user_id = id.to_string();
                    }
                }
                "preferences" => {
                    if let Value::Object(map) = value {
                        profile.preferences = Preferences::from_map(map);
                    }
                }
                "background" => {
                    if let Value::Object(map) = value {
                        profile.background = Background::from_map(map);
                    }
                }
                "updated_at" => {
                    if let Some(ts) = value.as_str().and_then(parse_timestamp) {
                        profile.updated_at = ts;
                    }
                }
                _ => {
                    profile.extra.insert(key.clone(), value.clone());
                }
            }
        }

        Some(profile)
    }

    /// Whether any preference or background field is populated.
    pub fn has_info(&self) -> bool {
        !self.preferences.is_empty() || !self.background.is_empty()
    }
}

fn read_list(value: &Value, target: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            *target = items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
        }
        Value::String(s) if !s.trim().is_empty() => *target = vec![s.clone()],
        _ => {}
    }
}

fn read_scalar(value: &Value, target: &mut String) {
    if let Some(s) = value.as_str() {
        *target = s.to_string();
    }
}

/// Accept RFC 3339 as well as offset-less ISO timestamps (taken as UTC).
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}
