//! Directory loader for plain-text and Markdown documents.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{ZhimiError, ZhimiResult};

/// A whole source document before splitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Path the document was read from.
    pub source: String,
    pub content: String,
}

impl Document {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }
}

/// Load every file under `dir` whose extension is in `extensions`.
///
/// Files are visited in name order. Unreadable or non-UTF-8 files are logged
/// and skipped.
pub fn load_documents(dir: impl AsRef<Path>, extensions: &[String]) -> ZhimiResult<Vec<Document>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(ZhimiError::validation_with_suggestion(
            format!("{} is not a directory", dir.display()),
            "Pass the folder containing your .txt/.md documents",
        ));
    }

    let mut documents = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() || !has_extension(path, extensions) {
            continue;
        }

        match fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "Loaded document");
                documents.push(Document::new(path.display().to_string(), content));
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable document"),
        }
    }

    info!(count = documents.len(), dir = %dir.display(), "Loaded documents");
    Ok(documents)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
