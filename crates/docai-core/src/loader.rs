//! Plain-text document loader.
//!
//! Walks a directory for `.txt`/`.md` files and turns each into a
//! [`Document`]. Rich formats (PDF, DOCX, ...) are handled by an external
//! extractor that writes text files this loader can pick up.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::Document;

const EXTENSIONS: &[&str] = &["txt", "md"];

#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    limit: Option<usize>,
}

impl DocumentLoader {
    pub fn new() -> Self { Self::default() }

    /// Load at most `limit` files (in path order).
    pub fn with_limit(limit: usize) -> Self { Self { limit: Some(limit) } }

    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<Document>> {
        let mut files = list_text_files(data_dir);
        if files.is_empty() {
            info!(dir = %data_dir.display(), "no text files found");
            return Ok(vec![]);
        }
        if let Some(limit) = self.limit {
            files.truncate(limit);
        }
        let mut documents = Vec::with_capacity(files.len());
        for file_path in &files {
            debug!(file = %file_path.display(), "loading document");
            documents.push(self.load_file(data_dir, file_path)?);
        }
        info!(files = documents.len(), dir = %data_dir.display(), "loaded documents");
        Ok(documents)
    }

    pub fn load_file(&self, data_dir: &Path, file_path: &Path) -> Result<Document> {
        let text = normalize_newlines(&read_file_content(file_path)?);
        let relative = file_path.strip_prefix(data_dir).unwrap_or(file_path);
        let id = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/");
        let source = file_path.file_name().map_or_else(|| id.clone(), |n| n.to_string_lossy().to_string());
        Ok(Document { id, source, text })
    }
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
    }
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn list_text_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()).is_some_and(|ext| EXTENSIONS.contains(&ext)))
        .collect();
    files.sort();
    files
}
