//! Loading source documents from the filesystem.
//!
//! Only decoded-text formats are handled here (`.txt`, `.md`, `.html`);
//! binary formats are out of scope. HTML files are reduced to their visible
//! text before they reach the chunker. Unsupported or unreadable files
//! inside a directory walk are skipped with a warning; a directly named file
//! that cannot be loaded is an error.

use std::path::Path;

use scraper::{Html, Selector};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::types::{Document, VaultError};

/// Extensions handled by the default loader, without the leading dot.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["txt", "md", "html"];

/// Filesystem document loader.
#[derive(Clone, Debug)]
pub struct DocumentLoader {
    extensions: Vec<String>,
}

impl DocumentLoader {
    /// Loader accepting the default extension set.
    pub fn new() -> Self {
        Self {
            extensions: SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Loader restricted to a custom extension set (no leading dots).
    pub fn with_extensions(extensions: Vec<String>) -> Self {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e == &ext.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    /// Load a single file or every supported file under a directory.
    pub async fn load_path(
        &self,
        path: &Path,
        recursive: bool,
    ) -> Result<Vec<Document>, VaultError> {
        if path.is_file() {
            Ok(vec![self.load_document(path).await?])
        } else if path.is_dir() {
            self.load_directory(path, recursive).await
        } else {
            Err(VaultError::Load {
                path: path.display().to_string(),
                reason: "no such file or directory".to_string(),
            })
        }
    }

    /// Load one document, returning its decoded text plus source metadata.
    pub async fn load_document(&self, path: &Path) -> Result<Document, VaultError> {
        if !path.exists() {
            return Err(VaultError::Load {
                path: path.display().to_string(),
                reason: "file not found".to_string(),
            });
        }
        if !self.supports(path) {
            return Err(VaultError::Load {
                path: path.display().to_string(),
                reason: format!(
                    "unsupported format (supported: {})",
                    self.extensions.join(", ")
                ),
            });
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let raw = fs::read_to_string(path).await.map_err(|err| VaultError::Load {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let content = if extension == "html" {
            extract_html_text(&raw)
        } else {
            raw
        };

        let size = fs::metadata(path).await.map(|meta| meta.len()).unwrap_or(0);
        debug!(path = %path.display(), chars = content.chars().count(), "loaded document");
        Ok(Document::new(
            path.display().to_string(),
            content,
            format!(".{extension}"),
            size,
        ))
    }

    /// Load every supported document under `dir`, optionally recursing.
    /// Hidden files and per-file load failures are skipped with a warning.
    pub async fn load_directory(
        &self,
        dir: &Path,
        recursive: bool,
    ) -> Result<Vec<Document>, VaultError> {
        if !dir.is_dir() {
            return Err(VaultError::Load {
                path: dir.display().to_string(),
                reason: "not a directory".to_string(),
            });
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut documents = Vec::new();
        for entry in WalkDir::new(dir)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
        {
            let path = entry.path();
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            if !self.supports(path) {
                continue;
            }
            match self.load_document(path).await {
                Ok(document) => documents.push(document),
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping document");
                }
            }
        }

        info!(
            directory = %dir.display(),
            documents = documents.len(),
            "loaded directory"
        );
        Ok(documents)
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Visible text of an HTML document, one line per text node.
fn extract_html_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body = Selector::parse("body").expect("static selector");
    let root = document
        .select(&body)
        .next()
        .map(|el| el.text().collect::<Vec<_>>())
        .unwrap_or_else(|| document.root_element().text().collect());
    root.into_iter()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
