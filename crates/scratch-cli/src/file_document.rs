//! File-backed document using tokio::fs.
//!
//! The file is read once when opened. Edits are applied to the cached text,
//! written back to disk, and then published on the change bus, so sessions
//! refresh from the text that is now on disk.

use async_trait::async_trait;
use scratch_core::document::{DocumentError, DocumentReader, DocumentUri, DocumentWriter, Result, TextEdit};
use scratch_core::{DocumentChangeEvent, EventBus};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::fs;
use tracing::debug;

/// `file://` URI for a path, made absolute against the working directory.
pub fn file_uri(path: &Path) -> DocumentUri {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    DocumentUri::new(format!("file://{}", absolute.display()))
}

/// One JSON file acting as the host's document store.
pub struct FileWorkspace {
    path: PathBuf,
    uri: DocumentUri,
    text: RwLock<String>,
    changes: Arc<EventBus>,
}

impl FileWorkspace {
    /// Open `path`. A missing file is an empty document; it is created on
    /// the first edit.
    pub async fn open(path: impl Into<PathBuf>, changes: Arc<EventBus>) -> Result<Self> {
        let path = path.into();
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist yet, starting empty", path.display());
                String::new()
            }
            Err(e) => return Err(DocumentError::Io(e.to_string())),
        };

        Ok(Self {
            uri: file_uri(&path),
            path,
            text: RwLock::new(text),
            changes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn uri(&self) -> &DocumentUri {
        &self.uri
    }

    pub fn text(&self) -> String {
        self.text
            .read()
            .map(|text| text.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Reader handle for a session.
    pub fn document(self: &Arc<Self>) -> FileDocument {
        FileDocument {
            workspace: Arc::clone(self),
        }
    }

    fn store(&self, text: String) {
        match self.text.write() {
            Ok(mut current) => *current = text,
            Err(poisoned) => *poisoned.into_inner() = text,
        }
    }
}

#[async_trait]
impl DocumentWriter for FileWorkspace {
    async fn apply_edit(&self, edit: TextEdit) -> Result<bool> {
        if edit.uri != self.uri {
            return Err(DocumentError::NotFound(edit.uri));
        }

        let updated = edit.apply_to(&self.text());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DocumentError::Io(e.to_string()))?;
        }
        fs::write(&self.path, &updated)
            .await
            .map_err(|e| DocumentError::Io(e.to_string()))?;

        self.store(updated);
        debug!("Wrote {}", self.path.display());

        self.changes.emit(&DocumentChangeEvent::new(self.uri.clone()));
        Ok(true)
    }
}

/// The document a session reads: the cached text of a `FileWorkspace`.
#[derive(Clone)]
pub struct FileDocument {
    workspace: Arc<FileWorkspace>,
}

impl DocumentReader for FileDocument {
    fn uri(&self) -> &DocumentUri {
        self.workspace.uri()
    }

    fn text(&self) -> String {
        self.workspace.text()
    }
}
