//! Host document abstraction.
//!
//! The text document is owned by the host editor. The core reads it through
//! `DocumentReader` and changes it only by submitting a `TextEdit` to a
//! `DocumentWriter`.
//!
//! Implementations:
//! - `InMemoryWorkspace` / `InMemoryDocument` - For testing
//! - `JsDocumentBridge` / `JsWorkspaceBridge` (in scratch-wasm) - Host editor API via JS callbacks
//! - `FileDocument` (in scratch-cli) - A JSON file on disk

use crate::events::{DocumentChangeEvent, EventBus, MaybeSync, Shared};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document not found: {0}")]
    NotFound(DocumentUri),

    #[error("IO error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, DocumentError>;

/// Stable identity of a document. Two documents are the same iff their URIs are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentUri(String);

impl DocumentUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentUri {
    fn from(uri: &str) -> Self {
        Self(uri.to_string())
    }
}

impl From<String> for DocumentUri {
    fn from(uri: String) -> Self {
        Self(uri)
    }
}

/// Zero-based line and character (UTF-16 code unit) offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Replace `range` of the document at `uri` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub uri: DocumentUri,
    pub range: Range,
    pub new_text: String,
}

impl TextEdit {
    /// Edit replacing the whole document.
    ///
    /// The range ends at `(line_count, 0)`, one line past the last line, which
    /// the host clamps to the end of the document.
    pub fn replace_all<D: DocumentReader + ?Sized>(document: &D, new_text: String) -> Self {
        Self {
            uri: document.uri().clone(),
            range: Range::new(Position::new(0, 0), Position::new(document.line_count(), 0)),
            new_text,
        }
    }

    /// Apply this edit to `text`, clamping positions past the end of a line
    /// or of the text.
    pub fn apply_to(&self, text: &str) -> String {
        let start = offset_at(text, self.range.start);
        let end = offset_at(text, self.range.end).max(start);

        let mut result = String::with_capacity(text.len() - (end - start) + self.new_text.len());
        result.push_str(&text[..start]);
        result.push_str(&self.new_text);
        result.push_str(&text[end..]);
        result
    }
}

/// Byte offset of `position` in `text`.
fn offset_at(text: &str, position: Position) -> usize {
    let mut line_start = 0;
    for _ in 0..position.line {
        match text[line_start..].find('\n') {
            Some(newline) => line_start += newline + 1,
            None => return text.len(),
        }
    }

    let line_end = text[line_start..]
        .find('\n')
        .map_or(text.len(), |newline| line_start + newline);

    let mut units = 0u32;
    for (index, ch) in text[line_start..line_end].char_indices() {
        if units >= position.character {
            return line_start + index;
        }
        units += ch.len_utf16() as u32;
    }
    line_end
}

/// Number of lines as the host counts them: an empty document has one line.
pub fn line_count(text: &str) -> u32 {
    text.matches('\n').count() as u32 + 1
}

/// Read access to one open document.
pub trait DocumentReader: MaybeSync {
    fn uri(&self) -> &DocumentUri;

    /// Full current text. Never cached by the caller.
    fn text(&self) -> String;

    fn line_count(&self) -> u32 {
        line_count(&self.text())
    }
}

/// The host's edit facility.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait DocumentWriter: MaybeSync {
    /// Apply an edit as one atomic change.
    ///
    /// Returns `Ok(false)` when the host declined the edit.
    async fn apply_edit(&self, edit: TextEdit) -> Result<bool>;
}

/// In-memory set of documents for testing.
///
/// Every applied edit or `set_text` publishes a `DocumentChangeEvent` on the
/// workspace's event bus, the way a host notifies listeners of changes.
pub struct InMemoryWorkspace {
    documents: RwLock<HashMap<DocumentUri, String>>,
    changes: Shared<EventBus>,
    rejecting: AtomicBool,
    applied: AtomicUsize,
}

impl InMemoryWorkspace {
    pub fn new(changes: Shared<EventBus>) -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            changes,
            rejecting: AtomicBool::new(false),
            applied: AtomicUsize::new(0),
        }
    }

    /// Add a document without publishing a change.
    pub fn insert(&self, uri: impl Into<DocumentUri>, text: &str) {
        self.documents
            .write()
            .unwrap()
            .insert(uri.into(), text.to_string());
    }

    /// Handle to a document in this workspace.
    pub fn document(self: &Shared<Self>, uri: impl Into<DocumentUri>) -> InMemoryDocument {
        InMemoryDocument {
            uri: uri.into(),
            workspace: Shared::clone(self),
        }
    }

    pub fn text(&self, uri: &DocumentUri) -> Option<String> {
        self.documents.read().unwrap().get(uri).cloned()
    }

    /// Replace a document's text as if the user typed it, publishing a change.
    pub fn set_text(&self, uri: impl Into<DocumentUri>, text: &str) {
        let uri = uri.into();
        self.documents
            .write()
            .unwrap()
            .insert(uri.clone(), text.to_string());
        self.changes.emit(&DocumentChangeEvent { uri });
    }

    /// Make `apply_edit` decline every edit, for testing rejected writes.
    pub fn reject_edits(&self, reject: bool) {
        self.rejecting.store(reject, Ordering::Relaxed);
    }

    /// Number of edits applied so far.
    pub fn applied_edits(&self) -> usize {
        self.applied.load(Ordering::Relaxed)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl DocumentWriter for InMemoryWorkspace {
    async fn apply_edit(&self, edit: TextEdit) -> Result<bool> {
        if self.rejecting.load(Ordering::Relaxed) {
            return Ok(false);
        }

        {
            let mut documents = self.documents.write().unwrap();
            let text = documents
                .get_mut(&edit.uri)
                .ok_or_else(|| DocumentError::NotFound(edit.uri.clone()))?;
            *text = edit.apply_to(text);
        }
        self.applied.fetch_add(1, Ordering::Relaxed);

        // Publish after the lock is released; listeners read the document.
        self.changes.emit(&DocumentChangeEvent { uri: edit.uri });
        Ok(true)
    }
}

// Lets a session hold the shared workspace as its writer.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl<T: DocumentWriter + ?Sized> DocumentWriter for Shared<T> {
    async fn apply_edit(&self, edit: TextEdit) -> Result<bool> {
        (**self).apply_edit(edit).await
    }
}

/// A document inside an `InMemoryWorkspace`.
#[derive(Clone)]
pub struct InMemoryDocument {
    uri: DocumentUri,
    workspace: Shared<InMemoryWorkspace>,
}

impl DocumentReader for InMemoryDocument {
    fn uri(&self) -> &DocumentUri {
        &self.uri
    }

    fn text(&self) -> String {
        self.workspace.text(&self.uri).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(start: (u32, u32), end: (u32, u32), new_text: &str) -> TextEdit {
        TextEdit {
            uri: "file:///a.cscratch".into(),
            range: Range::new(Position::new(start.0, start.1), Position::new(end.0, end.1)),
            new_text: new_text.to_string(),
        }
    }

    #[test]
    fn test_line_count() {
        assert_eq!(line_count(""), 1);
        assert_eq!(line_count("{}"), 1);
        assert_eq!(line_count("{\n  \"a\": 1\n}"), 3);
        assert_eq!(line_count("{}\n"), 2);
    }

    #[test]
    fn test_apply_full_range_replaces_everything() {
        let text = "{\n  \"a\": 1\n}";
        let edit = edit((0, 0), (line_count(text), 0), "{}");
        assert_eq!(edit.apply_to(text), "{}");
    }

    #[test]
    fn test_apply_partial_range() {
        let text = "line one\nline two\nline three";
        assert_eq!(edit((1, 5), (1, 8), "2").apply_to(text), "line one\nline 2\nline three");
        assert_eq!(edit((0, 0), (1, 0), "").apply_to(text), "line two\nline three");
    }

    #[test]
    fn test_apply_clamps_past_line_end() {
        let text = "ab\ncd";
        assert_eq!(edit((0, 10), (0, 10), "!").apply_to(text), "ab!\ncd");
        assert_eq!(edit((7, 0), (9, 0), "!").apply_to(text), "ab\ncd!");
    }

    #[test]
    fn test_apply_counts_utf16_units() {
        // 😸 is two UTF-16 code units
        let text = "😸x";
        assert_eq!(edit((0, 2), (0, 3), "y").apply_to(text), "😸y");
    }

    #[test]
    fn test_apply_inverted_range_inserts() {
        assert_eq!(edit((0, 2), (0, 1), "-").apply_to("abc"), "ab-c");
    }

    #[test]
    fn test_document_uri_display_and_serde() {
        let uri = DocumentUri::from("file:///x.cscratch");
        assert_eq!(uri.to_string(), "file:///x.cscratch");
        assert_eq!(serde_json::to_string(&uri).unwrap(), "\"file:///x.cscratch\"");
    }

    #[tokio::test]
    async fn test_in_memory_workspace_apply_edit() {
        let workspace = Shared::new(InMemoryWorkspace::new(Shared::new(EventBus::new())));
        workspace.insert("file:///a.cscratch", "old");
        let document = workspace.document("file:///a.cscratch");

        let applied = workspace
            .apply_edit(TextEdit::replace_all(&document, "new".to_string()))
            .await
            .unwrap();

        assert!(applied);
        assert_eq!(document.text(), "new");
        assert_eq!(workspace.applied_edits(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_workspace_missing_document() {
        let workspace = InMemoryWorkspace::new(Shared::new(EventBus::new()));
        let result = workspace.apply_edit(edit((0, 0), (0, 0), "x")).await;
        assert!(matches!(result, Err(DocumentError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_in_memory_workspace_rejecting() {
        let workspace = InMemoryWorkspace::new(Shared::new(EventBus::new()));
        workspace.insert("file:///a.cscratch", "old");
        workspace.reject_edits(true);

        let applied = workspace.apply_edit(edit((0, 0), (1, 0), "new")).await.unwrap();

        assert!(!applied);
        assert_eq!(workspace.text(&"file:///a.cscratch".into()).unwrap(), "old");
    }

    #[test]
    fn test_set_text_publishes_change() {
        let bus = Shared::new(EventBus::new());
        let workspace = InMemoryWorkspace::new(Shared::clone(&bus));
        let seen = Shared::new(RwLock::new(Vec::new()));
        let seen_clone = Shared::clone(&seen);
        let _sub = bus.subscribe(move |event| {
            seen_clone.write().unwrap().push(event.uri.clone());
        });

        workspace.set_text("file:///a.cscratch", "{}");

        assert_eq!(*seen.read().unwrap(), vec![DocumentUri::from("file:///a.cscratch")]);
    }
}
