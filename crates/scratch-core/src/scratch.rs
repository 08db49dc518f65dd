//! Scratch records and the JSON read-modify-write operations on a document.
//!
//! The document is a JSON object with an optional `scratches` array:
//!
//! ```json
//! {
//!   "scratches": [
//!     { "id": "9f0c…", "text": "😸", "created": 1700000000000 }
//!   ]
//! }
//! ```
//!
//! Every mutation parses the whole document, changes only `scratches`, and
//! replaces the whole document with the re-serialized object, so other keys
//! survive untouched and in order.

use crate::document::{DocumentError, DocumentReader, DocumentUri, DocumentWriter, TextEdit};
use crate::nonce::generate_scratch_id;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Glyphs a new scratch is drawn from, uniformly.
pub const SCRATCH_GLYPHS: [&str; 10] = ["😸", "😹", "😺", "😻", "😼", "😽", "😾", "🙀", "😿", "🐱"];

const SCRATCHES_KEY: &str = "scratches";

#[derive(Debug, Error)]
pub enum ScratchError {
    #[error("Could not get document as json. Content is not valid json: {0}")]
    MalformedDocument(#[source] serde_json::Error),

    #[error("Could not get document as json. Root is not an object")]
    NotAnObject,

    #[error("Serialization error: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Edit to {0} was rejected by the host")]
    EditRejected(DocumentUri),
}

impl ScratchError {
    /// True when the document text itself could not be used.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedDocument(_) | Self::NotAnObject)
    }
}

pub type Result<T> = std::result::Result<T, ScratchError>;

/// Parsed root object of a document.
pub type RootObject = Map<String, Value>;

/// One note in the `scratches` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchRecord {
    pub id: String,
    pub text: String,
    /// Creation time in milliseconds since epoch
    pub created: u64,
}

impl ScratchRecord {
    /// New record with a fresh id, created now.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: generate_scratch_id(),
            text: text.into(),
            created: now_millis(),
        }
    }
}

fn now_millis() -> u64 {
    web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn random_glyph() -> &'static str {
    SCRATCH_GLYPHS[rand::rng().random_range(0..SCRATCH_GLYPHS.len())]
}

/// Parse document text into its root object.
///
/// Empty or whitespace-only text is an empty object.
pub fn parse_document(text: &str) -> Result<RootObject> {
    if text.trim().is_empty() {
        return Ok(RootObject::new());
    }

    match serde_json::from_str(text).map_err(ScratchError::MalformedDocument)? {
        Value::Object(root) => Ok(root),
        _ => Err(ScratchError::NotAnObject),
    }
}

/// Serialize a root object the way it is written back: 2-space indented JSON.
pub fn serialize_document(root: &RootObject) -> Result<String> {
    serde_json::to_string_pretty(root).map_err(ScratchError::Serialize)
}

/// Records in `scratches` that have the record shape. Other entries are skipped.
pub fn scratches(root: &RootObject) -> Vec<ScratchRecord> {
    match root.get(SCRATCHES_KEY) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// Replace the whole document with the serialized root object.
pub async fn write_document<D, W>(document: &D, writer: &W, root: &RootObject) -> Result<()>
where
    D: DocumentReader + ?Sized,
    W: DocumentWriter + ?Sized,
{
    let text = serialize_document(root)?;
    let edit = TextEdit::replace_all(document, text);

    if !writer.apply_edit(edit).await? {
        return Err(ScratchError::EditRejected(document.uri().clone()));
    }
    Ok(())
}

/// Append a scratch with a random glyph and write the document back.
///
/// A `scratches` value that is not an array is replaced.
pub async fn add_scratch<D, W>(document: &D, writer: &W) -> Result<ScratchRecord>
where
    D: DocumentReader + ?Sized,
    W: DocumentWriter + ?Sized,
{
    let mut root = parse_document(&document.text())?;
    let record = ScratchRecord::new(random_glyph());
    let value = serde_json::to_value(&record).map_err(ScratchError::Serialize)?;

    match root.get_mut(SCRATCHES_KEY) {
        Some(Value::Array(items)) => items.push(value),
        _ => {
            root.insert(SCRATCHES_KEY.to_string(), Value::Array(vec![value]));
        }
    }

    write_document(document, writer, &root).await?;
    debug!(uri = %document.uri(), id = %record.id, "added scratch");
    Ok(record)
}

/// Remove every scratch whose `id` equals `id` and write the document back.
///
/// Without a `scratches` array nothing is written. Returns how many records
/// were removed.
pub async fn delete_scratch<D, W>(document: &D, writer: &W, id: &str) -> Result<usize>
where
    D: DocumentReader + ?Sized,
    W: DocumentWriter + ?Sized,
{
    let mut root = parse_document(&document.text())?;
    let Some(Value::Array(items)) = root.get_mut(SCRATCHES_KEY) else {
        debug!(uri = %document.uri(), "no scratches to delete from");
        return Ok(0);
    };

    let before = items.len();
    items.retain(|item| item.get("id").and_then(Value::as_str) != Some(id));
    let removed = before - items.len();

    write_document(document, writer, &root).await?;
    debug!(uri = %document.uri(), id, removed, "deleted scratch");
    Ok(removed)
}
