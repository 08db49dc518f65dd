//! scratch-cli library: the native host pieces behind the binary.
//!
//! Exposed as a library so integration tests can drive a session against a
//! real file without spawning the process.

pub mod file_document;
pub mod line_view;

pub use file_document::{file_uri, FileDocument, FileWorkspace};
pub use line_view::LineView;

use anyhow::{Context, Result};
use scratch_core::EditorConfig;
use std::path::Path;

/// Load the editor configuration from a JSON file, or the defaults without one.
pub async fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    Ok(EditorConfig::from_json(&json)?)
}
