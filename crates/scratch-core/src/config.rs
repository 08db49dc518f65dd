//! Editor configuration: where the webview assets live and what the page shows.

use serde::Deserialize;
use thiserror::Error;

/// Editor configuration supplied by the host.
///
/// Deserializes from a camelCase object where every field is optional,
/// e.g. `{ "title": "Scratches", "styles": ["main.css"] }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Directory, relative to the extension root, holding the webview assets
    pub media_dir: String,
    /// Webview script, relative to `media_dir`
    pub script: String,
    /// Stylesheets, relative to `media_dir`, in load order
    pub styles: Vec<String>,
    /// Document title of the webview
    pub title: String,
    /// Label of the button that adds a scratch
    pub add_button_label: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            media_dir: "media".to_string(),
            script: "catScratch.js".to_string(),
            styles: vec![
                "reset.css".to_string(),
                "vscode.css".to_string(),
                "catScratch.css".to_string(),
            ],
            title: "Cat Scratch".to_string(),
            add_button_label: "Scratch!".to_string(),
        }
    }
}

impl EditorConfig {
    /// Parse and validate a JSON configuration object.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.script.trim().is_empty() {
            return Err(ConfigError::MissingScript);
        }
        for path in std::iter::once(&self.media_dir)
            .chain(std::iter::once(&self.script))
            .chain(&self.styles)
        {
            if path.starts_with('/') || path.split('/').any(|segment| segment == "..") {
                return Err(ConfigError::InvalidAssetPath(path.clone()));
            }
        }
        Ok(())
    }

    /// Path of an asset relative to the extension root.
    pub fn asset_path(&self, file: &str) -> String {
        if self.media_dir.is_empty() {
            file.to_string()
        } else {
            format!("{}/{}", self.media_dir.trim_end_matches('/'), file)
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Editor script must not be empty")]
    MissingScript,

    #[error("Asset path must be relative to the extension root: {0}")]
    InvalidAssetPath(String),

    #[error("Invalid configuration JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
