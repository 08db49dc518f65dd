//! Webview abstraction and the messages exchanged with it.
//!
//! Implementations:
//! - `RecordingView` - For testing
//! - `JsViewBridge` (in scratch-wasm) - Host webview via JS callbacks
//! - `LineView` (in scratch-cli) - JSON lines on stdout

use crate::events::MaybeSync;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("View is disconnected")]
    Disconnected,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Options applied to the view before markup is installed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewOptions {
    pub enable_scripts: bool,
}

/// Message sent from the core to the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorMessage {
    /// Full current document text.
    Update { text: String },
}

/// Message received from the view.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ViewMessage {
    Add,
    Delete {
        id: String,
    },
    /// Any message the core does not recognize. Ignored.
    #[serde(other)]
    Unknown,
}

impl ViewMessage {
    /// Interpret an arbitrary JSON payload from the view.
    ///
    /// Never fails: payloads that are not a recognized message (missing
    /// `type`, `delete` without a string `id`, non-objects) become `Unknown`.
    pub fn from_value(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or(ViewMessage::Unknown)
    }

    /// Parse a JSON text payload, as received over a text channel.
    pub fn from_json(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or(ViewMessage::Unknown)
    }
}

/// A rendered, message-addressable surface.
pub trait ViewChannel: MaybeSync {
    fn set_options(&self, options: ViewOptions);

    /// Replace the view's markup.
    fn set_html(&self, html: String);

    /// URI under which the view can load a local asset (`media/<path>`).
    fn as_view_uri(&self, path: &str) -> String;

    /// Origin to allow in the content security policy for assets.
    fn csp_source(&self) -> String;

    fn post_message(&self, message: &EditorMessage) -> Result<(), ViewError>;
}

/// View that records everything sent to it, for testing.
#[derive(Default)]
pub struct RecordingView {
    options: Mutex<Option<ViewOptions>>,
    html: Mutex<Option<String>>,
    messages: Mutex<Vec<EditorMessage>>,
    disconnected: Mutex<bool>,
}

impl RecordingView {
    pub const ORIGIN: &'static str = "https://view.test";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&self) -> Option<ViewOptions> {
        *self.options.lock().unwrap()
    }

    pub fn html(&self) -> Option<String> {
        self.html.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<EditorMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Text of the most recent update, i.e. what the view currently shows.
    pub fn last_text(&self) -> Option<String> {
        self.messages.lock().unwrap().iter().rev().find_map(|m| match m {
            EditorMessage::Update { text } => Some(text.clone()),
        })
    }

    pub fn update_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    /// Make subsequent posts fail, as a closed view would.
    pub fn disconnect(&self) {
        *self.disconnected.lock().unwrap() = true;
    }
}

impl ViewChannel for RecordingView {
    fn set_options(&self, options: ViewOptions) {
        *self.options.lock().unwrap() = Some(options);
    }

    fn set_html(&self, html: String) {
        *self.html.lock().unwrap() = Some(html);
    }

    fn as_view_uri(&self, path: &str) -> String {
        format!("{}/{}", Self::ORIGIN, path)
    }

    fn csp_source(&self) -> String {
        Self::ORIGIN.to_string()
    }

    fn post_message(&self, message: &EditorMessage) -> Result<(), ViewError> {
        if *self.disconnected.lock().unwrap() {
            return Err(ViewError::Disconnected);
        }
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}

impl<T: ViewChannel + ?Sized> ViewChannel for crate::events::Shared<T> {
    fn set_options(&self, options: ViewOptions) {
        (**self).set_options(options)
    }

    fn set_html(&self, html: String) {
        (**self).set_html(html)
    }

    fn as_view_uri(&self, path: &str) -> String {
        (**self).as_view_uri(path)
    }

    fn csp_source(&self) -> String {
        (**self).csp_source()
    }

    fn post_message(&self, message: &EditorMessage) -> Result<(), ViewError> {
        (**self).post_message(message)
    }
}
