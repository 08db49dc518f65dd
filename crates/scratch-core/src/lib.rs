//! scratch-core: Platform-independent core of the cat scratch custom editor.
//!
//! This crate provides:
//! - Binding a JSON text document to a webview (`EditorSession`)
//! - Scratch mutations (add/delete) as a JSON read-modify-write
//! - Webview markup with a nonce-based content security policy
//! - Host capability traits (`DocumentReader`, `DocumentWriter`, `ViewChannel`,
//!   `ChangeNotifier`) with in-memory implementations for testing

pub mod config;
pub mod document;
pub mod events;
pub mod html;
pub mod nonce;
pub mod provider;
pub mod scratch;
pub mod session;
pub mod view;

pub use config::{ConfigError, EditorConfig};
pub use document::{
    DocumentError, DocumentReader, DocumentUri, DocumentWriter, InMemoryDocument,
    InMemoryWorkspace, Position, Range, TextEdit,
};
pub use events::{ChangeNotifier, DocumentChangeEvent, EventBus, MaybeSync, Shared, Subscription};
pub use provider::{ScratchEditorProvider, VIEW_TYPE};
pub use scratch::{ScratchError, ScratchRecord, SCRATCH_GLYPHS};
pub use session::EditorSession;
pub use view::{EditorMessage, RecordingView, ViewChannel, ViewError, ViewMessage, ViewOptions};
