//! Provider for cat scratch editors.
//!
//! Cat scratch editors are used for `.cscratch` files, which are JSON files.
//! The host calls `resolve_custom_text_editor` whenever it opens one in a
//! webview, and publishes every document change on the provider's notifier.

use crate::config::EditorConfig;
use crate::document::{DocumentReader, DocumentWriter};
use crate::events::{ChangeNotifier, EventBus, Shared};
use crate::session::EditorSession;
use crate::view::ViewChannel;
use tracing::info;

/// View type the host registers this provider under.
pub const VIEW_TYPE: &str = "catCustoms.catScratch";

pub struct ScratchEditorProvider<W: ?Sized, N = Shared<EventBus>> {
    config: EditorConfig,
    writer: Shared<W>,
    notifier: N,
}

impl<W, N> ScratchEditorProvider<W, N>
where
    W: DocumentWriter + ?Sized,
    N: ChangeNotifier,
{
    pub fn new(config: EditorConfig, writer: Shared<W>, notifier: N) -> Self {
        info!(view_type = VIEW_TYPE, "Created scratch editor provider");
        Self {
            config,
            writer,
            notifier,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Called when a custom editor is opened: bind `document` to `view`.
    pub fn resolve_custom_text_editor<D, V>(
        &self,
        document: D,
        view: V,
    ) -> EditorSession<D, V, Shared<W>>
    where
        D: DocumentReader + 'static,
        V: ViewChannel + 'static,
    {
        EditorSession::open(
            document,
            view,
            Shared::clone(&self.writer),
            &self.notifier,
            &self.config,
        )
    }
}
