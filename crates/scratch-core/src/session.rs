//! EditorSession: binds one document to one webview.
//!
//! The document is the model. Changes to the document are pushed to the view
//! as full-text `update` messages; `add`/`delete` messages from the view become
//! document edits, which come back to the view as changes like any other.
//!
//! A single document can be shared by several sessions (split editors). Each
//! session listens to every document change and filters on its own URI.

use crate::config::EditorConfig;
use crate::document::{DocumentReader, DocumentUri, DocumentWriter};
use crate::events::{ChangeNotifier, DocumentChangeEvent, Shared, Subscription};
use crate::html;
use crate::nonce::generate_nonce;
use crate::scratch::{self, ScratchError};
use crate::view::{EditorMessage, ViewChannel, ViewMessage, ViewOptions};
use tracing::{debug, warn};

/// Document and view, shared with the change listener.
struct Binding<D, V> {
    document: D,
    view: V,
}

impl<D: DocumentReader, V: ViewChannel> Binding<D, V> {
    fn refresh(&self) {
        let message = EditorMessage::Update {
            text: self.document.text(),
        };
        if let Err(e) = self.view.post_message(&message) {
            warn!(uri = %self.document.uri(), "Failed to update view: {}", e);
        }
    }

    fn on_document_changed(&self, event: &DocumentChangeEvent) {
        if &event.uri == self.document.uri() {
            self.refresh();
        }
    }
}

/// One open custom editor.
///
/// Holds the change subscription for as long as it lives. `close` (or drop)
/// releases it; `close` consumes the session, so nothing can run after it.
pub struct EditorSession<D, V, W> {
    binding: Shared<Binding<D, V>>,
    writer: W,
    subscription: Subscription,
}

impl<D, V, W> EditorSession<D, V, W>
where
    D: DocumentReader + 'static,
    V: ViewChannel + 'static,
    W: DocumentWriter,
{
    /// Set up the view for `document` and start following its changes.
    ///
    /// Enables scripts, installs the static markup, subscribes to changes and
    /// sends the current text.
    pub fn open<N>(document: D, view: V, writer: W, notifier: &N, config: &EditorConfig) -> Self
    where
        N: ChangeNotifier + ?Sized,
    {
        view.set_options(ViewOptions {
            enable_scripts: true,
        });
        view.set_html(html::editor_page(&view, config, &generate_nonce()));

        let binding = Shared::new(Binding { document, view });

        let listener = Shared::clone(&binding);
        let subscription = notifier.on_did_change(Box::new(move |event: &DocumentChangeEvent| {
            listener.on_document_changed(event);
        }));

        binding.refresh();
        debug!(uri = %binding.document.uri(), "Opened editor session");

        Self {
            binding,
            writer,
            subscription,
        }
    }

    pub fn uri(&self) -> &DocumentUri {
        self.binding.document.uri()
    }

    pub fn document(&self) -> &D {
        &self.binding.document
    }

    pub fn view(&self) -> &V {
        &self.binding.view
    }

    /// Send the document's full current text to the view.
    pub fn refresh(&self) {
        self.binding.refresh();
    }

    /// Refresh if `event` is about this session's document.
    pub fn on_document_changed(&self, event: &DocumentChangeEvent) {
        self.binding.on_document_changed(event);
    }

    /// Handle a message from the view.
    ///
    /// Unknown messages are ignored. Errors from the mutation are returned;
    /// the session stays open either way.
    pub async fn on_view_message(&self, message: ViewMessage) -> Result<(), ScratchError> {
        let document = &self.binding.document;
        match message {
            ViewMessage::Add => {
                scratch::add_scratch(document, &self.writer).await?;
            }
            ViewMessage::Delete { id } => {
                scratch::delete_scratch(document, &self.writer, &id).await?;
            }
            ViewMessage::Unknown => {
                debug!(uri = %document.uri(), "Ignoring unrecognized view message");
            }
        }
        Ok(())
    }

    /// Stop following document changes. Called when the view is disposed.
    pub fn close(self) {
        debug!(uri = %self.uri(), "Closing editor session");
        self.subscription.dispose();
    }
}
