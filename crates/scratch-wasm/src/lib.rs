//! WASM bindings for scratch-core.
//!
//! Provides the bridge between TypeScript (editor extension) and Rust (scratch-core).
//!
//! # Architecture
//!
//! ```text
//! TypeScript                        WASM (Rust)
//! ──────────                        ───────────
//! TextDocument ──callbacks──> JsDocumentBridge ─┐
//! WebviewPanel ──callbacks──> JsViewBridge ─────┼──> EditorSession
//! applyEdit    ──callback───> JsWorkspaceBridge ┘          ▲
//!                                                          │
//! onDidChangeTextDocument ──> WasmEditorProvider.notifyDocumentChanged
//! ```
//!
//! The extension creates one `WasmEditorProvider`, forwards every document
//! change to it, and calls `resolveCustomTextEditor` for each opened editor.
//! The returned `WasmEditorSession` receives webview messages and must be
//! disposed when the panel is disposed.
//!
//! **Note**: This crate only compiles for `wasm32` targets. When building for native
//! targets (e.g., during `cargo check --workspace`), this crate provides no exports.

#[cfg(target_arch = "wasm32")]
mod bridge;

#[cfg(target_arch = "wasm32")]
pub use bridge::{JsDocumentBridge, JsViewBridge, JsWorkspaceBridge};

#[cfg(target_arch = "wasm32")]
mod wasm_impl {
    use super::*;
    use scratch_core::{
        DocumentChangeEvent, EditorConfig, EditorSession, ScratchEditorProvider, ViewMessage,
        VIEW_TYPE,
    };
    use std::cell::RefCell;
    use std::rc::Rc;
    use tracing_subscriber::layer::SubscriberExt;
    use wasm_bindgen::prelude::*;

    // ========== Callback Logger Layer ==========

    thread_local! {
        static LOGGER_CALLBACK: RefCell<Option<js_sys::Function>> = const { RefCell::new(None) };
    }

    /// Forwards each tracing event to the JS logger callback.
    struct JsCallbackLayer;

    impl<S> tracing_subscriber::Layer<S> for JsCallbackLayer
    where
        S: tracing::Subscriber,
    {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            LOGGER_CALLBACK.with(|cb| {
                let Some(callback) = cb.borrow().clone() else {
                    return;
                };

                let metadata = event.metadata();
                let mut visitor = MessageVisitor::default();
                event.record(&mut visitor);

                let timestamp = web_time::SystemTime::now()
                    .duration_since(web_time::UNIX_EPOCH)
                    .map(|d| d.as_millis() as f64)
                    .unwrap_or(0.0);

                let js_event = js_sys::Object::new();
                let _ = js_sys::Reflect::set(&js_event, &"level".into(), &metadata.level().as_str().into());
                let _ = js_sys::Reflect::set(&js_event, &"target".into(), &metadata.target().into());
                let _ = js_sys::Reflect::set(&js_event, &"message".into(), &visitor.finish().into());
                let _ = js_sys::Reflect::set(&js_event, &"timestamp".into(), &timestamp.into());

                let _ = callback.call1(&JsValue::NULL, &js_event);
            });
        }
    }

    /// Collects the `message` field followed by `key=value` for other fields.
    #[derive(Default)]
    struct MessageVisitor {
        message: String,
        fields: Vec<String>,
    }

    impl MessageVisitor {
        fn finish(self) -> String {
            std::iter::once(self.message)
                .filter(|m| !m.is_empty())
                .chain(self.fields)
                .collect::<Vec<_>>()
                .join(" ")
        }
    }

    impl tracing::field::Visit for MessageVisitor {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.message = format!("{:?}", value);
            } else {
                self.fields.push(format!("{}={:?}", field.name(), value));
            }
        }

        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            if field.name() == "message" {
                self.message = value.to_string();
            } else {
                self.fields.push(format!("{}={}", field.name(), value));
            }
        }
    }

    /// Initialize the WASM module (sets up panic hook and tracing).
    ///
    /// - `init()` - console-only logging
    /// - `init({ logger: (event) => {...} })` - callback + console logging
    ///
    /// The logger callback receives events with: `{ level, target, message, timestamp }`
    #[wasm_bindgen]
    pub fn init(config: Option<js_sys::Object>) {
        console_error_panic_hook::set_once();

        let callback = config
            .as_ref()
            .and_then(|cfg| js_sys::Reflect::get(cfg, &"logger".into()).ok())
            .and_then(|v| v.dyn_into::<js_sys::Function>().ok());

        let console_config = tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::DEBUG)
            .build();

        match callback {
            Some(cb) => {
                LOGGER_CALLBACK.with(|cell| *cell.borrow_mut() = Some(cb));
                let subscriber = tracing_subscriber::registry()
                    .with(JsCallbackLayer)
                    .with(tracing_wasm::WASMLayer::new(console_config));
                tracing::subscriber::set_global_default(subscriber).ok();
            }
            None => tracing_wasm::set_as_global_default_with_config(console_config),
        }

        tracing::info!("scratch-wasm initialized");
    }

    /// Get version string
    #[wasm_bindgen]
    pub fn version() -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    /// Generate a random nonce for a content security policy.
    #[wasm_bindgen(js_name = generateNonce)]
    pub fn generate_nonce() -> String {
        scratch_core::nonce::generate_nonce()
    }

    type Session = EditorSession<JsDocumentBridge, JsViewBridge, Rc<JsWorkspaceBridge>>;

    /// Editor provider exposed to TypeScript.
    #[wasm_bindgen]
    pub struct WasmEditorProvider {
        inner: ScratchEditorProvider<JsWorkspaceBridge>,
    }

    #[wasm_bindgen]
    impl WasmEditorProvider {
        /// Create the provider.
        ///
        /// `config` is an optional object overriding `{ mediaDir, script, styles,
        /// title, addButtonLabel }`.
        #[wasm_bindgen(constructor)]
        pub fn new(config: JsValue, workspace: JsWorkspaceBridge) -> Result<WasmEditorProvider, JsError> {
            let config: EditorConfig = if config.is_undefined() || config.is_null() {
                EditorConfig::default()
            } else {
                serde_wasm_bindgen::from_value(config)
                    .map_err(|e| JsError::new(&format!("Invalid editor config: {}", e)))?
            };
            config.validate().map_err(|e| JsError::new(&e.to_string()))?;

            let bus = Rc::new(scratch_core::EventBus::new());
            Ok(WasmEditorProvider {
                inner: ScratchEditorProvider::new(config, Rc::new(workspace), bus),
            })
        }

        /// View type to register the provider under.
        #[wasm_bindgen(js_name = viewType)]
        pub fn view_type() -> String {
            VIEW_TYPE.to_string()
        }

        /// Bind a document to a webview panel.
        ///
        /// Call from `resolveCustomTextEditor`. Dispose the returned session
        /// from the panel's `onDidDispose`.
        #[wasm_bindgen(js_name = resolveCustomTextEditor)]
        pub fn resolve_custom_text_editor(
            &self,
            document: JsDocumentBridge,
            view: JsViewBridge,
        ) -> WasmEditorSession {
            let session = self.inner.resolve_custom_text_editor(document, view);
            WasmEditorSession {
                inner: RefCell::new(Some(Rc::new(session))),
            }
        }

        /// Forward a host document change. Call for every changed document;
        /// sessions filter by URI.
        #[wasm_bindgen(js_name = notifyDocumentChanged)]
        pub fn notify_document_changed(&self, uri: String) {
            self.inner.notifier().emit(&DocumentChangeEvent::new(uri));
        }
    }

    /// One open editor exposed to JavaScript.
    ///
    /// Call `dispose()` when the panel closes. Messages arriving after that
    /// are ignored.
    #[wasm_bindgen]
    pub struct WasmEditorSession {
        inner: RefCell<Option<Rc<Session>>>,
    }

    impl WasmEditorSession {
        fn session(&self) -> Option<Rc<Session>> {
            self.inner.borrow().clone()
        }
    }

    #[wasm_bindgen]
    impl WasmEditorSession {
        /// Document URI this session is bound to, or null once disposed.
        pub fn uri(&self) -> Option<String> {
            self.session().map(|s| s.uri().to_string())
        }

        /// Handle a message posted by the webview.
        ///
        /// Rejects if the document is not valid JSON or the host refused the edit.
        #[wasm_bindgen(js_name = onViewMessage)]
        pub async fn on_view_message(&self, message: JsValue) -> Result<(), JsError> {
            let Some(session) = self.session() else {
                tracing::debug!("Ignoring view message for disposed session");
                return Ok(());
            };

            let value: serde_json::Value =
                serde_wasm_bindgen::from_value(message).unwrap_or(serde_json::Value::Null);

            session
                .on_view_message(ViewMessage::from_value(value))
                .await
                .map_err(|e| JsError::new(&e.to_string()))
        }

        /// Re-send the document text to the webview.
        pub fn refresh(&self) {
            if let Some(session) = self.session() {
                session.refresh();
            }
        }

        /// Release the change subscription. Safe to call multiple times.
        pub fn dispose(&self) {
            let Some(session) = self.inner.borrow_mut().take() else {
                return;
            };
            match Rc::try_unwrap(session) {
                Ok(session) => session.close(),
                // A message is still in flight; the subscription goes when it finishes.
                Err(session) => drop(session),
            }
        }
    }
}

// Re-export wasm_impl contents at crate root for wasm32 targets
#[cfg(target_arch = "wasm32")]
pub use wasm_impl::*;
