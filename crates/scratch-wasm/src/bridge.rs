//! JavaScript host bridges for WASM.
//!
//! Implements the scratch-core host traits by calling JavaScript callback
//! functions provided by the editor extension. The TypeScript side wraps the
//! host's document, workspace edit and webview APIs in these callbacks.

use async_trait::async_trait;
use scratch_core::document::{self, DocumentError, DocumentReader, DocumentUri, DocumentWriter, TextEdit};
use scratch_core::view::{EditorMessage, ViewChannel, ViewError, ViewOptions};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

/// Read a message out of a thrown JS value.
fn js_error_message(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| {
            js_sys::Reflect::get(err, &"message".into())
                .ok()
                .and_then(|v| v.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", err))
}

/// Call a JS function and await its result if it returned a Promise.
async fn call_js_async(func: &js_sys::Function, arg: &JsValue) -> Result<JsValue, JsValue> {
    let result = func.call1(&JsValue::NULL, arg)?;
    if result.is_instance_of::<js_sys::Promise>() {
        JsFuture::from(js_sys::Promise::from(result)).await
    } else {
        Ok(result)
    }
}

/// A host text document.
///
/// # Example (TypeScript side)
///
/// ```typescript
/// const bridge = new JsDocumentBridge(
///   document.uri.toString(),
///   () => document.getText(),
///   () => document.lineCount,
/// );
/// ```
#[wasm_bindgen]
pub struct JsDocumentBridge {
    uri: DocumentUri,
    get_text_fn: js_sys::Function,
    line_count_fn: js_sys::Function,
}

#[wasm_bindgen]
impl JsDocumentBridge {
    #[wasm_bindgen(constructor)]
    pub fn new(uri: String, get_text_fn: js_sys::Function, line_count_fn: js_sys::Function) -> Self {
        Self {
            uri: DocumentUri::new(uri),
            get_text_fn,
            line_count_fn,
        }
    }
}

impl DocumentReader for JsDocumentBridge {
    fn uri(&self) -> &DocumentUri {
        &self.uri
    }

    fn text(&self) -> String {
        match self.get_text_fn.call0(&JsValue::NULL) {
            Ok(text) => text.as_string().unwrap_or_default(),
            Err(e) => {
                tracing::warn!(uri = %self.uri, "getText failed: {}", js_error_message(&e));
                String::new()
            }
        }
    }

    fn line_count(&self) -> u32 {
        self.line_count_fn
            .call0(&JsValue::NULL)
            .ok()
            .and_then(|v| v.as_f64())
            .map(|n| n as u32)
            .unwrap_or_else(|| document::line_count(&self.text()))
    }
}

/// The host's workspace edit facility.
///
/// `applyEdit` receives `{ uri, range: { start, end }, newText }` with
/// zero-based `{ line, character }` positions and resolves to whether the
/// edit was applied.
#[wasm_bindgen]
pub struct JsWorkspaceBridge {
    apply_edit_fn: js_sys::Function,
}

#[wasm_bindgen]
impl JsWorkspaceBridge {
    #[wasm_bindgen(constructor)]
    pub fn new(apply_edit_fn: js_sys::Function) -> Self {
        Self { apply_edit_fn }
    }
}

#[async_trait(?Send)]
impl DocumentWriter for JsWorkspaceBridge {
    async fn apply_edit(&self, edit: TextEdit) -> document::Result<bool> {
        let js_edit = serde_wasm_bindgen::to_value(&edit)
            .map_err(|e| DocumentError::Io(format!("Failed to serialize edit: {}", e)))?;

        let result = call_js_async(&self.apply_edit_fn, &js_edit)
            .await
            .map_err(|e| DocumentError::Io(js_error_message(&e)))?;

        // Hosts that resolve to nothing applied the edit.
        Ok(result.as_bool().unwrap_or(true))
    }
}

/// A host webview panel.
///
/// # Example (TypeScript side)
///
/// ```typescript
/// const bridge = new JsViewBridge(
///   (message) => panel.webview.postMessage(message),
///   (html) => { panel.webview.html = html; },
///   (options) => { panel.webview.options = options; },
///   (path) => panel.webview.asWebviewUri(vscode.Uri.joinPath(extensionUri, path)).toString(),
///   panel.webview.cspSource,
/// );
/// ```
#[wasm_bindgen]
pub struct JsViewBridge {
    post_message_fn: js_sys::Function,
    set_html_fn: js_sys::Function,
    set_options_fn: js_sys::Function,
    as_webview_uri_fn: js_sys::Function,
    csp_source: String,
}

#[wasm_bindgen]
impl JsViewBridge {
    #[wasm_bindgen(constructor)]
    pub fn new(
        post_message_fn: js_sys::Function,
        set_html_fn: js_sys::Function,
        set_options_fn: js_sys::Function,
        as_webview_uri_fn: js_sys::Function,
        csp_source: String,
    ) -> Self {
        Self {
            post_message_fn,
            set_html_fn,
            set_options_fn,
            as_webview_uri_fn,
            csp_source,
        }
    }
}

impl ViewChannel for JsViewBridge {
    fn set_options(&self, options: ViewOptions) {
        match serde_wasm_bindgen::to_value(&options) {
            Ok(js_options) => {
                if let Err(e) = self.set_options_fn.call1(&JsValue::NULL, &js_options) {
                    tracing::warn!("setOptions failed: {}", js_error_message(&e));
                }
            }
            Err(e) => tracing::warn!("Failed to serialize view options: {}", e),
        }
    }

    fn set_html(&self, html: String) {
        if let Err(e) = self.set_html_fn.call1(&JsValue::NULL, &html.into()) {
            tracing::warn!("setHtml failed: {}", js_error_message(&e));
        }
    }

    fn as_view_uri(&self, path: &str) -> String {
        self.as_webview_uri_fn
            .call1(&JsValue::NULL, &path.into())
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_else(|| path.to_string())
    }

    fn csp_source(&self) -> String {
        self.csp_source.clone()
    }

    fn post_message(&self, message: &EditorMessage) -> Result<(), ViewError> {
        let js_message = serde_wasm_bindgen::to_value(message)
            .map_err(|e| ViewError::Serialization(e.to_string()))?;

        // postMessage returns a Promise we do not wait on; a throw means the view is gone.
        self.post_message_fn
            .call1(&JsValue::NULL, &js_message)
            .map(|_| ())
            .map_err(|_| ViewError::Disconnected)
    }
}
