//! Exports and host bridges, driven by plain JS functions.
//! Run with `wasm-pack test --node`.

#![cfg(target_arch = "wasm32")]

use js_sys::{Array, Function, JSON};
use scratch_core::scratch::{add_scratch, ScratchError};
use scratch_core::DocumentReader;
use scratch_wasm::{
    generate_nonce, version, JsDocumentBridge, JsViewBridge, JsWorkspaceBridge, WasmEditorProvider,
};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

const URI: &str = "file:///cats.cscratch";

fn returning(body: &str) -> Function {
    Function::new_no_args(body)
}

/// A function that pushes its argument onto `log` and returns `result`.
fn recording(log: &Array, result: &str) -> Function {
    Function::new_with_args("arg", &format!("this.push(arg); return {};", result)).bind(log)
}

fn document(text: &str) -> JsDocumentBridge {
    let text = JSON::stringify(&text.into()).unwrap().as_string().unwrap();
    JsDocumentBridge::new(
        URI.to_string(),
        returning(&format!("return {};", text)),
        returning("return undefined;"),
    )
}

fn view(posted: &Array) -> JsViewBridge {
    JsViewBridge::new(
        recording(posted, "undefined"),
        returning("return undefined;"),
        returning("return undefined;"),
        Function::new_with_args("path", "return 'https://view.test/' + path;"),
        "https://view.test".to_string(),
    )
}

fn message(json: &str) -> JsValue {
    JSON::parse(json).unwrap()
}

#[wasm_bindgen_test]
fn test_version_matches_package() {
    assert_eq!(version(), env!("CARGO_PKG_VERSION"));
}

#[wasm_bindgen_test]
fn test_nonces_are_alphanumeric_and_fresh() {
    let a = generate_nonce();
    let b = generate_nonce();
    assert_eq!(a.len(), 32);
    assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(a, b);
}

#[wasm_bindgen_test]
fn test_view_type() {
    assert_eq!(WasmEditorProvider::view_type(), "catCustoms.catScratch");
}

#[wasm_bindgen_test]
fn test_line_count_from_host_or_counted() {
    let counted = JsDocumentBridge::new(
        URI.to_string(),
        returning("return 'a\\nb\\nc';"),
        returning("return 'many';"),
    );
    assert_eq!(counted.line_count(), 3);

    let reported = JsDocumentBridge::new(
        URI.to_string(),
        returning("return 'a\\nb\\nc';"),
        returning("return 7;"),
    );
    assert_eq!(reported.line_count(), 7);
}

#[wasm_bindgen_test]
async fn test_declined_edit_is_rejected() {
    let edits = Array::new();
    let workspace = JsWorkspaceBridge::new(recording(&edits, "Promise.resolve(false)"));

    let err = add_scratch(&document("{}"), &workspace).await.unwrap_err();

    assert!(matches!(err, ScratchError::EditRejected(uri) if uri.as_str() == URI));
    assert_eq!(edits.length(), 1);
}

#[wasm_bindgen_test]
async fn test_edit_resolving_to_nothing_counts_as_applied() {
    let edits = Array::new();
    let workspace = JsWorkspaceBridge::new(recording(&edits, "Promise.resolve()"));

    let record = add_scratch(&document(""), &workspace).await.unwrap();

    let edit = edits.get(0);
    let new_text = js_sys::Reflect::get(&edit, &"newText".into()).unwrap().as_string().unwrap();
    assert!(new_text.contains(&record.id));
    let uri = js_sys::Reflect::get(&edit, &"uri".into()).unwrap().as_string();
    assert_eq!(uri.as_deref(), Some(URI));
}

#[wasm_bindgen_test]
async fn test_malformed_document_rejects_view_message() {
    let edits = Array::new();
    let posted = Array::new();
    let provider = WasmEditorProvider::new(
        JsValue::UNDEFINED,
        JsWorkspaceBridge::new(recording(&edits, "true")),
    )
    .ok()
    .unwrap();
    let session = provider.resolve_custom_text_editor(document("{not json"), view(&posted));

    let result = session.on_view_message(message(r#"{"type":"add"}"#)).await;

    assert!(result.is_err());
    assert_eq!(edits.length(), 0);
    assert_eq!(posted.length(), 1);
}

#[wasm_bindgen_test]
async fn test_dispose_is_idempotent_and_silences_session() {
    let edits = Array::new();
    let posted = Array::new();
    let provider = WasmEditorProvider::new(
        JsValue::UNDEFINED,
        JsWorkspaceBridge::new(recording(&edits, "true")),
    )
    .ok()
    .unwrap();
    let session = provider.resolve_custom_text_editor(document("{}"), view(&posted));
    assert_eq!(session.uri().as_deref(), Some(URI));

    session.dispose();
    session.dispose();

    assert_eq!(session.uri(), None);
    assert!(session.on_view_message(message(r#"{"type":"add"}"#)).await.is_ok());
    session.refresh();
    provider.notify_document_changed(URI.to_string());

    assert_eq!(edits.length(), 0);
    assert_eq!(posted.length(), 1);
}

#[wasm_bindgen_test]
async fn test_unknown_view_message_is_ignored() {
    let edits = Array::new();
    let posted = Array::new();
    let provider = WasmEditorProvider::new(
        JsValue::UNDEFINED,
        JsWorkspaceBridge::new(recording(&edits, "true")),
    )
    .ok()
    .unwrap();
    let session = provider.resolve_custom_text_editor(document("{}"), view(&posted));

    assert!(session.on_view_message(message(r#"{"type":"rename"}"#)).await.is_ok());
    assert!(session.on_view_message(JsValue::from_str("add")).await.is_ok());

    assert_eq!(edits.length(), 0);
}
