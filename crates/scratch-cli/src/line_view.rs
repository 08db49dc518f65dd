//! A view that prints update messages as JSON lines.
//!
//! There is no webview natively: markup and options are only logged, and
//! asset URIs resolve to `file://` URIs under the assets directory.

use scratch_core::view::{EditorMessage, ViewChannel, ViewError, ViewOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

pub struct LineView<W> {
    out: Mutex<W>,
    assets: PathBuf,
}

impl<W: Write + Send> LineView<W> {
    pub fn new(out: W, assets: impl Into<PathBuf>) -> Self {
        Self {
            out: Mutex::new(out),
            assets: assets.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> ViewChannel for LineView<W> {
    fn set_options(&self, options: ViewOptions) {
        debug!(enable_scripts = options.enable_scripts, "View options set");
    }

    fn set_html(&self, html: String) {
        debug!("View markup installed ({} bytes)", html.len());
    }

    fn as_view_uri(&self, path: &str) -> String {
        format!("file://{}", self.assets.join(path).display())
    }

    fn csp_source(&self) -> String {
        "file:".to_string()
    }

    fn post_message(&self, message: &EditorMessage) -> Result<(), ViewError> {
        let mut line =
            serde_json::to_string(message).map_err(|e| ViewError::Serialization(e.to_string()))?;
        line.push('\n');

        let mut out = self.out.lock().map_err(|_| ViewError::Disconnected)?;
        out.write_all(line.as_bytes())
            .and_then(|()| out.flush())
            .map_err(|_| ViewError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_writes_one_line_per_message() {
        let view = LineView::new(Vec::new(), "/opt/cats");
        view.post_message(&EditorMessage::Update { text: "{}".into() }).unwrap();
        view.post_message(&EditorMessage::Update { text: "".into() }).unwrap();

        let out = String::from_utf8(view.into_inner()).unwrap();
        assert_eq!(
            out,
            "{\"type\":\"update\",\"text\":\"{}\"}\n{\"type\":\"update\",\"text\":\"\"}\n"
        );
    }

    #[test]
    fn test_markup_is_not_printed() {
        let view = LineView::new(Vec::new(), "/opt/cats");
        view.set_html("<html></html>".into());
        assert!(view.into_inner().is_empty());
    }

    #[test]
    fn test_asset_uris_resolve_under_assets_dir() {
        let view = LineView::new(Vec::new(), "/opt/cats");
        assert_eq!(view.as_view_uri("media/reset.css"), "file:///opt/cats/media/reset.css");
    }
}
