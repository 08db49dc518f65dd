//! Static webview markup.
//!
//! The markup does not depend on document content; the script renders the
//! scratches from `update` messages. A content security policy only allows
//! assets from the view's CSP source and scripts carrying the per-render nonce.

use crate::config::EditorConfig;
use crate::view::ViewChannel;

/// Build the webview HTML for `view`, allowing scripts tagged with `nonce`.
pub fn editor_page<V: ViewChannel + ?Sized>(view: &V, config: &EditorConfig, nonce: &str) -> String {
    let csp_source = view.csp_source();

    let stylesheets: String = config
        .styles
        .iter()
        .map(|style| {
            format!(
                r#"
    <link href="{}" rel="stylesheet" />"#,
                html_escape(&view.as_view_uri(&config.asset_path(style)))
            )
        })
        .collect();

    let script_uri = view.as_view_uri(&config.asset_path(&config.script));

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta http-equiv="Content-Security-Policy" content="default-src 'none'; img-src {csp}; style-src {csp}; script-src 'nonce-{nonce}';">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">{stylesheets}
    <title>{title}</title>
</head>
<body>
    <div class="notes">
        <div class="add-button">
            <button>{label}</button>
        </div>
    </div>

    <script nonce="{nonce}" src="{script}"></script>
</body>
</html>"#,
        csp = html_escape(&csp_source),
        nonce = nonce,
        stylesheets = stylesheets,
        title = html_escape(&config.title),
        label = html_escape(&config.add_button_label),
        script = html_escape(&script_uri),
    )
}

/// Escape text for use in HTML content and double-quoted attributes.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::RecordingView;

    #[test]
    fn test_page_carries_nonce_and_assets() {
        let view = RecordingView::new();
        let html = editor_page(&view, &EditorConfig::default(), "abc123");

        assert!(html.contains("script-src 'nonce-abc123'"));
        assert!(html.contains(r#"<script nonce="abc123" src="https://view.test/media/catScratch.js">"#));
        assert!(html.contains("img-src https://view.test; style-src https://view.test;"));
        assert!(html.contains(r#"<link href="https://view.test/media/reset.css" rel="stylesheet" />"#));
        assert!(html.contains(r#"<link href="https://view.test/media/catScratch.css" rel="stylesheet" />"#));
        assert!(html.contains("<title>Cat Scratch</title>"));
        assert!(html.contains("<button>Scratch!</button>"));
    }

    #[test]
    fn test_stylesheets_in_order() {
        let view = RecordingView::new();
        let html = editor_page(&view, &EditorConfig::default(), "n");

        let reset = html.find("reset.css").unwrap();
        let vscode = html.find("vscode.css").unwrap();
        let main = html.find("catScratch.css").unwrap();
        assert!(reset < vscode && vscode < main);
    }

    #[test]
    fn test_title_is_escaped() {
        let view = RecordingView::new();
        let config = EditorConfig {
            title: "<Cats & Dogs>".to_string(),
            ..EditorConfig::default()
        };

        let html = editor_page(&view, &config, "n");

        assert!(html.contains("<title>&lt;Cats &amp; Dogs&gt;</title>"));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape(r#"a"b'c"#), "a&quot;b&#x27;c");
    }
}
