//! scratch-cli: Headless cat scratch editor.
//!
//! Uses the same scratch-core as the editor extension, with a JSON file as
//! the document and stdin/stdout as the webview. Each stdin line is a view
//! message such as `{"type":"add"}` or `{"type":"delete","id":"..."}`; each
//! stdout line is an `update` message carrying the full document text.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use scratch_cli::{load_config, FileWorkspace, LineView};
use scratch_core::{EventBus, ScratchEditorProvider, ViewMessage};

#[derive(Parser, Debug)]
#[command(name = "scratch-cli")]
#[command(about = "Edit a cat scratch file from the command line")]
struct Args {
    /// Path to the .cscratch file (created on the first edit if missing)
    #[arg(short, long)]
    file: PathBuf,

    /// Editor configuration as a JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the view's asset paths resolve against
    #[arg(long, default_value = ".")]
    assets: PathBuf,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout is the view.
    let default_filter = if args.verbose {
        "scratch_cli=debug,scratch_core=debug"
    } else {
        "scratch_cli=info,scratch_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting scratch-cli");
    info!("File: {:?}", args.file);

    let config = load_config(args.config.as_deref()).await?;

    let bus = Arc::new(EventBus::new());
    let workspace = Arc::new(
        FileWorkspace::open(&args.file, Arc::clone(&bus))
            .await
            .with_context(|| format!("Failed to open {}", args.file.display()))?,
    );
    let provider = ScratchEditorProvider::new(config, Arc::clone(&workspace), bus);

    let view = LineView::new(std::io::stdout(), &args.assets);
    let session = provider.resolve_custom_text_editor(workspace.document(), view);
    info!("Editing {}", session.uri());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        debug!("View message: {}", line);
        if let Err(e) = session.on_view_message(ViewMessage::from_json(line)).await {
            error!("Failed to handle view message: {}", e);
        }
    }

    info!("End of input, shutting down");
    session.close();
    Ok(())
}
