//! CLI binary for edgequake-docview.
//!
//! A demo host: it plays the part of a viewer screen. It builds a document
//! from a URL, a local path or an inline base64 payload, drives the main
//! context until the load settles, and optionally exports the share file.

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, ValueEnum};
use edgequake_docview::{
    Document, DocumentKind, DocumentObserver, DocumentSource, DocumentState, FixedReachability,
    ImageDocument, ImageLoader, LoadError, Loader, MainLoop, MimeType, PdfDocument, PdfLoader,
    Reachability, SystemReachability, ViewerConfig, ViewerDocument, ViewerRuntime,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Mirrors document state changes onto a terminal spinner.
struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    fn new(title: &str) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix(title.to_string());
        bar.set_message("Waiting…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl DocumentObserver for SpinnerObserver {
    fn on_state_changed(&self, document: &dyn Document) {
        match document.state() {
            Some(DocumentState::Loading) | None => self.bar.set_message("Loading…"),
            Some(DocumentState::Success) => self.bar.finish_with_message(green("loaded ✓")),
            Some(DocumentState::Failed(e)) => self.bar.finish_with_message(red(&e.to_string())),
        }
    }
}

// ── CLI definition ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    /// Guess from the payload bytes or the URL extension.
    Auto,
    Image,
    Pdf,
}

const AFTER_HELP: &str = r#"EXAMPLES:
  docview https://example.com/report.pdf
  docview --password secret ./locked.pdf --share
  docview --inline ./photo.png --json
  docview --offline https://example.com/cat.png

PDFIUM:
  PDF documents need the pdfium shared library. Point PDFIUM_LIB_PATH (or
  --pdfium-lib) at it, or install it on the system library path.
"#;

/// Load an image or PDF the way a viewer screen would.
#[derive(Parser, Debug)]
#[command(
    name = "docview",
    version,
    about = "Load an image or PDF from a URL, a path or a base64 payload",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// HTTP/HTTPS or file:// URL, or a local path.
    input: String,

    /// Document title; also names the exported file.
    #[arg(short, long, env = "DOCVIEW_TITLE", default_value = "Document")]
    title: String,

    /// Document kind.
    #[arg(short, long, env = "DOCVIEW_KIND", value_enum, default_value = "auto")]
    kind: KindArg,

    /// Read INPUT from disk and load it as an inline base64 payload.
    #[arg(long, env = "DOCVIEW_INLINE")]
    inline: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOCVIEW_PASSWORD")]
    password: Option<String>,

    /// Export the loaded document and print the written path.
    #[arg(long, env = "DOCVIEW_SHARE")]
    share: bool,

    /// Directory receiving `image-file/` and `pdf-file/` exports.
    #[arg(long, env = "DOCVIEW_SHARE_ROOT")]
    share_root: Option<PathBuf>,

    /// Maximum background threads for remote loads.
    #[arg(long, env = "DOCVIEW_THREADS", default_value_t = 4)]
    threads: usize,

    /// JPEG quality (1–100) for exported opaque images.
    #[arg(long, env = "DOCVIEW_JPEG_QUALITY", default_value_t = 100,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Explicit path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Behave as if the network were unreachable.
    #[arg(long)]
    offline: bool,

    /// Print the result as JSON.
    #[arg(long, env = "DOCVIEW_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "DOCVIEW_NO_PROGRESS")]
    no_progress: bool,

    /// Enable debug logging.
    #[arg(short, long, env = "DOCVIEW_VERBOSE")]
    verbose: bool,

    /// Suppress everything except errors.
    #[arg(short, long, env = "DOCVIEW_QUIET")]
    quiet: bool,
}

/// What the host learned from one load.
#[derive(Debug, Serialize)]
struct Report {
    title: String,
    kind: DocumentKind,
    state: Option<DocumentState>,
    error: Option<LoadError>,
    detail: Option<String>,
    share_path: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = ViewerConfig::builder()
        .max_background_threads(cli.threads)
        .jpeg_quality(cli.jpeg_quality);
    if let Some(ref root) = cli.share_root {
        builder = builder.share_root(root);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib);
    }
    let config = builder.build().context("Invalid configuration")?;

    let (runtime, mut main_loop) =
        ViewerRuntime::new(&config).context("Failed to start background runtime")?;

    let (source, sniffed) = resolve_source(&cli)?;
    let kind = match cli.kind {
        KindArg::Auto => guess_kind(&cli.input, sniffed),
        other => other,
    };

    let reachability: Arc<dyn Reachability> = if cli.offline {
        Arc::new(FixedReachability::new(false))
    } else {
        Arc::new(SystemReachability::new())
    };

    let observer: Option<Arc<dyn DocumentObserver>> = show_progress
        .then(|| SpinnerObserver::new(&cli.title) as Arc<dyn DocumentObserver>);

    // ── Load ─────────────────────────────────────────────────────────────
    let report = match kind {
        KindArg::Pdf => {
            let loader = PdfLoader::pdfium(runtime.policy(), reachability, &config)
                .context("Failed to bind pdfium")?;
            let doc = PdfDocument::with_credential(
                cli.title.clone(),
                source,
                cli.password.clone(),
                loader,
                &config,
            )?;
            drive(&doc, &mut main_loop, observer.as_ref());
            let detail = doc.document_view().artifact().map(|pdf| {
                let info = pdf.info();
                format!(
                    "{} pages, {}{}",
                    info.page_count,
                    info.pdf_version,
                    if pdf.was_unlocked() { ", unlocked" } else { "" }
                )
            });
            build_report(&doc, detail, cli.share)
        }
        KindArg::Image | KindArg::Auto => {
            let loader = ImageLoader::new(runtime.policy(), reachability, &config);
            let doc = ImageDocument::new(cli.title.clone(), source, loader, &config)?;
            drive(&doc, &mut main_loop, observer.as_ref());
            let detail = doc
                .document_view()
                .artifact()
                .map(|img| format!("{}x{} px", img.width(), img.height()));
            build_report(&doc, detail, cli.share)
        }
    };

    runtime.shutdown_background();

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        let state = report
            .state
            .map(|s| s.to_string())
            .unwrap_or_else(|| "not loaded".into());
        println!("Title:  {}", report.title);
        println!("Kind:   {}", report.kind);
        println!("State:  {}", state);
        if let Some(ref d) = report.detail {
            println!("Detail: {}", dim(d));
        }
        if let Some(ref p) = report.share_path {
            println!("Shared: {}", p.display());
        }
    }

    if let Some(e) = report.error {
        bail!("Load failed: {e}");
    }
    if cli.share && report.share_path.is_none() {
        bail!("Export failed");
    }
    Ok(())
}

/// Start the load and pump the main context until it settles.
fn drive<L: Loader>(
    doc: &ViewerDocument<L>,
    main_loop: &mut MainLoop,
    observer: Option<&Arc<dyn DocumentObserver>>,
) {
    if let Some(observer) = observer {
        doc.set_observer(observer);
    }

    doc.load_source();

    while !doc.state().is_some_and(|s| s.is_terminal()) {
        if !main_loop.blocking_run_one() {
            break;
        }
    }
}

fn build_report<L: Loader>(
    doc: &ViewerDocument<L>,
    detail: Option<String>,
    share: bool,
) -> Report {
    let state = doc.state();
    Report {
        title: doc.title(),
        kind: doc.kind(),
        state,
        error: state.and_then(|s| s.error()),
        detail,
        share_path: if share { doc.share_location() } else { None },
    }
}

/// Map the CLI input onto a document source, plus the sniffed type of an
/// inline payload.
fn resolve_source(cli: &Cli) -> Result<(DocumentSource, Option<MimeType>)> {
    if cli.inline {
        let data = std::fs::read(&cli.input)
            .with_context(|| format!("Failed to read '{}'", cli.input))?;
        let sniffed = MimeType::detect(&data);
        return Ok((DocumentSource::encoded(STANDARD.encode(&data)), Some(sniffed)));
    }

    if cli.input.contains("://") {
        return Ok((DocumentSource::remote_str(&cli.input), None));
    }

    let path = std::fs::canonicalize(&cli.input)
        .with_context(|| format!("File not found: {}", cli.input))?;
    let url = reqwest::Url::from_file_path(&path)
        .map_err(|_| anyhow::anyhow!("Cannot express '{}' as a file URL", path.display()))?;
    Ok((DocumentSource::remote(url), None))
}

fn guess_kind(input: &str, sniffed: Option<MimeType>) -> KindArg {
    match sniffed {
        Some(MimeType::Pdf) => KindArg::Pdf,
        Some(_) => KindArg::Image,
        None if input.to_ascii_lowercase().ends_with(".pdf") => KindArg::Pdf,
        None => KindArg::Image,
    }
}
