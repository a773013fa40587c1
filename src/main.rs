mod app;
mod config;
mod editor;
mod export;
mod extract;
mod model;
mod render;
mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AppSettings;
use crate::editor::{FieldPath, FormAction};
use crate::extract::{Extractor, GeminiExtractor, ImageUpload};
use crate::model::InvoiceDocument;
use crate::session::Session;

// ==========================================
// Structs & Enums
// ==========================================

#[derive(Parser)]
#[command(name = "invoice-designer", version, about = "Edit, preview and import invoices")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the invoice editor (default)
    Edit {
        /// Document to start from instead of the default one
        #[arg(long)]
        document: Option<PathBuf>,
    },
    /// Fill a document from a photographed or scanned invoice
    Extract {
        /// Image file of the invoice
        image: PathBuf,
        #[arg(long)]
        document: Option<PathBuf>,
    },
    /// Write the invoice as an HTML page
    Render {
        #[arg(long)]
        document: Option<PathBuf>,
        /// Output file (defaults to the configured output directory)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Open the page in the default viewer
        #[arg(long)]
        open: bool,
    },
    /// Change one field of a document file, e.g. `bankDetails.swiftNumber`
    Set {
        document: PathBuf,
        /// Field name, or `bankDetails.<key>`
        path: String,
        value: String,
    },
    /// Print line items and total
    Show {
        #[arg(long)]
        document: Option<PathBuf>,
    },
    /// Show settings
    Config {
        /// Write a settings file with default values
        #[arg(long)]
        init: bool,
    },
}

// ==========================================
// Main Function
// ==========================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = config::load_settings().context("Failed to load settings")?;

    match cli.command.unwrap_or(Commands::Edit { document: None }) {
        Commands::Edit { document } => {
            let session = start_session(&settings, document.as_deref())?;
            app::run(session, settings)
                .map_err(|e| anyhow::anyhow!("Editor exited with an error: {e}"))?;
        }
        Commands::Extract { image, document } => {
            let mut session = start_session(&settings, document.as_deref())?;
            extract_into(&mut session, &settings, &image);
            if let Some(advisory) = session.advisory() {
                eprintln!("{advisory}");
            }
            println!("{}", serde_json::to_string_pretty(session.document())?);
        }
        Commands::Render { document, out, open } => {
            let doc = open_document(&settings, document.as_deref())?;
            let path = match out {
                Some(path) => {
                    let html = render::render_html(&doc)?;
                    fs::write(&path, html)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    path
                }
                None => export::export_html(&doc, &settings.output_dir())?,
            };
            println!("{}", path.display());
            if open {
                export::open_in_viewer(&path);
            }
        }
        Commands::Set { document, path, value } => {
            let field: FieldPath = path.parse()?;
            let mut session = Session::new(open_document(&settings, Some(document.as_path()))?);
            session.apply(FormAction::SetField(field, value));
            config::save_document(&document, session.document())?;
            println!("{field} updated in {}", document.display());
        }
        Commands::Show { document } => {
            let doc = open_document(&settings, document.as_deref())?;
            println!("Invoice #{}  due {}", doc.invoice_number, doc.due_date);
            println!("{}", render::items_table(&doc));
        }
        Commands::Config { init } => {
            let path = config::config_path();
            if init {
                config::save_settings_to(&path, &settings)?;
            }
            println!("# {}", path.display());
            print!("{}", toml::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}

// ==========================================
// Helpers
// ==========================================

fn open_document(settings: &AppSettings, path: Option<&Path>) -> Result<InvoiceDocument> {
    match path {
        Some(path) => config::load_document(path)
            .with_context(|| format!("Failed to load document {}", path.display())),
        None => settings
            .default_document()
            .context("Failed to load the configured default document"),
    }
}

fn start_session(settings: &AppSettings, path: Option<&Path>) -> Result<Session> {
    let defaults = settings
        .default_document()
        .context("Failed to load the configured default document")?;
    let mut session = Session::new(defaults);
    if let Some(path) = path {
        let doc = config::load_document(path)
            .with_context(|| format!("Failed to load document {}", path.display()))?;
        session.replace(doc);
    }
    Ok(session)
}

/// One extraction call. Failures end up as the session advisory.
fn extract_into(session: &mut Session, settings: &AppSettings, image: &Path) {
    if session.begin_extraction().is_err() {
        return;
    }
    info!(image = %image.display(), "Extracting invoice data");
    let outcome = GeminiExtractor::from_settings(&settings.extraction).and_then(|extractor| {
        let upload = ImageUpload::from_path(image)?;
        extractor.extract(&upload)
    });
    session.finish_extraction(outcome);
}
