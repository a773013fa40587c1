use slug::slugify;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{info, warn};

use crate::model::InvoiceDocument;
use crate::render::{RenderError, render_html};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `invoice-<number>.html`, or `invoice.html` when the number has nothing sluggable.
pub fn export_file_name(doc: &InvoiceDocument) -> String {
    let slug = slugify(&doc.invoice_number);
    if slug.is_empty() {
        "invoice.html".to_string()
    } else {
        format!("invoice-{slug}.html")
    }
}

/// Writes the rendered page into `dir` and returns its path.
pub fn export_html(doc: &InvoiceDocument, dir: &Path) -> Result<PathBuf, ExportError> {
    let html = render_html(doc)?;
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(export_file_name(doc));
    fs::write(&path, html).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "Invoice exported");
    Ok(path)
}

/// Hands the file to the desktop's default viewer, where it can be printed
/// or saved as PDF.
pub fn open_in_viewer(path: &Path) {
    #[cfg(target_os = "macos")]
    let spawned = Command::new("open").arg(path).spawn();

    #[cfg(target_os = "windows")]
    let spawned = Command::new("explorer").arg(path).spawn();

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let spawned = Command::new("xdg-open").arg(path).spawn();

    if let Err(e) = spawned {
        warn!(path = %path.display(), error = %e, "Could not open exported invoice");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_follows_invoice_number() {
        let mut doc = InvoiceDocument::default();
        assert_eq!(export_file_name(&doc), "invoice-100298.html");
        doc.invoice_number = "INV 2025/07".into();
        assert_eq!(export_file_name(&doc), "invoice-inv-2025-07.html");
        doc.invoice_number = "  ".into();
        assert_eq!(export_file_name(&doc), "invoice.html");
    }

    #[test]
    fn export_writes_rendered_page() {
        let dir = std::env::temp_dir().join(format!("invoice-designer-export-{}", std::process::id()));
        let path = export_html(&InvoiceDocument::default(), &dir).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("60,000.00"));
        fs::remove_dir_all(&dir).ok();
    }
}
