//! Image-to-document extraction: the external call, the sanitizing decode of
//! its reply, and the merge of that reply into the current document.

pub mod gemini;
pub mod merge;
pub mod partial;

use std::path::PathBuf;
use thiserror::Error;

pub use gemini::{Extractor, GeminiExtractor, ImageUpload};
pub use merge::merge;
pub use partial::PartialInvoice;

/// Whether a failure happened getting a reply or making sense of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Parse,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::Parse => "parse",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("extraction service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no API key found; set the {0} environment variable")]
    MissingApiKey(String),

    #[error("could not read image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("extraction worker stopped before returning a result")]
    Interrupted,

    #[error("extraction reply is not usable invoice data: {0}")]
    Parse(String),
}

impl ExtractionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExtractionError::Parse(_) => FailureKind::Parse,
            _ => FailureKind::Transport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_parse_errors_are_parse_failures() {
        assert_eq!(ExtractionError::Parse("x".into()).kind(), FailureKind::Parse);
        assert_eq!(ExtractionError::Interrupted.kind(), FailureKind::Transport);
        assert_eq!(
            ExtractionError::Status { status: 429, body: "quota".into() }.kind(),
            FailureKind::Transport
        );
        assert_eq!(
            ExtractionError::MissingApiKey("GEMINI_API_KEY".into()).kind(),
            FailureKind::Transport
        );
    }
}
