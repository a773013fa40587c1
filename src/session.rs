use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::editor::{FormAction, InvoiceForm};
use crate::extract::{ExtractionError, PartialInvoice, merge};
use crate::model::InvoiceDocument;

pub const EXTRACTION_FAILED: &str = "Failed to extract data. Please fill it manually.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("an extraction is already in progress")]
    Busy,
}

/// Owns the one document of an editing session. The form and the extraction
/// merge replace it whole; nothing edits it in place.
#[derive(Debug, Clone)]
pub struct Session {
    document: InvoiceDocument,
    default_document: InvoiceDocument,
    processing: bool,
    advisory: Option<String>,
}

impl Session {
    pub fn new(default_document: InvoiceDocument) -> Self {
        Session {
            document: default_document.clone(),
            default_document,
            processing: false,
            advisory: None,
        }
    }

    pub fn document(&self) -> &InvoiceDocument {
        &self.document
    }

    pub fn replace(&mut self, document: InvoiceDocument) {
        debug!(items = document.items.len(), "Document replaced");
        self.document = document;
    }

    /// Runs one form action against the current document.
    pub fn apply(&mut self, action: FormAction) {
        let mut next = None;
        InvoiceForm::new(&self.document, &self.default_document, |doc| next = Some(doc))
            .apply(action);
        if let Some(doc) = next {
            self.replace(doc);
        }
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn advisory(&self) -> Option<&str> {
        self.advisory.as_deref()
    }

    pub fn dismiss_advisory(&mut self) {
        self.advisory = None;
    }

    /// Marks an extraction as outstanding. Only one may be in flight.
    pub fn begin_extraction(&mut self) -> Result<(), SessionError> {
        if self.processing {
            warn!("Extraction requested while another is in flight");
            return Err(SessionError::Busy);
        }
        self.processing = true;
        self.advisory = None;
        Ok(())
    }

    /// Applies the outcome of an extraction to the document as it is now,
    /// not as it was when the call started. Returns whether the document changed.
    pub fn finish_extraction(&mut self, outcome: Result<PartialInvoice, ExtractionError>) -> bool {
        self.processing = false;
        match outcome {
            Ok(partial) => {
                if partial.is_empty() {
                    warn!("Extraction returned no fields");
                }
                let merged = merge(&self.document, &partial);
                let changed = merged != self.document;
                info!(changed, items = merged.items.len(), "Extraction merged");
                self.replace(merged);
                changed
            }
            Err(e) => {
                error!(kind = e.kind().as_str(), error = %e, "Extraction failed");
                self.advisory = Some(EXTRACTION_FAILED.to_string());
                false
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new(InvoiceDocument::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{FieldPath, ItemEdit};
    use crate::extract::{Extractor, ImageUpload};
    use crate::model::TopField;

    /// Replies with fixed text, the way the service body would arrive.
    struct CannedReply(&'static str);

    impl Extractor for CannedReply {
        fn extract(&self, _image: &ImageUpload) -> Result<PartialInvoice, ExtractionError> {
            PartialInvoice::from_json_str(self.0)
        }
    }

    fn image() -> ImageUpload {
        ImageUpload {
            mime_type: "image/jpeg".into(),
            bytes: vec![0xff, 0xd8],
        }
    }

    #[test]
    fn parse_failure_leaves_document_and_sets_one_advisory() {
        let mut session = Session::default();
        let before = session.document().clone();

        session.begin_extraction().unwrap();
        let outcome = CannedReply("this is not json").extract(&image());
        let changed = session.finish_extraction(outcome);

        assert!(!changed);
        assert_eq!(session.document(), &before);
        assert_eq!(session.advisory(), Some(EXTRACTION_FAILED));
        assert!(!session.is_processing());
    }

    #[test]
    fn transport_failure_is_recovered_the_same_way() {
        let mut session = Session::default();
        let before = session.document().clone();
        session.begin_extraction().unwrap();
        session.finish_extraction(Err(ExtractionError::Status {
            status: 503,
            body: "unavailable".into(),
        }));
        assert_eq!(session.document(), &before);
        assert_eq!(session.advisory(), Some(EXTRACTION_FAILED));

        session.begin_extraction().unwrap();
        assert_eq!(session.advisory(), None);
    }

    #[test]
    fn second_extraction_is_refused_while_one_is_in_flight() {
        let mut session = Session::default();
        session.begin_extraction().unwrap();
        assert_eq!(session.begin_extraction(), Err(SessionError::Busy));
        session.finish_extraction(Ok(PartialInvoice::default()));
        assert!(session.begin_extraction().is_ok());
    }

    #[test]
    fn merge_uses_latest_document() {
        let mut session = Session::default();
        session.begin_extraction().unwrap();

        // edit made while the call is outstanding
        session.apply(FormAction::SetField(FieldPath::Top(TopField::DueDate), "1 Jan 2030".into()));

        let outcome = CannedReply(r#"{"senderName": "Scanned Sender"}"#).extract(&image());
        assert!(session.finish_extraction(outcome));

        assert_eq!(session.document().due_date, "1 Jan 2030");
        assert_eq!(session.document().sender_name, "Scanned Sender");
        assert_eq!(session.advisory(), None);
    }

    #[test]
    fn actions_and_reset() {
        let mut session = Session::default();
        session.apply(FormAction::AddItem);
        let id = session.document().items[1].id.clone();
        session.apply(FormAction::SetItemField(id.clone(), ItemEdit::Qty(3.0)));
        session.apply(FormAction::SetItemField(id, ItemEdit::UnitPrice(2.5)));
        assert_eq!(session.document().total(), 60007.5);

        session.apply(FormAction::ResetToDefault);
        assert_eq!(session.document(), &InvoiceDocument::default());
    }
}
