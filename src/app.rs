//! Desktop editor: form on the left, live preview on the right.

use eframe::egui::{self, Color32, RichText};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use tracing::{info, warn};

use crate::config::AppSettings;
use crate::editor::{FieldPath, FormAction, ItemEdit, ItemField, parse_numeric_input};
use crate::export::{export_html, open_in_viewer};
use crate::extract::{ExtractionError, Extractor, GeminiExtractor, ImageUpload, PartialInvoice};
use crate::model::{BankField, InvoiceDocument, LineItem, TopField};
use crate::render::InvoiceView;
use crate::session::Session;

const BRAND_BLUE: Color32 = Color32::from_rgb(0x4a, 0x83, 0xbc);
const THANKS_BLUE: Color32 = Color32::from_rgb(0x3b, 0x82, 0xf6);
const ERROR_RED: Color32 = Color32::from_rgb(185, 28, 28);
const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "webp", "gif", "heic", "heif"];

type Outcome = Result<PartialInvoice, ExtractionError>;

enum HeaderAction {
    Import,
    Print,
}

/// Text of the numeric inputs of one item, kept so that partial entries
/// like "1." survive between frames.
#[derive(Debug, Default, PartialEq)]
struct NumberDrafts {
    qty: String,
    unit_price: String,
}

impl NumberDrafts {
    fn from_item(item: &LineItem) -> Self {
        NumberDrafts {
            qty: item.qty.to_string(),
            unit_price: item.unit_price.to_string(),
        }
    }

    /// Re-seeds a draft when the document value changed from elsewhere
    /// (reset, extraction).
    fn sync(&mut self, item: &LineItem) {
        if parse_numeric_input(&self.qty) != item.qty {
            self.qty = item.qty.to_string();
        }
        if parse_numeric_input(&self.unit_price) != item.unit_price {
            self.unit_price = item.unit_price.to_string();
        }
    }
}

pub struct DesignerApp {
    session: Session,
    settings: AppSettings,
    pending: Option<Receiver<Outcome>>,
    drafts: HashMap<String, NumberDrafts>,
    status: Option<String>,
}

impl DesignerApp {
    pub fn new(session: Session, settings: AppSettings) -> Self {
        DesignerApp {
            session,
            settings,
            pending: None,
            drafts: HashMap::new(),
            status: None,
        }
    }

    fn start_import(&mut self, ctx: &egui::Context) {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Import Invoice Image")
            .add_filter("Images", &IMAGE_EXTENSIONS)
            .pick_file()
        else {
            return;
        };
        if self.session.begin_extraction().is_err() {
            return;
        }
        info!(path = %path.display(), "Starting extraction");

        let (tx, rx) = mpsc::channel();
        let settings = self.settings.extraction.clone();
        let ctx = ctx.clone();
        thread::spawn(move || {
            let outcome = GeminiExtractor::from_settings(&settings).and_then(|extractor| {
                let image = ImageUpload::from_path(&path)?;
                extractor.extract(&image)
            });
            // a closed receiver means the window is gone
            let _ = tx.send(outcome);
            ctx.request_repaint();
        });
        self.pending = Some(rx);
    }

    fn poll_extraction(&mut self) {
        let Some(rx) = &self.pending else {
            return;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => Err(ExtractionError::Interrupted),
        };
        self.pending = None;
        if self.session.finish_extraction(outcome) {
            self.prune_drafts();
        }
    }

    fn print(&mut self) {
        match export_html(self.session.document(), &self.settings.output_dir()) {
            Ok(path) => {
                open_in_viewer(&path);
                self.status = Some(format!("Saved {}", path.display()));
            }
            Err(e) => {
                warn!(error = %e, "Export failed");
                self.status = Some(format!("Export failed: {e}"));
            }
        }
    }

    fn prune_drafts(&mut self) {
        let doc = self.session.document();
        self.drafts.retain(|id, _| doc.item(id).is_some());
    }
}

impl eframe::App for DesignerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_extraction();

        let mut header = None;
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            header = header_bar(ui, self.session.is_processing(), self.status.as_deref());
        });
        match header {
            Some(HeaderAction::Import) => self.start_import(ctx),
            Some(HeaderAction::Print) => self.print(),
            None => {}
        }

        let mut actions = Vec::new();
        let mut dismiss = false;
        egui::SidePanel::left("editor")
            .resizable(true)
            .default_width(450.0)
            .show(ctx, |ui| {
                dismiss = editor_panel(
                    ui,
                    self.session.document(),
                    self.session.advisory(),
                    &mut self.drafts,
                    &mut actions,
                );
            });
        if dismiss {
            self.session.dismiss_advisory();
        }
        if !actions.is_empty() {
            for action in actions {
                self.session.apply(action);
            }
            self.prune_drafts();
        }

        let view = InvoiceView::from_document(self.session.document());
        egui::CentralPanel::default()
            .frame(egui::Frame::default().fill(Color32::from_gray(229)))
            .show(ctx, |ui| preview(ui, &view));
    }
}

pub fn run(session: Session, settings: AppSettings) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Invoice Designer")
            .with_inner_size([1400.0, 900.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Invoice Designer",
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
            Ok(Box::new(DesignerApp::new(session, settings)))
        }),
    )
}

// ==========================================
// Header
// ==========================================

fn header_bar(ui: &mut egui::Ui, processing: bool, status: Option<&str>) -> Option<HeaderAction> {
    let mut action = None;
    ui.horizontal(|ui| {
        ui.label(RichText::new("Invoice Designer").size(20.0).strong());
        if let Some(status) = status {
            ui.label(RichText::new(status).small().color(Color32::GRAY));
        }
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("Print / Save").clicked() {
                action = Some(HeaderAction::Print);
            }
            let label = if processing { "Processing AI..." } else { "Import from Image" };
            if ui.add_enabled(!processing, egui::Button::new(label)).clicked() {
                action = Some(HeaderAction::Import);
            }
            if processing {
                ui.spinner();
            }
        });
    });
    action
}

// ==========================================
// Editor
// ==========================================

/// Draws the form and collects what the user changed. Returns true when the
/// advisory was dismissed.
fn editor_panel(
    ui: &mut egui::Ui,
    doc: &InvoiceDocument,
    advisory: Option<&str>,
    drafts: &mut HashMap<String, NumberDrafts>,
    actions: &mut Vec<FormAction>,
) -> bool {
    let mut dismiss = false;

    ui.horizontal(|ui| {
        ui.heading("Editor");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.small_button("Reset to Default").clicked() {
                actions.push(FormAction::ResetToDefault);
            }
        });
    });

    if let Some(message) = advisory {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.colored_label(ERROR_RED, message);
                if ui.small_button("✕").clicked() {
                    dismiss = true;
                }
            });
        });
    }
    ui.add_space(8.0);

    egui::ScrollArea::vertical().show(ui, |ui| {
        section(ui, "General Information", |ui| {
            for field in [TopField::InvoiceNumber, TopField::DueDate] {
                top_field(ui, doc, field, actions);
            }
        });

        section(ui, "Sender & Recipient", |ui| {
            for field in [
                TopField::SenderName,
                TopField::SenderAddress,
                TopField::BillToName,
                TopField::BillToAddress,
            ] {
                top_field(ui, doc, field, actions);
            }
        });

        section(ui, "Bank Details", |ui| {
            for field in BankField::ALL {
                let current = field.get(&doc.bank_details);
                if let Some(value) = text_field(ui, field.label(), current, false) {
                    actions.push(FormAction::SetField(FieldPath::Bank(field), value));
                }
            }
        });

        section(ui, "Line Items", |ui| {
            if ui.button("+ Add Item").clicked() {
                actions.push(FormAction::AddItem);
            }
            ui.add_space(6.0);
            for item in &doc.items {
                let draft = drafts
                    .entry(item.id.clone())
                    .or_insert_with(|| NumberDrafts::from_item(item));
                item_editor(ui, item, draft, actions);
            }
        });
    });

    dismiss
}

fn section(ui: &mut egui::Ui, title: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.label(RichText::new(title).size(16.0).strong().color(BRAND_BLUE));
        ui.add_space(6.0);
        add_contents(ui);
    });
    ui.add_space(10.0);
}

fn top_field(ui: &mut egui::Ui, doc: &InvoiceDocument, field: TopField, actions: &mut Vec<FormAction>) {
    if let Some(value) = text_field(ui, field.label(), doc.field(field), field.is_multiline()) {
        actions.push(FormAction::SetField(FieldPath::Top(field), value));
    }
}

/// Labeled text input. Returns the new text when the user changed it.
fn text_field(ui: &mut egui::Ui, label: &str, current: &str, multiline: bool) -> Option<String> {
    ui.label(RichText::new(label.to_uppercase()).small().strong().color(Color32::GRAY));
    let mut buffer = current.to_owned();
    let input = if multiline {
        egui::TextEdit::multiline(&mut buffer).desired_rows(3)
    } else {
        egui::TextEdit::singleline(&mut buffer)
    };
    let changed = ui.add(input.desired_width(f32::INFINITY)).changed();
    ui.add_space(4.0);
    changed.then_some(buffer)
}

fn item_editor(
    ui: &mut egui::Ui,
    item: &LineItem,
    draft: &mut NumberDrafts,
    actions: &mut Vec<FormAction>,
) {
    draft.sync(item);
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.horizontal(|ui| {
            ui.label(RichText::new("DESCRIPTION").small().strong().color(Color32::GRAY));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("×").on_hover_text("Remove item").clicked() {
                    actions.push(FormAction::RemoveItem(item.id.clone()));
                }
            });
        });
        let mut description = item.description.clone();
        let input = egui::TextEdit::singleline(&mut description).desired_width(f32::INFINITY);
        if ui.add(input).changed() {
            actions.push(FormAction::SetItemField(
                item.id.clone(),
                ItemEdit::Description(description),
            ));
        }

        ui.horizontal(|ui| {
            ui.label(RichText::new("QTY").small().strong().color(Color32::GRAY));
            let qty = egui::TextEdit::singleline(&mut draft.qty).desired_width(60.0);
            if ui.add(qty).changed() {
                actions.push(FormAction::SetItemField(
                    item.id.clone(),
                    ItemEdit::from_input(ItemField::Qty, &draft.qty),
                ));
            }
            ui.label(RichText::new("UNIT PRICE").small().strong().color(Color32::GRAY));
            let price = egui::TextEdit::singleline(&mut draft.unit_price).desired_width(100.0);
            if ui.add(price).changed() {
                actions.push(FormAction::SetItemField(
                    item.id.clone(),
                    ItemEdit::from_input(ItemField::UnitPrice, &draft.unit_price),
                ));
            }
        });
    });
    ui.add_space(6.0);
}

// ==========================================
// Preview
// ==========================================

fn preview(ui: &mut egui::Ui, view: &InvoiceView) {
    egui::ScrollArea::both().auto_shrink([false, false]).show(ui, |ui| {
        ui.vertical_centered(|ui| {
            egui::Frame::default()
                .fill(Color32::WHITE)
                .inner_margin(egui::Margin::same(40))
                .show(ui, |ui| {
                    ui.set_width(720.0);
                    ui.with_layout(egui::Layout::top_down(egui::Align::Min), |ui| {
                        page(ui, view);
                    });
                });
        });
    });
}

fn page(ui: &mut egui::Ui, view: &InvoiceView) {
    ui.horizontal(|ui| {
        ui.vertical(|ui| {
            ui.label(RichText::new(view.sender_name.as_str()).size(22.0).strong().color(BRAND_BLUE));
            ui.label(RichText::new(view.sender_address.as_str()).strong());
        });
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
            ui.label(RichText::new("INVOICE").size(56.0).color(BRAND_BLUE));
        });
    });
    ui.add_space(32.0);

    ui.columns(3, |cols| {
        bar(&mut cols[0], "BILL TO");
        cols[0].label(RichText::new(view.bill_to_name.as_str()).strong());
        cols[0].label(view.bill_to_address.as_str());

        bar(&mut cols[1], "INVOICE #");
        cols[1].vertical_centered(|ui| {
            ui.label(RichText::new(view.invoice_number.as_str()).size(16.0).strong());
        });

        bar(&mut cols[2], "DUE DATE");
        cols[2].vertical_centered(|ui| {
            ui.label(RichText::new(view.due_date.as_str()).size(16.0).strong());
        });
    });
    ui.add_space(24.0);

    bar(ui, "BENEFICIARY BANK DETAILS");
    for entry in &view.bank_details {
        ui.horizontal_wrapped(|ui| {
            ui.label(RichText::new(format!("{}:", entry.label)).strong());
            ui.label(entry.value.as_str());
        });
    }
    ui.add_space(32.0);

    egui::Grid::new("preview_items")
        .num_columns(4)
        .striped(true)
        .spacing([24.0, 6.0])
        .min_col_width(80.0)
        .show(ui, |ui| {
            for heading in ["DESCRIPTION", "QTY", "UNIT PRICE", "AMOUNT"] {
                ui.label(RichText::new(heading).strong().color(BRAND_BLUE));
            }
            ui.end_row();

            for row in &view.rows {
                ui.label(row.description.as_str());
                ui.label(row.qty.as_str());
                ui.label(row.unit_price.as_str());
                ui.label(RichText::new(row.amount.as_str()).strong());
                ui.end_row();
            }

            ui.label(" ");
            ui.label("");
            ui.label("");
            ui.label("-");
            ui.end_row();
        });
    ui.add_space(8.0);

    ui.horizontal(|ui| {
        ui.label(RichText::new(view.thank_you).italics().strong().size(16.0).color(THANKS_BLUE));
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(RichText::new(view.total.as_str()).size(20.0).strong());
            ui.label(RichText::new("TOTAL   $").size(20.0).strong().color(BRAND_BLUE));
        });
    });
    ui.add_space(48.0);

    ui.vertical_centered(|ui| {
        ui.label(RichText::new(view.footer).color(Color32::DARK_GRAY));
    });
}

fn bar(ui: &mut egui::Ui, text: &str) {
    egui::Frame::default()
        .fill(BRAND_BLUE)
        .inner_margin(egui::Margin::symmetric(12, 4))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(RichText::new(text).strong().color(Color32::WHITE));
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> DesignerApp {
        DesignerApp::new(Session::default(), AppSettings::default())
    }

    #[test]
    fn drafts_follow_document_changes() {
        let mut item = LineItem::blank();
        let mut draft = NumberDrafts::from_item(&item);
        assert_eq!(draft.qty, "1");
        assert_eq!(draft.unit_price, "0");
        draft.sync(&item);
        assert_eq!(draft.qty, "1");
        assert_eq!(draft.unit_price, "0");

        // a half-typed number that parses to the stored value is left alone
        item.unit_price = 4.0;
        draft.unit_price = "4.".into();
        draft.sync(&item);
        assert_eq!(draft.unit_price, "4.");

        item.qty = 3.0;
        draft.sync(&item);
        assert_eq!(draft.qty, "3");
    }

    #[test]
    fn finished_extraction_is_merged_on_poll() {
        let mut app = app();
        app.session.begin_extraction().unwrap();
        let (tx, rx) = mpsc::channel();
        app.pending = Some(rx);

        app.poll_extraction();
        assert!(app.session.is_processing());

        tx.send(PartialInvoice::from_json_str(r#"{"billToName": "Globex"}"#)).unwrap();
        app.poll_extraction();
        assert!(!app.session.is_processing());
        assert!(app.pending.is_none());
        assert_eq!(app.session.document().bill_to_name, "Globex");
    }

    #[test]
    fn drafts_of_replaced_items_are_pruned_after_extraction() {
        let mut app = app();
        app.drafts.insert("item-default-1".into(), NumberDrafts::default());
        app.session.begin_extraction().unwrap();
        let (tx, rx) = mpsc::channel();
        app.pending = Some(rx);

        tx.send(PartialInvoice::from_json_str(
            r#"{"items": [{"description": "Audit", "qty": 2, "unitPrice": 10}]}"#,
        ))
        .unwrap();
        app.poll_extraction();

        assert!(app.drafts.is_empty());
        assert_eq!(app.session.document().items[0].description, "Audit");
    }

    #[test]
    fn vanished_worker_surfaces_advisory() {
        let mut app = app();
        let before = app.session.document().clone();
        app.session.begin_extraction().unwrap();
        let (tx, rx) = mpsc::channel::<Outcome>();
        app.pending = Some(rx);
        drop(tx);

        app.poll_extraction();
        assert_eq!(app.session.document(), &before);
        assert!(app.session.advisory().is_some());
        assert!(!app.session.is_processing());
    }

    #[test]
    fn drafts_of_removed_items_are_pruned() {
        let mut app = app();
        app.drafts.insert("gone".into(), NumberDrafts::default());
        app.drafts.insert("item-default-1".into(), NumberDrafts::default());
        app.prune_drafts();
        assert_eq!(app.drafts.len(), 1);
        assert!(app.drafts.contains_key("item-default-1"));
    }
}
