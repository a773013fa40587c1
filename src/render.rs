//! Pure derivation from a document to what the preview shows.

use comfy_table::{Attribute, Cell, CellAlignment, Table};
use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

use crate::model::{BankField, InvoiceDocument, LineItem};

// Embed template at compile time to ensure availability
const INVOICE_TEMPLATE: &str = include_str!("../templates/invoice.html.tera");

pub const THANK_YOU: &str = "Thank you for your business!";
pub const CONTACT_FOOTER: &str = "If you have any questions about this invoice, please contact";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

/// Two fraction digits with comma grouping, e.g. `60,000.00`.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // no sign when the value rounds to zero
    let sign = if value < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{dec_part}")
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LabeledValue {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemRow {
    pub description: String,
    pub qty: String,
    pub unit_price: String,
    pub amount: String,
}

impl ItemRow {
    fn from_item(item: &LineItem) -> Self {
        ItemRow {
            description: item.description.clone(),
            qty: item.qty.to_string(),
            unit_price: format_currency(item.unit_price),
            amount: format_currency(item.amount()),
        }
    }
}

/// Everything the rendered page needs, with numbers already formatted.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InvoiceView {
    pub sender_name: String,
    pub sender_address: String,
    pub bill_to_name: String,
    pub bill_to_address: String,
    pub invoice_number: String,
    pub due_date: String,
    pub bank_details: Vec<LabeledValue>,
    pub rows: Vec<ItemRow>,
    pub total: String,
    pub thank_you: &'static str,
    pub footer: &'static str,
}

impl InvoiceView {
    pub fn from_document(doc: &InvoiceDocument) -> Self {
        InvoiceView {
            sender_name: doc.sender_name.clone(),
            sender_address: doc.sender_address.clone(),
            bill_to_name: doc.bill_to_name.clone(),
            bill_to_address: doc.bill_to_address.clone(),
            invoice_number: doc.invoice_number.clone(),
            due_date: doc.due_date.clone(),
            bank_details: BankField::ALL
                .iter()
                .map(|f| LabeledValue {
                    label: f.label(),
                    value: f.get(&doc.bank_details).to_string(),
                })
                .collect(),
            rows: doc.items.iter().map(ItemRow::from_item).collect(),
            total: format_currency(doc.total()),
            thank_you: THANK_YOU,
            footer: CONTACT_FOOTER,
        }
    }
}

/// Standalone HTML page for the document; user text is escaped.
pub fn render_html(doc: &InvoiceDocument) -> Result<String, RenderError> {
    let context = Context::from_serialize(InvoiceView::from_document(doc))?;
    Ok(Tera::one_off(INVOICE_TEMPLATE, &context, true)?)
}

/// Line items with amounts and the total, for the terminal.
pub fn items_table(doc: &InvoiceDocument) -> Table {
    let view = InvoiceView::from_document(doc);
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Description"),
        Cell::new("Qty"),
        Cell::new("Unit Price"),
        Cell::new("Amount"),
    ]);

    for row in view.rows {
        table.add_row(vec![
            Cell::new(row.description),
            Cell::new(row.qty).set_alignment(CellAlignment::Center),
            Cell::new(row.unit_price).set_alignment(CellAlignment::Right),
            Cell::new(row.amount).set_alignment(CellAlignment::Right),
        ]);
    }

    table.add_row(vec![
        Cell::new("TOTAL").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new("$").set_alignment(CellAlignment::Right),
        Cell::new(view.total)
            .add_attribute(Attribute::Bold)
            .set_alignment(CellAlignment::Right),
    ]);
    table
}
