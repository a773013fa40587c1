//! Field-level and item-level edits. Every edit builds a new document; the
//! previous one is never touched.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

use crate::model::{BankField, InvoiceDocument, LineItem, TopField};

#[derive(Debug, Error, PartialEq)]
pub enum EditError {
    #[error("unknown field path `{0}`")]
    UnknownField(String),
    #[error("unknown item field `{0}`")]
    UnknownItemField(String),
}

/// A top-level field name, or `bankDetails.<key>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPath {
    Top(TopField),
    Bank(BankField),
}

impl FromStr for FieldPath {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || EditError::UnknownField(s.to_string());
        match s.split_once('.') {
            Some(("bankDetails", child)) => {
                BankField::from_key(child).map(FieldPath::Bank).ok_or_else(unknown)
            }
            Some(_) => Err(unknown()),
            None => TopField::from_key(s).map(FieldPath::Top).ok_or_else(unknown),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Top(field) => f.write_str(field.key()),
            FieldPath::Bank(field) => write!(f, "bankDetails.{}", field.key()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Description,
    Qty,
    UnitPrice,
}

impl FromStr for ItemField {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "description" => Ok(ItemField::Description),
            "qty" => Ok(ItemField::Qty),
            "unitPrice" => Ok(ItemField::UnitPrice),
            other => Err(EditError::UnknownItemField(other.to_string())),
        }
    }
}

/// A new value for one field of one line item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemEdit {
    Description(String),
    Qty(f64),
    UnitPrice(f64),
}

impl ItemEdit {
    /// Raw text from an input box. Numeric fields go through [`parse_numeric_input`].
    pub fn from_input(field: ItemField, raw: &str) -> Self {
        match field {
            ItemField::Description => ItemEdit::Description(raw.to_string()),
            ItemField::Qty => ItemEdit::Qty(parse_numeric_input(raw)),
            ItemField::UnitPrice => ItemEdit::UnitPrice(parse_numeric_input(raw)),
        }
    }

    fn apply(&self, item: &mut LineItem) {
        match self {
            ItemEdit::Description(d) => item.description = d.clone(),
            ItemEdit::Qty(q) => item.qty = *q,
            ItemEdit::UnitPrice(p) => item.unit_price = *p,
        }
    }
}

static NUMERIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("numeric prefix regex")
});

/// Longest leading number in `raw` (after leading whitespace). Anything
/// unparsable or non-finite becomes 0.
pub fn parse_numeric_input(raw: &str) -> f64 {
    NUMERIC_PREFIX
        .find(raw.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

impl InvoiceDocument {
    pub fn with_field(&self, path: FieldPath, value: impl Into<String>) -> InvoiceDocument {
        let mut next = self.clone();
        let slot = match path {
            FieldPath::Top(field) => next.field_mut(field),
            FieldPath::Bank(field) => field.get_mut(&mut next.bank_details),
        };
        *slot = value.into();
        next
    }

    /// Unknown ids leave the items as they are.
    pub fn with_item_edit(&self, id: &str, edit: &ItemEdit) -> InvoiceDocument {
        let mut next = self.clone();
        if let Some(item) = next.items.iter_mut().find(|item| item.id == id) {
            edit.apply(item);
        }
        next
    }

    pub fn with_item_added(&self) -> InvoiceDocument {
        let mut next = self.clone();
        next.items.push(LineItem::blank());
        next
    }

    pub fn without_item(&self, id: &str) -> InvoiceDocument {
        let mut next = self.clone();
        next.items.retain(|item| item.id != id);
        next
    }
}

/// Everything the form can ask for.
#[derive(Debug, Clone, PartialEq)]
pub enum FormAction {
    SetField(FieldPath, String),
    SetItemField(String, ItemEdit),
    AddItem,
    RemoveItem(String),
    ResetToDefault,
}

/// Editing surface over one document. Each operation hands the replacement
/// document to `on_change`.
pub struct InvoiceForm<'a, F>
where
    F: FnMut(InvoiceDocument),
{
    data: &'a InvoiceDocument,
    defaults: &'a InvoiceDocument,
    on_change: F,
}

impl<'a, F> InvoiceForm<'a, F>
where
    F: FnMut(InvoiceDocument),
{
    pub fn new(data: &'a InvoiceDocument, defaults: &'a InvoiceDocument, on_change: F) -> Self {
        InvoiceForm {
            data,
            defaults,
            on_change,
        }
    }

    pub fn set_field(&mut self, path: FieldPath, value: impl Into<String>) {
        (self.on_change)(self.data.with_field(path, value));
    }

    pub fn set_item_field(&mut self, id: &str, edit: ItemEdit) {
        (self.on_change)(self.data.with_item_edit(id, &edit));
    }

    pub fn add_item(&mut self) {
        (self.on_change)(self.data.with_item_added());
    }

    pub fn remove_item(&mut self, id: &str) {
        (self.on_change)(self.data.without_item(id));
    }

    pub fn reset_to_default(&mut self) {
        (self.on_change)(self.defaults.clone());
    }

    pub fn apply(&mut self, action: FormAction) {
        match action {
            FormAction::SetField(path, value) => self.set_field(path, value),
            FormAction::SetItemField(id, edit) => self.set_item_field(&id, edit),
            FormAction::AddItem => self.add_item(),
            FormAction::RemoveItem(id) => self.remove_item(&id),
            FormAction::ResetToDefault => self.reset_to_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_item_doc() -> InvoiceDocument {
        let mut doc = InvoiceDocument::default();
        doc.items = vec![
            LineItem {
                id: "a".into(),
                description: "First".into(),
                qty: 2.0,
                unit_price: 10.0,
            },
            LineItem {
                id: "b".into(),
                description: "Second".into(),
                qty: 1.0,
                unit_price: 4.5,
            },
        ];
        doc
    }

    #[test]
    fn field_paths_parse() {
        assert_eq!("dueDate".parse::<FieldPath>(), Ok(FieldPath::Top(TopField::DueDate)));
        assert_eq!(
            "bankDetails.swiftNumber".parse::<FieldPath>(),
            Ok(FieldPath::Bank(BankField::SwiftNumber))
        );
        assert!("bankDetails.iban".parse::<FieldPath>().is_err());
        assert!("items.description".parse::<FieldPath>().is_err());
        assert!("total".parse::<FieldPath>().is_err());
        assert_eq!(
            FieldPath::Bank(BankField::BankName).to_string(),
            "bankDetails.bankName"
        );
    }

    #[test]
    fn set_field_changes_only_that_field() {
        let doc = InvoiceDocument::default();
        let next = doc.with_field("bankDetails.bankName".parse().unwrap(), "Other Bank");
        assert_eq!(next.bank_details.bank_name, "Other Bank");

        let mut expected = doc.clone();
        expected.bank_details.bank_name = "Other Bank".into();
        assert_eq!(next, expected);

        let next = doc.with_field(FieldPath::Top(TopField::SenderAddress), "");
        assert_eq!(next.sender_address, "");
        assert_eq!(next.sender_name, doc.sender_name);
    }

    #[test]
    fn item_edit_is_isolated() {
        let doc = two_item_doc();
        let next = doc.with_item_edit("a", &ItemEdit::Qty(5.0));
        assert_eq!(next.items[0].qty, 5.0);
        assert_eq!(next.items[0].description, doc.items[0].description);
        assert_eq!(next.items[0].unit_price, doc.items[0].unit_price);
        assert_eq!(next.items[1], doc.items[1]);
        assert_eq!(next.sender_name, doc.sender_name);
        assert_eq!(doc.items[0].qty, 2.0);
    }

    #[test]
    fn unknown_ids_are_no_ops() {
        let doc = two_item_doc();
        assert_eq!(doc.without_item("nonexistent"), doc);
        assert_eq!(doc.with_item_edit("nonexistent", &ItemEdit::Qty(5.0)), doc);
    }

    #[test]
    fn remove_keeps_order_of_the_rest() {
        let mut doc = two_item_doc();
        doc.items.push(LineItem {
            id: "c".into(),
            ..LineItem::blank()
        });
        let next = doc.without_item("b");
        let ids: Vec<&str> = next.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn add_then_price_updates_total() {
        let mut doc = InvoiceDocument::default();
        doc.items = vec![LineItem {
            id: "only".into(),
            description: "A".into(),
            qty: 2.0,
            unit_price: 10.0,
        }];
        assert_eq!(doc.total(), 20.0);

        let added = doc.with_item_added();
        let new_id = added.items.last().unwrap().id.clone();
        assert_ne!(new_id, "only");
        let priced = added.with_item_edit(&new_id, &ItemEdit::UnitPrice(5.0));
        assert_eq!(priced.items.last().unwrap().qty, 1.0);
        assert_eq!(priced.total(), 25.0);
    }

    #[test]
    fn numeric_input_is_coerced() {
        assert_eq!(parse_numeric_input("12"), 12.0);
        assert_eq!(parse_numeric_input(" 3.5kg"), 3.5);
        assert_eq!(parse_numeric_input("-2"), -2.0);
        assert_eq!(parse_numeric_input(".25"), 0.25);
        assert_eq!(parse_numeric_input("1e3"), 1000.0);
        assert_eq!(parse_numeric_input("4."), 4.0);
        assert_eq!(parse_numeric_input(""), 0.0);
        assert_eq!(parse_numeric_input("abc"), 0.0);
        assert_eq!(parse_numeric_input("-"), 0.0);
        assert_eq!(parse_numeric_input("1e999"), 0.0);
        assert_eq!(parse_numeric_input("-1e999"), 0.0);
        assert_eq!(parse_numeric_input("inf"), 0.0);
    }

    #[test]
    fn item_edit_from_input() {
        assert_eq!(ItemEdit::from_input(ItemField::Qty, "x"), ItemEdit::Qty(0.0));
        assert_eq!(
            ItemEdit::from_input("unitPrice".parse().unwrap(), "19.99"),
            ItemEdit::UnitPrice(19.99)
        );
        assert_eq!(
            ItemEdit::from_input(ItemField::Description, "  spaced "),
            ItemEdit::Description("  spaced ".into())
        );
        assert!("amount".parse::<ItemField>().is_err());
    }

    #[test]
    fn form_hands_new_document_to_callback() {
        let doc = two_item_doc();
        let defaults = InvoiceDocument::default();
        let mut seen = Vec::new();
        {
            let mut form = InvoiceForm::new(&doc, &defaults, |next| seen.push(next));
            form.apply(FormAction::SetItemField("b".into(), ItemEdit::Description("Changed".into())));
            form.add_item();
            form.remove_item("a");
            form.reset_to_default();
        }
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].items[1].description, "Changed");
        assert_eq!(seen[1].items.len(), 3);
        assert_eq!(seen[2].items.len(), 1);
        assert_eq!(seen[3], defaults);
        assert_eq!(doc, two_item_doc());
    }
}
