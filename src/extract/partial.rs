//! Sanitizing decode of an untrusted extraction reply.
//!
//! Every field is optional. Unknown keys are dropped. A field of the wrong JSON
//! type is either carried over in textual form (numbers and booleans where a
//! string is expected) or treated as absent (objects, arrays, null).

use serde_json::{Map, Value};

use super::ExtractionError;
use crate::model::{BankField, TopField};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialInvoice {
    pub sender_name: Option<String>,
    pub sender_address: Option<String>,
    pub bill_to_name: Option<String>,
    pub bill_to_address: Option<String>,
    pub invoice_number: Option<String>,
    pub due_date: Option<String>,
    pub bank_details: Option<PartialBankDetails>,
    pub items: Option<Vec<PartialLineItem>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialBankDetails {
    pub beneficiary_name: Option<String>,
    pub account_number: Option<String>,
    pub swift_number: Option<String>,
    pub beneficiary_address: Option<String>,
    pub bank_name: Option<String>,
    pub bank_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialLineItem {
    pub description: Option<String>,
    pub qty: Option<f64>,
    pub unit_price: Option<f64>,
}

impl PartialInvoice {
    /// Decode the text of an extraction reply.
    ///
    /// Blank text is an empty partial. Text that is not a JSON object (after
    /// removing any markdown code fence) is a parse failure.
    pub fn from_json_str(text: &str) -> Result<Self, ExtractionError> {
        let body = strip_code_fence(text);
        if body.is_empty() {
            return Ok(PartialInvoice::default());
        }
        let value: Value =
            serde_json::from_str(body).map_err(|e| ExtractionError::Parse(e.to_string()))?;
        if !value.is_object() {
            return Err(ExtractionError::Parse(format!(
                "expected a JSON object, got {}",
                json_type_name(&value)
            )));
        }
        Ok(PartialInvoice::from_value(&value))
    }

    /// Total: any JSON value decodes, non-objects to an empty partial.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => PartialInvoice::from_map(map),
            _ => PartialInvoice::default(),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        let text = |field: TopField| map.get(field.key()).and_then(lenient_string);
        PartialInvoice {
            sender_name: text(TopField::SenderName),
            sender_address: text(TopField::SenderAddress),
            bill_to_name: text(TopField::BillToName),
            bill_to_address: text(TopField::BillToAddress),
            invoice_number: text(TopField::InvoiceNumber),
            due_date: text(TopField::DueDate),
            bank_details: match map.get("bankDetails") {
                Some(Value::Object(bank)) => Some(PartialBankDetails::from_map(bank)),
                _ => None,
            },
            items: match map.get("items") {
                Some(Value::Array(items)) => {
                    Some(items.iter().map(PartialLineItem::from_value).collect())
                }
                _ => None,
            },
        }
    }

    pub fn field(&self, field: TopField) -> Option<&str> {
        let value = match field {
            TopField::SenderName => &self.sender_name,
            TopField::SenderAddress => &self.sender_address,
            TopField::BillToName => &self.bill_to_name,
            TopField::BillToAddress => &self.bill_to_address,
            TopField::InvoiceNumber => &self.invoice_number,
            TopField::DueDate => &self.due_date,
        };
        value.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        *self == PartialInvoice::default()
    }
}

impl PartialBankDetails {
    fn from_map(map: &Map<String, Value>) -> Self {
        let text = |field: BankField| map.get(field.key()).and_then(lenient_string);
        PartialBankDetails {
            beneficiary_name: text(BankField::BeneficiaryName),
            account_number: text(BankField::AccountNumber),
            swift_number: text(BankField::SwiftNumber),
            beneficiary_address: text(BankField::BeneficiaryAddress),
            bank_name: text(BankField::BankName),
            bank_address: text(BankField::BankAddress),
        }
    }

    pub fn get(&self, field: BankField) -> Option<&str> {
        let value = match field {
            BankField::BeneficiaryName => &self.beneficiary_name,
            BankField::AccountNumber => &self.account_number,
            BankField::SwiftNumber => &self.swift_number,
            BankField::BeneficiaryAddress => &self.beneficiary_address,
            BankField::BankName => &self.bank_name,
            BankField::BankAddress => &self.bank_address,
        };
        value.as_deref()
    }
}

impl PartialLineItem {
    /// Elements that are not objects decode to an all-absent record.
    fn from_value(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return PartialLineItem::default();
        };
        PartialLineItem {
            description: map.get("description").and_then(lenient_string),
            qty: map.get("qty").and_then(lenient_number),
            unit_price: map.get("unitPrice").and_then(lenient_number),
        }
    }
}

fn lenient_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Infinities do not survive a JSON round trip, so they count as absent.
fn lenient_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn strip_code_fence(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FailureKind;
    use serde_json::json;

    #[test]
    fn decodes_known_fields_and_drops_unknown_ones() {
        let partial = PartialInvoice::from_value(&json!({
            "senderName": "Acme",
            "invoiceNumber": "INV-7",
            "currency": "USD",
            "bankDetails": { "bankName": "First Bank", "iban": "DE00" }
        }));
        assert_eq!(partial.sender_name.as_deref(), Some("Acme"));
        assert_eq!(partial.field(TopField::InvoiceNumber), Some("INV-7"));
        assert_eq!(partial.due_date, None);
        let bank = partial.bank_details.unwrap();
        assert_eq!(bank.get(BankField::BankName), Some("First Bank"));
        assert_eq!(bank.get(BankField::SwiftNumber), None);
    }

    #[test]
    fn empty_strings_are_kept_as_present() {
        let partial = PartialInvoice::from_value(&json!({ "dueDate": "" }));
        assert_eq!(partial.due_date.as_deref(), Some(""));
    }

    #[test]
    fn mistyped_scalars_pass_through_as_text() {
        let partial = PartialInvoice::from_value(&json!({
            "invoiceNumber": 100298,
            "senderName": null,
            "billToName": ["x"],
            "dueDate": true
        }));
        assert_eq!(partial.invoice_number.as_deref(), Some("100298"));
        assert_eq!(partial.sender_name, None);
        assert_eq!(partial.bill_to_name, None);
        assert_eq!(partial.due_date.as_deref(), Some("true"));
    }

    #[test]
    fn items_decode_leniently() {
        let partial = PartialInvoice::from_value(&json!({
            "items": [
                { "description": "Design", "qty": 2, "unitPrice": "12.5", "id": "ignored" },
                "not an item",
                { "qty": "lots" }
            ]
        }));
        let items = partial.items.unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].description.as_deref(), Some("Design"));
        assert_eq!(items[0].qty, Some(2.0));
        assert_eq!(items[0].unit_price, Some(12.5));
        assert_eq!(items[1], PartialLineItem::default());
        assert_eq!(items[2].qty, None);
    }

    #[test]
    fn non_finite_numbers_are_absent() {
        let partial = PartialInvoice::from_value(&json!({
            "items": [{ "qty": "inf", "unitPrice": "1e999" }, { "qty": "-infinity" }]
        }));
        let items = partial.items.unwrap();
        assert_eq!(items[0].qty, None);
        assert_eq!(items[0].unit_price, None);
        assert_eq!(items[1].qty, None);
    }

    #[test]
    fn non_array_items_are_absent() {
        let partial = PartialInvoice::from_value(&json!({ "items": { "0": {} } }));
        assert_eq!(partial.items, None);
    }

    #[test]
    fn non_object_value_decodes_to_empty() {
        assert!(PartialInvoice::from_value(&json!([1, 2, 3])).is_empty());
        assert!(PartialInvoice::from_value(&Value::Null).is_empty());
    }

    #[test]
    fn text_wrapped_in_code_fence_is_accepted() {
        let partial = PartialInvoice::from_json_str("```json\n{\"billToName\": \"Zed\"}\n```").unwrap();
        assert_eq!(partial.bill_to_name.as_deref(), Some("Zed"));
    }

    #[test]
    fn blank_text_is_an_empty_partial() {
        assert!(PartialInvoice::from_json_str("  \n").unwrap().is_empty());
    }

    #[test]
    fn invalid_text_is_a_parse_failure() {
        let err = PartialInvoice::from_json_str("Sorry, I can't read that image.").unwrap_err();
        assert_eq!(err.kind(), FailureKind::Parse);

        let err = PartialInvoice::from_json_str("[1, 2]").unwrap_err();
        assert_eq!(err.kind(), FailureKind::Parse);
        assert!(err.to_string().contains("an array"));
    }
}
