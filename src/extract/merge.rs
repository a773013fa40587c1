use super::partial::{PartialInvoice, PartialLineItem};
use crate::model::{BankField, InvoiceDocument, LineItem, TopField, new_item_id};

/// Combine `current` with a decoded extraction reply into a new complete document.
///
/// * Top-level text fields: replaced when present in `partial`, empty or not.
/// * Bank details: same rule per key. The result keeps exactly the six keys.
/// * Items: a non-empty incoming list replaces the whole list with freshly
///   identified rows. An absent or empty list keeps the current items.
pub fn merge(current: &InvoiceDocument, partial: &PartialInvoice) -> InvoiceDocument {
    let mut next = current.clone();

    for field in TopField::ALL {
        if let Some(value) = partial.field(field) {
            *next.field_mut(field) = value.to_owned();
        }
    }

    if let Some(bank) = &partial.bank_details {
        for field in BankField::ALL {
            if let Some(value) = bank.get(field) {
                *field.get_mut(&mut next.bank_details) = value.to_owned();
            }
        }
    }

    match &partial.items {
        Some(items) if !items.is_empty() => {
            next.items = items.iter().map(normalize_item).collect();
        }
        _ => {}
    }

    next
}

// Falsy values fall back: empty description, zero or NaN quantity.
fn normalize_item(incoming: &PartialLineItem) -> LineItem {
    LineItem {
        id: new_item_id(),
        description: incoming
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_default(),
        qty: incoming.qty.filter(|q| is_truthy(*q)).unwrap_or(1.0),
        unit_price: incoming.unit_price.filter(|p| is_truthy(*p)).unwrap_or(0.0),
    }
}

fn is_truthy(n: f64) -> bool {
    n != 0.0 && n.is_finite()
}
