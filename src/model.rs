use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    pub description: String,
    pub qty: f64,
    pub unit_price: f64,
}

impl LineItem {
    /// Fresh row as produced by "Add Item": empty description, one unit, zero price.
    pub fn blank() -> Self {
        LineItem {
            id: new_item_id(),
            description: String::new(),
            qty: 1.0,
            unit_price: 0.0,
        }
    }

    pub fn amount(&self) -> f64 {
        self.qty * self.unit_price
    }
}

/// Item ids are random v4 UUIDs, so rows created in the same instant
/// (an extraction batch, rapid clicks) never collide.
pub fn new_item_id() -> String {
    format!("item-{}", Uuid::new_v4().simple())
}

// Closed set: unknown keys in a loaded document are rejected.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BankDetails {
    pub beneficiary_name: String,
    pub account_number: String,
    pub swift_number: String,
    pub beneficiary_address: String,
    pub bank_name: String,
    pub bank_address: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDocument {
    pub sender_name: String,
    pub sender_address: String,
    pub bill_to_name: String,
    pub bill_to_address: String,
    pub invoice_number: String,
    pub due_date: String,
    pub bank_details: BankDetails,
    pub items: Vec<LineItem>,
}

impl InvoiceDocument {
    pub fn total(&self) -> f64 {
        total(&self.items)
    }

    pub fn field(&self, field: TopField) -> &str {
        match field {
            TopField::SenderName => &self.sender_name,
            TopField::SenderAddress => &self.sender_address,
            TopField::BillToName => &self.bill_to_name,
            TopField::BillToAddress => &self.bill_to_address,
            TopField::InvoiceNumber => &self.invoice_number,
            TopField::DueDate => &self.due_date,
        }
    }

    pub fn field_mut(&mut self, field: TopField) -> &mut String {
        match field {
            TopField::SenderName => &mut self.sender_name,
            TopField::SenderAddress => &mut self.sender_address,
            TopField::BillToName => &mut self.bill_to_name,
            TopField::BillToAddress => &mut self.bill_to_address,
            TopField::InvoiceNumber => &mut self.invoice_number,
            TopField::DueDate => &mut self.due_date,
        }
    }

    pub fn item(&self, id: &str) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }
}

impl Default for InvoiceDocument {
    fn default() -> Self {
        InvoiceDocument {
            sender_name: "MD Gulam Mostafa".into(),
            sender_address: "59/C, 4th Floor\nNorth Dhanmondi Road\nKalabagan, Dhaka 1205".into(),
            bill_to_name: "DTT360 Media LLC".into(),
            bill_to_address: "30 N Gould St Ste R\nSheridan, WY\n82801-6317, US".into(),
            invoice_number: "100298".into(),
            due_date: "25 Sep 2025".into(),
            bank_details: BankDetails {
                beneficiary_name: "Md Gulam Mostafa".into(),
                account_number: "2053339520001".into(),
                swift_number: "BRAKBDDH".into(),
                beneficiary_address:
                    "59/C, 4th Floor, North Dhanmondi Road, Kalabagan, Dhaka 1205".into(),
                bank_name: "BRAC Bank PLC".into(),
                bank_address: "107 Motijheel C/A, Dhaka 1000".into(),
            },
            items: vec![LineItem {
                id: "item-default-1".into(),
                description: "Advertising Bill for June 2025".into(),
                qty: 1.0,
                unit_price: 60000.0,
            }],
        }
    }
}

/// Sum of qty x unit price in document order. Never stored.
pub fn total(items: &[LineItem]) -> f64 {
    // fold from +0.0: `Sum` for floats starts at -0.0, which would print as "-0.00"
    items.iter().fold(0.0, |acc, item| acc + item.amount())
}

/// Scalar, free-text fields at the top level of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopField {
    SenderName,
    SenderAddress,
    BillToName,
    BillToAddress,
    InvoiceNumber,
    DueDate,
}

impl TopField {
    pub const ALL: [TopField; 6] = [
        TopField::SenderName,
        TopField::SenderAddress,
        TopField::BillToName,
        TopField::BillToAddress,
        TopField::InvoiceNumber,
        TopField::DueDate,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TopField::SenderName => "senderName",
            TopField::SenderAddress => "senderAddress",
            TopField::BillToName => "billToName",
            TopField::BillToAddress => "billToAddress",
            TopField::InvoiceNumber => "invoiceNumber",
            TopField::DueDate => "dueDate",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TopField::SenderName => "Sender Name",
            TopField::SenderAddress => "Sender Address",
            TopField::BillToName => "Bill To Name",
            TopField::BillToAddress => "Bill To Address",
            TopField::InvoiceNumber => "Invoice Number",
            TopField::DueDate => "Due Date",
        }
    }

    pub fn is_multiline(self) -> bool {
        matches!(self, TopField::SenderAddress | TopField::BillToAddress)
    }

    pub fn from_key(key: &str) -> Option<TopField> {
        TopField::ALL.into_iter().find(|f| f.key() == key)
    }
}

/// The six bank detail keys, in display order. Used instead of iterating
/// struct keys at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BankField {
    BeneficiaryName,
    AccountNumber,
    SwiftNumber,
    BeneficiaryAddress,
    BankName,
    BankAddress,
}

impl BankField {
    pub const ALL: [BankField; 6] = [
        BankField::BeneficiaryName,
        BankField::AccountNumber,
        BankField::SwiftNumber,
        BankField::BeneficiaryAddress,
        BankField::BankName,
        BankField::BankAddress,
    ];

    pub fn key(self) -> &'static str {
        match self {
            BankField::BeneficiaryName => "beneficiaryName",
            BankField::AccountNumber => "accountNumber",
            BankField::SwiftNumber => "swiftNumber",
            BankField::BeneficiaryAddress => "beneficiaryAddress",
            BankField::BankName => "bankName",
            BankField::BankAddress => "bankAddress",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BankField::BeneficiaryName => "Beneficiary Name",
            BankField::AccountNumber => "Account Number",
            BankField::SwiftNumber => "SWIFT Number",
            BankField::BeneficiaryAddress => "Beneficiary Address",
            BankField::BankName => "Bank Name",
            BankField::BankAddress => "Bank Address",
        }
    }

    pub fn from_key(key: &str) -> Option<BankField> {
        BankField::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn get(self, bank: &BankDetails) -> &str {
        match self {
            BankField::BeneficiaryName => &bank.beneficiary_name,
            BankField::AccountNumber => &bank.account_number,
            BankField::SwiftNumber => &bank.swift_number,
            BankField::BeneficiaryAddress => &bank.beneficiary_address,
            BankField::BankName => &bank.bank_name,
            BankField::BankAddress => &bank.bank_address,
        }
    }

    pub fn get_mut(self, bank: &mut BankDetails) -> &mut String {
        match self {
            BankField::BeneficiaryName => &mut bank.beneficiary_name,
            BankField::AccountNumber => &mut bank.account_number,
            BankField::SwiftNumber => &mut bank.swift_number,
            BankField::BeneficiaryAddress => &mut bank.beneficiary_address,
            BankField::BankName => &mut bank.bank_name,
            BankField::BankAddress => &mut bank.bank_address,
        }
    }
}
