use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Cents, ClientId, ItemId, serialize_cents};

pub type InvoiceId = i64;

/// Prefix of every human-readable invoice number.
pub const INVOICE_NUMBER_PREFIX: &str = "INV-";

/// Maximum number of rows returned by the recent-invoices listing.
pub const RECENT_INVOICES_LIMIT: i64 = 10;

/// Format a sequence value as an invoice number, zero-padded to 4 digits.
/// Example: 1 -> "INV-0001", 10001 -> "INV-10001"
pub fn format_invoice_number(sequence: i64) -> String {
    format!("{}{:04}", INVOICE_NUMBER_PREFIX, sequence)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(InvoiceStatus::Pending),
            "paid" => Some(InvoiceStatus::Paid),
            _ => None,
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of an invoice as supplied by the caller.
///
/// `item_total` and `gst_amount` are taken as given; the store never derives
/// them from quantity and price. Use [`LineItemInput::compute`] to fill them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemInput {
    pub name: String,
    pub gst_percentage: f64,
    pub quantity: f64,
    pub unit_price: Cents,
    pub item_total: Cents,
    pub gst_amount: Cents,
}

impl LineItemInput {
    /// Build a line item, deriving the line total and GST amount rounded to the cent.
    pub fn compute(
        name: impl Into<String>,
        gst_percentage: f64,
        quantity: f64,
        unit_price: Cents,
    ) -> Self {
        let item_total = (quantity * unit_price as f64).round() as Cents;
        let gst_amount = (item_total as f64 * gst_percentage / 100.0).round() as Cents;
        Self {
            name: name.into(),
            gst_percentage,
            quantity,
            unit_price,
            item_total,
            gst_amount,
        }
    }
}

/// Derived totals of an invoice. `grand_total` is always `subtotal + total_gst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InvoiceTotals {
    pub subtotal: Cents,
    pub total_gst: Cents,
    pub grand_total: Cents,
}

impl InvoiceTotals {
    pub fn from_line_items(line_items: &[LineItemInput]) -> Self {
        let subtotal: Cents = line_items.iter().map(|line| line.item_total).sum();
        let total_gst: Cents = line_items.iter().map(|line| line.gst_amount).sum();
        Self {
            subtotal,
            total_gst,
            grand_total: subtotal + total_gst,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub client_id: ClientId,
    pub invoice_date: NaiveDate,
    #[serde(serialize_with = "serialize_cents")]
    pub subtotal: Cents,
    #[serde(serialize_with = "serialize_cents")]
    pub total_gst: Cents,
    #[serde(serialize_with = "serialize_cents")]
    pub grand_total: Cents,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

/// An invoice joined with its client's name, as listed on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceOverview {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub client_name: String,
}

/// A persisted line item joined with its item.
///
/// `gst_percentage` and `item_total` are the snapshot taken when the invoice
/// was created; `item_gst_percentage` is the item's own rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceLine {
    pub id: i64,
    pub invoice_id: InvoiceId,
    pub item_id: ItemId,
    pub item_name: String,
    pub quantity: f64,
    #[serde(serialize_with = "serialize_cents")]
    pub unit_price: Cents,
    pub gst_percentage: f64,
    #[serde(serialize_with = "serialize_cents")]
    pub item_total: Cents,
    pub item_gst_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub client_name: String,
    pub items: Vec<InvoiceLine>,
}

/// Result of creating an invoice. Money fields serialize as floating point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceSummary {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub client_id: ClientId,
    #[serde(serialize_with = "serialize_cents")]
    pub subtotal: Cents,
    #[serde(serialize_with = "serialize_cents")]
    pub total_gst: Cents,
    #[serde(serialize_with = "serialize_cents")]
    pub grand_total: Cents,
}
