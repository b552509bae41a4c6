use serde::Serialize;

use super::{Cents, serialize_cents};

/// Aggregate figures shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DashboardStats {
    pub total_invoices: i64,
    /// Sum of grand totals across all invoices.
    #[serde(serialize_with = "serialize_cents")]
    pub total_revenue: Cents,
    /// Sum of grand totals of pending invoices.
    #[serde(serialize_with = "serialize_cents")]
    pub pending_amount: Cents,
}
