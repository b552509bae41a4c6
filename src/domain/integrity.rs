use serde::Serialize;

/// Raw counts and offending invoice numbers gathered from the store.
#[derive(Debug, Clone, Default)]
pub struct IntegrityStats {
    pub client_count: i64,
    pub item_count: i64,
    pub invoice_count: i64,
    pub line_item_count: i64,
    /// Invoices where `grand_total != subtotal + total_gst`.
    pub unbalanced_invoices: Vec<String>,
    /// Invoices whose subtotal differs from the sum of their line totals.
    pub subtotal_mismatches: Vec<String>,
    /// Invoices with no line items.
    pub empty_invoices: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub client_count: i64,
    pub item_count: i64,
    pub invoice_count: i64,
    pub line_item_count: i64,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn build_integrity_report(stats: IntegrityStats) -> IntegrityReport {
    let mut issues = Vec::new();

    for number in &stats.unbalanced_invoices {
        issues.push(format!(
            "Invoice {} grand total does not equal subtotal plus GST",
            number
        ));
    }
    for number in &stats.subtotal_mismatches {
        issues.push(format!(
            "Invoice {} subtotal does not match the sum of its line items",
            number
        ));
    }
    for number in &stats.empty_invoices {
        issues.push(format!("Invoice {} has no line items", number));
    }

    IntegrityReport {
        client_count: stats.client_count,
        item_count: stats.item_count,
        invoice_count: stats.invoice_count,
        line_item_count: stats.line_item_count,
        issues,
    }
}
