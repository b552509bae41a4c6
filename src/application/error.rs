use thiserror::Error;

use crate::domain::InvoiceId;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    #[error("Invalid line item '{0}': expected NAME:QTY:PRICE:GST")]
    InvalidLineItem(String),

    #[error("Store operation failed: {0}")]
    Store(#[from] anyhow::Error),
}
