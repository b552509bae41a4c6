use chrono::{Local, NaiveDate};

use crate::domain::{
    Client, ClientId, DashboardStats, IntegrityReport, InvoiceDetail, InvoiceId, InvoiceOverview,
    InvoiceSummary, Item, ItemId, LineItemInput, build_integrity_report,
};
use crate::storage::{Repository, StoreConfig};

use super::AppError;

/// Application service over the invoice store.
/// This is the primary interface for any client (CLI, API, etc.).
pub struct InvoiceService {
    repo: Repository,
}

impl InvoiceService {
    /// Create a new invoice service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create the database if needed and apply the schema.
    pub async fn init(config: &StoreConfig) -> Result<Self, AppError> {
        let config = config.clone().create_if_missing(true);
        let repo = Repository::init(&config).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(config: &StoreConfig) -> Result<Self, AppError> {
        let repo = Repository::connect(config).await?;
        Ok(Self::new(repo))
    }

    pub async fn close(&self) {
        self.repo.close().await;
    }

    // ========================
    // Clients and items
    // ========================

    pub async fn get_or_create_client(&self, name: &str) -> Result<ClientId, AppError> {
        Ok(self.repo.get_or_create_client(name).await?)
    }

    pub async fn get_or_create_item(
        &self,
        name: &str,
        gst_percentage: f64,
    ) -> Result<ItemId, AppError> {
        Ok(self.repo.get_or_create_item(name, gst_percentage).await?)
    }

    pub async fn get_client(&self, name: &str) -> Result<Option<Client>, AppError> {
        Ok(self.repo.get_client_by_name(name).await?)
    }

    pub async fn get_item(&self, name: &str) -> Result<Option<Item>, AppError> {
        Ok(self.repo.get_item_by_name(name).await?)
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        Ok(self.repo.list_clients().await?)
    }

    pub async fn list_items(&self) -> Result<Vec<Item>, AppError> {
        Ok(self.repo.list_items().await?)
    }

    // ========================
    // Invoices
    // ========================

    /// Create an invoice dated today.
    pub async fn create_invoice(
        &self,
        client_name: &str,
        line_items: &[LineItemInput],
    ) -> Result<InvoiceSummary, AppError> {
        self.create_invoice_on(client_name, line_items, Local::now().date_naive())
            .await
    }

    /// Create an invoice with an explicit invoice date.
    pub async fn create_invoice_on(
        &self,
        client_name: &str,
        line_items: &[LineItemInput],
        invoice_date: NaiveDate,
    ) -> Result<InvoiceSummary, AppError> {
        Ok(self
            .repo
            .create_invoice(client_name, line_items, invoice_date)
            .await?)
    }

    pub async fn list_recent_invoices(&self) -> Result<Vec<InvoiceOverview>, AppError> {
        Ok(self.repo.list_recent_invoices().await?)
    }

    /// Get an invoice by id; `None` when it does not exist.
    pub async fn get_invoice(&self, id: InvoiceId) -> Result<Option<InvoiceDetail>, AppError> {
        Ok(self.repo.get_invoice(id).await?)
    }

    /// Like [`get_invoice`](Self::get_invoice), but a missing invoice is an error.
    pub async fn require_invoice(&self, id: InvoiceId) -> Result<InvoiceDetail, AppError> {
        self.get_invoice(id)
            .await?
            .ok_or(AppError::InvoiceNotFound(id))
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, AppError> {
        Ok(self.repo.dashboard_stats().await?)
    }

    // ========================
    // Integrity operations
    // ========================

    /// Check invoice totals against their line items.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let stats = self.repo.get_integrity_stats().await?;
        Ok(build_integrity_report(stats))
    }
}
