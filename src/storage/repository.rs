use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::domain::{
    Client, ClientId, DashboardStats, Invoice, InvoiceDetail, InvoiceId, InvoiceLine,
    InvoiceOverview, InvoiceStatus, InvoiceSummary, InvoiceTotals, IntegrityStats, Item, ItemId,
    LineItemInput, RECENT_INVOICES_LIMIT, format_invoice_number,
};

use super::{MIGRATION_001_INITIAL, StoreConfig};

const INVOICE_COLUMNS: &str = "i.id, i.invoice_number, i.client_id, i.invoice_date, \
     i.subtotal_cents, i.total_gst_cents, i.grand_total_cents, i.status, i.created_at";

/// Tables whose rows are looked up by case-insensitive name.
#[derive(Debug, Clone, Copy)]
enum NamedTable {
    Clients,
    Items,
}

impl NamedTable {
    fn as_str(&self) -> &'static str {
        match self {
            NamedTable::Clients => "clients",
            NamedTable::Items => "items",
        }
    }
}

/// Persistence for clients, items and invoices.
///
/// Every public operation borrows one pooled connection for its duration.
/// Multi-statement operations run inside a single transaction; a transaction
/// dropped without commit is rolled back when its connection is released.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a connection pool for the configured database.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(config.connect_options())
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to database {}",
                    config.database_path.display()
                )
            })?;
        Ok(Self::new(pool))
    }

    /// Create the schema if it does not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(config: &StoreConfig) -> Result<Self> {
        let repo = Self::connect(config).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========================
    // Client and item operations
    // ========================

    /// Return the id of the client with this name (ignoring case), creating it if absent.
    pub async fn get_or_create_client(&self, name: &str) -> Result<ClientId> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        let id = resolve_client(&mut tx, name).await?;
        tx.commit().await.context("Failed to commit client")?;
        Ok(id)
    }

    /// Return the id of the item with this name (ignoring case), creating it if absent.
    /// The GST percentage is only used when the item is created.
    pub async fn get_or_create_item(&self, name: &str, gst_percentage: f64) -> Result<ItemId> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        let id = resolve_item(&mut tx, name, gst_percentage).await?;
        tx.commit().await.context("Failed to commit item")?;
        Ok(id)
    }

    /// Get a client by name, ignoring case.
    pub async fn get_client_by_name(&self, name: &str) -> Result<Option<Client>> {
        let row = sqlx::query(
            "SELECT id, name, created_at FROM clients WHERE name_key = ?",
        )
        .bind(name_key(name))
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch client by name")?;

        row.as_ref().map(Self::row_to_client).transpose()
    }

    /// Get an item by name, ignoring case.
    pub async fn get_item_by_name(&self, name: &str) -> Result<Option<Item>> {
        let row = sqlx::query(
            "SELECT id, name, gst_percentage, created_at FROM items WHERE name_key = ?",
        )
        .bind(name_key(name))
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch item by name")?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    /// List all clients, alphabetically.
    pub async fn list_clients(&self) -> Result<Vec<Client>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM clients ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list clients")?;

        rows.iter().map(Self::row_to_client).collect()
    }

    /// List all items, alphabetically.
    pub async fn list_items(&self) -> Result<Vec<Item>> {
        let rows = sqlx::query("SELECT id, name, gst_percentage, created_at FROM items ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list items")?;

        rows.iter().map(Self::row_to_item).collect()
    }

    // ========================
    // Invoice operations
    // ========================

    /// Create an invoice with its line items in one transaction.
    ///
    /// The client and every referenced item are resolved or created inside
    /// the same transaction, so a failure at any step leaves nothing behind.
    pub async fn create_invoice(
        &self,
        client_name: &str,
        line_items: &[LineItemInput],
        invoice_date: NaiveDate,
    ) -> Result<InvoiceSummary> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin invoice transaction")?;

        match insert_invoice(&mut tx, client_name, line_items, invoice_date).await {
            Ok(summary) => {
                tx.commit().await.context("Failed to commit invoice")?;
                debug!(
                    id = summary.id,
                    invoice_number = %summary.invoice_number,
                    client_id = summary.client_id,
                    lines = line_items.len(),
                    "Created invoice"
                );
                Ok(summary)
            }
            Err(err) => {
                warn!(client = %client_name, error = %err, "Rolling back invoice");
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Invoice rollback failed");
                }
                Err(err)
            }
        }
    }

    /// The 10 most recently created invoices, newest first.
    pub async fn list_recent_invoices(&self) -> Result<Vec<InvoiceOverview>> {
        let query = format!(
            "SELECT {}, c.name AS client_name \
             FROM invoices i JOIN clients c ON i.client_id = c.id \
             ORDER BY i.created_at DESC, i.id DESC LIMIT ?",
            INVOICE_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(RECENT_INVOICES_LIMIT)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list recent invoices")?;

        rows.iter()
            .map(|row| {
                Ok(InvoiceOverview {
                    invoice: Self::row_to_invoice(row)?,
                    client_name: row.get("client_name"),
                })
            })
            .collect()
    }

    /// Get an invoice with its client name and line items.
    pub async fn get_invoice(&self, id: InvoiceId) -> Result<Option<InvoiceDetail>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let query = format!(
            "SELECT {}, c.name AS client_name \
             FROM invoices i JOIN clients c ON i.client_id = c.id \
             WHERE i.id = ?",
            INVOICE_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to fetch invoice")?;

        let Some(row) = row else {
            tx.commit().await.context("Failed to finish invoice read")?;
            return Ok(None);
        };

        let invoice = Self::row_to_invoice(&row)?;
        let client_name: String = row.get("client_name");

        let line_rows = sqlx::query(
            r#"
            SELECT ii.id, ii.invoice_id, ii.item_id, it.name AS item_name, ii.quantity,
                   ii.unit_price_cents, ii.gst_percentage, ii.item_total_cents,
                   it.gst_percentage AS item_gst_percentage
            FROM invoice_items ii
            JOIN items it ON ii.item_id = it.id
            WHERE ii.invoice_id = ?
            ORDER BY ii.id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to fetch invoice items")?;

        tx.commit().await.context("Failed to finish invoice read")?;

        Ok(Some(InvoiceDetail {
            invoice,
            client_name,
            items: line_rows.iter().map(Self::row_to_line).collect(),
        }))
    }

    /// Invoice count, total revenue and pending amount.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_invoices,
                COALESCE(SUM(grand_total_cents), 0) AS total_revenue,
                COALESCE(SUM(CASE WHEN status = 'pending' THEN grand_total_cents ELSE 0 END), 0) AS pending_amount
            FROM invoices
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute dashboard stats")?;

        Ok(DashboardStats {
            total_invoices: row.get("total_invoices"),
            total_revenue: row.get("total_revenue"),
            pending_amount: row.get("pending_amount"),
        })
    }

    /// Gather counts and inconsistent invoices for integrity checking.
    pub async fn get_integrity_stats(&self) -> Result<IntegrityStats> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let counts = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM clients) AS client_count,
                (SELECT COUNT(*) FROM items) AS item_count,
                (SELECT COUNT(*) FROM invoices) AS invoice_count,
                (SELECT COUNT(*) FROM invoice_items) AS line_item_count
            "#,
        )
        .fetch_one(&mut *tx)
        .await
        .context("Failed to count rows")?;

        let unbalanced_invoices = invoice_numbers(
            &mut tx,
            r#"
            SELECT invoice_number FROM invoices
            WHERE grand_total_cents != subtotal_cents + total_gst_cents
            ORDER BY id
            "#,
        )
        .await
        .context("Failed to check invoice totals")?;

        let subtotal_mismatches = invoice_numbers(
            &mut tx,
            r#"
            SELECT i.invoice_number FROM invoices i
            JOIN invoice_items ii ON ii.invoice_id = i.id
            GROUP BY i.id
            HAVING i.subtotal_cents != SUM(ii.item_total_cents)
            ORDER BY i.id
            "#,
        )
        .await
        .context("Failed to check invoice subtotals")?;

        let empty_invoices = invoice_numbers(
            &mut tx,
            r#"
            SELECT invoice_number FROM invoices i
            WHERE NOT EXISTS (SELECT 1 FROM invoice_items ii WHERE ii.invoice_id = i.id)
            ORDER BY id
            "#,
        )
        .await
        .context("Failed to check empty invoices")?;

        tx.commit().await.context("Failed to finish integrity read")?;

        Ok(IntegrityStats {
            client_count: counts.get("client_count"),
            item_count: counts.get("item_count"),
            invoice_count: counts.get("invoice_count"),
            line_item_count: counts.get("line_item_count"),
            unbalanced_invoices,
            subtotal_mismatches,
            empty_invoices,
        })
    }

    fn row_to_client(row: &SqliteRow) -> Result<Client> {
        let created_at_str: String = row.get("created_at");
        Ok(Client {
            id: row.get("id"),
            name: row.get("name"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    fn row_to_item(row: &SqliteRow) -> Result<Item> {
        let created_at_str: String = row.get("created_at");
        Ok(Item {
            id: row.get("id"),
            name: row.get("name"),
            gst_percentage: row.get("gst_percentage"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    fn row_to_invoice(row: &SqliteRow) -> Result<Invoice> {
        let invoice_date_str: String = row.get("invoice_date");
        let status_str: String = row.get("status");
        let created_at_str: String = row.get("created_at");

        Ok(Invoice {
            id: row.get("id"),
            invoice_number: row.get("invoice_number"),
            client_id: row.get("client_id"),
            invoice_date: NaiveDate::parse_from_str(&invoice_date_str, "%Y-%m-%d")
                .context("Invalid invoice_date")?,
            subtotal: row.get("subtotal_cents"),
            total_gst: row.get("total_gst_cents"),
            grand_total: row.get("grand_total_cents"),
            status: InvoiceStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid invoice status: {}", status_str))?,
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    fn row_to_line(row: &SqliteRow) -> InvoiceLine {
        InvoiceLine {
            id: row.get("id"),
            invoice_id: row.get("invoice_id"),
            item_id: row.get("item_id"),
            item_name: row.get("item_name"),
            quantity: row.get("quantity"),
            unit_price: row.get("unit_price_cents"),
            gst_percentage: row.get("gst_percentage"),
            item_total: row.get("item_total_cents"),
            item_gst_percentage: row.get("item_gst_percentage"),
        }
    }
}

/// Body of invoice creation; runs on a connection already inside a transaction.
async fn insert_invoice(
    conn: &mut SqliteConnection,
    client_name: &str,
    line_items: &[LineItemInput],
    invoice_date: NaiveDate,
) -> Result<InvoiceSummary> {
    let client_id = resolve_client(conn, client_name).await?;

    // Count-based numbering: two concurrent writers can compute the same
    // number, in which case the UNIQUE constraint fails the later one.
    let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM invoices")
        .fetch_one(&mut *conn)
        .await
        .context("Failed to count invoices")?
        .get("count");
    let invoice_number = format_invoice_number(count + 1);

    let totals = InvoiceTotals::from_line_items(line_items);

    let invoice_id = sqlx::query(
        r#"
        INSERT INTO invoices (invoice_number, client_id, invoice_date, subtotal_cents, total_gst_cents, grand_total_cents, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&invoice_number)
    .bind(client_id)
    .bind(invoice_date.format("%Y-%m-%d").to_string())
    .bind(totals.subtotal)
    .bind(totals.total_gst)
    .bind(totals.grand_total)
    .bind(now_timestamp())
    .execute(&mut *conn)
    .await
    .context("Failed to save invoice")?
    .last_insert_rowid();

    for line in line_items {
        let item_id = resolve_item(conn, &line.name, line.gst_percentage).await?;

        sqlx::query(
            r#"
            INSERT INTO invoice_items (invoice_id, item_id, quantity, unit_price_cents, gst_percentage, item_total_cents)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(invoice_id)
        .bind(item_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.gst_percentage)
        .bind(line.item_total)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to save line item '{}'", line.name))?;
    }

    Ok(InvoiceSummary {
        id: invoice_id,
        invoice_number,
        client_id,
        subtotal: totals.subtotal,
        total_gst: totals.total_gst,
        grand_total: totals.grand_total,
    })
}

/// Lookup-or-create for clients, shared by the standalone operation and invoice creation.
async fn resolve_client(conn: &mut SqliteConnection, name: &str) -> Result<ClientId> {
    if let Some(id) = find_id_by_name(conn, NamedTable::Clients, name).await? {
        return Ok(id);
    }

    debug!(name = %name, "Creating client");
    let id = sqlx::query("INSERT INTO clients (name, name_key, created_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(name_key(name))
        .bind(now_timestamp())
        .execute(&mut *conn)
        .await
        .context("Failed to save client")?
        .last_insert_rowid();
    Ok(id)
}

/// Lookup-or-create for items. An existing item keeps its GST rate.
async fn resolve_item(
    conn: &mut SqliteConnection,
    name: &str,
    gst_percentage: f64,
) -> Result<ItemId> {
    if let Some(id) = find_id_by_name(conn, NamedTable::Items, name).await? {
        return Ok(id);
    }

    debug!(name = %name, gst_percentage, "Creating item");
    let id = sqlx::query(
        "INSERT INTO items (name, name_key, gst_percentage, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(name)
    .bind(name_key(name))
    .bind(gst_percentage)
    .bind(now_timestamp())
    .execute(&mut *conn)
    .await
    .context("Failed to save item")?
    .last_insert_rowid();
    Ok(id)
}

async fn find_id_by_name(
    conn: &mut SqliteConnection,
    table: NamedTable,
    name: &str,
) -> Result<Option<i64>> {
    let query = format!("SELECT id FROM {} WHERE name_key = ?", table.as_str());
    let row = sqlx::query(&query)
        .bind(name_key(name))
        .fetch_optional(&mut *conn)
        .await
        .with_context(|| format!("Failed to look up {} by name", table.as_str()))?;

    Ok(row.map(|row| row.get("id")))
}

async fn invoice_numbers(conn: &mut SqliteConnection, query: &str) -> Result<Vec<String>> {
    let rows = sqlx::query(query).fetch_all(&mut *conn).await?;
    Ok(rows.iter().map(|row| row.get("invoice_number")).collect())
}

/// Case-folded form of a name, used as its unique lookup key.
/// SQLite's LOWER() and NOCASE only fold ASCII, so folding happens here.
fn name_key(name: &str) -> String {
    name.to_lowercase()
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .context("Invalid created_at timestamp")?
        .with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_key_folds_unicode() {
        assert_eq!(name_key("ACME"), "acme");
        assert_eq!(name_key("ÉMILE"), "émile");
        assert_eq!(name_key("Émile"), name_key("émile"));
    }
}
