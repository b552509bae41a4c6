// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::path::PathBuf;

use anyhow::Result;
use invoicehub::StoreConfig;
use invoicehub::application::InvoiceService;
use invoicehub::domain::LineItemInput;
use sqlx::{Row, SqlitePool};
use tempfile::TempDir;

/// A service over a fresh temporary database.
pub struct TestStore {
    pub service: InvoiceService,
    pub db_path: PathBuf,
    _temp_dir: TempDir,
}

impl TestStore {
    /// Open a second, independent pool on the same database file.
    /// Used to tamper with rows or install triggers behind the service's back.
    pub async fn raw_pool(&self) -> Result<SqlitePool> {
        let url = format!("sqlite:{}", self.db_path.display());
        Ok(SqlitePool::connect(&url).await?)
    }

    /// Count rows in a table through a separate connection.
    pub async fn count_rows(&self, table: &str) -> Result<i64> {
        let pool = self.raw_pool().await?;
        let row = sqlx::query(&format!("SELECT COUNT(*) AS count FROM {}", table))
            .fetch_one(&pool)
            .await?;
        pool.close().await;
        Ok(row.get("count"))
    }

    /// Run a statement through a separate connection.
    pub async fn execute(&self, sql: &str) -> Result<()> {
        let pool = self.raw_pool().await?;
        sqlx::query(sql).execute(&pool).await?;
        pool.close().await;
        Ok(())
    }
}

/// Helper to create a test service with a temporary database
pub async fn test_store() -> Result<TestStore> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = InvoiceService::init(&StoreConfig::new(&db_path)).await?;
    Ok(TestStore {
        service,
        db_path,
        _temp_dir: temp_dir,
    })
}

/// 2 x 10.00 at 18% GST: total 20.00, GST 3.60
pub fn widget_line() -> LineItemInput {
    LineItemInput {
        name: "Widget".into(),
        gst_percentage: 18.0,
        quantity: 2.0,
        unit_price: 1000,
        item_total: 2000,
        gst_amount: 360,
    }
}

/// 1 x 50.00 at 12% GST: total 50.00, GST 6.00
pub fn consulting_line() -> LineItemInput {
    LineItemInput::compute("Consulting", 12.0, 1.0, 5000)
}
