mod common;

use anyhow::Result;
use common::{TestStore, consulting_line, test_store, widget_line};
use invoicehub::application::AppError;

async fn assert_store_empty(store: &TestStore) -> Result<()> {
    for table in ["clients", "items", "invoices", "invoice_items"] {
        assert_eq!(
            store.count_rows(table).await?,
            0,
            "{} must be empty after rollback",
            table
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_line_item_failure_rolls_back_everything() -> Result<()> {
    let store = test_store().await?;
    store
        .execute(
            "CREATE TRIGGER fail_line_items BEFORE INSERT ON invoice_items \
             BEGIN SELECT RAISE(ABORT, 'simulated line item failure'); END",
        )
        .await?;

    let result = store
        .service
        .create_invoice("Acme", &[widget_line()])
        .await;
    assert!(matches!(result, Err(AppError::Store(_))));

    assert_store_empty(&store).await?;
    assert!(store.service.list_recent_invoices().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_failure_on_later_line_rolls_back_earlier_lines() -> Result<()> {
    let store = test_store().await?;
    store
        .execute(
            "CREATE TRIGGER fail_second_line BEFORE INSERT ON invoice_items \
             WHEN (SELECT COUNT(*) FROM invoice_items WHERE invoice_id = NEW.invoice_id) >= 1 \
             BEGIN SELECT RAISE(ABORT, 'simulated line item failure'); END",
        )
        .await?;

    let result = store
        .service
        .create_invoice("Acme", &[widget_line(), consulting_line()])
        .await;
    assert!(result.is_err());

    assert_store_empty(&store).await?;

    Ok(())
}

#[tokio::test]
async fn test_store_usable_after_rollback() -> Result<()> {
    let store = test_store().await?;
    let service = &store.service;

    store
        .execute(
            "CREATE TRIGGER fail_line_items BEFORE INSERT ON invoice_items \
             BEGIN SELECT RAISE(ABORT, 'simulated line item failure'); END",
        )
        .await?;
    assert!(service.create_invoice("Acme", &[widget_line()]).await.is_err());

    store.execute("DROP TRIGGER fail_line_items").await?;

    let summary = service.create_invoice("Acme", &[widget_line()]).await?;
    assert_eq!(summary.invoice_number, "INV-0001", "Failed attempt consumed no number");
    assert_eq!(store.count_rows("invoice_items").await?, 1);
    assert_eq!(service.dashboard_stats().await?.total_invoices, 1);

    Ok(())
}

#[tokio::test]
async fn test_committed_client_survives_later_failure() -> Result<()> {
    let store = test_store().await?;
    let service = &store.service;

    let client_id = service.get_or_create_client("Acme").await?;
    store
        .execute(
            "CREATE TRIGGER fail_line_items BEFORE INSERT ON invoice_items \
             BEGIN SELECT RAISE(ABORT, 'simulated line item failure'); END",
        )
        .await?;
    assert!(service.create_invoice("acme", &[widget_line()]).await.is_err());

    let client = service.get_client("ACME").await?.expect("client committed earlier");
    assert_eq!(client.id, client_id);
    assert_eq!(store.count_rows("invoices").await?, 0);
    assert_eq!(store.count_rows("items").await?, 0);

    Ok(())
}
