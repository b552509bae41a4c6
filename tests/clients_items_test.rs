mod common;

use anyhow::Result;
use common::test_store;

#[tokio::test]
async fn test_client_lookup_ignores_case() -> Result<()> {
    let store = test_store().await?;
    let service = &store.service;

    let id = service.get_or_create_client("Acme").await?;
    assert_eq!(service.get_or_create_client("ACME").await?, id);
    assert_eq!(service.get_or_create_client("acme").await?, id);
    assert_eq!(service.get_or_create_client("Acme").await?, id);

    let clients = service.list_clients().await?;
    assert_eq!(clients.len(), 1, "Case variants must not create duplicates");
    assert_eq!(clients[0].name, "Acme", "First spelling is kept");

    Ok(())
}

#[tokio::test]
async fn test_client_lookup_folds_non_ascii_case() -> Result<()> {
    let store = test_store().await?;
    let service = &store.service;

    let id = service.get_or_create_client("Émile").await?;
    assert_eq!(service.get_or_create_client("ÉMILE").await?, id);
    assert_eq!(service.get_or_create_client("émile").await?, id);

    let clients = service.list_clients().await?;
    assert_eq!(clients.len(), 1, "Accented case variants must not create duplicates");
    assert_eq!(clients[0].name, "Émile");

    let found = service.get_client("éMILE").await?.expect("client exists");
    assert_eq!(found.id, id);

    Ok(())
}

#[tokio::test]
async fn test_item_lookup_folds_non_ascii_case() -> Result<()> {
    let store = test_store().await?;
    let service = &store.service;

    let id = service.get_or_create_item("Çay", 5.0).await?;
    assert_eq!(service.get_or_create_item("ÇAY", 18.0).await?, id);
    assert_eq!(service.list_items().await?.len(), 1);

    let item = service.get_item("çay").await?.expect("item exists");
    assert_eq!(item.id, id);
    assert_eq!(item.gst_percentage, 5.0);

    Ok(())
}

#[tokio::test]
async fn test_distinct_clients_get_distinct_ids() -> Result<()> {
    let store = test_store().await?;
    let service = &store.service;

    let acme = service.get_or_create_client("Acme").await?;
    let globex = service.get_or_create_client("Globex").await?;
    assert_ne!(acme, globex);

    Ok(())
}

#[tokio::test]
async fn test_item_keeps_first_gst_rate() -> Result<()> {
    let store = test_store().await?;
    let service = &store.service;

    let id = service.get_or_create_item("Widget", 18.0).await?;
    let again = service.get_or_create_item("WIDGET", 5.0).await?;
    assert_eq!(id, again);

    let item = service.get_item("widget").await?.expect("item exists");
    assert_eq!(item.name, "Widget");
    assert_eq!(item.gst_percentage, 18.0);

    Ok(())
}

#[tokio::test]
async fn test_lookup_of_unknown_names_is_absent() -> Result<()> {
    let store = test_store().await?;
    let service = &store.service;

    assert!(service.get_client("Nobody").await?.is_none());
    assert!(service.get_item("Nothing").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_lists_are_alphabetical() -> Result<()> {
    let store = test_store().await?;
    let service = &store.service;

    for name in ["Zeta", "alpha", "Mid"] {
        service.get_or_create_client(name).await?;
    }
    for (name, gst) in [("Widget", 18.0), ("Bolt", 5.0), ("nut", 12.0)] {
        service.get_or_create_item(name, gst).await?;
    }

    let clients: Vec<String> = service
        .list_clients()
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(clients, vec!["alpha", "Mid", "Zeta"]);

    let items: Vec<String> = service
        .list_items()
        .await?
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(items, vec!["Bolt", "nut", "Widget"]);

    Ok(())
}

#[tokio::test]
async fn test_store_rejects_case_duplicates() -> Result<()> {
    let store = test_store().await?;
    store.service.get_or_create_client("Acme").await?;

    let result = store
        .execute(
            "INSERT INTO clients (name, name_key, created_at) \
             VALUES ('ACME', 'acme', '2025-01-01T00:00:00Z')",
        )
        .await;
    assert!(result.is_err(), "Unique name key must reject case variants");

    Ok(())
}
