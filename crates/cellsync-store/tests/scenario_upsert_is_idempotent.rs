/// Property 6: `upsert(A, v, origin); upsert(A, v, origin)` is
/// observationally equivalent to one call.
///
/// DB-backed test, skipped if CELLSYNC_TEST_DATABASE_URL is not set.
use cellsync_store::{PgStore, Store};
use cellsync_types::{CellAddress, CellValue, Origin};

#[tokio::test]
async fn upsert_is_idempotent() -> anyhow::Result<()> {
    let url = match std::env::var("CELLSYNC_TEST_DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: CELLSYNC_TEST_DATABASE_URL not set");
            return Ok(());
        }
    };

    let store = PgStore::connect(&url).await?;
    store.migrate().await?;

    let address = CellAddress::new(3, "B")?;
    let value = CellValue::new("Hello")?;

    store.upsert(address, &value, Origin::Remote).await?;
    store.upsert(address, &value, Origin::Remote).await?;

    let rows = store.read_all().await?;
    let matches: Vec<_> = rows.iter().filter(|c| c.address == address).collect();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].value, value);

    store.delete(address).await?;
    Ok(())
}
