use std::sync::Arc;
use std::time::Duration;

use cellsync_config::ReconcilerConfig;
use cellsync_kv::Kv;
use cellsync_remote::RemoteSheet;
use cellsync_runtime::Runtime;
use cellsync_store::Store;
use cellsync_testkit::{FakeKv, FakeRemote, FakeStore, VirtualClock};
use cellsync_types::{CellAddress, CellValue, Origin};

fn addr(row: u32, col: &str) -> CellAddress {
    CellAddress::new(row, col).unwrap()
}

fn val(s: &str) -> CellValue {
    CellValue::new(s).unwrap()
}

fn test_config() -> ReconcilerConfig {
    ReconcilerConfig {
        poll_interval: Duration::from_millis(50),
        remote_range: "Sheet1!A1:H20".to_string(),
        lease_ttl: Duration::from_secs(5),
        lock_retry_delay: Duration::from_millis(10),
        lock_max_attempts: 3,
        ignore_mark_ttl: Duration::from_secs(10),
        snapshot_ttl: Duration::from_secs(86_400),
        outbound_debounce: Duration::from_millis(50),
        rate_limit_initial_backoff: Duration::from_secs(5),
        rate_limit_max_backoff: Duration::from_secs(60),
        worker_fanout: 2,
        remote_id: "test-sheet".to_string(),
        store_dsn: "postgres://unused".to_string(),
        kv_address: "redis://unused".to_string(),
        remote_base_url: "https://example.invalid".to_string(),
        remote_bearer_token: String::new(),
    }
}

#[tokio::test(start_paused = true)]
async fn bootstrap_pulls_the_remote_grid_into_the_store_and_status_reflects_it() {
    let clock = VirtualClock::new();
    let kv: Arc<dyn Kv> = Arc::new(FakeKv::new(clock.clone()));
    let store = Arc::new(FakeStore::new(clock));
    let remote = Arc::new(FakeRemote::new());

    let a1 = addr(1, "A");
    remote.apply_external_edit(a1, val("hello"));

    let config = test_config();
    let runtime = Runtime::new(
        &config,
        kv,
        store.clone() as Arc<dyn Store>,
        remote.clone() as Arc<dyn RemoteSheet>,
    );

    runtime.bootstrap().await.unwrap();

    let row = store.row(&a1).unwrap();
    assert_eq!(row.value, val("hello"));
    assert_eq!(row.origin, Origin::Remote);

    let status = runtime.status().await;
    assert!(status.remote_online);
    assert!(status.store_online);
    assert_eq!(status.snapshot_size, 1);
    assert!(!status.rate_limited);
}

#[tokio::test(start_paused = true)]
async fn spawn_then_shutdown_drains_without_hanging() {
    let clock = VirtualClock::new();
    let kv: Arc<dyn Kv> = Arc::new(FakeKv::new(clock.clone()));
    let store = Arc::new(FakeStore::new(clock));
    let remote = Arc::new(FakeRemote::new());

    let config = test_config();
    let runtime = Runtime::new(&config, kv, store as Arc<dyn Store>, remote as Arc<dyn RemoteSheet>);

    runtime.bootstrap().await.unwrap();
    let handles = runtime.spawn();

    tokio::time::sleep(Duration::from_millis(120)).await;

    tokio::time::timeout(Duration::from_secs(1), runtime.shutdown(handles))
        .await
        .expect("shutdown must complete promptly after cancellation");
}
