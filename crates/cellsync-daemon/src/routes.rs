//! The in-scope slice of §6's HTTP control surface: `GET /healthz` and
//! `GET /status`. `/edit`, `/sql`, `/force-sync`, and `/cached-snapshot`
//! are out of scope per §1 — `cellsync-runtime::Runtime` exposes the
//! functions those routes would call, but wiring them up is left to
//! whatever outer service embeds this crate.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::json;

use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .with_state(state)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.runtime.status().await;
    Json(serde_json::to_value(snapshot).unwrap_or_else(|_| json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use cellsync_kv::Kv;
    use cellsync_remote::RemoteSheet;
    use cellsync_store::Store;
    use cellsync_testkit::{FakeKv, FakeRemote, FakeStore, VirtualClock};
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_config() -> cellsync_config::ReconcilerConfig {
        cellsync_config::ReconcilerConfig {
            poll_interval: Duration::from_secs(3),
            remote_range: "Sheet1!A1:H20".to_string(),
            lease_ttl: Duration::from_secs(5),
            lock_retry_delay: Duration::from_millis(200),
            lock_max_attempts: 15,
            ignore_mark_ttl: Duration::from_secs(10),
            snapshot_ttl: Duration::from_secs(86_400),
            outbound_debounce: Duration::from_millis(500),
            rate_limit_initial_backoff: Duration::from_secs(5),
            rate_limit_max_backoff: Duration::from_secs(60),
            worker_fanout: 5,
            remote_id: "test".to_string(),
            store_dsn: "postgres://unused".to_string(),
            kv_address: "redis://unused".to_string(),
            remote_base_url: "https://example.invalid".to_string(),
            remote_bearer_token: String::new(),
        }
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let clock = VirtualClock::new();
        let kv: Arc<dyn Kv> = Arc::new(FakeKv::new(clock.clone()));
        let store: Arc<dyn Store> = Arc::new(FakeStore::new(clock));
        let remote: Arc<dyn RemoteSheet> = Arc::new(FakeRemote::new());
        let runtime = cellsync_runtime::Runtime::new(&test_config(), kv, store, remote);
        let state = Arc::new(AppState::new(runtime));

        let response = build_router(state)
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
