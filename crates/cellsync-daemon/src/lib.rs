//! cellsync-daemon is intentionally thin: `main.rs` loads configuration,
//! connects the three external collaborators in bootstrap order, builds
//! the shared [`cellsync_runtime::Runtime`], and starts the HTTP server.
//! Route handlers live in `routes`; shared state lives in `state`.

pub mod routes;
pub mod state;
