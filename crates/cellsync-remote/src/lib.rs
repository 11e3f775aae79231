//! The remote spreadsheet collaborator (§4.3, §6): the `RemoteSheet`
//! capability trait, the rate-limit/backoff state machine, and the
//! `reqwest`-backed realization of it.

mod backoff;
mod client;
mod error;
mod http;

pub use backoff::RateLimitState;
pub use client::RemoteSheet;
pub use error::RemoteError;
pub use http::{HttpRemote, RemoteEndpoint};
