//! In-memory fakes for every external collaborator (`FakeKv`, `FakeStore`,
//! `FakeRemote`), each implementing the same capability trait as its real
//! adapter, plus a [`VirtualClock`] so TTL- and debounce-dependent scenarios
//! run deterministically without sleeping real time.

mod clock;
mod fake_kv;
mod fake_remote;
mod fake_store;

pub use clock::VirtualClock;
pub use fake_kv::FakeKv;
pub use fake_remote::FakeRemote;
pub use fake_store::FakeStore;
