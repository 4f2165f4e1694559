//! Deterministic test harness for Courier handlers.
//!
//! In-memory implementation of the engine collaborator plus recording
//! delegates, so handler chains can be exercised end to end without a
//! transport.
//!
//! # Components
//!
//! - [`MemoryEngine`]: object model, event queue and chain attachments
//! - [`Reactor`]: drains the event queue through the engine-wide handlers
//! - [`RecordingDelegate`] and [`RecordingHandler`]: record hook calls
//! - [`Journal`]: shared, ordered log of engine calls and hook invocations

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod journal;
pub mod reactor;
pub mod recording;

pub use engine::MemoryEngine;
pub use journal::{EngineCall, Entry, Journal};
pub use reactor::Reactor;
pub use recording::{RecordingDelegate, RecordingHandler};

/// Install a test-friendly tracing subscriber.
///
/// Honors `RUST_LOG`; output goes through the test writer so it is captured
/// per test. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
