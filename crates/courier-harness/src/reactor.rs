//! Event loop over a [`MemoryEngine`].
//!
//! Pops queued events and hands each one to the engine-wide handlers, which
//! by default is a single [`ScopedRouter`]. Events raised while handling
//! (e.g. a local close issued by a lifecycle handler) are queued and drained
//! in the same [`Reactor::process`] call.

use std::rc::Rc;

use courier_core::{Chain, Event, EventType, Handler, Result, ScopedRouter};
use tracing::{debug, trace};

use crate::engine::MemoryEngine;

/// Upper bound on events drained by one [`Reactor::process`] call.
const MAX_EVENTS: usize = 10_000;

/// Drives handlers from the engine's event queue.
pub struct Reactor {
    engine: MemoryEngine,
    global: Chain,
}

impl Reactor {
    /// Reactor over `engine` with the scoped router as its only global
    /// handler.
    pub fn new(engine: MemoryEngine) -> Self {
        Self { engine, global: vec![Rc::new(ScopedRouter)] }
    }

    /// Reactor over a fresh engine.
    pub fn with_memory_engine() -> Self {
        Self::new(MemoryEngine::new())
    }

    /// The engine.
    pub fn engine(&self) -> &MemoryEngine {
        &self.engine
    }

    /// The engine, for setting up objects and simulating the peer.
    pub fn engine_mut(&mut self) -> &mut MemoryEngine {
        &mut self.engine
    }

    /// Append a handler that sees every event.
    pub fn add_global_handler(&mut self, handler: Rc<dyn Handler>) {
        self.global.push(handler);
    }

    /// Run every global handler on one event.
    ///
    /// # Errors
    ///
    /// Returns the first handler error. The event is considered consumed.
    pub fn dispatch(&mut self, event: &Event) -> Result<()> {
        trace!(event = event.kind().hook_name(), "dispatch");

        let outcome =
            self.global.iter().try_for_each(|handler| handler.handle(event, &mut self.engine));

        if event.kind() == EventType::Delivery
            && let Some(delivery) = event.delivery
        {
            self.engine.clear_updated(delivery)?;
        }
        outcome
    }

    /// Drain the event queue.
    ///
    /// Returns the number of events dispatched.
    ///
    /// # Errors
    ///
    /// Stops at the first handler error; remaining events stay queued.
    pub fn process(&mut self) -> Result<usize> {
        let mut processed = 0;
        while processed < MAX_EVENTS {
            let Some(event) = self.engine.pop_event() else {
                break;
            };
            self.dispatch(&event)?;
            processed += 1;
        }

        debug!(processed, pending = self.engine.pending_events(), "event queue drained");
        Ok(processed)
    }
}

impl Default for Reactor {
    fn default() -> Self {
        Self::with_memory_engine()
    }
}
