//! Scoped event routing.
//!
//! Handler chains can be attached to a delivery, link, session or connection.
//! For one event the router gathers the chains of every object the event
//! references, innermost scope first, and calls each member in order:
//!
//! ```text
//! event(delivery=d, link=l, connection=c)
//!   │
//!   ├─ chain(d): [h1, h2{sub: [h3]}]   → h1, h2, h3
//!   ├─ chain(l): none
//!   └─ chain(c): [h4]                  → h4
//! ```
//!
//! Teardown events are dropped: the objects they concern are being destroyed
//! and their chains must not run against them.

use std::rc::Rc;

use tracing::trace;

use crate::{
    engine::Engine,
    error::Result,
    event::Event,
    handler::{Chain, Handler},
};

/// Flatten `chain` one level: each member followed by its own handlers.
///
/// Members of the nested lists are not expanded further.
pub fn flatten(chain: &[Rc<dyn Handler>]) -> Chain {
    let mut flat = Vec::with_capacity(chain.len());
    for handler in chain {
        flat.push(Rc::clone(handler));
        flat.extend(handler.handlers().iter().cloned());
    }
    flat
}

/// Handlers that will see `event`, in call order.
pub fn resolve(event: &Event, engine: &dyn Engine) -> Chain {
    if event.kind().is_final() {
        return Vec::new();
    }

    event
        .scopes()
        .into_iter()
        .filter_map(|scope| engine.handlers(scope))
        .flat_map(|chain| flatten(&chain))
        .collect()
}

/// Route `event` to every handler attached to the objects it concerns.
///
/// # Errors
///
/// Stops at and returns the first handler error.
pub fn route(event: &Event, engine: &mut dyn Engine) -> Result<()> {
    let targets = resolve(event, engine);
    trace!(event = event.kind().hook_name(), targets = targets.len(), "routing event");

    for handler in targets {
        trace!(handler = handler.name(), event = event.kind().hook_name(), "invoking handler");
        handler.handle(event, engine)?;
    }
    Ok(())
}

/// Handler that forwards every event it receives to the scoped chains.
///
/// Install it as an engine-wide handler so per-object chains get their
/// events.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopedRouter;

impl Handler for ScopedRouter {
    fn name(&self) -> &'static str {
        "scoped-router"
    }

    fn handle(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        route(event, engine)
    }
}
