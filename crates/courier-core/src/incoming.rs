//! Disposition handling for received deliveries.

use std::rc::Rc;

use tracing::debug;

use crate::{
    engine::Engine,
    error::Result,
    event::Event,
    handler::Handler,
    hooks::{self, Delegate, Hook, Outcome},
    settlement::{self, Acking},
};

/// Turns delivery events on receiving links into `on_message` and
/// `on_settled` calls.
///
/// A complete delivery is decoded and handed to `on_message`. The returned
/// [`Outcome`] decides the disposition: `Reject` always rejects and settles,
/// `Accept` accepts and settles only when `auto_accept` is on (otherwise the
/// application settles later through [`Acking`]).
pub struct IncomingMessageHandler {
    auto_accept: bool,
    delegate: Option<Rc<dyn Delegate>>,
}

impl IncomingMessageHandler {
    /// Create a handler reporting to `delegate`.
    pub fn new(auto_accept: bool, delegate: Option<Rc<dyn Delegate>>) -> Self {
        Self { auto_accept, delegate }
    }

    /// Whether normally handled messages are accepted automatically.
    pub fn auto_accept(&self) -> bool {
        self.auto_accept
    }
}

impl Default for IncomingMessageHandler {
    fn default() -> Self {
        Self::new(true, None)
    }
}

impl Acking for IncomingMessageHandler {}

impl Handler for IncomingMessageHandler {
    fn name(&self) -> &'static str {
        "incoming-messages"
    }

    fn on_delivery(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        let id = event.require_delivery()?;
        let delivery = engine.delivery(id)?;
        if delivery.released || !engine.link(delivery.link)?.is_receiver() {
            return Ok(());
        }

        if delivery.readable && !delivery.partial {
            let message = engine.read_message(id)?;
            let event = event.clone().with_message(message);

            match hooks::dispatch_message(self.delegate.as_deref(), &event, engine)? {
                Outcome::Accept if self.auto_accept => settlement::accept(id, engine)?,
                Outcome::Accept => debug!(delivery = %id, "left unsettled for the application"),
                Outcome::Reject => {
                    debug!(delivery = %id, "rejected by application");
                    settlement::reject(id, engine)?;
                },
            }
        } else if delivery.updated && delivery.settled {
            hooks::dispatch(self.delegate.as_deref(), Hook::Settled, event, engine)?;
        }
        Ok(())
    }
}
