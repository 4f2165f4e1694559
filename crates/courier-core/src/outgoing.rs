//! Disposition handling for sent deliveries.

use std::rc::Rc;

use tracing::trace;

use crate::{
    engine::Engine,
    error::Result,
    event::Event,
    handler::Handler,
    hooks::{self, Delegate, Hook},
    model::Disposition,
    settlement,
};

/// Turns flow and delivery events on sending links into `on_credit`,
/// outcome and `on_settled` calls.
///
/// For an updated delivery the order is fixed: the outcome hook matching the
/// remote disposition, then `on_settled` if the peer settled, then the local
/// settle when `auto_settle` is on.
pub struct OutgoingMessageHandler {
    auto_settle: bool,
    delegate: Option<Rc<dyn Delegate>>,
}

impl OutgoingMessageHandler {
    /// Create a handler reporting to `delegate`.
    pub fn new(auto_settle: bool, delegate: Option<Rc<dyn Delegate>>) -> Self {
        Self { auto_settle, delegate }
    }

    /// Whether updated deliveries are settled locally.
    pub fn auto_settle(&self) -> bool {
        self.auto_settle
    }

    pub(crate) fn delegate(&self) -> Option<&dyn Delegate> {
        self.delegate.as_deref()
    }

    pub(crate) fn link_flow(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        let link = engine.link(event.require_link()?)?;
        if link.is_sender() && link.credit > 0 {
            hooks::dispatch(self.delegate(), Hook::Credit, event, engine)?;
        }
        Ok(())
    }

    /// Shared delivery path; `on_settled` runs when the peer settled.
    pub(crate) fn delivery_updated(
        &self,
        event: &Event,
        engine: &mut dyn Engine,
        on_settled: impl FnOnce(&Event, &mut dyn Engine) -> Result<()>,
    ) -> Result<()> {
        let id = event.require_delivery()?;
        let delivery = engine.delivery(id)?;
        if delivery.released || !delivery.updated || !engine.link(delivery.link)?.is_sender() {
            return Ok(());
        }

        let outcome = match delivery.remote_state {
            Some(Disposition::Accepted) => Some(Hook::Accepted),
            Some(Disposition::Rejected) => Some(Hook::Rejected),
            Some(Disposition::Released) => Some(Hook::Released),
            Some(Disposition::Modified) => Some(Hook::Modified),
            None => None,
        };
        if let Some(hook) = outcome {
            hooks::dispatch(self.delegate(), hook, event, engine)?;
        }

        if delivery.settled {
            on_settled(event, engine)?;
        }

        if self.auto_settle {
            trace!(delivery = %id, "auto settling");
            settlement::settle(id, None, engine)?;
        }
        Ok(())
    }
}

impl Default for OutgoingMessageHandler {
    fn default() -> Self {
        Self::new(true, None)
    }
}

impl Handler for OutgoingMessageHandler {
    fn name(&self) -> &'static str {
        "outgoing-messages"
    }

    fn on_link_flow(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.link_flow(event, engine)
    }

    fn on_delivery(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.delivery_updated(event, engine, |event, engine| {
            hooks::dispatch(self.delegate(), Hook::Settled, event, engine).map(drop)
        })
    }
}
