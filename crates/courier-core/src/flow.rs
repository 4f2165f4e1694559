//! Credit window controller.
//!
//! Keeps every receiving link it sees topped up to a fixed window. Nothing is
//! remembered between calls: each trigger recomputes the grant from the
//! link's current credit.

use tracing::debug;

use crate::{engine::Engine, error::Result, event::Event, handler::Handler, model::LinkId};

/// Replenishes receive credit to a fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowController {
    window: u32,
}

impl FlowController {
    /// Controller granting up to `window` credits per receiving link.
    pub fn new(window: u32) -> Self {
        Self { window }
    }

    /// Configured window.
    pub fn window(&self) -> u32 {
        self.window
    }

    /// Credit that brings a link holding `credit` back to the window.
    ///
    /// Never negative: a link already at or above the window gets zero.
    pub fn delta(&self, credit: u32) -> u32 {
        self.window.saturating_sub(credit)
    }

    /// Grant the missing credit on `link`.
    ///
    /// The flow call is issued even when the delta is zero.
    ///
    /// # Errors
    ///
    /// Propagates engine failures.
    pub fn top_up(&self, link: LinkId, engine: &mut dyn Engine) -> Result<()> {
        let info = engine.link(link)?;
        let delta = self.delta(info.credit);

        debug!(%link, credit = info.credit, window = self.window, delta, "topping up credit");
        engine.flow(link, delta)?;
        Ok(())
    }

    fn top_up_receiver(&self, link: LinkId, engine: &mut dyn Engine) -> Result<()> {
        if engine.link(link)?.is_receiver() {
            self.top_up(link, engine)?;
        }
        Ok(())
    }
}

impl Default for FlowController {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Handler for FlowController {
    fn name(&self) -> &'static str {
        "flow-controller"
    }

    fn on_link_local_open(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.top_up_receiver(event.require_link()?, engine)
    }

    fn on_link_remote_open(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.top_up_receiver(event.require_link()?, engine)
    }

    fn on_link_flow(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.top_up_receiver(event.require_link()?, engine)
    }

    fn on_delivery(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        let delivery = engine.delivery(event.require_delivery()?)?;
        if delivery.released {
            return Ok(());
        }
        self.top_up_receiver(delivery.link, engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_fills_window() {
        assert_eq!(FlowController::new(10).delta(3), 7);
        assert_eq!(FlowController::new(5).delta(5), 0);
        assert_eq!(FlowController::new(4).delta(0), 4);
    }

    #[test]
    fn delta_clamps_excess_credit() {
        assert_eq!(FlowController::new(2).delta(9), 0);
    }

    #[test]
    fn default_window_is_one() {
        assert_eq!(FlowController::default().window(), 1);
    }
}
