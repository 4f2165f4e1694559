//! Settlement primitives shared by the disposition handlers.

use tracing::debug;

use crate::{
    engine::Engine,
    error::Result,
    model::{DeliveryId, Disposition},
};

/// Record `state` (if any) as the local disposition and settle.
///
/// A delivery that is already settled locally is left untouched.
///
/// # Errors
///
/// Propagates engine failures.
pub fn settle(
    delivery: DeliveryId,
    state: Option<Disposition>,
    engine: &mut dyn Engine,
) -> Result<()> {
    if engine.delivery(delivery)?.locally_settled {
        debug!(%delivery, "already settled");
        return Ok(());
    }

    if let Some(state) = state {
        engine.update(delivery, state)?;
    }
    engine.settle(delivery)?;

    debug!(%delivery, ?state, "settled");
    Ok(())
}

/// Accept and settle.
///
/// # Errors
///
/// Propagates engine failures.
pub fn accept(delivery: DeliveryId, engine: &mut dyn Engine) -> Result<()> {
    settle(delivery, Some(Disposition::Accepted), engine)
}

/// Reject and settle.
///
/// # Errors
///
/// Propagates engine failures.
pub fn reject(delivery: DeliveryId, engine: &mut dyn Engine) -> Result<()> {
    settle(delivery, Some(Disposition::Rejected), engine)
}

/// Give a delivery back to the sender and settle.
///
/// A delivered message is marked `Modified` so the redelivery counts as an
/// attempt; an undelivered one is marked `Released`.
///
/// # Errors
///
/// Propagates engine failures.
pub fn release(delivery: DeliveryId, delivered: bool, engine: &mut dyn Engine) -> Result<()> {
    let state = if delivered { Disposition::Modified } else { Disposition::Released };
    settle(delivery, Some(state), engine)
}

/// Settlement operations as methods, for handlers and delegates that expose
/// them to applications.
pub trait Acking {
    /// See [`accept`].
    fn accept(&self, delivery: DeliveryId, engine: &mut dyn Engine) -> Result<()> {
        accept(delivery, engine)
    }

    /// See [`reject`].
    fn reject(&self, delivery: DeliveryId, engine: &mut dyn Engine) -> Result<()> {
        reject(delivery, engine)
    }

    /// See [`release`].
    fn release(
        &self,
        delivery: DeliveryId,
        delivered: bool,
        engine: &mut dyn Engine,
    ) -> Result<()> {
        release(delivery, delivered, engine)
    }

    /// See [`settle`].
    fn settle(
        &self,
        delivery: DeliveryId,
        state: Option<Disposition>,
        engine: &mut dyn Engine,
    ) -> Result<()> {
        settle(delivery, state, engine)
    }
}
