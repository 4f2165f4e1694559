//! Transactional extension of outgoing disposition handling.
//!
//! Deliveries sent or received under a transaction are not final when the
//! peer settles them: the transaction coordinator has to see the outcome
//! first (a declare or discharge reply decides whether the transaction was
//! declared, committed or aborted). The coordinator then raises the
//! transaction lifecycle events that this handler forwards to the delegate.

use std::rc::Rc;

use tracing::debug;

use crate::{
    engine::Engine,
    error::Result,
    event::Event,
    handler::Handler,
    hooks::{self, Delegate, Hook},
    model::{DeliveryId, TransactionId},
    outgoing::OutgoingMessageHandler,
};

/// Outgoing handler that routes settled transactional deliveries through
/// their transaction before `on_settled`.
pub struct TransactionHandler {
    outgoing: OutgoingMessageHandler,
}

impl TransactionHandler {
    /// Create a handler reporting to `delegate`.
    pub fn new(auto_settle: bool, delegate: Option<Rc<dyn Delegate>>) -> Self {
        Self { outgoing: OutgoingMessageHandler::new(auto_settle, delegate) }
    }

    /// Whether updated deliveries are settled locally.
    pub fn auto_settle(&self) -> bool {
        self.outgoing.auto_settle()
    }

    fn settled(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        let delivery = engine.delivery(event.require_delivery()?)?;

        match delivery.transaction {
            Some(transaction) => {
                let event = event.clone().with_transaction(transaction);
                debug!(%transaction, delivery = ?event.delivery, "handling transaction outcome");
                engine.handle_transaction_outcome(transaction, event.require_delivery()?)?;
                hooks::dispatch(self.outgoing.delegate(), Hook::Settled, &event, engine)?;
            },
            None => {
                hooks::dispatch(self.outgoing.delegate(), Hook::Settled, event, engine)?;
            },
        }
        Ok(())
    }

    fn forward(&self, hook: Hook, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        debug!(hook = hook.name(), transaction = ?event.transaction, "transaction event");
        hooks::dispatch(self.outgoing.delegate(), hook, event, engine)?;
        Ok(())
    }
}

impl Default for TransactionHandler {
    fn default() -> Self {
        Self::new(true, None)
    }
}

impl TransactionalAcking for TransactionHandler {}

impl Handler for TransactionHandler {
    fn name(&self) -> &'static str {
        "transaction"
    }

    fn on_link_flow(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.outgoing.link_flow(event, engine)
    }

    fn on_delivery(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.outgoing.delivery_updated(event, engine, |event, engine| self.settled(event, engine))
    }

    fn on_transaction_declared(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.forward(Hook::TransactionDeclared, event, engine)
    }

    fn on_transaction_committed(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.forward(Hook::TransactionCommitted, event, engine)
    }

    fn on_transaction_aborted(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.forward(Hook::TransactionAborted, event, engine)
    }

    fn on_transaction_declare_failed(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.forward(Hook::TransactionDeclareFailed, event, engine)
    }

    fn on_transaction_commit_failed(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.forward(Hook::TransactionCommitFailed, event, engine)
    }
}

/// Acceptance under a transaction.
///
/// The accept is recorded by the transaction; settlement is deferred until
/// the transaction is committed or aborted.
pub trait TransactionalAcking {
    /// Accept `delivery` as part of `transaction`.
    ///
    /// # Errors
    ///
    /// Propagates engine failures.
    fn accept(
        &self,
        delivery: DeliveryId,
        transaction: TransactionId,
        engine: &mut dyn Engine,
    ) -> Result<()> {
        debug!(%delivery, %transaction, "transactional accept");
        engine.transactional_accept(transaction, delivery)?;
        Ok(())
    }
}
