//! Composite handlers for common roles.
//!
//! Each composite owns a fixed-order sub-chain and exposes it through
//! [`Handler::handlers`], so attaching the composite as a connection's chain
//! lets the router reach every member. The credit controller comes first: the
//! incoming handler may release deliveries, and the controller must see the
//! link before that happens to compute its next grant correctly.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    endpoint::EndpointStateHandler,
    flow::FlowController,
    handler::{Chain, Handler},
    hooks::Delegate,
    incoming::IncomingMessageHandler,
    outgoing::OutgoingMessageHandler,
    settlement::Acking,
    transaction::{TransactionHandler, TransactionalAcking},
};

/// Construction options shared by the composite handlers.
///
/// Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Credit window for receiving links; 0 disables credit management
    pub prefetch: u32,
    /// Accept and settle messages the application handled normally
    pub auto_accept: bool,
    /// Settle sent deliveries once the peer updates them
    pub auto_settle: bool,
    /// Treat an unhandled peer-initiated close as an error
    pub peer_close_is_error: bool,
}

impl MessagingConfig {
    /// Defaults for transactional roles: messages are not auto-accepted,
    /// since acceptance belongs to the transaction.
    pub fn transactional() -> Self {
        Self { auto_accept: false, ..Self::default() }
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self { prefetch: 10, auto_accept: true, auto_settle: true, peer_close_is_error: false }
    }
}

fn build_chain(
    config: MessagingConfig,
    delegate: Option<&Rc<dyn Delegate>>,
    outgoing: Rc<dyn Handler>,
) -> Chain {
    let mut handlers: Chain = Vec::with_capacity(4);
    if config.prefetch > 0 {
        handlers.push(Rc::new(FlowController::new(config.prefetch)));
    }
    handlers.push(Rc::new(EndpointStateHandler::new(
        config.peer_close_is_error,
        delegate.cloned(),
    )));
    handlers.push(Rc::new(IncomingMessageHandler::new(config.auto_accept, delegate.cloned())));
    handlers.push(outgoing);

    debug!(?config, handlers = handlers.len(), "built handler chain");
    handlers
}

/// General purpose client/server handler.
///
/// Chain: credit controller (when `prefetch > 0`), endpoint lifecycle,
/// incoming dispositions, outgoing dispositions.
pub struct MessagingHandler {
    config: MessagingConfig,
    handlers: Chain,
}

impl MessagingHandler {
    /// Build the chain, reporting to `delegate`.
    pub fn new(config: MessagingConfig, delegate: Option<Rc<dyn Delegate>>) -> Self {
        let outgoing = Rc::new(OutgoingMessageHandler::new(config.auto_settle, delegate.clone()));
        Self { config, handlers: build_chain(config, delegate.as_ref(), outgoing) }
    }

    /// Options the chain was built with.
    pub fn config(&self) -> MessagingConfig {
        self.config
    }

    /// Append a handler to the chain. It is not expanded further.
    pub fn add_handler(&mut self, handler: Rc<dyn Handler>) {
        self.handlers.push(handler);
    }
}

impl Acking for MessagingHandler {}

impl Handler for MessagingHandler {
    fn name(&self) -> &'static str {
        "messaging"
    }

    fn handlers(&self) -> &[Rc<dyn Handler>] {
        &self.handlers
    }
}

/// Transactional client handler.
///
/// Same chain as [`MessagingHandler`] with a [`TransactionHandler`] in the
/// outgoing slot. Build it from [`MessagingConfig::transactional`] to keep
/// auto-accept off.
pub struct TransactionalClientHandler {
    config: MessagingConfig,
    handlers: Chain,
}

impl TransactionalClientHandler {
    /// Build the chain, reporting to `delegate`.
    pub fn new(config: MessagingConfig, delegate: Option<Rc<dyn Delegate>>) -> Self {
        let outgoing = Rc::new(TransactionHandler::new(config.auto_settle, delegate.clone()));
        Self { config, handlers: build_chain(config, delegate.as_ref(), outgoing) }
    }

    /// Options the chain was built with.
    pub fn config(&self) -> MessagingConfig {
        self.config
    }

    /// Append a handler to the chain. It is not expanded further.
    pub fn add_handler(&mut self, handler: Rc<dyn Handler>) {
        self.handlers.push(handler);
    }
}

impl Default for TransactionalClientHandler {
    fn default() -> Self {
        Self::new(MessagingConfig::transactional(), None)
    }
}

impl TransactionalAcking for TransactionalClientHandler {}

impl Handler for TransactionalClientHandler {
    fn name(&self) -> &'static str {
        "transactional-client"
    }

    fn handlers(&self) -> &[Rc<dyn Handler>] {
        &self.handlers
    }
}

#[cfg(test)]
mod tests {
    use ciborium::Value;

    use super::*;

    #[test]
    fn default_config() {
        let config = MessagingConfig::default();
        assert_eq!(config.prefetch, 10);
        assert!(config.auto_accept);
        assert!(config.auto_settle);
        assert!(!config.peer_close_is_error);
    }

    #[test]
    fn transactional_config_disables_auto_accept() {
        let config = MessagingConfig::transactional();
        assert!(!config.auto_accept);
        assert!(config.auto_settle);
        assert_eq!(config.prefetch, 10);
    }

    #[test]
    fn config_fills_missing_fields() {
        let value = Value::Map(vec![
            (Value::Text("prefetch".into()), Value::Integer(0u32.into())),
            (Value::Text("peer_close_is_error".into()), Value::Bool(true)),
        ]);

        let config: MessagingConfig = value.deserialized().unwrap();
        assert_eq!(config.prefetch, 0);
        assert!(config.peer_close_is_error);
        assert!(config.auto_accept);
        assert!(config.auto_settle);
    }

    #[test]
    fn chain_order() {
        let handler = MessagingHandler::new(MessagingConfig::default(), None);
        let names: Vec<_> = handler.handlers().iter().map(|h| h.name()).collect();

        assert_eq!(
            names,
            vec!["flow-controller", "endpoint-state", "incoming-messages", "outgoing-messages"]
        );
    }

    #[test]
    fn zero_prefetch_drops_flow_controller() {
        let config = MessagingConfig { prefetch: 0, ..MessagingConfig::default() };
        let handler = MessagingHandler::new(config, None);
        let names: Vec<_> = handler.handlers().iter().map(|h| h.name()).collect();

        assert_eq!(names, vec!["endpoint-state", "incoming-messages", "outgoing-messages"]);
    }

    #[test]
    fn transactional_chain_uses_transaction_handler() {
        let handler = TransactionalClientHandler::default();
        let names: Vec<_> = handler.handlers().iter().map(|h| h.name()).collect();

        assert_eq!(
            names,
            vec!["flow-controller", "endpoint-state", "incoming-messages", "transaction"]
        );
        assert!(!handler.config().auto_accept);
    }
}
