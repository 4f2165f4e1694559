//! Engine collaborator surface.
//!
//! The messaging engine (framing, transport, event queue) lives outside this
//! crate. Handlers reach it only through this trait, which keeps the core
//! free of I/O: production wires it to a real protocol engine, tests use the
//! in-memory engine from `courier-harness`.
//!
//! Calls that change local state (open, close, flow, update, settle) are
//! expected to be reflected immediately in subsequent snapshot reads within
//! the same dispatch. Follow-up events (e.g. a local-open event after
//! [`Engine::open`]) are queued by the engine and arrive as ordinary future
//! events.

use crate::{
    error::EngineError,
    handler::Chain,
    model::{
        ConnectionId, DeliveryId, DeliveryInfo, Disposition, EndpointRef, EndpointStatus, LinkId,
        LinkInfo, Message, Scope, SessionId, TransactionId,
    },
};

/// Operations the handlers need from the messaging engine.
pub trait Engine {
    /// Current state axes of an endpoint.
    fn endpoint_status(&self, endpoint: EndpointRef) -> Result<EndpointStatus, EngineError>;

    /// Open an endpoint locally.
    fn open(&mut self, endpoint: EndpointRef) -> Result<(), EngineError>;

    /// Close an endpoint locally. Closing a closed endpoint is a no-op.
    fn close(&mut self, endpoint: EndpointRef) -> Result<(), EngineError>;

    /// Snapshot of a link.
    fn link(&self, link: LinkId) -> Result<LinkInfo, EngineError>;

    /// Connection owning a session.
    fn session_connection(&self, session: SessionId) -> Result<ConnectionId, EngineError>;

    /// Grant `credit` additional units on a receiving link.
    fn flow(&mut self, link: LinkId, credit: u32) -> Result<(), EngineError>;

    /// Snapshot of a delivery.
    fn delivery(&self, delivery: DeliveryId) -> Result<DeliveryInfo, EngineError>;

    /// Set the local disposition of a delivery.
    fn update(&mut self, delivery: DeliveryId, state: Disposition) -> Result<(), EngineError>;

    /// Settle a delivery locally. Settling twice is a no-op.
    fn settle(&mut self, delivery: DeliveryId) -> Result<(), EngineError>;

    /// Receive and decode the pending content of a complete delivery, then
    /// advance the link past it.
    fn read_message(&mut self, delivery: DeliveryId) -> Result<Message, EngineError>;

    /// Handler chain attached to a scope, if any.
    fn handlers(&self, scope: Scope) -> Option<Chain>;

    /// Let the transaction coordinator process the outcome of a settled
    /// transactional delivery.
    fn handle_transaction_outcome(
        &mut self,
        transaction: TransactionId,
        delivery: DeliveryId,
    ) -> Result<(), EngineError>;

    /// Accept a delivery as part of a transaction. Settlement happens when
    /// the transaction is discharged.
    fn transactional_accept(
        &mut self,
        transaction: TransactionId,
        delivery: DeliveryId,
    ) -> Result<(), EngineError>;

    /// Connection owning an endpoint.
    fn owning_connection(&self, endpoint: EndpointRef) -> Result<ConnectionId, EngineError> {
        match endpoint {
            EndpointRef::Connection(connection) => Ok(connection),
            EndpointRef::Session(session) => self.session_connection(session),
            EndpointRef::Link(link) => self.session_connection(self.link(link)?.session),
        }
    }
}
