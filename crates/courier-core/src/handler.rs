//! Handler interface for engine events.
//!
//! Every engine event maps to one hook on [`Handler`]. All hooks have no-op
//! bodies, so a handler implements only what it cares about and the router
//! can call every member of a chain unconditionally.

use std::rc::Rc;

use crate::{
    engine::Engine,
    error::Result,
    event::{Event, EventType},
};

/// Ordered handler chain attached to one scope.
pub type Chain = Vec<Rc<dyn Handler>>;

/// Receiver of engine events.
///
/// A handler may own a sub-chain exposed through [`Handler::handlers`]; the
/// router visits those members right after their owner. Nesting is resolved
/// exactly one level deep.
pub trait Handler {
    /// Short name used in logs.
    fn name(&self) -> &'static str {
        "handler"
    }

    /// Nested handlers that see every event this handler sees.
    fn handlers(&self) -> &[Rc<dyn Handler>] {
        &[]
    }

    /// Deliver `event` to the hook matching its kind.
    fn handle(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        match event.kind() {
            EventType::ConnectionLocalOpen => self.on_connection_local_open(event, engine),
            EventType::ConnectionRemoteOpen => self.on_connection_remote_open(event, engine),
            EventType::ConnectionLocalClose => self.on_connection_local_close(event, engine),
            EventType::ConnectionRemoteClose => self.on_connection_remote_close(event, engine),
            EventType::ConnectionFinal => self.on_connection_final(event, engine),
            EventType::SessionLocalOpen => self.on_session_local_open(event, engine),
            EventType::SessionRemoteOpen => self.on_session_remote_open(event, engine),
            EventType::SessionLocalClose => self.on_session_local_close(event, engine),
            EventType::SessionRemoteClose => self.on_session_remote_close(event, engine),
            EventType::SessionFinal => self.on_session_final(event, engine),
            EventType::LinkLocalOpen => self.on_link_local_open(event, engine),
            EventType::LinkRemoteOpen => self.on_link_remote_open(event, engine),
            EventType::LinkLocalClose => self.on_link_local_close(event, engine),
            EventType::LinkRemoteClose => self.on_link_remote_close(event, engine),
            EventType::LinkFlow => self.on_link_flow(event, engine),
            EventType::LinkFinal => self.on_link_final(event, engine),
            EventType::Delivery => self.on_delivery(event, engine),
            EventType::TransactionDeclared => self.on_transaction_declared(event, engine),
            EventType::TransactionCommitted => self.on_transaction_committed(event, engine),
            EventType::TransactionAborted => self.on_transaction_aborted(event, engine),
            EventType::TransactionDeclareFailed => {
                self.on_transaction_declare_failed(event, engine)
            },
            EventType::TransactionCommitFailed => self.on_transaction_commit_failed(event, engine),
        }
    }

    /// Connection opened locally.
    fn on_connection_local_open(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Peer opened the connection.
    fn on_connection_remote_open(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Connection closed locally.
    fn on_connection_local_close(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Peer closed the connection.
    fn on_connection_remote_close(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Connection teardown. Never routed by the scoped router.
    fn on_connection_final(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Session opened locally.
    fn on_session_local_open(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Peer opened the session.
    fn on_session_remote_open(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Session closed locally.
    fn on_session_local_close(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Peer closed the session.
    fn on_session_remote_close(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Session teardown. Never routed by the scoped router.
    fn on_session_final(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Link opened locally.
    fn on_link_local_open(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Peer opened the link.
    fn on_link_remote_open(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Link closed locally.
    fn on_link_local_close(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Peer closed the link.
    fn on_link_remote_close(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Link credit changed.
    fn on_link_flow(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Link teardown. Never routed by the scoped router.
    fn on_link_final(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Delivery content or state changed.
    fn on_delivery(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Transaction declared.
    fn on_transaction_declared(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Transaction committed.
    fn on_transaction_committed(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Transaction aborted.
    fn on_transaction_aborted(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// Transaction could not be declared.
    fn on_transaction_declare_failed(
        &self,
        _event: &Event,
        _engine: &mut dyn Engine,
    ) -> Result<()> {
        Ok(())
    }

    /// Transaction could not be committed.
    fn on_transaction_commit_failed(
        &self,
        _event: &Event,
        _engine: &mut dyn Engine,
    ) -> Result<()> {
        Ok(())
    }
}
