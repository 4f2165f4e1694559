//! Endpoint lifecycle state machine.
//!
//! Connections, sessions and links share one open/close negotiation. The raw
//! engine events (local open, remote open, remote close) are classified into
//! five stages reported to the delegate:
//!
//! ```text
//!              remote open, local uninitialized
//!   ┌──────────┐  ──────────────────────────────>  opening + local open
//!   │          │
//!   │  endpoint│  both axes Active (first observer)  ─>  opened
//!   │          │
//!   └──────────┘  remote close ─┬─ condition set ────────>  error
//!                               ├─ local already closed ──>  closed
//!                               └─ otherwise ─────────────>  closing
//!                                                           (+ local close)
//! ```
//!
//! # Defaults
//!
//! Without a delegate hook the handler still answers the peer: a remote open
//! is matched with a local open and a remote close with a local close. An
//! unhandled error on a session or link closes the whole connection. When
//! `peer_close_is_error` is set, an unhandled `closing` is treated as an
//! `error`.

use std::{cell::RefCell, collections::HashSet, rc::Rc};

use tracing::{debug, trace, warn};

use crate::{
    engine::Engine,
    error::Result,
    event::Event,
    handler::Handler,
    hooks::{self, Delegate, Hook, Lifecycle},
    model::{EndpointKind, EndpointRef, EndpointState, ErrorCondition},
};

/// Classifies endpoint open/close events and drives auto-open and auto-close.
pub struct EndpointStateHandler {
    peer_close_is_error: bool,
    delegate: Option<Rc<dyn Delegate>>,
    /// Endpoints that already reported `opened`
    opened: RefCell<HashSet<EndpointRef>>,
}

impl EndpointStateHandler {
    /// Create a handler reporting to `delegate`.
    pub fn new(peer_close_is_error: bool, delegate: Option<Rc<dyn Delegate>>) -> Self {
        Self { peer_close_is_error, delegate, opened: RefCell::new(HashSet::new()) }
    }

    /// Whether `opened` was reported for `endpoint` and it has not closed
    /// since.
    pub fn reported_opened(&self, endpoint: EndpointRef) -> bool {
        self.opened.borrow().contains(&endpoint)
    }

    fn local_open(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        let endpoint = event.endpoint()?;
        let status = engine.endpoint_status(endpoint)?;

        if status.remote == EndpointState::Active {
            self.report_opened(endpoint, event, engine)?;
        }
        Ok(())
    }

    // A closed local axis never reports `opened` again.
    fn local_close(&self, event: &Event) -> Result<()> {
        let endpoint = event.endpoint()?;
        self.opened.borrow_mut().remove(&endpoint);
        Ok(())
    }

    fn remote_open(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        let endpoint = event.endpoint()?;
        let status = engine.endpoint_status(endpoint)?;

        match status.local {
            EndpointState::Active => self.report_opened(endpoint, event, engine),
            EndpointState::Uninitialized => {
                debug!(%endpoint, "peer opening");
                self.notify(endpoint.kind(), Lifecycle::Opening, event, engine)?;
                engine.open(endpoint)?;
                Ok(())
            },
            EndpointState::Closed => {
                trace!(%endpoint, "remote open after local close");
                Ok(())
            },
        }
    }

    fn remote_close(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        let endpoint = event.endpoint()?;
        let status = engine.endpoint_status(endpoint)?;
        self.opened.borrow_mut().remove(&endpoint);

        if let Some(condition) = &status.remote_condition {
            self.report_error(endpoint, Some(condition), event, engine)?;
        } else if status.local == EndpointState::Closed {
            debug!(%endpoint, "closed");
            self.notify(endpoint.kind(), Lifecycle::Closed, event, engine)?;
        } else {
            self.report_closing(endpoint, event, engine)?;
        }

        engine.close(endpoint)?;
        Ok(())
    }

    fn report_opened(
        &self,
        endpoint: EndpointRef,
        event: &Event,
        engine: &mut dyn Engine,
    ) -> Result<()> {
        if !self.opened.borrow_mut().insert(endpoint) {
            trace!(%endpoint, "opened already reported");
            return Ok(());
        }

        debug!(%endpoint, "opened");
        self.notify(endpoint.kind(), Lifecycle::Opened, event, engine)?;
        Ok(())
    }

    fn report_closing(
        &self,
        endpoint: EndpointRef,
        event: &Event,
        engine: &mut dyn Engine,
    ) -> Result<()> {
        debug!(%endpoint, "peer closing");
        if self.notify(endpoint.kind(), Lifecycle::Closing, event, engine)? {
            return Ok(());
        }

        if self.peer_close_is_error {
            self.report_error(endpoint, None, event, engine)?;
        }
        Ok(())
    }

    fn report_error(
        &self,
        endpoint: EndpointRef,
        condition: Option<&ErrorCondition>,
        event: &Event,
        engine: &mut dyn Engine,
    ) -> Result<()> {
        if self.notify(endpoint.kind(), Lifecycle::Error, event, engine)? {
            return Ok(());
        }

        match condition {
            Some(condition) => warn!(%endpoint, %condition, "closed by peer with error"),
            None => warn!(%endpoint, "closed by peer"),
        }

        if endpoint.kind() != EndpointKind::Connection {
            let connection = match event.connection {
                Some(connection) => connection,
                None => engine.owning_connection(endpoint)?,
            };
            warn!(%endpoint, %connection, "closing connection");
            engine.close(EndpointRef::Connection(connection))?;
        }
        Ok(())
    }

    /// Report a stage to the delegate; returns whether a hook handled it.
    fn notify(
        &self,
        kind: EndpointKind,
        stage: Lifecycle,
        event: &Event,
        engine: &mut dyn Engine,
    ) -> Result<bool> {
        hooks::dispatch(self.delegate.as_deref(), Hook::Endpoint(kind, stage), event, engine)
    }
}

impl Default for EndpointStateHandler {
    fn default() -> Self {
        Self::new(false, None)
    }
}

impl Handler for EndpointStateHandler {
    fn name(&self) -> &'static str {
        "endpoint-state"
    }

    fn on_connection_local_open(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.local_open(event, engine)
    }

    fn on_connection_remote_open(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.remote_open(event, engine)
    }

    fn on_connection_local_close(&self, event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        self.local_close(event)
    }

    fn on_connection_remote_close(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.remote_close(event, engine)
    }

    fn on_session_local_open(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.local_open(event, engine)
    }

    fn on_session_remote_open(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.remote_open(event, engine)
    }

    fn on_session_local_close(&self, event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        self.local_close(event)
    }

    fn on_session_remote_close(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.remote_close(event, engine)
    }

    fn on_link_local_open(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.local_open(event, engine)
    }

    fn on_link_remote_open(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.remote_open(event, engine)
    }

    fn on_link_local_close(&self, event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        self.local_close(event)
    }

    fn on_link_remote_close(&self, event: &Event, engine: &mut dyn Engine) -> Result<()> {
        self.remote_close(event, engine)
    }
}
