//! Delegate hooks and best-effort dispatch.
//!
//! A [`Delegate`] is an application object with optional callbacks. Instead
//! of probing for methods at runtime, a delegate advertises the hooks it
//! implements as a [`Hooks`] capability set; [`dispatch`] checks membership
//! and silently skips absent hooks. Handlers rely on the membership answer
//! for their fallback policy (e.g. escalating a peer close to an error only
//! when nobody handles `closing`).

use bitflags::bitflags;
use tracing::trace;

use crate::{engine::Engine, error::Result, event::Event, model::EndpointKind};

bitflags! {
    /// Set of delegate hooks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Hooks: u32 {
        /// `on_credit`
        const CREDIT = 1 << 0;
        /// `on_accepted`
        const ACCEPTED = 1 << 1;
        /// `on_rejected`
        const REJECTED = 1 << 2;
        /// `on_released`
        const RELEASED = 1 << 3;
        /// `on_modified`
        const MODIFIED = 1 << 4;
        /// `on_settled`
        const SETTLED = 1 << 5;
        /// `on_message`
        const MESSAGE = 1 << 6;
        /// `on_connection_opening`
        const CONNECTION_OPENING = 1 << 7;
        /// `on_connection_opened`
        const CONNECTION_OPENED = 1 << 8;
        /// `on_connection_closing`
        const CONNECTION_CLOSING = 1 << 9;
        /// `on_connection_closed`
        const CONNECTION_CLOSED = 1 << 10;
        /// `on_connection_error`
        const CONNECTION_ERROR = 1 << 11;
        /// `on_session_opening`
        const SESSION_OPENING = 1 << 12;
        /// `on_session_opened`
        const SESSION_OPENED = 1 << 13;
        /// `on_session_closing`
        const SESSION_CLOSING = 1 << 14;
        /// `on_session_closed`
        const SESSION_CLOSED = 1 << 15;
        /// `on_session_error`
        const SESSION_ERROR = 1 << 16;
        /// `on_link_opening`
        const LINK_OPENING = 1 << 17;
        /// `on_link_opened`
        const LINK_OPENED = 1 << 18;
        /// `on_link_closing`
        const LINK_CLOSING = 1 << 19;
        /// `on_link_closed`
        const LINK_CLOSED = 1 << 20;
        /// `on_link_error`
        const LINK_ERROR = 1 << 21;
        /// `on_transaction_declared`
        const TRANSACTION_DECLARED = 1 << 22;
        /// `on_transaction_committed`
        const TRANSACTION_COMMITTED = 1 << 23;
        /// `on_transaction_aborted`
        const TRANSACTION_ABORTED = 1 << 24;
        /// `on_transaction_declare_failed`
        const TRANSACTION_DECLARE_FAILED = 1 << 25;
        /// `on_transaction_commit_failed`
        const TRANSACTION_COMMIT_FAILED = 1 << 26;

        /// All outgoing disposition hooks
        const DISPOSITIONS = Self::ACCEPTED.bits()
            | Self::REJECTED.bits()
            | Self::RELEASED.bits()
            | Self::MODIFIED.bits();
        /// All connection lifecycle hooks
        const CONNECTION_LIFECYCLE = Self::CONNECTION_OPENING.bits()
            | Self::CONNECTION_OPENED.bits()
            | Self::CONNECTION_CLOSING.bits()
            | Self::CONNECTION_CLOSED.bits()
            | Self::CONNECTION_ERROR.bits();
        /// All session lifecycle hooks
        const SESSION_LIFECYCLE = Self::SESSION_OPENING.bits()
            | Self::SESSION_OPENED.bits()
            | Self::SESSION_CLOSING.bits()
            | Self::SESSION_CLOSED.bits()
            | Self::SESSION_ERROR.bits();
        /// All link lifecycle hooks
        const LINK_LIFECYCLE = Self::LINK_OPENING.bits()
            | Self::LINK_OPENED.bits()
            | Self::LINK_CLOSING.bits()
            | Self::LINK_CLOSED.bits()
            | Self::LINK_ERROR.bits();
        /// All transaction lifecycle hooks
        const TRANSACTION_LIFECYCLE = Self::TRANSACTION_DECLARED.bits()
            | Self::TRANSACTION_COMMITTED.bits()
            | Self::TRANSACTION_ABORTED.bits()
            | Self::TRANSACTION_DECLARE_FAILED.bits()
            | Self::TRANSACTION_COMMIT_FAILED.bits();
    }
}

/// Stage of an endpoint's open/close negotiation reported to delegates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Peer requested an open we did not initiate
    Opening,
    /// Both sides open
    Opened,
    /// Peer requested a close we did not initiate
    Closing,
    /// Both sides closed
    Closed,
    /// Peer closed with an error condition
    Error,
}

/// One delegate hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Sender has credit
    Credit,
    /// Peer accepted a sent delivery
    Accepted,
    /// Peer rejected a sent delivery
    Rejected,
    /// Peer released a sent delivery
    Released,
    /// Peer modified a sent delivery
    Modified,
    /// Delivery settled by the peer
    Settled,
    /// Complete message received
    Message,
    /// Endpoint lifecycle stage
    Endpoint(EndpointKind, Lifecycle),
    /// Transaction declared
    TransactionDeclared,
    /// Transaction committed
    TransactionCommitted,
    /// Transaction aborted
    TransactionAborted,
    /// Transaction declaration refused
    TransactionDeclareFailed,
    /// Transaction commit refused
    TransactionCommitFailed,
}

impl Hook {
    /// Capability bit of this hook.
    pub fn flag(self) -> Hooks {
        match self {
            Self::Credit => Hooks::CREDIT,
            Self::Accepted => Hooks::ACCEPTED,
            Self::Rejected => Hooks::REJECTED,
            Self::Released => Hooks::RELEASED,
            Self::Modified => Hooks::MODIFIED,
            Self::Settled => Hooks::SETTLED,
            Self::Message => Hooks::MESSAGE,
            Self::Endpoint(kind, stage) => endpoint_flag(kind, stage),
            Self::TransactionDeclared => Hooks::TRANSACTION_DECLARED,
            Self::TransactionCommitted => Hooks::TRANSACTION_COMMITTED,
            Self::TransactionAborted => Hooks::TRANSACTION_ABORTED,
            Self::TransactionDeclareFailed => Hooks::TRANSACTION_DECLARE_FAILED,
            Self::TransactionCommitFailed => Hooks::TRANSACTION_COMMIT_FAILED,
        }
    }

    /// Hook method name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Credit => "on_credit",
            Self::Accepted => "on_accepted",
            Self::Rejected => "on_rejected",
            Self::Released => "on_released",
            Self::Modified => "on_modified",
            Self::Settled => "on_settled",
            Self::Message => "on_message",
            Self::Endpoint(kind, stage) => endpoint_hook_name(kind, stage),
            Self::TransactionDeclared => "on_transaction_declared",
            Self::TransactionCommitted => "on_transaction_committed",
            Self::TransactionAborted => "on_transaction_aborted",
            Self::TransactionDeclareFailed => "on_transaction_declare_failed",
            Self::TransactionCommitFailed => "on_transaction_commit_failed",
        }
    }
}

fn endpoint_flag(kind: EndpointKind, stage: Lifecycle) -> Hooks {
    use EndpointKind::{Connection, Link, Session};
    use Lifecycle::{Closed, Closing, Error, Opened, Opening};

    match (kind, stage) {
        (Connection, Opening) => Hooks::CONNECTION_OPENING,
        (Connection, Opened) => Hooks::CONNECTION_OPENED,
        (Connection, Closing) => Hooks::CONNECTION_CLOSING,
        (Connection, Closed) => Hooks::CONNECTION_CLOSED,
        (Connection, Error) => Hooks::CONNECTION_ERROR,
        (Session, Opening) => Hooks::SESSION_OPENING,
        (Session, Opened) => Hooks::SESSION_OPENED,
        (Session, Closing) => Hooks::SESSION_CLOSING,
        (Session, Closed) => Hooks::SESSION_CLOSED,
        (Session, Error) => Hooks::SESSION_ERROR,
        (Link, Opening) => Hooks::LINK_OPENING,
        (Link, Opened) => Hooks::LINK_OPENED,
        (Link, Closing) => Hooks::LINK_CLOSING,
        (Link, Closed) => Hooks::LINK_CLOSED,
        (Link, Error) => Hooks::LINK_ERROR,
    }
}

fn endpoint_hook_name(kind: EndpointKind, stage: Lifecycle) -> &'static str {
    use EndpointKind::{Connection, Link, Session};
    use Lifecycle::{Closed, Closing, Error, Opened, Opening};

    match (kind, stage) {
        (Connection, Opening) => "on_connection_opening",
        (Connection, Opened) => "on_connection_opened",
        (Connection, Closing) => "on_connection_closing",
        (Connection, Closed) => "on_connection_closed",
        (Connection, Error) => "on_connection_error",
        (Session, Opening) => "on_session_opening",
        (Session, Opened) => "on_session_opened",
        (Session, Closing) => "on_session_closing",
        (Session, Closed) => "on_session_closed",
        (Session, Error) => "on_session_error",
        (Link, Opening) => "on_link_opening",
        (Link, Opened) => "on_link_opened",
        (Link, Closing) => "on_link_closing",
        (Link, Closed) => "on_link_closed",
        (Link, Error) => "on_link_error",
    }
}

/// Result of handling a received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    /// Processed normally; accepted when auto-accept is on
    #[default]
    Accept,
    /// Reject the delivery
    Reject,
}

/// Application callbacks.
///
/// Only hooks listed in [`Delegate::hooks`] are ever called. Every hook can
/// use the engine (send, settle, close) and may fail; failures propagate out
/// of the dispatch unchanged.
pub trait Delegate {
    /// Hooks this delegate implements.
    fn hooks(&self) -> Hooks;

    /// A sending link has credit.
    fn on_credit(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// The peer accepted a sent delivery.
    fn on_accepted(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// The peer rejected a sent delivery.
    fn on_rejected(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// The peer released a sent delivery.
    fn on_released(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// The peer modified a sent delivery.
    fn on_modified(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// The peer settled a delivery.
    fn on_settled(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Ok(())
    }

    /// A complete message arrived; `event.message` holds it.
    fn on_message(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<Outcome> {
        Ok(Outcome::Accept)
    }

    /// Endpoint lifecycle stage for a connection, session or link.
    fn on_endpoint(
        &self,
        _kind: EndpointKind,
        _stage: Lifecycle,
        _event: &Event,
        _engine: &mut dyn Engine,
    ) -> Result<()> {
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

    /// Transaction declaration refused.
    fn on_transaction_declare_failed(
        &self,
        _event: &Event,
        _engine: &mut dyn Engine,
    ) -> Result<()> {
        Ok(())
    }

    /// Transaction commit refused.
    fn on_transaction_commit_failed(
        &self,
        _event: &Event,
        _engine: &mut dyn Engine,
    ) -> Result<()> {
        Ok(())
    }
}

/// True if `delegate` is present and implements `hook`.
pub fn implements(delegate: Option<&dyn Delegate>, hook: Hook) -> bool {
    delegate.is_some_and(|delegate| delegate.hooks().contains(hook.flag()))
}

/// Call `hook` on `delegate` if it implements it.
///
/// Returns whether the hook was called. For [`Hook::Message`] the outcome is
/// discarded; use [`dispatch_message`] to obtain it.
///
/// # Errors
///
/// Propagates any error returned by the hook.
pub fn dispatch(
    delegate: Option<&dyn Delegate>,
    hook: Hook,
    event: &Event,
    engine: &mut dyn Engine,
) -> Result<bool> {
    if !implements(delegate, hook) {
        return Ok(false);
    }
    let Some(delegate) = delegate else {
        return Ok(false);
    };

    trace!(hook = hook.name(), event = ?event.kind(), "dispatching to delegate");

    match hook {
        Hook::Credit => delegate.on_credit(event, engine)?,
        Hook::Accepted => delegate.on_accepted(event, engine)?,
        Hook::Rejected => delegate.on_rejected(event, engine)?,
        Hook::Released => delegate.on_released(event, engine)?,
        Hook::Modified => delegate.on_modified(event, engine)?,
        Hook::Settled => delegate.on_settled(event, engine)?,
        Hook::Message => {
            delegate.on_message(event, engine)?;
        },
        Hook::Endpoint(kind, stage) => delegate.on_endpoint(kind, stage, event, engine)?,
        Hook::TransactionDeclared => delegate.on_transaction_declared(event, engine)?,
        Hook::TransactionCommitted => delegate.on_transaction_committed(event, engine)?,
        Hook::TransactionAborted => delegate.on_transaction_aborted(event, engine)?,
        Hook::TransactionDeclareFailed => delegate.on_transaction_declare_failed(event, engine)?,
        Hook::TransactionCommitFailed => delegate.on_transaction_commit_failed(event, engine)?,
    }

    Ok(true)
}

/// Call `on_message` if implemented. An absent hook counts as
/// [`Outcome::Accept`].
///
/// # Errors
///
/// Propagates any error returned by the hook.
pub fn dispatch_message(
    delegate: Option<&dyn Delegate>,
    event: &Event,
    engine: &mut dyn Engine,
) -> Result<Outcome> {
    match delegate {
        Some(delegate) if implements(Some(delegate), Hook::Message) => {
            trace!(hook = Hook::Message.name(), "dispatching to delegate");
            delegate.on_message(event, engine)
        },
        _ => Ok(Outcome::Accept),
    }
}
