//! Error types.

use thiserror::Error;

use crate::{
    event::EventType,
    model::{
        ConnectionId, DeliveryId, EndpointRef, EndpointState, LinkId, SessionId, TransactionId,
    },
};

/// Result alias used across the crate.
pub type Result<T, E = CourierError> = std::result::Result<T, E>;

/// Failures reported by the engine collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// No such connection
    #[error("unknown {0}")]
    UnknownConnection(ConnectionId),

    /// No such session
    #[error("unknown {0}")]
    UnknownSession(SessionId),

    /// No such link
    #[error("unknown {0}")]
    UnknownLink(LinkId),

    /// No such delivery
    #[error("unknown {0}")]
    UnknownDelivery(DeliveryId),

    /// No such transaction
    #[error("unknown {0}")]
    UnknownTransaction(TransactionId),

    /// An endpoint axis was asked to move backwards
    #[error("{endpoint} cannot move from {from:?} to {to:?}")]
    StateRegression {
        /// Endpoint whose axis was mutated
        endpoint: EndpointRef,
        /// Current state
        from: EndpointState,
        /// Requested state
        to: EndpointState,
    },

    /// Disposition update on a delivery that is already settled locally
    #[error("{0} is already settled")]
    AlreadySettled(DeliveryId),

    /// Message read while content is still arriving
    #[error("{0} is still partial")]
    Incomplete(DeliveryId),

    /// Link operation that needs the other direction
    #[error("{link} is not a {expected}")]
    WrongRole {
        /// Link the operation targeted
        link: LinkId,
        /// Direction the operation needs
        expected: &'static str,
    },
}

/// Errors returned by handlers and the router.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Engine call failed
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The event does not reference an object the handler requires
    #[error("{event:?} event carries no {scope}")]
    MissingContext {
        /// Event being handled
        event: EventType,
        /// Missing scope name
        scope: &'static str,
    },

    /// An application hook failed
    #[error("hook {hook} failed")]
    Hook {
        /// Hook name
        hook: &'static str,
        /// Application error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CourierError {
    /// Wrap an application error raised inside a delegate hook.
    pub fn hook(
        hook: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Hook { hook, source: source.into() }
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error as _, io};

    use super::*;

    #[test]
    fn hook_error_exposes_application_error_as_source() {
        let err = CourierError::hook("on_message", io::Error::other("bad payload"));

        assert_eq!(err.to_string(), "hook on_message failed");
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("bad payload"));
    }
}
