//! Engine object model as seen by the handlers.
//!
//! Handles are plain `Copy` identifiers owned by the engine. The handlers
//! never hold engine objects directly; they read snapshots ([`EndpointStatus`],
//! [`LinkInfo`], [`DeliveryInfo`]) through the [`crate::Engine`] trait and
//! mutate state only through its explicit calls.

use std::fmt;

use bytes::Bytes;

use crate::error::EngineError;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

handle!(
    /// Engine handle of a connection.
    ConnectionId,
    "connection"
);
handle!(
    /// Engine handle of a session.
    SessionId,
    "session"
);
handle!(
    /// Engine handle of a link.
    LinkId,
    "link"
);
handle!(
    /// Engine handle of a delivery.
    DeliveryId,
    "delivery"
);
handle!(
    /// Engine handle of a transaction.
    TransactionId,
    "transaction"
);

/// The three endpoint kinds sharing the open/close state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// A connection
    Connection,
    /// A session within a connection
    Session,
    /// A link within a session
    Link,
}

/// Reference to a connection, session or link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointRef {
    /// A connection endpoint
    Connection(ConnectionId),
    /// A session endpoint
    Session(SessionId),
    /// A link endpoint
    Link(LinkId),
}

impl EndpointRef {
    /// Kind of the referenced endpoint.
    pub fn kind(self) -> EndpointKind {
        match self {
            Self::Connection(_) => EndpointKind::Connection,
            Self::Session(_) => EndpointKind::Session,
            Self::Link(_) => EndpointKind::Link,
        }
    }
}

impl fmt::Display for EndpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(id) => id.fmt(f),
            Self::Session(id) => id.fmt(f),
            Self::Link(id) => id.fmt(f),
        }
    }
}

/// Scopes a handler chain can be attached to, innermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Chain attached to one delivery
    Delivery(DeliveryId),
    /// Chain attached to one link
    Link(LinkId),
    /// Chain attached to one session
    Session(SessionId),
    /// Chain attached to one connection
    Connection(ConnectionId),
}

/// State of one endpoint axis.
///
/// Ordered: an axis only ever moves forward along
/// `Uninitialized → Active → Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum EndpointState {
    /// Not opened yet
    #[default]
    Uninitialized,
    /// Opened
    Active,
    /// Closed
    Closed,
}

impl EndpointState {
    /// Move this axis to `next`.
    ///
    /// Returns `true` if the state changed and `false` if it already was
    /// `next`.
    ///
    /// # Errors
    ///
    /// Returns `StateRegression` if `next` is behind the current state.
    pub fn advance(&mut self, endpoint: EndpointRef, next: Self) -> Result<bool, EngineError> {
        if next < *self {
            return Err(EngineError::StateRegression { endpoint, from: *self, to: next });
        }

        let changed = next != *self;
        *self = next;
        Ok(changed)
    }
}

/// Error condition carried by a remote close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCondition {
    /// Symbolic condition name, e.g. `amqp:internal-error`
    pub name: String,
    /// Human readable description
    pub description: Option<String>,
}

impl ErrorCondition {
    /// Create a condition with a name and no description.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), description: None }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl fmt::Display for ErrorCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {description}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Snapshot of an endpoint's two state axes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EndpointStatus {
    /// Local axis, driven by local open/close calls
    pub local: EndpointState,
    /// Remote axis, driven by the peer
    pub remote: EndpointState,
    /// Condition the peer attached to its close, if any
    pub remote_condition: Option<ErrorCondition>,
}

/// Direction of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Sends deliveries
    Sender,
    /// Receives deliveries
    Receiver,
}

/// Snapshot of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkInfo {
    /// Owning session
    pub session: SessionId,
    /// Link direction
    pub role: Role,
    /// Current credit
    pub credit: u32,
}

impl LinkInfo {
    /// True for receiving links.
    pub fn is_receiver(&self) -> bool {
        self.role == Role::Receiver
    }

    /// True for sending links.
    pub fn is_sender(&self) -> bool {
        self.role == Role::Sender
    }
}

/// Outcome recorded for a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Processed successfully
    Accepted,
    /// Invalid and will not be processed
    Rejected,
    /// Not processed, may be redelivered unchanged
    Released,
    /// Not processed, redelivery counts as a delivery attempt
    Modified,
}

/// Snapshot of a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryInfo {
    /// Link the delivery travels on
    pub link: LinkId,
    /// Bytes available to read
    pub pending: usize,
    /// Content can be read
    pub readable: bool,
    /// More content is still to arrive
    pub partial: bool,
    /// Remote state changed since the last event
    pub updated: bool,
    /// Settled by the peer
    pub settled: bool,
    /// Settled locally
    pub locally_settled: bool,
    /// Freed by the engine; no further processing applies
    pub released: bool,
    /// Disposition set locally
    pub local_state: Option<Disposition>,
    /// Disposition reported by the peer
    pub remote_state: Option<Disposition>,
    /// Transaction the delivery was sent or received under
    pub transaction: Option<TransactionId>,
}

/// A complete, decoded message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// Destination address, if set
    pub address: Option<String>,
    /// Message body
    pub body: Bytes,
}

impl Message {
    /// Message with the given body and no address.
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self { address: None, body: body.into() }
    }
}
