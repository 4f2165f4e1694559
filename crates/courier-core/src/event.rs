//! Engine events.
//!
//! An [`Event`] names what happened ([`EventType`]) and which objects it
//! concerns. Handlers read the references and may attach attributes (a
//! decoded message, a transaction) to a derived copy that they pass further
//! down; the engine's original is never modified.

use crate::{
    error::{CourierError, Result},
    model::{
        ConnectionId, DeliveryId, EndpointKind, EndpointRef, LinkId, Message, Scope, SessionId,
        TransactionId,
    },
};

/// Kind of engine event. Each kind maps to one `on_*` hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Connection opened locally
    ConnectionLocalOpen,
    /// Peer opened the connection
    ConnectionRemoteOpen,
    /// Connection closed locally
    ConnectionLocalClose,
    /// Peer closed the connection
    ConnectionRemoteClose,
    /// Connection is being destroyed
    ConnectionFinal,
    /// Session opened locally
    SessionLocalOpen,
    /// Peer opened the session
    SessionRemoteOpen,
    /// Session closed locally
    SessionLocalClose,
    /// Peer closed the session
    SessionRemoteClose,
    /// Session is being destroyed
    SessionFinal,
    /// Link opened locally
    LinkLocalOpen,
    /// Peer opened the link
    LinkRemoteOpen,
    /// Link closed locally
    LinkLocalClose,
    /// Peer closed the link
    LinkRemoteClose,
    /// Link credit or drain state changed
    LinkFlow,
    /// Link is being destroyed
    LinkFinal,
    /// Delivery content or remote state changed
    Delivery,
    /// Transaction declared by the coordinator
    TransactionDeclared,
    /// Transaction committed
    TransactionCommitted,
    /// Transaction aborted
    TransactionAborted,
    /// Coordinator refused to declare the transaction
    TransactionDeclareFailed,
    /// Coordinator refused to commit the transaction
    TransactionCommitFailed,
}

impl EventType {
    /// Name of the handler hook this event is delivered to.
    pub fn hook_name(self) -> &'static str {
        match self {
            Self::ConnectionLocalOpen => "on_connection_local_open",
            Self::ConnectionRemoteOpen => "on_connection_remote_open",
            Self::ConnectionLocalClose => "on_connection_local_close",
            Self::ConnectionRemoteClose => "on_connection_remote_close",
            Self::ConnectionFinal => "on_connection_final",
            Self::SessionLocalOpen => "on_session_local_open",
            Self::SessionRemoteOpen => "on_session_remote_open",
            Self::SessionLocalClose => "on_session_local_close",
            Self::SessionRemoteClose => "on_session_remote_close",
            Self::SessionFinal => "on_session_final",
            Self::LinkLocalOpen => "on_link_local_open",
            Self::LinkRemoteOpen => "on_link_remote_open",
            Self::LinkLocalClose => "on_link_local_close",
            Self::LinkRemoteClose => "on_link_remote_close",
            Self::LinkFlow => "on_link_flow",
            Self::LinkFinal => "on_link_final",
            Self::Delivery => "on_delivery",
            Self::TransactionDeclared => "on_transaction_declared",
            Self::TransactionCommitted => "on_transaction_committed",
            Self::TransactionAborted => "on_transaction_aborted",
            Self::TransactionDeclareFailed => "on_transaction_declare_failed",
            Self::TransactionCommitFailed => "on_transaction_commit_failed",
        }
    }

    /// True for the terminal teardown events that are never routed.
    pub fn is_final(self) -> bool {
        matches!(self, Self::ConnectionFinal | Self::SessionFinal | Self::LinkFinal)
    }

    /// Endpoint kind for endpoint lifecycle events.
    pub fn endpoint_kind(self) -> Option<EndpointKind> {
        match self {
            Self::ConnectionLocalOpen
            | Self::ConnectionRemoteOpen
            | Self::ConnectionLocalClose
            | Self::ConnectionRemoteClose
            | Self::ConnectionFinal => Some(EndpointKind::Connection),
            Self::SessionLocalOpen
            | Self::SessionRemoteOpen
            | Self::SessionLocalClose
            | Self::SessionRemoteClose
            | Self::SessionFinal => Some(EndpointKind::Session),
            Self::LinkLocalOpen
            | Self::LinkRemoteOpen
            | Self::LinkLocalClose
            | Self::LinkRemoteClose
            | Self::LinkFlow
            | Self::LinkFinal => Some(EndpointKind::Link),
            Self::Delivery
            | Self::TransactionDeclared
            | Self::TransactionCommitted
            | Self::TransactionAborted
            | Self::TransactionDeclareFailed
            | Self::TransactionCommitFailed => None,
        }
    }
}

/// One engine event and the objects it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    kind: EventType,
    /// Connection the event concerns
    pub connection: Option<ConnectionId>,
    /// Session the event concerns
    pub session: Option<SessionId>,
    /// Link the event concerns
    pub link: Option<LinkId>,
    /// Delivery the event concerns
    pub delivery: Option<DeliveryId>,
    /// Transaction attached during dispatch
    pub transaction: Option<TransactionId>,
    /// Message decoded during dispatch
    pub message: Option<Message>,
}

impl Event {
    /// Event with no object references.
    pub fn new(kind: EventType) -> Self {
        Self {
            kind,
            connection: None,
            session: None,
            link: None,
            delivery: None,
            transaction: None,
            message: None,
        }
    }

    /// Event concerning a connection.
    pub fn for_connection(kind: EventType, connection: ConnectionId) -> Self {
        Self::new(kind).with_connection(connection)
    }

    /// Event concerning a session and its connection.
    pub fn for_session(kind: EventType, connection: ConnectionId, session: SessionId) -> Self {
        Self::for_connection(kind, connection).with_session(session)
    }

    /// Event concerning a link and its session and connection.
    pub fn for_link(
        kind: EventType,
        connection: ConnectionId,
        session: SessionId,
        link: LinkId,
    ) -> Self {
        Self::for_session(kind, connection, session).with_link(link)
    }

    /// Delivery event with the full object path.
    pub fn for_delivery(
        connection: ConnectionId,
        session: SessionId,
        link: LinkId,
        delivery: DeliveryId,
    ) -> Self {
        Self::for_link(EventType::Delivery, connection, session, link).with_delivery(delivery)
    }

    /// Event kind.
    pub fn kind(&self) -> EventType {
        self.kind
    }

    /// Set the connection reference.
    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionId) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Set the session reference.
    #[must_use]
    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }

    /// Set the link reference.
    #[must_use]
    pub fn with_link(mut self, link: LinkId) -> Self {
        self.link = Some(link);
        self
    }

    /// Set the delivery reference.
    #[must_use]
    pub fn with_delivery(mut self, delivery: DeliveryId) -> Self {
        self.delivery = Some(delivery);
        self
    }

    /// Attach a transaction.
    #[must_use]
    pub fn with_transaction(mut self, transaction: TransactionId) -> Self {
        self.transaction = Some(transaction);
        self
    }

    /// Attach a decoded message.
    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }

    /// Scopes this event concerns, innermost first.
    pub fn scopes(&self) -> Vec<Scope> {
        let mut scopes = Vec::with_capacity(4);
        scopes.extend(self.delivery.map(Scope::Delivery));
        scopes.extend(self.link.map(Scope::Link));
        scopes.extend(self.session.map(Scope::Session));
        scopes.extend(self.connection.map(Scope::Connection));
        scopes
    }

    /// The endpoint a lifecycle event is about.
    ///
    /// # Errors
    ///
    /// Returns `MissingContext` if the event is not an endpoint event or lacks
    /// the matching reference.
    pub fn endpoint(&self) -> Result<EndpointRef> {
        match self.kind.endpoint_kind() {
            Some(EndpointKind::Connection) => {
                self.require_connection().map(EndpointRef::Connection)
            },
            Some(EndpointKind::Session) => self.require_session().map(EndpointRef::Session),
            Some(EndpointKind::Link) => self.require_link().map(EndpointRef::Link),
            None => Err(CourierError::MissingContext { event: self.kind, scope: "endpoint" }),
        }
    }

    /// Connection reference, or `MissingContext`.
    pub fn require_connection(&self) -> Result<ConnectionId> {
        self.connection
            .ok_or(CourierError::MissingContext { event: self.kind, scope: "connection" })
    }

    /// Session reference, or `MissingContext`.
    pub fn require_session(&self) -> Result<SessionId> {
        self.session.ok_or(CourierError::MissingContext { event: self.kind, scope: "session" })
    }

    /// Link reference, or `MissingContext`.
    pub fn require_link(&self) -> Result<LinkId> {
        self.link.ok_or(CourierError::MissingContext { event: self.kind, scope: "link" })
    }

    /// Delivery reference, or `MissingContext`.
    pub fn require_delivery(&self) -> Result<DeliveryId> {
        self.delivery.ok_or(CourierError::MissingContext { event: self.kind, scope: "delivery" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_are_innermost_first() {
        let event = Event::for_delivery(ConnectionId(1), SessionId(2), LinkId(3), DeliveryId(4));

        assert_eq!(
            event.scopes(),
            vec![
                Scope::Delivery(DeliveryId(4)),
                Scope::Link(LinkId(3)),
                Scope::Session(SessionId(2)),
                Scope::Connection(ConnectionId(1)),
            ]
        );
    }

    #[test]
    fn scopes_skip_missing_references() {
        let event = Event::new(EventType::Delivery)
            .with_delivery(DeliveryId(9))
            .with_connection(ConnectionId(1));

        assert_eq!(
            event.scopes(),
            vec![Scope::Delivery(DeliveryId(9)), Scope::Connection(ConnectionId(1))]
        );
    }

    #[test]
    fn only_teardown_events_are_final() {
        assert!(EventType::ConnectionFinal.is_final());
        assert!(EventType::SessionFinal.is_final());
        assert!(EventType::LinkFinal.is_final());
        assert!(!EventType::LinkRemoteClose.is_final());
        assert!(!EventType::Delivery.is_final());
    }

    #[test]
    fn endpoint_follows_event_kind() {
        let event =
            Event::for_link(EventType::LinkRemoteOpen, ConnectionId(1), SessionId(2), LinkId(3));
        assert_eq!(event.endpoint().unwrap(), EndpointRef::Link(LinkId(3)));

        let event = Event::for_link(
            EventType::SessionRemoteOpen,
            ConnectionId(1),
            SessionId(2),
            LinkId(3),
        );
        assert_eq!(event.endpoint().unwrap(), EndpointRef::Session(SessionId(2)));
    }

    #[test]
    fn missing_reference_is_reported() {
        let event = Event::new(EventType::LinkFlow);

        assert!(matches!(
            event.require_link(),
            Err(CourierError::MissingContext { event: EventType::LinkFlow, scope: "link" })
        ));
        assert!(event.endpoint().is_err());
    }

    #[test]
    fn hook_names() {
        assert_eq!(EventType::LinkRemoteOpen.hook_name(), "on_link_remote_open");
        assert_eq!(EventType::Delivery.hook_name(), "on_delivery");
        assert_eq!(
            EventType::TransactionDeclareFailed.hook_name(),
            "on_transaction_declare_failed"
        );
    }
}
