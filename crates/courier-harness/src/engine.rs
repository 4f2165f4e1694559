//! In-memory engine.
//!
//! Holds the object model (connections, sessions, links, deliveries,
//! transactions), the chains attached to them and a FIFO event queue. Local
//! calls made by handlers go through the [`Engine`] trait and are journaled;
//! the peer is simulated with the `remote_*` and `transfer*` methods, which
//! queue the events a real engine would raise.
//!
//! Local flow and settle calls raise no events, matching real engines where
//! only peer frames produce flow and delivery events.

use std::{
    collections::{HashMap, VecDeque},
    rc::Rc,
};

use bytes::{Bytes, BytesMut};
use courier_core::{
    Chain, ConnectionId, DeliveryId, DeliveryInfo, Disposition, Engine, EngineError, EndpointKind,
    EndpointRef, EndpointState, EndpointStatus, ErrorCondition, Event, EventType, Handler, LinkId,
    LinkInfo, Message, Role, Scope, SessionId, TransactionId,
};
use tracing::{debug, trace};

use crate::journal::{EngineCall, Entry, Journal};

#[derive(Debug)]
struct ConnectionRecord {
    status: EndpointStatus,
}

#[derive(Debug)]
struct SessionRecord {
    connection: ConnectionId,
    status: EndpointStatus,
}

#[derive(Debug)]
struct LinkRecord {
    session: SessionId,
    role: Role,
    credit: u32,
    address: Option<String>,
    status: EndpointStatus,
}

#[derive(Debug)]
struct DeliveryRecord {
    info: DeliveryInfo,
    content: BytesMut,
}

#[derive(Debug, Default)]
struct TransactionRecord {
    declare: Option<DeliveryId>,
    discharge: Option<(DeliveryId, bool)>,
    accepted: Vec<DeliveryId>,
}

#[derive(Debug, Clone, Copy)]
enum Transition {
    LocalOpen,
    RemoteOpen,
    LocalClose,
    RemoteClose,
    Final,
}

fn lifecycle_event(kind: EndpointKind, transition: Transition) -> EventType {
    use EndpointKind::{Connection, Link, Session};
    use Transition::{Final, LocalClose, LocalOpen, RemoteClose, RemoteOpen};

    match (kind, transition) {
        (Connection, LocalOpen) => EventType::ConnectionLocalOpen,
        (Connection, RemoteOpen) => EventType::ConnectionRemoteOpen,
        (Connection, LocalClose) => EventType::ConnectionLocalClose,
        (Connection, RemoteClose) => EventType::ConnectionRemoteClose,
        (Connection, Final) => EventType::ConnectionFinal,
        (Session, LocalOpen) => EventType::SessionLocalOpen,
        (Session, RemoteOpen) => EventType::SessionRemoteOpen,
        (Session, LocalClose) => EventType::SessionLocalClose,
        (Session, RemoteClose) => EventType::SessionRemoteClose,
        (Session, Final) => EventType::SessionFinal,
        (Link, LocalOpen) => EventType::LinkLocalOpen,
        (Link, RemoteOpen) => EventType::LinkRemoteOpen,
        (Link, LocalClose) => EventType::LinkLocalClose,
        (Link, RemoteClose) => EventType::LinkRemoteClose,
        (Link, Final) => EventType::LinkFinal,
    }
}

/// Deterministic in-memory engine.
#[derive(Default)]
pub struct MemoryEngine {
    next_id: u64,
    connections: HashMap<ConnectionId, ConnectionRecord>,
    sessions: HashMap<SessionId, SessionRecord>,
    links: HashMap<LinkId, LinkRecord>,
    deliveries: HashMap<DeliveryId, DeliveryRecord>,
    transactions: HashMap<TransactionId, TransactionRecord>,
    chains: HashMap<Scope, Chain>,
    events: VecDeque<Event>,
    journal: Journal,
}

impl MemoryEngine {
    /// Empty engine with its own journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Journal shared with recording delegates.
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // Object creation

    /// Create a connection with both axes uninitialized.
    pub fn connection(&mut self) -> ConnectionId {
        let id = ConnectionId(self.next_id());
        self.connections.insert(id, ConnectionRecord { status: EndpointStatus::default() });
        id
    }

    /// Create a session on `connection`.
    pub fn session(&mut self, connection: ConnectionId) -> Result<SessionId, EngineError> {
        if !self.connections.contains_key(&connection) {
            return Err(EngineError::UnknownConnection(connection));
        }
        let id = SessionId(self.next_id());
        self.sessions.insert(id, SessionRecord { connection, status: EndpointStatus::default() });
        Ok(id)
    }

    /// Create a sending link on `session`.
    pub fn sender(&mut self, session: SessionId) -> Result<LinkId, EngineError> {
        self.link_with_role(session, Role::Sender)
    }

    /// Create a receiving link on `session`.
    pub fn receiver(&mut self, session: SessionId) -> Result<LinkId, EngineError> {
        self.link_with_role(session, Role::Receiver)
    }

    fn link_with_role(&mut self, session: SessionId, role: Role) -> Result<LinkId, EngineError> {
        if !self.sessions.contains_key(&session) {
            return Err(EngineError::UnknownSession(session));
        }
        let id = LinkId(self.next_id());
        let record = LinkRecord {
            session,
            role,
            credit: 0,
            address: None,
            status: EndpointStatus::default(),
        };
        self.links.insert(id, record);
        Ok(id)
    }

    /// Set the address stamped on messages read from `link`.
    pub fn set_address(
        &mut self,
        link: LinkId,
        address: impl Into<String>,
    ) -> Result<(), EngineError> {
        self.link_record_mut(link)?.address = Some(address.into());
        Ok(())
    }

    // Chain attachment

    /// Attach `chain` to `scope`, replacing any previous chain.
    pub fn attach(&mut self, scope: Scope, chain: Chain) {
        self.chains.insert(scope, chain);
    }

    /// Append one handler to the chain of `scope`.
    pub fn attach_handler(&mut self, scope: Scope, handler: Rc<dyn Handler>) {
        self.chains.entry(scope).or_default().push(handler);
    }

    /// Remove the chain of `scope`.
    pub fn detach(&mut self, scope: Scope) -> Option<Chain> {
        self.chains.remove(&scope)
    }

    // Event queue

    /// Next queued event.
    pub fn pop_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Number of queued events.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Queue an arbitrary event.
    pub fn push_event(&mut self, event: Event) {
        self.events.push_back(event);
    }

    // Peer simulation

    /// The peer opens `endpoint`.
    pub fn remote_open(&mut self, endpoint: EndpointRef) -> Result<(), EngineError> {
        let changed = self.status_mut(endpoint)?.remote.advance(endpoint, EndpointState::Active)?;
        if changed {
            self.queue_lifecycle(endpoint, Transition::RemoteOpen)?;
        }
        Ok(())
    }

    /// The peer closes `endpoint`, optionally with an error condition.
    pub fn remote_close(
        &mut self,
        endpoint: EndpointRef,
        condition: Option<ErrorCondition>,
    ) -> Result<(), EngineError> {
        let status = self.status_mut(endpoint)?;
        let changed = status.remote.advance(endpoint, EndpointState::Closed)?;
        if changed {
            status.remote_condition = condition;
            self.queue_lifecycle(endpoint, Transition::RemoteClose)?;
        }
        Ok(())
    }

    /// The engine destroys `endpoint`, raising its final event.
    pub fn free(&mut self, endpoint: EndpointRef) -> Result<(), EngineError> {
        self.queue_lifecycle(endpoint, Transition::Final)
    }

    /// The peer sends a flow frame. On a sending link the peer's grant
    /// replaces the current credit; on a receiving link credit is unchanged.
    pub fn remote_flow(&mut self, link: LinkId, credit: u32) -> Result<(), EngineError> {
        let record = self.link_record_mut(link)?;
        if record.role == Role::Sender {
            record.credit = credit;
        }
        let event = self.link_event(EventType::LinkFlow, link)?;
        self.events.push_back(event);
        Ok(())
    }

    /// The peer transfers a new delivery on a receiving link.
    pub fn transfer(
        &mut self,
        link: LinkId,
        content: &[u8],
        partial: bool,
    ) -> Result<DeliveryId, EngineError> {
        let record = self.link_record_mut(link)?;
        if record.role != Role::Receiver {
            return Err(EngineError::WrongRole { link, expected: "receiver" });
        }
        record.credit = record.credit.saturating_sub(1);

        let id = DeliveryId(self.next_id());
        let mut info = new_delivery(link);
        info.pending = content.len();
        info.readable = !content.is_empty();
        info.partial = partial;
        self.deliveries.insert(id, DeliveryRecord { info, content: BytesMut::from(content) });

        trace!(delivery = %id, %link, bytes = content.len(), partial, "transfer");
        self.queue_delivery(id)?;
        Ok(id)
    }

    /// The peer sends more content for a partial delivery.
    pub fn transfer_more(
        &mut self,
        delivery: DeliveryId,
        content: &[u8],
        partial: bool,
    ) -> Result<(), EngineError> {
        let record = self.delivery_record_mut(delivery)?;
        record.content.extend_from_slice(content);
        record.info.pending = record.content.len();
        record.info.readable = !record.content.is_empty();
        record.info.partial = partial;
        self.queue_delivery(delivery)
    }

    /// The peer updates the remote disposition and/or settles a delivery.
    pub fn remote_update(
        &mut self,
        delivery: DeliveryId,
        state: Option<Disposition>,
        settled: bool,
    ) -> Result<(), EngineError> {
        let info = &mut self.delivery_record_mut(delivery)?.info;
        if state.is_some() {
            info.remote_state = state;
        }
        info.settled |= settled;
        info.updated = true;
        self.queue_delivery(delivery)
    }

    /// The engine frees a delivery.
    pub fn release(&mut self, delivery: DeliveryId) -> Result<(), EngineError> {
        self.delivery_record_mut(delivery)?.info.released = true;
        Ok(())
    }

    /// Clear the `updated` flag once an event for the delivery is processed.
    pub fn clear_updated(&mut self, delivery: DeliveryId) -> Result<(), EngineError> {
        self.delivery_record_mut(delivery)?.info.updated = false;
        Ok(())
    }

    // Local sending

    /// Send `body` on a sending link, consuming one credit.
    pub fn send(
        &mut self,
        link: LinkId,
        body: impl Into<Bytes>,
    ) -> Result<DeliveryId, EngineError> {
        self.send_with(link, body.into(), None)
    }

    /// Send `body` under `transaction`.
    pub fn send_in_transaction(
        &mut self,
        link: LinkId,
        body: impl Into<Bytes>,
        transaction: TransactionId,
    ) -> Result<DeliveryId, EngineError> {
        if !self.transactions.contains_key(&transaction) {
            return Err(EngineError::UnknownTransaction(transaction));
        }
        self.send_with(link, body.into(), Some(transaction))
    }

    fn send_with(
        &mut self,
        link: LinkId,
        body: Bytes,
        transaction: Option<TransactionId>,
    ) -> Result<DeliveryId, EngineError> {
        let record = self.link_record_mut(link)?;
        if record.role != Role::Sender {
            return Err(EngineError::WrongRole { link, expected: "sender" });
        }
        record.credit = record.credit.saturating_sub(1);

        let id = DeliveryId(self.next_id());
        let mut info = new_delivery(link);
        info.transaction = transaction;
        self.deliveries.insert(id, DeliveryRecord { info, content: BytesMut::from(&body[..]) });

        trace!(delivery = %id, %link, bytes = body.len(), "send");
        Ok(id)
    }

    // Transaction coordination

    /// Declare a transaction over the coordinator `link`.
    ///
    /// Returns the transaction and the declare delivery awaiting the peer's
    /// outcome.
    pub fn declare(
        &mut self,
        coordinator: LinkId,
    ) -> Result<(TransactionId, DeliveryId), EngineError> {
        let transaction = TransactionId(self.next_id());
        self.transactions.insert(transaction, TransactionRecord::default());

        let delivery =
            self.send_with(coordinator, Bytes::from_static(b"declare"), Some(transaction))?;
        self.transaction_record_mut(transaction)?.declare = Some(delivery);
        Ok((transaction, delivery))
    }

    /// Discharge `transaction`, committing or aborting it.
    pub fn discharge(
        &mut self,
        transaction: TransactionId,
        coordinator: LinkId,
        commit: bool,
    ) -> Result<DeliveryId, EngineError> {
        self.transaction_record_mut(transaction)?;
        let delivery =
            self.send_with(coordinator, Bytes::from_static(b"discharge"), Some(transaction))?;
        self.transaction_record_mut(transaction)?.discharge = Some((delivery, commit));
        Ok(delivery)
    }

    /// Deliveries accepted under `transaction`.
    pub fn transaction_accepts(&self, transaction: TransactionId) -> Vec<DeliveryId> {
        self.transactions
            .get(&transaction)
            .map(|record| record.accepted.clone())
            .unwrap_or_default()
    }

    // Inspection

    /// Current credit of `link`.
    pub fn credit(&self, link: LinkId) -> Result<u32, EngineError> {
        Ok(self.link_record(link)?.credit)
    }

    // Internals

    fn status(&self, endpoint: EndpointRef) -> Result<&EndpointStatus, EngineError> {
        match endpoint {
            EndpointRef::Connection(id) => self
                .connections
                .get(&id)
                .map(|record| &record.status)
                .ok_or(EngineError::UnknownConnection(id)),
            EndpointRef::Session(id) => self
                .sessions
                .get(&id)
                .map(|record| &record.status)
                .ok_or(EngineError::UnknownSession(id)),
            EndpointRef::Link(id) => self.link_record(id).map(|record| &record.status),
        }
    }

    fn status_mut(&mut self, endpoint: EndpointRef) -> Result<&mut EndpointStatus, EngineError> {
        match endpoint {
            EndpointRef::Connection(id) => self
                .connections
                .get_mut(&id)
                .map(|record| &mut record.status)
                .ok_or(EngineError::UnknownConnection(id)),
            EndpointRef::Session(id) => self
                .sessions
                .get_mut(&id)
                .map(|record| &mut record.status)
                .ok_or(EngineError::UnknownSession(id)),
            EndpointRef::Link(id) => self.link_record_mut(id).map(|record| &mut record.status),
        }
    }

    fn link_record(&self, link: LinkId) -> Result<&LinkRecord, EngineError> {
        self.links.get(&link).ok_or(EngineError::UnknownLink(link))
    }

    fn link_record_mut(&mut self, link: LinkId) -> Result<&mut LinkRecord, EngineError> {
        self.links.get_mut(&link).ok_or(EngineError::UnknownLink(link))
    }

    fn delivery_record(&self, delivery: DeliveryId) -> Result<&DeliveryRecord, EngineError> {
        self.deliveries.get(&delivery).ok_or(EngineError::UnknownDelivery(delivery))
    }

    fn delivery_record_mut(
        &mut self,
        delivery: DeliveryId,
    ) -> Result<&mut DeliveryRecord, EngineError> {
        self.deliveries.get_mut(&delivery).ok_or(EngineError::UnknownDelivery(delivery))
    }

    fn transaction_record_mut(
        &mut self,
        transaction: TransactionId,
    ) -> Result<&mut TransactionRecord, EngineError> {
        self.transactions.get_mut(&transaction).ok_or(EngineError::UnknownTransaction(transaction))
    }

    fn link_event(&self, kind: EventType, link: LinkId) -> Result<Event, EngineError> {
        let session = self.link_record(link)?.session;
        let connection = self.session_connection(session)?;
        Ok(Event::for_link(kind, connection, session, link))
    }

    fn queue_lifecycle(
        &mut self,
        endpoint: EndpointRef,
        transition: Transition,
    ) -> Result<(), EngineError> {
        let kind = lifecycle_event(endpoint.kind(), transition);
        let event = match endpoint {
            EndpointRef::Connection(connection) => {
                self.status(endpoint)?;
                Event::for_connection(kind, connection)
            },
            EndpointRef::Session(session) => {
                Event::for_session(kind, self.session_connection(session)?, session)
            },
            EndpointRef::Link(link) => self.link_event(kind, link)?,
        };

        trace!(event = kind.hook_name(), %endpoint, "queued");
        self.events.push_back(event);
        Ok(())
    }

    fn queue_delivery(&mut self, delivery: DeliveryId) -> Result<(), EngineError> {
        let link = self.delivery_record(delivery)?.info.link;
        let event = self.link_event(EventType::Delivery, link)?.with_delivery(delivery);
        self.events.push_back(event);
        Ok(())
    }

    fn settle_transaction(&mut self, transaction: TransactionId) -> Result<(), EngineError> {
        let accepted = self.transaction_accepts(transaction);
        for delivery in accepted {
            self.delivery_record_mut(delivery)?.info.locally_settled = true;
        }
        Ok(())
    }
}

fn new_delivery(link: LinkId) -> DeliveryInfo {
    DeliveryInfo {
        link,
        pending: 0,
        readable: false,
        partial: false,
        updated: false,
        settled: false,
        locally_settled: false,
        released: false,
        local_state: None,
        remote_state: None,
        transaction: None,
    }
}

impl Engine for MemoryEngine {
    fn endpoint_status(&self, endpoint: EndpointRef) -> Result<EndpointStatus, EngineError> {
        self.status(endpoint).cloned()
    }

    fn open(&mut self, endpoint: EndpointRef) -> Result<(), EngineError> {
        self.journal.record(Entry::Call(EngineCall::Open(endpoint)));
        let changed = self.status_mut(endpoint)?.local.advance(endpoint, EndpointState::Active)?;
        if changed {
            debug!(%endpoint, "local open");
            self.queue_lifecycle(endpoint, Transition::LocalOpen)?;
        }
        Ok(())
    }

    fn close(&mut self, endpoint: EndpointRef) -> Result<(), EngineError> {
        self.journal.record(Entry::Call(EngineCall::Close(endpoint)));
        let changed = self.status_mut(endpoint)?.local.advance(endpoint, EndpointState::Closed)?;
        if changed {
            debug!(%endpoint, "local close");
            self.queue_lifecycle(endpoint, Transition::LocalClose)?;
        }
        Ok(())
    }

    fn link(&self, link: LinkId) -> Result<LinkInfo, EngineError> {
        let record = self.link_record(link)?;
        Ok(LinkInfo { session: record.session, role: record.role, credit: record.credit })
    }

    fn session_connection(&self, session: SessionId) -> Result<ConnectionId, EngineError> {
        self.sessions
            .get(&session)
            .map(|record| record.connection)
            .ok_or(EngineError::UnknownSession(session))
    }

    fn flow(&mut self, link: LinkId, credit: u32) -> Result<(), EngineError> {
        self.journal.record(Entry::Call(EngineCall::Flow { link, credit }));
        let record = self.link_record_mut(link)?;
        if record.role != Role::Receiver {
            return Err(EngineError::WrongRole { link, expected: "receiver" });
        }
        record.credit = record.credit.saturating_add(credit);
        Ok(())
    }

    fn delivery(&self, delivery: DeliveryId) -> Result<DeliveryInfo, EngineError> {
        Ok(self.delivery_record(delivery)?.info.clone())
    }

    fn update(&mut self, delivery: DeliveryId, state: Disposition) -> Result<(), EngineError> {
        self.journal.record(Entry::Call(EngineCall::Update { delivery, state }));
        let info = &mut self.delivery_record_mut(delivery)?.info;
        if info.locally_settled {
            return Err(EngineError::AlreadySettled(delivery));
        }
        info.local_state = Some(state);
        Ok(())
    }

    fn settle(&mut self, delivery: DeliveryId) -> Result<(), EngineError> {
        self.journal.record(Entry::Call(EngineCall::Settle(delivery)));
        self.delivery_record_mut(delivery)?.info.locally_settled = true;
        Ok(())
    }

    fn read_message(&mut self, delivery: DeliveryId) -> Result<Message, EngineError> {
        self.journal.record(Entry::Call(EngineCall::ReadMessage(delivery)));
        let link = self.delivery_record(delivery)?.info.link;
        let address = self.link_record(link)?.address.clone();

        let record = self.delivery_record_mut(delivery)?;
        if record.info.partial {
            return Err(EngineError::Incomplete(delivery));
        }
        let body = record.content.split().freeze();
        record.info.pending = 0;
        record.info.readable = false;

        Ok(Message { address, body })
    }

    fn handlers(&self, scope: Scope) -> Option<Chain> {
        self.chains.get(&scope).cloned()
    }

    fn handle_transaction_outcome(
        &mut self,
        transaction: TransactionId,
        delivery: DeliveryId,
    ) -> Result<(), EngineError> {
        self.journal.record(Entry::Call(EngineCall::TransactionOutcome { transaction, delivery }));
        let info = self.delivery_record(delivery)?.info.clone();
        let record = self
            .transactions
            .get(&transaction)
            .ok_or(EngineError::UnknownTransaction(transaction))?;
        let accepted = info.remote_state == Some(Disposition::Accepted);

        let kind = if record.declare == Some(delivery) {
            if accepted {
                EventType::TransactionDeclared
            } else {
                EventType::TransactionDeclareFailed
            }
        } else {
            match record.discharge {
                Some((discharge, commit)) if discharge == delivery => match (accepted, commit) {
                    (true, true) => EventType::TransactionCommitted,
                    (true, false) => EventType::TransactionAborted,
                    (false, _) => EventType::TransactionCommitFailed,
                },
                _ => return Ok(()),
            }
        };

        if matches!(kind, EventType::TransactionCommitted | EventType::TransactionAborted) {
            self.settle_transaction(transaction)?;
        }

        debug!(%transaction, event = kind.hook_name(), "transaction outcome");
        let event = self.link_event(kind, info.link)?.with_transaction(transaction);
        self.events.push_back(event);
        Ok(())
    }

    fn transactional_accept(
        &mut self,
        transaction: TransactionId,
        delivery: DeliveryId,
    ) -> Result<(), EngineError> {
        self.journal.record(Entry::Call(EngineCall::TransactionalAccept { transaction, delivery }));
        if !self.transactions.contains_key(&transaction) {
            return Err(EngineError::UnknownTransaction(transaction));
        }

        let info = &mut self.delivery_record_mut(delivery)?.info;
        if info.locally_settled {
            return Err(EngineError::AlreadySettled(delivery));
        }
        info.local_state = Some(Disposition::Accepted);
        info.transaction = Some(transaction);

        self.transaction_record_mut(transaction)?.accepted.push(delivery);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn link_world() -> (MemoryEngine, ConnectionId, LinkId) {
        let mut engine = MemoryEngine::new();
        let connection = engine.connection();
        let session = engine.session(connection).unwrap();
        let link = engine.receiver(session).unwrap();
        (engine, connection, link)
    }

    #[test]
    fn local_open_queues_event_once() {
        let (mut engine, connection, link) = link_world();
        let endpoint = EndpointRef::Link(link);

        engine.open(endpoint).unwrap();
        engine.open(endpoint).unwrap();

        let event = engine.pop_event().unwrap();
        assert_eq!(event.kind(), EventType::LinkLocalOpen);
        assert_eq!(event.connection, Some(connection));
        assert_eq!(event.link, Some(link));
        assert!(engine.pop_event().is_none());
    }

    #[test]
    fn reopen_after_close_is_refused() {
        let (mut engine, _, link) = link_world();
        let endpoint = EndpointRef::Link(link);

        engine.close(endpoint).unwrap();
        assert!(matches!(engine.open(endpoint), Err(EngineError::StateRegression { .. })));
    }

    #[test]
    fn remote_close_keeps_condition() {
        let (mut engine, _, link) = link_world();
        let endpoint = EndpointRef::Link(link);

        engine.remote_close(endpoint, Some(ErrorCondition::new("amqp:not-found"))).unwrap();

        let status = engine.endpoint_status(endpoint).unwrap();
        assert_eq!(status.remote, EndpointState::Closed);
        assert_eq!(status.remote_condition, Some(ErrorCondition::new("amqp:not-found")));
    }

    #[test]
    fn partial_delivery_cannot_be_read() {
        let (mut engine, _, link) = link_world();

        let delivery = engine.transfer(link, b"half", true).unwrap();
        assert_eq!(engine.read_message(delivery), Err(EngineError::Incomplete(delivery)));

        engine.transfer_more(delivery, b" done", false).unwrap();
        let message = engine.read_message(delivery).unwrap();
        assert_eq!(&message.body[..], b"half done");
        assert!(!engine.delivery(delivery).unwrap().readable);
    }

    #[test]
    fn update_after_settle_is_refused() {
        let (mut engine, _, link) = link_world();
        let delivery = engine.transfer(link, b"x", false).unwrap();

        engine.settle(delivery).unwrap();
        engine.settle(delivery).unwrap();
        assert_eq!(
            engine.update(delivery, Disposition::Accepted),
            Err(EngineError::AlreadySettled(delivery))
        );
    }

    #[test]
    fn credit_belongs_to_receivers() {
        let (mut engine, connection, _) = link_world();
        let session = engine.session(connection).unwrap();
        let sender = engine.sender(session).unwrap();

        assert_eq!(
            engine.flow(sender, 1),
            Err(EngineError::WrongRole { link: sender, expected: "receiver" })
        );
        assert!(engine.transfer(sender, b"x", false).is_err());
    }

    #[test]
    fn calls_are_journaled() {
        let (mut engine, _, link) = link_world();
        let journal = engine.journal();

        engine.flow(link, 3).unwrap();
        engine.open(EndpointRef::Link(link)).unwrap();

        assert_eq!(
            journal.calls(),
            vec![EngineCall::Flow { link, credit: 3 }, EngineCall::Open(EndpointRef::Link(link))]
        );
    }

    proptest! {
        #[test]
        fn axes_never_move_backwards(steps in prop::collection::vec(0u8..4, 0..32)) {
            let (mut engine, _, link) = link_world();
            let endpoint = EndpointRef::Link(link);
            let mut previous = engine.endpoint_status(endpoint).unwrap();

            for step in steps {
                let _ = match step {
                    0 => engine.open(endpoint),
                    1 => engine.close(endpoint),
                    2 => engine.remote_open(endpoint),
                    _ => engine.remote_close(endpoint, None),
                };

                let current = engine.endpoint_status(endpoint).unwrap();
                prop_assert!(current.local >= previous.local);
                prop_assert!(current.remote >= previous.remote);
                previous = current;
            }
        }
    }
}
