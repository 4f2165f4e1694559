//! Transactional client integration tests.
//!
//! A coordinator link carries declare and discharge deliveries. Their
//! settlement is handed to the engine's transaction coordinator before the
//! delegate hears `on_settled`, and the coordinator's verdict comes back as a
//! transaction lifecycle event.

use std::rc::Rc;

use courier_core::{
    Delegate, DeliveryId, Disposition, Engine, Handler, LinkId, MessagingConfig, Scope,
    TransactionId, TransactionalAcking, TransactionalClientHandler,
};
use courier_harness::{EngineCall, Entry, Journal, Reactor, RecordingDelegate, init_tracing};

struct Fixture {
    reactor: Reactor,
    journal: Journal,
    handler: Rc<TransactionalClientHandler>,
    coordinator: LinkId,
    receiver: LinkId,
    sender: LinkId,
}

impl Fixture {
    fn new() -> Self {
        init_tracing();

        let mut reactor = Reactor::default();
        let journal = reactor.engine().journal();
        let delegate: Rc<dyn Delegate> = Rc::new(RecordingDelegate::all(journal.clone()));
        let handler = Rc::new(TransactionalClientHandler::new(
            MessagingConfig::transactional(),
            Some(delegate),
        ));

        let engine = reactor.engine_mut();
        let connection = engine.connection();
        let session = engine.session(connection).unwrap();
        let coordinator = engine.sender(session).unwrap();
        let receiver = engine.receiver(session).unwrap();
        let sender = engine.sender(session).unwrap();
        engine.attach(Scope::Connection(connection), vec![Rc::clone(&handler) as Rc<dyn Handler>]);

        Self { reactor, journal, handler, coordinator, receiver, sender }
    }

    fn peer_settles(&mut self, delivery: DeliveryId, state: Disposition) {
        self.reactor.engine_mut().remote_update(delivery, Some(state), true).unwrap();
        self.reactor.process().unwrap();
    }

    fn declared(&mut self) -> TransactionId {
        let (transaction, delivery) = self.reactor.engine_mut().declare(self.coordinator).unwrap();
        self.peer_settles(delivery, Disposition::Accepted);
        self.journal.clear();
        transaction
    }

    fn receive(&mut self, body: &[u8]) -> DeliveryId {
        let delivery = self.reactor.engine_mut().transfer(self.receiver, body, false).unwrap();
        self.reactor.process().unwrap();
        delivery
    }

    fn locally_settled(&self, delivery: DeliveryId) -> bool {
        self.reactor.engine().delivery(delivery).unwrap().locally_settled
    }
}

#[test]
fn declare_outcome_precedes_settled_hook() {
    let mut f = Fixture::new();

    let (transaction, delivery) = f.reactor.engine_mut().declare(f.coordinator).unwrap();
    f.peer_settles(delivery, Disposition::Accepted);

    assert_eq!(
        f.journal.hooks(),
        vec!["on_accepted", "on_settled", "on_transaction_declared"]
    );
    let outcome = f
        .journal
        .position(&Entry::Call(EngineCall::TransactionOutcome { transaction, delivery }))
        .unwrap();
    let settled = f.journal.position(&Entry::Hook("on_settled")).unwrap();
    assert!(outcome < settled);
    assert!(f.locally_settled(delivery));
}

#[test]
fn refused_declare_reports_declare_failed() {
    let mut f = Fixture::new();

    let (_, delivery) = f.reactor.engine_mut().declare(f.coordinator).unwrap();
    f.peer_settles(delivery, Disposition::Rejected);

    assert_eq!(
        f.journal.hooks(),
        vec!["on_rejected", "on_settled", "on_transaction_declare_failed"]
    );
}

#[test]
fn commit_settles_transactionally_accepted_deliveries() {
    let mut f = Fixture::new();
    let transaction = f.declared();

    let received = f.receive(b"work");
    assert!(!f.locally_settled(received));

    f.handler.accept(received, transaction, f.reactor.engine_mut()).unwrap();
    let info = f.reactor.engine().delivery(received).unwrap();
    assert_eq!(info.local_state, Some(Disposition::Accepted));
    assert!(!info.locally_settled);
    assert_eq!(f.reactor.engine().transaction_accepts(transaction), vec![received]);

    let discharge = f.reactor.engine_mut().discharge(transaction, f.coordinator, true).unwrap();
    f.peer_settles(discharge, Disposition::Accepted);

    assert_eq!(f.journal.count("on_transaction_committed"), 1);
    assert!(f.locally_settled(received));
}

#[test]
fn abort_reports_aborted() {
    let mut f = Fixture::new();
    let transaction = f.declared();

    let discharge = f.reactor.engine_mut().discharge(transaction, f.coordinator, false).unwrap();
    f.peer_settles(discharge, Disposition::Accepted);

    assert_eq!(
        f.journal.hooks(),
        vec!["on_accepted", "on_settled", "on_transaction_aborted"]
    );
}

#[test]
fn refused_commit_leaves_work_unsettled() {
    let mut f = Fixture::new();
    let transaction = f.declared();

    let received = f.receive(b"work");
    f.handler.accept(received, transaction, f.reactor.engine_mut()).unwrap();

    let discharge = f.reactor.engine_mut().discharge(transaction, f.coordinator, true).unwrap();
    f.peer_settles(discharge, Disposition::Rejected);

    assert_eq!(f.journal.count("on_transaction_commit_failed"), 1);
    assert_eq!(f.journal.count("on_transaction_committed"), 0);
    assert!(!f.locally_settled(received));
}

#[test]
fn transactional_message_consults_coordinator_without_event() {
    let mut f = Fixture::new();
    let transaction = f.declared();

    let delivery =
        f.reactor.engine_mut().send_in_transaction(f.sender, &b"order"[..], transaction).unwrap();
    f.peer_settles(delivery, Disposition::Accepted);

    assert!(
        f.journal
            .calls()
            .contains(&EngineCall::TransactionOutcome { transaction, delivery })
    );
    assert_eq!(f.journal.hooks(), vec!["on_accepted", "on_settled"]);
}

#[test]
fn plain_delivery_skips_coordinator() {
    let mut f = Fixture::new();

    let delivery = f.reactor.engine_mut().send(f.sender, &b"plain"[..]).unwrap();
    f.peer_settles(delivery, Disposition::Accepted);

    assert!(
        !f.journal
            .calls()
            .iter()
            .any(|call| matches!(call, EngineCall::TransactionOutcome { .. }))
    );
    assert_eq!(f.journal.hooks(), vec!["on_accepted", "on_settled"]);
}

#[test]
fn received_messages_are_not_auto_accepted() {
    let mut f = Fixture::new();

    let received = f.receive(b"hold");

    assert_eq!(f.journal.hooks(), vec!["on_message"]);
    assert_eq!(f.reactor.engine().delivery(received).unwrap().local_state, None);
}
