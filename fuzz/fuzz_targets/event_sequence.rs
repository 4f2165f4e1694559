//! Arbitrary peer and local actions driven through a full messaging chain.
//!
//! Engine refusals (reopening a closed axis, unknown deliveries) are
//! expected and skipped. Handler errors are not: every queued event must
//! process cleanly, and each endpoint reports `opened` at most once.

#![no_main]

use std::rc::Rc;

use arbitrary::Arbitrary;
use courier_core::{
    Delegate, DeliveryId, Disposition, EndpointRef, Engine, ErrorCondition, Handler, Hooks,
    LinkId, MessagingConfig, MessagingHandler, Scope,
};
use courier_harness::{MemoryEngine, Reactor, RecordingDelegate};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Case {
    prefetch: u8,
    auto_accept: bool,
    auto_settle: bool,
    peer_close_is_error: bool,
    ops: Vec<Op>,
}

#[derive(Debug, Arbitrary)]
enum Target {
    Connection,
    Session,
    Receiver,
    Sender,
}

#[derive(Debug, Arbitrary)]
enum Op {
    Open(Target),
    Close(Target),
    RemoteOpen(Target),
    RemoteClose { target: Target, error: bool },
    Free(Target),
    RemoteFlow { sender: bool, credit: u8 },
    Transfer { body: Vec<u8>, partial: bool },
    TransferMore { index: u8, body: Vec<u8>, partial: bool },
    Send { body: Vec<u8> },
    RemoteUpdate { index: u8, state: u8, settled: bool },
    Release { index: u8 },
}

struct World {
    reactor: Reactor,
    connection: EndpointRef,
    session: EndpointRef,
    receiver: LinkId,
    sender: LinkId,
    deliveries: Vec<DeliveryId>,
}

impl World {
    fn new(case: &Case) -> Option<Self> {
        let mut reactor = Reactor::default();
        let journal = reactor.engine().journal();
        let delegate: Rc<dyn Delegate> = Rc::new(RecordingDelegate::new(Hooks::all(), journal));
        let config = MessagingConfig {
            prefetch: u32::from(case.prefetch),
            auto_accept: case.auto_accept,
            auto_settle: case.auto_settle,
            peer_close_is_error: case.peer_close_is_error,
        };
        let handler: Rc<dyn Handler> = Rc::new(MessagingHandler::new(config, Some(delegate)));

        let engine: &mut MemoryEngine = reactor.engine_mut();
        let connection = engine.connection();
        let session = engine.session(connection).ok()?;
        let receiver = engine.receiver(session).ok()?;
        let sender = engine.sender(session).ok()?;
        engine.attach(Scope::Connection(connection), vec![handler]);

        Some(Self {
            reactor,
            connection: EndpointRef::Connection(connection),
            session: EndpointRef::Session(session),
            receiver,
            sender,
            deliveries: Vec::new(),
        })
    }

    fn endpoint(&self, target: &Target) -> EndpointRef {
        match target {
            Target::Connection => self.connection,
            Target::Session => self.session,
            Target::Receiver => EndpointRef::Link(self.receiver),
            Target::Sender => EndpointRef::Link(self.sender),
        }
    }

    fn delivery(&self, index: u8) -> Option<DeliveryId> {
        if self.deliveries.is_empty() {
            return None;
        }
        Some(self.deliveries[usize::from(index) % self.deliveries.len()])
    }

    fn apply(&mut self, op: Op) {
        let _ = match &op {
            Op::Open(target) => {
                let endpoint = self.endpoint(target);
                self.reactor.engine_mut().open(endpoint)
            },
            Op::Close(target) => {
                let endpoint = self.endpoint(target);
                self.reactor.engine_mut().close(endpoint)
            },
            Op::RemoteOpen(target) => {
                let endpoint = self.endpoint(target);
                self.reactor.engine_mut().remote_open(endpoint)
            },
            Op::RemoteClose { target, error } => {
                let endpoint = self.endpoint(target);
                let condition = error.then(|| ErrorCondition::new("amqp:internal-error"));
                self.reactor.engine_mut().remote_close(endpoint, condition)
            },
            Op::Free(target) => {
                let endpoint = self.endpoint(target);
                self.reactor.engine_mut().free(endpoint)
            },
            Op::RemoteFlow { sender, credit } => {
                let link = if *sender { self.sender } else { self.receiver };
                self.reactor.engine_mut().remote_flow(link, u32::from(*credit))
            },
            Op::Transfer { body, partial } => {
                let delivery = self.reactor.engine_mut().transfer(self.receiver, body, *partial);
                delivery.map(|delivery| self.deliveries.push(delivery))
            },
            Op::TransferMore { index, body, partial } => match self.delivery(*index) {
                Some(delivery) => {
                    self.reactor.engine_mut().transfer_more(delivery, body, *partial)
                },
                None => Ok(()),
            },
            Op::Send { body } => {
                let delivery = self.reactor.engine_mut().send(self.sender, body.clone());
                delivery.map(|delivery| self.deliveries.push(delivery))
            },
            Op::RemoteUpdate { index, state, settled } => match self.delivery(*index) {
                Some(delivery) => {
                    let state = match state % 5 {
                        0 => Some(Disposition::Accepted),
                        1 => Some(Disposition::Rejected),
                        2 => Some(Disposition::Released),
                        3 => Some(Disposition::Modified),
                        _ => None,
                    };
                    self.reactor.engine_mut().remote_update(delivery, state, *settled)
                },
                None => Ok(()),
            },
            Op::Release { index } => match self.delivery(*index) {
                Some(delivery) => self.reactor.engine_mut().release(delivery),
                None => Ok(()),
            },
        };
    }
}

fuzz_target!(|case: Case| {
    let Some(mut world) = World::new(&case) else {
        return;
    };
    let journal = world.reactor.engine().journal();

    for op in case.ops {
        world.apply(op);
        if let Err(err) = world.reactor.process() {
            panic!("handler chain failed: {err}");
        }
    }

    // One connection, one session and two links.
    assert!(journal.count("on_connection_opened") <= 1);
    assert!(journal.count("on_session_opened") <= 1);
    assert!(journal.count("on_link_opened") <= 2);
});
