//! Model-based property tests.
//!
//! Random interleavings of local and peer actions are applied to one link
//! and processed through the full messaging chain. Whatever the order:
//! - `on_link_opened` fires at most once
//! - `on_link_closing` fires at most once, and never after `on_link_closed`
//! - neither state axis moves backwards
//! - a receiving link's credit is topped up to the window while it is open

use std::rc::Rc;

use courier_core::{
    Delegate, EndpointRef, EndpointState, EndpointStatus, Engine, ErrorCondition, FlowController,
    Handler, Hooks, LinkId, MessagingConfig, MessagingHandler, Scope,
};
use courier_harness::{EngineCall, Journal, Reactor, RecordingDelegate};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Operation {
    LocalOpen,
    RemoteOpen,
    LocalClose,
    RemoteClose { error: bool },
    Transfer,
    RemoteFlow,
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        Just(Operation::LocalOpen),
        Just(Operation::RemoteOpen),
        Just(Operation::LocalClose),
        any::<bool>().prop_map(|error| Operation::RemoteClose { error }),
        Just(Operation::Transfer),
        Just(Operation::RemoteFlow),
    ]
}

struct RealWorld {
    reactor: Reactor,
    journal: Journal,
    link: LinkId,
}

impl RealWorld {
    fn new(prefetch: u32) -> Self {
        let mut reactor = Reactor::default();
        let journal = reactor.engine().journal();
        let delegate: Rc<dyn Delegate> = Rc::new(RecordingDelegate::new(
            Hooks::LINK_LIFECYCLE | Hooks::MESSAGE,
            journal.clone(),
        ));
        let config = MessagingConfig { prefetch, ..MessagingConfig::default() };
        let handler: Rc<dyn Handler> = Rc::new(MessagingHandler::new(config, Some(delegate)));

        let engine = reactor.engine_mut();
        let connection = engine.connection();
        let session = engine.session(connection).unwrap();
        let link = engine.receiver(session).unwrap();
        engine.attach(Scope::Connection(connection), vec![handler]);

        Self { reactor, journal, link }
    }

    /// Apply one action. Actions the engine refuses (reopening a closed
    /// axis, transferring on a closed link) are skipped.
    fn apply(&mut self, op: &Operation) {
        let endpoint = EndpointRef::Link(self.link);
        let engine = self.reactor.engine_mut();
        let status = engine.endpoint_status(endpoint).unwrap();

        let _ = match op {
            Operation::LocalOpen => engine.open(endpoint),
            Operation::RemoteOpen => engine.remote_open(endpoint),
            Operation::LocalClose => engine.close(endpoint),
            Operation::RemoteClose { error } => {
                let condition = error.then(|| ErrorCondition::new("amqp:internal-error"));
                engine.remote_close(endpoint, condition)
            },
            Operation::Transfer if status.remote != EndpointState::Closed => {
                engine.transfer(self.link, b"payload", false).map(drop)
            },
            Operation::Transfer => Ok(()),
            Operation::RemoteFlow => engine.remote_flow(self.link, 0),
        };
    }

    fn credit(&self) -> u32 {
        self.reactor.engine().credit(self.link).unwrap()
    }

    fn status(&self) -> EndpointStatus {
        self.reactor.engine().endpoint_status(EndpointRef::Link(self.link)).unwrap()
    }
}

proptest! {
    #[test]
    fn lifecycle_hooks_fire_once_in_any_order(
        ops in prop::collection::vec(operation(), 1..40),
    ) {
        let mut world = RealWorld::new(10);
        let mut previous = world.status();

        for op in &ops {
            world.apply(op);
            world.reactor.process().unwrap();

            let current = world.status();
            prop_assert!(current.local >= previous.local, "local axis regressed after {:?}", op);
            prop_assert!(current.remote >= previous.remote, "remote axis regressed after {:?}", op);
            if current.local == EndpointState::Active {
                prop_assert_eq!(world.credit(), 10, "credit below window after {:?}", op);
            }
            previous = current;

            prop_assert!(world.journal.count("on_link_opened") <= 1);
            prop_assert!(world.journal.count("on_link_opening") <= 1);
            prop_assert!(world.journal.count("on_link_closing") <= 1);
        }

        let hooks = world.journal.hooks();
        if let Some(closed) = hooks.iter().position(|hook| *hook == "on_link_closed") {
            prop_assert!(!hooks[closed..].contains(&"on_link_closing"));
        }
    }

    #[test]
    fn credit_is_topped_up_to_window(window in 0u32..64, credit in 0u32..128) {
        let mut world = RealWorld::new(1);
        let link = world.link;
        let connection = world.reactor.engine().owning_connection(EndpointRef::Link(link)).unwrap();
        world.reactor.engine_mut().detach(Scope::Connection(connection));
        world.reactor.engine_mut().attach(
            Scope::Link(link),
            vec![Rc::new(FlowController::new(window)) as Rc<dyn Handler>],
        );

        world.reactor.engine_mut().flow(link, credit).unwrap();
        world.journal.clear();
        world.reactor.engine_mut().remote_flow(link, 0).unwrap();
        world.reactor.process().unwrap();

        let expected = window.saturating_sub(credit);
        prop_assert_eq!(world.journal.calls(), vec![EngineCall::Flow { link, credit: expected }]);
        prop_assert_eq!(world.reactor.engine().credit(link).unwrap(), window.max(credit));
    }
}
