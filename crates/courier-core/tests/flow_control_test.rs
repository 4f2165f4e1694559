//! Credit window integration tests.

use std::rc::Rc;

use courier_core::{EndpointRef, Engine, FlowController, LinkId, Scope};
use courier_harness::{EngineCall, Journal, Reactor, init_tracing};

fn setup(window: u32) -> (Reactor, Journal, LinkId, LinkId) {
    init_tracing();

    let mut reactor = Reactor::default();
    let journal = reactor.engine().journal();
    let engine = reactor.engine_mut();
    let connection = engine.connection();
    let session = engine.session(connection).unwrap();
    let receiver = engine.receiver(session).unwrap();
    let sender = engine.sender(session).unwrap();
    engine.attach(Scope::Session(session), vec![Rc::new(FlowController::new(window))]);

    (reactor, journal, receiver, sender)
}

#[test]
fn flow_tops_up_to_window() {
    let (mut reactor, journal, link, _) = setup(10);
    reactor.engine_mut().flow(link, 3).unwrap();
    journal.clear();

    reactor.engine_mut().remote_flow(link, 0).unwrap();
    reactor.process().unwrap();

    assert_eq!(journal.calls(), vec![EngineCall::Flow { link, credit: 7 }]);
    assert_eq!(reactor.engine().credit(link).unwrap(), 10);
}

#[test]
fn full_window_issues_zero_flow() {
    let (mut reactor, journal, link, _) = setup(5);
    reactor.engine_mut().flow(link, 5).unwrap();
    journal.clear();

    reactor.engine_mut().remote_flow(link, 0).unwrap();
    reactor.process().unwrap();

    assert_eq!(journal.calls(), vec![EngineCall::Flow { link, credit: 0 }]);
}

#[test]
fn excess_credit_is_clamped() {
    let (mut reactor, journal, link, _) = setup(2);
    reactor.engine_mut().flow(link, 8).unwrap();
    journal.clear();

    reactor.engine_mut().remote_flow(link, 0).unwrap();
    reactor.process().unwrap();

    assert_eq!(journal.calls(), vec![EngineCall::Flow { link, credit: 0 }]);
    assert_eq!(reactor.engine().credit(link).unwrap(), 8);
}

#[test]
fn local_open_grants_initial_window() {
    let (mut reactor, journal, link, _) = setup(4);
    let endpoint = EndpointRef::Link(link);

    reactor.engine_mut().open(endpoint).unwrap();
    reactor.process().unwrap();

    let expected = vec![EngineCall::Open(endpoint), EngineCall::Flow { link, credit: 4 }];
    assert_eq!(journal.calls(), expected);
    assert_eq!(reactor.engine().credit(link).unwrap(), 4);
}

#[test]
fn remote_open_grants_initial_window() {
    let (mut reactor, journal, link, _) = setup(4);

    reactor.engine_mut().remote_open(EndpointRef::Link(link)).unwrap();
    reactor.process().unwrap();

    assert_eq!(journal.calls(), vec![EngineCall::Flow { link, credit: 4 }]);
}

#[test]
fn each_transfer_replenishes_consumed_credit() {
    let (mut reactor, journal, link, _) = setup(3);
    reactor.engine_mut().flow(link, 3).unwrap();
    journal.clear();

    reactor.engine_mut().transfer(link, b"one", false).unwrap();
    reactor.engine_mut().transfer(link, b"two", false).unwrap();
    reactor.process().unwrap();

    // Both transfers consumed credit before either event was handled.
    assert_eq!(
        journal.calls(),
        vec![EngineCall::Flow { link, credit: 2 }, EngineCall::Flow { link, credit: 0 }]
    );
    assert_eq!(reactor.engine().credit(link).unwrap(), 3);
}

#[test]
fn sending_links_are_ignored() {
    let (mut reactor, journal, _, sender) = setup(10);

    reactor.engine_mut().remote_open(EndpointRef::Link(sender)).unwrap();
    reactor.engine_mut().remote_flow(sender, 5).unwrap();
    reactor.process().unwrap();

    assert!(journal.calls().is_empty());
}

#[test]
fn released_delivery_is_skipped() {
    let (mut reactor, journal, link, _) = setup(10);

    let delivery = reactor.engine_mut().transfer(link, b"gone", false).unwrap();
    reactor.engine_mut().release(delivery).unwrap();
    reactor.process().unwrap();

    assert!(journal.calls().is_empty());
}
