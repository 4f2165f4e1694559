//! Scoped routing integration tests.

use std::{io, rc::Rc};

use courier_core::{
    Chain, CourierError, EndpointRef, Engine, Event, EventType, Handler, LinkId, Result, Scope,
    router,
};
use courier_harness::{Entry, Journal, Reactor, RecordingHandler, init_tracing};

/// Handler owning a sub-chain.
struct Composite {
    children: Chain,
}

impl Handler for Composite {
    fn handlers(&self) -> &[Rc<dyn Handler>] {
        &self.children
    }
}

/// Handler that fails every delivery event.
struct Failing;

impl Handler for Failing {
    fn on_delivery(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        Err(CourierError::hook("on_delivery", io::Error::other("boom")))
    }
}

fn recorder(label: &str, journal: &Journal) -> Rc<RecordingHandler> {
    Rc::new(RecordingHandler::new(label, journal.clone()))
}

struct Setup {
    reactor: Reactor,
    journal: Journal,
    link: LinkId,
}

fn setup() -> Setup {
    init_tracing();

    let mut reactor = Reactor::default();
    let journal = reactor.engine().journal();
    let engine = reactor.engine_mut();
    let connection = engine.connection();
    let session = engine.session(connection).unwrap();
    let link = engine.receiver(session).unwrap();

    engine.attach_handler(Scope::Connection(connection), recorder("connection", &journal));
    engine.attach_handler(Scope::Session(session), recorder("session", &journal));
    engine.attach_handler(Scope::Link(link), recorder("link", &journal));

    Setup { reactor, journal, link }
}

fn handled(journal: &Journal) -> Vec<(String, &'static str)> {
    journal
        .entries()
        .into_iter()
        .filter_map(|entry| match entry {
            Entry::Handled { handler, hook } => Some((handler, hook)),
            _ => None,
        })
        .collect()
}

#[test]
fn innermost_scope_runs_first() {
    let mut s = setup();

    let delivery = s.reactor.engine_mut().transfer(s.link, b"x", false).unwrap();
    let handler = recorder("delivery", &s.journal);
    s.reactor.engine_mut().attach_handler(Scope::Delivery(delivery), handler);
    s.reactor.process().unwrap();

    let labels: Vec<_> = handled(&s.journal).into_iter().map(|(label, _)| label).collect();
    assert_eq!(labels, vec!["delivery", "link", "session", "connection"]);
}

#[test]
fn connection_event_reaches_only_connection_chain() {
    let mut s = setup();
    let connection = s.reactor.engine().owning_connection(EndpointRef::Link(s.link)).unwrap();

    s.reactor.engine_mut().remote_open(EndpointRef::Connection(connection)).unwrap();
    s.reactor.process().unwrap();

    assert_eq!(
        handled(&s.journal),
        vec![("connection".to_string(), "on_connection_remote_open")]
    );
}

#[test]
fn final_events_are_not_routed() {
    let mut s = setup();

    s.reactor.engine_mut().free(EndpointRef::Link(s.link)).unwrap();
    let processed = s.reactor.process().unwrap();

    assert_eq!(processed, 1);
    assert!(handled(&s.journal).is_empty());
}

#[test]
fn nested_handlers_expand_one_level() {
    let mut s = setup();
    let too_deep: Rc<dyn Handler> = recorder("too-deep", &s.journal);
    let nested: Rc<dyn Handler> = recorder("nested", &s.journal);
    let inner: Rc<dyn Handler> = Rc::new(Composite { children: vec![too_deep] });
    let outer = Composite { children: vec![nested, inner] };
    s.reactor.engine_mut().detach(Scope::Link(s.link));
    s.reactor.engine_mut().attach(Scope::Link(s.link), vec![Rc::new(outer)]);

    s.reactor.engine_mut().remote_flow(s.link, 0).unwrap();
    s.reactor.process().unwrap();

    let labels: Vec<_> = handled(&s.journal).into_iter().map(|(label, _)| label).collect();
    assert_eq!(labels, vec!["nested", "session", "connection"]);
}

#[test]
fn resolve_lists_handlers_in_call_order() {
    let s = setup();
    let connection = s.reactor.engine().owning_connection(EndpointRef::Link(s.link)).unwrap();
    let session = s.reactor.engine().link(s.link).unwrap().session;
    let event = Event::for_link(EventType::LinkFlow, connection, session, s.link);

    let names: Vec<_> =
        router::resolve(&event, s.reactor.engine()).iter().map(|h| h.name()).collect();
    assert_eq!(names, vec!["recording"; 3]);
}

#[test]
fn handler_error_stops_routing() {
    let mut s = setup();
    s.reactor.engine_mut().detach(Scope::Link(s.link));
    s.reactor.engine_mut().attach(Scope::Link(s.link), vec![Rc::new(Failing)]);

    s.reactor.engine_mut().transfer(s.link, b"x", false).unwrap();
    let err = s.reactor.process().unwrap_err();

    assert!(matches!(err, CourierError::Hook { hook: "on_delivery", .. }));
    assert!(handled(&s.journal).is_empty());
}
