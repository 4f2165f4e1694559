//! Delegates and handlers that record what they were called with.

use std::cell::{Cell, RefCell};

use courier_core::{
    Delegate, EndpointKind, Engine, Event, Handler, Hook, Hooks, Lifecycle, Message, Outcome,
    Result,
};

use crate::journal::{Entry, Journal};

/// Delegate implementing a configurable set of hooks.
///
/// Every invoked hook appends [`Entry::Hook`] to the journal. `on_message`
/// stores the message and answers with the configured outcome.
pub struct RecordingDelegate {
    hooks: Hooks,
    journal: Journal,
    outcome: Cell<Outcome>,
    messages: RefCell<Vec<Message>>,
}

impl RecordingDelegate {
    /// Delegate advertising `hooks`, writing to `journal`.
    pub fn new(hooks: Hooks, journal: Journal) -> Self {
        Self {
            hooks,
            journal,
            outcome: Cell::new(Outcome::Accept),
            messages: RefCell::new(Vec::new()),
        }
    }

    /// Delegate advertising every hook.
    pub fn all(journal: Journal) -> Self {
        Self::new(Hooks::all(), journal)
    }

    /// Outcome returned from `on_message` from now on.
    pub fn set_outcome(&self, outcome: Outcome) {
        self.outcome.set(outcome);
    }

    /// Messages received so far.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    fn record(&self, hook: Hook) {
        self.journal.record(Entry::Hook(hook.name()));
    }
}

impl Delegate for RecordingDelegate {
    fn hooks(&self) -> Hooks {
        self.hooks
    }

    fn on_credit(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        self.record(Hook::Credit);
        Ok(())
    }

    fn on_accepted(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        self.record(Hook::Accepted);
        Ok(())
    }

    fn on_rejected(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        self.record(Hook::Rejected);
        Ok(())
    }

    fn on_released(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        self.record(Hook::Released);
        Ok(())
    }

    fn on_modified(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        self.record(Hook::Modified);
        Ok(())
    }

    fn on_settled(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        self.record(Hook::Settled);
        Ok(())
    }

    fn on_message(&self, event: &Event, _engine: &mut dyn Engine) -> Result<Outcome> {
        self.record(Hook::Message);
        if let Some(message) = &event.message {
            self.messages.borrow_mut().push(message.clone());
        }
        Ok(self.outcome.get())
    }

    fn on_endpoint(
        &self,
        kind: EndpointKind,
        stage: Lifecycle,
        _event: &Event,
        _engine: &mut dyn Engine,
    ) -> Result<()> {
        self.record(Hook::Endpoint(kind, stage));
        Ok(())
    }

    fn on_transaction_declared(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        self.record(Hook::TransactionDeclared);
        Ok(())
    }

    fn on_transaction_committed(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        self.record(Hook::TransactionCommitted);
        Ok(())
    }

    fn on_transaction_aborted(&self, _event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        self.record(Hook::TransactionAborted);
        Ok(())
    }

    fn on_transaction_declare_failed(
        &self,
        _event: &Event,
        _engine: &mut dyn Engine,
    ) -> Result<()> {
        self.record(Hook::TransactionDeclareFailed);
        Ok(())
    }

    fn on_transaction_commit_failed(
        &self,
        _event: &Event,
        _engine: &mut dyn Engine,
    ) -> Result<()> {
        self.record(Hook::TransactionCommitFailed);
        Ok(())
    }
}

/// Handler that records every event it sees as [`Entry::Handled`].
pub struct RecordingHandler {
    label: String,
    journal: Journal,
}

impl RecordingHandler {
    /// Handler identified by `label` in the journal.
    pub fn new(label: impl Into<String>, journal: Journal) -> Self {
        Self { label: label.into(), journal }
    }

    /// Entries recorded by this handler, as hook names.
    pub fn seen(&self) -> Vec<&'static str> {
        self.journal
            .entries()
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Handled { handler, hook } if handler == self.label => Some(hook),
                _ => None,
            })
            .collect()
    }
}

impl Handler for RecordingHandler {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn handle(&self, event: &Event, _engine: &mut dyn Engine) -> Result<()> {
        self.journal
            .record(Entry::Handled { handler: self.label.clone(), hook: event.kind().hook_name() });
        Ok(())
    }
}
