//! Ordered record of everything that happened during a test.
//!
//! The engine and the recording delegates write to the same journal, so tests
//! can assert on the interleaving of hooks and engine calls (e.g. that
//! `on_settled` fires before the local settle).

use std::{cell::RefCell, rc::Rc};

use courier_core::{DeliveryId, Disposition, EndpointRef, LinkId, TransactionId};

/// A state-changing call made on the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    /// Local open
    Open(EndpointRef),
    /// Local close
    Close(EndpointRef),
    /// Credit granted
    Flow {
        /// Receiving link
        link: LinkId,
        /// Credit added
        credit: u32,
    },
    /// Local disposition set
    Update {
        /// Delivery updated
        delivery: DeliveryId,
        /// New local state
        state: Disposition,
    },
    /// Local settle
    Settle(DeliveryId),
    /// Message read from a delivery
    ReadMessage(DeliveryId),
    /// Transaction outcome handled
    TransactionOutcome {
        /// Transaction consulted
        transaction: TransactionId,
        /// Settled delivery
        delivery: DeliveryId,
    },
    /// Delivery accepted under a transaction
    TransactionalAccept {
        /// Owning transaction
        transaction: TransactionId,
        /// Accepted delivery
        delivery: DeliveryId,
    },
}

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Engine call
    Call(EngineCall),
    /// Delegate hook invoked
    Hook(&'static str),
    /// Handler hook invoked on a recording handler
    Handled {
        /// Label of the recording handler
        handler: String,
        /// Handler hook name
        hook: &'static str,
    },
}

/// Shared, append-only journal. Clones write to the same log.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<Entry>>>);

impl Journal {
    /// Empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: Entry) {
        self.0.borrow_mut().push(entry);
    }

    /// Copy of all entries so far.
    pub fn entries(&self) -> Vec<Entry> {
        self.0.borrow().clone()
    }

    /// Delegate hook names in order.
    pub fn hooks(&self) -> Vec<&'static str> {
        self.0
            .borrow()
            .iter()
            .filter_map(|entry| match entry {
                Entry::Hook(hook) => Some(*hook),
                _ => None,
            })
            .collect()
    }

    /// Engine calls in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.0
            .borrow()
            .iter()
            .filter_map(|entry| match entry {
                Entry::Call(call) => Some(call.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of times a delegate hook fired.
    pub fn count(&self, hook: &str) -> usize {
        self.0.borrow().iter().filter(|entry| matches!(entry, Entry::Hook(h) if *h == hook)).count()
    }

    /// Position of the first matching entry.
    pub fn position(&self, entry: &Entry) -> Option<usize> {
        self.0.borrow().iter().position(|e| e == entry)
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}
