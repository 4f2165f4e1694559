//! Courier handler framework core
//!
//! Turns the raw events of a messaging engine (endpoint state bits, delivery
//! availability flags, credit changes) into lifecycle and disposition
//! callbacks. The crate performs no I/O: the engine is reached exclusively
//! through the [`Engine`] trait, and every operation runs synchronously inside
//! one event dispatch.
//!
//! # Architecture
//!
//! ```text
//!   engine event queue
//!          │
//!          ▼
//!   ┌──────────────┐   delivery → link → session → connection
//!   │ scoped router│──────────────────────────────────────────┐
//!   └──────────────┘                                          │
//!          │ handler chain (flattened one level)              │
//!          ▼                                                  ▼
//!   FlowController → EndpointStateHandler → Incoming → Outgoing/Transaction
//!                              │                  │
//!                              ▼                  ▼
//!                      delegate hooks      settlement → Engine
//! ```
//!
//! # Components
//!
//! - [`hooks`]: Delegate trait, hook capability sets, best-effort dispatch
//! - [`flow`]: Credit window controller for receiving links
//! - [`router`]: Scope-ordered routing of one event to attached chains
//! - [`endpoint`]: Open/close state machine for connections, sessions, links
//! - [`incoming`] and [`outgoing`]: Delivery disposition handlers
//! - [`settlement`]: Accept/reject/release/settle primitives
//! - [`transaction`]: Transactional outcome propagation
//! - [`messaging`]: Composite handlers for common roles
//! - [`engine`]: The engine collaborator surface
//! - [`error`]: Error types

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod endpoint;
pub mod engine;
pub mod error;
pub mod event;
pub mod flow;
pub mod handler;
pub mod hooks;
pub mod incoming;
pub mod messaging;
pub mod model;
pub mod outgoing;
pub mod router;
pub mod settlement;
pub mod transaction;

pub use endpoint::EndpointStateHandler;
pub use engine::Engine;
pub use error::{CourierError, EngineError, Result};
pub use event::{Event, EventType};
pub use flow::FlowController;
pub use handler::{Chain, Handler};
pub use hooks::{Delegate, Hook, Hooks, Lifecycle, Outcome};
pub use incoming::IncomingMessageHandler;
pub use messaging::{MessagingConfig, MessagingHandler, TransactionalClientHandler};
pub use model::{
    ConnectionId, DeliveryId, DeliveryInfo, Disposition, EndpointKind, EndpointRef, EndpointState,
    EndpointStatus, ErrorCondition, LinkId, LinkInfo, Message, Role, Scope, SessionId,
    TransactionId,
};
pub use outgoing::OutgoingMessageHandler;
pub use router::ScopedRouter;
pub use settlement::Acking;
pub use transaction::{TransactionHandler, TransactionalAcking};
