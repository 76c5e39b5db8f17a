//! Event handling services

pub mod dispatcher;
pub mod naming;
pub mod pack_mutator;
pub mod pipeline;
pub mod reconciler;

pub use dispatcher::handle_update;
pub use pack_mutator::{PackMutator, Removal};
pub use pipeline::{Inbound, MediaRequest, ReplyTarget, Sender};
pub use reconciler::{decide, Action, Observed, Outcome, Reconciler};
