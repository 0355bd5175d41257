//! Conversation-facing layer over the fulfillment core: per-session journey
//! coordination with guideline arbitration, plus the JSON tool surface the
//! collaborator runtime calls into.

pub mod coordinator;
pub mod tools;

pub use coordinator::{
    CoordinatorError, SessionCoordinator, SessionId, TurnAction, TurnOutcome, TurnRequest,
};
pub use tools::{Tool, ToolRegistry};
