//! Reusable review console for moderated content.
//!
//! [`ReviewConsole`] is the single state machine behind every moderation screen;
//! a [`ReviewableEntity`] adapter binds it to one content kind. [`RestReviewAdapter`]
//! is the HTTP binding used against the platform backend.

pub mod adapter;
pub mod console;
pub mod error;
pub mod location;
pub mod mutation_log;
pub mod rest;

pub use adapter::{PageResult, Reviewable, ReviewableEntity};
pub use console::{
    ConsoleConfig, ConsoleEvent, ConsoleState, IntentOutcome, LoadStatus, ReviewConsole,
    DEFAULT_PAGE_LIMIT,
};
pub use error::{AdapterError, ConflictError, ConsoleErrorKind};
pub use location::ConsoleLocation;
pub use mutation_log::{Compensate, MutationLog};
pub use rest::{CountStrategy, RestReviewAdapter};
