//! Core business logic modules
//!
//! Pure bookkeeping and policy with no I/O dependencies.

pub mod state;
pub mod supervision;

pub use state::CoordinatorState;
pub use supervision::{Directive, RestartBudget, RestartBudgetConfig, Supervisor, directive_for};
