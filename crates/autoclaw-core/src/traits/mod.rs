//! Collaborator traits consumed by the scheduler.

pub mod executor;
pub mod goals;

pub use executor::Executor;
pub use goals::GoalSource;
