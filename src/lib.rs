//! Dependency scheduling and parallel execution coordination for
//! PRD-driven agent runs.
//!
//! A PRD is a named project with an ordered task list; tasks may declare
//! dependencies on each other by id. This crate turns that flat list into
//! a correctly-ordered, concurrency-bounded execution plan and tracks
//! scheduling progress across a persisted, resumable session:
//!
//! - [`graph`] builds the dependency graph and answers validation, cycle,
//!   readiness, ordering, and level-grouping queries.
//! - [`coordinator`] advances through execution groups and records task
//!   starts and outcomes against the session, enforcing the concurrency
//!   cap and group-completion semantics.
//! - [`session`] holds the persisted scheduling state and the pure
//!   transitions that mutate it; [`session::store`] round-trips it
//!   through JSON files so a crashed run can be resumed.
//!
//! The crate is control logic only: it never spawns agent processes.
//! The external executor performs the actual concurrent work and reports
//! outcomes back through the coordinator.

#![warn(missing_docs)]

pub mod coordinator;
pub mod graph;
pub mod prd;
pub mod progress;
pub mod session;

pub use coordinator::{
    CompletionOutcome, CoordinatorSummary, GroupStart, InitOutcome, ParallelConfig,
    ParallelCoordinator,
};
pub use graph::{
    BlockedTask, CycleReport, DependencyError, DependencyErrorKind, DependencyGraph,
    ExecutionEligibility, ScheduledTask, TaskDependencyInfo, ValidationReport,
};
pub use prd::{load_prd, FilePrdSource, Prd, PrdError, Task, TaskSource};
pub use progress::ProgressLog;
pub use session::store::SessionStore;
pub use session::{
    ExecutionStatus, ParallelGroupRecord, ParallelState, Session, TaskExecutionRecord,
};
