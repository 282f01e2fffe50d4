//! Domain model for scheduled dairy-operation tasks and plans.
//!
//! # Responsibility
//! - Define the task record shared by timeline, interchange and sync layers.
//! - Define the plan document shape exchanged with document services.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Task order inside a plan is meaningful and never re-sorted by core.

pub mod plan;
pub mod task;
