//! Replicated plan state.
//!
//! # Responsibility
//! - Define the document-service and identity seams.
//! - Reconcile optimistic local edits with remote snapshots.
//!
//! # Invariants
//! - All state transitions run on the owner's thread via the store's event
//!   queue; services only push results into sinks.
//! - Remote state wins wholesale; there is no merge.

pub mod document;
pub mod error;
pub mod identity;
pub mod memory;
pub mod sqlite;
pub mod store;
