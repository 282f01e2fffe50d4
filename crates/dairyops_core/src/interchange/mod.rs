//! Textual task interchange (CSV export/import).
//!
//! # Responsibility
//! - Serialize a plan's tasks into the CSV exchange format.
//! - Parse CSV text into a pending, not-yet-applied task set.
//!
//! # Invariants
//! - Parsing never touches a store; committing is a separate step.
//! - Lines that do not tokenize are dropped silently.

pub mod csv;
