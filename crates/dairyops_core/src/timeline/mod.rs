//! Timeline projection: clock parsing, bar geometry, resource colors and
//! presentation rows.
//!
//! # Responsibility
//! - Turn wall-clock task intervals into clamped window fractions.
//! - Assign deterministic colors to resource names.
//!
//! # Invariants
//! - Nothing in this module mutates tasks; it is a pure read path.
//! - Out-of-range intervals are clamped or hidden, never reported as errors.

pub mod clock;
pub mod color;
pub mod geometry;
pub mod view;
