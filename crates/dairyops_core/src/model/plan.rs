//! Plan identity and the persisted plan document shape.
//!
//! # Invariants
//! - `PlanId` is never blank and carries no surrounding whitespace.
//! - A plan document without a `tasks` field is valid; readers must not
//!   treat it as an empty schedule.

use crate::model::task::Task;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Plan used when the operator has not picked one.
pub const DEFAULT_PLAN_ID: &str = "my-dairy-plan";

/// Human-chosen plan name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlanId(String);

/// Rejected plan id input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanIdError {
    Blank,
    ContainsSlash(String),
}

impl Display for PlanIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank => write!(f, "plan id cannot be blank"),
            Self::ContainsSlash(value) => {
                write!(f, "plan id `{value}` must not contain `/`")
            }
        }
    }
}

impl Error for PlanIdError {}

impl PlanId {
    /// Validates and normalizes a plan id.
    ///
    /// `/` is rejected because plan ids become one document path segment.
    pub fn new(value: impl AsRef<str>) -> Result<Self, PlanIdError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(PlanIdError::Blank);
        }
        if trimmed.contains('/') {
            return Err(PlanIdError::ContainsSlash(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PlanId {
    fn default() -> Self {
        Self(DEFAULT_PLAN_ID.to_string())
    }
}

impl Display for PlanId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Document stored per plan in the document service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
    /// Unix epoch milliseconds of the last persist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
}

impl PlanDocument {
    /// Builds the document written on every persist.
    pub fn snapshot_of(tasks: &[Task], last_updated_ms: i64) -> Self {
        Self {
            tasks: Some(tasks.to_vec()),
            last_updated: Some(last_updated_ms),
        }
    }

    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}
