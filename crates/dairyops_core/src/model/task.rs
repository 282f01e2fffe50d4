//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical scheduled-task record.
//! - Provide draft/field helpers used by store mutations.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `start`/`end` are kept verbatim; no `start < end` rule is enforced.
//!   A reversed interval is a valid task that simply renders no bar.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque task identifier.
///
/// Stored documents may carry string or numeric ids; both are kept exactly
/// as read and written back in the same JSON type. Ids minted here are
/// time-ordered UUID strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(IdRepr);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum IdRepr {
    Text(String),
    /// Canonical JSON text of a numeric id.
    Number(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(serde_json::Number),
}

impl TaskId {
    pub fn text(value: impl Into<String>) -> Self {
        Self(IdRepr::Text(value.into()))
    }

    pub fn number(value: impl Into<serde_json::Number>) -> Self {
        Self(IdRepr::Number(value.into().to_string()))
    }

    pub fn as_str(&self) -> &str {
        match &self.0 {
            IdRepr::Text(value) | IdRepr::Number(value) => value,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.0, IdRepr::Number(_))
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaskId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            IdRepr::Text(value) => serializer.serialize_str(value),
            IdRepr::Number(value) => match value.parse::<serde_json::Number>() {
                Ok(number) => number.serialize(serializer),
                Err(_) => serializer.serialize_str(value),
            },
        }
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match WireId::deserialize(deserializer)? {
            WireId::Text(value) => Self::text(value),
            WireId::Number(value) => Self::number(value),
        })
    }
}

/// Default start time for freshly created tasks.
pub const DEFAULT_TASK_START: &str = "08:00";
/// Default end time for freshly created tasks.
pub const DEFAULT_TASK_END: &str = "09:00";

/// One scheduled activity on a resource row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Actor or equipment the activity is assigned to.
    pub resource: String,
    /// Activity name. Serialized as `task` to match stored plan documents.
    #[serde(rename = "task", default)]
    pub label: String,
    /// Wall-clock `HH:MM`.
    pub start: String,
    /// Wall-clock `HH:MM`.
    pub end: String,
}

impl Task {
    /// Creates a task with a freshly generated id.
    pub fn new(
        resource: impl Into<String>,
        label: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self::with_id(new_task_id(), resource, label, start, end)
    }

    /// Creates a task with a caller-provided id.
    ///
    /// Used by sync paths where identity already exists in a document.
    pub fn with_id(
        id: TaskId,
        resource: impl Into<String>,
        label: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            id,
            resource: resource.into(),
            label: label.into(),
            start: start.into(),
            end: end.into(),
        }
    }

    /// Creates the empty row produced by "insert below".
    pub fn blank(resource: impl Into<String>) -> Self {
        Self::new(resource, "", DEFAULT_TASK_START, DEFAULT_TASK_END)
    }

    /// Replaces one field in place.
    pub fn set_field(&mut self, field: TaskField, value: impl Into<String>) {
        let value = value.into();
        match field {
            TaskField::Resource => self.resource = value,
            TaskField::Label => self.label = value,
            TaskField::Start => self.start = value,
            TaskField::End => self.end = value,
        }
    }

    /// Returns one field by selector.
    pub fn field(&self, field: TaskField) -> &str {
        match field {
            TaskField::Resource => &self.resource,
            TaskField::Label => &self.label,
            TaskField::Start => &self.start,
            TaskField::End => &self.end,
        }
    }

    /// Hover text shown for a timeline bar.
    pub fn tooltip(&self) -> String {
        format!("{}: {} - {}", self.label, self.start, self.end)
    }
}

/// Generates a new time-ordered task id.
pub fn new_task_id() -> TaskId {
    TaskId::text(Uuid::now_v7().to_string())
}

/// Editable task field selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskField {
    Resource,
    Label,
    Start,
    End,
}

impl TaskField {
    /// Parses a user-facing field name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "resource" => Some(Self::Resource),
            "label" | "task" => Some(Self::Label),
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            _ => None,
        }
    }
}

/// Input for the "add task" action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub resource: String,
    pub label: String,
    pub start: String,
    pub end: String,
}

impl Default for TaskDraft {
    fn default() -> Self {
        Self {
            resource: String::new(),
            label: String::new(),
            start: DEFAULT_TASK_START.to_string(),
            end: DEFAULT_TASK_END.to_string(),
        }
    }
}

impl TaskDraft {
    /// Resolves the draft into a task, falling back to `resource_fallback`
    /// (usually the active resource filter) when the draft has no resource.
    ///
    /// Returns `None` when both are empty.
    pub fn into_task(self, resource_fallback: &str) -> Option<Task> {
        let resource = if self.resource.is_empty() {
            resource_fallback.to_string()
        } else {
            self.resource
        };
        if resource.is_empty() {
            return None;
        }
        Some(Task::new(resource, self.label, self.start, self.end))
    }
}

/// The day a fresh planner starts with.
pub fn default_schedule() -> Vec<Task> {
    [
        ("Team A", "Morning Milking", "02:30", "05:30"),
        ("Tanker 1", "Milk Collection", "05:00", "06:30"),
        ("Processing", "Pasteurization", "06:00", "09:00"),
        ("Team B", "Feeding Cows", "09:00", "10:30"),
        ("Dr. Smith", "Vet Inspection", "10:00", "12:00"),
        ("Logistics", "City Delivery", "11:30", "15:30"),
        ("Team A", "Evening Milking", "16:00", "19:00"),
        ("Cleaning", "Equipment Sanitize", "19:30", "21:00"),
    ]
    .into_iter()
    .map(|(resource, label, start, end)| Task::new(resource, label, start, end))
    .collect()
}
