//! CSV codec for task lists.
//!
//! Format: header `Resource,Task,Start Time,End Time`, then one
//! `resource,"label",start,end` line per task. Only the label is quoted and
//! nothing is escaped.
//!
//! # Invariants
//! - `parse_import(serialize_tasks(tasks))` reproduces every task's
//!   `resource`, `label`, `start` and `end` when they contain no newline, no
//!   `"` in resource/start/end and no `"` next to the label quotes. Ids are
//!   regenerated.
//! - An import with zero parsed lines is rejected as a whole.

use crate::model::plan::PlanId;
use crate::model::task::Task;
use chrono::NaiveDate;
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// First line of every export.
pub const CSV_HEADER: &str = "Resource,Task,Start Time,End Time";
/// Label used when a line carries an empty label field.
pub const UNNAMED_TASK_LABEL: &str = "Unnamed Task";
/// Media type attached to exports.
pub const CSV_MEDIA_TYPE: &str = "text/csv;charset=utf-8";

/// Import rejected before anything was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// No data line matched the four-field layout.
    NoValidRows { lines_seen: usize },
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoValidRows { lines_seen } => write!(
                f,
                "could not parse CSV ({lines_seen} data line(s) seen); expected Resource,Task,Start,End"
            ),
        }
    }
}

impl Error for ImportError {}

/// How the label column was written on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelField<'a> {
    Quoted(&'a str),
    Bare(&'a str),
}

impl<'a> LabelField<'a> {
    /// Raw captured text, before trimming.
    pub fn raw(&self) -> &'a str {
        match self {
            Self::Quoted(value) | Self::Bare(value) => value,
        }
    }
}

/// One tokenized data line, fields untrimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvRecord<'a> {
    pub resource: &'a str,
    pub label: LabelField<'a>,
    pub start: &'a str,
    pub end: &'a str,
}

impl CsvRecord<'_> {
    /// Builds a task with a fresh id; empty labels become [`UNNAMED_TASK_LABEL`].
    pub fn to_task(&self) -> Task {
        let raw_label = self.label.raw();
        let label = if raw_label.is_empty() {
            UNNAMED_TASK_LABEL
        } else {
            raw_label
        };
        Task::new(
            self.resource.trim(),
            label.trim(),
            self.start.trim(),
            self.end.trim(),
        )
    }
}

/// Parsed import awaiting the operator's consent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImport {
    tasks: Vec<Task>,
    lines_seen: usize,
}

impl PendingImport {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Non-blank data lines looked at, header excluded.
    pub fn lines_seen(&self) -> usize {
        self.lines_seen
    }

    pub fn dropped_lines(&self) -> usize {
        self.lines_seen - self.tasks.len()
    }

    /// Question shown before the import replaces the current schedule.
    pub fn confirmation_prompt(&self) -> String {
        format!(
            "Successfully parsed {} tasks. Replace current schedule?",
            self.tasks.len()
        )
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }
}

/// Downloadable export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    pub file_name: String,
    pub content: String,
    pub media_type: &'static str,
}

impl ExportPayload {
    pub fn new(plan_id: &PlanId, date: NaiveDate, tasks: &[Task]) -> Self {
        Self {
            file_name: export_file_name(plan_id, date),
            content: serialize_tasks(tasks),
            media_type: CSV_MEDIA_TYPE,
        }
    }
}

/// `<planId>_<YYYY-MM-DD>.csv`
pub fn export_file_name(plan_id: &PlanId, date: NaiveDate) -> String {
    format!("{}_{}.csv", plan_id, date.format("%Y-%m-%d"))
}

/// Serializes tasks in order, newline-joined, no trailing newline.
pub fn serialize_tasks(tasks: &[Task]) -> String {
    let mut lines = Vec::with_capacity(tasks.len() + 1);
    lines.push(CSV_HEADER.to_string());
    lines.extend(
        tasks
            .iter()
            .map(|task| format!("{},\"{}\",{},{}", task.resource, task.label, task.start, task.end)),
    );
    lines.join("\n")
}

/// Parses CSV text into a pending import.
///
/// Line 1 is always skipped as the header. Blank lines are ignored and do not
/// count as seen.
///
/// # Errors
/// - [`ImportError::NoValidRows`] when no data line tokenizes.
pub fn parse_import(text: &str) -> Result<PendingImport, ImportError> {
    let mut tasks = Vec::new();
    let mut lines_seen = 0;

    for line in text.split('\n').skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        lines_seen += 1;
        match tokenize_line(line) {
            Some(record) => tasks.push(record.to_task()),
            None => debug!("event=csv_line_dropped module=interchange status=skipped"),
        }
    }

    if tasks.is_empty() {
        info!(
            "event=csv_parse module=interchange status=rejected lines_seen={}",
            lines_seen
        );
        return Err(ImportError::NoValidRows { lines_seen });
    }

    info!(
        "event=csv_parse module=interchange status=ok parsed={} dropped={}",
        tasks.len(),
        lines_seen - tasks.len()
    );
    Ok(PendingImport { tasks, lines_seen })
}

/// Splits one trimmed data line into its four fields.
///
/// The resource ends at the first comma. The label is read as a quoted span
/// (no inner `"`, closing quote directly followed by a comma) and, if that
/// does not leave two more fields, as a bare span up to the next comma. The
/// start ends at the following comma and the end takes the rest of the line.
/// Returns `None` when fewer than four fields are present.
pub fn tokenize_line(line: &str) -> Option<CsvRecord<'_>> {
    let (resource, rest) = line.split_once(',')?;
    let (label, start, end) = quoted_label(rest).or_else(|| bare_label(rest))?;
    Some(CsvRecord {
        resource,
        label,
        start,
        end,
    })
}

fn quoted_label(rest: &str) -> Option<(LabelField<'_>, &str, &str)> {
    let inner = rest.strip_prefix('"')?;
    let close = inner.find('"')?;
    let after = inner[close + 1..].strip_prefix(',')?;
    let (start, end) = after.split_once(',')?;
    Some((LabelField::Quoted(&inner[..close]), start, end))
}

fn bare_label(rest: &str) -> Option<(LabelField<'_>, &str, &str)> {
    let (label, after) = rest.split_once(',')?;
    let (start, end) = after.split_once(',')?;
    Some((LabelField::Bare(label), start, end))
}
