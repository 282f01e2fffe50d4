//! Presentation rows for the schedule grid and timeline.
//!
//! # Responsibility
//! - Apply the resource filter and number the visible rows.
//! - Attach bar geometry, color and tooltip to each row.
//! - Derive the legend of distinct resources.
//!
//! # Invariants
//! - Row order follows task order; the filter never reorders.
//! - Rows whose bar is invisible are still listed, with `bar = None`.

use crate::model::task::{Task, TaskId};
use crate::timeline::color::{color_for, ResourceColor};
use crate::timeline::geometry::{visible_bar, BarSpan, TimeWindow};
use std::collections::BTreeSet;

/// Case-insensitive substring filter on the resource column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    text: String,
    needle: String,
}

impl ResourceFilter {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let needle = text.to_lowercase();
        Self { text, needle }
    }

    /// Raw filter text, also used as the default resource for new rows.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn matches(&self, task: &Task) -> bool {
        task.resource.to_lowercase().contains(&self.needle)
    }
}

/// One rendered schedule row.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineRow {
    /// 1-based position among the filtered rows.
    pub number: usize,
    pub task_id: TaskId,
    pub resource: String,
    pub label: String,
    pub start: String,
    pub end: String,
    pub color: ResourceColor,
    pub bar: Option<BarSpan>,
    pub tooltip: String,
}

/// Builds rows for every task passing `filter`.
pub fn build_rows(tasks: &[Task], window: TimeWindow, filter: &ResourceFilter) -> Vec<TimelineRow> {
    tasks
        .iter()
        .filter(|task| filter.matches(task))
        .enumerate()
        .map(|(index, task)| TimelineRow {
            number: index + 1,
            task_id: task.id.clone(),
            resource: task.resource.clone(),
            label: task.label.clone(),
            start: task.start.clone(),
            end: task.end.clone(),
            color: color_for(&task.resource),
            bar: visible_bar(&task.start, &task.end, window),
            tooltip: task.tooltip(),
        })
        .collect()
}

/// Distinct non-empty resources, sorted, each with its color.
pub fn legend(tasks: &[Task]) -> Vec<(String, ResourceColor)> {
    tasks
        .iter()
        .map(|task| task.resource.as_str())
        .filter(|resource| !resource.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|resource| (resource.to_string(), color_for(resource)))
        .collect()
}
