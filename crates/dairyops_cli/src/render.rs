//! Plain-text rendering of schedule rows.

use dairyops_core::timeline::color::ResourceColor;
use dairyops_core::timeline::geometry::{BarSpan, TimeWindow};
use dairyops_core::timeline::view::TimelineRow;
use std::fmt::Write as _;

const RESOURCE_COLUMN: usize = 14;
const LABEL_COLUMN: usize = 22;
const BAR_FILL: char = '#';
const BAR_EMPTY: char = '.';

pub fn grid(rows: &[TimelineRow]) -> String {
    let mut out = format!(
        "{:>3}  {:<RESOURCE_COLUMN$}  {:<LABEL_COLUMN$}  {:<5}  {:<5}  {}\n",
        "#", "Resource", "Task", "Start", "End", "Id"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:>3}  {:<RESOURCE_COLUMN$}  {:<LABEL_COLUMN$}  {:<5}  {:<5}  {}",
            row.number,
            clip(&row.resource, RESOURCE_COLUMN),
            clip(&row.label, LABEL_COLUMN),
            row.start,
            row.end,
            row.task_id
        );
    }
    out
}

pub fn timeline(rows: &[TimelineRow], window: TimeWindow, width: usize) -> String {
    let width = width.max(1);
    let gutter = " ".repeat(3 + 1 + RESOURCE_COLUMN + 2);
    let mut out = format!("{gutter}{}\n", axis(window, width));
    for row in rows {
        let _ = writeln!(
            out,
            "{:>3} {:<RESOURCE_COLUMN$} |{}| {}-{}",
            row.number,
            clip(&row.resource, RESOURCE_COLUMN),
            bar_cells(row.bar, &row.label, width),
            row.start,
            row.end
        );
    }
    out
}

pub fn legend(entries: &[(String, ResourceColor)]) -> String {
    let mut out = String::new();
    for (resource, color) in entries {
        let _ = writeln!(
            out,
            "{:<RESOURCE_COLUMN$}  {:<14}  {}",
            clip(resource, RESOURCE_COLUMN),
            color.css_class(),
            color.hex()
        );
    }
    out
}

/// Hour labels placed at their window positions; labels that would collide
/// with an earlier one are skipped.
fn axis(window: TimeWindow, width: usize) -> String {
    let mut line = vec![' '; width + 2];
    for hour in window.hour_ticks() {
        let fraction = f64::from(hour - window.start_hour()) / window.span_hours();
        let position = (fraction * width as f64).round() as usize;
        let label = format!("{hour:02}");
        let end = position + label.len();
        let free = end <= line.len()
            && line[position.saturating_sub(1)..end]
                .iter()
                .all(|cell| *cell == ' ');
        if free {
            for (offset, ch) in label.chars().enumerate() {
                line[position + offset] = ch;
            }
        }
    }
    line.into_iter().collect::<String>().trim_end().to_string()
}

fn bar_cells(bar: Option<BarSpan>, label: &str, width: usize) -> String {
    let mut cells = vec![BAR_EMPTY; width];
    if let Some(bar) = bar {
        let (offset, length) = bar.scaled(width as f64);
        let from = (offset.round().max(0.0) as usize).min(width - 1);
        let to = ((offset + length).round() as usize).clamp(from + 1, width);
        let label_chars = if bar.shows_label() {
            label.chars().collect::<Vec<_>>()
        } else {
            Vec::new()
        };
        for (index, cell) in cells[from..to].iter_mut().enumerate() {
            *cell = label_chars.get(index).copied().unwrap_or(BAR_FILL);
        }
    }
    cells.into_iter().collect()
}

fn clip(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut clipped: String = value.chars().take(max_chars - 1).collect();
    clipped.push('~');
    clipped
}
