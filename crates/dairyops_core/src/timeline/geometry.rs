//! Interval-to-bar geometry.
//!
//! # Responsibility
//! - Project a task's `[start, end)` onto a visible hour window.
//!
//! # Invariants
//! - Left overflow shrinks the bar and pins it to offset `0`.
//! - Right overflow trims the bar to end at `1`.
//! - `width <= 0` (or `NaN`) means no bar; it is never an error.
//! - There is no collision handling; overlapping bars are independent.

use crate::timeline::clock::to_decimal_hours;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Bars narrower than this fraction do not draw their label inside.
pub const LABEL_MIN_WIDTH_FRACTION: f64 = 0.05;

/// Visible clock-hour range `[start_hour, end_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start_hour: u8,
    end_hour: u8,
}

/// Rejected window bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowError {
    Empty { start_hour: u8, end_hour: u8 },
    PastMidnight { end_hour: u8 },
}

impl Display for WindowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty {
                start_hour,
                end_hour,
            } => write!(
                f,
                "window end hour {end_hour} must be after start hour {start_hour}"
            ),
            Self::PastMidnight { end_hour } => {
                write!(f, "window end hour {end_hour} must be <= 24")
            }
        }
    }
}

impl Error for WindowError {}

impl Default for TimeWindow {
    /// 02:00 to 22:00, covering the first milking through evening cleaning.
    fn default() -> Self {
        Self {
            start_hour: 2,
            end_hour: 22,
        }
    }
}

impl TimeWindow {
    pub fn new(start_hour: u8, end_hour: u8) -> Result<Self, WindowError> {
        let window = Self {
            start_hour,
            end_hour,
        };
        window.validate()?;
        Ok(window)
    }

    /// Re-checks bounds; deserialized windows bypass [`TimeWindow::new`].
    pub fn validate(&self) -> Result<(), WindowError> {
        if self.end_hour <= self.start_hour {
            return Err(WindowError::Empty {
                start_hour: self.start_hour,
                end_hour: self.end_hour,
            });
        }
        if self.end_hour > 24 {
            return Err(WindowError::PastMidnight {
                end_hour: self.end_hour,
            });
        }
        Ok(())
    }

    pub fn start_hour(&self) -> u8 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u8 {
        self.end_hour
    }

    pub fn span_hours(&self) -> f64 {
        f64::from(self.end_hour) - f64::from(self.start_hour)
    }

    /// Hour labels for the header, both ends included.
    pub fn hour_ticks(&self) -> Vec<u8> {
        (self.start_hour..=self.end_hour).collect()
    }
}

/// Horizontal placement of a bar as window fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarSpan {
    pub offset_fraction: f64,
    pub width_fraction: f64,
}

impl BarSpan {
    /// Whether anything should be drawn. `NaN` widths are not visible.
    pub fn is_visible(&self) -> bool {
        self.width_fraction > 0.0
    }

    pub fn shows_label(&self) -> bool {
        self.width_fraction > LABEL_MIN_WIDTH_FRACTION
    }

    /// Scales the fractions to a display width, returning `(offset, width)`.
    pub fn scaled(&self, display_width: f64) -> (f64, f64) {
        (
            self.offset_fraction * display_width,
            self.width_fraction * display_width,
        )
    }
}

/// Computes the clamped span for `[start, end)` in `window`.
///
/// The result may have a non-positive width; see [`visible_bar`].
pub fn bar_span(start: &str, end: &str, window: TimeWindow) -> BarSpan {
    let start_hours = to_decimal_hours(start);
    let end_hours = to_decimal_hours(end);
    let span = window.span_hours();

    let mut offset = (start_hours - f64::from(window.start_hour)) / span;
    let mut width = (end_hours - start_hours) / span;

    if offset < 0.0 {
        width += offset;
        offset = 0.0;
    }
    if offset + width > 1.0 {
        width = 1.0 - offset;
    }

    BarSpan {
        offset_fraction: offset,
        width_fraction: width,
    }
}

/// Like [`bar_span`] but returns `None` when the bar has nothing to draw.
pub fn visible_bar(start: &str, end: &str, window: TimeWindow) -> Option<BarSpan> {
    Some(bar_span(start, end, window)).filter(BarSpan::is_visible)
}
