//! Virtualized infinite month timeline.
//!
//! ## Usage
//!
//! The timeline presents an unbounded vertical sequence of months, indexed
//! by an integer offset from a fixed anchor month. Only a bounded window of
//! months around the scroll position is materialized at a time; everything
//! else exists as coordinates. Month slots that scroll out of the window
//! keep their sub-state (the last focused day cell) so scrolling away and
//! back never loses it.
//!
//! Scroll positions are fractional month offsets: `2.5` is halfway through
//! the month two after the anchor.

use derive_builder::Builder;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::date::{CalendarDate, Weekday, YearMonth};

/// Integer month index relative to the timeline anchor.
pub type MonthOffset = i32;

/// Tolerance for scroll-position comparisons.
const POSITION_EPSILON: f64 = 1e-9;

/// Render coordinates of one day cell: which month, and where in that
/// month's 7-column grid. The rendering layer looks these up; it never
/// drives navigation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellCoordinates {
    /// Month index relative to the anchor.
    pub month_offset: MonthOffset,
    /// Zero-based grid row within the month.
    pub row: u8,
    /// Zero-based grid column (0 = first day of week).
    pub column: u8,
}

/// Configuration for [`MonthTimeline`].
#[derive(Debug, Builder, Clone)]
#[builder(pattern = "owned")]
pub struct TimelineArgs {
    /// Viewport height in months.
    #[builder(default = "2.0")]
    pub viewport_months: f64,
    /// Number of extra months materialized before/after the viewport.
    #[builder(default = "2")]
    pub overscan: usize,
}

impl Default for TimelineArgs {
    fn default() -> Self {
        TimelineArgsBuilder::default()
            .build()
            .expect("builder construction failed")
    }
}

/// Per-month retained state.
#[derive(Debug, Clone)]
struct MonthSlot {
    materialized: bool,
    focused_day: Option<u8>,
}

/// Result of one materialization pass: the new window plus the offsets that
/// entered and left it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedWindow {
    /// Inclusive month-offset range that must have backing state.
    pub range: (MonthOffset, MonthOffset),
    /// Offsets newly materialized by this pass.
    pub added: SmallVec<[MonthOffset; 8]>,
    /// Offsets released by this pass (slots retained, just dematerialized).
    pub released: SmallVec<[MonthOffset; 8]>,
}

/// Maintains the logical infinite sequence of months and the bounded
/// materialization window standing in for it.
pub struct MonthTimeline {
    anchor: YearMonth,
    viewport_months: f64,
    overscan: usize,
    min_month: Option<MonthOffset>,
    max_month: Option<MonthOffset>,
    slots: FxHashMap<MonthOffset, MonthSlot>,
    window: Option<(MonthOffset, MonthOffset)>,
    pending_viewport: Option<f64>,
}

impl MonthTimeline {
    /// Creates a timeline anchored at `anchor` (month offset zero).
    pub fn new(anchor: YearMonth, args: TimelineArgs) -> Self {
        Self {
            anchor,
            viewport_months: args.viewport_months.max(1.0),
            overscan: args.overscan,
            min_month: None,
            max_month: None,
            slots: FxHashMap::default(),
            window: None,
            pending_viewport: None,
        }
    }

    /// Returns the anchor month.
    pub fn anchor(&self) -> YearMonth {
        self.anchor
    }

    /// Viewport height in months.
    pub fn viewport_months(&self) -> f64 {
        self.viewport_months
    }

    /// Month offset of the given month.
    pub fn offset_of(&self, month: YearMonth) -> MonthOffset {
        month.months_since(self.anchor)
    }

    /// Month at the given offset.
    pub fn month_at(&self, offset: MonthOffset) -> YearMonth {
        self.anchor.add_months(offset)
    }

    /// Fractional month offset of a date: its month offset plus the day's
    /// fraction of the month.
    pub fn position_for_date(&self, date: CalendarDate) -> f64 {
        let offset = self.offset_of(date.year_month()) as f64;
        let len = date.year_month().len_days() as f64;
        offset + (date.day() - 1) as f64 / len
    }

    /// Inverse of [`position_for_date`](Self::position_for_date); the
    /// fraction maps back to a day clamped into the month.
    pub fn date_at_position(&self, position: f64) -> CalendarDate {
        let offset = position.floor();
        let month = self.month_at(offset as MonthOffset);
        let len = month.len_days();
        let day = 1 + ((position - offset) * len as f64).floor() as i64;
        let day = day.clamp(1, len as i64) as u8;
        month
            .to_date(day)
            .unwrap_or_else(|| month.first_day())
    }

    /// Resizes the viewport, measured in months. The materialization window
    /// is recomputed on the next flush.
    pub fn set_viewport_months(&mut self, months: f64) {
        self.viewport_months = months.max(1.0);
    }

    /// Restricts scrolling to the months containing the bound dates.
    pub fn set_bounds(&mut self, min: Option<CalendarDate>, max: Option<CalendarDate>) {
        self.min_month = min.map(|d| self.offset_of(d.year_month()));
        self.max_month = max.map(|d| self.offset_of(d.year_month()));
    }

    /// Clamps a scroll position so the viewport never shows months outside
    /// the bounds, even under animation overshoot.
    pub fn clamp_position(&self, position: f64) -> f64 {
        let mut clamped = position;
        if let Some(max) = self.max_month {
            clamped = clamped.min((max + 1) as f64 - self.viewport_months);
        }
        if let Some(min) = self.min_month {
            clamped = clamped.max(min as f64);
        }
        clamped
    }

    /// True when the month at `offset` is fully inside the viewport that
    /// starts at `position`.
    pub fn is_revealed(&self, offset: MonthOffset, position: f64) -> bool {
        let top = offset as f64;
        position - POSITION_EPSILON <= top
            && top + 1.0 <= position + self.viewport_months + POSITION_EPSILON
    }

    /// Scroll position that reveals `offset` with minimal movement from
    /// `from`, or `None` when the month is already fully visible.
    pub fn reveal_target(&self, offset: MonthOffset, from: f64) -> Option<f64> {
        if self.is_revealed(offset, from) {
            return None;
        }
        let top = offset as f64;
        let target = if top < from {
            top
        } else {
            top + 1.0 - self.viewport_months
        };
        Some(self.clamp_position(target))
    }

    /// Records the latest viewport position; work is coalesced until
    /// [`flush`](Self::flush). Last request wins.
    pub fn request_viewport(&mut self, position: f64) {
        self.pending_viewport = Some(self.clamp_position(position));
    }

    /// Drops any pending materialization work without applying it.
    pub fn discard_pending(&mut self) {
        self.pending_viewport = None;
    }

    /// Applies the pending viewport, recomputing the materialization window
    /// at most once regardless of how many requests arrived since the last
    /// flush. Returns `None` when nothing was pending or the window did not
    /// change.
    pub fn flush(&mut self) -> Option<MaterializedWindow> {
        let position = self.pending_viewport.take()?;
        let range = self.range_at(position);
        if self.window == Some(range) {
            return None;
        }

        let mut added = SmallVec::new();
        for offset in range.0..=range.1 {
            let slot = self.slots.entry(offset).or_insert(MonthSlot {
                materialized: false,
                focused_day: None,
            });
            if !slot.materialized {
                slot.materialized = true;
                added.push(offset);
            }
        }

        let mut released = SmallVec::new();
        if let Some((old_start, old_end)) = self.window {
            for offset in old_start..=old_end {
                if (range.0..=range.1).contains(&offset) {
                    continue;
                }
                if let Some(slot) = self.slots.get_mut(&offset)
                    && slot.materialized
                {
                    slot.materialized = false;
                    released.push(offset);
                }
            }
        }

        self.window = Some(range);
        debug!(start = range.0, end = range.1, "materialized window updated");
        Some(MaterializedWindow {
            range,
            added,
            released,
        })
    }

    /// The currently materialized offset range, if a flush has happened.
    pub fn materialized_window(&self) -> Option<(MonthOffset, MonthOffset)> {
        self.window
    }

    /// True when the month at `offset` currently has backing state.
    pub fn is_materialized(&self, offset: MonthOffset) -> bool {
        self.slots
            .get(&offset)
            .map(|slot| slot.materialized)
            .unwrap_or(false)
    }

    /// Remembers which day cell was focused in a month. Survives the month
    /// scrolling out of the window.
    pub fn remember_focused_day(&mut self, offset: MonthOffset, day: u8) {
        let slot = self.slots.entry(offset).or_insert(MonthSlot {
            materialized: false,
            focused_day: None,
        });
        slot.focused_day = Some(day);
    }

    /// Last focused day cell in a month, if any.
    pub fn focused_day(&self, offset: MonthOffset) -> Option<u8> {
        self.slots.get(&offset).and_then(|slot| slot.focused_day)
    }

    /// Grid coordinates of a date under the given first day of week.
    pub fn grid_coordinates(
        &self,
        date: CalendarDate,
        first_day_of_week: Weekday,
    ) -> CellCoordinates {
        let first_weekday = date.start_of_month().weekday();
        let lead = (first_weekday.index_from_monday() - first_day_of_week.index_from_monday())
            .rem_euclid(7);
        let index = lead + date.day() as i32 - 1;
        CellCoordinates {
            month_offset: self.offset_of(date.year_month()),
            row: (index / 7) as u8,
            column: (index % 7) as u8,
        }
    }

    fn range_at(&self, position: f64) -> (MonthOffset, MonthOffset) {
        let first = position.floor() as i64;
        // Last month index intersecting the viewport bottom edge.
        let last = (position + self.viewport_months - POSITION_EPSILON).floor() as i64;
        let mut start = first - self.overscan as i64;
        let mut end = last.max(first) + self.overscan as i64;
        if let Some(min) = self.min_month {
            start = start.max(min as i64);
        }
        if let Some(max) = self.max_month {
            end = end.min(max as i64);
        }
        if end < start {
            end = start;
        }
        (start as MonthOffset, end as MonthOffset)
    }
}
