//! Keyboard-driven focus state machine for the calendar overlay.
//!
//! ## Usage
//!
//! [`CalendarNavigator`] owns the focused date, interprets keyboard commands
//! into date transitions, keeps focus legal against the configured
//! constraints, and asks the timeline/animator pair to reveal the focused
//! month. The host pumps [`on_frame`](CalendarNavigator::on_frame) with the
//! current instant and drains [`take_events`](CalendarNavigator::take_events)
//! after every call.
//!
//! Fine-grained steps (arrow keys) may land on a disabled date; coarse jumps
//! (Home/End, month and year paging) are always redirected to the closest
//! allowed date. Selection is only ever committed to an allowed date.

use std::{
    mem,
    sync::Arc,
    time::{Duration, Instant},
};

use derive_setters::Setters;
use smallvec::SmallVec;
use tracing::debug;

use crate::{
    animator::{ScrollAnimator, ScrollFinished},
    constraint::{AllEnabled, DateConstraints, DisabledDates, ScanDirection},
    date::{CalendarDate, Weekday},
    timeline::{CellCoordinates, MaterializedWindow, MonthOffset, MonthTimeline, TimelineArgs},
};

/// Keys the calendar grid reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    /// Move one day toward the end of the week row.
    ArrowRight,
    /// Move one day toward the start of the week row.
    ArrowLeft,
    /// Move one week later.
    ArrowDown,
    /// Move one week earlier.
    ArrowUp,
    /// Jump to the start of the focused month.
    Home,
    /// Jump to the end of the focused month.
    End,
    /// Next month; next year when shifted.
    PageDown,
    /// Previous month; previous year when shifted.
    PageUp,
    /// Commit the focused date and close.
    Enter,
    /// Commit the focused date, keep the overlay open.
    Space,
    /// Close without committing.
    Escape,
}

/// A key press with its shift modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    /// Which key was pressed.
    pub key: NavKey,
    /// Whether shift was held.
    pub shift: bool,
}

impl KeyPress {
    /// A key press without modifiers.
    pub fn plain(key: NavKey) -> Self {
        Self { key, shift: false }
    }

    /// A key press with shift held.
    pub fn shifted(key: NavKey) -> Self {
        Self { key, shift: true }
    }
}

/// Horizontal text direction; flips the meaning of ArrowLeft/ArrowRight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextDirection {
    /// Left-to-right.
    #[default]
    Ltr,
    /// Right-to-left.
    Rtl,
}

/// Lifecycle of the overlay focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPhase {
    /// Overlay closed.
    Idle,
    /// Overlay open, no cell focused.
    Open,
    /// Overlay open with a focused day cell.
    Focused(CalendarDate),
}

/// Events produced for the surrounding shell, drained via
/// [`CalendarNavigator::take_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum NavEvent {
    /// A reveal scroll reached its target.
    ScrollFinished(ScrollFinished),
    /// A selection commit was attempted. The value was mutated iff `valid`;
    /// `date` is `None` on deselect.
    SelectionCommitted {
        /// The attempted (or cleared) value.
        date: Option<CalendarDate>,
        /// Whether the commit was accepted.
        valid: bool,
    },
    /// The materialized month window changed.
    WindowChanged(MaterializedWindow),
    /// The navigator wants the overlay closed (Enter commit or Escape).
    CloseRequested,
}

/// Configuration for [`CalendarNavigator`].
#[derive(Clone, Setters)]
pub struct NavigatorArgs {
    /// Inclusive lower bound for focusable and selectable dates.
    #[setters(strip_option)]
    pub min_date: Option<CalendarDate>,
    /// Inclusive upper bound for focusable and selectable dates.
    #[setters(strip_option)]
    pub max_date: Option<CalendarDate>,
    /// Disabled-date policy, orthogonal to the bounds.
    pub disabled_dates: Arc<dyn DisabledDates>,
    /// Initially selected date; dropped when not allowed.
    #[setters(strip_option)]
    pub selected_date: Option<CalendarDate>,
    /// Date to scroll to on first open when nothing is focused or selected.
    #[setters(strip_option)]
    pub initial_position: Option<CalendarDate>,
    /// First day of the week for grid coordinates.
    pub first_day_of_week: Weekday,
    /// Text direction for horizontal arrow keys.
    pub text_direction: TextDirection,
    /// Duration of animated reveal scrolls. Zero means instant.
    pub scroll_duration: Duration,
    /// Timeline viewport and overscan configuration.
    pub timeline: TimelineArgs,
}

impl Default for NavigatorArgs {
    fn default() -> Self {
        Self {
            min_date: None,
            max_date: None,
            disabled_dates: Arc::new(AllEnabled),
            selected_date: None,
            initial_position: None,
            first_day_of_week: Weekday::Monday,
            text_direction: TextDirection::Ltr,
            scroll_duration: Duration::from_millis(300),
            timeline: TimelineArgs::default(),
        }
    }
}

/// Owns the focused date and drives the month timeline from keyboard input.
pub struct CalendarNavigator {
    constraints: DateConstraints,
    timeline: MonthTimeline,
    animator: ScrollAnimator,
    first_day_of_week: Weekday,
    text_direction: TextDirection,
    scroll_duration: Duration,
    selected: Option<CalendarDate>,
    initial_position: Option<CalendarDate>,
    phase: FocusPhase,
    last_focus: Option<CalendarDate>,
    /// Day-of-month the user last chose explicitly; month and year paging
    /// keep aiming for it even after an end-of-month clamp, so PageDown from
    /// Jan 31 goes Feb 29 then Mar 31.
    preferred_day: Option<u8>,
    events: SmallVec<[NavEvent; 4]>,
}

impl CalendarNavigator {
    /// Creates a navigator; the timeline anchor is the month of the selected
    /// date, the initial position, or today, in that order.
    pub fn new(args: NavigatorArgs) -> Self {
        let constraints = DateConstraints::new(args.min_date, args.max_date, args.disabled_dates);
        let selected = args.selected_date.filter(|date| constraints.is_allowed(*date));
        let anchor_date = selected
            .or(args.initial_position)
            .unwrap_or_else(CalendarDate::today);
        let mut timeline = MonthTimeline::new(anchor_date.year_month(), args.timeline);
        timeline.set_bounds(constraints.min(), constraints.max());

        Self {
            animator: ScrollAnimator::new(timeline.clamp_position(0.0)),
            constraints,
            timeline,
            first_day_of_week: args.first_day_of_week,
            text_direction: args.text_direction,
            scroll_duration: args.scroll_duration,
            selected,
            initial_position: args.initial_position,
            phase: FocusPhase::Idle,
            last_focus: None,
            preferred_day: None,
            events: SmallVec::new(),
        }
    }

    /// Returns the focused date while the overlay is open.
    pub fn focused_date(&self) -> Option<CalendarDate> {
        match self.phase {
            FocusPhase::Focused(date) => Some(date),
            _ => None,
        }
    }

    /// Returns the committed value.
    pub fn selected_date(&self) -> Option<CalendarDate> {
        self.selected
    }

    /// Returns the focus lifecycle phase.
    pub fn phase(&self) -> FocusPhase {
        self.phase
    }

    /// True while the overlay is open.
    pub fn is_open(&self) -> bool {
        !matches!(self.phase, FocusPhase::Idle)
    }

    /// Current scroll position in fractional month offsets.
    pub fn position(&self) -> f64 {
        self.animator.position()
    }

    /// Returns the constraint configuration.
    pub fn constraints(&self) -> &DateConstraints {
        &self.constraints
    }

    /// The remembered first-open scroll target, once captured.
    pub fn initial_position(&self) -> Option<CalendarDate> {
        self.initial_position
    }

    /// Shared view of the month timeline.
    pub fn timeline(&self) -> &MonthTimeline {
        &self.timeline
    }

    /// Drains the queued shell events.
    pub fn take_events(&mut self) -> SmallVec<[NavEvent; 4]> {
        mem::take(&mut self.events)
    }

    /// Opens the overlay. Restores the previous focus when reopening,
    /// otherwise derives one from the selection, the initial position, or
    /// today, redirected to the closest allowed date. The first open pins
    /// `initial_position` so reopening never recomputes it from today.
    pub fn open(&mut self, now: Instant) {
        if self.is_open() {
            return;
        }
        if self.initial_position.is_none() {
            self.initial_position = Some(self.selected.unwrap_or_else(CalendarDate::today));
        }

        let seed = self
            .last_focus
            .or(self.selected)
            .or(self.initial_position)
            .unwrap_or_else(CalendarDate::today);
        let focus = self
            .last_focus
            .filter(|date| self.constraints.in_bounds(*date))
            .or_else(|| self.constraints.closest_allowed(seed, ScanDirection::Forward));

        match focus {
            Some(date) => {
                debug!(%date, "overlay opened with focus");
                self.phase = FocusPhase::Focused(date);
                self.preferred_day = Some(date.day());
                self.remember_focus_cell(date);
                self.jump_to_month_of(date);
            }
            None => {
                debug!("overlay opened without a focusable date");
                self.phase = FocusPhase::Open;
                self.jump_to_month_of(seed);
            }
        }
        // Initial layout pass so the window exists before the first input.
        self.on_frame(now);
    }

    /// Closes the overlay: the in-flight scroll is cancelled, pending
    /// materialization is discarded, and the focus is remembered for the
    /// next open.
    pub fn close(&mut self) {
        if !self.is_open() {
            return;
        }
        self.last_focus = self.focused_date().or(self.last_focus);
        self.phase = FocusPhase::Idle;
        self.animator.cancel();
        self.timeline.discard_pending();
        debug!("overlay closed");
    }

    /// Handles one key press. Returns true when the key was consumed.
    pub fn handle_key(&mut self, press: KeyPress, now: Instant) -> bool {
        if !self.is_open() {
            return false;
        }
        match press.key {
            NavKey::Escape => {
                self.events.push(NavEvent::CloseRequested);
                self.close();
                true
            }
            NavKey::Enter => {
                if let Some(date) = self.focused_date()
                    && self.commit(Some(date))
                {
                    self.events.push(NavEvent::CloseRequested);
                    self.close();
                }
                true
            }
            NavKey::Space => {
                if let Some(date) = self.focused_date() {
                    self.commit(Some(date));
                }
                true
            }
            _ => self.handle_movement(press, now),
        }
    }

    /// Programmatic focus: `date` is redirected to the closest allowed date
    /// and revealed. Returns true when a reveal scroll was started.
    pub fn focus_date(&mut self, date: CalendarDate, now: Instant) -> bool {
        let Some(resolved) = self.constraints.closest_allowed(date, ScanDirection::Forward) else {
            return false;
        };
        if !self.is_open() {
            self.last_focus = Some(resolved);
            return false;
        }
        self.phase = FocusPhase::Focused(resolved);
        self.preferred_day = Some(resolved.day());
        self.remember_focus_cell(resolved);
        self.reveal_date(resolved, true, now)
    }

    /// Ensures a focused cell exists and returns its grid coordinates,
    /// revealing its month at most once. Mirrors focusing the cell element
    /// in the rendering shell.
    pub fn focus_cell(&mut self, now: Instant) -> Option<CellCoordinates> {
        if !self.is_open() {
            return None;
        }
        let date = match self.focused_date() {
            Some(date) => date,
            None => {
                let seed = self
                    .selected
                    .or(self.initial_position)
                    .unwrap_or_else(CalendarDate::today);
                let date = self.constraints.closest_allowed(seed, ScanDirection::Forward)?;
                self.phase = FocusPhase::Focused(date);
                self.preferred_day = Some(date.day());
                self.remember_focus_cell(date);
                date
            }
        };
        self.reveal_date(date, true, now);
        Some(self.cell_coordinates(date))
    }

    /// Ensures `date`'s month is visible, scrolling minimally. A no-op when
    /// the month is already inside the visible window; the no-op fires no
    /// completion signal. Returns true when a scroll was started.
    pub fn reveal_date(&mut self, date: CalendarDate, animate: bool, now: Instant) -> bool {
        let offset = self.timeline.offset_of(date.year_month());
        self.reveal_month(offset, animate, now)
    }

    /// Scroll-only primitive: aligns the month of `date` with the viewport
    /// without touching focus.
    pub fn scroll_to_date(&mut self, date: CalendarDate, animate: bool, now: Instant) {
        let offset = self.timeline.offset_of(date.year_month());
        let target = self.timeline.clamp_position(offset as f64);
        self.animator.start(target, self.effective_duration(animate), now);
    }

    /// Attempts to commit `date` as the selected value. A disallowed date
    /// fails without mutating anything.
    pub fn select_date(&mut self, date: CalendarDate) -> bool {
        self.commit(Some(date))
    }

    /// Clears the committed value.
    pub fn clear_selection(&mut self) {
        self.commit(None);
    }

    /// Replaces the lower bound and re-validates focus and selection.
    pub fn set_min_date(&mut self, min: Option<CalendarDate>, now: Instant) {
        self.constraints.set_min(min);
        self.apply_constraint_change(now);
    }

    /// Replaces the upper bound and re-validates focus and selection.
    pub fn set_max_date(&mut self, max: Option<CalendarDate>, now: Instant) {
        self.constraints.set_max(max);
        self.apply_constraint_change(now);
    }

    /// Replaces the disabled-date policy and re-validates focus and
    /// selection.
    pub fn set_disabled_dates(&mut self, disabled: Arc<dyn DisabledDates>, now: Instant) {
        self.constraints.set_disabled(disabled);
        self.apply_constraint_change(now);
    }

    /// Overrides the remembered initial position.
    pub fn set_initial_position(&mut self, date: Option<CalendarDate>) {
        self.initial_position = date;
    }

    /// Changes the first day of the week used for grid coordinates.
    pub fn set_first_day_of_week(&mut self, day: Weekday) {
        self.first_day_of_week = day;
    }

    /// Changes the horizontal text direction.
    pub fn set_text_direction(&mut self, direction: TextDirection) {
        self.text_direction = direction;
    }

    /// Resizes the viewport and queues a window recomputation, applied on
    /// the next frame.
    pub fn set_viewport_months(&mut self, months: f64) {
        self.timeline.set_viewport_months(months);
        self.timeline.request_viewport(self.animator.position());
    }

    /// Grid coordinates of a date under the configured first day of week.
    pub fn cell_coordinates(&self, date: CalendarDate) -> CellCoordinates {
        self.timeline.grid_coordinates(date, self.first_day_of_week)
    }

    /// Frame pump: advances the scroll animation and applies coalesced
    /// materialization work. Call once per animation frame while open.
    pub fn on_frame(&mut self, now: Instant) {
        if !self.is_open() {
            return;
        }
        if let Some(finished) = self.animator.tick(now) {
            self.events.push(NavEvent::ScrollFinished(finished));
        }
        self.timeline.request_viewport(self.animator.position());
        if let Some(window) = self.timeline.flush() {
            self.events.push(NavEvent::WindowChanged(window));
        }
    }

    fn handle_movement(&mut self, press: KeyPress, now: Instant) -> bool {
        let Some(current) = self.focused_date() else {
            // No focusable cell yet; try to establish one.
            self.focus_cell(now);
            return true;
        };

        let next = match press.key {
            NavKey::ArrowRight => Some(self.fine_step(current, self.horizontal_step(1))),
            NavKey::ArrowLeft => Some(self.fine_step(current, self.horizontal_step(-1))),
            NavKey::ArrowDown => Some(self.fine_step(current, 7)),
            NavKey::ArrowUp => Some(self.fine_step(current, -7)),
            NavKey::Home => self
                .constraints
                .closest_allowed(current.start_of_month(), ScanDirection::Forward),
            NavKey::End => self
                .constraints
                .closest_allowed(current.end_of_month(), ScanDirection::Backward),
            NavKey::PageDown => self.page(current, if press.shift { 12 } else { 1 }),
            NavKey::PageUp => self.page(current, if press.shift { -12 } else { -1 }),
            _ => unreachable!("non-movement keys handled by caller"),
        };

        let Some(next) = next else {
            // No allowed date to move to; focus stays where it is.
            return true;
        };
        if next == current {
            return true;
        }

        debug!(from = %current, to = %next, key = ?press.key, "focus moved");
        self.phase = FocusPhase::Focused(next);
        match press.key {
            // Paging keeps aiming for the previously chosen day of month.
            NavKey::PageDown | NavKey::PageUp => {}
            _ => self.preferred_day = Some(next.day()),
        }
        self.remember_focus_cell(next);
        self.reveal_date(next, true, now);
        true
    }

    /// A single-day or single-week step: clamped to the bounds, but allowed
    /// to land on a disabled date.
    fn fine_step(&self, current: CalendarDate, days: i64) -> CalendarDate {
        self.constraints.clamp_to_bounds(current.add_days(days))
    }

    fn horizontal_step(&self, days: i64) -> i64 {
        match self.text_direction {
            TextDirection::Ltr => days,
            TextDirection::Rtl => -days,
        }
    }

    /// Month or year paging: the candidate keeps the preferred day of month
    /// (clamped into the shorter target month, so a month is never skipped)
    /// and is then redirected to the closest allowed date in the direction
    /// of travel.
    fn page(&self, current: CalendarDate, months: i32) -> Option<CalendarDate> {
        let target_month = current.year_month().add_months(months);
        let day = self
            .preferred_day
            .unwrap_or(current.day())
            .min(target_month.len_days());
        let candidate = target_month
            .to_date(day)
            .unwrap_or_else(|| target_month.last_day());
        let direction = if months < 0 {
            ScanDirection::Backward
        } else {
            ScanDirection::Forward
        };
        self.constraints.closest_allowed(candidate, direction)
    }

    fn commit(&mut self, date: Option<CalendarDate>) -> bool {
        let valid = match date {
            Some(date) => self.constraints.is_allowed(date),
            None => true,
        };
        if valid {
            self.selected = date;
        }
        debug!(date = ?date.map(|d| d.to_string()), valid, "selection commit");
        self.events.push(NavEvent::SelectionCommitted { date, valid });
        valid
    }

    fn apply_constraint_change(&mut self, now: Instant) {
        self.timeline
            .set_bounds(self.constraints.min(), self.constraints.max());

        if let Some(selected) = self.selected
            && !self.constraints.is_allowed(selected)
        {
            self.selected = None;
            self.events.push(NavEvent::SelectionCommitted {
                date: None,
                valid: true,
            });
        }

        if let Some(remembered) = self.last_focus
            && !self.constraints.is_allowed(remembered)
        {
            self.last_focus = self
                .constraints
                .closest_allowed(remembered, ScanDirection::Forward);
        }

        if let Some(focused) = self.focused_date()
            && !self.constraints.is_allowed(focused)
            && let Some(relocated) = self
                .constraints
                .closest_allowed(focused, ScanDirection::Forward)
        {
            debug!(from = %focused, to = %relocated, "focus relocated after constraint change");
            self.phase = FocusPhase::Focused(relocated);
            self.preferred_day = Some(relocated.day());
            self.remember_focus_cell(relocated);
            self.reveal_date(relocated, true, now);
        }

        if !self.animator.is_animating() {
            let clamped = self.timeline.clamp_position(self.animator.position());
            if clamped != self.animator.position() {
                self.animator.jump_to(clamped);
                self.timeline.request_viewport(clamped);
            }
        }
    }

    fn reveal_month(&mut self, offset: MonthOffset, animate: bool, now: Instant) -> bool {
        // Compare against the in-flight target so a reveal that is already
        // underway is not restarted.
        let basis = if self.animator.is_animating() {
            self.animator.target()
        } else {
            self.animator.position()
        };
        match self.timeline.reveal_target(offset, basis) {
            None => false,
            Some(target) => {
                self.animator
                    .start(target, self.effective_duration(animate), now);
                true
            }
        }
    }

    fn effective_duration(&self, animate: bool) -> Duration {
        if animate {
            self.scroll_duration
        } else {
            Duration::ZERO
        }
    }

    fn jump_to_month_of(&mut self, date: CalendarDate) {
        let offset = self.timeline.offset_of(date.year_month());
        let position = self.timeline.clamp_position(offset as f64);
        self.animator.jump_to(position);
        self.timeline.request_viewport(position);
    }

    fn remember_focus_cell(&mut self, date: CalendarDate) {
        let offset = self.timeline.offset_of(date.year_month());
        self.timeline.remember_focused_day(offset, date.day());
    }
}
