//! Shell-facing overlay content handle.
//!
//! ## Usage
//!
//! [`OverlayContent`] is the boundary between the navigation engine and the
//! rendering shell. It is a clonable handle over one navigator instance;
//! the shell forwards keyboard input and frame ticks, registers callbacks
//! for scroll completion, selection commits, window changes, and close
//! requests, and reads the committed value as an ISO-8601 string.
//!
//! Callbacks are dispatched after the internal lock is released, so a
//! callback may re-enter the handle.

use std::{sync::Arc, time::Instant};

use derive_builder::Builder;
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::{
    animator::ScrollFinished,
    constraint::DisabledDates,
    date::{CalendarDate, DateParseError, Weekday},
    navigator::{CalendarNavigator, KeyPress, NavEvent, NavigatorArgs, TextDirection},
    timeline::{CellCoordinates, MaterializedWindow},
};

/// Callback for completed reveal scrolls.
pub type ScrollFinishedCallback = Arc<dyn Fn(ScrollFinished) + Send + Sync>;
/// Callback for selection commit attempts: the attempted value (`None` on
/// deselect) and whether it was accepted.
pub type SelectionCallback = Arc<dyn Fn(Option<CalendarDate>, bool) + Send + Sync>;
/// Callback for materialized window changes.
pub type WindowChangedCallback = Arc<dyn Fn(MaterializedWindow) + Send + Sync>;
/// Callback function triggered when a close request is made, for example by
/// committing with Enter or pressing the `ESC` key.
pub type CloseRequestCallback = Arc<dyn Fn() + Send + Sync>;

/// Arguments for [`OverlayContent`].
#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct OverlayArgs {
    /// Navigation engine configuration.
    #[builder(default = "NavigatorArgs::default()")]
    pub navigator: NavigatorArgs,
    /// Invoked when a reveal scroll reaches its target.
    #[builder(default, setter(strip_option))]
    pub on_scroll_finished: Option<ScrollFinishedCallback>,
    /// Invoked on every selection commit attempt.
    #[builder(default, setter(strip_option))]
    pub on_selection: Option<SelectionCallback>,
    /// Invoked when the materialized month window changes.
    #[builder(default, setter(strip_option))]
    pub on_window_changed: Option<WindowChangedCallback>,
    /// Invoked when the engine wants the overlay closed.
    #[builder(default, setter(strip_option))]
    pub on_close_request: Option<CloseRequestCallback>,
}

impl Default for OverlayArgs {
    fn default() -> Self {
        OverlayArgsBuilder::default()
            .build()
            .expect("builder construction failed")
    }
}

struct Callbacks {
    on_scroll_finished: Option<ScrollFinishedCallback>,
    on_selection: Option<SelectionCallback>,
    on_window_changed: Option<WindowChangedCallback>,
    on_close_request: Option<CloseRequestCallback>,
}

/// Clonable handle to one date-picker overlay instance.
#[derive(Clone)]
pub struct OverlayContent {
    navigator: Arc<RwLock<CalendarNavigator>>,
    callbacks: Arc<Callbacks>,
}

impl OverlayContent {
    /// Creates an overlay content instance.
    pub fn new(args: OverlayArgs) -> Self {
        Self {
            navigator: Arc::new(RwLock::new(CalendarNavigator::new(args.navigator))),
            callbacks: Arc::new(Callbacks {
                on_scroll_finished: args.on_scroll_finished,
                on_selection: args.on_selection,
                on_window_changed: args.on_window_changed,
                on_close_request: args.on_close_request,
            }),
        }
    }

    /// Opens the overlay, restoring focus and scroll position.
    pub fn open(&self, now: Instant) {
        self.with_navigator(|nav| nav.open(now));
    }

    /// Closes the overlay, cancelling any in-flight scroll.
    pub fn close(&self) {
        self.with_navigator(|nav| nav.close());
    }

    /// True while the overlay is open.
    pub fn is_open(&self) -> bool {
        self.navigator.read().is_open()
    }

    /// Forwards one key press. Returns true when it was consumed.
    pub fn handle_key(&self, press: KeyPress, now: Instant) -> bool {
        self.with_navigator(|nav| nav.handle_key(press, now))
    }

    /// Frame pump; call once per animation frame while open.
    pub fn on_frame(&self, now: Instant) {
        self.with_navigator(|nav| nav.on_frame(now));
    }

    /// Focuses and reveals a date, redirected to the closest allowed date.
    /// Returns true when a reveal scroll was started; completion is
    /// reported through the scroll-finished callback.
    pub fn focus_date(&self, date: CalendarDate, now: Instant) -> bool {
        self.with_navigator(|nav| nav.focus_date(date, now))
    }

    /// Ensures a focused cell exists and returns its grid coordinates for
    /// the shell to focus, revealing its month at most once.
    pub fn focus_cell(&self, now: Instant) -> Option<CellCoordinates> {
        self.with_navigator(|nav| nav.focus_cell(now))
    }

    /// Ensures a date's month is visible. Idempotent; a no-op call fires no
    /// completion signal.
    pub fn reveal_date(&self, date: CalendarDate, animate: bool, now: Instant) -> bool {
        self.with_navigator(|nav| nav.reveal_date(date, animate, now))
    }

    /// Scroll-only primitive used to show today/min/max/initial position.
    pub fn scroll_to_date(&self, date: CalendarDate, animate: bool, now: Instant) {
        self.with_navigator(|nav| nav.scroll_to_date(date, animate, now));
    }

    /// Attempts to commit a date; fails on a disallowed date without
    /// mutating the value.
    pub fn select_date(&self, date: CalendarDate) -> bool {
        self.with_navigator(|nav| nav.select_date(date))
    }

    /// Clears the committed value.
    pub fn clear_selection(&self) {
        self.with_navigator(|nav| nav.clear_selection());
    }

    /// Returns the focused date while the overlay is open.
    pub fn focused_date(&self) -> Option<CalendarDate> {
        self.navigator.read().focused_date()
    }

    /// Returns the committed value.
    pub fn selected_date(&self) -> Option<CalendarDate> {
        self.navigator.read().selected_date()
    }

    /// Current scroll position in fractional month offsets.
    pub fn position(&self) -> f64 {
        self.navigator.read().position()
    }

    /// Committed value as an ISO-8601 `YYYY-MM-DD` string.
    pub fn value(&self) -> Option<String> {
        self.navigator.read().selected_date().map(|d| d.to_string())
    }

    /// Sets the committed value from an ISO-8601 string; an empty string
    /// clears it. Returns whether the commit was accepted.
    pub fn set_value(&self, value: &str) -> Result<bool, DateParseError> {
        if value.is_empty() {
            self.clear_selection();
            return Ok(true);
        }
        let date: CalendarDate = value.parse()?;
        Ok(self.select_date(date))
    }

    /// Replaces the lower bound and re-validates focus and selection.
    pub fn set_min_date(&self, min: Option<CalendarDate>, now: Instant) {
        self.with_navigator(|nav| nav.set_min_date(min, now));
    }

    /// Replaces the upper bound and re-validates focus and selection.
    pub fn set_max_date(&self, max: Option<CalendarDate>, now: Instant) {
        self.with_navigator(|nav| nav.set_max_date(max, now));
    }

    /// Replaces the disabled-date policy and re-validates focus and
    /// selection.
    pub fn set_disabled_dates(&self, disabled: Arc<dyn DisabledDates>, now: Instant) {
        self.with_navigator(|nav| nav.set_disabled_dates(disabled, now));
    }

    /// Overrides the remembered initial position.
    pub fn set_initial_position(&self, date: Option<CalendarDate>) {
        self.with_navigator(|nav| nav.set_initial_position(date));
    }

    /// Changes the first day of the week used for grid coordinates.
    pub fn set_first_day_of_week(&self, day: Weekday) {
        self.with_navigator(|nav| nav.set_first_day_of_week(day));
    }

    /// Changes the horizontal text direction.
    pub fn set_text_direction(&self, direction: TextDirection) {
        self.with_navigator(|nav| nav.set_text_direction(direction));
    }

    /// Resizes the viewport, measured in months.
    pub fn set_viewport_months(&self, months: f64) {
        self.with_navigator(|nav| nav.set_viewport_months(months));
    }

    /// Grid coordinates of a date under the configured first day of week.
    pub fn cell_coordinates(&self, date: CalendarDate) -> CellCoordinates {
        self.navigator.read().cell_coordinates(date)
    }

    /// Runs `f` under the write lock, then dispatches the produced events
    /// with the lock released.
    fn with_navigator<R>(&self, f: impl FnOnce(&mut CalendarNavigator) -> R) -> R {
        let (result, events) = {
            let mut nav = self.navigator.write();
            let result = f(&mut nav);
            (result, nav.take_events())
        };
        self.dispatch(events);
        result
    }

    fn dispatch(&self, events: SmallVec<[NavEvent; 4]>) {
        for event in events {
            match event {
                NavEvent::ScrollFinished(finished) => {
                    if let Some(callback) = &self.callbacks.on_scroll_finished {
                        callback(finished);
                    }
                }
                NavEvent::SelectionCommitted { date, valid } => {
                    if let Some(callback) = &self.callbacks.on_selection {
                        callback(date, valid);
                    }
                }
                NavEvent::WindowChanged(window) => {
                    if let Some(callback) = &self.callbacks.on_window_changed {
                        callback(window);
                    }
                }
                NavEvent::CloseRequested => {
                    if let Some(callback) = &self.callbacks.on_close_request {
                        callback();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;
    use crate::navigator::NavKey;

    fn date(year: i32, month: u8, day: u8) -> CalendarDate {
        CalendarDate::new(year, month, day).unwrap()
    }

    fn overlay_with_counters() -> (OverlayContent, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let scrolls = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));
        let scrolls_cb = scrolls.clone();
        let closes_cb = closes.clone();
        let args = OverlayArgsBuilder::default()
            .navigator(
                NavigatorArgs::default()
                    .selected_date(date(2010, 5, 17))
                    .scroll_duration(Duration::ZERO),
            )
            .on_scroll_finished(Arc::new(move |_| {
                scrolls_cb.fetch_add(1, Ordering::SeqCst);
            }) as ScrollFinishedCallback)
            .on_close_request(Arc::new(move || {
                closes_cb.fetch_add(1, Ordering::SeqCst);
            }) as CloseRequestCallback)
            .build()
            .expect("builder construction failed");
        (OverlayContent::new(args), scrolls, closes)
    }

    #[test]
    fn test_scroll_finished_fires_once_per_reveal() {
        let now = Instant::now();
        let (overlay, scrolls, _) = overlay_with_counters();
        overlay.open(now);
        overlay.on_frame(now);
        assert_eq!(scrolls.load(Ordering::SeqCst), 0);

        overlay.reveal_date(date(2011, 5, 17), true, now);
        for step in 1..=4u64 {
            overlay.on_frame(now + Duration::from_millis(step * 16));
        }
        assert_eq!(scrolls.load(Ordering::SeqCst), 1);

        // Idempotent repeat: no second completion.
        overlay.reveal_date(date(2011, 5, 17), true, now + Duration::from_millis(100));
        overlay.on_frame(now + Duration::from_millis(120));
        assert_eq!(scrolls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_escape_requests_close() {
        let now = Instant::now();
        let (overlay, _, closes) = overlay_with_counters();
        overlay.open(now);
        overlay.handle_key(KeyPress::plain(NavKey::Escape), now);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(!overlay.is_open());
    }

    #[test]
    fn test_value_roundtrip() {
        let now = Instant::now();
        let (overlay, _, _) = overlay_with_counters();
        overlay.open(now);
        assert_eq!(overlay.value(), Some("2010-05-17".to_string()));
        assert_eq!(overlay.set_value("2010-06-01"), Ok(true));
        assert_eq!(overlay.selected_date(), Some(date(2010, 6, 1)));
        assert_eq!(overlay.set_value(""), Ok(true));
        assert_eq!(overlay.value(), None);
        assert!(overlay.set_value("junk").is_err());
    }

    #[test]
    fn test_selection_callback_reports_validity() {
        let now = Instant::now();
        let outcomes: Arc<RwLock<Vec<(Option<CalendarDate>, bool)>>> =
            Arc::new(RwLock::new(Vec::new()));
        let outcomes_cb = outcomes.clone();
        let args = OverlayArgsBuilder::default()
            .navigator(
                NavigatorArgs::default()
                    .min_date(date(2010, 1, 1))
                    .max_date(date(2010, 12, 31))
                    .scroll_duration(Duration::ZERO),
            )
            .on_selection(Arc::new(move |selected, valid| {
                outcomes_cb.write().push((selected, valid));
            }) as SelectionCallback)
            .build()
            .expect("builder construction failed");
        let overlay = OverlayContent::new(args);
        overlay.open(now);

        assert!(!overlay.select_date(date(2011, 1, 1)));
        assert!(overlay.select_date(date(2010, 3, 4)));
        overlay.clear_selection();

        let recorded = outcomes.read().clone();
        assert_eq!(
            recorded,
            vec![
                (Some(date(2011, 1, 1)), false),
                (Some(date(2010, 3, 4)), true),
                (None, true),
            ]
        );
    }

    #[test]
    fn test_callback_may_reenter_handle() {
        let now = Instant::now();
        let reentered = Arc::new(AtomicUsize::new(0));
        let reentered_cb = reentered.clone();
        let slot: Arc<RwLock<Option<OverlayContent>>> = Arc::new(RwLock::new(None));
        let slot_cb = slot.clone();
        let args = OverlayArgsBuilder::default()
            .navigator(
                NavigatorArgs::default()
                    .selected_date(date(2010, 5, 17))
                    .scroll_duration(Duration::ZERO),
            )
            .on_scroll_finished(Arc::new(move |_| {
                if let Some(overlay) = slot_cb.read().clone() {
                    // Reading state from inside the callback must not deadlock.
                    let _ = overlay.focused_date();
                    reentered_cb.fetch_add(1, Ordering::SeqCst);
                }
            }) as ScrollFinishedCallback)
            .build()
            .expect("builder construction failed");
        let overlay = OverlayContent::new(args);
        *slot.write() = Some(overlay.clone());

        overlay.open(now);
        overlay.reveal_date(date(2012, 1, 1), true, now);
        overlay.on_frame(now + Duration::from_millis(16));
        assert_eq!(reentered.load(Ordering::SeqCst), 1);
    }
}
