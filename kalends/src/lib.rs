//! kalends is a headless navigation engine for an infinitely scrolling
//! date-picker overlay.
//!
//! The overlay content renders a virtual timeline of months that is
//! unbounded in both directions; the engine tracks a single focused date,
//! maps keyboard gestures to date transitions subject to min/max bounds and
//! an arbitrary disabled-date policy, and converges the scroll position on
//! the month containing the focus.
//!
//! # Structure
//!
//! - [`date`] — calendar dates and pure Gregorian arithmetic.
//! - [`constraint`] — bounds plus the disabled-date policy, and the
//!   closest-allowed-date resolution.
//! - [`timeline`] — the virtualized month timeline and its materialization
//!   window.
//! - [`animator`] — the retargetable smooth-scroll driver.
//! - [`navigator`] — the keyboard focus state machine tying it together.
//! - [`overlay`] — the clonable handle the rendering shell talks to.
//!
//! # Example
//!
//! ```
//! use std::time::Instant;
//!
//! use kalends::{
//!     CalendarDate, KeyPress, NavKey, NavigatorArgs, OverlayArgsBuilder, OverlayContent,
//! };
//!
//! let now = Instant::now();
//! let overlay = OverlayContent::new(
//!     OverlayArgsBuilder::default()
//!         .navigator(
//!             NavigatorArgs::default()
//!                 .initial_position(CalendarDate::new(2010, 5, 17).unwrap()),
//!         )
//!         .build()
//!         .expect("builder construction failed"),
//! );
//!
//! overlay.open(now);
//! overlay.handle_key(KeyPress::plain(NavKey::ArrowDown), now);
//! assert_eq!(overlay.focused_date(), CalendarDate::new(2010, 5, 24));
//! ```

pub mod animator;
pub mod constraint;
pub mod date;
pub mod navigator;
pub mod overlay;
pub mod timeline;

pub use animator::{ScrollAnimator, ScrollFinished};
pub use constraint::{AllEnabled, DateConstraints, DisabledDates, ScanDirection, disabled_dates_fn};
pub use date::{CalendarDate, DateParseError, Weekday, YearMonth, days_in_month, is_leap_year};
pub use navigator::{
    CalendarNavigator, FocusPhase, KeyPress, NavEvent, NavKey, NavigatorArgs, TextDirection,
};
pub use overlay::{
    CloseRequestCallback, OverlayArgs, OverlayArgsBuilder, OverlayContent, ScrollFinishedCallback,
    SelectionCallback, WindowChangedCallback,
};
pub use timeline::{
    CellCoordinates, MaterializedWindow, MonthOffset, MonthTimeline, TimelineArgs,
    TimelineArgsBuilder,
};
