//! Allowed-date resolution against bounds and a disabled-date policy.
//!
//! ## Usage
//!
//! The navigator asks [`DateConstraints`] two questions: "is this date
//! allowed" and "what is the nearest allowed date in a direction". Bounds
//! and the disabled predicate are independent; a date inside the bounds may
//! still be disabled.

use std::sync::Arc;

use tracing::trace;

use crate::date::CalendarDate;

/// Upper bound on the day-by-day walk when a side is unbounded.
///
/// With both bounds present the walk is already limited to the bound span;
/// this cap (about 100 years) guarantees termination against a pathological
/// predicate on an open-ended range.
const MAX_SCAN_DAYS: i64 = 36_525;

/// Controls which dates are disabled in the calendar.
///
/// The predicate must be pure and total over the navigable range; a
/// panicking implementation propagates to the caller rather than being
/// guessed around, since a wrong guess would break the focus-legality
/// invariant.
pub trait DisabledDates: Send + Sync {
    /// Returns true when the date cannot be selected.
    fn is_date_disabled(&self, _date: CalendarDate) -> bool {
        false
    }
}

/// Policy that enables every date.
pub struct AllEnabled;

impl DisabledDates for AllEnabled {}

struct FnDisabledDates<F>(F);

impl<F> DisabledDates for FnDisabledDates<F>
where
    F: Fn(CalendarDate) -> bool + Send + Sync,
{
    fn is_date_disabled(&self, date: CalendarDate) -> bool {
        (self.0)(date)
    }
}

/// Wraps a closure as a [`DisabledDates`] policy.
pub fn disabled_dates_fn<F>(f: F) -> Arc<dyn DisabledDates>
where
    F: Fn(CalendarDate) -> bool + Send + Sync + 'static,
{
    Arc::new(FnDisabledDates(f))
}

/// Direction of a day-by-day scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    /// Toward later dates.
    Forward,
    /// Toward earlier dates.
    Backward,
}

impl ScanDirection {
    fn step(self) -> i64 {
        match self {
            ScanDirection::Forward => 1,
            ScanDirection::Backward => -1,
        }
    }

    fn reversed(self) -> Self {
        match self {
            ScanDirection::Forward => ScanDirection::Backward,
            ScanDirection::Backward => ScanDirection::Forward,
        }
    }
}

/// Inclusive date bounds plus the disabled-date policy.
#[derive(Clone)]
pub struct DateConstraints {
    min: Option<CalendarDate>,
    max: Option<CalendarDate>,
    disabled: Arc<dyn DisabledDates>,
}

impl Default for DateConstraints {
    fn default() -> Self {
        Self::new(None, None, Arc::new(AllEnabled))
    }
}

impl DateConstraints {
    /// Creates constraints; reversed bounds are swapped into order.
    pub fn new(
        min: Option<CalendarDate>,
        max: Option<CalendarDate>,
        disabled: Arc<dyn DisabledDates>,
    ) -> Self {
        let (min, max) = normalize_bounds(min, max);
        Self { min, max, disabled }
    }

    /// Returns the inclusive lower bound, if any.
    pub fn min(&self) -> Option<CalendarDate> {
        self.min
    }

    /// Returns the inclusive upper bound, if any.
    pub fn max(&self) -> Option<CalendarDate> {
        self.max
    }

    /// Replaces the lower bound.
    pub fn set_min(&mut self, min: Option<CalendarDate>) {
        let (min, max) = normalize_bounds(min, self.max);
        self.min = min;
        self.max = max;
    }

    /// Replaces the upper bound.
    pub fn set_max(&mut self, max: Option<CalendarDate>) {
        let (min, max) = normalize_bounds(self.min, max);
        self.min = min;
        self.max = max;
    }

    /// Replaces the disabled-date policy.
    pub fn set_disabled(&mut self, disabled: Arc<dyn DisabledDates>) {
        self.disabled = disabled;
    }

    /// True when the date lies within the bounds, disabled or not.
    pub fn in_bounds(&self, date: CalendarDate) -> bool {
        self.min.is_none_or(|min| date >= min) && self.max.is_none_or(|max| date <= max)
    }

    /// True when the date is inside the bounds and not disabled.
    pub fn is_allowed(&self, date: CalendarDate) -> bool {
        self.in_bounds(date) && !self.disabled.is_date_disabled(date)
    }

    /// Saturates the date onto the bounds. Disabled-ness is not considered;
    /// this is the policy for fine-grained single-day steps, which may land
    /// on a disabled date.
    pub fn clamp_to_bounds(&self, date: CalendarDate) -> CalendarDate {
        if let Some(min) = self.min
            && date < min
        {
            return min;
        }
        if let Some(max) = self.max
            && date > max
        {
            return max;
        }
        date
    }

    /// Nearest allowed date starting from `date`, preferring `direction`.
    ///
    /// An out-of-bounds start is pulled onto the violated bound first, so a
    /// candidate far past the range redirects to the closest allowed date at
    /// the range edge instead of walking off into nothing. If the preferred
    /// direction runs out of range, the walk reverses from the start. Returns
    /// `None` when every scanned date is disabled; callers keep their current
    /// focus in that case.
    pub fn closest_allowed(
        &self,
        date: CalendarDate,
        direction: ScanDirection,
    ) -> Option<CalendarDate> {
        let start = self.clamp_to_bounds(date);
        if self.is_allowed(start) {
            return Some(start);
        }

        if let Some(found) = self.walk(start, direction) {
            return Some(found);
        }
        let found = self.walk(start, direction.reversed());
        if found.is_none() {
            trace!(%date, "no allowed date within scanning range");
        }
        found
    }

    fn walk(&self, start: CalendarDate, direction: ScanDirection) -> Option<CalendarDate> {
        let mut probe = start;
        for _ in 0..self.scan_limit() {
            probe = probe.add_days(direction.step());
            if !self.in_bounds(probe) {
                return None;
            }
            if self.is_allowed(probe) {
                return Some(probe);
            }
        }
        None
    }

    fn scan_limit(&self) -> i64 {
        match (self.min, self.max) {
            (Some(min), Some(max)) => max.to_days() - min.to_days(),
            _ => MAX_SCAN_DAYS,
        }
    }
}

fn normalize_bounds(
    min: Option<CalendarDate>,
    max: Option<CalendarDate>,
) -> (Option<CalendarDate>, Option<CalendarDate>) {
    match (min, max) {
        (Some(lo), Some(hi)) if lo > hi => (Some(hi), Some(lo)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u8, day: u8) -> CalendarDate {
        CalendarDate::new(year, month, day).unwrap()
    }

    fn bounded(min: CalendarDate, max: CalendarDate) -> DateConstraints {
        DateConstraints::new(Some(min), Some(max), Arc::new(AllEnabled))
    }

    #[test]
    fn test_is_allowed_respects_bounds() {
        let constraints = bounded(date(2010, 1, 1), date(2010, 1, 31));
        assert!(constraints.is_allowed(date(2010, 1, 1)));
        assert!(constraints.is_allowed(date(2010, 1, 31)));
        assert!(!constraints.is_allowed(date(2009, 12, 31)));
        assert!(!constraints.is_allowed(date(2010, 2, 1)));
    }

    #[test]
    fn test_is_allowed_respects_predicate() {
        let constraints = DateConstraints::new(
            None,
            None,
            disabled_dates_fn(|d| d.day() == 13),
        );
        assert!(constraints.is_allowed(date(2010, 1, 12)));
        assert!(!constraints.is_allowed(date(2010, 1, 13)));
    }

    #[test]
    fn test_reversed_bounds_are_normalized() {
        let constraints = bounded(date(2010, 1, 31), date(2010, 1, 1));
        assert_eq!(constraints.min(), Some(date(2010, 1, 1)));
        assert_eq!(constraints.max(), Some(date(2010, 1, 31)));
    }

    #[test]
    fn test_clamp_to_bounds() {
        let constraints = bounded(date(2010, 1, 1), date(2010, 1, 31));
        assert_eq!(constraints.clamp_to_bounds(date(2009, 6, 1)), date(2010, 1, 1));
        assert_eq!(constraints.clamp_to_bounds(date(2011, 6, 1)), date(2010, 1, 31));
        assert_eq!(constraints.clamp_to_bounds(date(2010, 1, 15)), date(2010, 1, 15));
    }

    #[test]
    fn test_closest_allowed_identity() {
        let constraints = DateConstraints::default();
        let d = date(2010, 6, 10);
        assert_eq!(constraints.closest_allowed(d, ScanDirection::Forward), Some(d));
    }

    #[test]
    fn test_closest_allowed_redirects_onto_bound() {
        // Candidate far below min: redirect to the bound, not a walk to nowhere.
        let constraints = bounded(date(1999, 12, 25), date(2005, 1, 1));
        assert_eq!(
            constraints.closest_allowed(date(1999, 5, 10), ScanDirection::Backward),
            Some(date(1999, 12, 25))
        );
    }

    #[test]
    fn test_closest_allowed_walks_past_disabled_run() {
        let constraints = DateConstraints::new(
            Some(date(2010, 1, 1)),
            Some(date(2010, 1, 31)),
            disabled_dates_fn(|d| (10..=12).contains(&d.day())),
        );
        assert_eq!(
            constraints.closest_allowed(date(2010, 1, 10), ScanDirection::Forward),
            Some(date(2010, 1, 13))
        );
        assert_eq!(
            constraints.closest_allowed(date(2010, 1, 12), ScanDirection::Backward),
            Some(date(2010, 1, 9))
        );
    }

    #[test]
    fn test_closest_allowed_disabled_bound_walks_inward() {
        let constraints = DateConstraints::new(
            Some(date(2010, 1, 1)),
            Some(date(2010, 1, 31)),
            disabled_dates_fn(|d| d.day() >= 30),
        );
        // Candidate past max lands on the disabled bound and continues inward.
        assert_eq!(
            constraints.closest_allowed(date(2010, 2, 15), ScanDirection::Forward),
            Some(date(2010, 1, 29))
        );
    }

    #[test]
    fn test_closest_allowed_reverses_at_bound() {
        let constraints = DateConstraints::new(
            Some(date(2010, 1, 1)),
            Some(date(2010, 1, 31)),
            disabled_dates_fn(|d| d.day() >= 28),
        );
        assert_eq!(
            constraints.closest_allowed(date(2010, 1, 29), ScanDirection::Forward),
            Some(date(2010, 1, 27))
        );
    }

    #[test]
    fn test_closest_allowed_exhausted_range() {
        let constraints = DateConstraints::new(
            Some(date(2010, 1, 1)),
            Some(date(2010, 1, 31)),
            disabled_dates_fn(|_| true),
        );
        assert_eq!(
            constraints.closest_allowed(date(2010, 1, 15), ScanDirection::Forward),
            None
        );
    }
}
