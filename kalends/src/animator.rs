//! Smooth scroll animation toward a target timeline position.
//!
//! ## Usage
//!
//! One animator per overlay instance. The host pumps [`ScrollAnimator::tick`]
//! once per frame with the current instant; starting a new animation while
//! one is in flight retargets it (last command wins), it never queues.

use std::time::{Duration, Instant};

use tracing::trace;

/// Emitted exactly once when a scroll animation reaches its target.
///
/// `old_position` is the position when the (latest) animation started, so
/// listeners can compute direction and delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollFinished {
    /// Final scroll position in fractional month offsets.
    pub position: f64,
    /// Position at the start of the animation.
    pub old_position: f64,
}

/// Drives `position` toward a target over a configurable duration.
#[derive(Debug, Clone)]
pub struct ScrollAnimator {
    position: f64,
    origin: f64,
    target: f64,
    duration: Duration,
    started_at: Option<Instant>,
}

impl ScrollAnimator {
    /// Creates an animator resting at `position`.
    pub fn new(position: f64) -> Self {
        Self {
            position,
            origin: position,
            target: position,
            duration: Duration::ZERO,
            started_at: None,
        }
    }

    /// Current scroll position.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Position the animator is heading to; equals [`position`](Self::position)
    /// when idle.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// True while an animation is in flight.
    pub fn is_animating(&self) -> bool {
        self.started_at.is_some()
    }

    /// Starts (or retargets) an animation toward `target`.
    ///
    /// A zero duration completes on the next [`tick`](Self::tick); the
    /// completion signal is still delivered so callers observe a uniform
    /// lifecycle for animated and instant scrolls.
    pub fn start(&mut self, target: f64, duration: Duration, now: Instant) {
        trace!(from = self.position, to = target, "scroll animation start");
        self.origin = self.position;
        self.target = target;
        self.duration = duration;
        self.started_at = Some(now);
    }

    /// Moves to `position` immediately without an animation or a completion
    /// signal. Used when the overlay closes mid-flight.
    pub fn jump_to(&mut self, position: f64) {
        self.position = position;
        self.origin = position;
        self.target = position;
        self.started_at = None;
    }

    /// Cancels the in-flight animation, freezing the current position. The
    /// pending completion signal is discarded.
    pub fn cancel(&mut self) {
        if self.started_at.take().is_some() {
            self.target = self.position;
            self.origin = self.position;
        }
    }

    /// Advances the animation. Returns the completion signal exactly once,
    /// on the tick that reaches the target.
    pub fn tick(&mut self, now: Instant) -> Option<ScrollFinished> {
        let started_at = self.started_at?;
        let progress = if self.duration.is_zero() {
            1.0
        } else {
            let elapsed = now.saturating_duration_since(started_at);
            (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
        };

        if progress >= 1.0 {
            self.position = self.target;
            self.started_at = None;
            let finished = ScrollFinished {
                position: self.target,
                old_position: self.origin,
            };
            trace!(position = finished.position, "scroll animation finished");
            return Some(finished);
        }

        self.position = self.origin + (self.target - self.origin) * easing(progress);
        None
    }
}

/// Cubic ease-in-out mapping.
/// Input: linear progress in [0.0, 1.0].
/// Output: eased progress in [0.0, 1.0].
fn easing(progress: f64) -> f64 {
    let t = progress.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instant_animation_completes_on_first_tick() {
        let now = Instant::now();
        let mut animator = ScrollAnimator::new(0.0);
        animator.start(5.0, Duration::ZERO, now);
        assert!(animator.is_animating());

        let finished = animator.tick(now).unwrap();
        assert_eq!(finished.position, 5.0);
        assert_eq!(finished.old_position, 0.0);
        assert_eq!(animator.position(), 5.0);
        assert!(!animator.is_animating());

        // No second completion.
        assert!(animator.tick(now).is_none());
    }

    #[test]
    fn test_progress_is_monotonic_and_bounded() {
        let start = Instant::now();
        let mut animator = ScrollAnimator::new(0.0);
        animator.start(10.0, Duration::from_millis(100), start);

        let mut last = 0.0;
        for ms in [10u64, 30, 50, 70, 90] {
            assert!(animator.tick(start + Duration::from_millis(ms)).is_none());
            let pos = animator.position();
            assert!(pos >= last && pos <= 10.0);
            last = pos;
        }
        let finished = animator
            .tick(start + Duration::from_millis(150))
            .unwrap();
        assert_eq!(finished.position, 10.0);
        assert_eq!(finished.old_position, 0.0);
    }

    #[test]
    fn test_retarget_replaces_in_flight_animation() {
        let start = Instant::now();
        let mut animator = ScrollAnimator::new(0.0);
        animator.start(10.0, Duration::from_millis(100), start);
        animator.tick(start + Duration::from_millis(50));
        let midway = animator.position();
        assert!(midway > 0.0 && midway < 10.0);

        // Last command wins: the retargeted animation owns the completion.
        animator.start(-2.0, Duration::ZERO, start + Duration::from_millis(50));
        let finished = animator.tick(start + Duration::from_millis(50)).unwrap();
        assert_eq!(finished.position, -2.0);
        assert_eq!(finished.old_position, midway);
        assert!(animator.tick(start + Duration::from_millis(60)).is_none());
    }

    #[test]
    fn test_cancel_discards_completion() {
        let start = Instant::now();
        let mut animator = ScrollAnimator::new(0.0);
        animator.start(10.0, Duration::from_millis(100), start);
        animator.tick(start + Duration::from_millis(50));
        animator.cancel();
        assert!(!animator.is_animating());
        assert_eq!(animator.target(), animator.position());
        assert!(animator.tick(start + Duration::from_millis(200)).is_none());
    }

    #[test]
    fn test_easing_endpoints() {
        assert_eq!(easing(0.0), 0.0);
        assert_eq!(easing(1.0), 1.0);
        assert!((easing(0.5) - 0.5).abs() < 1e-9);
    }
}
