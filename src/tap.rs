//! # Tap Gesture Detector
//!
//! Hidden maintenance access: a run of rapid double taps counts down
//! `remaining_taps` and unlocks when the run is complete. Any tap arriving
//! 300 ms or more after the previous one starts the count over, so casual
//! touches on a public display never get close.

use std::time::Duration;

/// Maximum gap between two taps of a double tap
pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);

/// Taps needed to unlock maintenance access
pub const DEFAULT_TAP_THRESHOLD: u32 = 5;

#[derive(Clone, Debug)]
pub struct TapDetector {
    threshold: u32,
    last_tap: Option<Duration>,
    remaining_taps: u32,
}

impl Default for TapDetector {
    fn default() -> Self {
        Self::new(DEFAULT_TAP_THRESHOLD)
    }
}

impl TapDetector {
    pub fn new(threshold: u32) -> Self {
        let threshold = threshold.max(2);
        Self {
            threshold,
            last_tap: None,
            remaining_taps: threshold,
        }
    }

    pub fn remaining_taps(&self) -> u32 {
        self.remaining_taps
    }

    /// Register a touch-down at `now`. Returns true when this tap unlocks
    /// maintenance access.
    pub fn on_touch_down(&mut self, now: Duration) -> bool {
        let double_tap = self
            .last_tap
            .and_then(|last| now.checked_sub(last))
            .is_some_and(|gap| gap < DOUBLE_TAP_WINDOW);
        self.last_tap = Some(now);

        if !double_tap {
            self.remaining_taps = self.threshold;
            return false;
        }
        if self.remaining_taps <= 2 {
            self.remaining_taps = self.threshold;
            return true;
        }
        self.remaining_taps -= 1;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taps(detector: &mut TapDetector, count: u64, gap_ms: u64) -> usize {
        (0..count)
            .filter(|i| detector.on_touch_down(Duration::from_millis(10_000 + i * gap_ms)))
            .count()
    }

    #[test]
    fn five_quick_taps_unlock_once() {
        let mut detector = TapDetector::default();
        assert_eq!(taps(&mut detector, 5, 200), 1);
        assert_eq!(detector.remaining_taps(), DEFAULT_TAP_THRESHOLD);
    }

    #[test]
    fn slow_taps_never_unlock() {
        let mut detector = TapDetector::default();
        assert_eq!(taps(&mut detector, 5, 400), 0);
        assert_eq!(taps(&mut detector, 20, 300), 0);
    }

    #[test]
    fn four_quick_taps_are_not_enough() {
        let mut detector = TapDetector::default();
        assert_eq!(taps(&mut detector, 4, 100), 0);
        assert_eq!(detector.remaining_taps(), 2);
    }

    #[test]
    fn gap_resets_counter_to_threshold() {
        let mut detector = TapDetector::default();
        detector.on_touch_down(Duration::from_millis(1_000));
        detector.on_touch_down(Duration::from_millis(1_100));
        detector.on_touch_down(Duration::from_millis(1_200));
        assert_eq!(detector.remaining_taps(), 3);

        assert!(!detector.on_touch_down(Duration::from_millis(1_500)));
        assert_eq!(detector.remaining_taps(), DEFAULT_TAP_THRESHOLD);
    }
}
