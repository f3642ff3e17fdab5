//! Stroke stabilization for free-hand drawing.
//!
//! Each raw pointer sample pulls the smoothed pen position a fraction of the
//! way towards it. Stronger settings pull less per sample; the factor never
//! drops below [`MIN_FACTOR`], which bounds how far the pen can trail.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Smallest per-sample interpolation factor.
pub const MIN_FACTOR: f64 = 0.15;

/// Samples closer than this to the last path point replace it instead of
/// extending the path.
pub const COALESCE_DISTANCE: f64 = 0.3;

/// Catch-up stops once the pen is this close to the release point.
pub const CATCH_UP_TOLERANCE: f64 = 0.5;

/// Upper bound on catch-up iterations.
pub const MAX_CATCH_UP_STEPS: usize = 12;

/// User-facing stabilizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerSettings {
    pub enabled: bool,
    /// 0 = no smoothing, 100 = maximum smoothing.
    pub strength: f64,
}

impl Default for StabilizerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            strength: 50.0,
        }
    }
}

impl StabilizerSettings {
    pub fn new(enabled: bool, strength: f64) -> Self {
        Self {
            enabled,
            strength: strength.clamp(0.0, 100.0),
        }
    }

    /// Fraction of the remaining distance covered per sample.
    pub fn factor(&self) -> f64 {
        let strength = self.strength.clamp(0.0, 100.0);
        (1.0 - (strength / 100.0) * 0.85).max(MIN_FACTOR)
    }
}

/// Move `from` towards `to` by `factor` of the distance.
pub fn lerp_towards(from: Point, to: Point, factor: f64) -> Point {
    from.lerp(to, factor)
}

/// Builds the path of one in-progress stroke.
#[derive(Debug, Clone)]
pub struct StrokeStabilizer {
    settings: StabilizerSettings,
    /// Raw samples are used verbatim (eraser, or stabilization disabled).
    passthrough: bool,
    smoothed: Point,
    last_raw: Point,
    points: Vec<Point>,
}

impl StrokeStabilizer {
    /// Start a stroke at `start`.
    pub fn begin(start: Point, settings: StabilizerSettings, eraser: bool) -> Self {
        Self {
            settings,
            passthrough: eraser || !settings.enabled,
            smoothed: start,
            last_raw: start,
            points: vec![start],
        }
    }

    /// Feed one raw pointer sample.
    pub fn push(&mut self, raw: Point) {
        self.last_raw = raw;
        if self.passthrough {
            self.points.push(raw);
            return;
        }

        let next = lerp_towards(self.smoothed, raw, self.settings.factor());
        match self.points.last_mut() {
            Some(last) if last.distance(next) < COALESCE_DISTANCE => *last = next,
            _ => self.points.push(next),
        }
        self.smoothed = next;
    }

    /// Current smoothed pen position.
    pub fn smoothed(&self) -> Point {
        self.smoothed
    }

    /// Path built so far, for live preview.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Pull the pen towards `target` until it is within tolerance.
    ///
    /// Returns the number of catch-up points appended.
    pub fn catch_up(&mut self, target: Point) -> usize {
        let factor = self.settings.factor();
        let mut steps = 0;
        while steps < MAX_CATCH_UP_STEPS && self.smoothed.distance(target) > CATCH_UP_TOLERANCE {
            self.smoothed = lerp_towards(self.smoothed, target, factor);
            self.points.push(self.smoothed);
            steps += 1;
        }
        steps
    }

    /// Finish the stroke at the release position.
    ///
    /// Returns `None` when fewer than two points were produced.
    pub fn finish(mut self, release: Option<Point>) -> Option<Vec<Point>> {
        let target = release.unwrap_or(self.last_raw);
        if self.passthrough {
            if release.is_some_and(|p| self.points.last() != Some(&p)) {
                self.points.push(target);
            }
        } else {
            self.catch_up(target);
        }

        if self.points.len() < 2 {
            log::debug!("discarding stroke with {} point(s)", self.points.len());
            return None;
        }
        Some(self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_bounds() {
        assert!((StabilizerSettings::new(true, 0.0).factor() - 1.0).abs() < 1e-12);
        assert!((StabilizerSettings::new(true, 100.0).factor() - MIN_FACTOR).abs() < 1e-12);
        assert!((StabilizerSettings::new(true, 80.0).factor() - 0.32).abs() < 1e-12);
        // Out-of-range strength is clamped.
        assert!((StabilizerSettings { enabled: true, strength: 500.0 }.factor() - MIN_FACTOR).abs() < 1e-12);
    }

    #[test]
    fn test_smoothing_lags_behind_raw() {
        let mut stabilizer =
            StrokeStabilizer::begin(Point::ZERO, StabilizerSettings::new(true, 50.0), false);
        stabilizer.push(Point::new(100.0, 0.0));
        let factor = StabilizerSettings::new(true, 50.0).factor();
        assert!((stabilizer.smoothed().x - 100.0 * factor).abs() < 1e-9);
        assert_eq!(stabilizer.len(), 2);
    }

    #[test]
    fn test_near_duplicate_samples_coalesce() {
        let mut stabilizer =
            StrokeStabilizer::begin(Point::ZERO, StabilizerSettings::new(true, 0.0), false);
        stabilizer.push(Point::new(10.0, 0.0));
        stabilizer.push(Point::new(10.1, 0.0));
        stabilizer.push(Point::new(10.2, 0.0));
        assert_eq!(stabilizer.len(), 2);
        assert!((stabilizer.points()[1].x - 10.2).abs() < 1e-9);
    }

    #[test]
    fn test_catch_up_converges() {
        let settings = StabilizerSettings::new(true, 80.0);
        let mut stabilizer = StrokeStabilizer::begin(Point::ZERO, settings, false);
        let target = Point::new(30.0, 40.0);
        let steps = stabilizer.catch_up(target);
        assert!(steps <= MAX_CATCH_UP_STEPS);
        assert!(stabilizer.smoothed().distance(target) <= CATCH_UP_TOLERANCE);
    }

    #[test]
    fn test_catch_up_is_bounded() {
        let settings = StabilizerSettings::new(true, 100.0);
        let mut stabilizer = StrokeStabilizer::begin(Point::ZERO, settings, false);
        let steps = stabilizer.catch_up(Point::new(10_000.0, 0.0));
        assert_eq!(steps, MAX_CATCH_UP_STEPS);
    }

    #[test]
    fn test_finish_reaches_release_point() {
        let settings = StabilizerSettings::new(true, 60.0);
        let mut stabilizer = StrokeStabilizer::begin(Point::ZERO, settings, false);
        for i in 1..=10 {
            stabilizer.push(Point::new(i as f64 * 3.0, 0.0));
        }
        let points = stabilizer.finish(Some(Point::new(30.0, 0.0))).unwrap();
        let last = points.last().unwrap();
        assert!(last.distance(Point::new(30.0, 0.0)) <= CATCH_UP_TOLERANCE);
    }

    #[test]
    fn test_single_point_discarded() {
        let stabilizer =
            StrokeStabilizer::begin(Point::new(5.0, 5.0), StabilizerSettings::default(), false);
        assert!(stabilizer.finish(None).is_none());
    }

    #[test]
    fn test_eraser_uses_raw_points() {
        let mut stabilizer =
            StrokeStabilizer::begin(Point::ZERO, StabilizerSettings::new(true, 90.0), true);
        stabilizer.push(Point::new(7.0, 3.0));
        stabilizer.push(Point::new(7.1, 3.0));
        let points = stabilizer.finish(Some(Point::new(7.1, 3.0))).unwrap();
        assert_eq!(
            points,
            vec![Point::ZERO, Point::new(7.0, 3.0), Point::new(7.1, 3.0)]
        );
    }

    #[test]
    fn test_disabled_stabilizer_is_passthrough() {
        let mut stabilizer =
            StrokeStabilizer::begin(Point::ZERO, StabilizerSettings::new(false, 90.0), false);
        stabilizer.push(Point::new(50.0, 50.0));
        assert_eq!(stabilizer.points()[1], Point::new(50.0, 50.0));
    }
}
