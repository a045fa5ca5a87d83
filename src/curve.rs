//! Percent to amplitude mapping.

use serde::{Deserialize, Serialize};

use crate::constants::{CURVE_B0, CURVE_CEILING, CURVE_K};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    Linear,
    /// Limited growth: `ceiling - (ceiling - b0) * e^(-k * percent)`.
    Saturating,
}

/// Maps a 0..=100 load percentage to an output amplitude.
///
/// The result is not bounded by the actuator range. `ceiling` may sit above
/// the actuator maximum, so callers clamp with [`clamp_output`] afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseCurve {
    pub kind: CurveKind,
    pub b0: f64,
    pub k: f64,
    pub ceiling: f64,
}

impl Default for ResponseCurve {
    fn default() -> Self {
        Self {
            kind: CurveKind::Saturating,
            b0: CURVE_B0,
            k: CURVE_K,
            ceiling: CURVE_CEILING,
        }
    }
}

impl ResponseCurve {
    pub fn linear(ceiling: f64) -> Self {
        Self {
            kind: CurveKind::Linear,
            b0: 0.0,
            k: 0.0,
            ceiling,
        }
    }

    pub fn saturating(b0: f64, k: f64, ceiling: f64) -> Self {
        Self {
            kind: CurveKind::Saturating,
            b0,
            k,
            ceiling,
        }
    }

    pub fn apply(&self, percent: f64) -> f64 {
        match self.kind {
            // percent / 100 first so that 100% lands on the ceiling exactly
            CurveKind::Linear => self.ceiling * (percent / 100.0),
            CurveKind::Saturating => {
                self.ceiling - (self.ceiling - self.b0) * (-self.k * percent).exp()
            }
        }
    }
}

/// Second stage of the two-stage clamp: bound a curve output to `[0, max]`.
pub fn clamp_output(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_hits_both_ends_exactly() {
        let curve = ResponseCurve::linear(600.0);
        assert_eq!(curve.apply(0.0), 0.0);
        assert_eq!(curve.apply(100.0), 600.0);
        assert_eq!(ResponseCurve::linear(10.0).apply(50.0), 5.0);
    }

    #[test]
    fn saturating_starts_at_b0() {
        let curve = ResponseCurve::default();
        assert_eq!(curve.apply(0.0), 0.0);

        let offset = ResponseCurve::saturating(50.0, 0.02, 700.0);
        assert!((offset.apply(0.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn saturating_approaches_ceiling() {
        let curve = ResponseCurve::default();
        let far = curve.apply(10_000.0);
        assert!((far - 700.0).abs() < 1e-9);
        assert!(curve.apply(100.0) < 700.0);
    }

    #[test]
    fn ceiling_above_actuator_max_is_clamped_afterwards() {
        let curve = ResponseCurve::default();
        // 700 - 700 * e^-2 ~= 605.3, above a 600 step converter
        let raw = curve.apply(100.0);
        assert!(raw > 600.0);
        assert_eq!(clamp_output(raw, 600.0), 600.0);
    }

    #[test]
    fn clamp_handles_negative_and_nan() {
        assert_eq!(clamp_output(-3.0, 10.0), 0.0);
        assert_eq!(clamp_output(f64::NAN, 10.0), 0.0);
        assert_eq!(clamp_output(4.5, 10.0), 4.5);
    }
}
