//! [`TemporalFunction`]: parametric position vs. time.

use crate::error::{Error, Result};
use crate::point::{Point, Timestamp};

/// A closed-form description of a vertex's position as a function of time.
///
/// `Opaque` stands in for a source-language closure that this crate cannot
/// represent structurally; it still evaluates in-process (it carries a
/// boxed `Fn`), but it is not serializable — a deserialized `Opaque` slot
/// falls back to the absolute position stored alongside it.
#[derive(Clone)]
pub enum TemporalFunction {
    /// Constant-velocity motion: `ref_point + (t - t0) * (vx, vy)`.
    Linear {
        ref_point: Point,
        t0: Timestamp,
        vx: f64,
        vy: f64,
    },
    /// Circular motion around `center` at angular velocity `omega`
    /// (radians/second) starting at phase `phi` at `t0`.
    Circular {
        center: Point,
        t0: Timestamp,
        radius: f64,
        omega: f64,
        phi: f64,
    },
    /// An arbitrary, non-serializable position function.
    Opaque {
        ref_point: Point,
        t0: Timestamp,
        f: std::sync::Arc<dyn Fn(Timestamp) -> Point + Send + Sync>,
    },
}

impl std::fmt::Debug for TemporalFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linear { ref_point, t0, vx, vy } => f
                .debug_struct("Linear")
                .field("ref_point", ref_point)
                .field("t0", t0)
                .field("vx", vx)
                .field("vy", vy)
                .finish(),
            Self::Circular { center, t0, radius, omega, phi } => f
                .debug_struct("Circular")
                .field("center", center)
                .field("t0", t0)
                .field("radius", radius)
                .field("omega", omega)
                .field("phi", phi)
                .finish(),
            Self::Opaque { ref_point, t0, .. } => f
                .debug_struct("Opaque")
                .field("ref_point", ref_point)
                .field("t0", t0)
                .finish_non_exhaustive(),
        }
    }
}

impl TemporalFunction {
    /// Seconds elapsed between `t0` and `t`, as a float, for closed-form
    /// evaluation.
    #[inline]
    fn dt_secs(t0: Timestamp, t: Timestamp) -> f64 {
        (t - t0) as f64 / 1000.0
    }

    /// Evaluates the function at `t`, returning an absolute point for any
    /// `t`. The interval containment check that gates whether this is
    /// *meaningful* at a given `t` is the caller's (the vertex state's)
    /// responsibility.
    pub fn position_at(&self, t: Timestamp) -> Point {
        match self {
            Self::Linear { ref_point, t0, vx, vy } => {
                let dt = Self::dt_secs(*t0, t);
                Point::new(ref_point.x + vx * dt, ref_point.y + vy * dt)
            }
            Self::Circular { center, t0, radius, omega, phi } => {
                let dt = Self::dt_secs(*t0, t);
                let angle = phi + omega * dt;
                Point::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                )
            }
            Self::Opaque { f, .. } => f(t),
        }
    }

    /// As [`Self::position_at`], but returns [`Error::TimeOutOfRange`] when
    /// `t` falls outside `[start, end)`. Used by callers that want strict,
    /// interval-checked evaluation.
    pub fn position_at_checked(
        &self,
        t: Timestamp,
        interval: crate::TimeInterval,
    ) -> Result<Point> {
        if !interval.contains(t) {
            return Err(Error::TimeOutOfRange { t });
        }
        Ok(self.position_at(t))
    }

    /// True for the variants that can round-trip through JSON persistence.
    #[inline]
    pub fn is_serializable(&self) -> bool {
        !matches!(self, Self::Opaque { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_moves_at_constant_velocity() {
        let f = TemporalFunction::Linear {
            ref_point: Point::new(0.0, 0.0),
            t0: 0,
            vx: 1.0,
            vy: -2.0,
        };
        assert_eq!(f.position_at(0), Point::new(0.0, 0.0));
        assert_eq!(f.position_at(1000), Point::new(1.0, -2.0));
        assert_eq!(f.position_at(2000), Point::new(2.0, -4.0));
    }

    #[test]
    fn circular_returns_to_start_after_full_period() {
        let f = TemporalFunction::Circular {
            center: Point::new(5.0, 5.0),
            t0: 0,
            radius: 2.0,
            omega: std::f64::consts::PI, // period = 2s
            phi: 0.0,
        };
        let p0 = f.position_at(0);
        let p_full_period = f.position_at(2000);
        assert!((p0.x - p_full_period.x).abs() < 1e-9);
        assert!((p0.y - p_full_period.y).abs() < 1e-9);
    }

    #[test]
    fn opaque_is_not_serializable() {
        let f = TemporalFunction::Opaque {
            ref_point: Point::ZERO,
            t0: 0,
            f: std::sync::Arc::new(|t| Point::new(t as f64, 0.0)),
        };
        assert!(!f.is_serializable());
        assert_eq!(f.position_at(7), Point::new(7.0, 0.0));
    }
}
