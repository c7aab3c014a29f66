//! [`VertexState`]: one flavor of position record over a [`TimeInterval`].

use crate::point::{Point, TimeInterval};
use crate::temporal_function::TemporalFunction;

/// One vertex history entry.
///
/// Modeled as a tagged variant rather than the single class-with-
/// discriminator-fields the source used: the three flavors
/// never share mutable fields, so a Rust enum is the direct translation.
/// `grouped_vertex_ids` is orthogonal data attached to any flavor, not a
/// fourth variant.
#[derive(Debug, Clone)]
pub enum VertexStateKind {
    /// Position is `point`, across the interval.
    Absolute { point: Point },
    /// Position is the previously-resolved position plus `(dx, dy)`.
    Delta { dx: f64, dy: f64 },
    /// Position is `function.position_at(t)`.
    Function { function: TemporalFunction },
}

#[derive(Debug, Clone)]
pub struct VertexState {
    pub kind: VertexStateKind,
    pub interval: TimeInterval,
    /// Other vertex ids that received an equivalent state at the same
    /// change (batch updates). Not part of equivalence.
    pub grouped_vertex_ids: Vec<i64>,
}

impl VertexState {
    pub fn absolute(point: Point, interval: TimeInterval) -> Self {
        Self {
            kind: VertexStateKind::Absolute { point },
            interval,
            grouped_vertex_ids: Vec::new(),
        }
    }

    pub fn delta(dx: f64, dy: f64, interval: TimeInterval) -> Self {
        Self {
            kind: VertexStateKind::Delta { dx, dy },
            interval,
            grouped_vertex_ids: Vec::new(),
        }
    }

    pub fn function(function: TemporalFunction, interval: TimeInterval) -> Self {
        Self {
            kind: VertexStateKind::Function { function },
            interval,
            grouped_vertex_ids: Vec::new(),
        }
    }

    pub fn with_group(mut self, grouped_vertex_ids: Vec<i64>) -> Self {
        self.grouped_vertex_ids = grouped_vertex_ids;
        self
    }

    /// Returns a clone of this state with its interval's `end` replaced,
    /// preserving the flavor (used to close an open-ended predecessor on
    /// append).
    pub fn closed(&self, end: crate::Timestamp) -> Self {
        Self {
            kind: self.kind.clone(),
            interval: self.interval.with_end(end),
            grouped_vertex_ids: self.grouped_vertex_ids.clone(),
        }
    }

    pub fn delta_point(&self) -> Option<Point> {
        match &self.kind {
            VertexStateKind::Delta { dx, dy } => Some(Point::new(*dx, *dy)),
            _ => None,
        }
    }

    /// Equivalence used for grouping: same flavor, same
    /// interval, same absolute point / same delta. Functions never compare
    /// equivalent, even when their parameters match (they may be
    /// structurally distinct closures).
    pub fn is_equivalent_to(&self, other: &Self) -> bool {
        if self.interval != other.interval {
            return false;
        }
        match (&self.kind, &other.kind) {
            (VertexStateKind::Absolute { point: a }, VertexStateKind::Absolute { point: b }) => {
                a == b
            }
            (
                VertexStateKind::Delta { dx: dx1, dy: dy1 },
                VertexStateKind::Delta { dx: dx2, dy: dy2 },
            ) => dx1 == dx2 && dy1 == dy2,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: i64, end: Option<i64>) -> TimeInterval {
        TimeInterval::new(start, end).unwrap()
    }

    #[test]
    fn absolute_states_equivalent_iff_same_point_and_interval() {
        let a = VertexState::absolute(Point::new(1.0, 2.0), iv(0, Some(10)));
        let b = VertexState::absolute(Point::new(1.0, 2.0), iv(0, Some(10)));
        let c = VertexState::absolute(Point::new(1.0, 2.1), iv(0, Some(10)));
        assert!(a.is_equivalent_to(&b));
        assert!(!a.is_equivalent_to(&c));
    }

    #[test]
    fn functions_never_equivalent() {
        let f = TemporalFunction::Linear {
            ref_point: Point::ZERO,
            t0: 0,
            vx: 1.0,
            vy: 1.0,
        };
        let a = VertexState::function(f.clone(), iv(0, None));
        let b = VertexState::function(f, iv(0, None));
        assert!(!a.is_equivalent_to(&b));
    }

    #[test]
    fn closing_preserves_flavor() {
        let s = VertexState::delta(1.0, 2.0, TimeInterval::open_ended(0));
        let closed = s.closed(100);
        assert_eq!(closed.interval.end(), Some(100));
        assert!(matches!(closed.kind, VertexStateKind::Delta { .. }));
    }
}
