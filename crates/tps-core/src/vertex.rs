//! Vertex history: the ordered list of [`VertexState`]s for one vertex id,
//! binary search, and position reconstruction via accumulated deltas.

use itertools::Itertools;
use parking_lot::Mutex;

use crate::point::{Point, Timestamp, EPSILON};
use crate::vertex_state::{VertexState, VertexStateKind};

/// One vertex of a [`crate::TemporalPolygon`]: a stable id and a
/// time-ordered history of [`VertexState`]s.
///
/// The state list is guarded by its own mutex, held only
/// during [`Self::add_state`], [`Self::position_at`], and [`Self::state_at`]
/// — reads on different vertices of the same polygon proceed in parallel.
#[derive(Debug)]
pub struct Vertex {
    id: i64,
    states: Mutex<Vec<VertexState>>,
}

/// A gap or overlap detected by [`Vertex::validate_history`].
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryIssue {
    /// `states[i].interval.end` is strictly before `states[i+1].interval.start`.
    Gap {
        after_index: usize,
        gap_start: Timestamp,
        gap_end: Timestamp,
    },
    /// `states[i].interval.end` is strictly after `states[i+1].interval.start`.
    Overlap {
        after_index: usize,
        overlap_start: Timestamp,
        overlap_end: Timestamp,
    },
}

impl Vertex {
    pub fn new(id: i64, initial: VertexState) -> Self {
        Self {
            id,
            states: Mutex::new(vec![initial]),
        }
    }

    /// Builds a vertex from an already-complete, ordered history, e.g. when
    /// deserializing. The caller is responsible for I2/I3;
    /// no reordering or closure happens here.
    pub fn from_states(id: i64, states: Vec<VertexState>) -> Self {
        Self {
            id,
            states: Mutex::new(states),
        }
    }

    #[inline]
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Appends `new_state` (invariant I4): if the current last state is
    /// open-ended, it is closed with `end = new_state.interval.start`
    /// before the append. No ordering check is performed on
    /// `new_state.interval.start` — callers are expected to append forward
    /// in time; out-of-order appends are tolerated, not rejected.
    pub fn add_state(&self, new_state: VertexState) {
        let mut states = self.states.lock();
        if let Some(last) = states.last() {
            if last.interval.is_open_ended() {
                let closed = last.closed(new_state.interval.start());
                let last_idx = states.len() - 1;
                states[last_idx] = closed;
            }
        }
        states.push(new_state);
        log::trace!("vertex {} gained a state at t={}", self.id, new_state_start(states.last()));
    }

    /// Binary search for the largest index `i` with
    /// `states[i].interval.start <= t`; falls back to a linear walk
    /// backwards when that candidate doesn't actually contain `t`.
    /// O(log H) typical, O(H) worst case under pathological overlap.
    fn find_index_at(states: &[VertexState], t: Timestamp) -> Option<usize> {
        let mut lo = 0usize;
        let mut hi = states.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if states[mid].interval.start() <= t {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo == 0 {
            return None;
        }
        let mut i = lo - 1;
        if states[i].interval.contains(t) {
            return Some(i);
        }
        while i > 0 {
            i -= 1;
            if states[i].interval.start() > t {
                break;
            }
            if states[i].interval.contains(t) {
                return Some(i);
            }
        }
        None
    }

    /// Returns a clone of the state containing `t`, or `None`.
    pub fn state_at(&self, t: Timestamp) -> Option<VertexState> {
        let states = self.states.lock();
        Self::find_index_at(&states, t).map(|i| states[i].clone())
    }

    /// Resolves this vertex's position at `t`.
    pub fn position_at(&self, t: Timestamp) -> Option<Point> {
        let states = self.states.lock();
        let idx = Self::find_index_at(&states, t)?;
        let s = &states[idx];
        match &s.kind {
            VertexStateKind::Function { function } => Some(function.position_at(t)),
            VertexStateKind::Absolute { point } => Some(*point),
            VertexStateKind::Delta { .. } => {
                let delta = s.delta_point().expect("checked Delta above");
                let mut base = Point::ZERO;
                let mut have_base = false;
                let s_start = s.interval.start();
                for p in &states[..idx] {
                    if p.interval.start() > t {
                        continue;
                    }
                    match &p.kind {
                        VertexStateKind::Function { function } => {
                            if p.interval.contains(s_start - EPSILON) {
                                base = function.position_at(s_start - EPSILON);
                                have_base = true;
                            }
                        }
                        VertexStateKind::Absolute { point } => {
                            base = *point;
                            have_base = true;
                        }
                        VertexStateKind::Delta { .. } if have_base => {
                            base = base + p.delta_point().expect("checked Delta above");
                        }
                        VertexStateKind::Delta { .. } => {
                            // No base yet: undefined usage upstream; keep
                            // accumulating from zero rather than dropping it.
                        }
                    }
                }
                Some(base + delta)
            }
        }
    }

    /// Returns a clone of the full state list, in history order. Used by
    /// the query engine to enumerate change times and by the integrity
    /// validator.
    pub fn snapshot(&self) -> Vec<VertexState> {
        self.states.lock().clone()
    }

    /// Walks consecutive state pairs looking for gaps or overlaps between
    /// `states[i].interval.end` and `states[i+1].interval.start`. Gaps and
    /// overlaps are not treated as hard invariants elsewhere; this is the
    /// opt-in validator for callers that want to check anyway.
    pub fn validate_history(&self) -> Vec<HistoryIssue> {
        let states = self.states.lock();
        let mut issues = Vec::new();
        for (i, (prev, next)) in states.iter().tuple_windows().enumerate() {
            let Some(prev_end) = prev.interval.end() else {
                continue; // open-ended predecessor should have been closed on append
            };
            let next_start = next.interval.start();
            match prev_end.cmp(&next_start) {
                std::cmp::Ordering::Less => issues.push(HistoryIssue::Gap {
                    after_index: i,
                    gap_start: prev_end,
                    gap_end: next_start,
                }),
                std::cmp::Ordering::Greater => issues.push(HistoryIssue::Overlap {
                    after_index: i,
                    overlap_start: next_start,
                    overlap_end: prev_end,
                }),
                std::cmp::Ordering::Equal => {}
            }
        }
        issues
    }

    /// Repairs gaps and overlaps in place by clamping `prev.end` to
    /// `next.start`. Opt-in: never called automatically.
    pub fn repair_history(&self) {
        let mut states = self.states.lock();
        for i in 0..states.len().saturating_sub(1) {
            let next_start = states[i + 1].interval.start();
            if states[i].interval.end() != Some(next_start) {
                states[i] = states[i].closed(next_start);
            }
        }
    }
}

fn new_state_start(s: Option<&VertexState>) -> Timestamp {
    s.map_or(0, |s| s.interval.start())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::TimeInterval;

    fn abs(p: (f64, f64), start: i64) -> VertexState {
        VertexState::absolute(Point::new(p.0, p.1), TimeInterval::open_ended(start))
    }

    #[test]
    fn absolute_state_resolves_directly() {
        let v = Vertex::new(0, abs((1.0, 2.0), 0));
        assert_eq!(v.position_at(5), Some(Point::new(1.0, 2.0)));
        assert_eq!(v.position_at(0), Some(Point::new(1.0, 2.0)));
    }

    #[test]
    fn append_closes_previous_open_interval() {
        let v = Vertex::new(0, abs((0.0, 0.0), 0));
        v.add_state(abs((5.0, 5.0), 100));
        let states = v.snapshot();
        assert_eq!(states[0].interval.end(), Some(100));
        assert!(states[1].interval.is_open_ended());
    }

    #[test]
    fn delta_accumulates_on_absolute_base() {
        let v = Vertex::new(0, abs((0.0, 0.0), 0));
        v.add_state(VertexState::delta(2.0, 2.0, TimeInterval::open_ended(100)));
        assert_eq!(v.position_at(50), Some(Point::new(0.0, 0.0)));
        assert_eq!(v.position_at(100), Some(Point::new(2.0, 2.0)));
    }

    #[test]
    fn multiple_deltas_accumulate() {
        let v = Vertex::new(0, abs((0.0, 0.0), 0));
        v.add_state(VertexState::delta(1.0, 1.0, TimeInterval::open_ended(10)));
        v.add_state(VertexState::delta(1.0, 1.0, TimeInterval::open_ended(20)));
        v.add_state(VertexState::delta(1.0, 1.0, TimeInterval::open_ended(30)));
        assert_eq!(v.position_at(30), Some(Point::new(3.0, 3.0)));
    }

    #[test]
    fn absolute_reanchor_resets_accumulation() {
        let v = Vertex::new(0, abs((0.0, 0.0), 0));
        v.add_state(VertexState::delta(1.0, 1.0, TimeInterval::open_ended(10)));
        v.add_state(abs((100.0, 100.0), 20));
        v.add_state(VertexState::delta(1.0, 1.0, TimeInterval::open_ended(30)));
        assert_eq!(v.position_at(30), Some(Point::new(101.0, 101.0)));
    }

    #[test]
    fn function_serves_as_checkpoint_for_following_delta() {
        let f = crate::TemporalFunction::Linear {
            ref_point: Point::new(0.0, 0.0),
            t0: 0,
            vx: 1.0,
            vy: 0.0,
        };
        let v = Vertex::new(
            0,
            VertexState::function(f, TimeInterval::new(0, Some(10)).unwrap()),
        );
        v.add_state(VertexState::delta(5.0, 0.0, TimeInterval::open_ended(10)));
        // function gives position_at(10 - eps) ~= (0.009..., 0) at ms granularity
        let p = v.position_at(10).unwrap();
        assert!((p.x - 5.0).abs() < 0.01);
    }

    #[test]
    fn position_at_returns_none_outside_all_intervals() {
        let v = Vertex::new(0, VertexState::absolute(Point::ZERO, TimeInterval::new(10, Some(20)).unwrap()));
        assert_eq!(v.position_at(5), None);
        assert_eq!(v.position_at(25), None);
    }

    #[test]
    fn validator_detects_gap_and_overlap() {
        let v = Vertex::new(
            0,
            VertexState::absolute(Point::ZERO, TimeInterval::new(0, Some(10)).unwrap()),
        );
        // manually craft a gap by adding a state starting after a closed gap
        v.add_state(VertexState::absolute(Point::ZERO, TimeInterval::open_ended(10)));
        // close the last one with an explicit end before repairing
        {
            let mut states = v.states.lock();
            let last = states.last().unwrap().clone();
            *states.last_mut().unwrap() = last.closed(15);
        }
        v.add_state(abs((1.0, 1.0), 20)); // gap: 15..20
        let issues = v.validate_history();
        assert!(matches!(issues[0], HistoryIssue::Gap { .. }));
    }
}
