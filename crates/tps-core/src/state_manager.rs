//! The state manager: the delta-vs-absolute update policy, batch
//! shared-delta updates, identical-change detection, and linear-pattern
//! detection.

use crate::point::{Point, TimeInterval, Timestamp};
use crate::polygon::TemporalPolygon;
use crate::temporal_function::TemporalFunction;
use crate::vertex::Vertex;
use crate::vertex_state::VertexState;

/// Applies the delta-vs-absolute update policy to `vertex`.
///
/// 1. Resolves the current position at `t_change` (falling back to the
///    first state's point if `t_change` precedes all history).
/// 2. If `use_delta` and the move's Chebyshev distance is within
///    `delta_threshold`, appends a `Delta` state; otherwise appends an
///    `Absolute` state. Both carry `interval = [t_change, +inf)`.
pub fn update_vertex(
    vertex: &Vertex,
    new_point: Point,
    t_change: Timestamp,
    use_delta: bool,
    delta_threshold: f64,
) {
    let current = current_position_for_update(vertex, t_change);

    let small_move = use_delta
        && current.map_or(false, |cur| new_point.chebyshev_distance(cur) <= delta_threshold);

    let state = if small_move {
        let cur = current.expect("small_move implies current.is_some()");
        let delta = new_point - cur;
        log::debug!(
            "vertex {} moves by delta ({}, {}) at t={t_change}",
            vertex.id(),
            delta.x,
            delta.y
        );
        VertexState::delta(delta.x, delta.y, TimeInterval::open_ended(t_change))
    } else {
        log::debug!(
            "vertex {} re-anchors to ({}, {}) at t={t_change}",
            vertex.id(),
            new_point.x,
            new_point.y
        );
        VertexState::absolute(new_point, TimeInterval::open_ended(t_change))
    };
    vertex.add_state(state);
}

/// `position_at(t_change)`, or the first state's resolved position if
/// `t_change` precedes all recorded history.
fn current_position_for_update(vertex: &Vertex, t_change: Timestamp) -> Option<Point> {
    if let Some(p) = vertex.position_at(t_change) {
        return Some(p);
    }
    let states = vertex.snapshot();
    let first = states.first()?;
    vertex.position_at(first.interval.start())
}

/// Batch update with a shared delta: the first id in
/// `vertex_ids` receives a `Delta` state carrying the rest as
/// `grouped_vertex_ids`; the others each receive an equivalent `Delta`
/// state without the group list.
pub fn update_vertices_with_same_delta<'a>(
    vertices: impl IntoIterator<Item = &'a Vertex>,
    delta: Point,
    t_change: Timestamp,
) {
    let mut vertices = vertices.into_iter();
    let Some(owner) = vertices.next() else {
        return;
    };
    let rest: Vec<&Vertex> = vertices.collect();
    let interval = TimeInterval::open_ended(t_change);

    let owner_state =
        VertexState::delta(delta.x, delta.y, interval).with_group(rest.iter().map(|v| v.id()).collect());
    owner.add_state(owner_state);

    for v in &rest {
        v.add_state(VertexState::delta(delta.x, delta.y, interval));
    }
}

/// Groups vertex ids by the equivalence of their `state_at(t)`. Only
/// groups of size >= 2 are reported; grouping never rewrites history.
/// The first listed id owns the group: within each reported group the
/// ids appear in `polygon.vertex_ids()` order.
pub fn detect_identical_changes(polygon: &TemporalPolygon, t: Timestamp) -> Vec<Vec<i64>> {
    let mut buckets: Vec<(VertexState, Vec<i64>)> = Vec::new();

    for &vid in polygon.vertex_ids() {
        let Some(state) = polygon.vertex(vid).and_then(|v| v.state_at(t)) else {
            continue;
        };
        if let Some((_, ids)) = buckets.iter_mut().find(|(s, _)| s.is_equivalent_to(&state)) {
            ids.push(vid);
        } else {
            buckets.push((state, vec![vid]));
        }
    }

    buckets
        .into_iter()
        .map(|(_, ids)| ids)
        .filter(|ids| ids.len() >= 2)
        .collect()
}

/// Samples `vertex` at `max(3, floor((t_end - t_start) / 10_000))` evenly
/// spaced instants (10s = 10_000ms) and fits a [`TemporalFunction::Linear`]
/// if every sample is within `tolerance` of the straight line implied by
/// the first and last samples; otherwise returns `None`.
pub fn detect_linear_pattern(
    vertex: &Vertex,
    t_start: Timestamp,
    t_end: Timestamp,
    tolerance: f64,
) -> Option<TemporalFunction> {
    if t_end <= t_start {
        return None;
    }
    let n_samples = (((t_end - t_start) / 10_000) as usize).max(3);

    let mut samples: Vec<(Timestamp, Point)> = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let t = t_start + ((t_end - t_start) * i as i64) / (n_samples as i64 - 1);
        let p = vertex.position_at(t)?;
        samples.push((t, p));
    }

    let (t0, p0) = samples[0];
    let (t1, p1) = *samples.last().unwrap();
    let dt = (t1 - t0) as f64 / 1000.0;
    if dt <= 0.0 {
        return None;
    }
    let vx = (p1.x - p0.x) / dt;
    let vy = (p1.y - p0.y) / dt;

    let linear = TemporalFunction::Linear {
        ref_point: p0,
        t0,
        vx,
        vy,
    };

    let max_deviation = samples
        .iter()
        .map(|&(t, p)| {
            let predicted = linear.position_at(t);
            (p.x - predicted.x).abs().max((p.y - predicted.y).abs())
        })
        .fold(0.0_f64, f64::max);

    if max_deviation <= tolerance {
        Some(linear)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::{CoordSystem, NullValidator};
    use uuid::Uuid;

    fn triangle() -> TemporalPolygon {
        TemporalPolygon::create(
            Uuid::nil(),
            vec![0, 1, 2],
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(5.0, 10.0)],
            0,
            CoordSystem::Cartesian,
            &NullValidator,
        )
        .unwrap()
    }

    #[test]
    fn small_move_becomes_delta() {
        let p = triangle();
        let v = p.vertex(0).unwrap();
        update_vertex(v, Point::new(2.0, 2.0), 3_600_000, true, 100.0);
        let state = v.state_at(3_600_000).unwrap();
        assert!(matches!(state.kind, crate::VertexStateKind::Delta { .. }));
        assert_eq!(v.position_at(3_600_000), Some(Point::new(2.0, 2.0)));
    }

    #[test]
    fn large_move_reanchors() {
        let p = triangle();
        let v = p.vertex(0).unwrap();
        update_vertex(v, Point::new(500.0, 500.0), 3_600_000, true, 100.0);
        let state = v.state_at(3_600_000).unwrap();
        assert!(matches!(state.kind, crate::VertexStateKind::Absolute { .. }));
        assert_eq!(v.position_at(3_600_000), Some(Point::new(500.0, 500.0)));
    }

    #[test]
    fn batch_update_tags_owner_with_group() {
        let p = triangle();
        let vertices: Vec<&Vertex> = vec![p.vertex(0).unwrap(), p.vertex(1).unwrap(), p.vertex(2).unwrap()];
        update_vertices_with_same_delta(vertices.iter().copied(), Point::new(5.0, 5.0), 1000);
        let owner_state = vertices[0].state_at(1000).unwrap();
        assert_eq!(owner_state.grouped_vertex_ids, vec![1, 2]);
        assert!(vertices[1].state_at(1000).unwrap().grouped_vertex_ids.is_empty());
        for (v, expected) in vertices.iter().zip([(5.0, 5.0), (15.0, 5.0), (10.0, 15.0)]) {
            assert_eq!(v.position_at(1000), Some(Point::new(expected.0, expected.1)));
        }
    }

    #[test]
    fn identical_change_groups_only_size_two_plus() {
        let p = triangle();
        update_vertex(p.vertex(0).unwrap(), Point::new(1.0, 1.0), 500, true, 100.0);
        update_vertex(p.vertex(1).unwrap(), Point::new(11.0, 1.0), 500, true, 100.0);
        // vertex 2 untouched, so its state at t=500 differs (different interval/point)
        let groups = detect_identical_changes(&p, 500);
        assert_eq!(groups, vec![vec![0, 1]]);
    }

    #[test]
    fn linear_pattern_detected_for_true_linear_motion() {
        let p = triangle();
        let v = p.vertex(0).unwrap();
        for i in 1..=20 {
            let t = i * 5_000;
            update_vertex(v, Point::new(i as f64, 0.0), t, true, 1000.0);
        }
        let f = detect_linear_pattern(v, 0, 100_000, 0.5);
        assert!(f.is_some());
    }
}
