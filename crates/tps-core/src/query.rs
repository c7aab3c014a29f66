//! The query engine: existence, change-time enumeration, and history
//! sampling.

use std::collections::BTreeSet;

use crate::point::{Point, Timestamp};
use crate::polygon::TemporalPolygon;

/// True iff every vertex has at least one state whose interval intersects
/// `[t1, t2]`.
pub fn polygon_exists_in_range(polygon: &TemporalPolygon, t1: Timestamp, t2: Timestamp) -> bool {
    polygon.vertex_ids().iter().all(|&vid| {
        polygon
            .vertex(vid)
            .map(|v| v.snapshot().iter().any(|s| s.interval.intersects_range(t1, t2)))
            .unwrap_or(false)
    })
}

/// Simplified range check: both endpoints must satisfy
/// [`TemporalPolygon::exists_at`]. Interior gaps are *not* detected — this
/// is documented, intentional behavior, not a bug to be silently
/// strengthened.
pub fn polygon_exists_for_entire_range(
    polygon: &TemporalPolygon,
    t1: Timestamp,
    t2: Timestamp,
) -> bool {
    polygon.exists_at(t1) && polygon.exists_at(t2)
}

/// The sorted set containing `t1`, `t2`, and every `interval.start`/`end`
/// of every state of every vertex that falls in `[t1, t2]`.
pub fn change_times_in_range(polygon: &TemporalPolygon, t1: Timestamp, t2: Timestamp) -> Vec<Timestamp> {
    let mut times: BTreeSet<Timestamp> = BTreeSet::new();
    times.insert(t1);
    times.insert(t2);
    for &vid in polygon.vertex_ids() {
        let Some(vertex) = polygon.vertex(vid) else {
            continue;
        };
        for state in vertex.snapshot() {
            let start = state.interval.start();
            if start >= t1 && start <= t2 {
                times.insert(start);
            }
            if let Some(end) = state.interval.end() {
                if end >= t1 && end <= t2 {
                    times.insert(end);
                }
            }
        }
    }
    times.into_iter().collect()
}

/// Samples the polygon's reconstruction over `[t1, t2]`. When `step` is
/// given, samples at `t1, t1+step, ..` up to `t2`; otherwise samples at
/// each time in [`change_times_in_range`]. Times where reconstruction
/// fails are silently omitted.
pub fn history(
    polygon: &TemporalPolygon,
    t1: Timestamp,
    t2: Timestamp,
    step: Option<Timestamp>,
) -> Vec<(Timestamp, Vec<Point>)> {
    let times: Vec<Timestamp> = match step {
        Some(step) if step > 0 => {
            let mut times = Vec::new();
            let mut t = t1;
            while t <= t2 {
                times.push(t);
                t += step;
            }
            times
        }
        _ => change_times_in_range(polygon, t1, t2),
    };

    times
        .into_iter()
        .filter_map(|t| match polygon.reconstruct_at(t) {
            Ok(points) => Some((t, points)),
            Err(err) => {
                log::debug!("omitting t={t} from history: {err}");
                None
            }
        })
        .collect()
}
