//! The precomputation table: marks awaiting materialization, and
//! materialized reconstructions keyed by `(polygon_id, time)`.

use std::collections::BTreeSet;
use std::time::SystemTime;

use ahash::AHashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::point::{Point, Timestamp};

/// A materialized reconstruction, plus the wall-clock time it was computed
/// for diagnostics.
#[derive(Debug, Clone)]
pub struct PrecomputedPolygon {
    pub points: Vec<Point>,
    pub computed_at: SystemTime,
}

/// Two maps guarded by one lock: `marks` (times flagged for future
/// materialization) and `precomputed` (the materialized results). Kept
/// together because `precompute_all_marked` needs a consistent snapshot of
/// both without racing a concurrent `mark`/`invalidate`.
#[derive(Default)]
pub struct PrecomputationTable {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    marks: AHashMap<Uuid, BTreeSet<Timestamp>>,
    precomputed: AHashMap<(Uuid, Timestamp), PrecomputedPolygon>,
}

impl PrecomputationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, polygon_id: Uuid, t: Timestamp) {
        self.inner.write().marks.entry(polygon_id).or_default().insert(t);
    }

    pub fn unmark(&self, polygon_id: Uuid, t: Timestamp) {
        let mut inner = self.inner.write();
        if let Some(times) = inner.marks.get_mut(&polygon_id) {
            times.remove(&t);
        }
    }

    pub fn precompute(&self, polygon_id: Uuid, t: Timestamp, points: Vec<Point>) {
        let entry = PrecomputedPolygon {
            points,
            computed_at: SystemTime::now(),
        };
        self.inner.write().precomputed.insert((polygon_id, t), entry);
    }

    /// Returns a copy of the materialized points, never a reference to the
    /// stored vec, so callers can't alias the table's internal state.
    pub fn try_get(&self, polygon_id: Uuid, t: Timestamp) -> Option<Vec<Point>> {
        self.inner
            .read()
            .precomputed
            .get(&(polygon_id, t))
            .map(|entry| entry.points.clone())
    }

    pub fn marked_times(&self, polygon_id: Uuid) -> Vec<Timestamp> {
        self.inner
            .read()
            .marks
            .get(&polygon_id)
            .map(|times| times.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshots the mark set for `polygon_id` outside the write lock, then
    /// calls `reconstruct_fn` for each marked time and stores any success.
    /// Per-time failures are swallowed and logged: a bad
    /// mark never blocks materializing the rest.
    pub fn precompute_all_marked(
        &self,
        polygon_id: Uuid,
        mut reconstruct_fn: impl FnMut(Timestamp) -> crate::error::Result<Vec<Point>>,
    ) {
        let marked = self.marked_times(polygon_id);
        for t in marked {
            match reconstruct_fn(t) {
                Ok(points) => self.precompute(polygon_id, t, points),
                Err(err) => {
                    log::debug!("precompute for polygon {polygon_id} at t={t} failed: {err}");
                }
            }
        }
    }

    /// Drops all precomputed entries for `polygon_id`; marks are kept so a
    /// later `precompute_all_marked` call can re-materialize them.
    pub fn invalidate(&self, polygon_id: Uuid) {
        let mut inner = self.inner.write();
        inner.precomputed.retain(|(pid, _), _| *pid != polygon_id);
    }

    /// Drops both marks and precomputed entries for `polygon_id`.
    pub fn clear(&self, polygon_id: Uuid) {
        let mut inner = self.inner.write();
        inner.marks.remove(&polygon_id);
        inner.precomputed.retain(|(pid, _), _| *pid != polygon_id);
    }
}
