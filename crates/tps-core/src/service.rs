//! The service facade: the public surface, orchestrating the vertex
//! store, caches, and precomputation table under reader/writer
//! concurrency, and emitting change notifications.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::cache::ReconstructionCache;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::point::{Point, Timestamp};
use crate::polygon::{CoordSystem, NullValidator, PolygonValidator, TemporalPolygon};
use crate::precompute::PrecomputationTable;
use crate::{query, state_manager};

/// Lightweight, cloneable view of a polygon's fixed topology — what
/// `get_polygon`/`get_all_polygons` hand back, since the
/// [`TemporalPolygon`] itself holds per-vertex mutexes and isn't cheap (or
/// safe) to copy wholesale out from under the registry lock.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonSummary {
    pub id: Uuid,
    pub vertex_ids: Vec<i64>,
    pub coord_system: CoordSystem,
}

impl From<&TemporalPolygon> for PolygonSummary {
    fn from(p: &TemporalPolygon) -> Self {
        Self {
            id: p.id(),
            vertex_ids: p.vertex_ids().to_vec(),
            coord_system: p.coord_system(),
        }
    }
}

/// What kind of change a [`PolygonChanged`] event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonChangeKind {
    Created,
    Updated,
    VertexChanged,
    Deleted,
}

#[derive(Debug, Clone)]
pub struct PolygonChanged {
    pub polygon_id: Uuid,
    pub kind: PolygonChangeKind,
    pub polygon: Option<PolygonSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexChanged {
    pub polygon_id: Uuid,
    pub vertex_id: i64,
    pub change_time: Timestamp,
    pub new_position: Point,
}

/// The two notification types the service emits.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    Polygon(PolygonChanged),
    Vertex(VertexChanged),
}

type Observer = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

/// The public temporal-polygon-store service.
///
/// Multiple instances are independent; each owns its own registry, caches, and observer list.
pub struct TemporalStoreService {
    config: StoreConfig,
    registry: RwLock<AHashMap<Uuid, Arc<TemporalPolygon>>>,
    cache: ReconstructionCache,
    precompute: PrecomputationTable,
    observers: Mutex<Vec<Observer>>,
    validator: Box<dyn PolygonValidator + Send + Sync>,
}

impl Default for TemporalStoreService {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl TemporalStoreService {
    pub fn new(config: StoreConfig) -> Self {
        Self::with_validator(config, Box::new(NullValidator))
    }

    /// As [`Self::new`], but with an explicit geometric validator (the real
    /// one lives in `tps-formats`, so `tps-core` stays free of a geometry
    /// dependency cycle; see `SPEC_FULL.md` §11).
    pub fn with_validator(config: StoreConfig, validator: Box<dyn PolygonValidator + Send + Sync>) -> Self {
        Self {
            cache: ReconstructionCache::new(config.lru_capacity),
            precompute: PrecomputationTable::new(),
            registry: RwLock::new(AHashMap::default()),
            observers: Mutex::new(Vec::new()),
            config,
            validator,
        }
    }

    pub fn config(&self) -> StoreConfig {
        self.config
    }

    /// Registers an observer that runs synchronously, on the writer's
    /// thread, after each mutating operation commits and invalidates
    /// caches. Observers must not call back into mutating operations on
    /// the same polygon: reentrancy is unsupported.
    pub fn subscribe(&self, observer: impl Fn(&ChangeEvent) + Send + Sync + 'static) {
        self.observers.lock().push(Box::new(observer));
    }

    fn notify(&self, event: ChangeEvent) {
        for observer in self.observers.lock().iter() {
            observer(&event);
        }
    }

    fn get_arc(&self, polygon_id: Uuid) -> Result<Arc<TemporalPolygon>> {
        self.registry
            .read()
            .get(&polygon_id)
            .cloned()
            .ok_or(Error::PolygonNotFound(polygon_id))
    }

    // --- Lifecycle -----------------------------------------------------

    pub fn create_polygon(
        &self,
        vertex_ids: Vec<i64>,
        initial_points: Vec<Point>,
        t_init: Timestamp,
        coord_system: CoordSystem,
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let polygon = TemporalPolygon::create(
            id,
            vertex_ids,
            initial_points,
            t_init,
            coord_system,
            self.validator.as_ref(),
        )?;
        let summary = PolygonSummary::from(&polygon);
        self.registry.write().insert(id, Arc::new(polygon));
        log::debug!("created polygon {id}");
        self.notify(ChangeEvent::Polygon(PolygonChanged {
            polygon_id: id,
            kind: PolygonChangeKind::Created,
            polygon: Some(summary),
        }));
        Ok(id)
    }

    /// Removes a polygon, evicting its cache and precomputation entries.
    pub fn remove_polygon(&self, polygon_id: Uuid) -> Result<()> {
        let removed = self
            .registry
            .write()
            .remove(&polygon_id)
            .ok_or(Error::PolygonNotFound(polygon_id))?;
        self.cache.invalidate(polygon_id);
        self.precompute.clear(polygon_id);
        log::debug!("removed polygon {polygon_id}");
        self.notify(ChangeEvent::Polygon(PolygonChanged {
            polygon_id,
            kind: PolygonChangeKind::Deleted,
            polygon: Some(PolygonSummary::from(removed.as_ref())),
        }));
        Ok(())
    }

    pub fn get_polygon(&self, polygon_id: Uuid) -> Result<PolygonSummary> {
        self.get_arc(polygon_id).map(|p| PolygonSummary::from(p.as_ref()))
    }

    pub fn get_all_polygons(&self) -> Vec<PolygonSummary> {
        self.registry
            .read()
            .values()
            .map(|p| PolygonSummary::from(p.as_ref()))
            .collect()
    }

    // --- Writes ----------------------------------------------------------

    /// Updates one vertex's position at `t_change`, via the delta-vs-
    /// absolute policy. `use_delta` defaults to `true`;
    /// `delta_threshold` defaults to [`StoreConfig::delta_threshold`].
    pub fn update_vertex(
        &self,
        polygon_id: Uuid,
        vertex_id: i64,
        new_point: Point,
        t_change: Timestamp,
        use_delta: Option<bool>,
        delta_threshold: Option<f64>,
    ) -> Result<()> {
        let polygon = self.get_arc(polygon_id)?;
        let vertex = polygon.vertex(vertex_id).ok_or(Error::VertexNotFound {
            polygon_id,
            vertex_id,
        })?;

        state_manager::update_vertex(
            vertex,
            new_point,
            t_change,
            use_delta.unwrap_or(true),
            delta_threshold.unwrap_or(self.config.delta_threshold),
        );

        self.cache.invalidate(polygon_id);
        self.precompute.invalidate(polygon_id);

        self.notify(ChangeEvent::Polygon(PolygonChanged {
            polygon_id,
            kind: PolygonChangeKind::VertexChanged,
            polygon: None,
        }));
        self.notify(ChangeEvent::Vertex(VertexChanged {
            polygon_id,
            vertex_id,
            change_time: t_change,
            new_position: new_point,
        }));
        Ok(())
    }

    /// Batch update with one shared delta across `vertex_ids`. The first id listed owns the group.
    pub fn update_vertices_with_same_delta(
        &self,
        polygon_id: Uuid,
        vertex_ids: &[i64],
        delta: Point,
        t_change: Timestamp,
    ) -> Result<()> {
        if vertex_ids.is_empty() {
            return Err(Error::InvalidArgument(
                "update_vertices_with_same_delta requires at least one vertex id".into(),
            ));
        }
        let polygon = self.get_arc(polygon_id)?;
        let mut vertices = Vec::with_capacity(vertex_ids.len());
        for &vid in vertex_ids {
            let v = polygon.vertex(vid).ok_or(Error::VertexNotFound {
                polygon_id,
                vertex_id: vid,
            })?;
            vertices.push(v);
        }

        state_manager::update_vertices_with_same_delta(vertices.iter().copied(), delta, t_change);

        self.cache.invalidate(polygon_id);
        self.precompute.invalidate(polygon_id);

        self.notify(ChangeEvent::Polygon(PolygonChanged {
            polygon_id,
            kind: PolygonChangeKind::VertexChanged,
            polygon: None,
        }));
        for (&vid, vertex) in vertex_ids.iter().zip(&vertices) {
            let new_position = vertex.position_at(t_change).ok_or(Error::MissingState {
                vertex_id: vid,
                t: t_change,
            })?;
            self.notify(ChangeEvent::Vertex(VertexChanged {
                polygon_id,
                vertex_id: vid,
                change_time: t_change,
                new_position,
            }));
        }
        Ok(())
    }

    // --- Reads -------------------------------------------------------------

    pub fn get_vertex_position(&self, polygon_id: Uuid, vertex_id: i64, t: Timestamp) -> Result<Point> {
        let polygon = self.get_arc(polygon_id)?;
        let vertex = polygon.vertex(vertex_id).ok_or(Error::VertexNotFound {
            polygon_id,
            vertex_id,
        })?;
        vertex.position_at(t).ok_or(Error::MissingState { vertex_id, t })
    }

    /// The three-tier read path: precomputation table, then
    /// LRU cache, then a fresh reconstruction (which is then cached).
    pub fn get_polygon_at(&self, polygon_id: Uuid, t: Timestamp) -> Result<Vec<Point>> {
        if let Some(points) = self.precompute.try_get(polygon_id, t) {
            log::trace!("precomputation hit for polygon {polygon_id} at t={t}");
            return Ok(points);
        }
        if let Some(points) = self.cache.get((polygon_id, t)) {
            log::trace!("LRU hit for polygon {polygon_id} at t={t}");
            return Ok(points);
        }

        let polygon = self.get_arc(polygon_id)?;
        let points = polygon.reconstruct_at(t)?;
        self.cache.put((polygon_id, t), points.clone());
        Ok(points)
    }

    pub fn polygons_in_time_range(&self, t1: Timestamp, t2: Timestamp) -> Result<Vec<Uuid>> {
        if t2 < t1 {
            return Err(Error::InvalidArgument("t2 must be >= t1".into()));
        }
        Ok(self
            .registry
            .read()
            .values()
            .filter(|p| query::polygon_exists_in_range(p, t1, t2))
            .map(|p| p.id())
            .collect())
    }

    pub fn polygons_for_entire_time_range(&self, t1: Timestamp, t2: Timestamp) -> Result<Vec<Uuid>> {
        if t2 < t1 {
            return Err(Error::InvalidArgument("t2 must be >= t1".into()));
        }
        Ok(self
            .registry
            .read()
            .values()
            .filter(|p| query::polygon_exists_for_entire_range(p, t1, t2))
            .map(|p| p.id())
            .collect())
    }

    pub fn polygon_history(
        &self,
        polygon_id: Uuid,
        t1: Timestamp,
        t2: Timestamp,
        step: Option<Timestamp>,
    ) -> Result<Vec<(Timestamp, Vec<Point>)>> {
        if t2 < t1 {
            return Err(Error::InvalidArgument("t2 must be >= t1".into()));
        }
        let polygon = self.get_arc(polygon_id)?;
        Ok(query::history(&polygon, t1, t2, step))
    }

    pub fn detect_identical_changes(&self, polygon_id: Uuid, t: Timestamp) -> Result<Vec<Vec<i64>>> {
        let polygon = self.get_arc(polygon_id)?;
        Ok(state_manager::detect_identical_changes(&polygon, t))
    }

    // --- Precomputation --------------------------------------------------

    pub fn mark_time_for_precomputation(&self, polygon_id: Uuid, t: Timestamp) -> Result<()> {
        self.get_arc(polygon_id)?; // existence check
        self.precompute.mark(polygon_id, t);
        Ok(())
    }

    pub fn mark_times_for_precomputation(&self, polygon_id: Uuid, times: &[Timestamp]) -> Result<()> {
        self.get_arc(polygon_id)?;
        for &t in times {
            self.precompute.mark(polygon_id, t);
        }
        Ok(())
    }

    pub fn unmark_time_for_precomputation(&self, polygon_id: Uuid, t: Timestamp) -> Result<()> {
        self.get_arc(polygon_id)?;
        self.precompute.unmark(polygon_id, t);
        Ok(())
    }

    pub fn get_precomputation_times(&self, polygon_id: Uuid) -> Vec<Timestamp> {
        self.precompute.marked_times(polygon_id)
    }

    /// Materializes every marked time for `polygon_id`. Snapshots the mark
    /// set, then reconstructs outside any write lock; per-time failures
    /// are logged and skipped.
    pub fn precompute_marked_times(&self, polygon_id: Uuid) -> Result<()> {
        let polygon = self.get_arc(polygon_id)?;
        self.precompute
            .precompute_all_marked(polygon_id, |t| polygon.reconstruct_at(t));
        Ok(())
    }

    pub fn precompute_polygon_at(&self, polygon_id: Uuid, t: Timestamp) -> Result<()> {
        let polygon = self.get_arc(polygon_id)?;
        let points = polygon.reconstruct_at(t)?;
        self.precompute.precompute(polygon_id, t, points);
        Ok(())
    }

    pub fn clear_precomputations(&self, polygon_id: Uuid) -> Result<()> {
        self.get_arc(polygon_id)?;
        self.precompute.clear(polygon_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn square(service: &TemporalStoreService, t0: Timestamp) -> Uuid {
        service
            .create_polygon(
                vec![0, 1, 2, 3],
                vec![
                    Point::new(0.0, 0.0),
                    Point::new(10.0, 0.0),
                    Point::new(10.0, 10.0),
                    Point::new(0.0, 10.0),
                ],
                t0,
                CoordSystem::Cartesian,
            )
            .unwrap()
    }

    #[test]
    fn scenario_s1_unit_square_no_movement() {
        let service = TemporalStoreService::default();
        let pid = square(&service, 0);
        let initial = service.get_polygon_at(pid, 0).unwrap();
        let later = service.get_polygon_at(pid, 3_600_000).unwrap();
        assert_eq!(initial, later);
    }

    #[test]
    fn scenario_s2_small_delta() {
        let service = TemporalStoreService::default();
        let pid = square(&service, 0);
        service
            .update_vertex(pid, 0, Point::new(2.0, 2.0), 3_600_000, Some(true), Some(100.0))
            .unwrap();
        let at_change = service.get_polygon_at(pid, 3_600_000).unwrap();
        assert_eq!(at_change[0], Point::new(2.0, 2.0));
        let before = service.get_polygon_at(pid, 0).unwrap();
        assert_eq!(before[0], Point::new(0.0, 0.0));
    }

    #[test]
    fn scenario_s3_large_move_reanchors() {
        let service = TemporalStoreService::default();
        let pid = square(&service, 0);
        service
            .update_vertex(pid, 0, Point::new(500.0, 500.0), 3_600_000, Some(true), Some(100.0))
            .unwrap();
        let points = service.get_polygon_at(pid, 3_600_000).unwrap();
        assert_eq!(points[0], Point::new(500.0, 500.0));
    }

    #[test]
    fn scenario_s5_batch_shared_delta() {
        let service = TemporalStoreService::default();
        let pid = service
            .create_polygon(
                vec![0, 1, 2],
                vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(5.0, 10.0)],
                0,
                CoordSystem::Cartesian,
            )
            .unwrap();
        service
            .update_vertices_with_same_delta(pid, &[0, 1, 2], Point::new(5.0, 5.0), 1_000)
            .unwrap();
        let points = service.get_polygon_at(pid, 1_000).unwrap();
        assert_eq!(
            points,
            vec![Point::new(5.0, 5.0), Point::new(15.0, 5.0), Point::new(10.0, 15.0)]
        );
    }

    #[test]
    fn scenario_s6_precomputation_invalidated_on_write() {
        let service = TemporalStoreService::default();
        let pid = square(&service, 0);
        service.mark_time_for_precomputation(pid, 1_000).unwrap();
        service.precompute_marked_times(pid).unwrap();
        assert!(service.get_precomputation_times(pid).contains(&1_000));

        service
            .update_vertex(pid, 0, Point::new(50.0, 50.0), 2_000, Some(true), Some(1.0))
            .unwrap();

        // Marks are retained, but materialization must be re-requested:
        assert!(service.get_precomputation_times(pid).contains(&1_000));
        let fresh = service.get_polygon_at(pid, 1_000).unwrap();
        assert_eq!(fresh[0], Point::new(0.0, 0.0)); // unaffected by the t=2000 update
    }

    #[test]
    fn scenario_s7_range_queries() {
        let service = TemporalStoreService::default();
        let a = service
            .create_polygon(
                vec![0, 1, 2],
                vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.0, 1.0)],
                0,
                CoordSystem::Cartesian,
            )
            .unwrap();
        for &vid in &[0, 1, 2] {
            service
                .update_vertex(a, vid, Point::new(1000.0, 1000.0), 1_000, Some(false), None)
                .unwrap();
        }
        // `a`'s first states cover [0, 1000) only (closed by the update above).
        let b = service
            .create_polygon(
                vec![0, 1, 2],
                vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.0, 1.0)],
                2_000,
                CoordSystem::Cartesian,
            )
            .unwrap();

        let in_early_range = service.polygons_in_time_range(0, 999).unwrap();
        assert_eq!(in_early_range, vec![a]);

        let mut in_wide_range = service.polygons_in_time_range(0, 5_000).unwrap();
        in_wide_range.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(in_wide_range, expected);
    }

    #[test]
    fn remove_polygon_invalidates_caches_and_notifies() {
        let service = TemporalStoreService::default();
        let pid = square(&service, 0);
        let deletions = Arc::new(AtomicUsize::new(0));
        let deletions_clone = deletions.clone();
        service.subscribe(move |event| {
            if let ChangeEvent::Polygon(PolygonChanged {
                kind: PolygonChangeKind::Deleted,
                ..
            }) = event
            {
                deletions_clone.fetch_add(1, Ordering::SeqCst);
            }
        });
        service.get_polygon_at(pid, 0).unwrap(); // warm the LRU
        service.remove_polygon(pid).unwrap();
        assert_eq!(deletions.load(Ordering::SeqCst), 1);
        assert!(matches!(service.get_polygon_at(pid, 0), Err(Error::PolygonNotFound(_))));
    }

    #[test]
    fn reversed_range_is_invalid_argument() {
        let service = TemporalStoreService::default();
        assert!(matches!(
            service.polygons_in_time_range(10, 5),
            Err(Error::InvalidArgument(_))
        ));
    }
}
