//! A trivial id-to-polygon mapping: a narrow trait plus an in-memory
//! implementation backed by a [`TemporalStoreService`].

use uuid::Uuid;

use tps_core::{CoordSystem, Point, PolygonSummary, TemporalStoreService, Timestamp};

use crate::Result;

/// A minimal id-keyed view over temporal polygons. Exists so callers that
/// only need create/fetch/remove/list can depend on a trait object instead
/// of the full service surface.
pub trait PolygonRepository {
    fn get(&self, id: Uuid) -> Result<PolygonSummary>;
    fn insert(&self, vertex_ids: Vec<i64>, initial_points: Vec<Point>, t_init: Timestamp, coord_system: CoordSystem) -> Result<Uuid>;
    fn remove(&self, id: Uuid) -> Result<()>;
    fn ids(&self) -> Vec<Uuid>;
}

/// The only implementation this crate ships: a thin wrapper over
/// [`TemporalStoreService`]'s registry.
pub struct InMemoryPolygonRepository<'a> {
    service: &'a TemporalStoreService,
}

impl<'a> InMemoryPolygonRepository<'a> {
    pub fn new(service: &'a TemporalStoreService) -> Self {
        Self { service }
    }
}

impl PolygonRepository for InMemoryPolygonRepository<'_> {
    fn get(&self, id: Uuid) -> Result<PolygonSummary> {
        Ok(self.service.get_polygon(id)?)
    }

    fn insert(
        &self,
        vertex_ids: Vec<i64>,
        initial_points: Vec<Point>,
        t_init: Timestamp,
        coord_system: CoordSystem,
    ) -> Result<Uuid> {
        Ok(self.service.create_polygon(vertex_ids, initial_points, t_init, coord_system)?)
    }

    fn remove(&self, id: Uuid) -> Result<()> {
        Ok(self.service.remove_polygon(id)?)
    }

    fn ids(&self) -> Vec<Uuid> {
        self.service.get_all_polygons().iter().map(|p| p.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove_round_trip() {
        let service = TemporalStoreService::default();
        let repo = InMemoryPolygonRepository::new(&service);
        let id = repo
            .insert(
                vec![0, 1, 2],
                vec![Point::ZERO, Point::new(1.0, 0.0), Point::new(0.0, 1.0)],
                0,
                CoordSystem::Cartesian,
            )
            .unwrap();
        assert!(repo.ids().contains(&id));
        assert_eq!(repo.get(id).unwrap().id, id);
        repo.remove(id).unwrap();
        assert!(repo.get(id).is_err());
    }
}
