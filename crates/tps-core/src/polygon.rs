//! [`TemporalPolygon`]: an immutable vertex-id topology over mutable
//! per-vertex histories.

use ahash::AHashMap;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::point::{Point, Timestamp};
use crate::vertex::Vertex;

/// Which plane the polygon's coordinates live in. Purely a tag consumed by
/// the coordinate-conversion collaborator (`tps-formats`); the core never
/// interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordSystem {
    Cartesian,
    Geographic,
}

/// A polygon whose topology (the ordered vertex-id sequence) is fixed at
/// creation and whose vertex positions evolve over time.
///
/// Invariants:
/// - `vertex_ids.len() >= 3`.
/// - Every id in `vertex_ids` is a key of `vertices`, and vice versa.
/// - `vertex_ids` never mutates after construction; only the vertex
///   histories it points at do.
#[derive(Debug)]
pub struct TemporalPolygon {
    id: Uuid,
    vertex_ids: Vec<i64>,
    vertices: AHashMap<i64, Vertex>,
    coord_system: CoordSystem,
}

/// A hook for the geometric-validation pass a polygon can require during
/// creation (collinearity, self-intersection) without giving
/// `tps-core` a hard dependency on a geometry library. `tps-formats`
/// provides the real implementation; [`NullValidator`] is the identity
/// default for callers (and tests) that don't need it.
pub trait PolygonValidator {
    /// Returns human-readable reasons the initial point set is invalid, or
    /// an empty vec if it's fine.
    fn validate(&self, points: &[Point]) -> Vec<String>;
}

/// Accepts any point set with at least [`TemporalPolygon::MIN_VERTICES`]
/// points; performs no geometric checks.
pub struct NullValidator;

impl PolygonValidator for NullValidator {
    fn validate(&self, _points: &[Point]) -> Vec<String> {
        Vec::new()
    }
}

impl TemporalPolygon {
    pub const MIN_VERTICES: usize = 3;

    /// Creates a polygon with initial absolute states at `t_init` for every
    /// vertex. `vertex_ids` and `initial_points`
    /// must be the same length and in correspondence.
    pub fn create(
        id: Uuid,
        vertex_ids: Vec<i64>,
        initial_points: Vec<Point>,
        t_init: Timestamp,
        coord_system: CoordSystem,
        validator: &dyn PolygonValidator,
    ) -> Result<Self> {
        if vertex_ids.len() < Self::MIN_VERTICES {
            return Err(Error::InvalidPolygon {
                reasons: vec![format!(
                    "a polygon needs at least {} vertices, got {}",
                    Self::MIN_VERTICES,
                    vertex_ids.len()
                )],
            });
        }
        if vertex_ids.len() != initial_points.len() {
            return Err(Error::InvalidArgument(format!(
                "vertex_ids has {} entries but initial_points has {}",
                vertex_ids.len(),
                initial_points.len()
            )));
        }
        let mut seen = ahash::AHashSet::default();
        for &vid in &vertex_ids {
            if !seen.insert(vid) {
                return Err(Error::InvalidArgument(format!("duplicate vertex id {vid}")));
            }
        }

        let reasons = validator.validate(&initial_points);
        if !reasons.is_empty() {
            return Err(Error::InvalidPolygon { reasons });
        }

        let mut vertices = AHashMap::default();
        for (&vid, &point) in vertex_ids.iter().zip(initial_points.iter()) {
            vertices.insert(
                vid,
                Vertex::new(
                    vid,
                    crate::VertexState::absolute(point, crate::TimeInterval::open_ended(t_init)),
                ),
            );
        }

        Ok(Self {
            id,
            vertex_ids,
            vertices,
            coord_system,
        })
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn vertex_ids(&self) -> &[i64] {
        &self.vertex_ids
    }

    #[inline]
    pub fn coord_system(&self) -> CoordSystem {
        self.coord_system
    }

    /// Rebuilds a polygon from already-complete vertex histories, e.g. when
    /// deserializing. Skips the geometric validator and the
    /// single-initial-state assumption `create` makes, but still enforces
    /// the vertex-id/vertex-map correspondence invariant.
    pub fn from_vertices(
        id: Uuid,
        vertex_ids: Vec<i64>,
        vertices: AHashMap<i64, Vertex>,
        coord_system: CoordSystem,
    ) -> Result<Self> {
        if vertex_ids.len() < Self::MIN_VERTICES {
            return Err(Error::InvalidPolygon {
                reasons: vec![format!(
                    "a polygon needs at least {} vertices, got {}",
                    Self::MIN_VERTICES,
                    vertex_ids.len()
                )],
            });
        }
        for &vid in &vertex_ids {
            if !vertices.contains_key(&vid) {
                return Err(Error::InvalidArgument(format!(
                    "vertex_ids names {vid} but no matching vertex history was supplied"
                )));
            }
        }
        if vertices.len() != vertex_ids.len() {
            return Err(Error::InvalidArgument(
                "vertex history map must contain exactly the ids in vertex_ids".into(),
            ));
        }
        Ok(Self {
            id,
            vertex_ids,
            vertices,
            coord_system,
        })
    }

    pub fn vertex(&self, vertex_id: i64) -> Option<&Vertex> {
        self.vertices.get(&vertex_id)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertex_ids.iter().filter_map(move |id| self.vertices.get(id))
    }

    /// Reconstructs the polygon's shape at `t`: resolves every vertex in
    /// `vertex_ids` order. Fails with [`Error::MissingState`] if any vertex
    /// has no state containing `t`. The list is never closed automatically;
    /// closing for GeoJSON is the formatter's job.
    pub fn reconstruct_at(&self, t: Timestamp) -> Result<Vec<Point>> {
        let mut points = Vec::with_capacity(self.vertex_ids.len());
        for &vid in &self.vertex_ids {
            let vertex = self
                .vertices
                .get(&vid)
                .expect("invariant I6: every vertex_id has a Vertex");
            let p = vertex
                .position_at(t)
                .ok_or(Error::MissingState { vertex_id: vid, t })?;
            points.push(p);
        }
        Ok(points)
    }

    /// True iff every vertex resolves at `t`.
    pub fn exists_at(&self, t: Timestamp) -> bool {
        self.vertex_ids
            .iter()
            .all(|vid| self.vertices[vid].position_at(t).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Point;

    fn square() -> TemporalPolygon {
        TemporalPolygon::create(
            Uuid::nil(),
            vec![0, 1, 2, 3],
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ],
            0,
            CoordSystem::Cartesian,
            &NullValidator,
        )
        .unwrap()
    }

    #[test]
    fn reconstruct_matches_initial_points() {
        let p = square();
        let pts = p.reconstruct_at(0).unwrap();
        assert_eq!(pts.len(), 4);
        assert_eq!(pts[0], Point::new(0.0, 0.0));
        assert_eq!(pts[2], Point::new(10.0, 10.0));
    }

    #[test]
    fn reconstruct_at_later_time_unchanged_without_updates() {
        let p = square();
        assert_eq!(p.reconstruct_at(0).unwrap(), p.reconstruct_at(3_600_000).unwrap());
    }

    #[test]
    fn rejects_fewer_than_three_vertices() {
        let err = TemporalPolygon::create(
            Uuid::nil(),
            vec![0, 1],
            vec![Point::ZERO, Point::ZERO],
            0,
            CoordSystem::Cartesian,
            &NullValidator,
        );
        assert!(matches!(err, Err(Error::InvalidPolygon { .. })));
    }

    #[test]
    fn rejects_duplicate_vertex_ids() {
        let err = TemporalPolygon::create(
            Uuid::nil(),
            vec![0, 1, 1],
            vec![Point::ZERO, Point::ZERO, Point::ZERO],
            0,
            CoordSystem::Cartesian,
            &NullValidator,
        );
        assert!(err.is_err());
    }

    #[test]
    fn missing_state_before_creation_time() {
        let p = square();
        let err = p.reconstruct_at(-1);
        assert!(matches!(err, Err(Error::MissingState { .. })));
    }
}
