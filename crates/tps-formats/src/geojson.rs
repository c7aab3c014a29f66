//! GeoJSON emission: turns a reconstruction (or several) into a bare
//! `Geometry`, a `Feature`, or a `FeatureCollection`.

use std::collections::HashSet;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value as GeoValue};
use serde_json::json;
use uuid::Uuid;

use tps_core::{Point, TemporalStoreService, Timestamp};

use crate::{FormatError, Result};

/// Closes a reconstruction into a GeoJSON linear ring: the first point is
/// repeated at the end. Fails if the reconstruction has fewer than three
/// distinct points.
fn closed_ring(points: &[Point]) -> Result<Vec<Point>> {
    let distinct: HashSet<Point> = points.iter().copied().collect();
    if distinct.len() < 3 {
        return Err(FormatError::DegenerateRing {
            distinct_points: distinct.len(),
        });
    }
    let mut ring = points.to_vec();
    ring.push(points[0]);
    Ok(ring)
}

fn ring_to_geo_value(ring: &[Point]) -> GeoValue {
    let coords = ring.iter().map(|p| vec![p.x, p.y]).collect();
    GeoValue::Polygon(vec![coords])
}

/// Emits a bare `Geometry` for one reconstruction.
pub fn to_geometry(points: &[Point]) -> Result<Geometry> {
    let ring = closed_ring(points)?;
    Ok(Geometry::new(ring_to_geo_value(&ring)))
}

/// Emits a `Feature` wrapping one reconstruction, with `polygon_id` and `t`
/// carried as properties.
pub fn to_feature(polygon_id: Uuid, t: Timestamp, points: &[Point]) -> Result<Feature> {
    let geometry = to_geometry(points)?;
    let mut properties = JsonObject::new();
    properties.insert("polygonId".to_string(), json!(polygon_id.to_string()));
    properties.insert("time".to_string(), json!(t));
    Ok(Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Emits a `FeatureCollection` for multiple `(polygon_id, time)` pairs,
/// reading each reconstruction from `service`.
pub fn to_feature_collection(
    service: &TemporalStoreService,
    pairs: &[(Uuid, Timestamp)],
) -> Result<FeatureCollection> {
    let mut features = Vec::with_capacity(pairs.len());
    for &(polygon_id, t) in pairs {
        let points = service.get_polygon_at(polygon_id, t)?;
        features.push(to_feature(polygon_id, t, &points)?);
    }
    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// Convenience extension adding `to_geojson`-style methods directly to the
/// service, so callers get facade-level ergonomics without `tps_core`
/// taking a dependency on this crate.
pub trait GeoJsonExt {
    fn to_geojson(&self, polygon_id: Uuid, t: Timestamp) -> Result<Geometry>;
    fn to_geojson_feature(&self, polygon_id: Uuid, t: Timestamp) -> Result<Feature>;
    fn to_geojson_collection(&self, pairs: &[(Uuid, Timestamp)]) -> Result<FeatureCollection>;
}

impl GeoJsonExt for TemporalStoreService {
    fn to_geojson(&self, polygon_id: Uuid, t: Timestamp) -> Result<Geometry> {
        let points = self.get_polygon_at(polygon_id, t)?;
        to_geometry(&points)
    }

    fn to_geojson_feature(&self, polygon_id: Uuid, t: Timestamp) -> Result<Feature> {
        let points = self.get_polygon_at(polygon_id, t)?;
        to_feature(polygon_id, t, &points)
    }

    fn to_geojson_collection(&self, pairs: &[(Uuid, Timestamp)]) -> Result<FeatureCollection> {
        to_feature_collection(self, pairs)
    }
}
