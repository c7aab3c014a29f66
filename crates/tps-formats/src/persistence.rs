//! JSON persistence: a codec for [`TemporalPolygon`], including
//! natural-order id range encoding and the `Opaque`-falls-back-to-absolute
//! deserialization rule.

use ahash::AHashMap;
use serde_json::{json, Value};
use uuid::Uuid;

use tps_core::{
    CoordSystem, TemporalFunction, TemporalPolygon, TimeInterval, Vertex, VertexState,
    VertexStateKind,
};

use crate::{FormatError, Result};

/// True iff `ids` is exactly `0, 1, .., ids.len() - 1`.
fn is_natural_order(ids: &[i64]) -> bool {
    ids.iter().enumerate().all(|(i, &v)| v == i as i64)
}

/// Compresses a sorted id sequence into comma-separated tokens, each a bare
/// integer or an `a-b` run.
fn encode_range(ids: &[i64]) -> String {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < ids.len() {
        let run_start = ids[i];
        let mut j = i;
        while j + 1 < ids.len() && ids[j + 1] == ids[j] + 1 {
            j += 1;
        }
        let run_end = ids[j];
        if run_start == run_end {
            tokens.push(run_start.to_string());
        } else {
            tokens.push(format!("{run_start}-{run_end}"));
        }
        i = j + 1;
    }
    tokens.join(", ")
}

/// Expands an `encode_range` string back into the id sequence.
fn decode_range(encoded: &str) -> Result<Vec<i64>> {
    let mut ids = Vec::new();
    for token in encoded.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match token.split_once('-') {
            Some((a, b)) => {
                let a: i64 = a
                    .trim()
                    .parse()
                    .map_err(|_| FormatError::SchemaViolation(format!("bad range token {token:?}")))?;
                let b: i64 = b
                    .trim()
                    .parse()
                    .map_err(|_| FormatError::SchemaViolation(format!("bad range token {token:?}")))?;
                if a > b {
                    return Err(FormatError::SchemaViolation(format!("inverted range {token:?}")));
                }
                ids.extend(a..=b);
            }
            None => {
                let n: i64 = token
                    .parse()
                    .map_err(|_| FormatError::SchemaViolation(format!("bad id token {token:?}")))?;
                ids.push(n);
            }
        }
    }
    Ok(ids)
}

fn coord_system_to_str(cs: CoordSystem) -> &'static str {
    match cs {
        CoordSystem::Cartesian => "Cartesian",
        CoordSystem::Geographic => "Geographic",
    }
}

fn coord_system_from_str(s: &str) -> Result<CoordSystem> {
    match s {
        "Cartesian" => Ok(CoordSystem::Cartesian),
        "Geographic" => Ok(CoordSystem::Geographic),
        other => Err(FormatError::SchemaViolation(format!("unknown coordinate system {other:?}"))),
    }
}

fn function_to_json(function: &TemporalFunction) -> Option<Value> {
    match function {
        TemporalFunction::Linear { ref_point, t0, vx, vy } => Some(json!({
            "functionType": "Linear",
            "referencePointX": ref_point.x,
            "referencePointY": ref_point.y,
            "referenceTime": t0,
            "parameters": [vx, vy],
        })),
        TemporalFunction::Circular { center, t0, radius, omega, phi } => Some(json!({
            "functionType": "Circular",
            "referencePointX": center.x,
            "referencePointY": center.y,
            "referenceTime": t0,
            "parameters": [radius, omega, phi],
        })),
        TemporalFunction::Opaque { ref_point, t0, .. } => Some(json!({
            "functionType": "Opaque",
            "referencePointX": ref_point.x,
            "referencePointY": ref_point.y,
            "referenceTime": t0,
            "parameters": [],
        })),
    }
}

/// Rebuilds a `TemporalFunction` from its JSON shape. Returns `None` for
/// `Opaque` — the caller falls back to the absolute position stored
/// alongside it.
fn function_from_json(value: &Value) -> Result<Option<TemporalFunction>> {
    let function_type = value
        .get("functionType")
        .and_then(Value::as_str)
        .ok_or_else(|| FormatError::SchemaViolation("temporalFunction missing functionType".into()))?;
    if function_type == "Opaque" {
        return Ok(None);
    }
    let ref_x = value
        .get("referencePointX")
        .and_then(Value::as_f64)
        .ok_or_else(|| FormatError::SchemaViolation("temporalFunction missing referencePointX".into()))?;
    let ref_y = value
        .get("referencePointY")
        .and_then(Value::as_f64)
        .ok_or_else(|| FormatError::SchemaViolation("temporalFunction missing referencePointY".into()))?;
    let t0 = value
        .get("referenceTime")
        .and_then(Value::as_i64)
        .ok_or_else(|| FormatError::SchemaViolation("temporalFunction missing referenceTime".into()))?;
    let params: Vec<f64> = value
        .get("parameters")
        .and_then(Value::as_array)
        .ok_or_else(|| FormatError::SchemaViolation("temporalFunction missing parameters".into()))?
        .iter()
        .map(|v| v.as_f64().ok_or_else(|| FormatError::SchemaViolation("non-numeric parameter".into())))
        .collect::<Result<_>>()?;

    let ref_point = tps_core::Point::new(ref_x, ref_y);
    match function_type {
        "Linear" => {
            let [vx, vy] = params[..]
                .try_into()
                .map_err(|_| FormatError::SchemaViolation("Linear needs exactly 2 parameters".into()))?;
            Ok(Some(TemporalFunction::Linear { ref_point, t0, vx, vy }))
        }
        "Circular" => {
            let [radius, omega, phi] = params[..]
                .try_into()
                .map_err(|_| FormatError::SchemaViolation("Circular needs exactly 3 parameters".into()))?;
            Ok(Some(TemporalFunction::Circular {
                center: ref_point,
                t0,
                radius,
                omega,
                phi,
            }))
        }
        other => Err(FormatError::SchemaViolation(format!("unknown functionType {other:?}"))),
    }
}

fn state_to_json(state: &VertexState) -> Value {
    let (delta_x, delta_y, is_absolute, absolute_x, absolute_y, temporal_function) = match &state.kind {
        VertexStateKind::Absolute { point } => (0.0, 0.0, true, Some(point.x), Some(point.y), None),
        VertexStateKind::Delta { dx, dy } => (*dx, *dy, false, None, None, None),
        VertexStateKind::Function { function } => {
            // Functions carry their own reference point; absoluteX/Y mirror
            // it so an Opaque function still has a fallback position.
            let (rx, ry) = match function {
                TemporalFunction::Linear { ref_point, .. } => (ref_point.x, ref_point.y),
                TemporalFunction::Circular { center, .. } => (center.x, center.y),
                TemporalFunction::Opaque { ref_point, .. } => (ref_point.x, ref_point.y),
            };
            (0.0, 0.0, true, Some(rx), Some(ry), function_to_json(function))
        }
    };

    let mut obj = json!({
        "deltaX": delta_x,
        "deltaY": delta_y,
        "isAbsolute": is_absolute,
        "intervalStart": state.interval.start(),
    });
    let map = obj.as_object_mut().expect("object literal");
    if let Some(end) = state.interval.end() {
        map.insert("intervalEnd".into(), json!(end));
    }
    if let Some(x) = absolute_x {
        map.insert("absoluteX".into(), json!(x));
    }
    if let Some(y) = absolute_y {
        map.insert("absoluteY".into(), json!(y));
    }
    if !state.grouped_vertex_ids.is_empty() {
        map.insert("groupedVertexIds".into(), json!(state.grouped_vertex_ids));
    }
    if let Some(tf) = temporal_function {
        map.insert("temporalFunction".into(), tf);
    }
    obj
}

fn state_from_json(value: &Value) -> Result<VertexState> {
    let start = value
        .get("intervalStart")
        .and_then(Value::as_i64)
        .ok_or_else(|| FormatError::SchemaViolation("state missing intervalStart".into()))?;
    let end = value.get("intervalEnd").and_then(Value::as_i64);
    let interval = TimeInterval::new(start, end)?;
    let grouped_vertex_ids = value
        .get("groupedVertexIds")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();

    if let Some(tf_value) = value.get("temporalFunction") {
        if let Some(function) = function_from_json(tf_value)? {
            return Ok(VertexState::function(function, interval).with_group(grouped_vertex_ids));
        }
        // Opaque: fall back to the absolute position stored alongside.
        let x = value
            .get("absoluteX")
            .and_then(Value::as_f64)
            .ok_or_else(|| FormatError::SchemaViolation("Opaque fallback missing absoluteX".into()))?;
        let y = value
            .get("absoluteY")
            .and_then(Value::as_f64)
            .ok_or_else(|| FormatError::SchemaViolation("Opaque fallback missing absoluteY".into()))?;
        return Ok(VertexState::absolute(tps_core::Point::new(x, y), interval).with_group(grouped_vertex_ids));
    }

    let is_absolute = value
        .get("isAbsolute")
        .and_then(Value::as_bool)
        .ok_or_else(|| FormatError::SchemaViolation("state missing isAbsolute".into()))?;

    if is_absolute {
        let x = value
            .get("absoluteX")
            .and_then(Value::as_f64)
            .ok_or_else(|| FormatError::SchemaViolation("absolute state missing absoluteX".into()))?;
        let y = value
            .get("absoluteY")
            .and_then(Value::as_f64)
            .ok_or_else(|| FormatError::SchemaViolation("absolute state missing absoluteY".into()))?;
        Ok(VertexState::absolute(tps_core::Point::new(x, y), interval).with_group(grouped_vertex_ids))
    } else {
        let dx = value
            .get("deltaX")
            .and_then(Value::as_f64)
            .ok_or_else(|| FormatError::SchemaViolation("delta state missing deltaX".into()))?;
        let dy = value
            .get("deltaY")
            .and_then(Value::as_f64)
            .ok_or_else(|| FormatError::SchemaViolation("delta state missing deltaY".into()))?;
        Ok(VertexState::delta(dx, dy, interval).with_group(grouped_vertex_ids))
    }
}

/// Serializes a polygon to its JSON document shape. Vertex ids that are
/// exactly the natural order `0, 1, .., n-1` are
/// written as `vertexIdsEncoded`; any other sequence is written verbatim as
/// `vertexIds`.
pub fn serialize_polygon(polygon: &TemporalPolygon) -> Value {
    let ids = polygon.vertex_ids();
    let (vertex_ids, vertex_ids_encoded) = if is_natural_order(ids) {
        (Value::Null, json!(encode_range(ids)))
    } else {
        (json!(ids), Value::Null)
    };

    let vertices: Vec<Value> = polygon
        .vertices()
        .zip(ids.iter())
        .map(|(vertex, &id)| {
            let states: Vec<Value> = vertex.snapshot().iter().map(state_to_json).collect();
            json!({ "id": id, "states": states })
        })
        .collect();

    json!({
        "id": polygon.id().to_string(),
        "vertexIds": vertex_ids,
        "vertexIdsEncoded": vertex_ids_encoded,
        "coordinateSystem": coord_system_to_str(polygon.coord_system()),
        "vertices": vertices,
    })
}

/// Rebuilds a polygon from a document produced by [`serialize_polygon`].
pub fn deserialize_polygon(value: &Value) -> Result<TemporalPolygon> {
    let id_str = value
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| FormatError::SchemaViolation("document missing id".into()))?;
    let id = Uuid::parse_str(id_str).map_err(|e| FormatError::SchemaViolation(format!("bad uuid: {e}")))?;

    let vertex_ids_field = value.get("vertexIds").filter(|v| !v.is_null());
    let encoded_field = value.get("vertexIdsEncoded").and_then(Value::as_str);

    let vertex_ids = match (vertex_ids_field, encoded_field) {
        (Some(arr), None) => arr
            .as_array()
            .ok_or_else(|| FormatError::SchemaViolation("vertexIds must be an array".into()))?
            .iter()
            .map(|v| v.as_i64().ok_or_else(|| FormatError::SchemaViolation("non-integer vertex id".into())))
            .collect::<Result<Vec<_>>>()?,
        (None, Some(encoded)) => decode_range(encoded)?,
        _ => {
            return Err(FormatError::SchemaViolation(
                "exactly one of vertexIds or vertexIdsEncoded must be present".into(),
            ))
        }
    };

    let coord_system = match value.get("coordinateSystem").and_then(Value::as_str) {
        Some(s) => coord_system_from_str(s)?,
        None => CoordSystem::Cartesian,
    };

    let raw_vertices = value
        .get("vertices")
        .and_then(Value::as_array)
        .ok_or_else(|| FormatError::SchemaViolation("document missing vertices".into()))?;

    let mut vertices = AHashMap::default();
    for raw in raw_vertices {
        let vid = raw
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| FormatError::SchemaViolation("vertex missing id".into()))?;
        let raw_states = raw
            .get("states")
            .and_then(Value::as_array)
            .ok_or_else(|| FormatError::SchemaViolation("vertex missing states".into()))?;
        let states = raw_states.iter().map(state_from_json).collect::<Result<Vec<_>>>()?;
        vertices.insert(vid, Vertex::from_states(vid, states));
    }

    Ok(TemporalPolygon::from_vertices(id, vertex_ids, vertices, coord_system)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tps_core::Point;

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
            &tps_core::NullValidator,
        )
        .unwrap()
    }

    #[test]
    fn natural_order_ids_encode_as_range() {
        let p = square();
        let doc = serialize_polygon(&p);
        assert!(doc["vertexIds"].is_null());
        assert_eq!(doc["vertexIdsEncoded"], "0-3");
    }

    #[test]
    fn non_natural_order_ids_serialize_verbatim() {
        let p = TemporalPolygon::create(
            Uuid::nil(),
            vec![5, 2, 7, 3],
            vec![Point::ZERO, Point::ZERO, Point::ZERO, Point::ZERO],
            0,
            CoordSystem::Cartesian,
            &tps_core::NullValidator,
        )
        .unwrap();
        let doc = serialize_polygon(&p);
        assert!(doc["vertexIdsEncoded"].is_null());
        assert_eq!(doc["vertexIds"], json!([5, 2, 7, 3]));
    }

    #[test]
    fn round_trips_absolute_and_delta_states() {
        let p = square();
        p.vertex(0).unwrap().add_state(VertexState::delta(2.0, 2.0, TimeInterval::open_ended(100)));
        let doc = serialize_polygon(&p);
        let rebuilt = deserialize_polygon(&doc).unwrap();
        assert_eq!(rebuilt.id(), p.id());
        assert_eq!(rebuilt.reconstruct_at(100).unwrap(), p.reconstruct_at(100).unwrap());
        assert_eq!(rebuilt.reconstruct_at(0).unwrap(), p.reconstruct_at(0).unwrap());
    }

    #[test]
    fn round_trips_linear_function_state() {
        let p = square();
        let f = TemporalFunction::Linear {
            ref_point: Point::new(0.0, 0.0),
            t0: 0,
            vx: 1.0,
            vy: 0.0,
        };
        p.vertex(0)
            .unwrap()
            .add_state(VertexState::function(f, TimeInterval::open_ended(0)));
        let doc = serialize_polygon(&p);
        let rebuilt = deserialize_polygon(&doc).unwrap();
        assert_eq!(
            rebuilt.vertex(0).unwrap().position_at(2000),
            p.vertex(0).unwrap().position_at(2000)
        );
    }

    #[test]
    fn opaque_function_falls_back_to_absolute_on_deserialize() {
        let p = square();
        let f = TemporalFunction::Opaque {
            ref_point: Point::new(3.0, 4.0),
            t0: 0,
            f: std::sync::Arc::new(|t| Point::new(t as f64, 0.0)),
        };
        p.vertex(0)
            .unwrap()
            .add_state(VertexState::function(f, TimeInterval::open_ended(0)));
        let doc = serialize_polygon(&p);
        let rebuilt = deserialize_polygon(&doc).unwrap();
        assert_eq!(rebuilt.vertex(0).unwrap().position_at(500), Some(Point::new(3.0, 4.0)));
    }

    #[test]
    fn range_encode_decode_round_trip() {
        let ids = vec![0, 1, 2, 3, 4];
        let encoded = encode_range(&ids);
        assert_eq!(encoded, "0-4");
        assert_eq!(decode_range(&encoded).unwrap(), ids);
    }
}
