//! Geometric utilities: area, perimeter, centroid, bounding box,
//! point-in-polygon, self-intersection, and orientation. Pure functions
//! over [`Point`].

use tps_core::{Point, PolygonValidator};

/// Signed area via the shoelace formula. Positive for counter-clockwise
/// rings, negative for clockwise.
pub fn signed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

/// Unsigned area.
pub fn area(points: &[Point]) -> f64 {
    signed_area(points).abs()
}

pub fn perimeter(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
        })
        .sum()
}

/// Area-weighted centroid of a simple polygon.
pub fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::ZERO;
    }
    let a = signed_area(points);
    if a.abs() < 1e-12 {
        // Degenerate: fall back to the arithmetic mean.
        let n = points.len() as f64;
        let (sx, sy) = points.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        return Point::new(sx / n, sy / n);
    }
    let n = points.len();
    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        let p0 = points[i];
        let p1 = points[(i + 1) % n];
        let cross = p0.x * p1.y - p1.x * p0.y;
        cx += (p0.x + p1.x) * cross;
        cy += (p0.y + p1.y) * cross;
    }
    let factor = 1.0 / (6.0 * a);
    Point::new(cx * factor, cy * factor)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

pub fn bounding_box(points: &[Point]) -> Option<BoundingBox> {
    let first = *points.first()?;
    let (min, max) = points.iter().fold((first, first), |(min, max), &p| {
        (
            Point::new(min.x.min(p.x), min.y.min(p.y)),
            Point::new(max.x.max(p.x), max.y.max(p.y)),
        )
    });
    Some(BoundingBox { min, max })
}

/// Ray-casting point-in-polygon test (even-odd rule). Boundary behavior is
/// unspecified, as is conventional for this algorithm.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];
        let intersects = (pi.y > point.y) != (pj.y > point.y)
            && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
        if intersects {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Clockwise,
    CounterClockwise,
    Collinear,
}

pub fn orientation(points: &[Point]) -> Orientation {
    let a = signed_area(points);
    if a > 1e-10 {
        Orientation::CounterClockwise
    } else if a < -1e-10 {
        Orientation::Clockwise
    } else {
        Orientation::Collinear
    }
}

/// Twice the signed area of the triangle `(a, b, c)`; sign gives winding,
/// magnitude gives collinearity (used by [`has_collinear_triple`]).
fn cross2(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// True if any consecutive triple of vertices (wrapping around) forms a
/// triangle with area below `1e-10`.
pub fn has_collinear_triple(points: &[Point]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    (0..n).any(|i| {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = points[(i + 2) % n];
        (cross2(a, b, c) / 2.0).abs() < 1e-10
    })
}

fn segments_intersect(p1: Point, p2: Point, p3: Point, p4: Point) -> bool {
    let d1 = cross2(p3, p4, p1);
    let d2 = cross2(p3, p4, p2);
    let d3 = cross2(p1, p2, p3);
    let d4 = cross2(p1, p2, p4);

    ((d1 > 0.0) != (d2 > 0.0)) && ((d3 > 0.0) != (d4 > 0.0))
}

/// True if any pair of non-adjacent edges crosses. O(n^2); fine for the small
/// polygons this store targets.
pub fn self_intersects(points: &[Point]) -> bool {
    let n = points.len();
    if n < 4 {
        return false;
    }
    for i in 0..n {
        let (a1, a2) = (points[i], points[(i + 1) % n]);
        for j in (i + 1)..n {
            // Skip edges that share a vertex (adjacent, including the
            // wrap-around pair).
            if j == i || j == (i + 1) % n || (j + 1) % n == i {
                continue;
            }
            let (b1, b2) = (points[j], points[(j + 1) % n]);
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

/// The real [`PolygonValidator`]: rejects collinear consecutive triples and
/// self-intersecting rings.
pub struct GeometricValidator;

impl PolygonValidator for GeometricValidator {
    fn validate(&self, points: &[Point]) -> Vec<String> {
        let mut reasons = Vec::new();
        if has_collinear_triple(points) {
            reasons.push("three consecutive vertices are collinear (triangle area < 1e-10)".to_string());
        }
        if self_intersects(points) {
            reasons.push("polygon edges self-intersect".to_string());
        }
        reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]
    }

    #[test]
    fn area_of_unit_square_times_ten() {
        assert!((area(&square()) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn perimeter_of_square() {
        assert!((perimeter(&square()) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn centroid_of_square_is_its_center() {
        let c = centroid(&square());
        assert!((c.x - 5.0).abs() < 1e-9);
        assert!((c.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn bounding_box_of_square() {
        let bb = bounding_box(&square()).unwrap();
        assert_eq!(bb.min, Point::new(0.0, 0.0));
        assert_eq!(bb.max, Point::new(10.0, 10.0));
    }

    #[test]
    fn point_in_polygon_center_is_inside() {
        assert!(point_in_polygon(Point::new(5.0, 5.0), &square()));
        assert!(!point_in_polygon(Point::new(50.0, 50.0), &square()));
    }

    #[test]
    fn orientation_of_ccw_square_is_ccw() {
        assert_eq!(orientation(&square()), Orientation::CounterClockwise);
        let mut cw = square();
        cw.reverse();
        assert_eq!(orientation(&cw), Orientation::Clockwise);
    }

    #[test]
    fn collinear_triple_detected() {
        let degenerate = vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(10.0, 0.0)];
        assert!(has_collinear_triple(&degenerate));
        assert!(!has_collinear_triple(&square()));
    }

    #[test]
    fn bowtie_self_intersects() {
        let bowtie = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ];
        assert!(self_intersects(&bowtie));
        assert!(!self_intersects(&square()));
    }

    #[test]
    fn geometric_validator_rejects_degenerate_triangle() {
        let degenerate = vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(10.0, 0.0)];
        let reasons = GeometricValidator.validate(&degenerate);
        assert!(!reasons.is_empty());
        assert!(GeometricValidator.validate(&square()).is_empty());
    }
}
