//! External collaborators for the temporal polygon store: GeoJSON
//! emission, Cartesian/Geographic coordinate conversion, JSON persistence,
//! geometric utilities, and a repository facade.
//!
//! Each module is a narrow adapter over `tps_core`; this crate depends on
//! `tps_core`, never the reverse.

pub mod coords;
pub mod geojson;
pub mod geometry;
pub mod persistence;
pub mod repository;

pub use coords::{GeoOrigin, EARTH_RADIUS_METERS};
pub use geometry::{BoundingBox, GeometricValidator, Orientation};
pub use repository::{InMemoryPolygonRepository, PolygonRepository};

/// Failure modes specific to the external-collaborator layer: GeoJSON
/// emission on a degenerate reconstruction, JSON persistence schema
/// violations, and coordinate conversion given out-of-domain input.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum FormatError {
    /// The temporal store itself reported a failure (unknown polygon,
    /// missing state, etc.) while this layer was handling a request.
    #[error(transparent)]
    Store(#[from] tps_core::Error),

    /// A JSON document did not have the shape `persistence` expects.
    #[error("malformed persistence document: {0}")]
    SchemaViolation(String),

    /// Underlying JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A reconstruction had fewer than three distinct points and cannot be
    /// emitted as a GeoJSON ring.
    #[error("reconstruction has only {distinct_points} distinct point(s), need at least 3")]
    DegenerateRing { distinct_points: usize },

    /// A coordinate fell outside the domain a conversion function expects
    /// (e.g. a latitude outside `[-90, 90]`).
    #[error("value out of domain: {0}")]
    OutOfDomain(String),
}

pub type Result<T> = std::result::Result<T, FormatError>;
