//! An in-memory store for temporal polygons: two-dimensional polygons
//! whose topology is immutable but whose vertex positions evolve over
//! time.
//!
//! * See [`TemporalPolygon`] and [`Vertex`] for the core data model.
//! * See [`TemporalStoreService`] for the public, concurrency-safe facade
//!   most callers want.
//! * See the `query` module for range/history operations, and `cache` /
//!   `precompute` for the two caching tiers the service composes.
//!
//! GeoJSON emission, coordinate conversion, JSON persistence, geometric
//! validation, and a repository-shaped facade live in the sibling
//! `tps-formats` crate, which depends on this one but not vice versa.

pub mod cache;
pub mod config;
pub mod error;
pub mod point;
pub mod polygon;
pub mod precompute;
pub mod query;
pub mod service;
pub mod state_manager;
pub mod temporal_function;
pub mod vertex;
pub mod vertex_state;

pub use cache::{CacheKey, ReconstructionCache};
pub use config::StoreConfig;
pub use error::{Error, Result};
pub use point::{Point, TimeInterval, Timestamp, EPSILON};
pub use polygon::{CoordSystem, NullValidator, PolygonValidator, TemporalPolygon};
pub use precompute::{PrecomputationTable, PrecomputedPolygon};
pub use service::{
    ChangeEvent, PolygonChangeKind, PolygonChanged, PolygonSummary, TemporalStoreService,
    VertexChanged,
};
pub use state_manager::{detect_identical_changes, detect_linear_pattern, update_vertex, update_vertices_with_same_delta};
pub use temporal_function::TemporalFunction;
pub use vertex::{HistoryIssue, Vertex};
pub use vertex_state::{VertexState, VertexStateKind};
