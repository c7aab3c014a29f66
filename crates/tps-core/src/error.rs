//! Error kinds for the temporal polygon store.
//!
//! One enum covering every fallible outcome. All fallible public APIs
//! return [`Result`].

use uuid::Uuid;

/// Everything that can go wrong when building, mutating, or querying a
/// [`crate::TemporalPolygon`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A polygon id was not found in the service's registry.
    #[error("no polygon with id {0}")]
    PolygonNotFound(Uuid),

    /// A vertex id was not found on the addressed polygon.
    #[error("polygon {polygon_id} has no vertex {vertex_id}")]
    VertexNotFound { polygon_id: Uuid, vertex_id: i64 },

    /// Bad caller input: unknown ids already covered above, empty
    /// collections, non-positive cache capacities, reversed ranges.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Geometric validation failed during polygon construction.
    #[error("invalid polygon: {}", .reasons.join("; "))]
    InvalidPolygon { reasons: Vec<String> },

    /// `end <= start` when constructing a [`crate::TimeInterval`].
    #[error("invalid interval: end ({end:?}) must be greater than start ({start})")]
    InvalidInterval {
        start: crate::Timestamp,
        end: Option<crate::Timestamp>,
    },

    /// Reconstruction at a time for which at least one vertex has no
    /// containing state.
    #[error("vertex {vertex_id} has no state covering t={t}")]
    MissingState { vertex_id: i64, t: crate::Timestamp },

    /// A [`crate::TemporalFunction`] was evaluated outside its interval.
    #[error("time {t} is outside the function's interval")]
    TimeOutOfRange { t: crate::Timestamp },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Format an error together with its chain of sources, in the style of
/// `re_error::format`. Always prefer this over a bare `Display` when the
/// error might have been built from a lower-level cause.
pub fn format_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut string = error.to_string();
    for source in std::iter::successors(error.source(), |error| error.source()) {
        string.push_str(" -> ");
        string.push_str(&source.to_string());
    }
    string
}
