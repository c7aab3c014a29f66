//! [`StoreConfig`]: construction-time knobs for a
//! [`crate::TemporalStoreService`].

/// Defaults applied across a [`crate::TemporalStoreService`] unless a call
/// site overrides them explicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreConfig {
    /// Default Chebyshev-distance threshold for the delta-vs-absolute
    /// update policy.
    pub delta_threshold: f64,

    /// Reconstruction-cache LRU capacity.
    pub lru_capacity: usize,

    /// Default per-axis tolerance for linear-pattern detection.
    pub pattern_detection_tolerance: f64,
}

impl Default for StoreConfig {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl StoreConfig {
    pub const DEFAULT: Self = Self {
        delta_threshold: 1.0,
        lru_capacity: crate::cache::ReconstructionCache::DEFAULT_CAPACITY,
        pattern_detection_tolerance: 0.5,
    };
}
