use std::time::Duration;
use thiserror::Error;

/// Error types for the lloyd-kmeans library
#[derive(Error, Debug)]
pub enum KMeansError {
    /// The number of clusters k is invalid (must be > 0)
    #[error("Invalid k value: {0}")]
    InvalidK(String),

    /// Not enough data points for the requested number of clusters
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The dataset has no points, or its points have no components
    #[error("Dataset is empty")]
    EmptyDataset,

    /// A configuration value or an injected capability produced an unusable value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Vectors of unequal length met where equal length is required
    #[error("Dimension mismatch: expected {expected} components, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// A cluster lost all of its points and the empty-cluster policy is `Error`
    #[error("Cluster {cluster} has no assigned points after iteration {iteration}")]
    DegenerateCluster { cluster: usize, iteration: usize },

    /// An assignment phase did not finish before its deadline
    #[error("Assignment phase of iteration {iteration} exceeded its {timeout:?} deadline")]
    ConcurrencyTimeout { iteration: usize, timeout: Duration },

    /// The shared result map did not hold exactly one label per point
    #[error("Assignment phase produced {found} labels for {expected} points")]
    IncompleteAssignment { expected: usize, found: usize },

    /// The worker pool for the assignment phase could not be built
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("Failed to parse {value:?} as a number")]
    ParseFloat {
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },
}

/// Convenient alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, KMeansError>;
