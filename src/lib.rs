//! # lloyd-kmeans
//!
//! Lloyd's k-means clustering over `ndarray` matrices with a
//! concurrency-bounded parallel assignment phase.
//!
//! ## Features
//!
//! - **Injected randomness**: initial centroids are drawn through an
//!   [`IndexSource`], so runs are reproducible with any deterministic source
//! - **Bounded parallelism**: each assignment phase runs on a rayon pool whose
//!   size is the configured concurrency limit, and completes before centroids
//!   are recomputed
//! - **Fixed iteration count** by default, with optional early stopping
//! - **Explicit failure modes**: invalid configurations, dimension mismatches,
//!   empty clusters and phase deadlines surface as [`KMeansError`] values
//!
//! ## Example
//!
//! ```rust
//! use lloyd_kmeans::{KMeans, SeededIndexSource};
//! use ndarray::Array2;
//! use ndarray_rand::RandomExt;
//! use ndarray_rand::rand_distr::Uniform;
//!
//! let data = Array2::random((1000, 8), Uniform::new(-1.0, 1.0));
//!
//! let mut kmeans = KMeans::new(data.clone(), 10, SeededIndexSource::new(42)).unwrap();
//! kmeans.fit(25).unwrap();
//!
//! let groups = kmeans.assign_points(&data.view()).unwrap();
//! assert!(groups.keys().all(|&cluster| cluster < 10));
//! ```
//!
//! ## Custom Configuration
//!
//! ```rust
//! use lloyd_kmeans::{AssignmentMode, EmptyClusterPolicy, KMeans, KMeansConfig};
//! use ndarray::Array2;
//! use ndarray_rand::RandomExt;
//! use ndarray_rand::rand_distr::Uniform;
//! use std::time::Duration;
//!
//! let data = Array2::random((5000, 4), Uniform::new(-1.0, 1.0));
//!
//! let config = KMeansConfig::new(20)
//!     .with_max_concurrency(4)
//!     .with_tol(1e-6)
//!     .with_phase_timeout(Duration::from_secs(30))
//!     .with_empty_cluster(EmptyClusterPolicy::Reseed)
//!     .with_assignment_mode(AssignmentMode::Locked);
//!
//! let mut next = 0;
//! let sequential = move |_bound: usize| {
//!     let index = next;
//!     next += 1;
//!     index
//! };
//!
//! let mut kmeans = KMeans::with_config(data, config, sequential).unwrap();
//! kmeans.fit(20).unwrap();
//! ```

mod algorithm;
mod config;
mod dataset;
mod distance;
mod error;
mod kmeans;
mod random;
mod shared;

pub use config::{AssignmentMode, EmptyClusterPolicy, KMeansConfig};
pub use dataset::{load_csv, matrix_from_rows};
pub use distance::{compute_centroid_shift, euclidean_distance, index_of_min, nearest_centroid};
pub use error::{KMeansError, Result};
pub use kmeans::KMeans;
pub use random::{IndexSource, SeededIndexSource};
pub use shared::SharedMap;
