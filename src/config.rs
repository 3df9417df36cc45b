use crate::error::{KMeansError, Result};
use std::num::NonZeroUsize;
use std::time::Duration;

/// What the centroid updater does with a cluster that received no points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyClusterPolicy {
    /// Leave the centroid where it was.
    #[default]
    KeepPrevious,
    /// Move the centroid onto a point drawn from the randomness capability.
    Reseed,
    /// Abort the fit with [`KMeansError::DegenerateCluster`].
    Error,
}

/// How the parallel assignment phase delivers its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignmentMode {
    /// Every point owns one slot of the output vector; no lock is taken.
    #[default]
    Slots,
    /// Every point writes into one mutex-protected map shared by the phase.
    Locked,
}

/// Configuration for the k-means engine
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    /// Number of clusters
    pub k: usize,

    /// Maximum number of points processed at the same time during the
    /// assignment phase. Defaults to the host's available parallelism.
    pub max_concurrency: usize,

    /// Convergence tolerance. When the total centroid shift of an iteration is
    /// below this threshold, `fit` stops early. Negative disables early stopping.
    pub tol: f64,

    /// Deadline for a single assignment phase. `None` waits forever.
    pub phase_timeout: Option<Duration>,

    /// Treatment of clusters left without points by an assignment phase
    pub empty_cluster: EmptyClusterPolicy,

    /// Result delivery of the assignment phase
    pub assignment_mode: AssignmentMode,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 8,
            max_concurrency: default_concurrency(),
            tol: -1.0,
            phase_timeout: None,
            empty_cluster: EmptyClusterPolicy::default(),
            assignment_mode: AssignmentMode::default(),
        }
    }
}

impl KMeansConfig {
    /// Create a new configuration with the specified number of clusters
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }

    /// Set the concurrency limit of the assignment phase
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the per-phase deadline
    pub fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout = Some(timeout);
        self
    }

    /// Set the empty-cluster policy
    pub fn with_empty_cluster(mut self, policy: EmptyClusterPolicy) -> Self {
        self.empty_cluster = policy;
        self
    }

    /// Set the assignment result delivery mode
    pub fn with_assignment_mode(mut self, mode: AssignmentMode) -> Self {
        self.assignment_mode = mode;
        self
    }

    /// Check the configuration against a dataset of `n_samples` points.
    pub(crate) fn validate(&self, n_samples: usize) -> Result<()> {
        if self.k == 0 {
            return Err(KMeansError::InvalidK(
                "k must be greater than 0".to_string(),
            ));
        }

        if n_samples < self.k {
            return Err(KMeansError::InsufficientData(format!(
                "Number of samples ({}) is less than k ({})",
                n_samples, self.k
            )));
        }

        if self.max_concurrency == 0 {
            return Err(KMeansError::InvalidConfig(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.phase_timeout == Some(Duration::ZERO) {
            return Err(KMeansError::InvalidConfig(
                "phase_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
