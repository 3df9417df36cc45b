use crate::algorithm::{
    assign_labels, initialize_centroids, resolve_empty_clusters, update_centroids,
};
use crate::config::KMeansConfig;
use crate::distance::{compute_centroid_shift, nearest_centroid, squared_distance};
use crate::error::{KMeansError, Result};
use crate::random::IndexSource;
use ndarray::{Array1, Array2, ArrayView2};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Lloyd's k-means over a fixed dataset.
///
/// Construction validates the inputs and picks the initial centroids with the
/// injected [`IndexSource`]. Each [`fit`](KMeans::fit) call then alternates a
/// parallel assignment phase and a centroid update for the requested number
/// of iterations.
///
/// # Example
///
/// ```
/// use lloyd_kmeans::{KMeans, SeededIndexSource};
/// use ndarray::array;
///
/// let data = array![[0.0, 0.0], [0.5, 0.0], [10.0, 10.0], [10.5, 10.0]];
///
/// let mut kmeans = KMeans::new(data.clone(), 2, SeededIndexSource::new(42)).unwrap();
/// kmeans.fit(10).unwrap();
///
/// let groups = kmeans.assign_points(&data.view()).unwrap();
/// assert_eq!(groups.values().map(Vec::len).sum::<usize>(), 4);
/// ```
pub struct KMeans {
    /// Engine configuration
    config: KMeansConfig,

    /// Training points, shared read-only with the assignment workers
    data: Arc<Array2<f64>>,

    /// Current centroids, shape (k, n_features)
    centroids: Array2<f64>,

    /// Cluster index of every training point after the last assignment phase
    assignment: Vec<usize>,

    /// Injected randomness capability
    source: Box<dyn IndexSource>,

    /// Workers of the assignment phase; their count is the concurrency limit
    pool: ThreadPool,

    /// Iterations executed by the last `fit` call
    n_iterations: usize,
}

impl KMeans {
    /// Create an engine with `k` clusters and default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The dataset is empty
    /// - `k` is 0 or larger than the number of points
    /// - The random source yields an index outside the dataset
    pub fn new(
        data: impl Into<Arc<Array2<f64>>>,
        k: usize,
        source: impl IndexSource + 'static,
    ) -> Result<Self> {
        Self::with_config(data, KMeansConfig::new(k), source)
    }

    /// Create an engine with a custom configuration.
    pub fn with_config(
        data: impl Into<Arc<Array2<f64>>>,
        config: KMeansConfig,
        source: impl IndexSource + 'static,
    ) -> Result<Self> {
        let data = data.into();
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(KMeansError::EmptyDataset);
        }
        config.validate(data.nrows())?;

        let mut source: Box<dyn IndexSource> = Box::new(source);
        let pool = build_pool(config.max_concurrency)?;
        let centroids = initialize_centroids(&data.view(), config.k, source.as_mut())?;

        tracing::debug!(
            n_samples = data.nrows(),
            n_features = data.ncols(),
            k = config.k,
            max_concurrency = config.max_concurrency,
            "k-means engine initialized"
        );

        Ok(Self {
            config,
            data,
            centroids,
            assignment: Vec::new(),
            source,
            pool,
            n_iterations: 0,
        })
    }

    /// Run `max_iterations` rounds of assignment followed by centroid update.
    ///
    /// All rounds run unless a non-negative `tol` is configured and the
    /// centroids move less than `tol` in some round. `fit(0)` does nothing.
    /// Calling `fit` again continues from the current centroids.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An assignment phase misses the configured `phase_timeout`
    /// - A cluster becomes empty under [`EmptyClusterPolicy::Error`](crate::EmptyClusterPolicy::Error)
    /// - Reseeding draws an index outside the dataset
    ///
    /// On error the rounds completed so far stay applied; the failing round
    /// changes neither the centroids nor the assignment.
    pub fn fit(&mut self, max_iterations: usize) -> Result<()> {
        let fit_start = Instant::now();
        self.n_iterations = 0;

        for iteration in 1..=max_iterations {
            let iter_start = Instant::now();
            let deadline = self.config.phase_timeout.map(|timeout| iter_start + timeout);

            let labels = assign_labels(
                &self.pool,
                &self.data.view(),
                &self.centroids.view(),
                self.config.assignment_mode,
                deadline,
            )?
            .ok_or_else(|| KMeansError::ConcurrencyTimeout {
                iteration,
                timeout: self.config.phase_timeout.unwrap_or_default(),
            })?;

            let mut centroids = self.centroids.clone();
            let empty_clusters = update_centroids(&self.data.view(), &labels, &mut centroids);

            if !empty_clusters.is_empty() {
                resolve_empty_clusters(
                    &self.data.view(),
                    &mut centroids,
                    &empty_clusters,
                    self.config.empty_cluster,
                    self.source.as_mut(),
                    iteration,
                )?;
            }

            let shift = compute_centroid_shift(&self.centroids.view(), &centroids.view());
            self.centroids = centroids;
            self.assignment = labels;
            self.n_iterations = iteration;

            tracing::debug!(
                iteration,
                max_iterations,
                shift,
                empty_clusters = empty_clusters.len(),
                elapsed_s = iter_start.elapsed().as_secs_f64(),
                "k-means iteration"
            );

            if self.config.tol >= 0.0 && shift < self.config.tol {
                tracing::info!(iteration, shift, tol = self.config.tol, "converged");
                break;
            }
        }

        tracing::info!(
            iterations = self.n_iterations,
            elapsed_s = fit_start.elapsed().as_secs_f64(),
            "fit complete"
        );

        Ok(())
    }

    /// Group `points` by nearest centroid.
    ///
    /// Runs on the calling thread. Each cluster's points keep their input
    /// order; clusters that receive no point are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns [`KMeansError::DimensionMismatch`] if `points` does not have
    /// the dimension of the training data.
    pub fn assign_points(
        &self,
        points: &ArrayView2<f64>,
    ) -> Result<BTreeMap<usize, Vec<Array1<f64>>>> {
        self.check_dimensions(points)?;

        let mut groups: BTreeMap<usize, Vec<Array1<f64>>> = BTreeMap::new();
        for point in points.outer_iter() {
            let cluster = nearest_centroid(&point, &self.centroids.view());
            groups.entry(cluster).or_default().push(point.to_owned());
        }

        Ok(groups)
    }

    /// Nearest-centroid index of every row of `points`.
    pub fn predict(&self, points: &ArrayView2<f64>) -> Result<Vec<usize>> {
        self.check_dimensions(points)?;

        Ok(points
            .outer_iter()
            .map(|point| nearest_centroid(&point, &self.centroids.view()))
            .collect())
    }

    /// Sum of squared distances from each training point to its nearest centroid.
    pub fn inertia(&self) -> f64 {
        self.data
            .outer_iter()
            .map(|point| {
                let cluster = nearest_centroid(&point, &self.centroids.view());
                squared_distance(&point, &self.centroids.row(cluster))
            })
            .sum()
    }

    /// Number of training points in each cluster after the last assignment phase.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.config.k];
        for &cluster in &self.assignment {
            sizes[cluster] += 1;
        }
        sizes
    }

    /// Change the concurrency limit of later assignment phases.
    pub fn set_max_concurrency(&mut self, max_concurrency: usize) -> Result<()> {
        if max_concurrency == 0 {
            return Err(KMeansError::InvalidConfig(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }

        self.pool = build_pool(max_concurrency)?;
        self.config.max_concurrency = max_concurrency;
        Ok(())
    }

    /// Get the current centroids, shape (k, n_features).
    pub fn centroids(&self) -> &Array2<f64> {
        &self.centroids
    }

    /// Cluster index per training point; empty before the first iteration.
    pub fn assignment(&self) -> &[usize] {
        &self.assignment
    }

    /// Get the training data.
    pub fn data(&self) -> &Arc<Array2<f64>> {
        &self.data
    }

    /// Get the number of clusters.
    pub fn k(&self) -> usize {
        self.config.k
    }

    /// Get the number of features (dimensions).
    pub fn d(&self) -> usize {
        self.data.ncols()
    }

    /// Iterations executed by the last `fit` call.
    pub fn n_iterations(&self) -> usize {
        self.n_iterations
    }

    /// Get the configuration.
    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    fn check_dimensions(&self, points: &ArrayView2<f64>) -> Result<()> {
        if points.ncols() != self.d() {
            return Err(KMeansError::DimensionMismatch {
                expected: self.d(),
                found: points.ncols(),
            });
        }
        Ok(())
    }
}

fn build_pool(num_threads: usize) -> Result<ThreadPool> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("kmeans-assign-{}", i))
        .build()?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssignmentMode, EmptyClusterPolicy};
    use crate::random::SeededIndexSource;
    use approx::assert_relative_eq;
    use ndarray::array;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counter() -> impl FnMut(usize) -> usize + Send {
        let mut next = 0;
        move |_| {
            let out = next;
            next += 1;
            out
        }
    }

    #[test]
    fn test_kmeans_new() {
        let data = Array2::random((50, 4), Uniform::new(-1.0, 1.0));
        let kmeans = KMeans::new(data, 3, SeededIndexSource::new(1)).unwrap();

        assert_eq!(kmeans.k(), 3);
        assert_eq!(kmeans.d(), 4);
        assert_eq!(kmeans.centroids().dim(), (3, 4));
        assert!(kmeans.assignment().is_empty());
        assert_eq!(kmeans.n_iterations(), 0);
    }

    #[test]
    fn test_kmeans_fit() {
        let data = Array2::random((200, 8), Uniform::new(-1.0, 1.0));
        let mut kmeans = KMeans::new(data, 5, SeededIndexSource::new(3)).unwrap();

        kmeans.fit(10).unwrap();

        assert_eq!(kmeans.n_iterations(), 10);
        assert_eq!(kmeans.assignment().len(), 200);
        assert!(kmeans.assignment().iter().all(|&c| c < 5));
        assert_eq!(kmeans.cluster_sizes().iter().sum::<usize>(), 200);
    }

    #[test]
    fn test_fit_zero_iterations() {
        let data = Array2::random((20, 2), Uniform::new(-1.0, 1.0));
        let mut kmeans = KMeans::new(data, 2, counter()).unwrap();
        let before = kmeans.centroids().clone();

        kmeans.fit(0).unwrap();

        assert_eq!(kmeans.centroids(), &before);
        assert!(kmeans.assignment().is_empty());
        assert_eq!(kmeans.n_iterations(), 0);
    }

    #[test]
    fn test_predict_matches_assignment() {
        let data = Array2::random((120, 3), Uniform::new(-1.0, 1.0));
        let mut kmeans = KMeans::new(data.clone(), 4, SeededIndexSource::new(9)).unwrap();
        kmeans.fit(5).unwrap();

        let labels = kmeans.predict(&data.view()).unwrap();
        assert_eq!(labels.len(), 120);
        assert!(labels.iter().all(|&c| c < 4));
    }

    #[test]
    fn test_assign_points_dimension_mismatch() {
        let data = Array2::random((30, 3), Uniform::new(-1.0, 1.0));
        let kmeans = KMeans::new(data, 2, counter()).unwrap();
        let other = Array2::random((5, 4), Uniform::new(-1.0, 1.0));

        assert!(matches!(
            kmeans.assign_points(&other.view()),
            Err(KMeansError::DimensionMismatch {
                expected: 3,
                found: 4
            })
        ));
        assert!(matches!(
            kmeans.predict(&other.view()),
            Err(KMeansError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_dataset() {
        let data: Array2<f64> = Array2::zeros((0, 3));
        assert!(matches!(
            KMeans::new(data, 1, counter()),
            Err(KMeansError::EmptyDataset)
        ));
    }

    #[test]
    fn test_set_max_concurrency() {
        let data = Array2::random((40, 2), Uniform::new(-1.0, 1.0));
        let mut kmeans = KMeans::new(data, 2, counter()).unwrap();

        kmeans.set_max_concurrency(3).unwrap();
        assert_eq!(kmeans.config().max_concurrency, 3);
        assert!(matches!(
            kmeans.set_max_concurrency(0),
            Err(KMeansError::InvalidConfig(_))
        ));
        kmeans.fit(2).unwrap();
    }

    /// Largest number of tasks seen running at once on the engine's pool.
    fn peak_parallelism(kmeans: &KMeans) -> usize {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        kmeans.pool.install(|| {
            (0..64).into_par_iter().for_each(|_| {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(2));
                active.fetch_sub(1, Ordering::SeqCst);
            });
        });

        peak.load(Ordering::SeqCst)
    }

    #[test]
    fn test_pool_size_follows_limit() {
        for limit in 1..=3 {
            let data = Array2::random((30, 2), Uniform::new(-1.0, 1.0));
            let config = KMeansConfig::new(2).with_max_concurrency(limit);
            let kmeans = KMeans::with_config(data, config, counter()).unwrap();

            assert_eq!(kmeans.pool.install(rayon::current_num_threads), limit);
            let peak = peak_parallelism(&kmeans);
            assert!(peak >= 1 && peak <= limit, "peak {} over limit {}", peak, limit);
        }
    }

    #[test]
    fn test_rebuilt_pool_follows_limit() {
        let data = Array2::random((30, 2), Uniform::new(-1.0, 1.0));
        let config = KMeansConfig::new(2).with_max_concurrency(3);
        let mut kmeans = KMeans::with_config(data, config, counter()).unwrap();

        for limit in [1, 2, 3] {
            kmeans.set_max_concurrency(limit).unwrap();
            assert_eq!(kmeans.pool.install(rayon::current_num_threads), limit);
            let peak = peak_parallelism(&kmeans);
            assert!(peak >= 1 && peak <= limit, "peak {} over limit {}", peak, limit);
            kmeans.fit(1).unwrap();
        }

        kmeans.set_max_concurrency(1).unwrap();
        assert_eq!(peak_parallelism(&kmeans), 1);
    }

    #[test]
    fn test_empty_cluster_policies() {
        // Point 2 duplicates point 0, so centroid 2 starts equal to centroid 0
        // and loses every tie to it.
        let data = array![[0.0, 0.0], [10.0, 10.0], [0.0, 0.0], [10.0, 11.0]];

        let config = KMeansConfig::new(3).with_empty_cluster(EmptyClusterPolicy::KeepPrevious);
        let mut kmeans = KMeans::with_config(data.clone(), config, counter()).unwrap();
        kmeans.fit(1).unwrap();
        assert_eq!(kmeans.cluster_sizes(), vec![2, 2, 0]);
        assert_eq!(kmeans.centroids().row(2), array![0.0, 0.0]);

        let config = KMeansConfig::new(3).with_empty_cluster(EmptyClusterPolicy::Error);
        let mut kmeans = KMeans::with_config(data.clone(), config, counter()).unwrap();
        assert!(matches!(
            kmeans.fit(1),
            Err(KMeansError::DegenerateCluster {
                cluster: 2,
                iteration: 1
            })
        ));

        let config = KMeansConfig::new(3).with_empty_cluster(EmptyClusterPolicy::Reseed);
        let mut kmeans = KMeans::with_config(data, config, counter()).unwrap();
        kmeans.fit(1).unwrap();
        // counter() handed out 0, 1, 2 during initialization, so the reseed draws 3
        assert_eq!(kmeans.centroids().row(2), array![10.0, 11.0]);
    }

    #[test]
    fn test_stuck_random_source() {
        let data = array![[0.0, 0.0], [0.0, 1.0], [10.0, 10.0]];
        // A constant source can never produce a second distinct index
        let result = KMeans::new(data, 2, |_: usize| 0usize);
        assert!(matches!(result, Err(KMeansError::InvalidConfig(_))));
    }

    #[test]
    fn test_convergence_tolerance_stops_early() {
        let data = array![[0.0, 0.0], [0.0, 1.0], [10.0, 10.0], [10.0, 11.0]];
        let config = KMeansConfig::new(2).with_tol(1e-9);
        let mut kmeans = KMeans::with_config(data, config, counter()).unwrap();
        kmeans.fit(50).unwrap();

        assert!(kmeans.n_iterations() < 50);
        assert_relative_eq!(kmeans.centroids()[[0, 1]], 0.5, epsilon = 1e-12);
        assert_relative_eq!(kmeans.centroids()[[1, 0]], 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_phase_timeout() {
        let data = Array2::random((5_000, 16), Uniform::new(-1.0, 1.0));
        let config = KMeansConfig::new(8).with_phase_timeout(Duration::from_nanos(1));
        let mut kmeans = KMeans::with_config(data, config, SeededIndexSource::new(5)).unwrap();

        assert!(matches!(
            kmeans.fit(3),
            Err(KMeansError::ConcurrencyTimeout { iteration: 1, .. })
        ));
    }

    #[test]
    fn test_locked_mode_fit() {
        let data = Array2::random((300, 4), Uniform::new(-1.0, 1.0));
        let config = KMeansConfig::new(4).with_assignment_mode(AssignmentMode::Locked);
        let mut locked = KMeans::with_config(data.clone(), config, SeededIndexSource::new(11)).unwrap();
        let mut slots = KMeans::new(data, 4, SeededIndexSource::new(11)).unwrap();

        locked.fit(5).unwrap();
        slots.fit(5).unwrap();

        assert_eq!(locked.assignment(), slots.assignment());
        assert_eq!(locked.centroids(), slots.centroids());
    }

    #[test]
    fn test_inertia_decreases() {
        let data = Array2::random((400, 2), Uniform::new(-1.0, 1.0));
        let mut kmeans = KMeans::new(data, 6, SeededIndexSource::new(2)).unwrap();

        let initial = kmeans.inertia();
        kmeans.fit(10).unwrap();
        assert!(kmeans.inertia() <= initial + 1e-9);
    }
}
