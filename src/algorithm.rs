use crate::config::{AssignmentMode, EmptyClusterPolicy};
use crate::distance::nearest_centroid;
use crate::error::{KMeansError, Result};
use crate::random::IndexSource;
use crate::shared::SharedMap;
use ndarray::{Array1, Array2, ArrayView2, ArrayViewMut1, Zip};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Rejected draws tolerated while looking for one new distinct centroid index
pub(crate) const MAX_DRAWS_PER_CENTROID: usize = 10_000;

/// Ask the randomness capability for an index below `bound`, checking its answer.
fn draw_index(source: &mut dyn IndexSource, bound: usize) -> Result<usize> {
    let index = source.next_index(bound);
    if index >= bound {
        return Err(KMeansError::InvalidConfig(format!(
            "Random index {} is out of range for {} points",
            index, bound
        )));
    }
    Ok(index)
}

/// Choose `k` pairwise-distinct point indices.
///
/// Indices come from `source` in the order it produces them; an index that was
/// already chosen is discarded and another one drawn.
pub(crate) fn select_initial_indices(
    n_samples: usize,
    k: usize,
    source: &mut dyn IndexSource,
) -> Result<Vec<usize>> {
    let mut selected: Vec<usize> = Vec::with_capacity(k);

    for _ in 0..k {
        let mut draws = 0;
        loop {
            let index = draw_index(source, n_samples)?;
            if !selected.contains(&index) {
                selected.push(index);
                break;
            }

            draws += 1;
            if draws >= MAX_DRAWS_PER_CENTROID {
                return Err(KMeansError::InvalidConfig(format!(
                    "Random source repeated already chosen indices {} times while picking centroid {}",
                    draws,
                    selected.len()
                )));
            }
        }
    }

    Ok(selected)
}

/// Initialize centroids as copies of `k` distinct data points
pub(crate) fn initialize_centroids(
    data: &ArrayView2<f64>,
    k: usize,
    source: &mut dyn IndexSource,
) -> Result<Array2<f64>> {
    let indices = select_initial_indices(data.nrows(), k, source)?;
    tracing::debug!(?indices, "selected initial centroids");

    let mut centroids = Array2::zeros((k, data.ncols()));
    for (centroid_idx, &data_idx) in indices.iter().enumerate() {
        centroids.row_mut(centroid_idx).assign(&data.row(data_idx));
    }

    Ok(centroids)
}

/// Run one assignment phase on `pool`.
///
/// The pool size bounds how many points are processed at once; `install`
/// returns only after every point has been handled, so the returned labels are
/// complete. Returns `Ok(None)` when `deadline` passed before the phase
/// finished.
pub(crate) fn assign_labels(
    pool: &ThreadPool,
    data: &ArrayView2<f64>,
    centroids: &ArrayView2<f64>,
    mode: AssignmentMode,
    deadline: Option<Instant>,
) -> Result<Option<Vec<usize>>> {
    let n_samples = data.nrows();
    let expired = AtomicBool::new(false);

    tracing::trace!(
        n_samples,
        k = centroids.nrows(),
        threads = pool.current_num_threads(),
        ?mode,
        "assignment phase"
    );

    let labels = match mode {
        AssignmentMode::Slots => {
            let mut labels = vec![0usize; n_samples];
            pool.install(|| {
                Zip::from(ArrayViewMut1::from(&mut labels[..]))
                    .and(data.rows())
                    .par_for_each(|label, point| {
                        if past_deadline(deadline, &expired) {
                            return;
                        }
                        *label = nearest_centroid(&point, centroids);
                    });
            });
            labels
        }
        AssignmentMode::Locked => {
            let shared = SharedMap::with_capacity(n_samples);
            pool.install(|| {
                (0..n_samples).into_par_iter().for_each(|i| {
                    if past_deadline(deadline, &expired) {
                        return;
                    }
                    shared.set(i, nearest_centroid(&data.row(i), centroids));
                });
            });

            if expired.load(Ordering::Acquire) {
                return Ok(None);
            }
            labels_from_map(shared.into_inner(), n_samples)?
        }
    };

    if expired.load(Ordering::Acquire) {
        return Ok(None);
    }

    Ok(Some(labels))
}

/// Flatten a point-index to cluster map into a label vector.
///
/// The map must hold exactly one entry for every index in `0..n_samples`.
fn labels_from_map(map: HashMap<usize, usize>, n_samples: usize) -> Result<Vec<usize>> {
    let mut labels = vec![0usize; n_samples];
    let mut found = 0;
    for (i, cluster) in map {
        if let Some(label) = labels.get_mut(i) {
            *label = cluster;
            found += 1;
        }
    }

    // Keys are unique, so n_samples in-range keys cover every point.
    if found != n_samples {
        return Err(KMeansError::IncompleteAssignment {
            expected: n_samples,
            found,
        });
    }

    Ok(labels)
}

fn past_deadline(deadline: Option<Instant>, expired: &AtomicBool) -> bool {
    if expired.load(Ordering::Relaxed) {
        return true;
    }
    match deadline {
        Some(deadline) if Instant::now() >= deadline => {
            expired.store(true, Ordering::Release);
            true
        }
        _ => false,
    }
}

/// Move every centroid to the mean of its assigned points.
///
/// Clusters without points keep their current centroid; their indices are
/// returned so the caller can apply the empty-cluster policy.
pub(crate) fn update_centroids(
    data: &ArrayView2<f64>,
    labels: &[usize],
    centroids: &mut Array2<f64>,
) -> Vec<usize> {
    let k = centroids.nrows();
    let n_features = centroids.ncols();

    // Accumulators for new centroids
    let mut cluster_sums: Array2<f64> = Array2::zeros((k, n_features));
    let mut cluster_counts: Array1<f64> = Array1::zeros(k);

    for (point, &cluster_idx) in data.outer_iter().zip(labels) {
        cluster_counts[cluster_idx] += 1.0;
        cluster_sums.row_mut(cluster_idx).scaled_add(1.0, &point);
    }

    let mut empty_clusters = Vec::new();
    for cluster_idx in 0..k {
        let count = cluster_counts[cluster_idx];
        if count > 0.0 {
            let mean = &cluster_sums.row(cluster_idx) / count;
            centroids.row_mut(cluster_idx).assign(&mean);
        } else {
            empty_clusters.push(cluster_idx);
        }
    }

    empty_clusters
}

/// Apply `policy` to the clusters that received no points in `iteration`.
pub(crate) fn resolve_empty_clusters(
    data: &ArrayView2<f64>,
    centroids: &mut Array2<f64>,
    empty_clusters: &[usize],
    policy: EmptyClusterPolicy,
    source: &mut dyn IndexSource,
    iteration: usize,
) -> Result<()> {
    for &cluster in empty_clusters {
        match policy {
            EmptyClusterPolicy::KeepPrevious => {
                tracing::warn!(cluster, iteration, "empty cluster keeps its previous centroid");
            }
            EmptyClusterPolicy::Reseed => {
                let data_idx = draw_index(source, data.nrows())?;
                centroids.row_mut(cluster).assign(&data.row(data_idx));
                tracing::warn!(cluster, iteration, data_idx, "empty cluster reseeded");
            }
            EmptyClusterPolicy::Error => {
                return Err(KMeansError::DegenerateCluster { cluster, iteration });
            }
        }
    }

    Ok(())
}
