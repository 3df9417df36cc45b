use crate::error::{KMeansError, Result};
use ndarray::{ArrayView1, ArrayView2, Zip};

/// Euclidean distance between two vectors of equal length
#[inline]
pub fn euclidean_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> Result<f64> {
    if a.len() != b.len() {
        return Err(KMeansError::DimensionMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }

    Ok(squared_distance(a, b).sqrt())
}

/// Squared Euclidean distance; callers guarantee equal lengths
#[inline]
pub(crate) fn squared_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    Zip::from(a).and(b).fold(0.0, |acc, &x, &y| {
        let d = x - y;
        acc + d * d
    })
}

/// Index of the smallest value, scanning left to right.
///
/// On exact ties the first minimum wins. Returns `None` for an empty slice.
pub fn index_of_min(values: &[f64]) -> Option<usize> {
    let mut iter = values.iter().enumerate();
    let (mut best_idx, mut best) = iter.next().map(|(i, &v)| (i, v))?;

    for (i, &value) in iter {
        if value < best {
            best = value;
            best_idx = i;
        }
    }

    Some(best_idx)
}

/// Find the centroid nearest to `point`.
///
/// The centroid rows are scanned in index order, so on equal distances the
/// lowest centroid index is returned. `point` must have as many components as
/// the centroids have columns.
pub fn nearest_centroid(point: &ArrayView1<f64>, centroids: &ArrayView2<f64>) -> usize {
    debug_assert_eq!(point.len(), centroids.ncols());

    let distances: Vec<f64> = centroids
        .outer_iter()
        .map(|centroid| squared_distance(point, &centroid).sqrt())
        .collect();

    index_of_min(&distances).unwrap_or(0)
}

/// Compute centroid shift (sum of L2 norms of centroid movements)
pub fn compute_centroid_shift(
    old_centroids: &ArrayView2<f64>,
    new_centroids: &ArrayView2<f64>,
) -> f64 {
    old_centroids
        .outer_iter()
        .zip(new_centroids.outer_iter())
        .map(|(old, new)| squared_distance(&old, &new).sqrt())
        .sum()
}
