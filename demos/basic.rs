//! Basic example demonstrating lloyd-kmeans usage
//!
//! Run with: cargo run --example basic --release

use lloyd_kmeans::{KMeans, KMeansConfig, SeededIndexSource};
use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

fn main() {
    println!("=== lloyd-kmeans example ===\n");

    // 3 clusters in 2D
    let n_samples = 300;
    let n_features = 2;
    let n_clusters = 3;

    println!("Generating {} samples with {} features...", n_samples, n_features);

    let mut data = Array2::<f64>::zeros((n_samples, n_features));
    let centers = [[-5.0, -5.0], [0.0, 5.0], [5.0, -5.0]];

    for i in 0..n_samples {
        let cluster_idx = i % 3;
        let noise = Array2::random((1, n_features), Uniform::new(-1.0, 1.0));
        data[[i, 0]] = centers[cluster_idx][0] + noise[[0, 0]];
        data[[i, 1]] = centers[cluster_idx][1] + noise[[0, 1]];
    }

    println!("True cluster centers:");
    for (i, center) in centers.iter().enumerate() {
        println!("  Cluster {}: ({:.2}, {:.2})", i, center[0], center[1]);
    }
    println!();

    let config = KMeansConfig::new(n_clusters).with_max_concurrency(4);
    println!("Running k-means with k={}...\n", n_clusters);

    let mut kmeans = KMeans::with_config(data.clone(), config, SeededIndexSource::new(42))
        .expect("Invalid configuration");
    kmeans.fit(10).expect("Fit failed");

    println!("Learned centroids:");
    for (i, centroid) in kmeans.centroids().outer_iter().enumerate() {
        println!("  Centroid {}: ({:.4}, {:.4})", i, centroid[0], centroid[1]);
    }
    println!();

    let groups = kmeans.assign_points(&data.view()).expect("Export failed");

    println!("Cluster distribution:");
    for (cluster, points) in &groups {
        println!(
            "  Cluster {}: {} samples ({:.1}%)",
            cluster,
            points.len(),
            (points.len() as f64 / n_samples as f64) * 100.0
        );
    }

    println!("\nInertia: {:.4}", kmeans.inertia());
    println!("\n=== Done! ===");
}
