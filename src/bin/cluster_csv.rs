//! Cluster the points of a CSV file and print the resulting groups.
//!
//! The first row is treated as a header. Columns 1 and 2 of every record are
//! used as point components unless `--columns` selects others.
//!
//! Usage: `cluster-csv <data.csv> <k> <iterations> [concurrency] [seed] [--columns 1,2]`
//!
//! Set `RUST_LOG=debug` to follow the individual iterations.

use lloyd_kmeans::{load_csv, KMeans, KMeansConfig, SeededIndexSource};
use std::env;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_COLUMNS: [usize; 2] = [1, 2];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = env::args().collect();

    let mut columns: Vec<usize> = DEFAULT_COLUMNS.to_vec();
    if let Some(pos) = args.iter().position(|a| a == "--columns") {
        let value = args.get(pos + 1).ok_or("--columns needs a value such as 1,2")?;
        columns = value
            .split(',')
            .map(|c| c.trim().parse::<usize>())
            .collect::<Result<_, _>>()?;
        args.drain(pos..pos + 2);
    }

    if args.len() < 4 || args.len() > 6 {
        eprintln!(
            "Usage: {} <data.csv> <k> <iterations> [concurrency] [seed] [--columns 1,2]",
            args[0]
        );
        std::process::exit(1);
    }

    let input_path = &args[1];
    let k: usize = args[2].parse()?;
    let iterations: usize = args[3].parse()?;
    let mut config = KMeansConfig::new(k);
    if let Some(concurrency) = args.get(4) {
        config = config.with_max_concurrency(concurrency.parse()?);
    }
    let seed: u64 = match args.get(5) {
        Some(seed) => seed.parse()?,
        None => SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs(),
    };

    let data = load_csv(input_path, Some(columns.as_slice()))?;
    eprintln!(
        "Loaded data: {} samples x {} features",
        data.nrows(),
        data.ncols()
    );
    eprintln!(
        "Running k-means with k={}, iterations={}, concurrency={}, seed={}",
        k, iterations, config.max_concurrency, seed
    );

    let mut kmeans = KMeans::with_config(data, config, SeededIndexSource::new(seed))?;
    kmeans.fit(iterations)?;

    println!("Centroids:");
    for (i, centroid) in kmeans.centroids().outer_iter().enumerate() {
        println!("  Cluster {}: {}", i, format_point(centroid.iter()));
    }

    let groups = kmeans.assign_points(&kmeans.data().view())?;
    for (cluster, points) in &groups {
        println!("Cluster {} ({} points):", cluster, points.len());
        for point in points {
            println!("  {}", format_point(point.iter()));
        }
    }

    Ok(())
}

fn format_point<'a>(values: impl Iterator<Item = &'a f64>) -> String {
    let parts: Vec<String> = values.map(|v| format!("{:.4}", v)).collect();
    format!("({})", parts.join(", "))
}
