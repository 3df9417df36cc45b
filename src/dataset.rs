//! Dataset construction and loading.
//!
//! The engine works on a rectangular `Array2<f64>` (rows are points). These
//! helpers build one from row vectors or from a CSV file and reject ragged
//! input up front.

use crate::error::{KMeansError, Result};
use csv::ReaderBuilder;
use ndarray::Array2;
use std::path::Path;

/// Build a dataset matrix from row vectors.
///
/// Every row must have the length of the first one.
pub fn matrix_from_rows(rows: &[Vec<f64>]) -> Result<Array2<f64>> {
    let n_features = match rows.first() {
        Some(first) if !first.is_empty() => first.len(),
        _ => return Err(KMeansError::EmptyDataset),
    };

    let mut flat = Vec::with_capacity(rows.len() * n_features);
    for row in rows {
        if row.len() != n_features {
            return Err(KMeansError::DimensionMismatch {
                expected: n_features,
                found: row.len(),
            });
        }
        flat.extend_from_slice(row);
    }

    Array2::from_shape_vec((rows.len(), n_features), flat).map_err(|e| {
        KMeansError::InvalidConfig(format!("Failed to shape dataset: {}", e))
    })
}

/// Load a dataset from a CSV file with a header row.
///
/// `columns` selects which fields of each record become point components, in
/// the given order. With `None` every field is used. Blank lines are skipped.
pub fn load_csv<P: AsRef<Path>>(path: P, columns: Option<&[usize]>) -> Result<Array2<f64>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;

    let mut rows: Vec<Vec<f64>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let row = match columns {
            Some(columns) => columns
                .iter()
                .map(|&col| {
                    let field = record.get(col).ok_or(KMeansError::DimensionMismatch {
                        expected: col + 1,
                        found: record.len(),
                    })?;
                    parse_field(field)
                })
                .collect::<Result<Vec<f64>>>()?,
            None => record.iter().map(parse_field).collect::<Result<Vec<f64>>>()?,
        };
        rows.push(row);
    }

    tracing::debug!(
        path = %path.as_ref().display(),
        rows = rows.len(),
        "loaded csv dataset"
    );

    matrix_from_rows(&rows)
}

fn parse_field(field: &str) -> Result<f64> {
    field.parse().map_err(|source| KMeansError::ParseFloat {
        value: field.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;

    #[test]
    fn test_matrix_from_rows() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let data = matrix_from_rows(&rows).unwrap();
        assert_eq!(data, array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
    }

    #[test]
    fn test_matrix_from_ragged_rows() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            matrix_from_rows(&rows),
            Err(KMeansError::DimensionMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_matrix_from_empty_rows() {
        assert!(matches!(
            matrix_from_rows(&[]),
            Err(KMeansError::EmptyDataset)
        ));
        assert!(matches!(
            matrix_from_rows(&[vec![], vec![]]),
            Err(KMeansError::EmptyDataset)
        ));
    }

    #[test]
    fn test_load_csv_selected_columns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,x1,x2,label").unwrap();
        writeln!(file, "0,5.1,3.5,setosa").unwrap();
        writeln!(file, "1,4.9,3.0,setosa").unwrap();
        writeln!(file, "2,6.3,3.3,virginica").unwrap();
        file.flush().unwrap();

        let data = load_csv(file.path(), Some(&[1, 2][..])).unwrap();
        assert_eq!(data, array![[5.1, 3.5], [4.9, 3.0], [6.3, 3.3]]);
    }

    #[test]
    fn test_load_csv_all_columns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        writeln!(file, "1,2").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "3,4").unwrap();
        file.flush().unwrap();

        let data = load_csv(file.path(), None).unwrap();
        assert_eq!(data, array![[1.0, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn test_load_csv_bad_number() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        writeln!(file, "1,oops").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            load_csv(file.path(), None),
            Err(KMeansError::ParseFloat { .. })
        ));
    }

    #[test]
    fn test_load_csv_missing_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        writeln!(file, "1,2").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            load_csv(file.path(), Some(&[0, 5][..])),
            Err(KMeansError::DimensionMismatch { .. })
        ));
    }
}
