//! Conversions between polars frames and ndarray buffers

use crate::error::{InsightError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Extract every column of a feature table into a row-major `Array2<f64>`.
///
/// Columns are cast to `Float64`. Null values are rejected since the tree
/// builder has no missing-value handling.
pub fn features_to_array2(df: &DataFrame) -> Result<Array2<f64>> {
    let names = column_names(df);
    let n_rows = df.height();

    let col_data: Vec<Vec<f64>> = names
        .iter()
        .map(|name| {
            column_values(df, name)?
                .into_iter()
                .map(|v| v.ok_or_else(|| null_error(name)))
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, names.len()), |(r, c)| col_refs[c][r]))
}

/// Convert a target series into an `Array1<f64>`.
pub fn series_to_array1(series: &Series) -> Result<Array1<f64>> {
    let name = series.name().to_string();
    let values = series.cast(&DataType::Float64)?;
    values
        .f64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| null_error(&name)))
        .collect::<Result<Vec<f64>>>()
        .map(Array1::from_vec)
}

/// Values of a single column as `Float64`, keeping nulls.
pub fn column_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| InsightError::FeatureNotFound(name.to_string()))?;
    let values = column.cast(&DataType::Float64)?;
    Ok(values.f64()?.into_iter().collect())
}

/// Column names of a frame, in order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

fn null_error(name: &str) -> InsightError {
    InsightError::DataError(format!("column '{}' contains null values", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_features_to_array2_is_row_major() {
        let df = df!(
            "a" => &[1.0, 2.0, 3.0],
            "b" => &[10i32, 20, 30]
        )
        .unwrap();

        let x = features_to_array2(&df).unwrap();
        assert_eq!(x.dim(), (3, 2));
        assert_eq!(x[[1, 0]], 2.0);
        assert_eq!(x[[2, 1]], 30.0);
    }

    #[test]
    fn test_nulls_rejected_for_training() {
        let df = df!("a" => &[Some(1.0), None, Some(3.0)]).unwrap();
        let err = features_to_array2(&df).unwrap_err();
        assert!(matches!(err, InsightError::DataError(_)));
    }

    #[test]
    fn test_column_values_keeps_nulls() {
        let df = df!("a" => &[Some(1.0), None]).unwrap();
        let values = column_values(&df, "a").unwrap();
        assert_eq!(values, vec![Some(1.0), None]);
    }

    #[test]
    fn test_missing_column() {
        let df = df!("a" => &[1.0]).unwrap();
        let err = column_values(&df, "b").unwrap_err();
        assert!(matches!(err, InsightError::FeatureNotFound(name) if name == "b"));
    }

    #[test]
    fn test_series_to_array1() {
        let s = Series::new("y".into(), &[0i64, 1, 1]);
        let y = series_to_array1(&s).unwrap();
        assert_eq!(y.to_vec(), vec![0.0, 1.0, 1.0]);
    }
}
