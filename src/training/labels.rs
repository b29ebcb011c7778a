//! Class labels of classification targets

use crate::error::{InsightError, Result};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A class as it appears in the target column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
    Number(f64),
    Text(String),
}

impl ClassLabel {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ClassLabel::Number(v) => Some(*v),
            ClassLabel::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClassLabel::Text(s) => Some(s),
            ClassLabel::Number(_) => None,
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Number(v) => write!(f, "{}", v),
            ClassLabel::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ClassLabel {
    fn from(v: f64) -> Self {
        ClassLabel::Number(v)
    }
}

impl From<&str> for ClassLabel {
    fn from(s: &str) -> Self {
        ClassLabel::Text(s.to_string())
    }
}

/// Classification target ready for the forest.
///
/// Numeric targets keep their values. Text, boolean and categorical targets
/// become indices into `labels`, which are sorted and distinct.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTarget {
    pub values: Array1<f64>,
    pub labels: Vec<ClassLabel>,
}

/// Encode a training target of any dtype
pub fn encode_target(series: &Series) -> Result<EncodedTarget> {
    reject_nulls(series)?;

    if let Some(values) = numeric_values(series)? {
        let mut classes = values.clone();
        classes.sort_by(f64::total_cmp);
        classes.dedup();
        return Ok(EncodedTarget {
            values: Array1::from_vec(values),
            labels: classes.into_iter().map(ClassLabel::Number).collect(),
        });
    }

    let text = text_values(series)?;
    let mut classes = text.clone();
    classes.sort();
    classes.dedup();
    let values = text
        .iter()
        .map(|t| classes.partition_point(|c| c < t) as f64)
        .collect();

    Ok(EncodedTarget {
        values,
        labels: classes.into_iter().map(ClassLabel::Text).collect(),
    })
}

/// Encode held-out targets against the labels of a training target.
///
/// Text labels not seen in training map to `labels.len()`, an index no
/// probability column has.
pub fn encode_with_labels(series: &Series, labels: &[ClassLabel]) -> Result<Array1<f64>> {
    reject_nulls(series)?;
    let numeric_labels = labels.iter().all(|l| matches!(l, ClassLabel::Number(_)));

    match numeric_values(series)? {
        Some(values) if numeric_labels => Ok(Array1::from_vec(values)),
        None if !numeric_labels => Ok(text_values(series)?
            .iter()
            .map(|t| {
                labels
                    .iter()
                    .position(|l| l.as_str() == Some(t.as_str()))
                    .unwrap_or(labels.len()) as f64
            })
            .collect()),
        _ => Err(InsightError::DataError(format!(
            "target '{}' does not match the kind of the training labels",
            series.name()
        ))),
    }
}

fn reject_nulls(series: &Series) -> Result<()> {
    if series.null_count() > 0 {
        return Err(InsightError::DataError(format!(
            "column '{}' contains null values",
            series.name()
        )));
    }
    Ok(())
}

/// Values of a numeric column; `None` when the column holds labels
fn numeric_values(series: &Series) -> Result<Option<Vec<f64>>> {
    if matches!(series.dtype(), DataType::String | DataType::Boolean) {
        return Ok(None);
    }
    match series.cast(&DataType::Float64) {
        Ok(cast) if cast.null_count() == series.null_count() => {
            Ok(Some(cast.f64()?.into_no_null_iter().collect()))
        }
        _ => Ok(None),
    }
}

fn text_values(series: &Series) -> Result<Vec<String>> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast.str()?.into_no_null_iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_target_keeps_values() {
        let s = Series::new("y".into(), &[7i32, 3, 7, 3]);
        let enc = encode_target(&s).unwrap();
        assert_eq!(enc.values.to_vec(), vec![7.0, 3.0, 7.0, 3.0]);
        assert_eq!(enc.labels, vec![ClassLabel::Number(3.0), ClassLabel::Number(7.0)]);
    }

    #[test]
    fn test_text_target_becomes_indices() {
        let s = Series::new("y".into(), &["yes", "no", "maybe", "no"]);
        let enc = encode_target(&s).unwrap();
        assert_eq!(enc.values.to_vec(), vec![2.0, 1.0, 0.0, 1.0]);
        assert_eq!(enc.labels, vec!["maybe".into(), "no".into(), ClassLabel::from("yes")]);
    }

    #[test]
    fn test_boolean_target_is_text() {
        let s = Series::new("y".into(), &[true, false, true]);
        let enc = encode_target(&s).unwrap();
        assert_eq!(enc.labels, vec![ClassLabel::from("false"), ClassLabel::from("true")]);
        assert_eq!(enc.values.to_vec(), vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_null_target_rejected() {
        let s = Series::new("y".into(), &[Some("a"), None]);
        assert!(matches!(encode_target(&s), Err(InsightError::DataError(_))));
    }

    #[test]
    fn test_validation_encoding() {
        let labels = vec![ClassLabel::from("no"), ClassLabel::from("yes")];
        let s = Series::new("y".into(), &["yes", "unknown", "no"]);
        assert_eq!(encode_with_labels(&s, &labels).unwrap().to_vec(), vec![1.0, 2.0, 0.0]);

        let numeric = Series::new("y".into(), &[1.0, 0.0]);
        assert!(encode_with_labels(&numeric, &labels).is_err());
    }
}
