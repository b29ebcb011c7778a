//! Loss metrics used to score search trials

use ndarray::{Array1, Array2};

/// Probabilities are clipped to `[EPS, 1 - EPS]` before taking logs
const EPS: f64 = 1e-15;

/// Root mean squared error
pub fn rmse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    let mse: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / n;
    mse.sqrt()
}

/// Mean cross-entropy of true labels under predicted class probabilities.
///
/// `classes` gives the label of each probability column; labels missing from
/// `classes` are scored with the clipped floor probability.
pub fn cross_entropy(y_true: &Array1<f64>, proba: &Array2<f64>, classes: &[f64]) -> f64 {
    let n = y_true.len() as f64;
    y_true
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let p = classes
                .iter()
                .position(|c| c == label)
                .map_or(EPS, |j| proba[[i, j]]);
            -p.clamp(EPS, 1.0 - EPS).ln()
        })
        .sum::<f64>()
        / n
}
