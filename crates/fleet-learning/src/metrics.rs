//! Scoring metrics for model selection.

use ndarray::Array1;

/// Classification accuracy: fraction of exact label matches.
///
/// Degenerate when the reference labels contain a single class; callers
/// must use [`mean_true_class_probability`] in that case.
pub fn accuracy(y_true: &Array1<u8>, y_pred: &Array1<u8>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Probability-based fallback score: the mean probability the model assigns
/// to each row's true class.
///
/// `proba_pos` is the predicted probability of class 1 per row. Unlike
/// accuracy this stays informative when the held-out split contains only
/// one class, and it still ranks better-calibrated candidates higher.
pub fn mean_true_class_probability(y_true: &Array1<u8>, proba_pos: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let total: f64 = y_true
        .iter()
        .zip(proba_pos.iter())
        .map(|(&t, &p)| if t == 1 { p } else { 1.0 - p })
        .sum();
    total / y_true.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_basic() {
        let y_true = Array1::from_vec(vec![0u8, 1, 1, 0]);
        let y_pred = Array1::from_vec(vec![0u8, 1, 0, 0]);
        assert_eq!(accuracy(&y_true, &y_pred), 0.75);
    }

    #[test]
    fn test_accuracy_empty() {
        let empty = Array1::from_vec(Vec::<u8>::new());
        assert_eq!(accuracy(&empty, &empty), 0.0);
    }

    #[test]
    fn test_mean_true_class_probability_perfect() {
        let y_true = Array1::from_vec(vec![1u8, 0]);
        let proba = Array1::from_vec(vec![1.0, 0.0]);
        assert_eq!(mean_true_class_probability(&y_true, &proba), 1.0);
    }

    #[test]
    fn test_mean_true_class_probability_single_class() {
        // All-positive reference: accuracy would be degenerate, the
        // probability score still discriminates.
        let y_true = Array1::from_vec(vec![1u8, 1, 1]);
        let confident = Array1::from_vec(vec![0.9, 0.8, 1.0]);
        let hedging = Array1::from_vec(vec![0.5, 0.5, 0.5]);

        let good = mean_true_class_probability(&y_true, &confident);
        let bad = mean_true_class_probability(&y_true, &hedging);
        assert!(good > bad);
        assert!((good - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_mean_true_class_probability_negative_class() {
        let y_true = Array1::from_vec(vec![0u8, 0]);
        let proba = Array1::from_vec(vec![0.2, 0.4]);
        // 1 - p for the negative class: (0.8 + 0.6) / 2
        assert!((mean_true_class_probability(&y_true, &proba) - 0.7).abs() < 1e-12);
    }
}
