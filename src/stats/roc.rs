//! Receiver operating characteristic of a binary label and a continuous score
//!
//! The score is used as threshold, from the highest to the lowest value.
//! Each distinct score value adds one point to the curve.
use crate::f64_from_usize;

/// A point of the ROC curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RocPoint {
    /// False positive rate
    pub fpr: f64,
    /// True positive rate
    pub tpr: f64,
    /// Score threshold, all values `>= threshold` are called positive
    pub threshold: f64,
}

/// Calculates the ROC curve
///
/// The curve starts at `(0, 0)` with an infinite threshold and ends at `(1, 1)`.
///
/// Returns `None` if `labels` does not contain both positive and negative values,
/// or if the lengths of `labels` and `scores` differ.
pub fn roc_curve(labels: &[bool], scores: &[f64]) -> Option<Vec<RocPoint>> {
    if labels.len() != scores.len() {
        return None;
    }
    let positives = labels.iter().filter(|l| **l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|a, b| scores[*b].total_cmp(&scores[*a]));

    let mut curve = Vec::with_capacity(order.len() + 1);
    curve.push(RocPoint {
        fpr: 0.0,
        tpr: 0.0,
        threshold: f64::INFINITY,
    });

    let mut tp = 0usize;
    let mut fp = 0usize;
    for (pos, idx) in order.iter().enumerate() {
        if labels[*idx] {
            tp += 1;
        } else {
            fp += 1;
        }
        // only add a point after the last value of a group of ties
        let last_of_group = order
            .get(pos + 1)
            .map_or(true, |next| scores[*next] != scores[*idx]);
        if last_of_group {
            curve.push(RocPoint {
                fpr: f64_from_usize(fp) / f64_from_usize(negatives),
                tpr: f64_from_usize(tp) / f64_from_usize(positives),
                threshold: scores[*idx],
            });
        }
    }
    Some(curve)
}

/// Calculates the area under the ROC curve using the trapezoidal rule
///
/// Returns `None` if the area is undefined, see [`roc_curve`].
///
/// # Examples
///
/// ```
/// use drugsets::stats::roc::auc;
///
/// let labels = [true, false, true, false];
/// let scores = [0.9, 0.8, 0.7, 0.1];
///
/// assert_eq!(auc(&labels, &scores), Some(0.75));
/// assert_eq!(auc(&[true, true], &[0.1, 0.2]), None);
/// ```
pub fn auc(labels: &[bool], scores: &[f64]) -> Option<f64> {
    let curve = roc_curve(labels, scores)?;
    let area: f64 = curve
        .windows(2)
        .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
        .sum();
    Some(area)
}
