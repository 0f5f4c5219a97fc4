//! Statistical analyses for the enrichment of drug categories
//!
//! This module contains methods to test whether the drugs of a category
//! are more strongly associated with a phenotype than all other drugs.
//!
//! Each category is tested one-vs-rest with
//! - a one-sided [Mann-Whitney U test](`mannwhitney::greater`)
//! - the [area under the ROC curve](`roc::auc`) when using the association
//!   score to discriminate category members from all other drugs
//!
//! and the results are corrected for multiple testing using Bonferroni's method.
//! The main entry point is [`category::category_enrichment`].

use serde::Serialize;

pub mod category;
pub mod mannwhitney;
pub mod roc;

/// The enrichment of a single drug category
///
/// [`Enrichment`] is returned from [`category::category_enrichment`]. When written
/// to CSV, the columns are named `GROUP`, `MWU`, `P` and `AUC`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enrichment {
    #[serde(rename = "GROUP")]
    group: String,
    #[serde(rename = "MWU")]
    statistic: f64,
    #[serde(rename = "P")]
    pvalue: f64,
    #[serde(rename = "AUC")]
    auc: f64,
}

impl Enrichment {
    /// Constructs a new `Enrichment`
    pub fn new(group: &str, statistic: f64, pvalue: f64, auc: f64) -> Self {
        Self {
            group: group.to_string(),
            statistic,
            pvalue,
            auc,
        }
    }

    /// The label of the category, e.g. an ATC code
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Returns the Mann-Whitney U statistic of the category members
    pub fn statistic(&self) -> f64 {
        self.statistic
    }

    /// Returns the p-value of the enrichment
    ///
    /// The p-value indicates the probability that the members of the
    /// category are as strongly associated by chance
    pub fn pvalue(&self) -> f64 {
        self.pvalue
    }

    /// Returns the area under the ROC curve
    pub fn auc(&self) -> f64 {
        self.auc
    }
}

/// Assigns ranks to all values, using the mean rank for ties
///
/// Ranks start at 1. Also returns the sizes of all groups of tied values.
fn rank(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| values[*a].total_cmp(&values[*b]));

    let mut ranks = vec![0.0; values.len()];
    let mut ties = Vec::new();
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end share the mean of the ranks start+1..=end
        let mid_rank = crate::f64_from_usize(start + 1 + end) / 2.0;
        for idx in &order[start..end] {
            ranks[*idx] = mid_rank;
        }
        if end - start > 1 {
            ties.push(end - start);
        }
        start = end;
    }
    (ranks, ties)
}
