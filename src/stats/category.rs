//! Enrichment of drug categories within the results of individual drug gene sets
//!
//! # Examples
//!
//! ```
//! use drugsets::{CategoryScheme, DrugMetadata};
//! use drugsets::parser::gsa::AssociationResult;
//! use drugsets::stats::category::category_enrichment;
//!
//! let results = vec![
//!     AssociationResult::new("drugA", 0.01),
//!     AssociationResult::new("drugB", 0.5),
//!     AssociationResult::new("drugC", 0.001),
//!     AssociationResult::new("drugD", 0.2),
//! ];
//!
//! let mut metadata = DrugMetadata::default();
//! metadata.add_drug("drugA", &["N05A"], None, None);
//! metadata.add_drug("drugB", &["C10A"], None, None);
//! metadata.add_drug("drugC", &["N05A", "N06A"], None, None);
//! metadata.add_drug("drugD", &["C10A"], None, None);
//!
//! let enrichment = category_enrichment(&results, &metadata, CategoryScheme::Atc, 2).unwrap();
//!
//! // N06A has only one drug and is not tested
//! assert_eq!(enrichment.all().len(), 2);
//! assert!((enrichment.threshold() - 0.025).abs() < f64::EPSILON);
//!
//! for category in enrichment.all() {
//!     println!("{}\t{}\t{}", category.group(), category.pvalue(), category.auc());
//! }
//! ```
use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::annotations::DrugMetadata;
use crate::config::CategoryScheme;
use crate::parser::gsa::AssociationResult;
use crate::stats::{mannwhitney, roc, Enrichment};
use crate::{f64_from_usize, DrugsetError, DrugsetResult, ALPHA};

/// One drug - category pair with the association score of the drug
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord<'a> {
    drug: &'a str,
    score: f64,
    category: Option<&'a str>,
}

impl<'a> MergedRecord<'a> {
    /// The name of the drug
    pub fn drug(&self) -> &'a str {
        self.drug
    }

    /// `|log10(p)|` of the drug gene set association
    pub fn score(&self) -> f64 {
        self.score
    }

    /// The category, `None` if the drug does not belong to any category
    pub fn category(&self) -> Option<&'a str> {
        self.category
    }
}

/// Joins the gene set results with the drug metadata
///
/// Results of gene sets without metadata are dropped. Each drug
/// contributes one record per category, or a single record without
/// category if it does not belong to any category of the `scheme`.
///
/// The records are sorted by descending score.
pub fn merge<'a>(
    results: &'a [AssociationResult],
    metadata: &'a DrugMetadata,
    scheme: CategoryScheme,
) -> Vec<MergedRecord<'a>> {
    let mut drugs: Vec<(&AssociationResult, f64)> = results
        .iter()
        .map(|res| (res, res.pvalue().log10().abs()))
        .collect();
    drugs.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut records = Vec::with_capacity(drugs.len());
    let mut missing = 0usize;
    for (result, score) in drugs {
        let Some(drug) = metadata.get(result.id()) else {
            missing += 1;
            continue;
        };
        let categories = drug.categories(scheme);
        if categories.is_empty() {
            records.push(MergedRecord {
                drug: drug.name(),
                score,
                category: None,
            });
        }
        for category in categories {
            records.push(MergedRecord {
                drug: drug.name(),
                score,
                category: Some(category),
            });
        }
    }
    if missing > 0 {
        debug!("{missing} gene sets have no drug metadata");
    }
    records
}

/// The number of records of each category
///
/// Categories are ordered by descending count. Categories with the same
/// count are ordered by their first occurrence.
pub fn category_counts<'a>(records: &[MergedRecord<'a>]) -> Vec<(&'a str, usize)> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (idx, category) in records.iter().filter_map(|r| r.category).enumerate() {
        counts
            .entry(category)
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, idx));
    }
    let mut counts: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    counts
        .into_iter()
        .map(|(category, (count, _))| (category, count))
        .collect()
}

/// The enrichment of all tested categories of one [`CategoryScheme`]
#[derive(Debug)]
pub struct CategoryEnrichment {
    scheme: CategoryScheme,
    results: Vec<Enrichment>,
    threshold: f64,
}

impl CategoryEnrichment {
    /// The category scheme that was tested
    pub fn scheme(&self) -> CategoryScheme {
        self.scheme
    }

    /// All tested categories, ordered by descending category size
    pub fn all(&self) -> &[Enrichment] {
        &self.results
    }

    /// The Bonferroni corrected significance threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Categories with a p-value below the Bonferroni threshold
    pub fn bonferroni(&self) -> Vec<&Enrichment> {
        self.results
            .iter()
            .filter(|res| res.pvalue() < self.threshold)
            .collect()
    }

    /// Writes all tested categories to `all` and the significant ones to `significant`
    ///
    /// Both files are comma-separated with the header `GROUP,MWU,P,AUC`
    ///
    /// # Errors
    ///
    /// [`DrugsetError::Csv`] if a file cannot be written
    pub fn write_csv<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        all: P,
        significant: Q,
    ) -> DrugsetResult<()> {
        write_rows(all, self.results.iter())?;
        write_rows(significant, self.bonferroni().into_iter())
    }
}

fn write_rows<'a, P: AsRef<Path>, I: Iterator<Item = &'a Enrichment>>(
    path: P,
    rows: I,
) -> DrugsetResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut empty = true;
    for row in rows {
        writer.serialize(row)?;
        empty = false;
    }
    if empty {
        // serde only writes the header together with the first row
        writer.write_record(["GROUP", "MWU", "P", "AUC"])?;
    }
    writer.flush()?;
    Ok(())
}

/// Tests a single category against all other records
fn test_category(
    records: &[MergedRecord<'_>],
    category: &str,
) -> DrugsetResult<Option<Enrichment>> {
    let mut members = Vec::new();
    let mut others = Vec::new();
    let mut labels = Vec::with_capacity(records.len());
    let mut scores = Vec::with_capacity(records.len());
    for record in records {
        let is_member = record.category == Some(category);
        if is_member {
            members.push(record.score);
        } else {
            others.push(record.score);
        }
        labels.push(is_member);
        scores.push(record.score);
    }

    if others.is_empty() {
        warn!("Skipping {category}: all drugs belong to the category");
        return Ok(None);
    }

    let mwu = mannwhitney::greater(&members, &others)?;
    let auc = roc::auc(&labels, &scores).ok_or_else(|| {
        DrugsetError::InvalidInput(format!("{category} has no members"))
    })?;
    debug!(
        "{category}: n={}, U={}, P={}, AUC={auc}",
        members.len(),
        mwu.statistic(),
        mwu.pvalue()
    );
    Ok(Some(Enrichment::new(
        category,
        mwu.statistic(),
        mwu.pvalue(),
        auc,
    )))
}

/// Calculates the enrichment of all drug categories of `scheme`
///
/// Every category with at least `nsize` drugs is tested against all other
/// drugs with a one-sided Mann-Whitney U test. Drugs are scored by `|log10(p)|`
/// of their gene set association, so categories of strongly associated drugs
/// have small p-values.
///
/// # Errors
///
/// - [`DrugsetError::NoCategories`]: No category has at least `nsize` drugs
/// - [`DrugsetError::InvalidInput`]: A p-value is not within `(0, 1]`
pub fn category_enrichment(
    results: &[AssociationResult],
    metadata: &DrugMetadata,
    scheme: CategoryScheme,
    nsize: usize,
) -> DrugsetResult<CategoryEnrichment> {
    if let Some(invalid) = results
        .iter()
        .find(|res| !(res.pvalue() > 0.0 && res.pvalue() <= 1.0))
    {
        return Err(DrugsetError::InvalidInput(format!(
            "p-value of {} must be within (0, 1], got {}",
            invalid.id(),
            invalid.pvalue()
        )));
    }

    let records = merge(results, metadata, scheme);
    let categories: Vec<(&str, usize)> = category_counts(&records)
        .into_iter()
        .filter(|(_, count)| *count >= nsize)
        .collect();
    if categories.is_empty() {
        return Err(DrugsetError::NoCategories(nsize));
    }
    info!(
        "Testing {} {scheme} categories with at least {nsize} drugs",
        categories.len()
    );

    let mut enrichments = Vec::with_capacity(categories.len());
    for (category, _) in &categories {
        if let Some(enrichment) = test_category(&records, category)? {
            enrichments.push(enrichment);
        }
    }
    if enrichments.is_empty() {
        return Err(DrugsetError::NoCategories(nsize));
    }

    let threshold = ALPHA / f64_from_usize(enrichments.len());
    Ok(CategoryEnrichment {
        scheme,
        results: enrichments,
        threshold,
    })
}
