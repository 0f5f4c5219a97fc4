//! Module to parse the results of a MAGMA gene set analysis
//!
//! ```text
//! # MEAN_SAMPLE_SIZE = 484598
//! # TOTAL_GENES = 18383
//! # TEST_DIRECTION = one-sided, positive (set), two-sided (covar)
//! # CONDITIONED_INTERNAL = druggable
//! VARIABLE        TYPE  NGENES        BETA    BETA_STD          SE           P
//! metformin       SET        4     0.21033    0.006198     0.23519     0.18556
//! aspirin         SET       13    -0.14128   -0.007571     0.16264     0.80749
//! ```
//!
//! When MAGMA has to shorten long set names, it adds a `FULL_NAME` column
//! that is used as identifier instead of `VARIABLE`.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::{DrugsetError, DrugsetResult};

/// The association of a single gene set (drug) with the phenotype
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationResult {
    id: String,
    pvalue: f64,
}

impl AssociationResult {
    /// Constructs a new `AssociationResult`
    pub fn new(id: &str, pvalue: f64) -> Self {
        Self {
            id: id.to_string(),
            pvalue,
        }
    }

    /// The name of the gene set, i.e. the drug name
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The p-value of the association
    pub fn pvalue(&self) -> f64 {
        self.pvalue
    }
}

/// Column positions of the identifier and p-value
struct Header {
    id: usize,
    pvalue: usize,
    width: usize,
}

impl Header {
    fn parse(line: &str) -> Option<Self> {
        let cols: Vec<&str> = line.split_whitespace().collect();
        let pvalue = cols.iter().position(|col| *col == "P")?;
        let id = cols
            .iter()
            .position(|col| *col == "FULL_NAME")
            .or_else(|| cols.iter().position(|col| *col == "VARIABLE"))?;
        Some(Self {
            id,
            pvalue,
            width: cols.len(),
        })
    }
}

fn parse_error(file: &str, line: usize, reason: &str) -> DrugsetError {
    DrugsetError::ParseError {
        file: file.to_string(),
        line,
        reason: reason.to_string(),
    }
}

/// Parses a single data line
///
/// The p-value must be within `(0, 1]`, since its logarithm is used
/// as score in the enrichment analysis.
fn parse_line(line: &str, header: &Header) -> Result<AssociationResult, String> {
    let cols: Vec<&str> = line.split_whitespace().collect();
    if cols.len() < header.width {
        return Err(format!(
            "expected {} columns, found {}",
            header.width,
            cols.len()
        ));
    }
    let pvalue = cols[header.pvalue]
        .parse::<f64>()
        .map_err(|_| format!("invalid p-value \"{}\"", cols[header.pvalue]))?;
    if !(pvalue > 0.0 && pvalue <= 1.0) {
        return Err(format!("p-value {pvalue} is not within (0, 1]"));
    }
    Ok(AssociationResult::new(cols[header.id], pvalue))
}

/// Parses the results of a MAGMA gene set analysis from any reader
///
/// Lines starting with `#` and empty lines are ignored. The first
/// remaining line is the header.
///
/// # Errors
///
/// - [`DrugsetError::ParseError`]: The header lacks the `VARIABLE` or `P`
///   column, a line has too few columns or a p-value is not within `(0, 1]`
/// - [`DrugsetError::Io`]: The data can't be read
pub fn parse<R: BufRead>(reader: R, source: &str) -> DrugsetResult<Vec<AssociationResult>> {
    let mut header: Option<Header> = None;
    let mut results = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match &header {
            None => {
                header = Some(Header::parse(trimmed).ok_or_else(|| {
                    parse_error(source, idx + 1, "header must contain VARIABLE and P columns")
                })?);
            }
            Some(header) => {
                let result = parse_line(trimmed, header)
                    .map_err(|reason| parse_error(source, idx + 1, &reason))?;
                results.push(result);
            }
        }
    }

    if header.is_none() {
        return Err(parse_error(source, 0, "no header line found"));
    }
    debug!("Parsed {} gene set results from {}", results.len(), source);
    Ok(results)
}

/// Parses a MAGMA `.gsa.out` file
///
/// # Errors
///
/// - [`DrugsetError::CannotOpenFile`]: Source file not present or can't be opened
/// - see [`parse`] for all other errors
pub fn parse_file<P: AsRef<Path>>(file: P) -> DrugsetResult<Vec<AssociationResult>> {
    let filename = file.as_ref().display().to_string();
    let file = File::open(file).map_err(|_| DrugsetError::CannotOpenFile(filename.clone()))?;
    parse(BufReader::new(file), &filename)
}
