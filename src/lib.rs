//! Drug gene set analysis with MAGMA and enrichment testing of drug categories
//!
//! The crate has two parts:
//!
//! - the orchestration of a MAGMA competitive gene set analysis on precomputed
//!   drug gene sets ([`Analysis`], [`config`], [`magma`])
//! - the enrichment analysis of drug categories (ATC codes, mechanism of action,
//!   clinical indication) within the results of the individual drug gene sets
//!   ([`stats::category`])
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
//! ];
//!
//! let mut metadata = DrugMetadata::default();
//! metadata.add_drug("drugA", &[], Some("X"), None);
//! metadata.add_drug("drugB", &[], Some("Y"), None);
//! metadata.add_drug("drugC", &[], Some("X"), None);
//!
//! let enrichment = category_enrichment(&results, &metadata, CategoryScheme::Moa, 1).unwrap();
//! assert_eq!(enrichment.all().len(), 2);
//! assert_eq!(enrichment.all()[0].group(), "X");
//! ```
use core::fmt::Debug;
use std::num::ParseFloatError;
use std::path::PathBuf;

use thiserror::Error;

pub mod analysis;
pub mod annotations;
pub mod config;
pub mod magma;
pub mod parser;
pub mod process;
pub mod regression;
pub mod stats;

pub use analysis::Analysis;
pub use annotations::{Drug, DrugMetadata};
pub use config::{CategoryScheme, Config, DrugSets, EnrichGroup, GeneNaming, Layout};
pub use stats::Enrichment;

/// Significance level that is divided by the number of tested
/// categories to obtain the Bonferroni threshold
pub const ALPHA: f64 = 0.05;

/// Default and minimum number of genes in a drug gene set
pub const DEFAULT_SET_SIZE: usize = 2;

/// Default minimum number of drugs in a category to be tested for enrichment
pub const DEFAULT_NSIZE: usize = 5;

/// Main Error type for this crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DrugsetError {
    /// Command line input does not have the expected shape
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A reference data file is not present
    #[error("required file does not exist: {}", .0.display())]
    MissingFile(PathBuf),
    /// Unable to open a file
    #[error("cannot open file {0}")]
    CannotOpenFile(String),
    /// A line of an input file could not be parsed
    #[error("unable to parse line {line} of {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },
    /// Failed to parse a float
    #[error("unable to parse float")]
    ParseFloatError,
    /// An external program could not be started or exited with an error
    #[error("{program} failed: {reason}")]
    ExternalProcess { program: String, reason: String },
    /// No drug category has enough members to be tested
    #[error("no drug categories have a sample size of at least {0}. Please try again with a lower value for \"--nsize\"")]
    NoCategories(usize),
    /// Enrichment was requested for drug sets other than individual drugs
    #[error("to test for enrichment \"--drugsets\" must be set to \"solo\" (got \"{0}\")")]
    SchemeMismatch(String),
    /// Any other IO error while reading or writing
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Error while reading or writing CSV/TSV data
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<ParseFloatError> for DrugsetError {
    fn from(_: ParseFloatError) -> Self {
        DrugsetError::ParseFloatError
    }
}

/// Shortcut for `Result<T, DrugsetError>`
pub type DrugsetResult<T> = Result<T, DrugsetError>;

/// We have to frequently do divisions starting with usize values
/// and need to return f64 values. To ensure some kind of safety
/// we use this method to panic in case of overflows.
fn f64_from_usize(n: usize) -> f64 {
    let intermediate: u32 = n
        .try_into()
        .expect("cannot safely create f64 from large usize");
    intermediate.into()
}
