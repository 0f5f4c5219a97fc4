//! Competitive gene set analysis of drug gene sets with MAGMA
//!
//! MAGMA is an external program and must be available on the `PATH`
//! (or passed explicitly via [`Config::magma`]).
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Config;
use crate::process::{Output, Task};
use crate::{DrugsetError, DrugsetResult};

/// Marker of warnings in the MAGMA log
pub const WARNING_MARKER: &str = "WARNING:";

/// Name of the gene set MAGMA conditions on
pub const CONDITION_SET: &str = "druggable";

/// Builds the MAGMA command line for the gene set analysis
///
/// ```text
/// magma --gene-results <genes.raw> --set-annot <gene sets> --settings gene-info \
///     [--model condition=druggable] --out <output>
/// ```
pub fn gene_set_task(config: &Config, geneset_file: &Path) -> Task {
    let mut task = Task::new(config.magma.as_os_str())
        .arg("--gene-results")
        .path(config.annot_file())
        .arg("--set-annot")
        .path(geneset_file)
        .arg("--settings")
        .arg("gene-info");
    if config.conditional {
        task = task
            .arg("--model")
            .arg(format!("condition={CONDITION_SET}"));
    }
    task.arg("--out").path(config.output_prefix())
}

/// Runs the MAGMA gene set analysis on `geneset_file`
///
/// # Errors
///
/// [`DrugsetError::ExternalProcess`] if MAGMA fails
pub fn run(config: &Config, geneset_file: &Path) -> DrugsetResult<()> {
    let output = if config.showlog {
        Output::Show
    } else {
        Output::Progress
    };
    if let Some(parent) = config.output_prefix().parent() {
        fs::create_dir_all(parent)?;
    }
    gene_set_task(config, geneset_file).run(output)
}

/// Counts the warnings in a MAGMA log
///
/// # Examples
///
/// ```
/// use drugsets::magma::count_warnings;
///
/// let log = "Reading file...\nWARNING: 3 genes skipped\nDone\nWARNING: low sample size\n";
/// assert_eq!(count_warnings(log), 2);
/// ```
pub fn count_warnings(log: &str) -> usize {
    log.matches(WARNING_MARKER).count()
}

/// Reads the MAGMA log file and counts the warnings
///
/// # Errors
///
/// [`DrugsetError::CannotOpenFile`] if the log can't be read
pub fn count_log_warnings<P: AsRef<Path>>(log_file: P) -> DrugsetResult<usize> {
    let log_file = log_file.as_ref();
    let bytes = fs::read(log_file)
        .map_err(|_| DrugsetError::CannotOpenFile(log_file.display().to_string()))?;
    let count = count_warnings(&String::from_utf8_lossy(&bytes));
    debug!("{count} warnings in {}", log_file.display());
    Ok(count)
}

/// The files MAGMA writes for a gene set analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagmaOutput {
    /// Log of the run
    pub log: PathBuf,
    /// Results of all gene sets
    pub gsa: PathBuf,
    /// Genes of the significant gene sets
    pub set_genes: PathBuf,
}

impl MagmaOutput {
    /// The output files for the current configuration
    pub fn new(config: &Config) -> Self {
        Self {
            log: config.output_file(".log"),
            gsa: config.output_file(".gsa.out"),
            set_genes: config.output_file(".gsa.set.genes.out"),
        }
    }
}
