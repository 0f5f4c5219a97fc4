//! Enrichment of drug categories with a dependent linear regression model
//!
//! The regression is done by two R scripts that are run one after another:
//!
//! 1. `compute_corrs.R` calculates the correlation matrix of the gene sets
//!    and stores it in `<out>_setcorrs.rdata`
//! 2. `compute_lnreg.R` fits the regression model and writes the results
//!    to the output folder
//!
//! The correlation matrix is removed when the analysis is done, also if
//! one of the scripts fails.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::{Config, EnrichGroup};
use crate::process::{Output, Task};
use crate::DrugsetResult;

/// Script to compute the correlation of all gene sets
pub const CORRS_SCRIPT: &str = "compute_corrs.R";

/// Script to run the dependent linear regression
pub const LNREG_SCRIPT: &str = "compute_lnreg.R";

/// A file that is removed when it goes out of scope
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    /// Takes ownership of the file at `path`, the file does not need to exist yet
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// The path of the file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed {}", self.path.display()),
            Err(err) => warn!("Unable to remove {}: {err}", self.path.display()),
        }
    }
}

/// Absolute version of `path`, the R scripts run with their own working directory
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Builds the two R script invocations
///
/// The correlation matrix is computed over the same gene set file that
/// MAGMA was run on, so a size-filtered copy must still exist when the
/// first script runs.
///
/// Returns the tasks and the path of the correlation matrix that
/// the first script creates.
pub fn tasks(config: &Config, gsa_file: &Path, group: EnrichGroup) -> (Task, Task, PathBuf) {
    let scripts = config.layout.scripts_dir();
    let root = absolute(scripts);
    let corrs = root.join(format!("{}_setcorrs.rdata", config.out));

    let compute_corrs = Task::new(config.rscript.as_os_str())
        .arg("--vanilla")
        .path(absolute(&scripts.join(CORRS_SCRIPT)))
        .path(absolute(&config.annot_file()))
        .path(absolute(&config.geneset_file()))
        .path(absolute(gsa_file))
        .arg(config.out.as_str())
        .path(&root);

    let compute_lnreg = Task::new(config.rscript.as_os_str())
        .arg("--vanilla")
        .path(absolute(&scripts.join(LNREG_SCRIPT)))
        .path(&corrs)
        .path(absolute(&config.layout.regression_metadata()))
        .arg(group.as_str())
        .arg(config.nsize.to_string())
        .arg(config.out.as_str())
        .path(absolute(config.layout.output_dir()));

    (compute_corrs, compute_lnreg, corrs)
}

/// Runs the regression enrichment for `group`
///
/// # Errors
///
/// [`crate::DrugsetError::ExternalProcess`] if one of the scripts fails
pub fn run(config: &Config, gsa_file: &Path, group: EnrichGroup) -> DrugsetResult<()> {
    let (compute_corrs, compute_lnreg, corrs) = tasks(config, gsa_file, group);
    let corrs = TempArtifact::new(corrs);

    println!("\tComputing correlation matrix...");
    compute_corrs.run(Output::Silent)?;

    println!("\tRunning dependent linear regression model...");
    compute_lnreg.run(Output::Silent)?;

    debug!("Regression results written, removing {}", corrs.path().display());
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{DrugSets, Layout};

    #[test]
    fn artifact_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trait_setcorrs.rdata");
        fs::write(&path, "data").unwrap();
        {
            let artifact = TempArtifact::new(&path);
            assert!(artifact.path().exists());
        }
        assert!(!path.exists());

        // a missing file is fine
        drop(TempArtifact::new(dir.path().join("never_created")));
    }

    #[test]
    fn script_arguments() {
        let mut config = Config::new("trait.genes.raw", DrugSets::Solo, "trait");
        config.layout = Layout::new("/data", "/out", "/scripts");
        config.nsize = 7;
        let (corrs_task, lnreg_task, corrs) =
            tasks(&config, Path::new("/out/trait.gsa.out"), EnrichGroup::Atc);

        assert_eq!(corrs, PathBuf::from("/scripts/trait_setcorrs.rdata"));
        assert_eq!(
            corrs_task.command_line(),
            "Rscript --vanilla /scripts/compute_corrs.R /data/MAGMA_ANNOT/trait.genes.raw \
             /data/GENESETS/entrez_cond_sets.txt /out/trait.gsa.out trait /scripts"
        );
        assert_eq!(
            lnreg_task.command_line(),
            "Rscript --vanilla /scripts/compute_lnreg.R /scripts/trait_setcorrs.rdata \
             /data/metadata.rdata atc 7 trait /out"
        );
    }

    #[test]
    fn correlations_use_filtered_gene_sets() {
        let mut config = Config::new("trait.genes.raw", DrugSets::Solo, "trait");
        config.layout = Layout::new("/data", "/out", "/scripts");
        config.setsize = 5;
        let (corrs_task, _, _) = tasks(&config, Path::new("/out/trait.gsa.out"), EnrichGroup::Moa);

        let sets = corrs_task.args()[3].clone();
        assert_eq!(sets, "/data/GENESETS/tmp/entrez_cond_sets_min5.txt");
        assert_eq!(PathBuf::from(sets), config.geneset_file());
    }

    #[cfg(unix)]
    #[test]
    fn artifact_is_removed_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new("trait.genes.raw", DrugSets::Solo, "trait");
        config.layout = Layout::new(dir.path(), dir.path(), dir.path());
        config.rscript = PathBuf::from("false");
        let corrs = dir.path().join("trait_setcorrs.rdata");
        fs::write(&corrs, "stale").unwrap();

        assert!(run(&config, &dir.path().join("trait.gsa.out"), EnrichGroup::Moa).is_err());
        assert!(!corrs.exists());
    }
}
