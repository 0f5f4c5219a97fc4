//! The complete drug gene set analysis
use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::annotations::DrugMetadata;
use crate::config::{Config, EnrichGroup, EnrichMethod};
use crate::magma::{self, MagmaOutput};
use crate::parser::{geneset, gsa};
use crate::regression::{self, TempArtifact};
use crate::stats::category::{category_enrichment, CategoryEnrichment};
use crate::DrugsetResult;

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Runs a drug gene set analysis and the optional enrichment of drug categories
///
/// ```mermaid
/// graph LR
///     A[Config] --> B{setsize != 2}
///     B -- yes --> C[filter gene sets]
///     B -- no --> D[MAGMA]
///     C --> D
///     D --> E[.gsa.out]
///     E --> F{enrich}
///     F -- rank --> G[Mann-Whitney U + AUC]
///     F -- regression --> H[R scripts]
///     G --> I[enrichment CSV]
/// ```
///
/// All steps run one after another. Any failure aborts the analysis,
/// size-filtered gene set files are removed in every case.
#[derive(Debug)]
pub struct Analysis {
    config: Config,
}

/// Summary of a finished analysis
#[derive(Debug)]
pub struct Report {
    /// Files written by MAGMA
    pub magma: MagmaOutput,
    /// Number of warnings in the MAGMA log
    pub warnings: usize,
    /// Enrichment files (all categories, significant categories)
    pub enrichment_files: Vec<(PathBuf, PathBuf)>,
}

impl Analysis {
    /// Validates the configuration and checks that all input files exist
    ///
    /// # Errors
    ///
    /// See [`Config::validate`] and [`Config::check_files`]
    pub fn new(config: Config) -> DrugsetResult<Self> {
        config.validate()?;
        config.check_files()?;
        Ok(Self { config })
    }

    /// The configuration of the analysis
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs all steps of the analysis
    ///
    /// # Errors
    ///
    /// Returns the first error of any step
    pub fn run(&self) -> DrugsetResult<Report> {
        // the filtered gene sets are also read by the regression scripts
        let _filtered = self.filter_genesets()?;
        let (magma, warnings) = self.run_magma()?;

        let mut enrichment_files = Vec::new();
        if let Some(group) = self.config.enrich {
            match self.config.method {
                EnrichMethod::Rank => {
                    enrichment_files = self.rank_enrichment(&magma, group)?;
                }
                EnrichMethod::Regression => {
                    println!("Running {} enrichment analysis...\n", group.as_str().to_uppercase());
                    regression::run(&self.config, &magma.gsa, group)?;
                    println!("\nEnrichment analysis finished.\n");
                }
            }
        }

        Ok(Report {
            magma,
            warnings,
            enrichment_files,
        })
    }

    /// Writes the size-filtered gene sets, if needed
    ///
    /// The returned guard removes the filtered file when dropped.
    fn filter_genesets(&self) -> DrugsetResult<Option<TempArtifact>> {
        if !self.config.needs_filtering() {
            return Ok(None);
        }
        let geneset_file = self.config.geneset_file();
        let artifact = TempArtifact::new(&geneset_file);
        geneset::filter_file(
            self.config.reference_geneset_file(),
            &geneset_file,
            self.config.setsize,
        )?;
        Ok(Some(artifact))
    }

    /// Runs MAGMA on the gene set file of the configuration
    fn run_magma(&self) -> DrugsetResult<(MagmaOutput, usize)> {
        let geneset_file = self.config.geneset_file();

        println!("\nRunning drug gene set analysis in MAGMA...\n");
        info!("Using gene sets from {}", geneset_file.display());
        magma::run(&self.config, &geneset_file)?;

        let output = MagmaOutput::new(&self.config);
        let warnings = magma::count_log_warnings(&output.log)?;
        println!(
            "\n\t{warnings} warnings found (see {} for details)",
            output.log.display()
        );
        println!(
            "\tResults for all drug gene sets saving to {}",
            output.gsa.display()
        );
        println!(
            "\tResults for significant drug gene sets saving to {}\n",
            output.set_genes.display()
        );
        println!("\tDrug gene set analysis finished.\n");
        Ok((output, warnings))
    }

    /// Mann-Whitney U and AUC enrichment for every requested category scheme
    fn rank_enrichment(
        &self,
        magma: &MagmaOutput,
        group: EnrichGroup,
    ) -> DrugsetResult<Vec<(PathBuf, PathBuf)>> {
        let results = gsa::parse_file(&magma.gsa)?;
        let metadata = DrugMetadata::from_file(self.config.metadata_file())?;
        debug!(
            "{} gene set results, {} drugs with metadata",
            results.len(),
            metadata.len()
        );

        // compute everything first, so that a failing scheme leaves no partial output
        let mut enrichments: Vec<CategoryEnrichment> = Vec::new();
        for scheme in group.schemes() {
            println!("Running {} enrichment analysis...", scheme.as_str().to_uppercase());
            enrichments.push(category_enrichment(
                &results,
                &metadata,
                scheme,
                self.config.nsize,
            )?);
        }

        fs::create_dir_all(self.config.layout.output_dir())?;
        let mut files = Vec::with_capacity(enrichments.len());
        for enrichment in &enrichments {
            let all = self
                .config
                .output_file(&format!("_{}_enrichment.csv", enrichment.scheme()));
            let significant = self
                .config
                .output_file(&format!("_{}_enrichment_bonf.csv", enrichment.scheme()));
            enrichment.write_csv(&all, &significant)?;
            println!(
                "\t{} {} categories tested, {} significant (P < {:.2e})",
                enrichment.all().len(),
                enrichment.scheme(),
                enrichment.bonferroni().len(),
                enrichment.threshold()
            );
            println!("\tResults saved to {} and {}", all.display(), significant.display());
            files.push((all, significant));
        }
        println!("\nEnrichment analysis finished.\n");
        Ok(files)
    }
}
