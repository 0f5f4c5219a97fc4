//! Run configuration and the lookup of precomputed drug gene set files
//!
//! All directories that the analysis reads from or writes to are collected
//! in a [`Layout`]. Together with the user options it forms the [`Config`]
//! that is built once at startup and handed to every step of the analysis.
use std::fmt::Display;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{DrugsetError, DrugsetResult, DEFAULT_NSIZE, DEFAULT_SET_SIZE};

/// Suffix of the MAGMA gene analysis output
pub const GENES_RAW_SUFFIX: &str = ".genes.raw";

/// Gene naming convention used in the `.genes.raw` file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeneNaming {
    /// NCBI Entrez gene IDs
    Entrez,
    /// Ensembl v105 gene IDs
    Ensembl,
    /// Ensembl v92 gene IDs (used by FUMA)
    Ensembl92,
}

/// The type of drug gene sets tested in MAGMA
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrugSets {
    /// One gene set per individual drug
    Solo,
    /// One gene set per ATC level 3 code
    Atc,
    /// One gene set per mechanism of action
    Moa,
    /// One gene set per clinical indication
    Ind,
}

impl Display for DrugSets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DrugSets::Solo => "solo",
            DrugSets::Atc => "atc",
            DrugSets::Moa => "moa",
            DrugSets::Ind => "ind",
        };
        write!(f, "{name}")
    }
}

/// Grouping of drugs into categories for the enrichment analysis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CategoryScheme {
    /// ATC level 3 classification, a drug can have several codes
    Atc,
    /// Mechanism of action
    Moa,
    /// Clinical indication
    Ind,
}

impl CategoryScheme {
    /// The canonical name of the grouping field
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryScheme::Atc => "atc",
            CategoryScheme::Moa => "moa",
            CategoryScheme::Ind => "ind",
        }
    }
}

impl Display for CategoryScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The enrichment requested on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnrichGroup {
    Atc,
    Moa,
    Ind,
    /// All three category schemes, one after another
    All,
}

impl EnrichGroup {
    /// Returns the category schemes to test, in the order they are run
    pub fn schemes(&self) -> Vec<CategoryScheme> {
        match self {
            EnrichGroup::Atc => vec![CategoryScheme::Atc],
            EnrichGroup::Moa => vec![CategoryScheme::Moa],
            EnrichGroup::Ind => vec![CategoryScheme::Ind],
            EnrichGroup::All => vec![
                CategoryScheme::Atc,
                CategoryScheme::Moa,
                CategoryScheme::Ind,
            ],
        }
    }

    /// The name passed on to the regression scripts
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichGroup::Atc => "atc",
            EnrichGroup::Moa => "moa",
            EnrichGroup::Ind => "ind",
            EnrichGroup::All => "all",
        }
    }
}

/// How drug categories are tested for enrichment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnrichMethod {
    /// Mann-Whitney U test and ROC AUC, computed in process
    #[default]
    Rank,
    /// Dependent linear regression delegated to R scripts
    Regression,
}

/// Directory layout of the reference data, scripts and results
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    data: PathBuf,
    output: PathBuf,
    scripts: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new("DATA", "OUTPUT", ".")
    }
}

impl Layout {
    /// Constructs a new `Layout` from the data, output and script directories
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>, R: Into<PathBuf>>(
        data: P,
        output: Q,
        scripts: R,
    ) -> Self {
        Self {
            data: data.into(),
            output: output.into(),
            scripts: scripts.into(),
        }
    }

    /// Root folder of the reference data
    pub fn data_dir(&self) -> &Path {
        &self.data
    }

    /// Folder with all precomputed drug gene set files
    pub fn geneset_dir(&self) -> PathBuf {
        self.data.join("GENESETS")
    }

    /// Folder for gene set files that are filtered by size
    pub fn tmp_geneset_dir(&self) -> PathBuf {
        self.geneset_dir().join("tmp")
    }

    /// Folder containing the MAGMA gene analysis results
    pub fn annot_dir(&self) -> PathBuf {
        self.data.join("MAGMA_ANNOT")
    }

    /// Folder where all results are written to
    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    /// Folder containing `compute_corrs.R` and `compute_lnreg.R`
    pub fn scripts_dir(&self) -> &Path {
        &self.scripts
    }

    /// The drug metadata table for the given gene naming convention
    pub fn metadata(&self, naming: GeneNaming) -> PathBuf {
        let name = match naming {
            GeneNaming::Entrez => "entrez_meta.tsv",
            GeneNaming::Ensembl => "ensembl105_meta.tsv",
            GeneNaming::Ensembl92 => "ensembl92_meta.tsv",
        };
        self.data.join(name)
    }

    /// The drug metadata used by the regression scripts
    pub fn regression_metadata(&self) -> PathBuf {
        self.data.join("metadata.rdata")
    }

    /// Returns the reference gene set file for the given combination
    pub fn geneset_file(
        &self,
        naming: GeneNaming,
        conditional: bool,
        drugsets: DrugSets,
    ) -> PathBuf {
        self.geneset_dir().join(geneset_filename(naming, conditional, drugsets))
    }

    /// Returns the path of the size-filtered copy of `source`
    ///
    /// The copy is placed in [`Layout::tmp_geneset_dir`] and named
    /// after the source file with `_min<size>` appended to the stem.
    pub fn filtered_geneset_file(&self, source: &Path, min_size: usize) -> PathBuf {
        let stem = source
            .file_stem()
            .map_or_else(|| "genesets".to_string(), |s| s.to_string_lossy().to_string());
        self.tmp_geneset_dir().join(format!("{stem}_min{min_size}.txt"))
    }
}

/// Lookup table of the precomputed drug gene set files
fn geneset_filename(naming: GeneNaming, conditional: bool, drugsets: DrugSets) -> &'static str {
    use DrugSets::{Atc, Ind, Moa, Solo};
    use GeneNaming::{Ensembl, Ensembl92, Entrez};
    match (naming, conditional, drugsets) {
        (Entrez, false, Solo) => "entrez_genesets.txt",
        (Entrez, false, Atc) => "atc_entrez_sets.txt",
        (Entrez, false, Moa) => "moa_entrez_sets.txt",
        (Entrez, false, Ind) => "ind_entrez_sets.txt",
        (Entrez, true, Solo) => "entrez_cond_sets.txt",
        (Entrez, true, Atc) => "atc_cond_sets.txt",
        (Entrez, true, Moa) => "moa_cond_sets.txt",
        (Entrez, true, Ind) => "ind_cond_sets.txt",
        (Ensembl, false, Solo) => "ensembl_genesets.txt",
        (Ensembl, false, Atc) => "atc_ensembl_sets.txt",
        (Ensembl, false, Moa) => "moa_ensembl_sets.txt",
        (Ensembl, false, Ind) => "ind_ensembl_sets.txt",
        (Ensembl, true, Solo) => "ensembl_cond_sets.txt",
        (Ensembl, true, Atc) => "atc_ensembl_cond_sets.txt",
        (Ensembl, true, Moa) => "moa_ensembl_cond_sets.txt",
        (Ensembl, true, Ind) => "ind_ensembl_cond_sets.txt",
        (Ensembl92, false, Solo) => "ensembl_genesets92.txt",
        (Ensembl92, false, Atc) => "atc_ensembl_sets92.txt",
        (Ensembl92, false, Moa) => "moa_ensembl_sets92.txt",
        (Ensembl92, false, Ind) => "ind_ensembl_sets92.txt",
        (Ensembl92, true, Solo) => "ensembl_cond_sets92.txt",
        (Ensembl92, true, Atc) => "atc_ensembl_cond_sets92.txt",
        (Ensembl92, true, Moa) => "moa_ensembl_cond_sets92.txt",
        (Ensembl92, true, Ind) => "ind_ensembl_cond_sets92.txt",
    }
}

/// All settings of a single drug gene set analysis
#[derive(Clone, Debug)]
pub struct Config {
    /// Filename of the MAGMA `.genes.raw` file, relative to [`Layout::annot_dir`]
    pub geneassoc: PathBuf,
    pub drugsets: DrugSets,
    /// Name of the output, relative to [`Layout::output_dir`]
    pub out: String,
    /// Condition on the druggable genome gene set
    pub conditional: bool,
    /// Minimum number of genes in a drug gene set
    pub setsize: usize,
    pub naming: GeneNaming,
    pub enrich: Option<EnrichGroup>,
    pub method: EnrichMethod,
    /// Minimum number of drugs in a category to be tested
    pub nsize: usize,
    /// Show the MAGMA output instead of a progress indicator
    pub showlog: bool,
    /// MAGMA executable
    pub magma: PathBuf,
    /// Rscript executable
    pub rscript: PathBuf,
    pub layout: Layout,
}

impl Config {
    /// Constructs a `Config` with default settings for all optional values
    pub fn new<P: Into<PathBuf>>(geneassoc: P, drugsets: DrugSets, out: &str) -> Self {
        Self {
            geneassoc: geneassoc.into(),
            drugsets,
            out: out.to_string(),
            conditional: true,
            setsize: DEFAULT_SET_SIZE,
            naming: GeneNaming::Entrez,
            enrich: None,
            method: EnrichMethod::default(),
            nsize: DEFAULT_NSIZE,
            showlog: false,
            magma: PathBuf::from("magma"),
            rscript: PathBuf::from("Rscript"),
            layout: Layout::default(),
        }
    }

    /// Checks that the options form a valid analysis
    ///
    /// # Errors
    ///
    /// - [`DrugsetError::InvalidInput`]: The gene association file does not
    ///   end in `.genes.raw`, the set size is below 2 or the output name is empty
    /// - [`DrugsetError::SchemeMismatch`]: Enrichment is requested for
    ///   drug sets other than [`DrugSets::Solo`]
    pub fn validate(&self) -> DrugsetResult<()> {
        let geneassoc = self.geneassoc.to_string_lossy();
        if !geneassoc.ends_with(GENES_RAW_SUFFIX) {
            return Err(DrugsetError::InvalidInput(format!(
                "gene association file \"{geneassoc}\" does not end in \"{GENES_RAW_SUFFIX}\". \
                 Please check the MAGMA gene association input file and try again"
            )));
        }
        if self.setsize < DEFAULT_SET_SIZE {
            return Err(DrugsetError::InvalidInput(format!(
                "minimum drug gene set size is {DEFAULT_SET_SIZE} (got {})",
                self.setsize
            )));
        }
        if self.out.trim().is_empty() {
            return Err(DrugsetError::InvalidInput("output name must not be empty".to_string()));
        }
        if self.enrich.is_some() && self.drugsets != DrugSets::Solo {
            return Err(DrugsetError::SchemeMismatch(self.drugsets.to_string()));
        }
        Ok(())
    }

    /// Checks that all reference files needed for the run are present
    ///
    /// # Errors
    ///
    /// [`DrugsetError::MissingFile`] for the first file that does not exist
    pub fn check_files(&self) -> DrugsetResult<()> {
        let mut required = vec![self.annot_file(), self.reference_geneset_file()];
        match (self.enrich, self.method) {
            (Some(_), EnrichMethod::Rank) => required.push(self.metadata_file()),
            (Some(_), EnrichMethod::Regression) => {
                required.push(self.layout.regression_metadata());
                required.push(self.layout.scripts_dir().join(crate::regression::CORRS_SCRIPT));
                required.push(self.layout.scripts_dir().join(crate::regression::LNREG_SCRIPT));
            }
            (None, _) => {}
        }
        for path in required {
            debug!("Checking {}", path.display());
            if !path.is_file() {
                return Err(DrugsetError::MissingFile(path));
            }
        }
        Ok(())
    }

    /// The MAGMA `.genes.raw` input file
    pub fn annot_file(&self) -> PathBuf {
        self.layout.annot_dir().join(&self.geneassoc)
    }

    /// The unfiltered reference gene set file for the selected drug sets
    pub fn reference_geneset_file(&self) -> PathBuf {
        self.layout.geneset_file(self.naming, self.conditional, self.drugsets)
    }

    /// Whether the gene sets must be filtered by size before running MAGMA
    pub fn needs_filtering(&self) -> bool {
        self.setsize != DEFAULT_SET_SIZE
    }

    /// The gene set file that is handed to MAGMA
    pub fn geneset_file(&self) -> PathBuf {
        let reference = self.reference_geneset_file();
        if self.needs_filtering() {
            self.layout.filtered_geneset_file(&reference, self.setsize)
        } else {
            reference
        }
    }

    /// The drug metadata table
    pub fn metadata_file(&self) -> PathBuf {
        self.layout.metadata(self.naming)
    }

    /// MAGMA output prefix
    pub fn output_prefix(&self) -> PathBuf {
        self.layout.output_dir().join(&self.out)
    }

    /// Appends `suffix` to the output prefix
    pub fn output_file(&self, suffix: &str) -> PathBuf {
        let mut prefix = self.output_prefix().into_os_string();
        prefix.push(suffix);
        PathBuf::from(prefix)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_geneset_lookup() {
        let layout = Layout::new("/data", "/out", "/scripts");
        assert_eq!(
            layout.geneset_file(GeneNaming::Entrez, true, DrugSets::Solo),
            PathBuf::from("/data/GENESETS/entrez_cond_sets.txt")
        );
        assert_eq!(
            layout.geneset_file(GeneNaming::Ensembl92, false, DrugSets::Atc),
            PathBuf::from("/data/GENESETS/atc_ensembl_sets92.txt")
        );
        assert_eq!(
            layout.geneset_file(GeneNaming::Ensembl, true, DrugSets::Ind),
            PathBuf::from("/data/GENESETS/ind_ensembl_cond_sets.txt")
        );
    }

    #[test]
    fn filtered_geneset_path() {
        let mut config = Config::new("trait.genes.raw", DrugSets::Moa, "trait");
        config.layout = Layout::new("/data", "/out", ".");
        config.conditional = false;
        assert_eq!(
            config.geneset_file(),
            PathBuf::from("/data/GENESETS/moa_entrez_sets.txt")
        );

        config.setsize = 5;
        assert_eq!(
            config.geneset_file(),
            PathBuf::from("/data/GENESETS/tmp/moa_entrez_sets_min5.txt")
        );
    }

    #[test]
    fn output_files() {
        let mut config = Config::new("trait.genes.raw", DrugSets::Solo, "trait");
        config.layout = Layout::new("/data", "/out", ".");
        assert_eq!(config.output_file(".gsa.out"), PathBuf::from("/out/trait.gsa.out"));
        assert_eq!(config.annot_file(), PathBuf::from("/data/MAGMA_ANNOT/trait.genes.raw"));
        assert_eq!(config.metadata_file(), PathBuf::from("/data/entrez_meta.tsv"));
    }

    #[test]
    fn rejects_wrong_suffix() {
        let config = Config::new("trait.genes.out", DrugSets::Solo, "trait");
        assert!(matches!(config.validate(), Err(DrugsetError::InvalidInput(_))));
    }

    #[test]
    fn rejects_small_setsize() {
        let mut config = Config::new("trait.genes.raw", DrugSets::Solo, "trait");
        config.setsize = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_enrichment_for_grouped_sets() {
        let mut config = Config::new("trait.genes.raw", DrugSets::Atc, "trait");
        assert!(config.validate().is_ok());

        config.enrich = Some(EnrichGroup::Moa);
        assert!(matches!(
            config.validate(),
            Err(DrugsetError::SchemeMismatch(s)) if s == "atc"
        ));
    }

    #[test]
    fn missing_reference_files() {
        let mut config = Config::new("trait.genes.raw", DrugSets::Solo, "trait");
        config.layout = Layout::new("/does/not/exist", "/out", ".");
        match config.check_files() {
            Err(DrugsetError::MissingFile(path)) => {
                assert_eq!(path, PathBuf::from("/does/not/exist/MAGMA_ANNOT/trait.genes.raw"));
            }
            _ => panic!("expected a missing file"),
        }
    }

    #[test]
    fn enrich_all_runs_every_scheme() {
        assert_eq!(EnrichGroup::All.schemes().len(), 3);
        assert_eq!(EnrichGroup::Ind.schemes(), vec![CategoryScheme::Ind]);
    }
}
