use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use drugsets::config::EnrichMethod;
use drugsets::{Analysis, Config, DrugSets, EnrichGroup, GeneNaming, Layout};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DrugSetsArg {
    Solo,
    Atc,
    Moa,
    Ind,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum YesNo {
    Yes,
    No,
}

impl From<YesNo> for bool {
    fn from(value: YesNo) -> Self {
        matches!(value, YesNo::Yes)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum NamingArg {
    Entrez,
    Ensembl,
    Ensembl92,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EnrichArg {
    Atc,
    Moa,
    Ind,
    All,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    Rank,
    Regression,
}

#[derive(Debug, Parser)]
#[command(
    name = "drugsets",
    version,
    about = "Drug gene set analysis in MAGMA and enrichment of drug categories"
)]
struct Cli {
    /// Filename of gene associations from MAGMA (.genes.raw), relative to <DATA_DIR>/MAGMA_ANNOT
    #[arg(short = 'g', long)]
    geneassoc: PathBuf,

    /// Type of drug gene set to use (individual drugs, ATC code, mechanism of action, clinical indication)
    #[arg(short = 'd', long, value_enum)]
    drugsets: DrugSetsArg,

    /// Name of the output, relative to <OUT_DIR>
    #[arg(short = 'o', long)]
    out: String,

    /// Condition the competitive gene set analysis on the gene set of all druggable genes
    #[arg(short = 'c', long, value_enum, default_value_t = YesNo::Yes)]
    conditional: YesNo,

    /// Minimum drug gene set size (at least 2)
    #[arg(short = 's', long, default_value_t = drugsets::DEFAULT_SET_SIZE)]
    setsize: usize,

    /// Gene naming convention of the .genes.raw file. Use "ensembl92" if MAGMA was run through FUMA
    #[arg(short = 'i', long = "id", value_enum, default_value_t = NamingArg::Entrez)]
    naming: NamingArg,

    /// Test drug categories for enrichment (requires --drugsets solo)
    #[arg(short = 'e', long, value_enum)]
    enrich: Option<EnrichArg>,

    /// Minimum number of drugs in a category to be tested for enrichment
    #[arg(short = 'n', long, default_value_t = drugsets::DEFAULT_NSIZE)]
    nsize: usize,

    /// Print the MAGMA output to the terminal
    #[arg(short = 'l', long, value_enum, default_value_t = YesNo::No)]
    showlog: YesNo,

    /// Enrichment method
    #[arg(long, value_enum, default_value_t = MethodArg::Rank)]
    method: MethodArg,

    /// Folder with the reference data (GENESETS, MAGMA_ANNOT, drug metadata)
    #[arg(long, default_value = "DATA")]
    data_dir: PathBuf,

    /// Folder for all results
    #[arg(long, default_value = "OUTPUT")]
    out_dir: PathBuf,

    /// Folder containing compute_corrs.R and compute_lnreg.R
    #[arg(long, default_value = ".")]
    scripts_dir: PathBuf,

    /// MAGMA executable
    #[arg(long, default_value = "magma")]
    magma: PathBuf,

    /// Rscript executable
    #[arg(long, default_value = "Rscript")]
    rscript: PathBuf,
}

/// The name of a choice as it is written on the command line
fn choice<T: ValueEnum>(value: &T) -> String {
    value
        .to_possible_value()
        .map_or_else(String::new, |v| v.get_name().to_string())
}

impl Cli {
    /// One `name = value` pair per option, in the order of `--help`
    fn arguments(&self) -> Vec<(&'static str, String)> {
        vec![
            ("geneassoc", self.geneassoc.display().to_string()),
            ("drugsets", choice(&self.drugsets)),
            ("out", self.out.clone()),
            ("conditional", choice(&self.conditional)),
            ("setsize", self.setsize.to_string()),
            ("id", choice(&self.naming)),
            (
                "enrich",
                self.enrich.as_ref().map_or_else(|| "None".to_string(), choice),
            ),
            ("nsize", self.nsize.to_string()),
            ("showlog", choice(&self.showlog)),
            ("method", choice(&self.method)),
            ("data_dir", self.data_dir.display().to_string()),
            ("out_dir", self.out_dir.display().to_string()),
            ("scripts_dir", self.scripts_dir.display().to_string()),
            ("magma", self.magma.display().to_string()),
            ("rscript", self.rscript.display().to_string()),
        ]
    }

    fn into_config(self) -> Config {
        let drugsets = match self.drugsets {
            DrugSetsArg::Solo => DrugSets::Solo,
            DrugSetsArg::Atc => DrugSets::Atc,
            DrugSetsArg::Moa => DrugSets::Moa,
            DrugSetsArg::Ind => DrugSets::Ind,
        };
        let mut config = Config::new(self.geneassoc, drugsets, &self.out);
        config.conditional = self.conditional.into();
        config.setsize = self.setsize;
        config.naming = match self.naming {
            NamingArg::Entrez => GeneNaming::Entrez,
            NamingArg::Ensembl => GeneNaming::Ensembl,
            NamingArg::Ensembl92 => GeneNaming::Ensembl92,
        };
        config.enrich = self.enrich.map(|enrich| match enrich {
            EnrichArg::Atc => EnrichGroup::Atc,
            EnrichArg::Moa => EnrichGroup::Moa,
            EnrichArg::Ind => EnrichGroup::Ind,
            EnrichArg::All => EnrichGroup::All,
        });
        config.method = match self.method {
            MethodArg::Rank => EnrichMethod::Rank,
            MethodArg::Regression => EnrichMethod::Regression,
        };
        config.nsize = self.nsize;
        config.showlog = self.showlog.into();
        config.magma = self.magma;
        config.rscript = self.rscript;
        config.layout = Layout::new(self.data_dir, self.out_dir, self.scripts_dir);
        config
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    println!("\n| ----- Welcome to DRUGSETS v{} ----- |\n", env!("CARGO_PKG_VERSION"));
    println!("Reading input...\n");
    println!("Input arguments used:\n");
    for (name, value) in cli.arguments() {
        println!("\t {name} = {value}");
    }

    let config = cli.into_config();
    let analysis = Analysis::new(config).context("invalid input")?;
    let report = analysis.run().context("drug gene set analysis failed")?;

    tracing::info!(
        warnings = report.warnings,
        enrichment_files = report.enrichment_files.len(),
        "analysis finished"
    );
    Ok(())
}
