use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::config::CategoryScheme;
use crate::{DrugsetError, DrugsetResult};

/// ATC level 3 codes of a single drug
///
/// Most drugs have one or two codes, so they are stored inline
pub type AtcCodes = SmallVec<[String; 2]>;

/// Separator of multiple ATC codes within one field of the metadata table
const ATC_SEPARATOR: char = ';';

/// A single drug
///
/// A drug has a unique name and belongs to zero or more
/// categories of each [`CategoryScheme`]
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Drug {
    name: String,
    atc: AtcCodes,
    moa: Option<String>,
    ind: Option<String>,
}

impl Drug {
    /// Initializes a new drug without any categories
    pub fn new(name: &str) -> Drug {
        Drug {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// The name of the drug
    pub fn name(&self) -> &str {
        &self.name
    }

    /// ATC level 3 codes
    pub fn atc(&self) -> &[String] {
        &self.atc
    }

    /// Mechanism of action
    pub fn moa(&self) -> Option<&str> {
        self.moa.as_deref()
    }

    /// Clinical indication
    pub fn ind(&self) -> Option<&str> {
        self.ind.as_deref()
    }

    /// Returns all categories of the drug within the given `scheme`
    ///
    /// # Examples
    ///
    /// ```
    /// use drugsets::{CategoryScheme, DrugMetadata};
    ///
    /// let mut metadata = DrugMetadata::default();
    /// metadata.add_drug("metformin", &["A10B"], None, Some("diabetes"));
    ///
    /// let drug = metadata.get("metformin").unwrap();
    /// assert_eq!(drug.categories(CategoryScheme::Atc), vec!["A10B"]);
    /// assert!(drug.categories(CategoryScheme::Moa).is_empty());
    /// assert_eq!(drug.categories(CategoryScheme::Ind), vec!["diabetes"]);
    /// ```
    pub fn categories(&self, scheme: CategoryScheme) -> Vec<&str> {
        match scheme {
            CategoryScheme::Atc => self.atc.iter().map(String::as_str).collect(),
            CategoryScheme::Moa => self.moa.iter().map(String::as_str).collect(),
            CategoryScheme::Ind => self.ind.iter().map(String::as_str).collect(),
        }
    }
}

/// One row of the drug metadata table
#[derive(Debug, Deserialize)]
struct MetadataRecord {
    #[serde(rename = "DRUG")]
    drug: String,
    #[serde(rename = "ATC3", default)]
    atc: Option<String>,
    #[serde(rename = "MOA", default)]
    moa: Option<String>,
    #[serde(rename = "IND", default)]
    ind: Option<String>,
}

fn non_empty(field: Option<String>) -> Option<String> {
    field
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty() && value != "NA")
}

/// The metadata of all drugs, indexed by drug name
#[derive(Default, Debug)]
pub struct DrugMetadata {
    drugs: HashMap<String, Drug>,
}

impl DrugMetadata {
    /// Reads the drug metadata from a tab-separated file
    ///
    /// The file must have a header with the columns `DRUG`, `ATC3`, `MOA`
    /// and `IND`. Multiple ATC codes are separated by `;`; empty fields
    /// (or `NA`) mean that the drug does not belong to any category.
    ///
    /// ```text
    /// DRUG        ATC3        MOA                     IND
    /// metformin   A10B        AMPK activator          type 2 diabetes
    /// aspirin     B01A;N02B   cyclooxygenase inhibitor pain
    /// ```
    ///
    /// # Errors
    ///
    /// - [`DrugsetError::CannotOpenFile`]: The file is not present or can't be opened
    /// - [`DrugsetError::Csv`]: A row does not match the expected columns
    pub fn from_file<P: AsRef<Path>>(file: P) -> DrugsetResult<Self> {
        let filename = file.as_ref().display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_path(file)
            .map_err(|_| DrugsetError::CannotOpenFile(filename.clone()))?;
        Self::from_records(reader.deserialize(), &filename)
    }

    /// Reads the drug metadata from any tab-separated reader
    ///
    /// See [`DrugMetadata::from_file`] for the expected format
    ///
    /// # Errors
    ///
    /// [`DrugsetError::Csv`]: A row does not match the expected columns
    pub fn from_reader<R: std::io::Read>(reader: R) -> DrugsetResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(reader);
        Self::from_records(reader.deserialize(), "reader")
    }

    fn from_records<I>(records: I, source: &str) -> DrugsetResult<Self>
    where
        I: Iterator<Item = Result<MetadataRecord, csv::Error>>,
    {
        let mut metadata = DrugMetadata::default();
        for record in records {
            let record = record?;
            let atc: Vec<String> = non_empty(record.atc)
                .map(|codes| {
                    codes
                        .split(ATC_SEPARATOR)
                        .map(str::trim)
                        .filter(|code| !code.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            let drug = Drug {
                name: record.drug.trim().to_string(),
                atc: atc.into_iter().collect(),
                moa: non_empty(record.moa),
                ind: non_empty(record.ind),
            };
            metadata.insert(drug);
        }
        debug!("Read {} drugs from {}", metadata.len(), source);
        Ok(metadata)
    }

    /// Adds a new drug with its categories
    ///
    /// Duplicate ATC codes are only added once. If the drug is already
    /// present, it is replaced.
    pub fn add_drug(&mut self, name: &str, atc: &[&str], moa: Option<&str>, ind: Option<&str>) {
        self.insert(Drug {
            name: name.to_string(),
            atc: atc.iter().map(|code| (*code).to_string()).collect(),
            moa: moa.map(str::to_string),
            ind: ind.map(str::to_string),
        });
    }

    fn insert(&mut self, mut drug: Drug) {
        let mut seen = AtcCodes::new();
        for code in drug.atc.drain(..) {
            if !seen.contains(&code) {
                seen.push(code);
            }
        }
        drug.atc = seen;
        if let Some(previous) = self.drugs.insert(drug.name.clone(), drug) {
            warn!("Drug {} is listed more than once", previous.name);
        }
    }

    /// Returns the drug with the given name
    pub fn get(&self, name: &str) -> Option<&Drug> {
        self.drugs.get(name)
    }

    /// The number of drugs
    pub fn len(&self) -> usize {
        self.drugs.len()
    }

    /// Returns `true` if there are no drugs
    pub fn is_empty(&self) -> bool {
        self.drugs.is_empty()
    }

    /// Iterates all drugs in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = &Drug> {
        self.drugs.values()
    }
}
