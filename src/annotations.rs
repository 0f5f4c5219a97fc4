//! Drugs and their categories make up the metadata of the drug gene sets
//!
//! Each [`Drug`] is identified by its name, the same name that is used for the
//! individual drug gene sets in MAGMA. Drugs are grouped into categories
//! according to a [`CategoryScheme`](crate::CategoryScheme):
//!
//! - ATC level 3 codes (a drug can belong to several codes)
//! - mechanism of action
//! - clinical indication
//!
//! All drugs are collected in [`DrugMetadata`].

mod drug;
pub use drug::{AtcCodes, Drug, DrugMetadata};
