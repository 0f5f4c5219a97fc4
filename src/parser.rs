//! Parsing the files exchanged with MAGMA
//!
//! - [`gsa`]: results of the competitive gene set analysis (`.gsa.out`)
//! - [`geneset`]: gene set annotation files handed to MAGMA

pub mod geneset;
pub mod gsa;
