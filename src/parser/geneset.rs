//! Module to filter MAGMA gene set annotation files by gene set size
//!
//! Each line describes one gene set, all columns are tab-separated:
//!
//! ```text
//! metformin   DB00331   biguanide   5468   5465   5563   5562
//! aspirin     DB00945   salicylate  5742   5743
//! ```
//!
//! The first three columns describe the set, all remaining columns
//! are the member genes.
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::{DrugsetError, DrugsetResult};

/// Number of leading columns that describe the gene set
pub const DESCRIPTION_COLUMNS: usize = 3;

/// Returns the number of member genes of a gene set line
///
/// # Examples
///
/// ```
/// use drugsets::parser::geneset::set_size;
///
/// assert_eq!(set_size("aspirin\tDB00945\tsalicylate\t5742\t5743"), 2);
/// assert_eq!(set_size("aspirin\tDB00945"), 0);
/// ```
pub fn set_size(line: &str) -> usize {
    let line = line.trim_end_matches(['\n', '\r']);
    line.split('\t').count().saturating_sub(DESCRIPTION_COLUMNS)
}

/// Copies all gene sets with at least `min_size` genes from `reader` to `writer`
///
/// The order of the gene sets is preserved. Returns the number of
/// (kept, total) gene sets.
///
/// # Errors
///
/// [`DrugsetError::Io`]: Reading or writing fails
pub fn filter<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
    min_size: usize,
) -> DrugsetResult<(usize, usize)> {
    let mut line = String::new();
    let mut kept = 0usize;
    let mut total = 0usize;
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        total += 1;
        if set_size(&line) >= min_size {
            writer.write_all(line.as_bytes())?;
            kept += 1;
        }
    }
    writer.flush()?;
    Ok((kept, total))
}

/// Writes a copy of the gene set file `source` to `target` that only contains
/// gene sets with at least `min_size` genes
///
/// The source file is never modified. The parent folder of `target` is created
/// if needed. If no gene set passes the filter, `target` is an empty file.
///
/// # Errors
///
/// - [`DrugsetError::CannotOpenFile`]: `source` is not present or can't be opened
/// - [`DrugsetError::InvalidInput`]: `source` and `target` are the same file
/// - [`DrugsetError::Io`]: Reading or writing fails
pub fn filter_file<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    target: Q,
    min_size: usize,
) -> DrugsetResult<()> {
    let source = source.as_ref();
    let target = target.as_ref();
    if source == target {
        return Err(DrugsetError::InvalidInput(format!(
            "refusing to overwrite gene set file {}",
            source.display()
        )));
    }

    let reader = BufReader::new(
        File::open(source)
            .map_err(|_| DrugsetError::CannotOpenFile(source.display().to_string()))?,
    );
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(target)?);

    let (kept, total) = filter(reader, writer, min_size)?;
    info!(
        "Kept {kept} of {total} gene sets with at least {min_size} genes in {}",
        target.display()
    );
    if kept == 0 {
        debug!("{} is empty", target.display());
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn line(name: &str, genes: usize) -> String {
        let genes: Vec<String> = (0..genes).map(|g| (100 + g).to_string()).collect();
        format!("{name}\tDB0000\tdesc\t{}\n", genes.join("\t"))
    }

    #[test]
    fn size_of_line() {
        assert_eq!(set_size(&line("a", 3)), 3);
        assert_eq!(set_size(&line("a", 6)), 6);
        assert_eq!(set_size("a\tb\tc\t1\r\n"), 1);
    }

    #[test]
    fn keeps_large_sets_in_order() {
        let input = [line("three", 3), line("four", 4), line("five", 5), line("six", 6)].concat();
        let mut output = Vec::new();
        let (kept, total) = filter(input.as_bytes(), &mut output, 4).unwrap();
        assert_eq!((kept, total), (3, 4));

        let expected = [line("four", 4), line("five", 5), line("six", 6)].concat();
        assert_eq!(String::from_utf8(output).unwrap(), expected);
    }

    #[test]
    fn keeps_all_at_low_threshold() {
        let input = [line("six", 6), line("three", 3)].concat();
        let mut output = Vec::new();
        filter(input.as_bytes(), &mut output, 2).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), input);
    }

    #[test]
    fn keeps_nothing_at_high_threshold() {
        let input = [line("three", 3), line("four", 4)].concat();
        let mut output = Vec::new();
        let (kept, _) = filter(input.as_bytes(), &mut output, 10).unwrap();
        assert_eq!(kept, 0);
        assert!(output.is_empty());
    }

    #[test]
    fn last_line_without_newline() {
        let input = "a\tb\tc\t1\t2\nd\te\tf\t1\t2\t3";
        let mut output = Vec::new();
        filter(input.as_bytes(), &mut output, 3).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "d\te\tf\t1\t2\t3");
    }

    #[test]
    fn filter_file_creates_copy() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("entrez_genesets.txt");
        let target = dir.path().join("tmp").join("entrez_genesets_min4.txt");
        let input = [line("three", 3), line("four", 4)].concat();
        fs::write(&source, &input).unwrap();

        filter_file(&source, &target, 4).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), line("four", 4));
        assert_eq!(fs::read_to_string(&source).unwrap(), input);
    }

    #[test]
    fn filter_file_refuses_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("sets.txt");
        fs::write(&source, line("four", 4)).unwrap();
        assert!(filter_file(&source, &source, 2).is_err());
    }
}
