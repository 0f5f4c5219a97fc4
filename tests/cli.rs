use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

const GENESETS: &str = "drugA\tDB01\tx\t1\t2\t3\n\
    drugB\tDB02\tx\t1\t2\n\
    drugC\tDB03\tx\t1\t2\t3\t4\n";

const METADATA: &str = "DRUG\tATC3\tMOA\tIND\n\
    drugA\tN05A\tX\tpain\n\
    drugB\tC10A\tY\t\n\
    drugC\tN05A;N06A\tX\tpain\n";

const GSA_OUT: &str = "# TOTAL_GENES = 100\n\
    VARIABLE TYPE NGENES BETA BETA_STD SE P\n\
    drugA SET 3 0.2 0.01 0.1 0.01\n\
    drugB SET 2 0.1 0.01 0.1 0.5\n\
    drugC SET 4 0.3 0.01 0.1 0.001\n";

/// Creates the reference data folder and returns the working directory
fn setup() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("DATA");
    fs::create_dir_all(data.join("GENESETS")).unwrap();
    fs::create_dir_all(data.join("MAGMA_ANNOT")).unwrap();
    fs::write(data.join("GENESETS").join("entrez_cond_sets.txt"), GENESETS).unwrap();
    fs::write(data.join("GENESETS").join("entrez_genesets.txt"), GENESETS).unwrap();
    fs::write(data.join("MAGMA_ANNOT").join("trait.genes.raw"), "GENE CHR\n").unwrap();
    fs::write(data.join("entrez_meta.tsv"), METADATA).unwrap();
    tmp
}

/// A stand-in for MAGMA that writes a log, a copy of the gene sets and the results
#[cfg(unix)]
fn fake_magma(dir: &Path, exit_code: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
        "#!/bin/sh\n\
        while [ \"$#\" -gt 0 ]; do\n\
          case \"$1\" in\n\
            --out) out=\"$2\"; shift;;\n\
            --set-annot) sets=\"$2\"; shift;;\n\
            --model) model=\"$2\"; shift;;\n\
          esac\n\
          shift\n\
        done\n\
        if [ -n \"$model\" ]; then echo \"$model\" > \"$out.model\"; fi\n\
        printf 'WARNING: one\\nWARNING: two\\n' > \"$out.log\"\n\
        cp \"$sets\" \"$out.sets\"\n\
        cat > \"$out.gsa.out\" <<EOF\n{GSA_OUT}EOF\n\
        exit {exit_code}\n"
    );
    let path = dir.join("magma");
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn drugsets(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("drugsets").unwrap();
    cmd.current_dir(workdir);
    cmd
}

#[test]
fn cli_help_smoke() {
    let mut cmd = Command::cargo_bin("drugsets").unwrap();
    cmd.arg("--help");
    cmd.assert().success();
}

#[test]
fn rejects_wrong_suffix() {
    let tmp = setup();
    drugsets(tmp.path())
        .args(["-g", "trait.genes.out", "-d", "solo", "-o", "trait"])
        .assert()
        .failure();
    assert!(!tmp.path().join("OUTPUT").exists());
}

#[test]
fn rejects_enrichment_of_grouped_sets() {
    let tmp = setup();
    let output = drugsets(tmp.path())
        .args(["-g", "trait.genes.raw", "-d", "atc", "-o", "trait", "-e", "atc"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("must be set to \"solo\""));
    assert!(!tmp.path().join("OUTPUT").exists());
}

#[test]
fn rejects_missing_reference_data() {
    let tmp = setup();
    fs::remove_file(tmp.path().join("DATA").join("entrez_meta.tsv")).unwrap();
    let output = drugsets(tmp.path())
        .args(["-g", "trait.genes.raw", "-d", "solo", "-o", "trait", "-e", "moa"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("entrez_meta.tsv"));
}

#[cfg(unix)]
#[test]
fn runs_magma_and_enrichment() {
    let tmp = setup();
    let magma = fake_magma(tmp.path(), 0);
    let output = drugsets(tmp.path())
        .args(["-g", "trait.genes.raw", "-d", "solo", "-o", "trait", "-e", "moa", "-n", "1"])
        .arg("--magma")
        .arg(&magma)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("drugsets = solo"));
    assert!(stdout.contains("enrich = moa"));
    assert!(!stdout.contains("DrugSetsArg"));
    assert!(stdout.contains("2 warnings found"));
    assert!(stdout.contains("trait.gsa.out"));
    assert!(stdout.contains("trait.gsa.set.genes.out"));

    let out = tmp.path().join("OUTPUT");
    assert_eq!(fs::read_to_string(out.join("trait.model")).unwrap(), "condition=druggable\n");

    let all = fs::read_to_string(out.join("trait_moa_enrichment.csv")).unwrap();
    let groups: Vec<&str> = all
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap())
        .collect();
    assert_eq!(groups, vec!["X", "Y"]);
    assert!(out.join("trait_moa_enrichment_bonf.csv").exists());
}

#[cfg(unix)]
#[test]
fn enrichment_of_all_schemes() {
    let tmp = setup();
    let magma = fake_magma(tmp.path(), 0);
    drugsets(tmp.path())
        .args(["-g", "trait.genes.raw", "-d", "solo", "-o", "trait", "-e", "all", "-n", "1"])
        .arg("--magma")
        .arg(&magma)
        .assert()
        .success();

    let out = tmp.path().join("OUTPUT");
    for scheme in ["atc", "moa", "ind"] {
        assert!(out.join(format!("trait_{scheme}_enrichment.csv")).exists());
        assert!(out.join(format!("trait_{scheme}_enrichment_bonf.csv")).exists());
    }
}

#[cfg(unix)]
#[test]
fn filters_gene_sets_by_size() {
    let tmp = setup();
    let magma = fake_magma(tmp.path(), 0);
    drugsets(tmp.path())
        .args(["-g", "trait.genes.raw", "-d", "solo", "-o", "trait", "-c", "no", "-s", "3"])
        .arg("--magma")
        .arg(&magma)
        .assert()
        .success();

    let sets = fs::read_to_string(tmp.path().join("OUTPUT").join("trait.sets")).unwrap();
    assert_eq!(
        sets,
        "drugA\tDB01\tx\t1\t2\t3\ndrugC\tDB03\tx\t1\t2\t3\t4\n"
    );
    assert!(!tmp.path().join("OUTPUT").join("trait.model").exists());

    // the filtered copy is removed, the reference file is untouched
    let filtered = tmp
        .path()
        .join("DATA/GENESETS/tmp/entrez_genesets_min3.txt");
    assert!(!filtered.exists());
    assert_eq!(
        fs::read_to_string(tmp.path().join("DATA/GENESETS/entrez_genesets.txt")).unwrap(),
        GENESETS
    );
}

#[cfg(unix)]
#[test]
fn fails_when_magma_fails() {
    let tmp = setup();
    let magma = fake_magma(tmp.path(), 1);
    let output = drugsets(tmp.path())
        .args(["-g", "trait.genes.raw", "-d", "solo", "-o", "trait", "-e", "moa", "-n", "1"])
        .arg("--magma")
        .arg(&magma)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(!String::from_utf8_lossy(&output.stdout).contains("warnings found"));
    assert!(!tmp.path().join("OUTPUT").join("trait_moa_enrichment.csv").exists());
}

#[cfg(unix)]
#[test]
fn fails_without_large_categories() {
    let tmp = setup();
    let magma = fake_magma(tmp.path(), 0);
    let output = drugsets(tmp.path())
        .args(["-g", "trait.genes.raw", "-d", "solo", "-o", "trait", "-e", "moa", "-n", "10"])
        .arg("--magma")
        .arg(&magma)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--nsize"));
    assert!(!tmp.path().join("OUTPUT").join("trait_moa_enrichment.csv").exists());
}
