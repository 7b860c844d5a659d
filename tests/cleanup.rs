use std::fs;
use std::path::{Path, PathBuf};

use splitannot::table::read_table;
use splitannot::{run, CleanupError, RunConfig, UnknownTagPolicy};

const HEADER: &str = "Sample ID\tGene\tProtein Change\tAnnotation\tFunctional Impact";

fn write_batch(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut body = String::from(HEADER);
    body.push('\n');
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    fs::write(&path, body).unwrap();
    path
}

fn config(inputs: Vec<PathBuf>, out: &Path) -> RunConfig {
    let mut config = RunConfig::new(inputs, out);
    config.workers = 2;
    config
}

#[test]
fn cleans_a_folder_of_tables() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_batch(
        input.path(),
        "TP53.tsv",
        &[
            "S1\tTP53\tR175H\tOncoKB: Oncogenic,level 1,resistance NA;CancerHotspot: yes\tSIFT: impact: deleterious, score: 0;Polyphen-2: impact: probably_damaging, score: 1",
            "S2\tTP53\tP72R\tCancerHotspot: no\tSIFT: impact: tolerated, score: 0.6",
        ],
    );
    write_batch(
        input.path(),
        "KRAS.tsv",
        &["S3\tKRAS\tG12D\tOncoKB: Oncogenic,level 3,resistance None\tAlphaMissense: pathogenicity: likely_pathogenic, score: 0.98"],
    );

    let report = run(&config(vec![input.path().to_path_buf()], output.path())).unwrap();
    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.written.len(), 2);
    assert_eq!(report.summary.records, 3);

    let tp53 = read_table(&output.path().join("TP53_cleaned.tsv"), b'\t').unwrap();
    assert_eq!(
        tp53.columns,
        vec![
            "Sample ID",
            "Gene",
            "Protein Change",
            "OncoKB",
            "OncoKB_level",
            "OncoKB_resistance",
            "CancerHotspot",
            "SIFT_impact",
            "SIFT_score",
            "Polyphen-2_impact",
            "Polyphen-2_score",
        ]
    );
    let first = &tp53.records[0];
    assert_eq!(first.get("OncoKB"), "Oncogenic");
    assert_eq!(first.get("OncoKB_level"), "1");
    assert_eq!(first.get("SIFT_impact"), "deleterious");
    assert_eq!(first.get("Polyphen-2_score"), "1");

    let second = &tp53.records[1];
    assert!(second.contains("OncoKB"));
    assert_eq!(second.get("OncoKB"), "");
    assert_eq!(second.get("Polyphen-2_impact"), "");
    assert_eq!(second.get("SIFT_score"), "0.6");

    let kras = read_table(&output.path().join("KRAS_cleaned.tsv"), b'\t').unwrap();
    assert_eq!(kras.records[0].get("OncoKB_resistance"), "None");
    assert_eq!(kras.records[0].get("AlphaMissense_pathogenicity"), "likely_pathogenic");
    assert!(!kras.has_column("Annotation"));
    assert!(!kras.has_column("Functional Impact"));
}

#[test]
fn malformed_batch_writes_nothing_and_others_continue() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let bad = write_batch(
        input.path(),
        "BRAF.tsv",
        &[
            "S1\tBRAF\tV600E\treVUE: yes\tSIFT: impact: deleterious, score: 0",
            "S2\tBRAF\tV600K\treVUE: no\tSIFT: effect: deleterious, score: 0",
        ],
    );
    let good = write_batch(input.path(), "EGFR.tsv", &["S3\tEGFR\tL858R\treVUE: yes\t"]);

    let report = run(&config(vec![bad, good], output.path())).unwrap();
    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].1,
        CleanupError::MalformedAnnotation { .. }
    ));
    assert!(!output.path().join("BRAF_cleaned.tsv").exists());
    assert!(output.path().join("EGFR_cleaned.tsv").exists());
}

#[test]
fn missing_input_is_reported_not_fatal() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let good = write_batch(input.path(), "PIK3CA.tsv", &["S1\tPIK3CA\tH1047R\t3DHotspot: yes\t"]);
    let missing = input.path().join("NRAS.tsv");

    let report = run(&config(vec![good, missing.clone()], output.path())).unwrap();
    assert_eq!(report.written.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, missing);
    assert!(matches!(
        report.failures[0].1,
        CleanupError::InputNotFound { .. }
    ));
}

#[test]
fn empty_batch_writes_header_with_diagnostic() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let empty = write_batch(input.path(), "ALK.tsv", &[]);

    let report = run(&config(vec![empty], output.path())).unwrap();
    assert!(report.is_success());
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(report.warnings[0], CleanupError::EmptyBatch(_)));
    let body = fs::read_to_string(output.path().join("ALK_cleaned.tsv")).unwrap();
    assert_eq!(body, "Sample ID\tGene\tProtein Change\n");
}

#[test]
fn combined_output_is_ordered_by_source() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let b = write_batch(input.path(), "b_IDH1.tsv", &["S2\tIDH1\tR132H\treVUE: no\t"]);
    let a = write_batch(input.path(), "a_IDH2.tsv", &["S1\tIDH2\tR140Q\tCancerHotspot: yes\t"]);
    let combined = output.path().join("all").join("combined.tsv");

    let mut cfg = config(vec![b.clone(), a.clone()], output.path());
    cfg.combined = Some(combined.clone());
    let report = run(&cfg).unwrap();
    assert!(report.written.contains(&combined));

    let merged = read_table(&combined, b'\t').unwrap();
    assert_eq!(merged.columns[0], "source_file");
    assert_eq!(merged.records.len(), 2);
    assert_eq!(merged.records[0].get("source_file"), a.display().to_string());
    assert_eq!(merged.records[0].get("CancerHotspot"), "yes");
    assert_eq!(merged.records[0].get("reVUE"), "");
    assert_eq!(merged.records[1].get("reVUE"), "no");
}

#[test]
fn unknown_tags_fail_the_batch_when_strict() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let path = write_batch(
        input.path(),
        "MET.tsv",
        &["S1\tMET\tX1010_splice\tMyCancerGenome: listed;reVUE: yes\t"],
    );

    let mut cfg = config(vec![path.clone()], output.path());
    let lenient = run(&cfg).unwrap();
    assert!(lenient.is_success());
    assert_eq!(lenient.summary.unknown_counts["MyCancerGenome"], 1);

    cfg.unknown_tags = UnknownTagPolicy::Fail;
    let strict = run(&cfg).unwrap();
    assert!(matches!(strict.failures[0].1, CleanupError::UnknownTag { .. }));
}

#[test]
fn same_named_tables_in_subfolders_keep_separate_outputs() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    for (sub, change) in [("a", "R175H"), ("b", "R248Q")] {
        let dir = input.path().join(sub);
        fs::create_dir_all(&dir).unwrap();
        write_batch(&dir, "TP53.tsv", &[&format!("S1\tTP53\t{}\treVUE: yes\t", change)]);
    }

    let report = run(&config(vec![input.path().to_path_buf()], output.path())).unwrap();
    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.written.len(), 2);

    let a = read_table(&output.path().join("a").join("TP53_cleaned.tsv"), b'\t').unwrap();
    let b = read_table(&output.path().join("b").join("TP53_cleaned.tsv"), b'\t').unwrap();
    assert_eq!(a.records[0].get("Protein Change"), "R175H");
    assert_eq!(b.records[0].get("Protein Change"), "R248Q");
    assert!(!output.path().join("TP53_cleaned.tsv").exists());
}

#[test]
fn same_named_files_do_not_overwrite_each_other() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let mut paths = Vec::new();
    for (sub, change) in [("a", "R175H"), ("b", "R248Q")] {
        let dir = input.path().join(sub);
        fs::create_dir_all(&dir).unwrap();
        paths.push(write_batch(
            &dir,
            "TP53.tsv",
            &[&format!("S1\tTP53\t{}\treVUE: yes\t", change)],
        ));
    }

    let report = run(&config(paths.clone(), output.path())).unwrap();
    assert_eq!(report.written.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, paths[1]);
    assert!(matches!(
        report.failures[0].1,
        CleanupError::Configuration(_)
    ));
    let kept = read_table(&output.path().join("TP53_cleaned.tsv"), b'\t').unwrap();
    assert_eq!(kept.records[0].get("Protein Change"), "R175H");
}

#[test]
fn combined_write_failure_is_reported_with_batch_outputs() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let path = write_batch(input.path(), "IDH1.tsv", &["S1\tIDH1\tR132H\treVUE: no\t"]);
    let combined = output.path().join("combined.tsv");
    fs::create_dir_all(&combined).unwrap();

    let mut cfg = config(vec![path], output.path());
    cfg.combined = Some(combined.clone());
    let report = run(&cfg).unwrap();
    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, combined);
    assert_eq!(report.written, vec![output.path().join("IDH1_cleaned.tsv")]);
    assert_eq!(report.summary.records, 1);
}
