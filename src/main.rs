use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, Command};
use tracing::{error, info};

use splitannot::config::{parse_delimiter, FileConfig};
use splitannot::logging::init_logging;
use splitannot::{run, RunConfig, UnknownTagPolicy};

fn main() -> Result<()> {
    let matches = Command::new("splitannot")
        .version("0.2")
        .about("Splits the Annotation and Functional Impact columns of cBioPortal mutation tables into one column per field.")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .help("Input TSV file or folder of TSVs (searched recursively)")
                .num_args(1..)
                .action(ArgAction::Append)
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Output folder for <name>_cleaned.tsv files")
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("TOML file with workers, delimiter, unknown_tags and schema")
                .num_args(1),
        )
        .arg(
            Arg::new("workers")
                .short('j')
                .long("workers")
                .help("Number of reader threads")
                .num_args(1)
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("delimiter")
                .long("delimiter")
                .help("Column delimiter for input and output (default: tab)")
                .num_args(1),
        )
        .arg(
            Arg::new("unknown_tags")
                .long("unknown-tags")
                .help("What to do with tags outside the schema")
                .num_args(1)
                .value_parser(["ignore", "warn", "fail"]),
        )
        .arg(
            Arg::new("combined")
                .long("combined")
                .help("Also write every cleaned table into this single file")
                .num_args(1),
        )
        .arg(
            Arg::new("summary")
                .long("summary")
                .help("Print per-tag counts after the run")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Debug logging")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    init_logging(matches.get_flag("verbose"));

    let inputs: Vec<PathBuf> = matches
        .get_many::<String>("input")
        .map(|vals| vals.map(PathBuf::from).collect())
        .unwrap_or_default();
    let output_dir = matches
        .get_one::<String>("output")
        .map(PathBuf::from)
        .context("--output is required")?;

    let mut config = RunConfig::new(inputs, output_dir);
    if let Some(path) = matches.get_one::<String>("config") {
        let file = FileConfig::from_path(Path::new(path))
            .with_context(|| format!("failed to load config {}", path))?;
        config.apply_file(file)?;
    }
    if let Some(workers) = matches.get_one::<usize>("workers") {
        config.workers = *workers;
    }
    if let Some(delimiter) = matches.get_one::<String>("delimiter") {
        config.delimiter = parse_delimiter(delimiter)?;
    }
    if let Some(policy) = matches.get_one::<String>("unknown_tags") {
        config.unknown_tags = policy.parse::<UnknownTagPolicy>()?;
    }
    config.combined = matches.get_one::<String>("combined").map(PathBuf::from);

    let report = run(&config).context("cleanup run failed")?;

    if matches.get_flag("summary") {
        print!("{}", report.summary.report());
    }
    info!(
        "Summary: written {}, failed {}, empty {}",
        report.written.len(),
        report.failures.len(),
        report.warnings.len()
    );

    if !report.is_success() {
        for (path, e) in &report.failures {
            error!("{}: {}", path.display(), e);
        }
        bail!("{} of the inputs could not be cleaned", report.failures.len());
    }
    Ok(())
}
