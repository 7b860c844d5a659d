use std::io::{stderr, stdin, Write};
use std::path::Path;

use anyhow::{Context, Result};

use splitannot::rename::{normalize, positional_name};
use splitannot::schema::{Schema, TagSpec};
use splitannot::split::{split_subfields, strip_label};
use splitannot::table::read_table;
use splitannot::{Reshaper, UnknownTagPolicy};

pub fn main() -> Result<()> {
    // Parse command-line argument for the table path
    let table_path = match std::env::args().nth(1) {
        Some(p) => p,
        None => {
            eprintln!("Usage: annotview <mutations.tsv>");
            std::process::exit(1);
        }
    };

    let table = read_table(Path::new(&table_path), b'\t')
        .with_context(|| format!("failed to read {}", table_path))?;
    let reshaper = Reshaper::new(Schema::default(), UnknownTagPolicy::Ignore)?;
    let schema = reshaper.schema();

    let passthrough: Vec<&String> = table
        .columns
        .iter()
        .filter(|c| !schema.is_source_column(c))
        .collect();

    for (i, record) in table.records.iter().enumerate() {
        println!("================ RECORD {} ================", i + 1);

        for column in &passthrough {
            println!("{}: {}", column, record.get(column));
        }

        for source in &schema.sources {
            if !table.has_column(&source.column) {
                continue;
            }
            let Some(extractor) = reshaper.extractor(&source.column) else {
                continue;
            };
            let raw = record.get(&source.column);
            println!("{} (raw): {}", source.column, raw);

            let extraction = extractor.extract(raw);
            // Tags in schema order, then anything the schema does not know.
            for spec in &source.tags {
                if let Some(value) = extraction.get(&spec.tag) {
                    print_tag(spec, value);
                }
            }
            for tag in &extraction.unknown {
                println!("  {}: <unrecognized, dropped>", tag);
            }
        }

        // Pause for user input
        if !prompt_for_next_record()? {
            println!("Quitting...");
            break;
        }
    }

    Ok(())
}

fn print_tag(spec: &TagSpec, value: &str) {
    let parts = if spec.is_scalar() {
        vec![value]
    } else {
        split_subfields(value)
    };
    for (position, part) in parts.into_iter().enumerate() {
        let (label, cleaned, column) = match spec.fields.get(position) {
            Some(field) => {
                let sub = strip_label(part, &field.strip);
                (sub.label, sub.value, field.name.clone())
            }
            None => (None, part, format!("{} (not in schema)", positional_name(&spec.tag, position))),
        };
        println!(
            "  {}[{}] {} -> {} = {}",
            spec.tag,
            position,
            label.unwrap_or("-"),
            column,
            normalize(cleaned)
        );
    }
}

/// Prompt user to press Enter for next record, or 'q' to quit.
fn prompt_for_next_record() -> Result<bool> {
    eprint!("Press Enter for next record, or 'q' then Enter to quit: ");
    stderr().flush()?;

    let mut input = String::new();
    if stdin().read_line(&mut input)? == 0 {
        return Ok(false);
    }
    if input.trim().eq_ignore_ascii_case("q") {
        return Ok(false);
    }
    Ok(true)
}
