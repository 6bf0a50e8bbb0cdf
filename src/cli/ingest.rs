use clap::Args;
use tracing::{error, info};

use crate::catalog::codec::write_source_tables;
use crate::catalog::reader::{IngestReport, SourceReader};
use crate::cli::{configure_threads, OutputFormat, SourceArgs};
use crate::parsing::{ParserOptions, DEFAULT_NUCLEUS};

#[derive(Args)]
pub struct IngestArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Isotope label a spectrum must target to be kept
    #[arg(long, default_value = DEFAULT_NUCLEUS)]
    pub nucleus: String,

    /// Keep only BMRB assigned shifts of this atom type (e.g. "C")
    #[arg(long)]
    pub bmrb_atom_type: Option<String>,

    /// Worker threads for parsing (default: one per core)
    #[arg(long)]
    pub threads: Option<usize>,
}

/// Execute ingest subcommand
///
/// A source whose directory is missing or whose tables cannot be written is
/// reported and skipped; the remaining sources are still ingested.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or every source failed.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: IngestArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    configure_threads(args.threads)?;
    let config = args.sources.pipeline_config()?;
    let options = ParserOptions {
        nucleus: args.nucleus.clone(),
        bmrb_atom_type: args.bmrb_atom_type.clone(),
    };

    let mut reports = Vec::new();
    for source in &config.sources {
        let reader = SourceReader::new(source.source, &options);
        let (tables, report) = match reader.read_dir(&source.input_dir) {
            Ok(result) => result,
            Err(e) => {
                error!(source = %source.source, error = %e, "Skipping source");
                continue;
            }
        };

        let out_dir = source.catalog_dir();
        if let Err(e) = write_source_tables(out_dir, &tables) {
            error!(source = %source.source, dir = %out_dir.display(), error = %e, "Failed to write catalog tables");
            continue;
        }
        info!(source = %source.source, dir = %out_dir.display(), "Wrote catalog tables");
        reports.push(report);
    }

    if reports.is_empty() {
        anyhow::bail!("No source could be ingested");
    }

    match format {
        OutputFormat::Text => print_text_reports(&reports, verbose),
        OutputFormat::Json => print_json_reports(&reports)?,
        OutputFormat::Tsv => print_tsv_reports(&reports),
    }
    Ok(())
}

fn print_text_reports(reports: &[IngestReport], verbose: bool) {
    for r in reports {
        println!(
            "{}: {} spectra, {} names from {} files ({} parsed, {} skipped, {} failed)",
            r.source,
            r.spectra,
            r.names,
            r.files_seen,
            r.files_parsed,
            r.files_skipped,
            r.files_failed
        );
        if verbose {
            println!("  └─ input: {}", r.input_dir.display());
            println!("  └─ records dropped inside files: {}", r.skipped_records);
        }
    }
}

fn print_json_reports(reports: &[IngestReport]) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "sources": reports,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_reports(reports: &[IngestReport]) {
    println!("source\tinput_dir\tfiles_seen\tfiles_parsed\tfiles_skipped\tfiles_failed\tspectra\tnames\tskipped_records");
    for r in reports {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.source,
            r.input_dir.display(),
            r.files_seen,
            r.files_parsed,
            r.files_skipped,
            r.files_failed,
            r.spectra,
            r.names,
            r.skipped_records
        );
    }
}
