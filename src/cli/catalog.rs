use clap::{Args, Subcommand};

use crate::catalog::store::{Catalog, CatalogEntry};
use crate::cli::{OutputFormat, SourceArgs};
use crate::core::types::MoleculeId;
use crate::utils::normalize::format_shifts;

#[derive(Args)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommands,
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// Per-source spectrum, molecule and name counts
    Summary {
        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Name and every spectrum of one molecule
    Show {
        /// Qualified molecule id (e.g. "HMDB-161")
        #[arg(required = true)]
        id: String,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Every catalogued spectrum in key order
    Dump {
        #[command(flatten)]
        sources: SourceArgs,
    },
}

/// Execute catalog subcommand
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or the molecule is unknown.
pub fn run(args: CatalogArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    match args.command {
        CatalogCommands::Summary { sources } => run_summary(&load(&sources, verbose)?, format),
        CatalogCommands::Show { id, sources } => run_show(&load(&sources, verbose)?, &id, format),
        CatalogCommands::Dump { sources } => run_dump(&load(&sources, verbose)?, format),
    }
}

fn load(sources: &SourceArgs, verbose: bool) -> anyhow::Result<Catalog> {
    let catalog = Catalog::load(&sources.pipeline_config()?)?;
    if verbose {
        eprintln!("Loaded catalog with {} spectra", catalog.len());
    }
    Ok(catalog)
}

fn run_summary(catalog: &Catalog, format: OutputFormat) -> anyhow::Result<()> {
    let summary = catalog.summary();
    match format {
        OutputFormat::Text => {
            println!("Spectrum Catalog ({} spectra)\n", catalog.len());
            println!("{:<8} {:>10} {:>10} {:>10}", "Source", "Spectra", "Molecules", "Names");
            println!("{}", "-".repeat(41));
            for (source, counts) in &summary {
                println!(
                    "{:<8} {:>10} {:>10} {:>10}",
                    source.prefix(),
                    counts.spectra,
                    counts.molecules,
                    counts.names
                );
            }
        }
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = summary
                .iter()
                .map(|(source, counts)| {
                    serde_json::json!({
                        "source": source,
                        "spectra": counts.spectra,
                        "molecules": counts.molecules,
                        "names": counts.names,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("source\tspectra\tmolecules\tnames");
            for (source, counts) in &summary {
                println!(
                    "{}\t{}\t{}\t{}",
                    source.prefix(),
                    counts.spectra,
                    counts.molecules,
                    counts.names
                );
            }
        }
    }
    Ok(())
}

fn run_show(catalog: &Catalog, id: &str, format: OutputFormat) -> anyhow::Result<()> {
    let molecule_id = MoleculeId::new(id);
    let spectra = catalog.spectra_for(&molecule_id);
    let name = catalog.name(&molecule_id);
    if spectra.is_empty() && name.is_none() {
        anyhow::bail!("Molecule '{}' not found", id);
    }

    match format {
        OutputFormat::Text => {
            println!("Molecule: {}\n", name.unwrap_or("-"));
            println!("ID:       {}", molecule_id);
            println!("Spectra:  {}", spectra.len());
            for entry in &spectra {
                println!(
                    "\n{} ({} shifts)\n  {}",
                    entry.key.spectrum_id,
                    entry.shifts.len(),
                    format_shifts(entry.shifts.as_slice(), ", ")
                );
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "id": molecule_id,
                "name": name,
                "spectra": spectra
                    .iter()
                    .map(|e| serde_json::json!({
                        "spectrum_id": e.key.spectrum_id,
                        "shifts": e.shifts,
                    }))
                    .collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => print_tsv_entries(catalog, &spectra),
    }
    Ok(())
}

fn run_dump(catalog: &Catalog, format: OutputFormat) -> anyhow::Result<()> {
    let mut entries: Vec<&CatalogEntry> = catalog.entries().iter().collect();
    entries.sort_by(|a, b| a.key.cmp(&b.key));

    match format {
        OutputFormat::Text => {
            for e in &entries {
                println!(
                    "{}\t{}\t{}",
                    e.key,
                    catalog.name(&e.key.molecule_id).unwrap_or(""),
                    format_shifts(e.shifts.as_slice(), ",")
                );
            }
        }
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = entries
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "source": e.source,
                        "id": e.key.molecule_id,
                        "spectrum_id": e.key.spectrum_id,
                        "name": catalog.name(&e.key.molecule_id),
                        "shifts": e.shifts,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => print_tsv_entries(catalog, &entries),
    }
    Ok(())
}

fn print_tsv_entries(catalog: &Catalog, entries: &[&CatalogEntry]) {
    println!("id\tspectrum_id\tname\tshifts");
    for e in entries {
        println!(
            "{}\t{}\t{}\t{}",
            e.key.molecule_id,
            e.key.spectrum_id,
            catalog.name(&e.key.molecule_id).unwrap_or(""),
            format_shifts(e.shifts.as_slice(), ",")
        );
    }
}
