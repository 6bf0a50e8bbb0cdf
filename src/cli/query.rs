use anyhow::Context;
use clap::Args;

use crate::catalog::store::Catalog;
use crate::cli::{OutputFormat, SourceArgs};
use crate::matching::engine::{MatchResult, MatchingConfig, MatchingEngine, DEFAULT_TOP_K};
use crate::utils::normalize::{clean_display_name, format_shifts};

#[derive(Args)]
pub struct MatchArgs {
    /// Query chemical shifts (ppm) forming the first query set
    #[arg(allow_negative_numbers = true)]
    pub shifts: Vec<f64>,

    /// Additional query set as comma-separated shifts (repeatable)
    #[arg(long = "set", value_name = "SHIFTS", allow_hyphen_values = true)]
    pub sets: Vec<String>,

    /// Number of ranked results per query set
    #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_K)]
    pub top: usize,

    /// Score only the first N catalog entries
    #[arg(long)]
    pub max_entries: Option<usize>,

    /// Score on the calling thread only
    #[arg(long)]
    pub sequential: bool,

    #[command(flatten)]
    pub sources: SourceArgs,
}

/// Parse a `--set` value such as `"19.0, 53.2,178.5"`
fn parse_shift_list(raw: &str) -> anyhow::Result<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .with_context(|| format!("Invalid chemical shift '{s}' in query set '{raw}'"))
        })
        .collect()
}

fn query_sets(args: &MatchArgs) -> anyhow::Result<Vec<Vec<f64>>> {
    let mut sets = Vec::new();
    if !args.shifts.is_empty() {
        sets.push(args.shifts.clone());
    }
    for raw in &args.sets {
        sets.push(parse_shift_list(raw)?);
    }
    if sets.is_empty() {
        anyhow::bail!("No query shifts given; pass shifts as arguments or with --set");
    }
    for set in &sets {
        if let Some(bad) = set.iter().find(|v| !v.is_finite()) {
            anyhow::bail!("Query shifts must be finite numbers, got {bad}");
        }
    }
    Ok(sets)
}

/// Execute match subcommand
///
/// # Errors
///
/// Returns an error if no query is given, a required catalog table is
/// missing, or the catalog is empty.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: MatchArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let sets = query_sets(&args)?;
    let config = args.sources.pipeline_config()?;
    let catalog = Catalog::load(&config)?;

    if verbose {
        eprintln!(
            "Loaded catalog with {} spectra and {} names",
            catalog.len(),
            catalog.name_count()
        );
    }

    let engine = MatchingEngine::with_config(
        &catalog,
        MatchingConfig {
            top_k: args.top,
            max_entries: args.max_entries,
            parallel: !args.sequential,
        },
    );
    let results = engine.match_sets(&sets);

    match format {
        OutputFormat::Text => print_text_results(&sets, &results),
        OutputFormat::Json => print_json_results(&sets, &results)?,
        OutputFormat::Tsv => print_tsv_results(&results),
    }
    Ok(())
}

fn print_text_results(sets: &[Vec<f64>], results: &[Vec<MatchResult>]) {
    for (i, (set, matches)) in sets.iter().zip(results).enumerate() {
        if i > 0 {
            println!();
        }
        println!("set {i}: {}", format_shifts(set, ", "));
        println!();
        println!("score    id             molecule");
        println!("-----    --             --------");
        for m in matches {
            println!(
                "{:<7.3}  {:<10}     {}",
                m.score,
                m.molecule_id.as_str(),
                clean_display_name(&m.display_name)
            );
        }
    }
}

fn print_json_results(sets: &[Vec<f64>], results: &[Vec<MatchResult>]) -> anyhow::Result<()> {
    let output: Vec<serde_json::Value> = sets
        .iter()
        .zip(results)
        .enumerate()
        .map(|(i, (set, matches))| {
            serde_json::json!({
                "set": i,
                "query": set,
                "matches": matches
                    .iter()
                    .enumerate()
                    .map(|(rank, m)| serde_json::json!({
                        "rank": rank + 1,
                        "score": m.score,
                        "id": m.molecule_id,
                        "spectrum_id": m.spectrum_id,
                        "molecule": clean_display_name(&m.display_name),
                    }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_results(results: &[Vec<MatchResult>]) {
    println!("set\trank\tscore\tid\tspectrum_id\tmolecule");
    for (i, matches) in results.iter().enumerate() {
        for (rank, m) in matches.iter().enumerate() {
            println!(
                "{}\t{}\t{:.3}\t{}\t{}\t{}",
                i,
                rank + 1,
                m.score,
                m.molecule_id,
                m.spectrum_id,
                clean_display_name(&m.display_name)
            );
        }
    }
}
