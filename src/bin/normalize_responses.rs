/*
cargo run --release --bin normalize_responses -- \
    data/responses/Jewish_50_LLM_Output.json \
    data/normalized/Jewish_50_normalized.json

cargo run --release --bin normalize_responses -- \
    --config config/eval.json \
    data/responses/Jewish_50_LLM_Output.json \
    data/normalized/Jewish_50_normalized.json
*/

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use std::collections::BTreeSet;
use std::{fs, path::PathBuf};

use persona_eval::config::EvalConfig;
use persona_eval::logging::init_file_logger;
use persona_eval::report::write_issues;
use persona_eval::runs::RunMatrix;

#[derive(Parser, Debug)]
#[command(version, about = "Normalize one model-output file into numeric answer categories")]
struct Cli {
    input: PathBuf,
    output: PathBuf,

    // take excluded questions from this config
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = init_file_logger(&cli.log_dir, "normalize_responses", LevelFilter::Info)?;
    info!("Started - input: {:?}, output: {:?}", cli.input, cli.output);

    let excluded = match &cli.config {
        Some(p) => EvalConfig::load(p)?.excluded_questions,
        None => BTreeSet::new(),
    };

    let matrix = RunMatrix::load(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let normalized = matrix.normalize(&excluded);

    let issues: Vec<String> = normalized
        .unanswered()
        .into_iter()
        .map(|q| format!("{q}: no run produced a usable answer"))
        .collect();
    for issue in &issues {
        warn!("{issue}");
    }

    if let Some(dir) = cli.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(&cli.output, serde_json::to_string_pretty(&normalized)?)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    info!("{} runs normalized into {}", matrix.run_count(), cli.output.display());
    println!("Output written to {}", cli.output.display());

    if let Some(p) = write_issues(&cli.output, &issues)? {
        println!("{} questions without a usable answer, see {}", issues.len(), p.display());
    }
    println!("Log: {}", log_path.display());
    Ok(())
}
