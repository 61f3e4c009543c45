/*
cargo run --release --bin summarise_runs -- \
    --config config/eval.json \
    --output results/run_summary.csv

cargo run --release --bin summarise_runs -- \
    --config config/eval.json \
    --runs 100 --group Jewish --group Orthodox_Christian \
    --output results/run_summary_100.csv
*/

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, LevelFilter};
use std::path::PathBuf;

use persona_eval::config::EvalConfig;
use persona_eval::evaluate::{mean_squared_error, Evaluator, ResponseDir};
use persona_eval::logging::init_file_logger;
use persona_eval::reference::ReferenceFrame;
use persona_eval::report::{write_csv, write_issues};

#[derive(Parser, Debug)]
#[command(version, about = "Model vs survey mean and SD per question, with per-subgroup MSE")]
struct Cli {
    #[arg(long, default_value = "config/eval.json")]
    config: PathBuf,

    #[arg(long, default_value = "results/run_summary.csv")]
    output: PathBuf,

    // overrides for the config file
    #[arg(long)]
    reference: Option<PathBuf>,
    #[arg(long)]
    responses_dir: Option<PathBuf>,
    #[arg(long)]
    runs: Option<usize>,

    // only these subgroups (repeatable); default all
    #[arg(long = "group")]
    groups: Vec<String>,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = init_file_logger(&cli.log_dir, "summarise_runs", LevelFilter::Info)?;

    let mut cfg = EvalConfig::load(&cli.config)?;
    if let Some(p) = cli.reference { cfg.reference = p; }
    if let Some(d) = cli.responses_dir { cfg.responses_dir = d; }
    if let Some(n) = cli.runs { cfg.runs = n; }
    cfg.select_groups(&cli.groups)?;
    cfg.check()?;
    info!("Started - config: {:?}, output: {:?}", cli.config, cli.output);

    let frame = ReferenceFrame::from_csv(&cfg.reference)
        .with_context(|| format!("failed to load survey {}", cfg.reference.display()))?;
    let eval = Evaluator::new(
        &frame,
        &cfg.groups,
        ResponseDir::from_config(&cfg),
        cfg.excluded_questions.clone(),
        cfg.epsilon,
    )?;

    let bar = ProgressBar::new(eval.groups().len() as u64);
    bar.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .unwrap());

    let report = eval.run(&bar, |e, g, issues| e.summarise_group(g, issues))?;
    bar.finish_with_message("done");

    write_csv(&cli.output, &report.rows)?;
    info!("{} rows written to {}", report.rows.len(), cli.output.display());
    println!("Results written to {} ({} rows)", cli.output.display(), report.rows.len());

    println!("\nMean squared error of means per subgroup:");
    for (group, mse) in mean_squared_error(&report.rows) {
        info!("MSE {group}: {mse:.4}");
        println!("  {group:<50} {mse:.4}");
    }

    if let Some(p) = write_issues(&cli.output, &report.issues)? {
        println!("{} issues written to {}", report.issues.len(), p.display());
    }
    println!("Log: {}", log_path.display());
    Ok(())
}
