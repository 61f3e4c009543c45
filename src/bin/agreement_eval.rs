/*
cargo run --release --bin agreement_eval -- \
    --config config/eval.json \
    --output results/agreement.csv

cargo run --release --bin agreement_eval -- \
    --config config/eval.json \
    --runs 100 --group Jewish --group Orthodox_Christian \
    --output results/agreement_100.csv
*/

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, LevelFilter};
use std::path::PathBuf;

use persona_eval::config::EvalConfig;
use persona_eval::evaluate::{Evaluator, ResponseDir};
use persona_eval::logging::init_file_logger;
use persona_eval::reference::ReferenceFrame;
use persona_eval::report::{write_csv, write_issues};

#[derive(Parser, Debug)]
#[command(version, about = "Accuracy, weighted alignment and Kendall tau per subgroup")]
struct Cli {
    #[arg(long, default_value = "config/eval.json")]
    config: PathBuf,

    #[arg(long, default_value = "results/agreement.csv")]
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
    let log_path = init_file_logger(&cli.log_dir, "agreement_eval", LevelFilter::Info)?;

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

    let report = eval.run(&bar, |e, g, issues| e.agreement_group(g, issues))?;
    bar.finish_with_message("done");

    write_csv(&cli.output, &report.rows)?;
    info!("{} rows written to {}", report.rows.len(), cli.output.display());
    println!("Results written to {} ({} rows)", cli.output.display(), report.rows.len());

    if let Some(p) = write_issues(&cli.output, &report.issues)? {
        println!("{} issues written to {}", report.issues.len(), p.display());
    }
    println!("Log: {}", log_path.display());
    Ok(())
}
