/*
cargo run --release --bin generate_responses -- \
    --group Jewish \
    --runs 50 \
    --codebook data/codebook/reformulated_questions.csv \
    --personas data/personas/LLM_persona_prompts.json \
    --model llama3.1:70b-instruct-q6_K \
    --url http://localhost:11434/api/generate \
    data/responses/Jewish_50_LLM_Output.json
*/

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, LevelFilter};
use std::path::PathBuf;

use persona_eval::codebook::{Codebook, Personas};
use persona_eval::generate::Generation;
use persona_eval::logging::init_file_logger;
use persona_eval::responder::{HttpResponder, DEFAULT_ENDPOINT};
use persona_eval::runs::RunMatrix;
use persona_eval::EvalError;

#[derive(Parser, Debug)]
#[command(version, about = "Ask a persona-conditioned model every codebook question, N times")]
struct Cli {
    output: PathBuf,

    #[arg(long)]
    group: String,

    #[arg(long, default_value_t = 50)]
    runs: usize,

    #[arg(long)]
    codebook: PathBuf,

    #[arg(long)]
    personas: PathBuf,

    #[arg(long, default_value = "llama3.1:70b-instruct-q6_K")]
    model: String,

    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    url: String,

    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = init_file_logger(&cli.log_dir, "generate_responses", LevelFilter::Info)?;
    info!("Started - group: {}, runs: {}, output: {:?}", cli.group, cli.runs, cli.output);

    let codebook = Codebook::from_csv(&cli.codebook)?;
    let personas = Personas::load(&cli.personas)?;
    let persona = personas.get(&cli.group)?;

    // resume from an earlier, possibly partial, file
    let mut matrix = match RunMatrix::load(&cli.output) {
        Ok(m) => {
            println!("Resuming from {} ({} runs)", cli.output.display(), m.run_count());
            m
        }
        Err(EvalError::MissingResource(_)) => RunMatrix::new(),
        Err(e) => return Err(e).context("existing output is unreadable"),
    };
    if let Some(dir) = cli.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let responder = HttpResponder::new(&cli.url, &cli.model)?;
    let job = Generation {
        responder: &responder,
        persona,
        codebook: &codebook,
        max_attempts: cli.max_attempts,
    };

    let pending = job.pending(&matrix, cli.runs);
    info!("{pending} answers to collect for {} questions", codebook.questions().len());

    let bar = ProgressBar::new(pending as u64);
    bar.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .unwrap());

    let added = job.fill(&mut matrix, cli.runs, &cli.output, &bar).await?;
    bar.finish_with_message("done");

    info!("{added} new answers, {} runs in {}", matrix.run_count(), cli.output.display());
    println!("Output written to {} ({added} new answers)", cli.output.display());
    println!("Log: {}", log_path.display());
    Ok(())
}
