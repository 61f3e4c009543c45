use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

use chrono::Local;
use simplelog::{Config as LogConfig, LevelFilter, WriteLogger};

/// Routes `log` output to `<log_dir>/<stem>_<timestamp>.log` and returns that path.
pub fn init_file_logger(log_dir: &Path, stem: &str, level: LevelFilter) -> anyhow::Result<PathBuf> {
    create_dir_all(log_dir)?;
    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let log_path = log_dir.join(format!("{stem}_{ts}.log"));
    WriteLogger::init(level, LogConfig::default(), File::create(&log_path)?)?;
    Ok(log_path)
}
