use std::path::PathBuf;

use clap::Parser;

/// Gradebook sidecar: JSON requests on stdin, one response line per request
/// on stdout, logs on stderr.
#[derive(Debug, Clone, Parser)]
#[command(name = "gradebookd", version, about)]
pub struct Config {
    /// Data directory opened at startup. Without it the client must send
    /// `workspace.select` first.
    #[arg(long, env = "GRADEBOOK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, env = "GRADEBOOK_LOG", default_value = "info")]
    pub log_level: String,

    /// Seed for id allocation, for reproducible runs.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Config {
    pub fn init_logging(&self) {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.log_level.as_str()),
        )
        .target(env_logger::Target::Stderr)
        .init();
    }
}
