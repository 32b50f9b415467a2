use clap::Parser;
use std::path::{Path, PathBuf};

/// Trait for reading configuration parameters
pub trait Config {
    fn genesis_path(&self) -> &Path;
    fn batch_paths(&self) -> &[PathBuf];
}

/// CLI configuration
#[derive(Parser, Debug)]
#[command(
    name = "scrooge-ledger",
    about = "Validates epochs of UTXO transactions and prints the resulting pool as CSV",
    version
)]
pub struct CliConfig {
    /// CSV file with the initial unspent outputs (tx,index,value,owner)
    #[arg(long, value_name = "FILE")]
    genesis: PathBuf,

    /// CSV files of candidate transactions, one epoch each, processed in order
    #[arg(value_name = "BATCH_FILE", required = true)]
    batches: Vec<PathBuf>,
}

impl Config for CliConfig {
    fn genesis_path(&self) -> &Path {
        &self.genesis
    }

    fn batch_paths(&self) -> &[PathBuf] {
        &self.batches
    }
}
