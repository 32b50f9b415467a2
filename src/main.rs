mod config;
mod records;

use anyhow::{Context, Result};
use clap::Parser;
use config::{CliConfig, Config};
use std::fs::File;
use std::io;
use tracing::{info, warn};
use utxo_ledger::{crypto::Ed25519Verifier, engine::LedgerEngine};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = CliConfig::parse();

    process_epochs(&config)?;

    info!("Processing completed successfully");

    Ok(())
}

fn process_epochs<C: Config>(config: &C) -> Result<()> {
    let genesis = File::open(config.genesis_path()).context("Failed to open genesis file")?;
    let pool = records::read_genesis(genesis)?;

    info!("Loaded {} genesis outputs", pool.len());

    let mut engine = LedgerEngine::new(pool, Ed25519Verifier);

    for (epoch, path) in config.batch_paths().iter().enumerate() {
        let file = File::open(path)
            .with_context(|| format!("Failed to open batch file {}", path.display()))?;
        let candidates = records::read_batch(file);

        let (accepted, rejected) = engine.handle_batch(&candidates);

        for rejection in &rejected {
            warn!("Epoch {epoch}: rejected {}: {}", rejection.tx, rejection.error);
        }

        info!(
            "Epoch {epoch}: accepted {} of {} candidates, pool holds {} outputs",
            accepted.len(),
            candidates.len(),
            engine.pool().len()
        );
    }

    let stdout = io::stdout();
    let handle = stdout.lock();
    let mut writer = csv::WriterBuilder::new().from_writer(handle);

    for record in records::pool_records(engine.pool()) {
        writer
            .serialize(&record)
            .context("Failed to serialize output")?;
    }

    writer.flush().context("Failed to flush stdout")?;

    Ok(())
}
