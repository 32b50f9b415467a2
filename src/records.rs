use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use tracing::warn;
use utxo_ledger::{
    transaction::{Input, Output, PublicKey, Transaction, TxHash},
    utxo::{UtxoId, UtxoPool},
};

/// One unspent output, as read from the genesis file and written to stdout
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UtxoRecord {
    pub tx: TxHash,
    pub index: u32,
    pub value: Decimal,
    pub owner: PublicKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RowKind {
    Input,
    Output,
}

/// One input or output row of a candidate transaction
#[derive(Debug, Clone, Deserialize)]
struct BatchRecord {
    tx: String,
    kind: RowKind,
    #[serde(default)]
    ref_tx: Option<TxHash>,
    #[serde(default)]
    ref_index: Option<u32>,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    value: Option<Decimal>,
    #[serde(default)]
    owner: Option<PublicKey>,
}

#[derive(Debug, Default)]
struct Candidate {
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    malformed: bool,
}

impl Candidate {
    fn push(&mut self, record: BatchRecord) -> Result<()> {
        match record.kind {
            RowKind::Input => {
                let tx = record.ref_tx.ok_or_else(|| anyhow!("Input requires ref_tx"))?;
                let index = record
                    .ref_index
                    .ok_or_else(|| anyhow!("Input requires ref_index"))?;
                let signature = hex::decode(record.signature.unwrap_or_default())
                    .context("Invalid signature hex")?;

                self.inputs
                    .push(Input::new(UtxoId::new(tx, index), signature));
            }
            RowKind::Output => {
                let value = record.value.ok_or_else(|| anyhow!("Output requires value"))?;
                let owner = record.owner.ok_or_else(|| anyhow!("Output requires owner"))?;

                self.outputs.push(Output::new(value, owner));
            }
        }

        Ok(())
    }
}

fn csv_reader<R: io::Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Reads the initial pool. Any malformed row fails the whole file.
pub fn read_genesis<R: io::Read>(reader: R) -> Result<UtxoPool> {
    let mut pool = UtxoPool::new();

    for (row, result) in csv_reader(reader).deserialize().enumerate() {
        let record: UtxoRecord =
            result.with_context(|| format!("Failed to parse genesis row {}", row + 1))?;

        pool.insert(
            UtxoId::new(record.tx, record.index),
            Output::new(record.value, record.owner),
        );
    }

    Ok(pool)
}

/// Reads one epoch of candidates, grouping rows by their `tx` label in order
/// of first appearance. Candidates with a malformed row are skipped.
pub fn read_batch<R: io::Read>(reader: R) -> Vec<Transaction> {
    let mut labels: HashMap<String, usize> = HashMap::new();
    let mut candidates: Vec<(String, Candidate)> = Vec::new();

    for result in csv_reader(reader).deserialize() {
        let record: BatchRecord = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to parse batch row: {e}");

                continue;
            }
        };

        let slot = *labels.entry(record.tx.clone()).or_insert_with(|| {
            candidates.push((record.tx.clone(), Candidate::default()));
            candidates.len() - 1
        });
        let (label, candidate) = &mut candidates[slot];

        if let Err(e) = candidate.push(record) {
            warn!("Candidate {label}: {e:#}");
            candidate.malformed = true;
        }
    }

    candidates
        .into_iter()
        .filter_map(|(label, candidate)| {
            if candidate.malformed {
                warn!("Skipping malformed candidate {label}");

                return None;
            }

            Some(Transaction::new(candidate.inputs, candidate.outputs))
        })
        .collect()
}

/// Pool contents ordered by identifier
pub fn pool_records(pool: &UtxoPool) -> Vec<UtxoRecord> {
    let mut records: Vec<UtxoRecord> = pool
        .iter()
        .map(|(id, output)| UtxoRecord {
            tx: id.tx_hash,
            index: id.index,
            value: output.value,
            owner: output.owner,
        })
        .collect();

    records.sort_by_key(|record| (record.tx, record.index));

    records
}
