use crate::transaction::{Output, TxHash};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Reference to one output of a prior transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtxoId {
    pub tx_hash: TxHash,
    pub index: u32,
}

impl UtxoId {
    pub const fn new(tx_hash: TxHash, index: u32) -> Self {
        Self { tx_hash, index }
    }
}

impl Display for UtxoId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.tx_hash, self.index)
    }
}

/// The set of spendable outputs.
///
/// A key present in the pool is unspent. `Clone` yields an independent
/// pool, which is how callers explore hypothetical state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoPool {
    utxos: HashMap<UtxoId, Output>,
}

impl UtxoPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &UtxoId) -> bool {
        self.utxos.contains_key(id)
    }

    pub fn get(&self, id: &UtxoId) -> Option<&Output> {
        self.utxos.get(id)
    }

    /// Overwrites any output already stored under `id`.
    pub fn insert(&mut self, id: UtxoId, output: Output) {
        self.utxos.insert(id, output);
    }

    /// Marks `id` spent. Removing an absent key is a no-op.
    pub fn remove(&mut self, id: &UtxoId) -> Option<Output> {
        self.utxos.remove(id)
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UtxoId, &Output)> {
        self.utxos.iter()
    }

    /// Sum of every unspent value, or `None` on overflow
    pub fn total_value(&self) -> Option<Decimal> {
        self.utxos
            .values()
            .try_fold(Decimal::ZERO, |acc, output| acc.checked_add(output.value))
    }
}

impl FromIterator<(UtxoId, Output)> for UtxoPool {
    fn from_iter<I: IntoIterator<Item = (UtxoId, Output)>>(iter: I) -> Self {
        Self {
            utxos: iter.into_iter().collect(),
        }
    }
}

impl Extend<(UtxoId, Output)> for UtxoPool {
    fn extend<I: IntoIterator<Item = (UtxoId, Output)>>(&mut self, iter: I) {
        self.utxos.extend(iter);
    }
}
