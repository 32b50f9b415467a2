use crate::crypto::SignatureVerifier;
use crate::error::ValidationError;
use crate::transaction::{Transaction, TxHash};
use crate::utxo::{UtxoId, UtxoPool};
use crate::validator::TxValidator;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Why a candidate was left out of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub tx: TxHash,
    pub error: ValidationError,
}

/// Accepted candidates in submission order, rejections, and the pool after the batch
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub accepted: Vec<Transaction>,
    pub rejected: Vec<Rejection>,
    pub pool: UtxoPool,
}

/// Copy of a pool that candidates of a batch are resolved against.
///
/// Staging records the outputs each candidate would create; they only enter
/// the pool when that candidate commits. Until then a staged output is missing
/// to every other candidate, so nothing can spend an output of a candidate
/// that has not been judged yet. Every staged candidate is later either
/// committed (its claimed inputs are spent, its outputs added) or discarded
/// (its staging record is dropped). The base pool is never touched.
#[derive(Debug)]
pub struct WorkingPool {
    pool: UtxoPool,
    staged: HashMap<TxHash, Vec<UtxoId>>,
}

impl WorkingPool {
    pub fn new(base: &UtxoPool) -> Self {
        Self {
            pool: base.clone(),
            staged: HashMap::new(),
        }
    }

    /// Base pool plus the effects of committed candidates
    pub const fn pool(&self) -> &UtxoPool {
        &self.pool
    }

    /// Records the outputs `tx` would create.
    ///
    /// Returns `false`, staging nothing, if a transaction with the same hash
    /// is already staged. Outputs already present in the pool are not
    /// recorded, so committing cannot overwrite them.
    pub fn stage(&mut self, tx: &Transaction) -> bool {
        let Entry::Vacant(entry) = self.staged.entry(tx.hash()) else {
            return false;
        };

        let ids: Vec<UtxoId> = tx
            .output_ids()
            .map(|(id, _)| id)
            .filter(|id| !self.pool.contains(id))
            .collect();

        trace!(tx = %tx.hash(), outputs = ids.len(), "staged candidate");
        entry.insert(ids);

        true
    }

    /// Spends the inputs of a staged transaction and adds its staged outputs
    pub fn commit(&mut self, tx: &Transaction) {
        for input in tx.inputs() {
            self.pool.remove(&input.utxo);
        }

        let Some(ids) = self.staged.remove(&tx.hash()) else {
            return;
        };

        for (id, output) in tx.output_ids() {
            if ids.contains(&id) {
                self.pool.insert(id, output.clone());
            }
        }
    }

    /// Drops the staging record of `tx`; the pool is left as it was
    pub fn discard(&mut self, tx: &Transaction) {
        self.staged.remove(&tx.hash());
    }

    pub fn into_pool(self) -> UtxoPool {
        debug_assert!(
            self.staged.is_empty(),
            "working pool finished with undecided candidates"
        );

        self.pool
    }
}

/// Selects a mutually consistent subset of `candidates` and applies it to a
/// copy of `pool`.
///
/// Every candidate is staged first, then candidates are judged in submission
/// order against the base pool plus the outputs of candidates accepted so far.
/// A candidate may spend an output created by an earlier accepted candidate in
/// the same batch, but never one created by a later or rejected candidate.
/// The first valid claimant of a UTXO wins. Selection is greedy and
/// order-dependent, not a search for the largest consistent subset.
pub fn process<V: SignatureVerifier>(
    pool: &UtxoPool,
    candidates: &[Transaction],
    verifier: V,
) -> BatchOutcome {
    let validator = TxValidator::new(verifier);
    let mut working = WorkingPool::new(pool);

    let staged: Vec<bool> = candidates.iter().map(|tx| working.stage(tx)).collect();

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for (tx, staged) in candidates.iter().zip(staged) {
        if !staged {
            debug!(tx = %tx.hash(), "rejected duplicate candidate");
            rejected.push(Rejection {
                tx: tx.hash(),
                error: ValidationError::DuplicateCandidate(tx.hash()),
            });

            continue;
        }

        match validator.check(working.pool(), tx) {
            Ok(fee) => {
                debug!(tx = %tx.hash(), %fee, "accepted transaction");
                working.commit(tx);
                accepted.push(tx.clone());
            }
            Err(error) => {
                debug!(tx = %tx.hash(), %error, "rejected transaction");
                working.discard(tx);
                rejected.push(Rejection {
                    tx: tx.hash(),
                    error,
                });
            }
        }
    }

    BatchOutcome {
        accepted,
        rejected,
        pool: working.into_pool(),
    }
}

/// Long-lived owner of the authoritative pool, fed one batch per epoch
#[derive(Debug, Clone)]
pub struct LedgerEngine<V> {
    pool: UtxoPool,
    validator: TxValidator<V>,
}

impl<V: SignatureVerifier> LedgerEngine<V> {
    pub const fn new(pool: UtxoPool, verifier: V) -> Self {
        Self {
            pool,
            validator: TxValidator::new(verifier),
        }
    }

    pub const fn pool(&self) -> &UtxoPool {
        &self.pool
    }

    pub fn into_pool(self) -> UtxoPool {
        self.pool
    }

    /// Validity of `tx` against the current pool, with no batch context
    pub fn is_valid_tx(&self, tx: &Transaction) -> bool {
        self.validator.is_valid(&self.pool, tx)
    }

    /// Runs one epoch, replacing the pool with the post-batch pool
    pub fn handle_batch(&mut self, candidates: &[Transaction]) -> (Vec<Transaction>, Vec<Rejection>) {
        let BatchOutcome {
            accepted,
            rejected,
            pool,
        } = process(&self.pool, candidates, self.validator.verifier());

        self.pool = pool;

        (accepted, rejected)
    }

    pub fn handle_txs(&mut self, candidates: &[Transaction]) -> Vec<Transaction> {
        self.handle_batch(candidates).0
    }
}
