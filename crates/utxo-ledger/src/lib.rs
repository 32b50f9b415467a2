pub mod crypto;
pub mod engine;
pub mod error;
pub mod transaction;
pub mod utxo;
pub mod validator;

use crypto::SignatureVerifier;
use engine::LedgerEngine;
use transaction::Transaction;
use utxo::UtxoPool;

/// Process successive epochs starting from `pool`, returning the transactions
/// accepted in each epoch and the final pool
pub fn process_epochs<'a, V: SignatureVerifier>(
    pool: UtxoPool,
    epochs: impl IntoIterator<Item = &'a [Transaction]>,
    verifier: V,
) -> (Vec<Vec<Transaction>>, UtxoPool) {
    let mut engine = LedgerEngine::new(pool, verifier);

    let accepted = epochs
        .into_iter()
        .map(|batch| engine.handle_txs(batch))
        .collect();

    (accepted, engine.into_pool())
}
