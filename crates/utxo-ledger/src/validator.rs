use crate::crypto::SignatureVerifier;
use crate::error::ValidationError;
use crate::transaction::Transaction;
use crate::utxo::{UtxoId, UtxoPool};
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Judges a single transaction against a pool snapshot.
///
/// A transaction is valid when every claimed UTXO is in the pool, each input's
/// signature verifies against the claimed output's owner, no UTXO is claimed
/// twice, no output is negative and outputs do not exceed inputs. The pool is
/// only read.
#[derive(Debug, Clone, Default)]
pub struct TxValidator<V> {
    verifier: V,
}

impl<V: SignatureVerifier> TxValidator<V> {
    pub const fn new(verifier: V) -> Self {
        Self { verifier }
    }

    pub const fn verifier(&self) -> &V {
        &self.verifier
    }

    pub fn is_valid(&self, pool: &UtxoPool, tx: &Transaction) -> bool {
        self.check(pool, tx).is_ok()
    }

    /// Returns the implicit fee (inputs minus outputs) of a valid transaction,
    /// or the first rule it breaks.
    pub fn check(&self, pool: &UtxoPool, tx: &Transaction) -> Result<Decimal, ValidationError> {
        let outputs_total = Self::sum_outputs(tx)?;
        Self::check_unique_claims(tx)?;
        let inputs_total = self.sum_inputs(pool, tx)?;

        if inputs_total < outputs_total {
            return Err(ValidationError::InsufficientInput {
                inputs: inputs_total,
                outputs: outputs_total,
            });
        }

        Ok(inputs_total - outputs_total)
    }

    fn sum_outputs(tx: &Transaction) -> Result<Decimal, ValidationError> {
        let mut total = Decimal::ZERO;

        for (index, output) in tx.outputs().iter().enumerate() {
            if output.value < Decimal::ZERO {
                return Err(ValidationError::NegativeOutput {
                    index,
                    value: output.value,
                });
            }

            total = total
                .checked_add(output.value)
                .ok_or(ValidationError::ValueOverflow)?;
        }

        Ok(total)
    }

    fn check_unique_claims(tx: &Transaction) -> Result<(), ValidationError> {
        let mut seen: HashSet<UtxoId> = HashSet::with_capacity(tx.inputs().len());

        for input in tx.inputs() {
            if !seen.insert(input.utxo) {
                return Err(ValidationError::DuplicateClaim(input.utxo));
            }
        }

        Ok(())
    }

    fn sum_inputs(&self, pool: &UtxoPool, tx: &Transaction) -> Result<Decimal, ValidationError> {
        let mut total = Decimal::ZERO;

        for (index, input) in tx.inputs().iter().enumerate() {
            let claimed = pool
                .get(&input.utxo)
                .ok_or(ValidationError::MissingUtxo(input.utxo))?;

            if !self
                .verifier
                .verify(&claimed.owner, &tx.signing_message(index), &input.signature)
            {
                return Err(ValidationError::InvalidSignature { index });
            }

            total = total
                .checked_add(claimed.value)
                .ok_or(ValidationError::ValueOverflow)?;
        }

        Ok(total)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crypto::{public_key, sign_input, Ed25519Verifier, SigningKey};
    use crate::transaction::{Output, PublicKey, TxHash, UnsignedTransaction};

    /// Accepts every signature, for rules that hold regardless of signatures
    pub(crate) struct AcceptAll;

    impl SignatureVerifier for AcceptAll {
        fn verify(&self, _owner: &PublicKey, _message: &[u8], _signature: &[u8]) -> bool {
            true
        }
    }

    pub(crate) fn alice() -> SigningKey {
        SigningKey::from_bytes(&[1; 32])
    }

    pub(crate) fn bob() -> SigningKey {
        SigningKey::from_bytes(&[2; 32])
    }

    pub(crate) fn genesis_id(index: u32) -> UtxoId {
        UtxoId::new(TxHash::new([0; 32]), index)
    }

    /// Pool with two genesis outputs owned by alice: 10.0 and 2.5
    pub(crate) fn genesis_pool() -> UtxoPool {
        [
            (
                genesis_id(0),
                Output::new(Decimal::new(100, 1), public_key(&alice())),
            ),
            (
                genesis_id(1),
                Output::new(Decimal::new(25, 1), public_key(&alice())),
            ),
        ]
        .into_iter()
        .collect()
    }

    /// Spends `claims` with `key`, paying each `(value, owner)` in `outputs`
    pub(crate) fn signed(
        key: &SigningKey,
        claims: &[UtxoId],
        outputs: &[(Decimal, PublicKey)],
    ) -> Transaction {
        let mut tx = UnsignedTransaction::new();
        for claim in claims {
            tx = tx.with_input(*claim);
        }
        for (value, owner) in outputs {
            tx = tx.with_output(*value, *owner);
        }
        for index in 0..claims.len() {
            sign_input(&mut tx, index, key);
        }

        tx.finalize()
    }

    fn validator() -> TxValidator<Ed25519Verifier> {
        TxValidator::new(Ed25519Verifier)
    }

    #[test]
    fn test_valid_transfer_reports_fee() {
        let pool = genesis_pool();
        let tx = signed(
            &alice(),
            &[genesis_id(0)],
            &[(Decimal::new(95, 1), public_key(&bob()))],
        );

        assert_eq!(validator().check(&pool, &tx), Ok(Decimal::new(5, 1)));
        assert!(validator().is_valid(&pool, &tx));
    }

    #[test]
    fn test_exact_spend_and_zero_output() {
        let pool = genesis_pool();
        let tx = signed(
            &alice(),
            &[genesis_id(0), genesis_id(1)],
            &[
                (Decimal::new(1249, 2), public_key(&bob())),
                (Decimal::new(1, 2), public_key(&alice())),
                (Decimal::ZERO, public_key(&bob())),
            ],
        );

        assert_eq!(validator().check(&pool, &tx), Ok(Decimal::ZERO));
    }

    #[test]
    fn test_missing_utxo() {
        let pool = genesis_pool();
        let tx = signed(
            &alice(),
            &[genesis_id(7)],
            &[(Decimal::ONE, public_key(&bob()))],
        );

        assert_eq!(
            validator().check(&pool, &tx),
            Err(ValidationError::MissingUtxo(genesis_id(7)))
        );
        assert!(!TxValidator::new(AcceptAll).is_valid(&pool, &tx));
    }

    #[test]
    fn test_wrong_signer() {
        let pool = genesis_pool();
        let tx = signed(
            &bob(),
            &[genesis_id(0)],
            &[(Decimal::ONE, public_key(&bob()))],
        );

        assert_eq!(
            validator().check(&pool, &tx),
            Err(ValidationError::InvalidSignature { index: 0 })
        );
    }

    #[test]
    fn test_signatures_are_not_interchangeable_between_inputs() {
        let pool = genesis_pool();
        let tx = signed(
            &alice(),
            &[genesis_id(0), genesis_id(1)],
            &[(Decimal::ONE, public_key(&bob()))],
        );

        let mut inputs = tx.inputs().to_vec();
        let first = inputs[0].signature.clone();
        inputs[0].signature = inputs[1].signature.clone();
        inputs[1].signature = first;
        let swapped = Transaction::new(inputs, tx.outputs().to_vec());

        assert!(validator().is_valid(&pool, &tx));
        assert_eq!(
            validator().check(&pool, &swapped),
            Err(ValidationError::InvalidSignature { index: 0 })
        );
    }

    #[test]
    fn test_duplicate_claim_regardless_of_signatures() {
        let pool = genesis_pool();
        let tx = signed(
            &alice(),
            &[genesis_id(0), genesis_id(0)],
            &[(Decimal::ONE, public_key(&bob()))],
        );

        assert_eq!(
            TxValidator::new(AcceptAll).check(&pool, &tx),
            Err(ValidationError::DuplicateClaim(genesis_id(0)))
        );
        assert!(!validator().is_valid(&pool, &tx));
    }

    #[test]
    fn test_negative_output() {
        let pool = genesis_pool();
        let tx = signed(
            &alice(),
            &[genesis_id(0)],
            &[
                (Decimal::new(11, 0), public_key(&bob())),
                (Decimal::new(-1, 0), public_key(&alice())),
            ],
        );

        assert_eq!(
            TxValidator::new(AcceptAll).check(&pool, &tx),
            Err(ValidationError::NegativeOutput {
                index: 1,
                value: Decimal::new(-1, 0),
            })
        );
    }

    #[test]
    fn test_outputs_exceeding_inputs() {
        let pool = genesis_pool();
        let tx = signed(
            &alice(),
            &[genesis_id(1)],
            &[(Decimal::new(2500001, 6), public_key(&bob()))],
        );

        assert_eq!(
            validator().check(&pool, &tx),
            Err(ValidationError::InsufficientInput {
                inputs: Decimal::new(25, 1),
                outputs: Decimal::new(2500001, 6),
            })
        );
    }

    #[test]
    fn test_output_sum_overflow() {
        let pool = genesis_pool();
        let tx = signed(
            &alice(),
            &[genesis_id(0)],
            &[
                (Decimal::MAX, public_key(&bob())),
                (Decimal::MAX, public_key(&bob())),
            ],
        );

        assert_eq!(
            TxValidator::new(AcceptAll).check(&pool, &tx),
            Err(ValidationError::ValueOverflow)
        );
    }

    #[test]
    fn test_input_sum_overflow() {
        let owner = public_key(&alice());
        let pool: UtxoPool = [
            (genesis_id(0), Output::new(Decimal::MAX, owner)),
            (genesis_id(1), Output::new(Decimal::MAX, owner)),
        ]
        .into_iter()
        .collect();
        let tx = signed(
            &alice(),
            &[genesis_id(0), genesis_id(1)],
            &[(Decimal::ONE, public_key(&bob()))],
        );

        assert_eq!(
            TxValidator::new(AcceptAll).check(&pool, &tx),
            Err(ValidationError::ValueOverflow)
        );
    }

    #[test]
    fn test_sub_unit_values_sum_exactly() {
        let mut pool = UtxoPool::new();
        let owner = public_key(&alice());
        let claims: Vec<UtxoId> = (0..3).map(genesis_id).collect();
        for claim in &claims {
            pool.insert(*claim, Output::new(Decimal::new(1, 1), owner));
        }

        // 0.1 + 0.1 + 0.1 == 0.3 exactly
        let tx = signed(&alice(), &claims, &[(Decimal::new(3, 1), owner)]);

        assert_eq!(validator().check(&pool, &tx), Ok(Decimal::ZERO));
    }

    #[test]
    fn test_check_does_not_mutate_pool() {
        let pool = genesis_pool();
        let before = pool.clone();
        let tx = signed(
            &alice(),
            &[genesis_id(0)],
            &[(Decimal::ONE, public_key(&bob()))],
        );

        assert!(validator().is_valid(&pool, &tx));
        assert_eq!(pool, before);
    }
}
