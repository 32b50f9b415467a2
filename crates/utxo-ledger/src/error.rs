use crate::transaction::TxHash;
use crate::utxo::UtxoId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Reason a candidate transaction was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Output {index} has negative value {value}")]
    NegativeOutput { index: usize, value: Decimal },

    #[error("UTXO {0} is claimed more than once")]
    DuplicateClaim(UtxoId),

    #[error("UTXO {0} is not in the pool")]
    MissingUtxo(UtxoId),

    #[error("Signature on input {index} does not verify")]
    InvalidSignature { index: usize },

    #[error("Value arithmetic overflowed")]
    ValueOverflow,

    #[error("Outputs total {outputs} exceeds inputs total {inputs}")]
    InsufficientInput { inputs: Decimal, outputs: Decimal },

    #[error("Transaction {0} appears more than once in the batch")]
    DuplicateCandidate(TxHash),
}

/// Failure to decode a hex-encoded hash or key
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}
