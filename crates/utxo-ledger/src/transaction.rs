use crate::error::ParseError;
use crate::utxo::UtxoId;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const SIGNING_TAG: &[u8] = b"utxo-ledger/sig";
const HASH_TAG: &[u8] = b"utxo-ledger/tx";

/// Fixed-size byte strings shown and parsed as lowercase hex
macro_rules! hex_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s)?;
                let actual = bytes.len();
                let bytes: [u8; $len] = bytes.try_into().map_err(|_| ParseError::Length {
                    expected: $len,
                    actual,
                })?;

                Ok(Self(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_bytes!(
    /// SHA-256 digest identifying a transaction by its content
    TxHash,
    32
);

hex_bytes!(
    /// Ed25519 verifying key that owns an output
    PublicKey,
    32
);

/// Value paid to an owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub value: Decimal,
    pub owner: PublicKey,
}

impl Output {
    pub const fn new(value: Decimal, owner: PublicKey) -> Self {
        Self { value, owner }
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        // Normalized so 1.0 and 1.00 encode identically
        buf.extend_from_slice(&self.value.normalize().serialize());
        buf.extend_from_slice(self.owner.as_bytes());
    }
}

/// Claim on a previously created output, authorized by the owner's signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub utxo: UtxoId,
    pub signature: Vec<u8>,
}

impl Input {
    pub const fn new(utxo: UtxoId, signature: Vec<u8>) -> Self {
        Self { utxo, signature }
    }
}

/// A signed transfer: ordered inputs, ordered outputs and the content hash
/// computed from both. The hash is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    hash: TxHash,
}

impl Transaction {
    pub fn new(inputs: Vec<Input>, outputs: Vec<Output>) -> Self {
        let hash = content_hash(&inputs, &outputs);

        Self {
            inputs,
            outputs,
            hash,
        }
    }

    pub const fn hash(&self) -> TxHash {
        self.hash
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Identifiers this transaction's outputs take once committed
    pub fn output_ids(&self) -> impl Iterator<Item = (UtxoId, &Output)> + '_ {
        (0u32..)
            .zip(&self.outputs)
            .map(|(index, output)| (UtxoId::new(self.hash, index), output))
    }

    /// Bytes the signature on input `index` must cover.
    ///
    /// Panics if `index` is out of range.
    pub fn signing_message(&self, index: usize) -> Vec<u8> {
        assert!(
            index < self.inputs.len(),
            "signing message requested for input {index} of {}",
            self.inputs.len()
        );

        encode_signing_message(
            self.inputs.iter().map(|input| &input.utxo),
            &self.outputs,
            index,
        )
    }
}

/// Transaction under construction, before every input is signed
#[derive(Debug, Clone, Default)]
pub struct UnsignedTransaction {
    inputs: Vec<UtxoId>,
    signatures: Vec<Vec<u8>>,
    outputs: Vec<Output>,
}

impl UnsignedTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_input(mut self, utxo: UtxoId) -> Self {
        self.inputs.push(utxo);
        self.signatures.push(Vec::new());
        self
    }

    #[must_use]
    pub fn with_output(mut self, value: Decimal, owner: PublicKey) -> Self {
        self.outputs.push(Output::new(value, owner));
        self
    }

    /// Same bytes as [`Transaction::signing_message`] for the finalized transaction.
    ///
    /// Panics if `index` is out of range.
    pub fn signing_message(&self, index: usize) -> Vec<u8> {
        assert!(
            index < self.inputs.len(),
            "signing message requested for input {index} of {}",
            self.inputs.len()
        );

        encode_signing_message(self.inputs.iter(), &self.outputs, index)
    }

    pub fn sign_input(&mut self, index: usize, signature: Vec<u8>) {
        assert!(
            index < self.inputs.len(),
            "signature supplied for input {index} of {}",
            self.inputs.len()
        );

        self.signatures[index] = signature;
    }

    pub fn finalize(self) -> Transaction {
        let inputs = self
            .inputs
            .into_iter()
            .zip(self.signatures)
            .map(|(utxo, signature)| Input::new(utxo, signature))
            .collect();

        Transaction::new(inputs, self.outputs)
    }
}

fn encode_claim(utxo: &UtxoId, buf: &mut Vec<u8>) {
    buf.extend_from_slice(utxo.tx_hash.as_bytes());
    buf.extend_from_slice(&utxo.index.to_be_bytes());
}

/// Panics if `len` does not fit in a `u32`.
fn encode_len(len: usize, buf: &mut Vec<u8>) {
    let len = u32::try_from(len)
        .unwrap_or_else(|_| panic!("length {len} does not fit the u32 encoding"));

    buf.extend_from_slice(&len.to_be_bytes());
}

fn encode_signing_message<'a>(
    claims: impl ExactSizeIterator<Item = &'a UtxoId>,
    outputs: &[Output],
    index: usize,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SIGNING_TAG.len() + 8 + claims.len() * 36 + outputs.len() * 48);

    buf.extend_from_slice(SIGNING_TAG);
    encode_len(index, &mut buf);
    encode_len(claims.len(), &mut buf);
    for claim in claims {
        encode_claim(claim, &mut buf);
    }
    encode_len(outputs.len(), &mut buf);
    for output in outputs {
        output.encode(&mut buf);
    }

    buf
}

fn content_hash(inputs: &[Input], outputs: &[Output]) -> TxHash {
    let mut buf = Vec::new();

    buf.extend_from_slice(HASH_TAG);
    encode_len(inputs.len(), &mut buf);
    for input in inputs {
        encode_claim(&input.utxo, &mut buf);
        encode_len(input.signature.len(), &mut buf);
        buf.extend_from_slice(&input.signature);
    }
    encode_len(outputs.len(), &mut buf);
    for output in outputs {
        output.encode(&mut buf);
    }

    TxHash::new(Sha256::digest(&buf).into())
}
