use crate::transaction::{PublicKey, UnsignedTransaction};
use ed25519_dalek::{Signature, Signer, VerifyingKey};

pub use ed25519_dalek::SigningKey;

/// Checks that `signature` over `message` was produced by `owner`.
///
/// Implementations must be deterministic and free of side effects.
pub trait SignatureVerifier {
    fn verify(&self, owner: &PublicKey, message: &[u8], signature: &[u8]) -> bool;
}

impl<V: SignatureVerifier + ?Sized> SignatureVerifier for &V {
    fn verify(&self, owner: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
        (**self).verify(owner, message, signature)
    }
}

/// Ed25519 verification with strict (non-malleable) signature checks
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, owner: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(owner.as_bytes()) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };

        key.verify_strict(message, &signature).is_ok()
    }
}

pub fn public_key(key: &SigningKey) -> PublicKey {
    PublicKey::new(key.verifying_key().to_bytes())
}

pub fn sign(key: &SigningKey, message: &[u8]) -> Vec<u8> {
    key.sign(message).to_bytes().to_vec()
}

/// Signs input `index` of `tx` with `key`.
///
/// Panics if `index` is out of range.
pub fn sign_input(tx: &mut UnsignedTransaction, index: usize, key: &SigningKey) {
    let signature = sign(key, &tx.signing_message(index));
    tx.sign_input(index, signature);
}
