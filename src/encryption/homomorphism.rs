use curv::arithmetic::*;
use curv::BigInt;
use paillier::{Add, Mul, Paillier, RawCiphertext, RawPlaintext};

use super::keys::{PaillierKeyPair, PaillierPublicKey};
use crate::Errors;

impl PaillierPublicKey {
    /// Ciphertext of the sum of both plaintexts modulo `n`.
    pub fn add_cipher_texts(&self, c1: &BigInt, c2: &BigInt) -> BigInt {
        let sum = Paillier::add(
            &self.to_encryption_key(),
            RawCiphertext::from(c1),
            RawCiphertext::from(c2),
        );
        sum.0.into_owned()
    }

    /// Ciphertext of `v` times the plaintext of `c`, modulo `n`.
    pub fn mul_cipher_text(&self, c: &BigInt, v: &BigInt) -> Result<BigInt, Errors> {
        if v < &BigInt::zero() {
            return Err(Errors::InvalidScalar);
        }
        let product = Paillier::mul(
            &self.to_encryption_key(),
            RawCiphertext::from(c),
            RawPlaintext::from(v),
        );
        Ok(product.0.into_owned())
    }
}

/// Reports every unordered pair of entries whose encrypted values sum to `target`,
/// as `"first-second"` in list order. Only the key holder learns the sums.
pub fn matching_pairs(
    keys: &PaillierKeyPair,
    entries: &[(String, BigInt)],
    target: &BigInt,
) -> Result<Vec<String>, Errors> {
    let mut matches = Vec::new();
    for (i, (first_id, first)) in entries.iter().enumerate() {
        for (second_id, second) in &entries[i + 1..] {
            let sum = keys.public_key.add_cipher_texts(first, second);
            if &keys.decrypt_cipher_text(&sum)? == target {
                matches.push(format!("{}-{}", first_id, second_id));
            }
        }
    }
    Ok(matches)
}
