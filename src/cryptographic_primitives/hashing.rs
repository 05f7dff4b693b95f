use curv::arithmetic::*;
use curv::BigInt;
use sha2::{Digest, Sha256};

use crate::elliptic::point::Point;

const DIGEST_BITS: usize = 256;

/// Builder for the canonical hash input: decimal scalars and points joined by `|`.
#[derive(Clone, Debug, Default)]
pub struct Preimage {
    parts: Vec<String>,
}

impl Preimage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain_scalar(mut self, value: &BigInt) -> Self {
        self.parts.push(value.to_str_radix(10));
        self
    }

    pub fn chain_point(mut self, point: &Point) -> Self {
        self.parts.push(point.to_string());
        self
    }

    pub fn digest(&self) -> BigInt {
        let joined = self.parts.join("|");
        BigInt::from_bytes(Sha256::digest(joined.as_bytes()).as_slice())
    }

    pub fn digest_mod(&self, modulus: &BigInt) -> BigInt {
        self.digest().mod_floor(modulus)
    }
}

/// Message representative for signing: the top `bitlen(q)` bits of SHA-256.
pub fn h_q(message: &[u8], q: &BigInt) -> BigInt {
    let digest = BigInt::from_bytes(Sha256::digest(message).as_slice());
    let bits = q.bit_length();
    if bits >= DIGEST_BITS {
        return digest;
    }
    digest.div_floor(&BigInt::from(2).pow((DIGEST_BITS - bits) as u32))
}
