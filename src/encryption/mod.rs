//! Paillier's additively homomorphic cryptosystem with `g = n + 1`.

pub mod homomorphism;
pub mod keys;

pub use homomorphism::matching_pairs;
pub use keys::{PaillierKeyPair, PaillierPrivateKey, PaillierPublicKey};
