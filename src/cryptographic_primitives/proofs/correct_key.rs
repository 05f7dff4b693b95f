//! Proof that the Paillier modulus was generated correctly (`N` in `L_P`).

use curv::arithmetic::*;
use curv::BigInt;
use serde::{Deserialize, Serialize};
use zk_paillier::zkproofs::{NiCorrectKeyProof, SALT_STRING};

use crate::encryption::{PaillierKeyPair, PaillierPublicKey};
use crate::Errors;

/// Number of `N`-th roots in a `NiCorrectKeyProof`.
const CORRECT_KEY_PROOF_ROUNDS: usize = 11;

#[derive(Debug, Serialize, Deserialize)]
pub struct ModulusProof {
    pub n: BigInt,
    pub correct_key_proof: NiCorrectKeyProof,
}

impl ModulusProof {
    pub fn prove(keys: &PaillierKeyPair) -> Result<Self, Errors> {
        let n = &keys.public_key.n;
        if n.gcd(keys.private_key.lambda()) != BigInt::one() {
            return Err(Errors::ProofVerificationFailed(
                "gcd(N, lambda) is not 1".to_string(),
            ));
        }
        Ok(ModulusProof {
            n: n.clone(),
            correct_key_proof: NiCorrectKeyProof::proof(&keys.to_decryption_key(), None),
        })
    }

    pub fn verify(&self, public_key: &PaillierPublicKey) -> Result<(), Errors> {
        public_key.check_modulus()?;
        if self.n != public_key.n {
            return Err(Errors::ProofVerificationFailed(
                "proof is for a different modulus".to_string(),
            ));
        }
        // the verifier indexes every round unchecked
        if self.correct_key_proof.sigma_vec.len() != CORRECT_KEY_PROOF_ROUNDS {
            return Err(Errors::ProofVerificationFailed(
                "correct key proof has the wrong number of rounds".to_string(),
            ));
        }
        self.correct_key_proof
            .verify(&public_key.to_encryption_key(), SALT_STRING)
            .map_err(|_| {
                Errors::ProofVerificationFailed("correct key proof rejected".to_string())
            })
    }
}
