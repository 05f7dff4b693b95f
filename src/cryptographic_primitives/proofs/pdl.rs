#![allow(non_snake_case)]
//! Proof that a Paillier ciphertext encrypts the discrete log of an EC point.
//!
//! Statement: `(c_key, N, Q1)`; witness `(x1, r)` with `Q1 = x1·G` and
//! `c_key = Enc(x1; r)`. The masking value is drawn from `[0, q^2·2^40)` so the
//! integer response `z = alpha + e·x1` statistically hides `x1`.

use curv::arithmetic::*;
use curv::BigInt;
use serde::{Deserialize, Serialize};

use super::sigma_dlog::MAX_PROOF_ATTEMPTS;
use crate::cryptographic_primitives::hashing::Preimage;
use crate::elliptic::{Curve, Point};
use crate::encryption::PaillierPublicKey;
use crate::Errors;

const SLACK_BITS: u32 = 40;

pub struct PdlStatement<'a> {
    pub c_key: &'a BigInt,
    pub paillier_public: &'a PaillierPublicKey,
    pub Q1: &'a Point,
}

pub struct PdlWitness<'a> {
    pub x1: &'a BigInt,
    pub randomness: &'a BigInt,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdlProof {
    pub t: Point,
    pub A: BigInt,
    pub e: BigInt,
    pub z: BigInt,
    pub w: BigInt,
}

impl PdlProof {
    pub fn prove(
        curve: &Curve,
        statement: &PdlStatement,
        witness: &PdlWitness,
    ) -> Result<Self, Errors> {
        let q = curve.order();
        let pk = statement.paillier_public;
        let alpha_bound = q * q * BigInt::from(2).pow(SLACK_BITS);

        for _ in 0..MAX_PROOF_ATTEMPTS {
            let alpha = BigInt::sample_below(&alpha_bound);
            let beta = pk.sample_randomness();
            let t = curve.scalar_multiplication(curve.generator(), &alpha)?;
            let A = pk.encrypt_with_randomness(&alpha, &beta)?;
            let e = challenge(curve, statement, &t, &A);
            if e.is_zero() {
                continue;
            }
            let z = &alpha + &e * witness.x1;
            let w = BigInt::mod_mul(&beta, &BigInt::mod_pow(witness.randomness, &e, &pk.n), &pk.n);
            return Ok(PdlProof { t, A, e, z, w });
        }
        Err(Errors::DegenerateProof)
    }

    pub fn verify(&self, curve: &Curve, statement: &PdlStatement) -> Result<(), Errors> {
        let pk = statement.paillier_public;
        let fail = |reason: &str| Err(Errors::ProofVerificationFailed(reason.to_string()));

        if !curve.is_point(&self.t) || !curve.is_point(statement.Q1) {
            return fail("PDL points are not on the curve");
        }
        if !pk.is_valid_ciphertext(&self.A) || !pk.is_valid_ciphertext(statement.c_key) {
            return fail("PDL ciphertexts are not in Z*_{N^2}");
        }
        if self.e.is_zero() || self.e != challenge(curve, statement, &self.t, &self.A) {
            return fail("PDL challenge mismatch");
        }
        if self.z < BigInt::zero() || self.z >= pk.n || !pk.is_valid_randomness(&self.w) {
            return fail("PDL response out of range");
        }

        let z_G = curve.scalar_multiplication(curve.generator(), &self.z)?;
        let e_Q1 = curve.scalar_multiplication(statement.Q1, &self.e)?;
        if z_G != curve.point_addition(&self.t, &e_Q1)? {
            return fail("z·G differs from t + e·Q1");
        }

        let nn = pk.nn();
        let lhs = pk.encrypt_with_randomness(&self.z, &self.w)?;
        let rhs = BigInt::mod_mul(&self.A, &BigInt::mod_pow(statement.c_key, &self.e, &nn), &nn);
        if lhs != rhs {
            return fail("Enc(z; w) differs from A·c_key^e");
        }
        Ok(())
    }
}

fn challenge(curve: &Curve, statement: &PdlStatement, t: &Point, A: &BigInt) -> BigInt {
    Preimage::new()
        .chain_scalar(statement.c_key)
        .chain_scalar(&statement.paillier_public.n)
        .chain_point(statement.Q1)
        .chain_point(t)
        .chain_scalar(A)
        .digest_mod(curve.order())
}
