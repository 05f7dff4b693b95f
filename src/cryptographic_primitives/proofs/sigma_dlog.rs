//! Non-interactive Schnorr proof of knowledge of `x` with `y = x·G`.
//!
//! The challenge is `Hash(G, y, t) mod q`. A challenge or response of zero
//! carries no information, so the prover resamples its nonce when either occurs.

use curv::arithmetic::*;
use curv::BigInt;
use serde::{Deserialize, Serialize};

use crate::cryptographic_primitives::hashing::Preimage;
use crate::elliptic::{Curve, Point};
use crate::Errors;

pub const MAX_PROOF_ATTEMPTS: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchnorrProof {
    pub t: Point,
    pub s: BigInt,
    pub c: BigInt,
    pub y: Point,
}

impl SchnorrProof {
    pub fn prove(curve: &Curve, x: &BigInt, y: &Point) -> Result<SchnorrProof, Errors> {
        for _ in 0..MAX_PROOF_ATTEMPTS {
            match Self::prove_with_fresh_nonce(curve, x, y) {
                Err(Errors::DegenerateProof) => continue,
                result => return result,
            }
        }
        Err(Errors::DegenerateProof)
    }

    fn prove_with_fresh_nonce(curve: &Curve, x: &BigInt, y: &Point) -> Result<SchnorrProof, Errors> {
        let q = curve.order();
        let r = curve.random_scalar()?;
        let t = curve.scalar_multiplication(curve.generator(), &r)?;
        let c = challenge(curve, y, &t);
        let s = (r + &c * x).mod_floor(q);
        if c.is_zero() || s.is_zero() {
            return Err(Errors::DegenerateProof);
        }
        Ok(SchnorrProof {
            t,
            s,
            c,
            y: y.clone(),
        })
    }

    pub fn verify(&self, curve: &Curve) -> Result<(), Errors> {
        let q = curve.order();
        if !curve.is_point(&self.t) || !curve.is_point(&self.y) {
            return Err(Errors::ProofVerificationFailed(
                "proof points are not on the curve".to_string(),
            ));
        }
        if self.s <= BigInt::zero() || &self.s >= q || self.c <= BigInt::zero() || &self.c >= q {
            return Err(Errors::ProofVerificationFailed(
                "proof scalars are out of range".to_string(),
            ));
        }
        if self.c != challenge(curve, &self.y, &self.t) {
            return Err(Errors::ProofVerificationFailed(
                "challenge does not match Hash(G, y, t)".to_string(),
            ));
        }

        let lhs = curve.scalar_multiplication(curve.generator(), &self.s)?;
        let c_y = curve.scalar_multiplication(&self.y, &self.c)?;
        let rhs = curve.point_addition(&self.t, &c_y)?;
        if lhs != rhs {
            return Err(Errors::ProofVerificationFailed(
                "s·G differs from t + c·y".to_string(),
            ));
        }
        Ok(())
    }
}

fn challenge(curve: &Curve, y: &Point, t: &Point) -> BigInt {
    Preimage::new()
        .chain_point(curve.generator())
        .chain_point(y)
        .chain_point(t)
        .digest_mod(curve.order())
}
