//! Hash commitment to a Schnorr proof.
//!
//! The prover publishes `h = Hash(t, s)` first and reveals the proof only
//! after the peer has answered with its own share.

use curv::BigInt;
use serde::{Deserialize, Serialize};

use super::hashing::Preimage;
use super::proofs::sigma_dlog::SchnorrProof;
use crate::elliptic::{Curve, Point};
use crate::Errors;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofCommitment {
    pub h: BigInt,
}

/// The revealed proof `(t, s, c, y)`.
pub type ProofDecommitment = SchnorrProof;

/// Prover side: a proof whose commitment may be sent while the proof itself is held back.
#[derive(Clone)]
pub struct CommittedProof {
    commitment: ProofCommitment,
    decommitment: ProofDecommitment,
}

impl CommittedProof {
    pub fn commit_prove(curve: &Curve, x: &BigInt, y: &Point) -> Result<Self, Errors> {
        let decommitment = SchnorrProof::prove(curve, x, y)?;
        let commitment = ProofCommitment {
            h: commitment_hash(&decommitment.t, &decommitment.s),
        };
        Ok(CommittedProof {
            commitment,
            decommitment,
        })
    }

    pub fn commitment(&self) -> &ProofCommitment {
        &self.commitment
    }

    pub fn public_point(&self) -> &Point {
        &self.decommitment.y
    }

    pub fn decommit(self) -> ProofDecommitment {
        self.decommitment
    }
}

impl ProofCommitment {
    /// Checks that `decommitment` opens this commitment, then verifies the proof.
    pub fn decommit_proof(
        &self,
        curve: &Curve,
        decommitment: &ProofDecommitment,
    ) -> Result<(), Errors> {
        if commitment_hash(&decommitment.t, &decommitment.s) != self.h {
            return Err(Errors::ProofVerificationFailed(
                "decommitment does not open the commitment".to_string(),
            ));
        }
        decommitment.verify(curve)
    }
}

fn commitment_hash(t: &Point, s: &BigInt) -> BigInt {
    Preimage::new().chain_point(t).chain_scalar(s).digest()
}

/// Verifier side of one committed proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommittedProofState {
    Committed(ProofCommitment),
    Revealed {
        commitment: ProofCommitment,
        decommitment: ProofDecommitment,
    },
    Accepted(Point),
    Rejected,
}

impl CommittedProofState {
    pub fn new(commitment: ProofCommitment) -> Self {
        CommittedProofState::Committed(commitment)
    }

    pub fn reveal(self, decommitment: ProofDecommitment) -> Result<Self, Errors> {
        match self {
            CommittedProofState::Committed(commitment) => Ok(CommittedProofState::Revealed {
                commitment,
                decommitment,
            }),
            other => Err(Errors::UnexpectedPhase {
                expected: "Committed",
                found: other.name(),
            }),
        }
    }

    /// Settles a revealed proof. The accepted state keeps only the proven point.
    pub fn verify(self, curve: &Curve) -> Self {
        match self {
            CommittedProofState::Revealed {
                commitment,
                decommitment,
            } => match commitment.decommit_proof(curve, &decommitment) {
                Ok(()) => CommittedProofState::Accepted(decommitment.y),
                Err(_) => CommittedProofState::Rejected,
            },
            other => other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CommittedProofState::Committed(_) => "Committed",
            CommittedProofState::Revealed { .. } => "Revealed",
            CommittedProofState::Accepted(_) => "Accepted",
            CommittedProofState::Rejected => "Rejected",
        }
    }
}
