use curv::arithmetic::*;
use curv::BigInt;
use serde::{Deserialize, Serialize};

use crate::cryptographic_primitives::proofs::sigma_dlog::SchnorrProof;
use crate::ecdsa::Signature;
use crate::elliptic::{Curve, Point};
use crate::encryption::{PaillierKeyPair, PaillierPublicKey};
use crate::{Errors, ProtocolError};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Party1Public {
    pub q: Point,
    pub p1: Point,
    pub p2: Point,
    pub paillier_pub: PaillierPublicKey,
    pub c_key: BigInt,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Party1Private {
    x1: BigInt,
    paillier: PaillierKeyPair,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct MasterKey1 {
    pub public: Party1Public,
    private: Party1Private,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Party2Public {
    pub q: Point,
    pub p2: Point,
    pub p1: Point,
    pub paillier_pub: PaillierPublicKey,
    pub c_key: BigInt,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Party2Private {
    x2: BigInt,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct MasterKey2 {
    pub public: Party2Public,
    private: Party2Private,
}

pub mod party1;
pub mod party2;
pub mod session;

#[cfg(test)]
mod test;

pub use party1::Party1;
pub use party2::Party2;

/// Smallest Paillier modulus, in bits, that keeps the signing plaintext from wrapping.
pub fn required_modulus_bits(q: &BigInt, security_parameter: usize) -> usize {
    std::cmp::max(3 * q.bit_length() + 1, security_parameter)
}

fn check_modulus_length(
    paillier_public: &PaillierPublicKey,
    q: &BigInt,
    security_parameter: usize,
) -> Result<(), Errors> {
    let bits = paillier_public.bit_length();
    let required = required_modulus_bits(q, security_parameter);
    if bits < required {
        return Err(Errors::KeyTooShort { bits, required });
    }
    Ok(())
}

/// Point proven by the peer's Schnorr proof. The identity is never a valid share.
fn verified_peer_point(curve: &Curve, proof: &SchnorrProof) -> Result<Point, Errors> {
    proof.verify(curve)?;
    if proof.y.is_infinity() {
        return Err(Errors::ProofVerificationFailed(
            "peer share is the point at infinity".to_string(),
        ));
    }
    Ok(proof.y.clone())
}

pub fn new_session_id() -> String {
    BigInt::sample(128).to_hex()
}

/// Runs key generation on both parties in the fixed message order and returns
/// the agreed public key.
pub fn run_key_gen(
    party1: &Party1,
    party2: &Party2,
    session_id: &str,
) -> Result<Point, ProtocolError> {
    let kg_party_one_first_message = party1.key_gen_first_message(session_id)?;
    let kg_party_two_first_message =
        party2.key_gen_first_message(session_id, &kg_party_one_first_message)?;
    let kg_party_one_second_message =
        party1.key_gen_second_message(session_id, &kg_party_two_first_message)?;
    party2.key_gen_second_message(session_id, &kg_party_one_second_message)?;

    let zk_proofs = party1.key_gen_zk_proofs(session_id)?;
    party2.verify_key_gen_proofs(session_id, &zk_proofs)?;

    let party_one_q = party1.compute_shared_public_key(session_id)?;
    let party_two_q = party2.compute_shared_public_key(session_id)?;
    party1.confirm_shared_key(session_id, &party_two_q)?;
    party2.confirm_shared_key(session_id, &party_one_q)?;
    Ok(party_one_q)
}

/// Runs one signing round on an agreed session. `message` is the representative `H_q(m)`.
pub fn run_signing(
    party1: &Party1,
    party2: &Party2,
    session_id: &str,
    message: &BigInt,
) -> Result<Signature, ProtocolError> {
    let sign_party_one_first_message = party1.sign_first_message(session_id)?;
    let sign_party_two_first_message =
        party2.sign_first_message(session_id, &sign_party_one_first_message)?;
    let sign_party_one_second_message =
        party1.sign_second_message(session_id, &sign_party_two_first_message)?;
    let partial_sig =
        party2.sign_second_message(session_id, &sign_party_one_second_message, message)?;
    party1.sign_output(session_id, &partial_sig, message)
}
