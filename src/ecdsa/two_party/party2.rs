use curv::arithmetic::*;
use curv::BigInt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::session::{SessionPhase, SessionStore};
use super::{check_modulus_length, party1};
use super::{MasterKey2, Party2Private, Party2Public};
use crate::config::ProtocolConfig;
use crate::cryptographic_primitives::committed_proof::{CommittedProofState, ProofCommitment};
use crate::cryptographic_primitives::proofs::pdl::PdlStatement;
use crate::cryptographic_primitives::proofs::sigma_dlog::SchnorrProof;
use crate::elliptic::{inv_mod, random, Curve, Point};
use crate::encryption::PaillierPublicKey;
use crate::{Errors, ProtocolError};

const KEY_GEN_COMMITTED: &str = "KeyGenCommitted";
const KEYS_EXCHANGED: &str = "KeysExchanged";
const VERIFIED: &str = "Verified";
const SHARED_KEY_COMPUTED: &str = "SharedKeyComputed";
const KEY_AGREED: &str = "KeyAgreed";
const SIGN_PROVEN: &str = "SignProven";
const ABORTED: &str = "Aborted";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGenFirstMsg {
    pub d_log_proof: SchnorrProof,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphKeyGenFirstMsg {
    pub d_log_proof: SchnorrProof,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialSig {
    pub c3: BigInt,
}

enum Party2State {
    KeyGenCommitted {
        x2: BigInt,
        q2: Point,
        commitment: ProofCommitment,
    },
    KeysExchanged {
        x2: BigInt,
        q2: Point,
        opening: CommittedProofState,
        paillier_public: PaillierPublicKey,
        c_key: BigInt,
    },
    Verified {
        x2: BigInt,
        q2: Point,
        q1: Point,
        paillier_public: PaillierPublicKey,
        c_key: BigInt,
    },
    SharedKeyComputed(MasterKey2),
    KeyAgreed(MasterKey2),
    SignProven {
        master: MasterKey2,
        k2: BigInt,
        commitment: ProofCommitment,
    },
    Aborted,
}

impl SessionPhase for Party2State {
    fn aborted() -> Self {
        Party2State::Aborted
    }

    fn name(&self) -> &'static str {
        match self {
            Party2State::KeyGenCommitted { .. } => KEY_GEN_COMMITTED,
            Party2State::KeysExchanged { .. } => KEYS_EXCHANGED,
            Party2State::Verified { .. } => VERIFIED,
            Party2State::SharedKeyComputed(_) => SHARED_KEY_COMPUTED,
            Party2State::KeyAgreed(_) => KEY_AGREED,
            Party2State::SignProven { .. } => SIGN_PROVEN,
            Party2State::Aborted => ABORTED,
        }
    }
}

fn unexpected(expected: &'static str, found: &Party2State) -> Errors {
    Errors::UnexpectedPhase {
        expected,
        found: found.name(),
    }
}

/// Settles a revealed commitment and returns the point it proved.
fn accept_opening(curve: &Curve, opening: CommittedProofState) -> Result<Point, Errors> {
    match opening.verify(curve) {
        CommittedProofState::Accepted(point) if !point.is_infinity() => Ok(point),
        _ => Err(Errors::ProofVerificationFailed(
            "party one decommitment rejected".to_string(),
        )),
    }
}

impl MasterKey2 {
    fn set_master_key(
        x2: BigInt,
        q2: Point,
        q1: Point,
        paillier_public: PaillierPublicKey,
        c_key: BigInt,
        q: Point,
    ) -> MasterKey2 {
        let party2_public = Party2Public {
            q,
            p2: q2,
            p1: q1,
            paillier_pub: paillier_public,
            c_key,
        };
        MasterKey2 {
            public: party2_public,
            private: Party2Private { x2 },
        }
    }
}

/// The party that verifies P1's key material and computes the encrypted partial signature.
pub struct Party2 {
    curve: Curve,
    config: ProtocolConfig,
    sessions: SessionStore<Party2State>,
}

impl Party2 {
    pub fn new(config: ProtocolConfig) -> Result<Self, Errors> {
        let curve = Curve::new(config.curve.clone())?;
        Ok(Party2 {
            curve,
            config,
            sessions: SessionStore::new(),
        })
    }

    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn phase(&self, session_id: &str) -> Result<&'static str, Errors> {
        self.sessions.phase(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn close_session(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id)
    }

    pub fn master_key(&self, session_id: &str) -> Result<MasterKey2, Errors> {
        self.sessions.inspect(session_id, |state| match state {
            Party2State::KeyAgreed(master) | Party2State::SignProven { master, .. } => {
                Ok(master.clone())
            }
            other => Err(unexpected(KEY_AGREED, other)),
        })
    }

    #[instrument(skip_all, fields(session = %session_id))]
    pub fn key_gen_first_message(
        &self,
        session_id: &str,
        party_one_message: &party1::KeyGenFirstMsg,
    ) -> Result<KeyGenFirstMsg, ProtocolError> {
        self.sessions.start(session_id, "key_gen_first_message", || {
            let x2 = self.curve.random_scalar()?;
            let q2 = self.curve.scalar_multiplication(self.curve.generator(), &x2)?;
            let d_log_proof = SchnorrProof::prove(&self.curve, &x2, &q2)?;

            let state = Party2State::KeyGenCommitted {
                x2,
                q2,
                commitment: party_one_message.commitment.clone(),
            };
            Ok((state, KeyGenFirstMsg { d_log_proof }))
        })
    }

    #[instrument(skip_all, fields(session = %session_id))]
    pub fn key_gen_second_message(
        &self,
        session_id: &str,
        party_one_message: &party1::KeyGenParty1Message2,
    ) -> Result<(), ProtocolError> {
        self.sessions.advance(
            session_id,
            "key_gen_second_message",
            KEY_GEN_COMMITTED,
            |state| {
                let (x2, q2, commitment) = match state {
                    Party2State::KeyGenCommitted { x2, q2, commitment } => (x2, q2, commitment),
                    other => return Err(unexpected(KEY_GEN_COMMITTED, &other)),
                };
                let opening = CommittedProofState::new(commitment)
                    .reveal(party_one_message.decommitment.clone())?;

                let state = Party2State::KeysExchanged {
                    x2,
                    q2,
                    opening,
                    paillier_public: party_one_message.paillier_public.clone(),
                    c_key: party_one_message.c_key.clone(),
                };
                Ok((state, ()))
            },
        )
    }

    /// Checks P1's decommitment, Paillier key and encrypted share.
    #[instrument(skip_all, fields(session = %session_id))]
    pub fn verify_key_gen_proofs(
        &self,
        session_id: &str,
        proofs: &party1::KeyGenZkProofs,
    ) -> Result<(), ProtocolError> {
        self.sessions
            .advance(session_id, "verify_key_gen_proofs", KEYS_EXCHANGED, |state| {
                let (x2, q2, opening, paillier_public, c_key) = match state {
                    Party2State::KeysExchanged {
                        x2,
                        q2,
                        opening,
                        paillier_public,
                        c_key,
                    } => (x2, q2, opening, paillier_public, c_key),
                    other => return Err(unexpected(KEYS_EXCHANGED, &other)),
                };

                let q1 = accept_opening(&self.curve, opening)?;
                debug!("party one key share decommitment verified");

                paillier_public.check_modulus()?;
                if !paillier_public.is_valid_ciphertext(&c_key) {
                    return Err(Errors::InvalidCiphertext);
                }
                if !paillier_public.has_standard_generator() {
                    return Err(Errors::ProofVerificationFailed(
                        "Paillier generator is not N + 1".to_string(),
                    ));
                }
                proofs.lp_proof.verify(&paillier_public)?;
                debug!("Paillier modulus proof verified");

                let statement = PdlStatement {
                    c_key: &c_key,
                    paillier_public: &paillier_public,
                    Q1: &q1,
                };
                proofs.lpdl_proof.verify(&self.curve, &statement)?;
                debug!("encrypted share proof verified");

                check_modulus_length(
                    &paillier_public,
                    self.curve.order(),
                    self.config.security_parameter,
                )?;

                let state = Party2State::Verified {
                    x2,
                    q2,
                    q1,
                    paillier_public,
                    c_key,
                };
                Ok((state, ()))
            })
    }

    #[instrument(skip_all, fields(session = %session_id))]
    pub fn compute_shared_public_key(&self, session_id: &str) -> Result<Point, ProtocolError> {
        self.sessions
            .advance(session_id, "compute_shared_public_key", VERIFIED, |state| {
                let (x2, q2, q1, paillier_public, c_key) = match state {
                    Party2State::Verified {
                        x2,
                        q2,
                        q1,
                        paillier_public,
                        c_key,
                    } => (x2, q2, q1, paillier_public, c_key),
                    other => return Err(unexpected(VERIFIED, &other)),
                };
                let q = self.curve.scalar_multiplication(&q1, &x2)?;
                let master =
                    MasterKey2::set_master_key(x2, q2, q1, paillier_public, c_key, q.clone());
                Ok((Party2State::SharedKeyComputed(master), q))
            })
    }

    #[instrument(skip_all, fields(session = %session_id))]
    pub fn confirm_shared_key(
        &self,
        session_id: &str,
        party_one_q: &Point,
    ) -> Result<(), ProtocolError> {
        self.sessions.advance(
            session_id,
            "confirm_shared_key",
            SHARED_KEY_COMPUTED,
            |state| {
                let master = match state {
                    Party2State::SharedKeyComputed(master) => master,
                    other => return Err(unexpected(SHARED_KEY_COMPUTED, &other)),
                };
                if &master.public.q != party_one_q {
                    return Err(Errors::KeyMismatch);
                }
                Ok((Party2State::KeyAgreed(master), ()))
            },
        )
    }

    #[instrument(skip_all, fields(session = %session_id))]
    pub fn sign_first_message(
        &self,
        session_id: &str,
        party_one_message: &party1::EphKeyGenFirstMsg,
    ) -> Result<EphKeyGenFirstMsg, ProtocolError> {
        self.sessions
            .advance(session_id, "sign_first_message", KEY_AGREED, |state| {
                let master = match state {
                    Party2State::KeyAgreed(master) => master,
                    other => return Err(unexpected(KEY_AGREED, &other)),
                };
                let k2 = self.curve.random_scalar()?;
                let r2 = self.curve.scalar_multiplication(self.curve.generator(), &k2)?;
                let d_log_proof = SchnorrProof::prove(&self.curve, &k2, &r2)?;

                let state = Party2State::SignProven {
                    master,
                    k2,
                    commitment: party_one_message.commitment.clone(),
                };
                Ok((state, EphKeyGenFirstMsg { d_log_proof }))
            })
    }

    /// Computes `c3 = Enc(rho·q + k2^-1·m') · c_key^(k2^-1·r·x2)` after checking
    /// P1's nonce decommitment.
    #[instrument(skip_all, fields(session = %session_id))]
    pub fn sign_second_message(
        &self,
        session_id: &str,
        party_one_message: &party1::EphKeyGenSecondMsg,
        message: &BigInt,
    ) -> Result<PartialSig, ProtocolError> {
        self.sessions
            .advance(session_id, "sign_second_message", SIGN_PROVEN, |state| {
                let (master, k2, commitment) = match state {
                    Party2State::SignProven {
                        master,
                        k2,
                        commitment,
                    } => (master, k2, commitment),
                    other => return Err(unexpected(SIGN_PROVEN, &other)),
                };
                if party_one_message.commitment != commitment {
                    return Err(Errors::ProofVerificationFailed(
                        "decommitment refers to a different commitment".to_string(),
                    ));
                }
                let opening = CommittedProofState::new(commitment)
                    .reveal(party_one_message.decommitment.clone())?;
                let r1 = accept_opening(&self.curve, opening)?;
                debug!("party one nonce decommitment verified");

                let q = self.curve.order();
                let r_point = self.curve.scalar_multiplication(&r1, &k2)?;
                let r = r_point
                    .x_coord()
                    .ok_or(Errors::SignatureVerificationFailed)?
                    .mod_floor(q);
                if r.is_zero() {
                    return Err(Errors::SignatureVerificationFailed);
                }

                let q_square = q * q;
                let rho = loop {
                    let rho = random(&q_square)?;
                    if rho.gcd(q) == BigInt::one() {
                        break rho;
                    }
                };
                let k2_inv = inv_mod(&k2, q)?;
                let paillier_public = &master.public.paillier_pub;

                let partial_sig = BigInt::mod_mul(&k2_inv, &message.mod_floor(q), q);
                let c1 = paillier_public.encrypt_message(&(&rho * q + partial_sig))?;
                let v = BigInt::mod_mul(&BigInt::mod_mul(&k2_inv, &r, q), &master.private.x2, q);
                let c2 = paillier_public.mul_cipher_text(&master.public.c_key, &v)?;
                let c3 = paillier_public.add_cipher_texts(&c1, &c2);

                Ok((Party2State::KeyAgreed(master), PartialSig { c3 }))
            })
    }
}
