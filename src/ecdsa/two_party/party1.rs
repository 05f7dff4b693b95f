use curv::arithmetic::*;
use curv::BigInt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::session::{SessionPhase, SessionStore};
use super::{check_modulus_length, party2, verified_peer_point};
use super::{MasterKey1, Party1Private, Party1Public};
use crate::config::ProtocolConfig;
use crate::cryptographic_primitives::committed_proof::{
    CommittedProof, ProofCommitment, ProofDecommitment,
};
use crate::cryptographic_primitives::proofs::correct_key::ModulusProof;
use crate::cryptographic_primitives::proofs::pdl::{PdlProof, PdlStatement, PdlWitness};
use crate::ecdsa::{self, Signature};
use crate::elliptic::{inv_mod, random_in_range, Curve, Point};
use crate::encryption::{PaillierKeyPair, PaillierPublicKey};
use crate::{Errors, ProtocolError};

const KEY_GEN_COMMITTED: &str = "KeyGenCommitted";
const KEYS_EXCHANGED: &str = "KeysExchanged";
const PROOFS_SENT: &str = "ProofsSent";
const SHARED_KEY_COMPUTED: &str = "SharedKeyComputed";
const KEY_AGREED: &str = "KeyAgreed";
const SIGN_COMMITTED: &str = "SignCommitted";
const SIGN_DECOMMITTED: &str = "SignDecommitted";
const ABORTED: &str = "Aborted";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGenFirstMsg {
    pub commitment: ProofCommitment,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGenParty1Message2 {
    pub decommitment: ProofDecommitment,
    pub paillier_public: PaillierPublicKey,
    pub c_key: BigInt,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeyGenZkProofs {
    pub lp_proof: ModulusProof,
    pub lpdl_proof: PdlProof,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphKeyGenFirstMsg {
    pub commitment: ProofCommitment,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphKeyGenSecondMsg {
    pub decommitment: ProofDecommitment,
    pub commitment: ProofCommitment,
}

struct KeyGenShares {
    x1: BigInt,
    q1: Point,
    q2: Point,
    paillier: PaillierKeyPair,
    c_key: BigInt,
    c_key_randomness: BigInt,
}

enum Party1State {
    KeyGenCommitted {
        x1: BigInt,
        committed: CommittedProof,
    },
    KeysExchanged(KeyGenShares),
    ProofsSent(KeyGenShares),
    SharedKeyComputed(MasterKey1),
    KeyAgreed(MasterKey1),
    SignCommitted {
        master: MasterKey1,
        k1: BigInt,
        committed: CommittedProof,
    },
    SignDecommitted {
        master: MasterKey1,
        k1: BigInt,
        r2: Point,
    },
    Aborted,
}

impl SessionPhase for Party1State {
    fn aborted() -> Self {
        Party1State::Aborted
    }

    fn name(&self) -> &'static str {
        match self {
            Party1State::KeyGenCommitted { .. } => KEY_GEN_COMMITTED,
            Party1State::KeysExchanged(_) => KEYS_EXCHANGED,
            Party1State::ProofsSent(_) => PROOFS_SENT,
            Party1State::SharedKeyComputed(_) => SHARED_KEY_COMPUTED,
            Party1State::KeyAgreed(_) => KEY_AGREED,
            Party1State::SignCommitted { .. } => SIGN_COMMITTED,
            Party1State::SignDecommitted { .. } => SIGN_DECOMMITTED,
            Party1State::Aborted => ABORTED,
        }
    }
}

fn unexpected(expected: &'static str, found: &Party1State) -> Errors {
    Errors::UnexpectedPhase {
        expected,
        found: found.name(),
    }
}

impl MasterKey1 {
    fn set_master_key(shares: KeyGenShares, q: Point) -> MasterKey1 {
        let party1_public = Party1Public {
            q,
            p1: shares.q1,
            p2: shares.q2,
            paillier_pub: shares.paillier.public_key.clone(),
            c_key: shares.c_key,
        };

        MasterKey1 {
            public: party1_public,
            private: Party1Private {
                x1: shares.x1,
                paillier: shares.paillier,
            },
        }
    }
}

/// The party holding the Paillier key and producing the final signature.
pub struct Party1 {
    curve: Curve,
    config: ProtocolConfig,
    sessions: SessionStore<Party1State>,
}

impl Party1 {
    pub fn new(config: ProtocolConfig) -> Result<Self, Errors> {
        let curve = Curve::new(config.curve.clone())?;
        Ok(Party1 {
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

    /// Master key of an agreed session.
    pub fn master_key(&self, session_id: &str) -> Result<MasterKey1, Errors> {
        self.sessions.inspect(session_id, |state| match state {
            Party1State::KeyAgreed(master)
            | Party1State::SignCommitted { master, .. }
            | Party1State::SignDecommitted { master, .. } => Ok(master.clone()),
            other => Err(unexpected(KEY_AGREED, other)),
        })
    }

    fn paillier_key_pair(&self) -> Result<PaillierKeyPair, Errors> {
        match &self.config.paillier.primes {
            Some(primes) => PaillierKeyPair::generate_random_keys(&primes.p, &primes.q),
            None => PaillierKeyPair::generate_with_modulus_size(self.config.paillier.modulus_bits),
        }
    }

    #[instrument(skip_all, fields(session = %session_id))]
    pub fn key_gen_first_message(&self, session_id: &str) -> Result<KeyGenFirstMsg, ProtocolError> {
        self.sessions.start(session_id, "key_gen_first_message", || {
            let q = self.curve.order();
            let three = BigInt::from(3);
            let lower = q.div_floor(&three);
            let upper = (BigInt::from(2) * q).div_floor(&three);
            let x1 = random_in_range(&lower, &upper)?;
            let q1 = self.curve.scalar_multiplication(self.curve.generator(), &x1)?;
            let committed = CommittedProof::commit_prove(&self.curve, &x1, &q1)?;

            let message = KeyGenFirstMsg {
                commitment: committed.commitment().clone(),
            };
            Ok((Party1State::KeyGenCommitted { x1, committed }, message))
        })
    }

    #[instrument(skip_all, fields(session = %session_id))]
    pub fn key_gen_second_message(
        &self,
        session_id: &str,
        party_two_message: &party2::KeyGenFirstMsg,
    ) -> Result<KeyGenParty1Message2, ProtocolError> {
        self.sessions.advance(
            session_id,
            "key_gen_second_message",
            KEY_GEN_COMMITTED,
            |state| {
                let (x1, committed) = match state {
                    Party1State::KeyGenCommitted { x1, committed } => (x1, committed),
                    other => return Err(unexpected(KEY_GEN_COMMITTED, &other)),
                };
                let q2 = verified_peer_point(&self.curve, &party_two_message.d_log_proof)?;
                debug!("party two key share proof verified");

                let q1 = committed.public_point().clone();
                let decommitment = committed.decommit();

                let paillier = self.paillier_key_pair()?;
                check_modulus_length(
                    &paillier.public_key,
                    self.curve.order(),
                    self.config.security_parameter,
                )?;
                let c_key_randomness = paillier.public_key.sample_randomness();
                let c_key = paillier
                    .public_key
                    .encrypt_with_randomness(&x1, &c_key_randomness)?;

                let message = KeyGenParty1Message2 {
                    decommitment,
                    paillier_public: paillier.public_key.clone(),
                    c_key: c_key.clone(),
                };
                let shares = KeyGenShares {
                    x1,
                    q1,
                    q2,
                    paillier,
                    c_key,
                    c_key_randomness,
                };
                Ok((Party1State::KeysExchanged(shares), message))
            },
        )
    }

    #[instrument(skip_all, fields(session = %session_id))]
    pub fn key_gen_zk_proofs(&self, session_id: &str) -> Result<KeyGenZkProofs, ProtocolError> {
        self.sessions
            .advance(session_id, "key_gen_zk_proofs", KEYS_EXCHANGED, |state| {
                let shares = match state {
                    Party1State::KeysExchanged(shares) => shares,
                    other => return Err(unexpected(KEYS_EXCHANGED, &other)),
                };

                let lp_proof = ModulusProof::prove(&shares.paillier)?;
                let statement = PdlStatement {
                    c_key: &shares.c_key,
                    paillier_public: &shares.paillier.public_key,
                    Q1: &shares.q1,
                };
                let witness = PdlWitness {
                    x1: &shares.x1,
                    randomness: &shares.c_key_randomness,
                };
                let lpdl_proof = PdlProof::prove(&self.curve, &statement, &witness)?;

                let proofs = KeyGenZkProofs {
                    lp_proof,
                    lpdl_proof,
                };
                Ok((Party1State::ProofsSent(shares), proofs))
            })
    }

    #[instrument(skip_all, fields(session = %session_id))]
    pub fn compute_shared_public_key(&self, session_id: &str) -> Result<Point, ProtocolError> {
        self.sessions
            .advance(session_id, "compute_shared_public_key", PROOFS_SENT, |state| {
                let shares = match state {
                    Party1State::ProofsSent(shares) => shares,
                    other => return Err(unexpected(PROOFS_SENT, &other)),
                };
                let q = self.curve.scalar_multiplication(&shares.q2, &shares.x1)?;
                let master = MasterKey1::set_master_key(shares, q.clone());
                Ok((Party1State::SharedKeyComputed(master), q))
            })
    }

    #[instrument(skip_all, fields(session = %session_id))]
    pub fn confirm_shared_key(
        &self,
        session_id: &str,
        party_two_q: &Point,
    ) -> Result<(), ProtocolError> {
        self.sessions.advance(
            session_id,
            "confirm_shared_key",
            SHARED_KEY_COMPUTED,
            |state| {
                let master = match state {
                    Party1State::SharedKeyComputed(master) => master,
                    other => return Err(unexpected(SHARED_KEY_COMPUTED, &other)),
                };
                if &master.public.q != party_two_q {
                    return Err(Errors::KeyMismatch);
                }
                Ok((Party1State::KeyAgreed(master), ()))
            },
        )
    }

    #[instrument(skip_all, fields(session = %session_id))]
    pub fn sign_first_message(&self, session_id: &str) -> Result<EphKeyGenFirstMsg, ProtocolError> {
        self.sessions
            .advance(session_id, "sign_first_message", KEY_AGREED, |state| {
                let master = match state {
                    Party1State::KeyAgreed(master) => master,
                    other => return Err(unexpected(KEY_AGREED, &other)),
                };
                let k1 = self.curve.random_scalar()?;
                let r1 = self.curve.scalar_multiplication(self.curve.generator(), &k1)?;
                let committed = CommittedProof::commit_prove(&self.curve, &k1, &r1)?;

                let message = EphKeyGenFirstMsg {
                    commitment: committed.commitment().clone(),
                };
                Ok((
                    Party1State::SignCommitted {
                        master,
                        k1,
                        committed,
                    },
                    message,
                ))
            })
    }

    #[instrument(skip_all, fields(session = %session_id))]
    pub fn sign_second_message(
        &self,
        session_id: &str,
        party_two_message: &party2::EphKeyGenFirstMsg,
    ) -> Result<EphKeyGenSecondMsg, ProtocolError> {
        self.sessions
            .advance(session_id, "sign_second_message", SIGN_COMMITTED, |state| {
                let (master, k1, committed) = match state {
                    Party1State::SignCommitted {
                        master,
                        k1,
                        committed,
                    } => (master, k1, committed),
                    other => return Err(unexpected(SIGN_COMMITTED, &other)),
                };
                let r2 = verified_peer_point(&self.curve, &party_two_message.d_log_proof)?;
                debug!("party two nonce proof verified");

                let message = EphKeyGenSecondMsg {
                    commitment: committed.commitment().clone(),
                    decommitment: committed.decommit(),
                };
                Ok((Party1State::SignDecommitted { master, k1, r2 }, message))
            })
    }

    /// Decrypts the partial signature, finishes it, and returns it only if it verifies
    /// under the shared key.
    #[instrument(skip_all, fields(session = %session_id))]
    pub fn sign_output(
        &self,
        session_id: &str,
        partial_sig: &party2::PartialSig,
        message: &BigInt,
    ) -> Result<Signature, ProtocolError> {
        self.sessions
            .advance(session_id, "sign_output", SIGN_DECOMMITTED, |state| {
                let (master, k1, r2) = match state {
                    Party1State::SignDecommitted { master, k1, r2 } => (master, k1, r2),
                    other => return Err(unexpected(SIGN_DECOMMITTED, &other)),
                };
                let q = self.curve.order();

                let r_point = self.curve.scalar_multiplication(&r2, &k1)?;
                let r = r_point
                    .x_coord()
                    .ok_or(Errors::SignatureVerificationFailed)?
                    .mod_floor(q);

                let s_tag = master.private.paillier.decrypt_cipher_text(&partial_sig.c3)?;
                let k1_inv = inv_mod(&k1, q)?;
                let s_tag_tag = BigInt::mod_mul(&k1_inv, &s_tag.mod_floor(q), q);
                let s = std::cmp::min(s_tag_tag.clone(), q - &s_tag_tag);

                if s > (q - BigInt::one()).div_floor(&BigInt::from(2)) {
                    return Err(Errors::SignatureTooHigh);
                }
                if r.is_zero() || s.is_zero() {
                    return Err(Errors::SignatureVerificationFailed);
                }

                let signature = Signature { r, s };
                ecdsa::verify(&self.curve, &signature, &master.public.q, message)?;
                debug!("signature verified under the shared key");
                Ok((Party1State::KeyAgreed(master), signature))
            })
    }
}
