//! Two-party ECDSA in the style of Lindell 2017.
//!
//! P1 and P2 generate a shared public key `Q = x1·x2·G` without either share
//! leaving its owner, then jointly sign: P2 homomorphically builds an encrypted
//! partial signature under P1's Paillier key and P1 finishes and verifies it.
//! Curve arithmetic is generic over short Weierstrass curves so the protocol can
//! run over toy parameters as well as secp256k1.

use thiserror::Error;

pub mod config;
pub mod cryptographic_primitives;
pub mod ecdsa;
pub mod elliptic;
pub mod encryption;

pub use config::{CurveParams, PaillierConfig, ProtocolConfig};
pub use ecdsa::two_party::{MasterKey1, MasterKey2, Party1, Party2};
pub use ecdsa::Signature;
pub use elliptic::{Curve, Point};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Errors {
    #[error("point is not on the curve")]
    InvalidPoint,
    #[error("scalar is out of range")]
    InvalidScalar,
    #[error("value is not invertible modulo the given modulus")]
    NotInvertible,
    #[error("proof has a zero challenge or response")]
    DegenerateProof,
    #[error("proof verification failed: {0}")]
    ProofVerificationFailed(String),
    #[error("Paillier modulus has {bits} bits, at least {required} are required")]
    KeyTooShort { bits: usize, required: usize },
    #[error("ciphertext is not in Z*_{{n^2}}")]
    InvalidCiphertext,
    #[error("plaintext is not in [0, n)")]
    InvalidMessage,
    #[error("the parties derived different shared public keys")]
    KeyMismatch,
    #[error("signature s is above (q-1)/2")]
    SignatureTooHigh,
    #[error("signature verification failed")]
    SignatureVerificationFailed,
    #[error("unknown session")]
    UnknownSession,
    #[error("session id is already in use")]
    SessionInUse,
    #[error("expected phase {expected}, session is in {found}")]
    UnexpectedPhase {
        expected: &'static str,
        found: &'static str,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failure of a protocol step, tagged with the session and step it belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("session {session_id}, step {step}: {source}")]
pub struct ProtocolError {
    pub session_id: String,
    pub step: &'static str,
    pub source: Errors,
}

impl ProtocolError {
    pub fn new(session_id: &str, step: &'static str, source: Errors) -> Self {
        ProtocolError {
            session_id: session_id.to_string(),
            step,
            source,
        }
    }
}

#[cfg(test)]
pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
