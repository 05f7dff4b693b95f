use curv::arithmetic::*;
use curv::BigInt;

use super::party1::{KeyGenParty1Message2, KeyGenZkProofs};
use super::{new_session_id, run_key_gen, run_signing, Party1, Party2};
use crate::config::ProtocolConfig;
use crate::cryptographic_primitives::hashing::h_q;
use crate::ecdsa;
use crate::{Errors, ProtocolError};

fn parties(config: ProtocolConfig) -> (Party1, Party2) {
    crate::init_test_tracing();
    let party1 = Party1::new(config.clone()).unwrap();
    let party2 = Party2::new(config).unwrap();
    (party1, party2)
}

/// Runs key generation up to the message P2 has to verify.
fn key_gen_until_proofs(
    party1: &Party1,
    party2: &Party2,
    session_id: &str,
) -> (KeyGenParty1Message2, KeyGenZkProofs) {
    let p1_first = party1.key_gen_first_message(session_id).unwrap();
    let p2_first = party2.key_gen_first_message(session_id, &p1_first).unwrap();
    let p1_second = party1.key_gen_second_message(session_id, &p2_first).unwrap();
    let zk_proofs = party1.key_gen_zk_proofs(session_id).unwrap();
    (p1_second, zk_proofs)
}

fn assert_aborted(err: &ProtocolError, session_id: &str, step: &str) {
    assert_eq!(err.session_id, session_id);
    assert_eq!(err.step, step);
}

fn assert_key_gen_agreement(party1: &Party1, party2: &Party2) {
    let curve = party1.curve();
    let session_id = new_session_id();

    let q = run_key_gen(party1, party2, &session_id).unwrap();
    assert_eq!(party1.phase(&session_id).unwrap(), "KeyAgreed");
    assert_eq!(party2.phase(&session_id).unwrap(), "KeyAgreed");

    let master_key1 = party1.master_key(&session_id).unwrap();
    let master_key2 = party2.master_key(&session_id).unwrap();
    assert_eq!(master_key1.public.q, q);
    assert_eq!(master_key2.public.q, q);
    assert_eq!(master_key1.public.p1, master_key2.public.p1);
    assert_eq!(master_key1.public.p2, master_key2.public.p2);
    assert_eq!(master_key1.public.c_key, master_key2.public.c_key);
    assert_eq!(master_key1.public.paillier_pub, master_key2.public.paillier_pub);

    let order = curve.order();
    let x1 = &master_key1.private.x1;
    assert!(x1 >= &order.div_floor(&BigInt::from(3)));
    assert!(x1 < &(BigInt::from(2) * order).div_floor(&BigInt::from(3)));

    let x = BigInt::mod_mul(x1, &master_key2.private.x2, order);
    assert_eq!(
        curve.scalar_multiplication(curve.generator(), &x).unwrap(),
        q
    );
    let c_key_plaintext = master_key1
        .private
        .paillier
        .decrypt_cipher_text(&master_key1.public.c_key)
        .unwrap();
    assert_eq!(&c_key_plaintext, x1);
}

#[test]
fn test_key_gen_agreement() {
    for config in [ProtocolConfig::toy_small(), ProtocolConfig::toy_signing()] {
        let (party1, party2) = parties(config);
        for _ in 0..20 {
            assert_key_gen_agreement(&party1, &party2);
        }
        assert_eq!(party1.session_count(), 20);
        assert_eq!(party2.session_count(), 20);
    }
}

#[test]
fn test_signing_end_to_end() {
    let (party1, party2) = parties(ProtocolConfig::toy_signing());
    let curve = party1.curve().clone();
    let order = curve.order().clone();
    let half_order = (&order - BigInt::one()).div_floor(&BigInt::from(2));
    let session_id = new_session_id();
    let q = run_key_gen(&party1, &party2, &session_id).unwrap();

    for message in ["hello", "two-party ecdsa", "1234"] {
        let message = h_q(message.as_bytes(), &order);
        let signature = run_signing(&party1, &party2, &session_id, &message).unwrap();

        assert!(signature.r > BigInt::zero() && signature.r < order);
        assert!(signature.s > BigInt::zero() && signature.s <= half_order);
        assert!(ecdsa::verify(&curve, &signature, &q, &message).is_ok());
        assert_eq!(party1.phase(&session_id).unwrap(), "KeyAgreed");
        assert_eq!(party2.phase(&session_id).unwrap(), "KeyAgreed");
    }
}

#[test]
fn test_out_of_order_call_leaves_session_intact() {
    let (party1, party2) = parties(ProtocolConfig::toy_small());
    let session_id = new_session_id();
    let p1_first = party1.key_gen_first_message(&session_id).unwrap();

    let err = party1.key_gen_zk_proofs(&session_id).unwrap_err();
    assert_eq!(
        err.source,
        Errors::UnexpectedPhase {
            expected: "KeysExchanged",
            found: "KeyGenCommitted",
        }
    );
    let err = party1.sign_first_message(&session_id).unwrap_err();
    assert!(matches!(err.source, Errors::UnexpectedPhase { .. }));
    assert_eq!(party1.phase(&session_id).unwrap(), "KeyGenCommitted");

    let p2_first = party2.key_gen_first_message(&session_id, &p1_first).unwrap();
    let p1_second = party1.key_gen_second_message(&session_id, &p2_first).unwrap();
    party2.key_gen_second_message(&session_id, &p1_second).unwrap();
    let zk_proofs = party1.key_gen_zk_proofs(&session_id).unwrap();
    party2.verify_key_gen_proofs(&session_id, &zk_proofs).unwrap();
    let q1 = party1.compute_shared_public_key(&session_id).unwrap();
    let q2 = party2.compute_shared_public_key(&session_id).unwrap();
    party1.confirm_shared_key(&session_id, &q2).unwrap();
    party2.confirm_shared_key(&session_id, &q1).unwrap();
    assert_eq!(q1, q2);
}

#[test]
fn test_unknown_session() {
    let (party1, party2) = parties(ProtocolConfig::toy_small());
    let err = party1.sign_first_message("missing").unwrap_err();
    assert_eq!(err.source, Errors::UnknownSession);
    assert_eq!(err.session_id, "missing");
    let err = party2.compute_shared_public_key("missing").unwrap_err();
    assert_eq!(err.source, Errors::UnknownSession);
    assert!(party1.master_key("missing").is_err());
}

#[test]
fn test_reused_session_id_rejected() {
    let (party1, party2) = parties(ProtocolConfig::toy_small());
    let session_id = new_session_id();
    run_key_gen(&party1, &party2, &session_id).unwrap();

    let err = run_key_gen(&party1, &party2, &session_id).unwrap_err();
    assert_eq!(err.source, Errors::SessionInUse);
    assert_eq!(err.step, "key_gen_first_message");
    assert_eq!(party1.phase(&session_id).unwrap(), "KeyAgreed");

    assert!(party1.close_session(&session_id));
    assert_eq!(party1.phase(&session_id), Err(Errors::UnknownSession));
}

#[test]
fn test_tampered_party_two_proof_aborts() {
    let (party1, party2) = parties(ProtocolConfig::toy_signing());
    let session_id = new_session_id();
    let p1_first = party1.key_gen_first_message(&session_id).unwrap();
    let mut p2_first = party2.key_gen_first_message(&session_id, &p1_first).unwrap();
    let order = party1.curve().order().clone();
    p2_first.d_log_proof.s = (&p2_first.d_log_proof.s + BigInt::one()).mod_floor(&order);

    let err = party1
        .key_gen_second_message(&session_id, &p2_first)
        .unwrap_err();
    assert_aborted(&err, &session_id, "key_gen_second_message");
    assert!(matches!(err.source, Errors::ProofVerificationFailed(_)));
    assert_eq!(party1.phase(&session_id), Err(Errors::UnknownSession));
}

#[test]
fn test_tampered_decommitment_aborts() {
    let (party1, party2) = parties(ProtocolConfig::toy_signing());
    let session_id = new_session_id();
    let (mut p1_second, zk_proofs) = key_gen_until_proofs(&party1, &party2, &session_id);
    let curve = party1.curve();
    p1_second.decommitment.t = curve
        .point_addition(&p1_second.decommitment.t, curve.generator())
        .unwrap();

    party2
        .key_gen_second_message(&session_id, &p1_second)
        .unwrap();
    let err = party2
        .verify_key_gen_proofs(&session_id, &zk_proofs)
        .unwrap_err();
    assert_aborted(&err, &session_id, "verify_key_gen_proofs");
    assert!(matches!(err.source, Errors::ProofVerificationFailed(_)));
    assert_eq!(party2.phase(&session_id), Err(Errors::UnknownSession));
}

#[test]
fn test_substituted_c_key_aborts() {
    let (party1, party2) = parties(ProtocolConfig::toy_signing());
    let session_id = new_session_id();
    let (mut p1_second, zk_proofs) = key_gen_until_proofs(&party1, &party2, &session_id);
    p1_second.c_key = p1_second
        .paillier_public
        .encrypt_message(&BigInt::from(42))
        .unwrap();

    party2
        .key_gen_second_message(&session_id, &p1_second)
        .unwrap();
    let err = party2
        .verify_key_gen_proofs(&session_id, &zk_proofs)
        .unwrap_err();
    assert!(matches!(err.source, Errors::ProofVerificationFailed(_)));
    assert_eq!(party2.session_count(), 0);
}

#[test]
fn test_invalid_c_key_aborts() {
    let (party1, party2) = parties(ProtocolConfig::toy_signing());
    let session_id = new_session_id();
    let (mut p1_second, zk_proofs) = key_gen_until_proofs(&party1, &party2, &session_id);
    p1_second.c_key = p1_second.paillier_public.n.clone();

    party2
        .key_gen_second_message(&session_id, &p1_second)
        .unwrap();
    let err = party2
        .verify_key_gen_proofs(&session_id, &zk_proofs)
        .unwrap_err();
    assert_eq!(err.source, Errors::InvalidCiphertext);
}

#[test]
fn test_truncated_modulus_proof_aborts() {
    let (party1, party2) = parties(ProtocolConfig::toy_signing());
    let session_id = new_session_id();
    let (p1_second, mut zk_proofs) = key_gen_until_proofs(&party1, &party2, &session_id);
    zk_proofs.lp_proof.correct_key_proof.sigma_vec.truncate(1);

    party2
        .key_gen_second_message(&session_id, &p1_second)
        .unwrap();
    let err = party2
        .verify_key_gen_proofs(&session_id, &zk_proofs)
        .unwrap_err();
    assert_aborted(&err, &session_id, "verify_key_gen_proofs");
    assert!(matches!(err.source, Errors::ProofVerificationFailed(_)));
    assert_eq!(party2.phase(&session_id), Err(Errors::UnknownSession));
}

#[test]
fn test_malformed_paillier_modulus_aborts() {
    let (party1, party2) = parties(ProtocolConfig::toy_signing());
    let honest_n = {
        let session_id = new_session_id();
        let (p1_second, _) = key_gen_until_proofs(&party1, &party2, &session_id);
        p1_second.paillier_public.n
    };
    let negative_n = BigInt::zero() - &honest_n;
    let even_n = &honest_n + BigInt::one();

    for bad_n in [negative_n, even_n, BigInt::zero()] {
        let session_id = new_session_id();
        let (mut p1_second, mut zk_proofs) =
            key_gen_until_proofs(&party1, &party2, &session_id);
        p1_second.paillier_public.g = &bad_n + BigInt::one();
        p1_second.paillier_public.n = bad_n.clone();
        zk_proofs.lp_proof.n = bad_n;

        party2
            .key_gen_second_message(&session_id, &p1_second)
            .unwrap();
        let err = party2
            .verify_key_gen_proofs(&session_id, &zk_proofs)
            .unwrap_err();
        assert_aborted(&err, &session_id, "verify_key_gen_proofs");
        assert!(matches!(err.source, Errors::ProofVerificationFailed(_)));
        assert!(!party2.close_session(&session_id));
    }
}

#[test]
fn test_short_paillier_modulus_rejected() {
    let mut config = ProtocolConfig::toy_signing();
    config.security_parameter = 1024;
    let (party1, party2) = parties(config);
    let session_id = new_session_id();
    let p1_first = party1.key_gen_first_message(&session_id).unwrap();
    let p2_first = party2.key_gen_first_message(&session_id, &p1_first).unwrap();

    let err = party1
        .key_gen_second_message(&session_id, &p2_first)
        .unwrap_err();
    assert_eq!(
        err.source,
        Errors::KeyTooShort {
            bits: 256,
            required: 1024,
        }
    );
}

#[test]
fn test_key_mismatch_aborts() {
    let (party1, party2) = parties(ProtocolConfig::toy_small());
    let session_id = new_session_id();
    let (p1_second, zk_proofs) = key_gen_until_proofs(&party1, &party2, &session_id);
    party2
        .key_gen_second_message(&session_id, &p1_second)
        .unwrap();
    party2
        .verify_key_gen_proofs(&session_id, &zk_proofs)
        .unwrap();

    let q = party1.compute_shared_public_key(&session_id).unwrap();
    let curve = party1.curve();
    let wrong = curve.point_addition(&q, curve.generator()).unwrap();
    let err = party1.confirm_shared_key(&session_id, &wrong).unwrap_err();
    assert_aborted(&err, &session_id, "confirm_shared_key");
    assert_eq!(err.source, Errors::KeyMismatch);
    assert_eq!(party1.phase(&session_id), Err(Errors::UnknownSession));
}

#[test]
fn test_tampered_partial_signature_aborts() {
    let (party1, party2) = parties(ProtocolConfig::toy_signing());
    let session_id = new_session_id();
    run_key_gen(&party1, &party2, &session_id).unwrap();
    let message = h_q(b"tampered", party1.curve().order());

    let p1_first = party1.sign_first_message(&session_id).unwrap();
    let p2_first = party2.sign_first_message(&session_id, &p1_first).unwrap();
    let p1_second = party1.sign_second_message(&session_id, &p2_first).unwrap();
    let mut partial_sig = party2
        .sign_second_message(&session_id, &p1_second, &message)
        .unwrap();

    let paillier_public = party2.master_key(&session_id).unwrap().public.paillier_pub;
    partial_sig.c3 = paillier_public.add_cipher_texts(&partial_sig.c3, &partial_sig.c3);
    let err = party1
        .sign_output(&session_id, &partial_sig, &message)
        .unwrap_err();
    assert_aborted(&err, &session_id, "sign_output");
    assert_eq!(err.source, Errors::SignatureVerificationFailed);
}

#[test]
fn test_mismatched_signing_commitment_aborts() {
    let (party1, party2) = parties(ProtocolConfig::toy_signing());
    let session_id = new_session_id();
    run_key_gen(&party1, &party2, &session_id).unwrap();
    let message = h_q(b"commitment", party1.curve().order());

    let p1_first = party1.sign_first_message(&session_id).unwrap();
    let p2_first = party2.sign_first_message(&session_id, &p1_first).unwrap();
    let mut p1_second = party1.sign_second_message(&session_id, &p2_first).unwrap();
    p1_second.commitment.h = &p1_second.commitment.h + BigInt::one();

    let err = party2
        .sign_second_message(&session_id, &p1_second, &message)
        .unwrap_err();
    assert_aborted(&err, &session_id, "sign_second_message");
    assert!(matches!(err.source, Errors::ProofVerificationFailed(_)));
    assert_eq!(party2.phase(&session_id), Err(Errors::UnknownSession));
}

#[test]
fn test_parallel_sessions() {
    let (party1, party2) = parties(ProtocolConfig::toy_signing());
    let curve = party1.curve().clone();

    std::thread::scope(|scope| {
        let handles = (0..4)
            .map(|i| {
                let (party1, party2) = (&party1, &party2);
                scope.spawn(move || {
                    let session_id = format!("parallel-{}", i);
                    let q = run_key_gen(party1, party2, &session_id).unwrap();
                    let message = h_q(session_id.as_bytes(), party1.curve().order());
                    let signature = run_signing(party1, party2, &session_id, &message).unwrap();
                    (q, message, signature)
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            let (q, message, signature) = handle.join().unwrap();
            assert!(ecdsa::verify(&curve, &signature, &q, &message).is_ok());
        }
    });
    assert_eq!(party1.session_count(), 4);
    assert_eq!(party2.session_count(), 4);
}

#[test]
fn test_messages_through_json() {
    let (party1, party2) = parties(ProtocolConfig::toy_signing());
    let session_id = new_session_id();

    fn relay<T: serde::Serialize + serde::de::DeserializeOwned>(message: &T) -> T {
        let json = serde_json::to_string(message).unwrap();
        serde_json::from_str(&json).unwrap()
    }

    let p1_first = relay(&party1.key_gen_first_message(&session_id).unwrap());
    let p2_first = relay(&party2.key_gen_first_message(&session_id, &p1_first).unwrap());
    let p1_second = relay(&party1.key_gen_second_message(&session_id, &p2_first).unwrap());
    assert_eq!(relay(&p1_second), p1_second);
    party2
        .key_gen_second_message(&session_id, &p1_second)
        .unwrap();
    let zk_proofs = relay(&party1.key_gen_zk_proofs(&session_id).unwrap());
    party2
        .verify_key_gen_proofs(&session_id, &zk_proofs)
        .unwrap();
    let q1 = relay(&party1.compute_shared_public_key(&session_id).unwrap());
    let q2 = relay(&party2.compute_shared_public_key(&session_id).unwrap());
    party1.confirm_shared_key(&session_id, &q2).unwrap();
    party2.confirm_shared_key(&session_id, &q1).unwrap();

    let message = h_q(b"over the wire", party1.curve().order());
    let s1 = relay(&party1.sign_first_message(&session_id).unwrap());
    let s2 = relay(&party2.sign_first_message(&session_id, &s1).unwrap());
    let s3 = relay(&party1.sign_second_message(&session_id, &s2).unwrap());
    let partial_sig = relay(&party2.sign_second_message(&session_id, &s3, &message).unwrap());
    let signature = relay(&party1.sign_output(&session_id, &partial_sig, &message).unwrap());
    assert!(ecdsa::verify(party1.curve(), &signature, &q1, &message).is_ok());

    let master_key1 = relay(&party1.master_key(&session_id).unwrap());
    assert_eq!(master_key1.public.q, q1);
}
