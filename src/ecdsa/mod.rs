use curv::arithmetic::*;
use curv::BigInt;
use serde::{Deserialize, Serialize};

use crate::elliptic::{inv_mod, Curve, Point};
use crate::Errors;

pub mod two_party;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub r: BigInt,
    pub s: BigInt,
}

/// Standard ECDSA verification of `signature` on the message representative `message`.
pub fn verify(
    curve: &Curve,
    signature: &Signature,
    public_key: &Point,
    message: &BigInt,
) -> Result<(), Errors> {
    let q = curve.order();
    let zero = BigInt::zero();
    if signature.r <= zero || &signature.r >= q || signature.s <= zero || &signature.s >= q {
        return Err(Errors::SignatureVerificationFailed);
    }

    let s_inv = inv_mod(&signature.s, q).map_err(|_| Errors::SignatureVerificationFailed)?;
    let u1 = BigInt::mod_mul(&message.mod_floor(q), &s_inv, q);
    let u2 = BigInt::mod_mul(&signature.r, &s_inv, q);
    let u1_g = curve.scalar_multiplication(curve.generator(), &u1)?;
    let u2_q = curve.scalar_multiplication(public_key, &u2)?;

    match curve.point_addition(&u1_g, &u2_q)?.x_coord() {
        Some(x) if x.mod_floor(q) == signature.r => Ok(()),
        _ => Err(Errors::SignatureVerificationFailed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CurveParams;
    use crate::cryptographic_primitives::hashing::h_q;

    // single-key signature for exercising the verifier
    fn sign(curve: &Curve, d: &BigInt, message: &BigInt) -> Signature {
        let q = curve.order();
        loop {
            let k = curve.random_scalar().unwrap();
            let point = curve.scalar_multiplication(curve.generator(), &k).unwrap();
            let r = point.x_coord().unwrap().mod_floor(q);
            let k_inv = inv_mod(&k, q).unwrap();
            let s = BigInt::mod_mul(&k_inv, &(message + &r * d), q);
            if !r.is_zero() && !s.is_zero() {
                return Signature { r, s };
            }
        }
    }

    #[test]
    fn test_verify() {
        let curve = Curve::new(CurveParams::toy_signing()).unwrap();
        let key_pair = curve.generate_key_pair().unwrap();
        let message = h_q(b"hello", curve.order());
        let signature = sign(&curve, &key_pair.private_key, &message);
        assert!(verify(&curve, &signature, &key_pair.public_key, &message).is_ok());

        let other = (&message + BigInt::one()).mod_floor(curve.order());
        assert_eq!(
            verify(&curve, &signature, &key_pair.public_key, &other),
            Err(Errors::SignatureVerificationFailed)
        );
    }

    #[test]
    fn test_out_of_range_rejected() {
        let curve = Curve::new(CurveParams::toy_signing()).unwrap();
        let key_pair = curve.generate_key_pair().unwrap();
        let message = BigInt::from(1234);
        let mut signature = sign(&curve, &key_pair.private_key, &message);
        signature.s = &signature.s + curve.order();
        assert_eq!(
            verify(&curve, &signature, &key_pair.public_key, &message),
            Err(Errors::SignatureVerificationFailed)
        );
    }
}
