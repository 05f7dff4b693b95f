use curv::arithmetic::*;
use curv::BigInt;
use paillier::{
    Decrypt, DecryptionKey, EncryptWithChosenRandomness, EncryptionKey, KeyGeneration, Paillier,
    Randomness, RawCiphertext, RawPlaintext,
};
use serde::{Deserialize, Serialize};

use crate::Errors;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaillierPublicKey {
    pub n: BigInt,
    pub g: BigInt,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PaillierPrivateKey {
    lambda: BigInt,
    p: BigInt,
    q: BigInt,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PaillierKeyPair {
    pub public_key: PaillierPublicKey,
    pub private_key: PaillierPrivateKey,
}

impl PaillierKeyPair {
    pub fn generate_random_keys(p: &BigInt, q: &BigInt) -> Result<Self, Errors> {
        if p == q {
            return Err(Errors::InvalidConfig(
                "Paillier primes must be distinct".to_string(),
            ));
        }
        let n = p * q;
        let g = &n + BigInt::one();
        let lambda = (p - BigInt::one()).lcm(&(q - BigInt::one()));
        // mu = L(g^lambda mod n^2)^-1 exists iff gcd(n, lambda) = 1
        if n.gcd(&lambda) != BigInt::one() {
            return Err(Errors::InvalidConfig(
                "Paillier primes admit no decryption constant".to_string(),
            ));
        }

        Ok(PaillierKeyPair {
            public_key: PaillierPublicKey { n, g },
            private_key: PaillierPrivateKey {
                lambda,
                p: p.clone(),
                q: q.clone(),
            },
        })
    }

    /// Draws fresh primes for a modulus of `bits` bits.
    pub fn generate_with_modulus_size(bits: usize) -> Result<Self, Errors> {
        let (_ek, dk) = Paillier::keypair_with_modulus_size(bits).keys();
        Self::generate_random_keys(&dk.p, &dk.q)
    }

    pub fn decrypt_cipher_text(&self, c: &BigInt) -> Result<BigInt, Errors> {
        self.private_key.decrypt_cipher_text(&self.public_key, c)
    }

    pub fn to_decryption_key(&self) -> DecryptionKey {
        self.private_key.to_decryption_key()
    }
}

impl PaillierPrivateKey {
    pub fn lambda(&self) -> &BigInt {
        &self.lambda
    }

    pub fn decrypt_cipher_text(
        &self,
        public_key: &PaillierPublicKey,
        c: &BigInt,
    ) -> Result<BigInt, Errors> {
        if !public_key.is_valid_ciphertext(c) {
            return Err(Errors::InvalidCiphertext);
        }
        let m = Paillier::decrypt(&self.to_decryption_key(), &RawCiphertext::from(c));
        Ok(m.0.into_owned())
    }

    pub fn to_decryption_key(&self) -> DecryptionKey {
        DecryptionKey {
            p: self.p.clone(),
            q: self.q.clone(),
        }
    }
}

impl PaillierPublicKey {
    pub fn nn(&self) -> BigInt {
        &self.n * &self.n
    }

    pub fn bit_length(&self) -> usize {
        self.n.bit_length()
    }

    /// Rejects moduli that cannot be a product of two odd primes before any
    /// arithmetic runs on them.
    pub fn check_modulus(&self) -> Result<(), Errors> {
        if self.n <= BigInt::one() || self.n.is_even() {
            return Err(Errors::ProofVerificationFailed(
                "Paillier modulus is not an odd integer above 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Encryption below is only defined for the generator `n + 1`.
    pub fn has_standard_generator(&self) -> bool {
        self.g == &self.n + BigInt::one()
    }

    /// Ciphertexts live in `Z*_{n^2}`.
    pub fn is_valid_ciphertext(&self, c: &BigInt) -> bool {
        let nn = self.nn();
        c >= &BigInt::one() && c < &nn && c.gcd(&nn) == BigInt::one()
    }

    pub fn is_valid_randomness(&self, r: &BigInt) -> bool {
        r >= &BigInt::one() && r < &self.n && r.gcd(&self.n) == BigInt::one()
    }

    /// Uniform element of `Z*_n`.
    pub fn sample_randomness(&self) -> BigInt {
        loop {
            let r = BigInt::sample_range(&BigInt::one(), &self.n);
            if r.gcd(&self.n) == BigInt::one() {
                return r;
            }
        }
    }

    pub fn encrypt_message(&self, m: &BigInt) -> Result<BigInt, Errors> {
        let r = self.sample_randomness();
        self.encrypt_with_randomness(m, &r)
    }

    pub fn encrypt_with_randomness(&self, m: &BigInt, r: &BigInt) -> Result<BigInt, Errors> {
        if m < &BigInt::zero() || m >= &self.n {
            return Err(Errors::InvalidMessage);
        }
        if !self.is_valid_randomness(r) {
            return Err(Errors::InvalidScalar);
        }
        if !self.has_standard_generator() {
            return Err(Errors::InvalidConfig(
                "Paillier generator is not n + 1".to_string(),
            ));
        }
        let c = Paillier::encrypt_with_chosen_randomness(
            &self.to_encryption_key(),
            RawPlaintext::from(m),
            &Randomness::from(r),
        );
        Ok(c.0.into_owned())
    }

    pub fn to_encryption_key(&self) -> EncryptionKey {
        EncryptionKey {
            n: self.n.clone(),
            nn: self.nn(),
        }
    }
}
