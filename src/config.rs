//! Protocol parameters shared by both parties.
//!
//! Integers are carried as decimal strings in JSON so that values wider than
//! 64 bits survive every serializer unchanged.

use curv::arithmetic::*;
use curv::BigInt;
use serde::{Deserialize, Serialize};

use crate::elliptic::point::Point;
use crate::Errors;

pub const DEFAULT_SECURITY_PARAMETER: usize = 128;
pub const DEFAULT_PAILLIER_MODULUS_BITS: usize = 2048;

const TOY_PAILLIER_P: &str = "281062564983417584197879099904493071909";
const TOY_PAILLIER_Q: &str = "266887658682941094264835878405310435687";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveParams {
    #[serde(with = "decimal")]
    pub a: BigInt,
    #[serde(with = "decimal")]
    pub b: BigInt,
    #[serde(with = "decimal")]
    pub p: BigInt,
    #[serde(with = "decimal")]
    pub q: BigInt,
    #[serde(with = "affine_point")]
    pub g: Point,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaillierPrimes {
    #[serde(with = "decimal")]
    pub p: BigInt,
    #[serde(with = "decimal")]
    pub q: BigInt,
}

/// Paillier key material source: fixed primes when present, otherwise fresh
/// primes for a modulus of `modulus_bits`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaillierConfig {
    #[serde(default)]
    pub primes: Option<PaillierPrimes>,
    #[serde(default = "default_modulus_bits")]
    pub modulus_bits: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub curve: CurveParams,
    pub paillier: PaillierConfig,
    #[serde(default = "default_security_parameter")]
    pub security_parameter: usize,
}

fn default_modulus_bits() -> usize {
    DEFAULT_PAILLIER_MODULUS_BITS
}

fn default_security_parameter() -> usize {
    DEFAULT_SECURITY_PARAMETER
}

fn constant(digits: &'static str, radix: u8) -> BigInt {
    BigInt::from_str_radix(digits, radix).expect("hard-coded constant is well formed")
}

impl CurveParams {
    /// `y^2 = x^3 - 2x + 7` over `F_17`, generator of order 11.
    pub fn toy_small() -> Self {
        CurveParams {
            a: BigInt::zero() - BigInt::from(2),
            b: BigInt::from(7),
            p: BigInt::from(17),
            q: BigInt::from(11),
            g: Point::new(BigInt::from(9), BigInt::from(15)),
        }
    }

    /// `y^2 = x^3 + 9158x + 7614` over `F_9967`, generator of order 10133.
    pub fn toy_signing() -> Self {
        CurveParams {
            a: BigInt::from(9158),
            b: BigInt::from(7614),
            p: BigInt::from(9967),
            q: BigInt::from(10133),
            g: Point::new(BigInt::from(3779), BigInt::from(1910)),
        }
    }

    pub fn secp256k1() -> Self {
        CurveParams {
            a: BigInt::zero(),
            b: BigInt::from(7),
            p: constant(
                "fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f",
                16,
            ),
            q: constant(
                "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141",
                16,
            ),
            g: Point::new(
                constant(
                    "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
                    16,
                ),
                constant(
                    "483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8",
                    16,
                ),
            ),
        }
    }
}

impl PaillierConfig {
    pub fn with_primes(p: BigInt, q: BigInt) -> Self {
        PaillierConfig {
            primes: Some(PaillierPrimes { p, q }),
            modulus_bits: DEFAULT_PAILLIER_MODULUS_BITS,
        }
    }

    pub fn generated(modulus_bits: usize) -> Self {
        PaillierConfig {
            primes: None,
            modulus_bits,
        }
    }

    fn toy() -> Self {
        Self::with_primes(constant(TOY_PAILLIER_P, 10), constant(TOY_PAILLIER_Q, 10))
    }
}

impl Default for PaillierConfig {
    fn default() -> Self {
        Self::generated(DEFAULT_PAILLIER_MODULUS_BITS)
    }
}

impl ProtocolConfig {
    pub fn new(curve: CurveParams, paillier: PaillierConfig) -> Self {
        ProtocolConfig {
            curve,
            paillier,
            security_parameter: DEFAULT_SECURITY_PARAMETER,
        }
    }

    pub fn toy_small() -> Self {
        Self::new(CurveParams::toy_small(), PaillierConfig::toy())
    }

    pub fn toy_signing() -> Self {
        Self::new(CurveParams::toy_signing(), PaillierConfig::toy())
    }

    pub fn from_json(json: &str) -> Result<Self, Errors> {
        serde_json::from_str(json).map_err(|e| Errors::InvalidConfig(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, Errors> {
        serde_json::to_string(self).map_err(|e| Errors::InvalidConfig(e.to_string()))
    }
}

mod decimal {
    use curv::arithmetic::Converter;
    use curv::BigInt;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        let digits = String::deserialize(deserializer)?;
        BigInt::from_str_radix(&digits, 10)
            .map_err(|_| D::Error::custom(format!("`{}` is not a decimal integer", digits)))
    }
}

mod affine_point {
    use curv::BigInt;
    use serde::{ser::Error, Deserialize, Deserializer, Serialize, Serializer};

    use crate::elliptic::point::Point;

    #[derive(Serialize, Deserialize)]
    struct Coordinates {
        #[serde(with = "super::decimal")]
        x: BigInt,
        #[serde(with = "super::decimal")]
        y: BigInt,
    }

    pub fn serialize<S: Serializer>(point: &Point, serializer: S) -> Result<S::Ok, S::Error> {
        match point {
            Point::Affine { x, y } => Coordinates {
                x: x.clone(),
                y: y.clone(),
            }
            .serialize(serializer),
            Point::Infinity => Err(S::Error::custom("generator must be an affine point")),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Point, D::Error> {
        let Coordinates { x, y } = Coordinates::deserialize(deserializer)?;
        Ok(Point::new(x, y))
    }
}
