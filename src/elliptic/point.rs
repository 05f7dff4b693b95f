use std::fmt;

use curv::arithmetic::*;
use curv::BigInt;
use serde::{Deserialize, Serialize};

/// A point of a short Weierstrass curve group.
///
/// The group identity is a variant of its own rather than a reserved
/// coordinate pair, so `(0, 0)` stays an ordinary affine point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Point {
    Infinity,
    Affine { x: BigInt, y: BigInt },
}

impl Point {
    pub fn new(x: BigInt, y: BigInt) -> Self {
        Point::Affine { x, y }
    }

    pub fn is_infinity(&self) -> bool {
        matches!(self, Point::Infinity)
    }

    pub fn x_coord(&self) -> Option<&BigInt> {
        match self {
            Point::Infinity => None,
            Point::Affine { x, .. } => Some(x),
        }
    }

    pub fn y_coord(&self) -> Option<&BigInt> {
        match self {
            Point::Infinity => None,
            Point::Affine { y, .. } => Some(y),
        }
    }
}

/// Canonical decimal form, used as hash preimage.
impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Point::Infinity => write!(f, "inf"),
            Point::Affine { x, y } => {
                write!(f, "{},{}", x.to_str_radix(10), y.to_str_radix(10))
            }
        }
    }
}
