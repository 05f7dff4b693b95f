pub mod curve;
pub mod point;

pub use curve::{inv_mod, random, random_in_range, Curve, KeyPair};
pub use point::Point;
