use curv::arithmetic::*;
use curv::BigInt;

use super::point::Point;
use crate::config::CurveParams;
use crate::Errors;

/// Secret scalar together with its public multiple of the generator.
#[derive(Clone)]
pub struct KeyPair {
    pub private_key: BigInt,
    pub public_key: Point,
}

/// Group operations over `y^2 = x^3 + ax + b (mod p)` with a generator of prime order `q`.
#[derive(Clone, Debug)]
pub struct Curve {
    params: CurveParams,
}

impl Curve {
    pub fn new(params: CurveParams) -> Result<Self, Errors> {
        if params.p <= BigInt::from(3) {
            return Err(Errors::InvalidConfig(
                "field prime must be greater than 3".to_string(),
            ));
        }
        if params.q <= BigInt::one() {
            return Err(Errors::InvalidConfig(
                "group order must be greater than 1".to_string(),
            ));
        }
        let curve = Curve { params };
        if curve.params.g.is_infinity() || !curve.is_point(&curve.params.g) {
            return Err(Errors::InvalidConfig(
                "generator is not an affine point on the curve".to_string(),
            ));
        }
        Ok(curve)
    }

    pub fn params(&self) -> &CurveParams {
        &self.params
    }

    pub fn generator(&self) -> &Point {
        &self.params.g
    }

    pub fn order(&self) -> &BigInt {
        &self.params.q
    }

    pub fn field_prime(&self) -> &BigInt {
        &self.params.p
    }

    pub fn is_point(&self, point: &Point) -> bool {
        match point {
            Point::Infinity => true,
            Point::Affine { x, y } => {
                let p = self.field_prime();
                let zero = BigInt::zero();
                if x < &zero || x >= p || y < &zero || y >= p {
                    return false;
                }
                let lhs = BigInt::mod_mul(y, y, p);
                let rhs = (x * x * x + &self.params.a * x + &self.params.b).mod_floor(p);
                lhs == rhs
            }
        }
    }

    pub fn point_addition(&self, a: &Point, b: &Point) -> Result<Point, Errors> {
        let (x1, y1, x2, y2) = match (a, b) {
            (Point::Infinity, _) => return Ok(b.clone()),
            (_, Point::Infinity) => return Ok(a.clone()),
            (Point::Affine { x: x1, y: y1 }, Point::Affine { x: x2, y: y2 }) => {
                (x1, y1, x2, y2)
            }
        };
        let p = self.field_prime();

        if x1 == x2 && (y1 + y2).mod_floor(p).is_zero() {
            return Ok(Point::Infinity);
        }
        let lambda = if x1 != x2 {
            self.div_mod(&(y2 - y1), &(x2 - x1))?
        } else if y1 == y2 {
            let numerator = BigInt::from(3) * x1 * x1 + &self.params.a;
            self.div_mod(&numerator, &(BigInt::from(2) * y1))?
        } else {
            // equal x with unrelated y only happens for points off the curve
            return Err(Errors::InvalidPoint);
        };

        let x3 = (&lambda * &lambda - x1 - x2).mod_floor(p);
        let y3 = (&lambda * (x1 - &x3) - y1).mod_floor(p);
        Ok(Point::Affine { x: x3, y: y3 })
    }

    pub fn point_double(&self, point: &Point) -> Result<Point, Errors> {
        self.point_addition(point, point)
    }

    pub fn point_negation(&self, point: &Point) -> Point {
        match point {
            Point::Infinity => Point::Infinity,
            Point::Affine { x, y } => Point::Affine {
                x: x.clone(),
                y: (BigInt::zero() - y).mod_floor(self.field_prime()),
            },
        }
    }

    /// Double-and-add, consuming the bits of `k` from least to most significant.
    pub fn scalar_multiplication(&self, point: &Point, k: &BigInt) -> Result<Point, Errors> {
        if k < &BigInt::zero() {
            return Err(Errors::InvalidScalar);
        }
        let mut result = Point::Infinity;
        let mut addend = point.clone();
        let bits = k.bit_length();
        for i in 0..bits {
            if k.test_bit(i) {
                result = self.point_addition(&result, &addend)?;
            }
            if i + 1 < bits {
                addend = self.point_double(&addend)?;
            }
        }
        if !self.is_point(&result) {
            return Err(Errors::InvalidPoint);
        }
        Ok(result)
    }

    pub fn generate_key_pair(&self) -> Result<KeyPair, Errors> {
        let private_key = self.random_scalar()?;
        let public_key = self.scalar_multiplication(self.generator(), &private_key)?;
        Ok(KeyPair {
            private_key,
            public_key,
        })
    }

    /// Uniform scalar in `[1, q)`.
    pub fn random_scalar(&self) -> Result<BigInt, Errors> {
        random(self.order())
    }

    pub fn div_mod(&self, x: &BigInt, y: &BigInt) -> Result<BigInt, Errors> {
        let p = self.field_prime();
        let y_inv = inv_mod(y, p)?;
        Ok(BigInt::mod_mul(&x.mod_floor(p), &y_inv, p))
    }
}

/// Uniform integer in `[1, max)`.
pub fn random(max: &BigInt) -> Result<BigInt, Errors> {
    if max <= &BigInt::one() {
        return Err(Errors::InvalidScalar);
    }
    Ok(BigInt::sample_range(&BigInt::one(), max))
}

/// Uniform integer in `[lower, upper)`.
pub fn random_in_range(lower: &BigInt, upper: &BigInt) -> Result<BigInt, Errors> {
    if lower >= upper {
        return Err(Errors::InvalidScalar);
    }
    Ok(BigInt::sample_range(lower, upper))
}

pub fn inv_mod(x: &BigInt, modulus: &BigInt) -> Result<BigInt, Errors> {
    let reduced = x.mod_floor(modulus);
    if reduced.is_zero() {
        return Err(Errors::NotInvertible);
    }
    BigInt::mod_inv(&reduced, modulus).ok_or(Errors::NotInvertible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CurveParams;
    use curv::elliptic::curves::{secp256_k1::Secp256k1, Point as CurvPoint, Scalar};

    fn small_curve() -> Curve {
        Curve::new(CurveParams::toy_small()).unwrap()
    }

    fn signing_curve() -> Curve {
        Curve::new(CurveParams::toy_signing()).unwrap()
    }

    fn brute_force_inverse(x: &BigInt, modulus: &BigInt) -> Option<BigInt> {
        let x = x.mod_floor(modulus);
        let mut candidate = BigInt::one();
        while &candidate < modulus {
            if BigInt::mod_mul(&x, &candidate, modulus) == BigInt::one() {
                return Some(candidate);
            }
            candidate = candidate + BigInt::one();
        }
        None
    }

    #[test]
    fn test_generator_has_prime_order() {
        for curve in [small_curve(), signing_curve()] {
            let g = curve.generator().clone();
            let q = curve.order().clone();
            assert_eq!(
                curve.scalar_multiplication(&g, &q).unwrap(),
                Point::Infinity
            );
            let q_minus_one = &q - BigInt::one();
            assert_eq!(
                curve.scalar_multiplication(&g, &q_minus_one).unwrap(),
                curve.point_negation(&g)
            );
        }
    }

    #[test]
    fn test_multiples_stay_on_curve() {
        let curve = small_curve();
        let g = curve.generator().clone();
        let mut acc = Point::Infinity;
        for k in 0..11 {
            let expected = curve.scalar_multiplication(&g, &BigInt::from(k)).unwrap();
            assert_eq!(acc, expected);
            assert!(curve.is_point(&acc));
            acc = curve.point_addition(&acc, &g).unwrap();
        }
        assert_eq!(acc, Point::Infinity);
    }

    #[test]
    fn test_group_law() {
        let curve = signing_curve();
        let g = curve.generator().clone();
        let a = curve.scalar_multiplication(&g, &BigInt::from(17)).unwrap();
        let b = curve.scalar_multiplication(&g, &BigInt::from(4021)).unwrap();
        let c = curve.scalar_multiplication(&g, &BigInt::from(9999)).unwrap();

        assert_eq!(
            curve.point_addition(&a, &b).unwrap(),
            curve.point_addition(&b, &a).unwrap()
        );
        let left = curve
            .point_addition(&curve.point_addition(&a, &b).unwrap(), &c)
            .unwrap();
        let right = curve
            .point_addition(&a, &curve.point_addition(&b, &c).unwrap())
            .unwrap();
        assert_eq!(left, right);
        assert_eq!(
            curve.point_addition(&a, &Point::Infinity).unwrap(),
            a.clone()
        );
        assert_eq!(
            curve
                .point_addition(&a, &curve.point_negation(&a))
                .unwrap(),
            Point::Infinity
        );
        assert_eq!(
            curve.point_double(&b).unwrap(),
            curve.scalar_multiplication(&g, &BigInt::from(8042)).unwrap()
        );
    }

    #[test]
    fn test_scalar_sums_wrap_modulo_order() {
        for curve in [small_curve(), signing_curve()] {
            let g = curve.generator();
            let q = curve.order();
            let top = q - BigInt::one();
            let mut pairs = vec![(top.clone(), top.clone()), (top, BigInt::one())];
            for _ in 0..200 {
                pairs.push((BigInt::sample_below(q), BigInt::sample_below(q)));
            }

            for (k1, k2) in pairs {
                let p1 = curve.scalar_multiplication(g, &k1).unwrap();
                let p2 = curve.scalar_multiplication(g, &k2).unwrap();
                let sum = curve.point_addition(&p1, &p2).unwrap();
                assert!(curve.is_point(&sum));
                let wrapped = (&k1 + &k2).mod_floor(q);
                assert_eq!(sum, curve.scalar_multiplication(g, &wrapped).unwrap());
            }
        }
    }

    #[test]
    fn test_is_point() {
        let curve = small_curve();
        assert!(curve.is_point(&Point::Infinity));
        assert!(curve.is_point(curve.generator()));
        assert!(!curve.is_point(&Point::new(BigInt::from(9), BigInt::from(14))));
        assert!(!curve.is_point(&Point::new(BigInt::from(26), BigInt::from(15))));
    }

    #[test]
    fn test_negative_scalar_rejected() {
        let curve = small_curve();
        let k = BigInt::zero() - BigInt::one();
        assert_eq!(
            curve.scalar_multiplication(curve.generator(), &k),
            Err(Errors::InvalidScalar)
        );
    }

    #[test]
    fn test_inverse_agrees_with_brute_force() {
        for modulus in [17, 11, 97, 221] {
            let modulus = BigInt::from(modulus);
            for x in 0..40 {
                let x = BigInt::from(x);
                let expected = brute_force_inverse(&x, &modulus);
                assert_eq!(inv_mod(&x, &modulus).ok(), expected);
            }
        }
    }

    #[test]
    fn test_random_bounds() {
        let max = BigInt::from(5);
        for _ in 0..100 {
            let r = random(&max).unwrap();
            assert!(r >= BigInt::one() && r < max);
        }
        assert_eq!(random(&BigInt::one()), Err(Errors::InvalidScalar));
        let v = random_in_range(&BigInt::from(3), &BigInt::from(7)).unwrap();
        assert!(v >= BigInt::from(3) && v < BigInt::from(7));
    }

    #[test]
    fn test_key_pair() {
        let curve = signing_curve();
        let key_pair = curve.generate_key_pair().unwrap();
        assert!(key_pair.private_key >= BigInt::one());
        assert!(&key_pair.private_key < curve.order());
        assert_eq!(
            key_pair.public_key,
            curve
                .scalar_multiplication(curve.generator(), &key_pair.private_key)
                .unwrap()
        );
    }

    #[test]
    fn test_agrees_with_curv_secp256k1() {
        let curve = Curve::new(CurveParams::secp256k1()).unwrap();
        for _ in 0..4 {
            let k = curve.random_scalar().unwrap();
            let ours = curve.scalar_multiplication(curve.generator(), &k).unwrap();
            let theirs = CurvPoint::<Secp256k1>::generator() * &Scalar::<Secp256k1>::from(&k);
            assert_eq!(ours.x_coord(), theirs.x_coord().as_ref());
            assert_eq!(ours.y_coord(), theirs.y_coord().as_ref());
        }
    }
}
