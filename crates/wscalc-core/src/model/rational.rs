use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::{One, Zero};

/// Exact rational number used for every probability and expectation in the
/// engine. No transition ever rounds through a float.
pub type Rational = BigRational;

pub fn zero() -> Rational {
    Rational::zero()
}

pub fn one() -> Rational {
    Rational::one()
}

/// Builds `num / den` as an exact rational. `den` must be non-zero.
pub fn ratio(num: u32, den: u32) -> Rational {
    Rational::new(BigInt::from(num), BigInt::from(den))
}

pub fn binomial(n: u32, k: u32) -> BigUint {
    if k > n {
        return BigUint::zero();
    }
    num_integer::binomial(BigUint::from(n), BigUint::from(k))
}

/// Probability of revealing exactly `hits` marked cards when drawing `draws`
/// cards from a pool of `total` cards containing `marked` marked ones.
pub fn hypergeometric(total: u32, marked: u32, draws: u32, hits: u32) -> Rational {
    debug_assert!(marked <= total);
    debug_assert!(draws <= total);
    if hits > draws || hits > marked {
        return zero();
    }
    let favourable = binomial(marked, hits) * binomial(total - marked, draws - hits);
    let cases = binomial(total, draws);
    Rational::new(BigInt::from(favourable), BigInt::from(cases))
}

#[cfg(test)]
mod tests {
    use super::{binomial, hypergeometric, one, ratio, zero};
    use num_bigint::BigUint;

    #[test]
    fn binomial_small_values() {
        assert_eq!(binomial(5, 2), BigUint::from(10u32));
        assert_eq!(binomial(6, 0), BigUint::from(1u32));
        assert_eq!(binomial(6, 6), BigUint::from(1u32));
        assert_eq!(binomial(3, 5), BigUint::from(0u32));
    }

    #[test]
    fn hypergeometric_matches_hand_computation() {
        // Two marked cards in four, drawing two.
        assert_eq!(hypergeometric(4, 2, 2, 0), ratio(1, 6));
        assert_eq!(hypergeometric(4, 2, 2, 1), ratio(2, 3));
        assert_eq!(hypergeometric(4, 2, 2, 2), ratio(1, 6));
    }

    #[test]
    fn hypergeometric_sums_to_one_over_feasible_counts() {
        let total = 10;
        let marked = 3;
        let draws = 4;
        let mut mass = zero();
        for hits in 0..=draws {
            mass += hypergeometric(total, marked, draws, hits);
        }
        assert_eq!(mass, one());
    }

    #[test]
    fn infeasible_counts_have_zero_probability() {
        assert_eq!(hypergeometric(10, 3, 4, 4), zero());
        assert_eq!(hypergeometric(10, 3, 2, 3), zero());
    }
}
