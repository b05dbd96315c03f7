//! Integer helpers for liquidity sizing
//!
//! All arithmetic on amounts goes through the checked helpers so an
//! overflow aborts the operation instead of wrapping.

use crate::errors::{AmmError, Result};
use ethereum_types::U256;

/// Integer square root (floor) using the Babylonian method
pub fn sqrt(y: U256) -> U256 {
    if y > U256::from(3u8) {
        let mut z = y;
        let mut x = y / 2 + 1;
        while x < z {
            z = x;
            x = (y / x + x) / 2;
        }
        z
    } else if !y.is_zero() {
        U256::one()
    } else {
        U256::zero()
    }
}

pub fn min(x: U256, y: U256) -> U256 {
    if x < y {
        x
    } else {
        y
    }
}

pub fn add(x: U256, y: U256) -> Result<U256> {
    x.checked_add(y).ok_or(AmmError::Arithmetic)
}

pub fn sub(x: U256, y: U256) -> Result<U256> {
    x.checked_sub(y).ok_or(AmmError::Arithmetic)
}

pub fn mul(x: U256, y: U256) -> Result<U256> {
    x.checked_mul(y).ok_or(AmmError::Arithmetic)
}

/// Floor division; a zero divisor is reported as an arithmetic failure
pub fn div(x: U256, y: U256) -> Result<U256> {
    x.checked_div(y).ok_or(AmmError::Arithmetic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqrt_small_values() {
        assert_eq!(sqrt(U256::zero()), U256::zero());
        for y in 1u64..=3 {
            assert_eq!(sqrt(U256::from(y)), U256::one());
        }
        assert_eq!(sqrt(U256::from(4u64)), U256::from(2u64));
        assert_eq!(sqrt(U256::from(8u64)), U256::from(2u64));
        assert_eq!(sqrt(U256::from(9u64)), U256::from(3u64));
        assert_eq!(sqrt(U256::from(10_000u64)), U256::from(100u64));
    }

    #[test]
    fn test_sqrt_large_values() {
        let e18 = U256::exp10(18);
        assert_eq!(sqrt(e18 * e18), e18);
        assert_eq!(sqrt(U256::exp10(18) * U256::from(4u64) * e18), e18 * 2);
        // floor behaviour just below a perfect square
        assert_eq!(sqrt(e18 * e18 - 1), e18 - 1);
        assert_eq!(sqrt(U256::MAX), U256::from(u128::MAX));
    }

    #[test]
    fn test_min() {
        assert_eq!(min(U256::from(1u8), U256::from(2u8)), U256::from(1u8));
        assert_eq!(min(U256::from(7u8), U256::from(7u8)), U256::from(7u8));
    }

    #[test]
    fn test_checked_helpers() {
        assert_eq!(add(U256::MAX, U256::one()), Err(AmmError::Arithmetic));
        assert_eq!(sub(U256::zero(), U256::one()), Err(AmmError::Arithmetic));
        assert_eq!(mul(U256::MAX, U256::from(2u8)), Err(AmmError::Arithmetic));
        assert_eq!(div(U256::one(), U256::zero()), Err(AmmError::Arithmetic));
        assert_eq!(mul(U256::from(6u8), U256::from(7u8)), Ok(U256::from(42u8)));
    }
}
