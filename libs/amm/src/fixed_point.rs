//! UQ112x112 fixed-point price codec
//!
//! A ratio of two reserves is stored as an unsigned number with 112
//! integer bits and 112 fractional bits. Because reserves are bounded to
//! 112 bits the encoded value always fits in 224 bits, leaving headroom in
//! a U256 for the price-times-seconds accumulators.

use crate::errors::{AmmError, Result};
use ethereum_types::U256;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Number of fractional bits
pub const RESOLUTION: usize = 112;

/// Fixed-point helpers over raw U256 values
pub struct UQ112x112;

impl UQ112x112 {
    /// 1.0 in UQ112x112
    pub fn q112() -> U256 {
        U256::one() << RESOLUTION
    }

    /// Encode an integer reserve as a fixed-point value
    pub fn encode(y: u128) -> U256 {
        U256::from(y) << RESOLUTION
    }

    /// Divide a fixed-point value by an integer reserve
    pub fn uqdiv(x: U256, y: u128) -> Result<U256> {
        if y == 0 {
            return Err(AmmError::Arithmetic);
        }
        Ok(x / U256::from(y))
    }

    /// Integer part of a fixed-point value
    pub fn decode(x: U256) -> U256 {
        x >> RESOLUTION
    }

    /// Multiply a fixed-point value by an integer, yielding a UQ144x112
    pub fn mul(x: U256, y: U256) -> Result<U256> {
        x.checked_mul(y).ok_or(AmmError::Arithmetic)
    }

    /// Integer part of a UQ144x112 product
    pub fn decode144(x: U256) -> U256 {
        x >> RESOLUTION
    }

    /// Render a fixed-point price as a Decimal for reporting
    ///
    /// Keeps the top 64 fractional bits, which is well beyond Decimal's
    /// 28 significant digits for realistic prices.
    pub fn to_decimal(x: U256) -> Result<Decimal> {
        let integer = Self::decode(x);
        // Decimal mantissa is 96 bits
        if integer > (U256::one() << 96) - 1 {
            return Err(AmmError::Overflow);
        }
        let fraction = ((x >> (RESOLUTION - 64)) & U256::from(u64::MAX)).low_u64();

        let scale = Decimal::from(u64::MAX) + dec!(1);
        let whole = Decimal::from_i128_with_scale(integer.low_u128() as i128, 0);
        Ok(whole + Decimal::from(fraction) / scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        assert_eq!(UQ112x112::encode(1), UQ112x112::q112());
        assert_eq!(UQ112x112::decode(UQ112x112::encode(12345)), U256::from(12345u64));
    }

    #[test]
    fn test_ratio_of_reserves() {
        // reserve1 / reserve0 = 4e18 / 1e18
        let e18 = 10u128.pow(18);
        let price = UQ112x112::uqdiv(UQ112x112::encode(4 * e18), e18).unwrap();
        assert_eq!(price, UQ112x112::q112() * 4);

        let inverse = UQ112x112::uqdiv(UQ112x112::encode(e18), 4 * e18).unwrap();
        assert_eq!(inverse, UQ112x112::q112() / 4);
    }

    #[test]
    fn test_uqdiv_by_zero() {
        assert_eq!(
            UQ112x112::uqdiv(UQ112x112::encode(1), 0),
            Err(AmmError::Arithmetic)
        );
    }

    #[test]
    fn test_max_reserve_fits() {
        let max_reserve = (1u128 << 112) - 1;
        let price = UQ112x112::uqdiv(UQ112x112::encode(max_reserve), 1).unwrap();
        assert!(price < U256::one() << 224);
    }

    #[test]
    fn test_mul_decode144() {
        // price 2.5 applied to 1000 units
        let price = UQ112x112::q112() * 5 / 2;
        let out = UQ112x112::decode144(UQ112x112::mul(price, U256::from(1000u64)).unwrap());
        assert_eq!(out, U256::from(2500u64));
    }

    #[test]
    fn test_to_decimal() {
        let half = UQ112x112::q112() / 2;
        assert_eq!(UQ112x112::to_decimal(half).unwrap(), dec!(0.5));

        let two_and_quarter = UQ112x112::q112() * 9 / 4;
        assert_eq!(UQ112x112::to_decimal(two_and_quarter).unwrap(), dec!(2.25));

        assert_eq!(
            UQ112x112::to_decimal(UQ112x112::encode(u128::MAX)),
            Err(AmmError::Overflow)
        );
    }
}
