//! Pricing formulas and pair addressing shared by the factory, pairs and router
//!
//! `get_amount_out` and `get_amount_in` use exactly the 997/1000 fee
//! arithmetic the pair enforces in `swap`: an output quoted here is always
//! accepted by the pair's invariant check, and one unit more is not.

use crate::errors::{AmmError, Result};
use crate::factory::PairFactory;
use crate::math;
use ethereum_types::{Address, U256};
use sha3::{Digest, Keccak256};

/// Fee numerator applied to input amounts (0.3% fee)
pub const FEE_NUMERATOR: u64 = 997;
/// Fee denominator
pub const FEE_DENOMINATOR: u64 = 1000;

/// Return the two tokens in canonical order
pub fn sort_tokens(token_a: Address, token_b: Address) -> Result<(Address, Address)> {
    if token_a == token_b {
        return Err(AmmError::IdenticalTokens);
    }
    let (token0, token1) = if token_a < token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    };
    if token0.is_zero() {
        return Err(AmmError::ZeroAddress);
    }
    Ok((token0, token1))
}

/// Deterministic address of the pair for two tokens under `factory`
///
/// Low 20 bytes of `keccak256(factory ‖ token0 ‖ token1)`, independent of
/// the order the tokens are given in.
pub fn pair_for(factory: Address, token_a: Address, token_b: Address) -> Result<Address> {
    let (token0, token1) = sort_tokens(token_a, token_b)?;
    let mut hasher = Keccak256::new();
    hasher.update(factory.as_bytes());
    hasher.update(token0.as_bytes());
    hasher.update(token1.as_bytes());
    let digest = hasher.finalize();
    Ok(Address::from_slice(&digest[12..]))
}

/// Reserves of the pair for `token_a`/`token_b`, ordered as the arguments
pub fn get_reserves(
    factory: &PairFactory,
    token_a: Address,
    token_b: Address,
) -> Result<(U256, U256)> {
    let (token0, _) = sort_tokens(token_a, token_b)?;
    let pair = factory
        .pair_for_tokens(token_a, token_b)
        .ok_or(AmmError::PairNotExist)?;
    let (reserve0, reserve1, _) = pair.get_reserves();
    let (reserve0, reserve1) = (U256::from(reserve0), U256::from(reserve1));
    if token_a == token0 {
        Ok((reserve0, reserve1))
    } else {
        Ok((reserve1, reserve0))
    }
}

/// Equivalent amount of the other asset at the current reserve ratio
pub fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> Result<U256> {
    if amount_a.is_zero() {
        return Err(AmmError::ZeroAmount);
    }
    if reserve_a.is_zero() || reserve_b.is_zero() {
        return Err(AmmError::InsufficientLiquidity);
    }
    math::div(math::mul(amount_a, reserve_b)?, reserve_a)
}

/// Maximum output for an exact input, after the 0.3% fee
pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> Result<U256> {
    if amount_in.is_zero() {
        return Err(AmmError::ZeroAmount);
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(AmmError::InsufficientLiquidity);
    }
    let amount_in_with_fee = math::mul(amount_in, U256::from(FEE_NUMERATOR))?;
    let numerator = math::mul(amount_in_with_fee, reserve_out)?;
    let denominator = math::add(
        math::mul(reserve_in, U256::from(FEE_DENOMINATOR))?,
        amount_in_with_fee,
    )?;
    math::div(numerator, denominator)
}

/// Minimum input for an exact output, rounded up by one unit
pub fn get_amount_in(amount_out: U256, reserve_in: U256, reserve_out: U256) -> Result<U256> {
    if amount_out.is_zero() {
        return Err(AmmError::ZeroAmount);
    }
    if reserve_in.is_zero() || reserve_out.is_zero() || amount_out >= reserve_out {
        return Err(AmmError::InsufficientLiquidity);
    }
    let numerator = math::mul(
        math::mul(reserve_in, amount_out)?,
        U256::from(FEE_DENOMINATOR),
    )?;
    let denominator = math::mul(
        math::sub(reserve_out, amount_out)?,
        U256::from(FEE_NUMERATOR),
    )?;
    math::add(math::div(numerator, denominator)?, U256::one())
}

/// The two tokens of a single-hop path
pub(crate) fn single_hop(path: &[Address]) -> Result<(Address, Address)> {
    match path {
        [input, output] => Ok((*input, *output)),
        _ => Err(AmmError::MultiHopUnsupported { length: path.len() }),
    }
}

/// `[amount_in, amount_out]` for a single-hop path
pub fn get_amounts_out(
    factory: &PairFactory,
    amount_in: U256,
    path: &[Address],
) -> Result<Vec<U256>> {
    let (input, output) = single_hop(path)?;
    let (reserve_in, reserve_out) = get_reserves(factory, input, output)?;
    let amount_out = get_amount_out(amount_in, reserve_in, reserve_out)?;
    Ok(vec![amount_in, amount_out])
}

/// `[amount_in, amount_out]` for a single-hop path and a desired output
pub fn get_amounts_in(
    factory: &PairFactory,
    amount_out: U256,
    path: &[Address],
) -> Result<Vec<U256>> {
    let (input, output) = single_hop(path)?;
    let (reserve_in, reserve_out) = get_reserves(factory, input, output)?;
    let amount_in = get_amount_in(amount_out, reserve_in, reserve_out)?;
    Ok(vec![amount_in, amount_out])
}
