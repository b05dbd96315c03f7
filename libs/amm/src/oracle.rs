//! Time-weighted average price helpers
//!
//! Consumers sample a pair's cumulative prices at two points in time and
//! divide the difference by the elapsed seconds. No minimum window is
//! enforced here: a short window is cheap to move, so callers pick a period
//! that suits their risk.

use crate::errors::{AmmError, Result};
use crate::fixed_point::UQ112x112;
use crate::pair::Pair;
use ethereum_types::U256;

/// Cumulative prices as if the pair were updated at `now`
///
/// Returns `(price0_cumulative, price1_cumulative, block_timestamp)` with
/// the timestamp reduced modulo 2^32. The pair itself is not modified.
pub fn current_cumulative_prices(pair: &Pair, now: u64) -> Result<(U256, U256, u32)> {
    let block_timestamp = (now % (1u64 << 32)) as u32;
    let state = pair.state();
    let (reserve0, reserve1, timestamp_last) = state.reserves();
    let (mut price0_cumulative, mut price1_cumulative) = state.price_cumulative_last();

    if timestamp_last != block_timestamp && reserve0 != 0 && reserve1 != 0 {
        let elapsed = U256::from(block_timestamp.wrapping_sub(timestamp_last));
        let price0 = UQ112x112::uqdiv(UQ112x112::encode(reserve1), reserve0)?;
        let price1 = UQ112x112::uqdiv(UQ112x112::encode(reserve0), reserve1)?;
        price0_cumulative = price0_cumulative.overflowing_add(price0 * elapsed).0;
        price1_cumulative = price1_cumulative.overflowing_add(price1 * elapsed).0;
    }

    Ok((price0_cumulative, price1_cumulative, block_timestamp))
}

/// Average UQ112x112 price between two cumulative observations
///
/// Accumulators wrap, so the difference is taken modulo 2^256.
pub fn average_price(cumulative_start: U256, cumulative_end: U256, elapsed: u32) -> Result<U256> {
    if elapsed == 0 {
        return Err(AmmError::ZeroElapsed);
    }
    let delta = cumulative_end.overflowing_sub(cumulative_start).0;
    Ok(delta / U256::from(elapsed))
}

/// Output amount for `amount_in` at an average price
pub fn consult(average: U256, amount_in: U256) -> Result<U256> {
    Ok(UQ112x112::decode144(UQ112x112::mul(average, amount_in)?))
}
