//! Pair engine
//!
//! One constant-product pool over two tokens. The pair holds its token
//! balances in the ledger under its own address and issues pool shares as a
//! ledger token, also addressed by the pair's address.
//!
//! Every mutating operation follows the same shape:
//!
//! 1. open an [`AmmTx`] over the ledger and the factory's state journal,
//! 2. acquire the reentrancy guard,
//! 3. observe balances and compute against a copy of the pair state,
//! 4. write the new state through the journal and commit as the last step.
//!
//! An error at any point drops the transaction (undoing transfers, mints and
//! burns) before the copy is ever written back, so the pair and the ledger
//! are left exactly as they were. A committed write inside an enclosing
//! transaction stays journaled, so a later failure of the enclosing
//! operation restores this pair as well.
//!
//! Transactions on pairs of one factory are serialized by the journal;
//! concurrent callers on other threads wait for the open transaction.

use crate::clock::Clock;
use crate::errors::{AmmError, Result};
use crate::factory::ProtocolFee;
use crate::fixed_point::UQ112x112;
use crate::guard::ReentrancyGuard;
use crate::ledger::TokenLedger;
use crate::math;
use crate::transaction::{AmmTx, StateCell, StateJournal};
use ethereum_types::{Address, U256};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Shares permanently locked at the zero address on first provision
pub const MINIMUM_LIQUIDITY: u64 = 1000;

/// Largest value a reserve may hold (112-bit width)
pub const MAX_RESERVE: u128 = (1u128 << 112) - 1;

/// Committed state of a pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairState {
    reserve0: u128,
    reserve1: u128,
    block_timestamp_last: u32,
    price0_cumulative_last: U256,
    price1_cumulative_last: U256,
    k_last: U256,
}

impl PairState {
    pub fn reserves(&self) -> (u128, u128, u32) {
        (self.reserve0, self.reserve1, self.block_timestamp_last)
    }

    pub fn price_cumulative_last(&self) -> (U256, U256) {
        (self.price0_cumulative_last, self.price1_cumulative_last)
    }

    pub fn k_last(&self) -> U256 {
        self.k_last
    }

    /// Product of the current reserves
    fn root_product(&self) -> U256 {
        // both factors are below 2^112, the product cannot overflow
        U256::from(self.reserve0) * U256::from(self.reserve1)
    }

    /// Commit observed balances as the new reserves
    ///
    /// Accumulates time-weighted prices over the interval the previous
    /// reserves were in effect. Nothing is modified when a balance exceeds
    /// the reserve width.
    pub(crate) fn update(&mut self, balance0: U256, balance1: U256, now: u64) -> Result<()> {
        let max = U256::from(MAX_RESERVE);
        if balance0 > max || balance1 > max {
            return Err(AmmError::Overflow);
        }

        // timestamps wrap modulo 2^32
        let block_timestamp = (now % (1u64 << 32)) as u32;
        let time_elapsed = block_timestamp.wrapping_sub(self.block_timestamp_last);

        if time_elapsed > 0 && self.reserve0 != 0 && self.reserve1 != 0 {
            let elapsed = U256::from(time_elapsed);
            let price0 = UQ112x112::uqdiv(UQ112x112::encode(self.reserve1), self.reserve0)?;
            let price1 = UQ112x112::uqdiv(UQ112x112::encode(self.reserve0), self.reserve1)?;
            // accumulators wrap; readers only ever use differences
            self.price0_cumulative_last = self
                .price0_cumulative_last
                .overflowing_add(price0 * elapsed)
                .0;
            self.price1_cumulative_last = self
                .price1_cumulative_last
                .overflowing_add(price1 * elapsed)
                .0;
        }

        self.reserve0 = balance0.low_u128();
        self.reserve1 = balance1.low_u128();
        self.block_timestamp_last = block_timestamp;
        Ok(())
    }
}

/// Serializable view of a pair for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairSnapshot {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: u128,
    pub reserve1: u128,
    pub block_timestamp_last: u32,
    pub price0_cumulative_last: U256,
    pub price1_cumulative_last: U256,
    pub k_last: U256,
    pub total_shares: U256,
}

/// A constant-product pool for one canonical token pair
pub struct Pair {
    address: Address,
    factory: Address,
    token0: Address,
    token1: Address,
    ledger: Arc<dyn TokenLedger>,
    clock: Arc<dyn Clock>,
    protocol_fee: Arc<ProtocolFee>,
    journal: Arc<StateJournal>,
    guard: ReentrancyGuard,
    state: StateCell,
}

impl std::fmt::Debug for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pair")
            .field("address", &self.address)
            .field("token0", &self.token0)
            .field("token1", &self.token1)
            .field("state", &*self.state.read())
            .finish()
    }
}

impl Pair {
    /// Create an empty pair; tokens must already be in canonical order
    pub(crate) fn new(
        address: Address,
        factory: Address,
        token0: Address,
        token1: Address,
        ledger: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
        protocol_fee: Arc<ProtocolFee>,
        journal: Arc<StateJournal>,
    ) -> Self {
        debug_assert!(token0 < token1);
        Self {
            address,
            factory,
            token0,
            token1,
            ledger,
            clock,
            protocol_fee,
            journal,
            guard: ReentrancyGuard::new(),
            state: Arc::new(RwLock::new(PairState::default())),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn token0(&self) -> Address {
        self.token0
    }

    pub fn token1(&self) -> Address {
        self.token1
    }

    /// `(reserve0, reserve1, block_timestamp_last)`
    pub fn get_reserves(&self) -> (u128, u128, u32) {
        self.state.read().reserves()
    }

    pub fn price0_cumulative_last(&self) -> U256 {
        self.state.read().price0_cumulative_last
    }

    pub fn price1_cumulative_last(&self) -> U256 {
        self.state.read().price1_cumulative_last
    }

    pub fn k_last(&self) -> U256 {
        self.state.read().k_last
    }

    /// Outstanding pool shares
    pub fn total_shares(&self) -> U256 {
        self.ledger.total_supply(self.address)
    }

    /// Pool shares held by `holder`
    pub fn share_balance_of(&self, holder: Address) -> U256 {
        self.ledger.balance_of(self.address, holder)
    }

    /// True while a mutating operation is in progress
    pub fn is_locked(&self) -> bool {
        self.guard.is_locked()
    }

    pub fn state(&self) -> PairState {
        self.state.read().clone()
    }

    pub fn snapshot(&self) -> PairSnapshot {
        let state = self.state();
        PairSnapshot {
            address: self.address,
            token0: self.token0,
            token1: self.token1,
            reserve0: state.reserve0,
            reserve1: state.reserve1,
            block_timestamp_last: state.block_timestamp_last,
            price0_cumulative_last: state.price0_cumulative_last,
            price1_cumulative_last: state.price1_cumulative_last,
            k_last: state.k_last,
            total_shares: self.total_shares(),
        }
    }

    fn balances(&self) -> (U256, U256) {
        (
            self.ledger.balance_of(self.token0, self.address),
            self.ledger.balance_of(self.token1, self.address),
        )
    }

    /// Mint shares to `to` for the tokens deposited since the last update
    pub fn mint(&self, to: Address) -> Result<U256> {
        let tx = AmmTx::begin(&self.journal, self.ledger.as_ref());
        let _entered = self.guard.enter()?;

        let mut next = self.state();
        let reserve0 = U256::from(next.reserve0);
        let reserve1 = U256::from(next.reserve1);
        let (balance0, balance1) = self.balances();
        let amount0 = math::sub(balance0, reserve0)?;
        let amount1 = math::sub(balance1, reserve1)?;

        let fee_on = self.mint_fee(&mut next)?;
        // read after the protocol fee, which may have minted shares
        let total_supply = self.total_shares();

        let liquidity = if total_supply.is_zero() {
            let minimum = U256::from(MINIMUM_LIQUIDITY);
            let root = math::sqrt(math::mul(amount0, amount1)?);
            if root <= minimum {
                return Err(AmmError::InsufficientLiquidityMinted);
            }
            // permanently lock the first MINIMUM_LIQUIDITY shares
            self.ledger.mint(self.address, Address::zero(), minimum)?;
            root - minimum
        } else {
            math::min(
                math::div(math::mul(amount0, total_supply)?, reserve0)?,
                math::div(math::mul(amount1, total_supply)?, reserve1)?,
            )
        };
        if liquidity.is_zero() {
            return Err(AmmError::InsufficientLiquidityMinted);
        }
        self.ledger.mint(self.address, to, liquidity)?;

        next.update(balance0, balance1, self.clock.now())?;
        if fee_on {
            next.k_last = next.root_product();
        }

        self.journal.write(self.address, &self.state, next);
        tx.commit();

        debug!(pair = ?self.address, ?to, %amount0, %amount1, %liquidity, "mint");
        Ok(liquidity)
    }

    /// Redeem the shares held by the pair itself, sending both tokens to `to`
    pub fn burn(&self, to: Address) -> Result<(U256, U256)> {
        let tx = AmmTx::begin(&self.journal, self.ledger.as_ref());
        let _entered = self.guard.enter()?;

        let mut next = self.state();
        let reserve0 = U256::from(next.reserve0);
        let reserve1 = U256::from(next.reserve1);
        let liquidity = self.share_balance_of(self.address);
        if liquidity.is_zero() {
            return Err(AmmError::NoLiquidity);
        }

        let fee_on = self.mint_fee(&mut next)?;
        let total_supply = self.total_shares();

        // pro-rata, rounding down in the pool's favour
        let amount0 = math::div(math::mul(liquidity, reserve0)?, total_supply)?;
        let amount1 = math::div(math::mul(liquidity, reserve1)?, total_supply)?;
        if amount0.is_zero() || amount1.is_zero() {
            return Err(AmmError::InsufficientLiquidityBurned);
        }

        self.ledger.burn(self.address, self.address, liquidity)?;
        self.ledger.transfer(self.token0, self.address, to, amount0)?;
        self.ledger.transfer(self.token1, self.address, to, amount1)?;

        let (balance0, balance1) = self.balances();
        next.update(balance0, balance1, self.clock.now())?;
        if fee_on {
            next.k_last = next.root_product();
        }

        self.journal.write(self.address, &self.state, next);
        tx.commit();

        debug!(pair = ?self.address, ?to, %amount0, %amount1, %liquidity, "burn");
        Ok((amount0, amount1))
    }

    /// Send the requested outputs to `to`, charging the input found in the
    /// pair's balances against the fee-adjusted constant product
    pub fn swap(&self, amount0_out: U256, amount1_out: U256, to: Address) -> Result<()> {
        let tx = AmmTx::begin(&self.journal, self.ledger.as_ref());
        let _entered = self.guard.enter()?;
        if amount0_out.is_zero() && amount1_out.is_zero() {
            return Err(AmmError::InsufficientOutputAmount);
        }

        let mut next = self.state();
        let reserve0 = U256::from(next.reserve0);
        let reserve1 = U256::from(next.reserve1);
        if amount0_out >= reserve0 || amount1_out >= reserve1 {
            return Err(AmmError::InsufficientLiquidity);
        }
        if to == self.token0 || to == self.token1 {
            return Err(AmmError::InvalidTo);
        }

        // optimistic transfer: outputs leave before inputs are verified
        if !amount0_out.is_zero() {
            self.ledger
                .transfer(self.token0, self.address, to, amount0_out)?;
        }
        if !amount1_out.is_zero() {
            self.ledger
                .transfer(self.token1, self.address, to, amount1_out)?;
        }
        let (balance0, balance1) = self.balances();

        let amount0_in = input_amount(balance0, reserve0, amount0_out);
        let amount1_in = input_amount(balance1, reserve1, amount1_out);
        if amount0_in.is_zero() && amount1_in.is_zero() {
            return Err(AmmError::InsufficientInputAmount);
        }

        let thousand = U256::from(1000u64);
        let three = U256::from(3u64);
        let balance0_adjusted =
            math::sub(math::mul(balance0, thousand)?, math::mul(amount0_in, three)?)?;
        let balance1_adjusted =
            math::sub(math::mul(balance1, thousand)?, math::mul(amount1_in, three)?)?;
        let k_after = math::mul(balance0_adjusted, balance1_adjusted)?;
        let k_before = math::mul(math::mul(reserve0, reserve1)?, U256::from(1_000_000u64))?;
        if k_after < k_before {
            warn!(
                pair = ?self.address,
                %amount0_in, %amount1_in, %amount0_out, %amount1_out,
                "swap rejected: constant product would decrease"
            );
            return Err(AmmError::KInvariantViolated);
        }

        next.update(balance0, balance1, self.clock.now())?;

        self.journal.write(self.address, &self.state, next);
        tx.commit();

        debug!(
            pair = ?self.address,
            ?to,
            %amount0_in, %amount1_in, %amount0_out, %amount1_out,
            "swap"
        );
        Ok(())
    }

    /// Send balances in excess of the reserves to `to`
    pub fn skim(&self, to: Address) -> Result<()> {
        let tx = AmmTx::begin(&self.journal, self.ledger.as_ref());
        let _entered = self.guard.enter()?;

        let (reserve0, reserve1, _) = self.get_reserves();
        let (balance0, balance1) = self.balances();
        let excess0 = math::sub(balance0, U256::from(reserve0))?;
        let excess1 = math::sub(balance1, U256::from(reserve1))?;
        if !excess0.is_zero() {
            self.ledger.transfer(self.token0, self.address, to, excess0)?;
        }
        if !excess1.is_zero() {
            self.ledger.transfer(self.token1, self.address, to, excess1)?;
        }

        tx.commit();
        debug!(pair = ?self.address, ?to, %excess0, %excess1, "skim");
        Ok(())
    }

    /// Force the reserves to match the observed balances
    pub fn sync(&self) -> Result<()> {
        let tx = AmmTx::begin(&self.journal, self.ledger.as_ref());
        let _entered = self.guard.enter()?;

        let mut next = self.state();
        let (balance0, balance1) = self.balances();
        next.update(balance0, balance1, self.clock.now())?;
        self.journal.write(self.address, &self.state, next);
        tx.commit();

        debug!(pair = ?self.address, %balance0, %balance1, "sync");
        Ok(())
    }

    /// Mint the protocol's share of fee growth since the last liquidity event
    ///
    /// Returns whether the protocol fee is on. Updates `k_last` on `state`
    /// only when switching the fee off; callers refresh it after `update`.
    fn mint_fee(&self, state: &mut PairState) -> Result<bool> {
        let fee_to = self.protocol_fee.fee_to();
        let k_last = state.k_last;

        match fee_to {
            Some(fee_to) => {
                if !k_last.is_zero() {
                    let root_k = math::sqrt(state.root_product());
                    let root_k_last = math::sqrt(k_last);
                    if root_k > root_k_last {
                        let numerator = math::mul(self.total_shares(), root_k - root_k_last)?;
                        let denominator =
                            math::add(math::mul(root_k, U256::from(5u64))?, root_k_last)?;
                        let liquidity = math::div(numerator, denominator)?;
                        if !liquidity.is_zero() {
                            self.ledger.mint(self.address, fee_to, liquidity)?;
                            debug!(pair = ?self.address, ?fee_to, %liquidity, "protocol fee minted");
                        }
                    }
                }
                Ok(true)
            }
            None => {
                if !k_last.is_zero() {
                    state.k_last = U256::zero();
                }
                Ok(false)
            }
        }
    }
}

/// Input implied by a balance: `max(0, balance - (reserve - amount_out))`
fn input_amount(balance: U256, reserve: U256, amount_out: U256) -> U256 {
    // amount_out < reserve was checked before any transfer
    let expected = reserve - amount_out;
    if balance > expected {
        balance - expected
    } else {
        U256::zero()
    }
}
