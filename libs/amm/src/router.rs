//! User-facing router
//!
//! Moves caller funds into the right pair, enforces slippage bounds and
//! deadlines, and wraps or unwraps native value. Each operation runs inside
//! one [`AmmTx`]: it either completes with every bound satisfied or leaves
//! balances, reserves and the registry exactly as they were.
//!
//! Operations are serialized per factory. A router may be shared across
//! threads; callers on other threads wait while one operation is open.
//!
//! Paths are single-hop only; a path of any other length is rejected with
//! [`AmmError::MultiHopUnsupported`].

use crate::clock::Clock;
use crate::errors::{AmmError, Result};
use crate::factory::PairFactory;
use crate::ledger::{NativeLedger, TokenLedger};
use crate::library::{self, single_hop};
use crate::math;
use crate::pair::Pair;
use crate::transaction::AmmTx;
use ethereum_types::{Address, U256};
use std::sync::Arc;
use tracing::debug;

/// Deposit both tokens of a pair at the current ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddLiquidity {
    pub token_a: Address,
    pub token_b: Address,
    pub amount_a_desired: U256,
    pub amount_b_desired: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub to: Address,
    pub deadline: u64,
}

/// Deposit a token against native value; the native side is the call value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddLiquidityNative {
    pub token: Address,
    pub amount_token_desired: U256,
    pub amount_token_min: U256,
    pub amount_native_min: U256,
    pub to: Address,
    pub deadline: u64,
}

/// Redeem pool shares for both tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveLiquidity {
    pub token_a: Address,
    pub token_b: Address,
    pub liquidity: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub to: Address,
    pub deadline: u64,
}

/// Redeem pool shares of a token/wrapped-native pair, paying native value out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveLiquidityNative {
    pub token: Address,
    pub liquidity: U256,
    pub amount_token_min: U256,
    pub amount_native_min: U256,
    pub to: Address,
    pub deadline: u64,
}

/// Stateless front end over a [`PairFactory`]
///
/// The router holds no funds between operations. Callers approve the
/// router's address as spender for the tokens (and pool shares) it pulls.
pub struct Router {
    address: Address,
    factory: Arc<PairFactory>,
    ledger: Arc<dyn NativeLedger>,
    clock: Arc<dyn Clock>,
    wrapped_native: Address,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("address", &self.address)
            .field("factory", &self.factory.address())
            .field("wrapped_native", &self.wrapped_native)
            .finish()
    }
}

impl Router {
    /// `ledger` must be the same ledger the factory's pairs settle on
    pub fn new(
        address: Address,
        factory: Arc<PairFactory>,
        ledger: Arc<dyn NativeLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let wrapped_native = ledger.wrapped_native();
        Self {
            address,
            factory,
            ledger,
            clock,
            wrapped_native,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn factory(&self) -> &Arc<PairFactory> {
        &self.factory
    }

    pub fn wrapped_native(&self) -> Address {
        self.wrapped_native
    }

    // ---- liquidity ----

    /// Returns `(amount_a, amount_b, liquidity)`
    ///
    /// Creates the pair when it does not exist yet; the first provider sets
    /// the price with exactly the desired amounts.
    pub fn add_liquidity(
        &self,
        caller: Address,
        request: &AddLiquidity,
    ) -> Result<(U256, U256, U256)> {
        self.ensure(request.deadline)?;

        let (amount_a, amount_b, liquidity) =
            self.atomically_with_pair(request.token_a, request.token_b, |pair| {
                let (amount_a, amount_b) = self.liquidity_amounts(
                    request.token_a,
                    request.token_b,
                    (request.amount_a_desired, request.amount_b_desired),
                    (request.amount_a_min, request.amount_b_min),
                )?;
                self.ledger.transfer_from(
                    request.token_a,
                    self.address,
                    caller,
                    pair.address(),
                    amount_a,
                )?;
                self.ledger.transfer_from(
                    request.token_b,
                    self.address,
                    caller,
                    pair.address(),
                    amount_b,
                )?;
                let liquidity = pair.mint(request.to)?;
                Ok((amount_a, amount_b, liquidity))
            })?;

        debug!(?caller, %amount_a, %amount_b, %liquidity, "liquidity added");
        Ok((amount_a, amount_b, liquidity))
    }

    /// Returns `(amount_token, amount_native, liquidity)`
    ///
    /// `value` is the native amount attached by the caller. The part not
    /// needed at the current ratio is refunded.
    pub fn add_liquidity_native(
        &self,
        caller: Address,
        request: &AddLiquidityNative,
        value: U256,
    ) -> Result<(U256, U256, U256)> {
        self.ensure(request.deadline)?;
        if value.is_zero() {
            return Err(AmmError::ZeroValue);
        }
        let native = self.wrapped_native;

        let (amount_token, amount_native, liquidity) =
            self.atomically_with_pair(request.token, native, |pair| {
                let (amount_token, amount_native) = self.liquidity_amounts(
                    request.token,
                    native,
                    (request.amount_token_desired, value),
                    (request.amount_token_min, request.amount_native_min),
                )?;
                self.ledger.transfer_from(
                    request.token,
                    self.address,
                    caller,
                    pair.address(),
                    amount_token,
                )?;

                self.ledger.send_native(caller, self.address, value)?;
                self.ledger.wrap(self.address, amount_native)?;
                self.ledger
                    .transfer(native, self.address, pair.address(), amount_native)?;
                let liquidity = pair.mint(request.to)?;

                if value > amount_native {
                    self.ledger
                        .send_native(self.address, caller, value - amount_native)?;
                }
                Ok((amount_token, amount_native, liquidity))
            })?;

        debug!(?caller, %amount_token, %amount_native, %liquidity, "native liquidity added");
        Ok((amount_token, amount_native, liquidity))
    }

    /// Returns `(amount_a, amount_b)` paid to `request.to`
    pub fn remove_liquidity(
        &self,
        caller: Address,
        request: &RemoveLiquidity,
    ) -> Result<(U256, U256)> {
        self.ensure(request.deadline)?;
        let (amount_a, amount_b) =
            self.atomically(|| self.burn_liquidity(caller, request))?;
        debug!(?caller, %amount_a, %amount_b, "liquidity removed");
        Ok((amount_a, amount_b))
    }

    /// Returns `(amount_token, amount_native)` paid to `request.to`
    ///
    /// The wrapped side is unwrapped once and forwarded as native value.
    pub fn remove_liquidity_native(
        &self,
        caller: Address,
        request: &RemoveLiquidityNative,
    ) -> Result<(U256, U256)> {
        self.ensure(request.deadline)?;
        let native = self.wrapped_native;

        let (amount_token, amount_native) = self.atomically(|| {
            let (amount_token, amount_native) = self.burn_liquidity(
                caller,
                &RemoveLiquidity {
                    token_a: request.token,
                    token_b: native,
                    liquidity: request.liquidity,
                    amount_a_min: request.amount_token_min,
                    amount_b_min: request.amount_native_min,
                    to: self.address,
                    deadline: request.deadline,
                },
            )?;
            self.ledger
                .transfer(request.token, self.address, request.to, amount_token)?;
            self.pay_native(request.to, amount_native)?;
            Ok((amount_token, amount_native))
        })?;

        debug!(?caller, %amount_token, %amount_native, "native liquidity removed");
        Ok((amount_token, amount_native))
    }

    /// [`Router::remove_liquidity_native`] for tokens that charge a fee on
    /// transfer
    ///
    /// Forwards whatever token balance the router actually received from
    /// the pair. The token minimum applies to the amount the pair paid out.
    /// Returns the native amount sent to `request.to`.
    pub fn remove_liquidity_native_supporting_fee_on_transfer_tokens(
        &self,
        caller: Address,
        request: &RemoveLiquidityNative,
    ) -> Result<U256> {
        self.ensure(request.deadline)?;
        let native = self.wrapped_native;

        let amount_native = self.atomically(|| {
            let (_, amount_native) = self.burn_liquidity(
                caller,
                &RemoveLiquidity {
                    token_a: request.token,
                    token_b: native,
                    liquidity: request.liquidity,
                    amount_a_min: request.amount_token_min,
                    amount_b_min: request.amount_native_min,
                    to: self.address,
                    deadline: request.deadline,
                },
            )?;
            let received = self.ledger.balance_of(request.token, self.address);
            self.ledger
                .transfer(request.token, self.address, request.to, received)?;
            self.pay_native(request.to, amount_native)?;
            Ok(amount_native)
        })?;

        debug!(?caller, %amount_native, "native liquidity removed, fee-on-transfer token");
        Ok(amount_native)
    }

    // ---- swaps ----

    /// Swap an exact input for as much output as possible
    pub fn swap_exact_tokens_for_tokens(
        &self,
        caller: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<Vec<U256>> {
        self.ensure(deadline)?;
        self.atomically(|| {
            let amounts = library::get_amounts_out(&self.factory, amount_in, path)?;
            if amounts[1] < amount_out_min {
                return Err(AmmError::InsufficientOutputAmount);
            }
            let pair = self.hop_pair(path)?;
            self.ledger
                .transfer_from(path[0], self.address, caller, pair.address(), amounts[0])?;
            swap_hop(&pair, path, amounts[1], to)?;
            Ok(amounts)
        })
    }

    /// Swap as little input as possible for an exact output
    pub fn swap_tokens_for_exact_tokens(
        &self,
        caller: Address,
        amount_out: U256,
        amount_in_max: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<Vec<U256>> {
        self.ensure(deadline)?;
        self.atomically(|| {
            let amounts = library::get_amounts_in(&self.factory, amount_out, path)?;
            if amounts[0] > amount_in_max {
                return Err(AmmError::ExcessiveInputAmount);
            }
            let pair = self.hop_pair(path)?;
            self.ledger
                .transfer_from(path[0], self.address, caller, pair.address(), amounts[0])?;
            swap_hop(&pair, path, amounts[1], to)?;
            Ok(amounts)
        })
    }

    /// Swap all of the attached native value for tokens
    pub fn swap_exact_native_for_tokens(
        &self,
        caller: Address,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
        value: U256,
    ) -> Result<Vec<U256>> {
        self.ensure(deadline)?;
        if value.is_zero() {
            return Err(AmmError::ZeroValue);
        }
        self.atomically(|| {
            self.require_native_input(path)?;
            let amounts = library::get_amounts_out(&self.factory, value, path)?;
            if amounts[1] < amount_out_min {
                return Err(AmmError::InsufficientOutputAmount);
            }
            let pair = self.hop_pair(path)?;
            self.ledger.send_native(caller, self.address, amounts[0])?;
            self.deposit_native(&pair, amounts[0])?;
            swap_hop(&pair, path, amounts[1], to)?;
            Ok(amounts)
        })
    }

    /// Swap tokens for an exact amount of native value
    pub fn swap_tokens_for_exact_native(
        &self,
        caller: Address,
        amount_out: U256,
        amount_in_max: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<Vec<U256>> {
        self.ensure(deadline)?;
        self.atomically(|| {
            self.require_native_output(path)?;
            let amounts = library::get_amounts_in(&self.factory, amount_out, path)?;
            if amounts[0] > amount_in_max {
                return Err(AmmError::ExcessiveInputAmount);
            }
            let pair = self.hop_pair(path)?;
            self.ledger
                .transfer_from(path[0], self.address, caller, pair.address(), amounts[0])?;
            swap_hop(&pair, path, amounts[1], self.address)?;
            self.pay_native(to, amounts[1])?;
            Ok(amounts)
        })
    }

    /// Swap an exact token input for as much native value as possible
    pub fn swap_exact_tokens_for_native(
        &self,
        caller: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<Vec<U256>> {
        self.ensure(deadline)?;
        self.atomically(|| {
            self.require_native_output(path)?;
            let amounts = library::get_amounts_out(&self.factory, amount_in, path)?;
            if amounts[1] < amount_out_min {
                return Err(AmmError::InsufficientOutputAmount);
            }
            let pair = self.hop_pair(path)?;
            self.ledger
                .transfer_from(path[0], self.address, caller, pair.address(), amounts[0])?;
            swap_hop(&pair, path, amounts[1], self.address)?;
            self.pay_native(to, amounts[1])?;
            Ok(amounts)
        })
    }

    /// Swap attached native value for an exact token output, refunding the rest
    pub fn swap_native_for_exact_tokens(
        &self,
        caller: Address,
        amount_out: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
        value: U256,
    ) -> Result<Vec<U256>> {
        self.ensure(deadline)?;
        if value.is_zero() {
            return Err(AmmError::ZeroValue);
        }
        self.atomically(|| {
            self.require_native_input(path)?;
            let amounts = library::get_amounts_in(&self.factory, amount_out, path)?;
            if amounts[0] > value {
                return Err(AmmError::ExcessiveInputAmount);
            }
            let pair = self.hop_pair(path)?;
            self.ledger.send_native(caller, self.address, value)?;
            self.deposit_native(&pair, amounts[0])?;
            swap_hop(&pair, path, amounts[1], to)?;
            if value > amounts[0] {
                self.ledger
                    .send_native(self.address, caller, value - amounts[0])?;
            }
            Ok(amounts)
        })
    }

    /// Exact-input swap for tokens that charge a fee on transfer
    ///
    /// The input actually credited to the pair is measured from its balance,
    /// and the minimum is checked against what `to` actually received.
    pub fn swap_exact_tokens_for_tokens_supporting_fee_on_transfer_tokens(
        &self,
        caller: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<()> {
        self.ensure(deadline)?;
        self.atomically(|| {
            let (input, output) = single_hop(path)?;
            let pair = self.pair(input, output)?;
            self.ledger
                .transfer_from(input, self.address, caller, pair.address(), amount_in)?;

            let balance_before = self.ledger.balance_of(output, to);
            swap_observed_input(&pair, self.ledger.as_ref(), path, to)?;
            let received = math::sub(self.ledger.balance_of(output, to), balance_before)?;
            if received < amount_out_min {
                return Err(AmmError::InsufficientOutputAmount);
            }
            debug!(?caller, %received, "fee-on-transfer swap");
            Ok(())
        })
    }

    /// Swap all of the attached native value for a token that charges a fee
    /// on transfer
    pub fn swap_exact_native_for_tokens_supporting_fee_on_transfer_tokens(
        &self,
        caller: Address,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
        value: U256,
    ) -> Result<()> {
        self.ensure(deadline)?;
        if value.is_zero() {
            return Err(AmmError::ZeroValue);
        }
        self.atomically(|| {
            self.require_native_input(path)?;
            let pair = self.hop_pair(path)?;
            self.ledger.send_native(caller, self.address, value)?;
            self.deposit_native(&pair, value)?;

            let output = path[1];
            let balance_before = self.ledger.balance_of(output, to);
            swap_observed_input(&pair, self.ledger.as_ref(), path, to)?;
            let received = math::sub(self.ledger.balance_of(output, to), balance_before)?;
            if received < amount_out_min {
                return Err(AmmError::InsufficientOutputAmount);
            }
            debug!(?caller, %value, %received, "fee-on-transfer native swap");
            Ok(())
        })
    }

    /// Swap an exact amount of a token that charges a fee on transfer for
    /// native value
    ///
    /// The minimum is checked against the wrapped amount the router
    /// received from the pair.
    pub fn swap_exact_tokens_for_native_supporting_fee_on_transfer_tokens(
        &self,
        caller: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<()> {
        self.ensure(deadline)?;
        self.atomically(|| {
            self.require_native_output(path)?;
            let pair = self.hop_pair(path)?;
            self.ledger
                .transfer_from(path[0], self.address, caller, pair.address(), amount_in)?;

            let balance_before = self.ledger.balance_of(self.wrapped_native, self.address);
            swap_observed_input(&pair, self.ledger.as_ref(), path, self.address)?;
            let amount_out = math::sub(
                self.ledger.balance_of(self.wrapped_native, self.address),
                balance_before,
            )?;
            if amount_out < amount_out_min {
                return Err(AmmError::InsufficientOutputAmount);
            }
            self.pay_native(to, amount_out)?;
            debug!(?caller, %amount_out, "fee-on-transfer swap to native");
            Ok(())
        })
    }

    // ---- pure helpers ----

    pub fn quote(&self, amount_a: U256, reserve_a: U256, reserve_b: U256) -> Result<U256> {
        library::quote(amount_a, reserve_a, reserve_b)
    }

    pub fn get_amount_out(
        &self,
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> Result<U256> {
        library::get_amount_out(amount_in, reserve_in, reserve_out)
    }

    pub fn get_amount_in(
        &self,
        amount_out: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> Result<U256> {
        library::get_amount_in(amount_out, reserve_in, reserve_out)
    }

    pub fn get_amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<Vec<U256>> {
        library::get_amounts_out(&self.factory, amount_in, path)
    }

    pub fn get_amounts_in(&self, amount_out: U256, path: &[Address]) -> Result<Vec<U256>> {
        library::get_amounts_in(&self.factory, amount_out, path)
    }

    // ---- internals ----

    fn ensure(&self, deadline: u64) -> Result<()> {
        let now = self.clock.now();
        if deadline < now {
            return Err(AmmError::Expired { deadline, now });
        }
        Ok(())
    }

    /// Run `op` in one transaction, committing only on success
    ///
    /// On failure the ledger is rolled back and every pair written inside
    /// `op` gets its earlier state back.
    fn atomically<T>(&self, op: impl FnOnce() -> Result<T>) -> Result<T> {
        let tx = AmmTx::begin(self.factory.journal(), self.ledger.as_ref());
        let value = op()?;
        tx.commit();
        Ok(value)
    }

    /// Create the pair if missing, returning its address when created here
    fn ensure_pair(&self, token_a: Address, token_b: Address) -> Result<Option<Address>> {
        if self.factory.get_pair(token_a, token_b).is_some() {
            return Ok(None);
        }
        self.factory.create_pair(token_a, token_b).map(Some)
    }

    /// [`Router::atomically`] for operations that may create their pair
    ///
    /// A pair created here is removed from the registry again if `op` fails.
    fn atomically_with_pair<T>(
        &self,
        token_a: Address,
        token_b: Address,
        op: impl FnOnce(Arc<Pair>) -> Result<T>,
    ) -> Result<T> {
        self.atomically(|| {
            let created = self.ensure_pair(token_a, token_b)?;
            let result = self.pair(token_a, token_b).and_then(op);
            if let (Some(address), Err(_)) = (created, &result) {
                self.factory.discard_pair(address);
            }
            result
        })
    }

    fn pair(&self, token_a: Address, token_b: Address) -> Result<Arc<Pair>> {
        self.factory
            .pair_for_tokens(token_a, token_b)
            .ok_or(AmmError::PairNotExist)
    }

    fn hop_pair(&self, path: &[Address]) -> Result<Arc<Pair>> {
        let (input, output) = single_hop(path)?;
        self.pair(input, output)
    }

    /// Optimal deposit for the desired amounts at the current reserve ratio
    fn liquidity_amounts(
        &self,
        token_a: Address,
        token_b: Address,
        (amount_a_desired, amount_b_desired): (U256, U256),
        (amount_a_min, amount_b_min): (U256, U256),
    ) -> Result<(U256, U256)> {
        let (reserve_a, reserve_b) = library::get_reserves(&self.factory, token_a, token_b)?;
        if reserve_a.is_zero() && reserve_b.is_zero() {
            return Ok((amount_a_desired, amount_b_desired));
        }

        let amount_b_optimal = library::quote(amount_a_desired, reserve_a, reserve_b)?;
        if amount_b_optimal <= amount_b_desired {
            if amount_b_optimal < amount_b_min {
                return Err(AmmError::InsufficientBAmount);
            }
            return Ok((amount_a_desired, amount_b_optimal));
        }

        let amount_a_optimal = library::quote(amount_b_desired, reserve_b, reserve_a)?;
        if amount_a_optimal > amount_a_desired || amount_a_optimal < amount_a_min {
            return Err(AmmError::InsufficientAAmount);
        }
        Ok((amount_a_optimal, amount_b_desired))
    }

    /// Move the caller's shares into the pair and burn them
    fn burn_liquidity(
        &self,
        caller: Address,
        request: &RemoveLiquidity,
    ) -> Result<(U256, U256)> {
        let pair = self.pair(request.token_a, request.token_b)?;
        self.ledger.transfer_from(
            pair.address(),
            self.address,
            caller,
            pair.address(),
            request.liquidity,
        )?;
        let (amount0, amount1) = pair.burn(request.to)?;

        let (amount_a, amount_b) = if request.token_a == pair.token0() {
            (amount0, amount1)
        } else {
            (amount1, amount0)
        };
        if amount_a < request.amount_a_min {
            return Err(AmmError::InsufficientAAmount);
        }
        if amount_b < request.amount_b_min {
            return Err(AmmError::InsufficientBAmount);
        }
        Ok((amount_a, amount_b))
    }

    /// Wrap native value already held by the router and hand it to the pair
    fn deposit_native(&self, pair: &Pair, amount: U256) -> Result<()> {
        self.ledger.wrap(self.address, amount)?;
        self.ledger
            .transfer(self.wrapped_native, self.address, pair.address(), amount)?;
        Ok(())
    }

    /// Unwrap native value held by the router and send it on
    fn pay_native(&self, to: Address, amount: U256) -> Result<()> {
        self.ledger.unwrap(self.address, amount)?;
        self.ledger.send_native(self.address, to, amount)?;
        Ok(())
    }

    fn require_native_input(&self, path: &[Address]) -> Result<()> {
        let (input, _) = single_hop(path)?;
        if input != self.wrapped_native {
            return Err(AmmError::InvalidPath);
        }
        Ok(())
    }

    fn require_native_output(&self, path: &[Address]) -> Result<()> {
        let (_, output) = single_hop(path)?;
        if output != self.wrapped_native {
            return Err(AmmError::InvalidPath);
        }
        Ok(())
    }
}

/// Swap whatever input the pair holds beyond its reserve for the formula
/// output, sending it to `to`
fn swap_observed_input(
    pair: &Pair,
    ledger: &dyn NativeLedger,
    path: &[Address],
    to: Address,
) -> Result<U256> {
    let (input, _) = single_hop(path)?;
    let (reserve0, reserve1, _) = pair.get_reserves();
    let (reserve_in, reserve_out) = if input == pair.token0() {
        (U256::from(reserve0), U256::from(reserve1))
    } else {
        (U256::from(reserve1), U256::from(reserve0))
    };
    let amount_input = math::sub(ledger.balance_of(input, pair.address()), reserve_in)?;
    let amount_output = library::get_amount_out(amount_input, reserve_in, reserve_out)?;
    swap_hop(pair, path, amount_output, to)?;
    Ok(amount_output)
}

/// Execute the single hop of `path`, sending `amount_out` of its output to `to`
fn swap_hop(pair: &Pair, path: &[Address], amount_out: U256, to: Address) -> Result<()> {
    let (input, _) = single_hop(path)?;
    let (amount0_out, amount1_out) = if input == pair.token0() {
        (U256::zero(), amount_out)
    } else {
        (amount_out, U256::zero())
    };
    pair.swap(amount0_out, amount1_out, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory_ledger::MemoryLedger;

    const NOW: u64 = 1_000;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn setup() -> (Arc<MemoryLedger>, Router) {
        let ledger = Arc::new(MemoryLedger::new(addr(0xee)));
        let clock = Arc::new(ManualClock::new(NOW));
        let factory = Arc::new(PairFactory::new(
            addr(0xfa),
            addr(0x5e),
            ledger.clone(),
            clock.clone(),
        ));
        let router = Router::new(addr(0x70), factory, ledger.clone(), clock);
        (ledger, router)
    }

    #[test]
    fn test_expired_deadline() {
        let (_, router) = setup();
        let result = router.swap_exact_tokens_for_tokens(
            addr(1),
            U256::one(),
            U256::zero(),
            &[addr(2), addr(3)],
            addr(1),
            NOW - 1,
        );
        assert_eq!(
            result,
            Err(AmmError::Expired {
                deadline: NOW - 1,
                now: NOW
            })
        );
    }

    #[test]
    fn test_liquidity_amounts_on_empty_pair() {
        let (_, router) = setup();
        router.factory().create_pair(addr(2), addr(3)).unwrap();
        let amounts = router
            .liquidity_amounts(
                addr(2),
                addr(3),
                (U256::from(7u64), U256::from(9u64)),
                (U256::zero(), U256::zero()),
            )
            .unwrap();
        assert_eq!(amounts, (U256::from(7u64), U256::from(9u64)));
    }

    #[test]
    fn test_failed_add_liquidity_discards_new_pair() {
        let (ledger, router) = setup();
        let caller = addr(1);
        // no approval: the first transfer fails after the pair was created
        ledger.mint(addr(2), caller, U256::from(10_000u64)).unwrap();
        ledger.mint(addr(3), caller, U256::from(10_000u64)).unwrap();

        let result = router.add_liquidity(
            caller,
            &AddLiquidity {
                token_a: addr(2),
                token_b: addr(3),
                amount_a_desired: U256::from(10_000u64),
                amount_b_desired: U256::from(10_000u64),
                amount_a_min: U256::zero(),
                amount_b_min: U256::zero(),
                to: caller,
                deadline: NOW,
            },
        );
        assert!(matches!(result, Err(AmmError::Token(_))));
        assert_eq!(router.factory().get_pair(addr(2), addr(3)), None);
        assert_eq!(router.factory().all_pairs_length(), 0);
    }

    #[test]
    fn test_native_paths_must_touch_wrapped_token() {
        let (_, router) = setup();
        let path = [addr(2), addr(3)];
        assert_eq!(
            router.swap_exact_native_for_tokens(
                addr(1),
                U256::zero(),
                &path,
                addr(1),
                NOW,
                U256::one()
            ),
            Err(AmmError::InvalidPath)
        );
        assert_eq!(
            router.swap_exact_tokens_for_native(
                addr(1),
                U256::one(),
                U256::zero(),
                &path,
                addr(1),
                NOW
            ),
            Err(AmmError::InvalidPath)
        );
    }

    #[test]
    fn test_zero_value_rejected() {
        let (_, router) = setup();
        assert_eq!(
            router.swap_native_for_exact_tokens(
                addr(1),
                U256::one(),
                &[addr(0xee), addr(3)],
                addr(1),
                NOW,
                U256::zero()
            ),
            Err(AmmError::ZeroValue)
        );
    }
}
