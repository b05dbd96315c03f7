//! In-memory journaled token ledger
//!
//! Reference implementation of [`TokenLedger`] and [`NativeLedger`] for
//! embedding the AMM in a single process and for tests. Every write made
//! inside an open checkpoint is journaled with the value it replaced, so a
//! rollback restores balances, supplies and allowances exactly.
//!
//! Transactions are expected to be serialized by the host: the journal is
//! shared by all callers of one ledger.

use crate::ledger::{Checkpoint, NativeLedger, TokenError, TokenLedger};
use ethereum_types::{Address, U256};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, trace};

const FEE_DENOMINATOR: u32 = 10_000;

#[derive(Debug, Clone)]
enum JournalEntry {
    Balance {
        token: Address,
        holder: Address,
        previous: U256,
    },
    Supply {
        token: Address,
        previous: U256,
    },
    Allowance {
        token: Address,
        owner: Address,
        spender: Address,
        previous: U256,
    },
    Native {
        holder: Address,
        previous: U256,
    },
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<(Address, Address), U256>,
    supplies: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    native: HashMap<Address, U256>,
    /// Per-token transfer fee in basis points, burned on every transfer
    transfer_fees: HashMap<Address, u32>,
    journal: Vec<JournalEntry>,
    depth: usize,
}

impl LedgerState {
    fn balance(&self, token: Address, holder: Address) -> U256 {
        self.balances
            .get(&(token, holder))
            .copied()
            .unwrap_or_default()
    }

    fn supply(&self, token: Address) -> U256 {
        self.supplies.get(&token).copied().unwrap_or_default()
    }

    fn native_balance(&self, holder: Address) -> U256 {
        self.native.get(&holder).copied().unwrap_or_default()
    }

    fn record(&mut self, entry: JournalEntry) {
        if self.depth > 0 {
            self.journal.push(entry);
        }
    }

    fn set_balance(&mut self, token: Address, holder: Address, value: U256) {
        let previous = self.balance(token, holder);
        self.record(JournalEntry::Balance {
            token,
            holder,
            previous,
        });
        self.balances.insert((token, holder), value);
    }

    fn set_supply(&mut self, token: Address, value: U256) {
        let previous = self.supply(token);
        self.record(JournalEntry::Supply { token, previous });
        self.supplies.insert(token, value);
    }

    fn set_allowance(&mut self, token: Address, owner: Address, spender: Address, value: U256) {
        let previous = self
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default();
        self.record(JournalEntry::Allowance {
            token,
            owner,
            spender,
            previous,
        });
        self.allowances.insert((token, owner, spender), value);
    }

    fn set_native(&mut self, holder: Address, value: U256) {
        let previous = self.native_balance(holder);
        self.record(JournalEntry::Native { holder, previous });
        self.native.insert(holder, value);
    }

    fn credit(&mut self, token: Address, holder: Address, amount: U256) -> Result<(), TokenError> {
        let balance = self
            .balance(token, holder)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.set_balance(token, holder, balance);
        Ok(())
    }

    fn debit(&mut self, token: Address, holder: Address, amount: U256) -> Result<(), TokenError> {
        let balance = self
            .balance(token, holder)
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientBalance)?;
        self.set_balance(token, holder, balance);
        Ok(())
    }

    fn mint(&mut self, token: Address, to: Address, amount: U256) -> Result<(), TokenError> {
        let supply = self
            .supply(token)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.credit(token, to, amount)?;
        self.set_supply(token, supply);
        Ok(())
    }

    fn burn(&mut self, token: Address, from: Address, amount: U256) -> Result<(), TokenError> {
        self.debit(token, from, amount)?;
        let supply = self
            .supply(token)
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientBalance)?;
        self.set_supply(token, supply);
        Ok(())
    }

    /// Move tokens, burning the token's transfer fee from the amount sent
    fn move_tokens(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        let fee_bps = self.transfer_fees.get(&token).copied().unwrap_or(0);
        let fee = amount
            .checked_mul(U256::from(fee_bps))
            .ok_or(TokenError::Overflow)?
            / U256::from(FEE_DENOMINATOR);

        // both sides are checked before either is written
        let from_balance = self
            .balance(token, from)
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientBalance)?;
        let to_before = if to == from {
            from_balance
        } else {
            self.balance(token, to)
        };
        let to_balance = to_before
            .checked_add(amount - fee)
            .ok_or(TokenError::Overflow)?;

        self.set_balance(token, from, from_balance);
        self.set_balance(token, to, to_balance);
        if !fee.is_zero() {
            let supply = self.supply(token).saturating_sub(fee);
            self.set_supply(token, supply);
        }
        Ok(())
    }

    fn undo_to(&mut self, mark: usize) {
        while self.journal.len() > mark {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            match entry {
                JournalEntry::Balance {
                    token,
                    holder,
                    previous,
                } => {
                    self.balances.insert((token, holder), previous);
                }
                JournalEntry::Supply { token, previous } => {
                    self.supplies.insert(token, previous);
                }
                JournalEntry::Allowance {
                    token,
                    owner,
                    spender,
                    previous,
                } => {
                    self.allowances.insert((token, owner, spender), previous);
                }
                JournalEntry::Native { holder, previous } => {
                    self.native.insert(holder, previous);
                }
            }
        }
    }
}

/// Journaled in-memory ledger for tokens, pool shares and native value
#[derive(Debug)]
pub struct MemoryLedger {
    wrapped_native: Address,
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    /// Create an empty ledger whose wrapped native token lives at `wrapped_native`
    pub fn new(wrapped_native: Address) -> Self {
        Self {
            wrapped_native,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Credit native value to a holder, as the host does for external deposits
    pub fn deposit_native(&self, holder: Address, amount: U256) -> Result<(), TokenError> {
        let mut state = self.state.lock();
        let balance = state
            .native_balance(holder)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        state.set_native(holder, balance);
        Ok(())
    }

    /// Charge a fee of `fee_bps` basis points on every transfer of `token`
    pub fn set_transfer_fee(&self, token: Address, fee_bps: u32) {
        let fee_bps = fee_bps.min(FEE_DENOMINATOR);
        self.state.lock().transfer_fees.insert(token, fee_bps);
    }

    /// Number of journal entries held by open checkpoints
    pub fn pending_entries(&self) -> usize {
        self.state.lock().journal.len()
    }
}

impl TokenLedger for MemoryLedger {
    fn balance_of(&self, token: Address, holder: Address) -> U256 {
        self.state.lock().balance(token, holder)
    }

    fn total_supply(&self, token: Address) -> U256 {
        self.state.lock().supply(token)
    }

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state
            .lock()
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    fn approve(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        self.state.lock().set_allowance(token, owner, spender, amount);
        Ok(())
    }

    fn transfer(
        &self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        trace!(?token, ?from, ?to, %amount, "transfer");
        self.state.lock().move_tokens(token, from, to, amount)
    }

    fn transfer_from(
        &self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        trace!(?token, ?spender, ?from, ?to, %amount, "transfer_from");
        let mut state = self.state.lock();
        let allowance = state
            .allowances
            .get(&(token, from, spender))
            .copied()
            .unwrap_or_default();
        // unlimited approvals are never decremented
        if allowance != U256::MAX {
            let remaining = allowance
                .checked_sub(amount)
                .ok_or(TokenError::InsufficientAllowance)?;
            state.set_allowance(token, from, spender, remaining);
        }
        state.move_tokens(token, from, to, amount)
    }

    fn mint(&self, token: Address, to: Address, amount: U256) -> Result<(), TokenError> {
        self.state.lock().mint(token, to, amount)
    }

    fn burn(&self, token: Address, from: Address, amount: U256) -> Result<(), TokenError> {
        self.state.lock().burn(token, from, amount)
    }

    fn checkpoint(&self) -> Checkpoint {
        let mut state = self.state.lock();
        state.depth += 1;
        Checkpoint(state.journal.len())
    }

    fn rollback(&self, checkpoint: Checkpoint) {
        let mut state = self.state.lock();
        let undone = state.journal.len().saturating_sub(checkpoint.0);
        state.undo_to(checkpoint.0);
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.journal.clear();
        }
        debug!(undone, depth = state.depth, "ledger rollback");
    }

    fn commit(&self, _checkpoint: Checkpoint) {
        let mut state = self.state.lock();
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.journal.clear();
        }
    }
}

impl NativeLedger for MemoryLedger {
    fn wrapped_native(&self) -> Address {
        self.wrapped_native
    }

    fn native_balance_of(&self, holder: Address) -> U256 {
        self.state.lock().native_balance(holder)
    }

    fn send_native(&self, from: Address, to: Address, amount: U256) -> Result<(), TokenError> {
        let mut state = self.state.lock();
        let from_balance = state
            .native_balance(from)
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientNativeBalance)?;
        let to_before = if to == from {
            from_balance
        } else {
            state.native_balance(to)
        };
        let to_balance = to_before.checked_add(amount).ok_or(TokenError::Overflow)?;
        state.set_native(from, from_balance);
        state.set_native(to, to_balance);
        Ok(())
    }

    fn wrap(&self, holder: Address, amount: U256) -> Result<(), TokenError> {
        let mut state = self.state.lock();
        let remaining = state
            .native_balance(holder)
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientNativeBalance)?;
        let wrapped = self.wrapped_native;
        state.mint(wrapped, holder, amount)?;
        state.set_native(holder, remaining);
        Ok(())
    }

    fn unwrap(&self, holder: Address, amount: U256) -> Result<(), TokenError> {
        let mut state = self.state.lock();
        let wrapped = self.wrapped_native;
        let balance = state
            .native_balance(holder)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        state.burn(wrapped, holder, amount)?;
        state.set_native(holder, balance);
        Ok(())
    }
}
