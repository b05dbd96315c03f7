//! Token ledger interfaces consumed by the pair engine and router
//!
//! The ledger is the host's view of fungible balances: the two pair tokens,
//! the pool-share token of every pair (addressed by the pair's own address)
//! and the wrapped native token. Every AMM operation runs inside a ledger
//! transaction so that a failure anywhere undoes all transfers, mints and
//! burns it performed.

use ethereum_types::{Address, U256};
use thiserror::Error;

/// Failures reported by a token ledger
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Insufficient allowance")]
    InsufficientAllowance,

    #[error("Insufficient native balance")]
    InsufficientNativeBalance,

    #[error("Balance or supply overflow")]
    Overflow,

    /// A ledger whose transfer reports `false` instead of failing
    #[error("Transfer rejected by token {0:?}")]
    Rejected(Address),
}

/// Opaque marker returned by [`TokenLedger::checkpoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(pub usize);

/// Fungible-token balances, allowances and share supply
///
/// `mint` and `burn` are only called by a pair for its own share token.
/// Checkpoints nest: an inner commit keeps its effects pending until the
/// outermost checkpoint is committed, and rolling back an outer checkpoint
/// undoes committed inner work as well.
pub trait TokenLedger: Send + Sync {
    fn balance_of(&self, token: Address, holder: Address) -> U256;

    fn total_supply(&self, token: Address) -> U256;

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256;

    fn approve(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), TokenError>;

    fn transfer(
        &self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError>;

    fn transfer_from(
        &self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError>;

    fn mint(&self, token: Address, to: Address, amount: U256) -> Result<(), TokenError>;

    fn burn(&self, token: Address, from: Address, amount: U256) -> Result<(), TokenError>;

    fn checkpoint(&self) -> Checkpoint;

    fn rollback(&self, checkpoint: Checkpoint);

    fn commit(&self, checkpoint: Checkpoint);
}

/// Native value and its wrapped token
pub trait NativeLedger: TokenLedger {
    /// Address of the token that wraps native value one-to-one
    fn wrapped_native(&self) -> Address;

    fn native_balance_of(&self, holder: Address) -> U256;

    fn send_native(&self, from: Address, to: Address, amount: U256) -> Result<(), TokenError>;

    /// Convert `amount` of the holder's native value into wrapped tokens
    fn wrap(&self, holder: Address, amount: U256) -> Result<(), TokenError>;

    /// Convert `amount` of the holder's wrapped tokens back into native value
    fn unwrap(&self, holder: Address, amount: U256) -> Result<(), TokenError>;
}

/// Scoped ledger transaction
///
/// Dropping the guard without calling [`LedgerTx::commit`] rolls back every
/// ledger effect made since it was opened, including on early `?` returns.
pub struct LedgerTx<'a, L: TokenLedger + ?Sized> {
    ledger: &'a L,
    checkpoint: Option<Checkpoint>,
}

impl<'a, L: TokenLedger + ?Sized> LedgerTx<'a, L> {
    pub fn begin(ledger: &'a L) -> Self {
        let checkpoint = ledger.checkpoint();
        Self {
            ledger,
            checkpoint: Some(checkpoint),
        }
    }

    pub fn commit(mut self) {
        if let Some(checkpoint) = self.checkpoint.take() {
            self.ledger.commit(checkpoint);
        }
    }
}

impl<L: TokenLedger + ?Sized> Drop for LedgerTx<'_, L> {
    fn drop(&mut self) {
        if let Some(checkpoint) = self.checkpoint.take() {
            self.ledger.rollback(checkpoint);
        }
    }
}
