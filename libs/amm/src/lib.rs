//! # Torq AMM - Constant-Product Liquidity Pools
//!
//! ## Purpose
//!
//! Self-contained constant-product automated market maker: a registry of
//! two-token pools, the pool engine that holds reserves and issues pool
//! shares, and a router that moves user funds with slippage and deadline
//! protection. Prices follow `x * y = k` with a 0.3% fee on input, and every
//! pool keeps time-weighted price accumulators for oracle consumers.
//!
//! ## Integration Points
//!
//! - **Token Ledger**: balances, allowances and share supply are owned by a
//!   host ledger behind [`TokenLedger`] / [`NativeLedger`];
//!   [`MemoryLedger`] is the in-process implementation
//! - **Clock**: block timestamps come from a [`Clock`]
//! - **Configuration**: [`Deployment::from_config`] wires a factory and
//!   router from a `torq_config::AmmConfig`
//! - **Oracles**: [`oracle`] derives TWAPs from the pools' accumulators
//!
//! ## Architecture Role
//!
//! ```text
//!   caller ──► Router ──► PairFactory ──► Pair ──► TokenLedger
//!                │            (registry)    │
//!                └── library (pricing) ◄────┘
//! ```
//!
//! Every state-changing operation runs inside an [`AmmTx`], which pairs a
//! ledger checkpoint with an undo journal for pool state, so a failure at
//! any point leaves balances, reserves and the registry untouched, even for
//! pools reached through reentrant ledger callbacks. Transactions on one
//! factory's pools are serialized across threads.
//!
//! ## Precision
//!
//! - **Amounts**: `U256`, checked arithmetic everywhere (no floating point)
//! - **Reserves**: bounded to 112 bits
//! - **Prices**: UQ112x112 fixed point, rendered through `rust_decimal` for
//!   reporting only

pub mod clock;
pub mod deployment;
pub mod errors;
pub mod factory;
pub mod fixed_point;
pub mod guard;
pub mod ledger;
pub mod library;
pub mod math;
pub mod memory_ledger;
pub mod oracle;
pub mod pair;
pub mod router;
pub mod transaction;

pub use clock::{Clock, ManualClock, SystemClock};
pub use deployment::Deployment;
pub use errors::{AmmError, ErrorClass, Result};
pub use factory::{PairFactory, ProtocolFee};
pub use fixed_point::UQ112x112;
pub use ledger::{Checkpoint, LedgerTx, NativeLedger, TokenError, TokenLedger};
pub use library::{get_amount_in, get_amount_out, quote, sort_tokens};
pub use memory_ledger::MemoryLedger;
pub use pair::{Pair, PairSnapshot, PairState, MINIMUM_LIQUIDITY};
pub use router::{
    AddLiquidity, AddLiquidityNative, RemoveLiquidity, RemoveLiquidityNative, Router,
};
pub use transaction::{AmmTx, StateJournal};

/// Common types for AMM calculations
pub use ethereum_types::{Address, U256};
pub use rust_decimal::Decimal;
