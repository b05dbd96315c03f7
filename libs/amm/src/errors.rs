//! Error types for the pair engine, registry and router
//!
//! Every failure is returned synchronously to the immediate caller. Each
//! operation rolls back all of its effects before the error surfaces, so a
//! caller can retry with corrected input.

use crate::ledger::TokenError;
use thiserror::Error;

/// Coarse classification used by callers deciding how to react to a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed request, rejected before any state change
    Validation,
    /// Request is well-formed but the pool cannot satisfy it at current prices
    Economic,
    /// A value does not fit its fixed width; signals an upstream deposit error
    Overflow,
    /// The fee-adjusted constant product would decrease
    Invariant,
}

/// Errors produced by the AMM core
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmmError {
    #[error("Token identifiers must differ")]
    IdenticalTokens,

    #[error("Token identifier cannot be the zero address")]
    ZeroAddress,

    #[error("Pair already exists")]
    PairExists,

    #[error("Pair does not exist")]
    PairNotExist,

    #[error("Only single-hop paths are supported (path length {length})")]
    MultiHopUnsupported { length: usize },

    #[error("Path does not start or end at the wrapped native token")]
    InvalidPath,

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Native value sent with the call must be greater than zero")]
    ZeroValue,

    #[error("Recipient cannot be one of the pair's tokens")]
    InvalidTo,

    #[error("Deadline {deadline} has passed (now {now})")]
    Expired { deadline: u64, now: u64 },

    #[error("Caller is not allowed to perform this action")]
    Forbidden,

    #[error("Pair is locked by an operation in progress")]
    Locked,

    #[error("Elapsed time must be greater than zero")]
    ZeroElapsed,

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Insufficient liquidity minted")]
    InsufficientLiquidityMinted,

    #[error("Insufficient liquidity burned")]
    InsufficientLiquidityBurned,

    #[error("No pool shares held by the pair to burn")]
    NoLiquidity,

    #[error("Insufficient output amount")]
    InsufficientOutputAmount,

    #[error("Insufficient input amount")]
    InsufficientInputAmount,

    #[error("Insufficient amount of token A")]
    InsufficientAAmount,

    #[error("Insufficient amount of token B")]
    InsufficientBAmount,

    #[error("Excessive input amount")]
    ExcessiveInputAmount,

    #[error("Balance exceeds the maximum reserve width")]
    Overflow,

    #[error("Arithmetic overflow or underflow")]
    Arithmetic,

    #[error("Fee-adjusted constant product invariant violated")]
    KInvariantViolated,

    #[error("Token ledger error: {0}")]
    Token(#[from] TokenError),
}

impl AmmError {
    /// Classify the error per the taxonomy callers rely on
    pub fn class(&self) -> ErrorClass {
        match self {
            AmmError::IdenticalTokens
            | AmmError::ZeroAddress
            | AmmError::PairExists
            | AmmError::PairNotExist
            | AmmError::MultiHopUnsupported { .. }
            | AmmError::InvalidPath
            | AmmError::ZeroAmount
            | AmmError::ZeroValue
            | AmmError::InvalidTo
            | AmmError::Expired { .. }
            | AmmError::Forbidden
            | AmmError::Locked
            | AmmError::ZeroElapsed => ErrorClass::Validation,

            AmmError::InsufficientLiquidity
            | AmmError::InsufficientLiquidityMinted
            | AmmError::InsufficientLiquidityBurned
            | AmmError::NoLiquidity
            | AmmError::InsufficientOutputAmount
            | AmmError::InsufficientInputAmount
            | AmmError::InsufficientAAmount
            | AmmError::InsufficientBAmount
            | AmmError::ExcessiveInputAmount
            | AmmError::Token(_) => ErrorClass::Economic,

            AmmError::Overflow | AmmError::Arithmetic => ErrorClass::Overflow,

            AmmError::KInvariantViolated => ErrorClass::Invariant,
        }
    }
}

pub type Result<T, E = AmmError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(AmmError::PairExists.class(), ErrorClass::Validation);
        assert_eq!(
            AmmError::MultiHopUnsupported { length: 3 }.class(),
            ErrorClass::Validation
        );
        assert_eq!(AmmError::InsufficientOutputAmount.class(), ErrorClass::Economic);
        assert_eq!(AmmError::Overflow.class(), ErrorClass::Overflow);
        assert_eq!(AmmError::KInvariantViolated.class(), ErrorClass::Invariant);
    }

    #[test]
    fn test_token_error_converts() {
        let err: AmmError = TokenError::InsufficientBalance.into();
        assert_eq!(err, AmmError::Token(TokenError::InsufficientBalance));
        assert_eq!(err.class(), ErrorClass::Economic);
    }
}
