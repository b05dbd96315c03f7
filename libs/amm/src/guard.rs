//! Per-pair reentrancy lock

use crate::errors::{AmmError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Lock flag held for the whole duration of a mutating pair operation
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    locked: AtomicBool,
}

/// Proof that the guard is held; releases it when dropped
#[must_use = "the lock is released as soon as the token is dropped"]
pub struct Entered<'a> {
    guard: &'a ReentrancyGuard,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock, failing with [`AmmError::Locked`] if it is held
    pub fn enter(&self) -> Result<Entered<'_>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| {
                warn!("reentrant call rejected");
                AmmError::Locked
            })?;
        Ok(Entered { guard: self })
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.guard.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reentry_rejected_until_released() {
        let guard = ReentrancyGuard::new();
        {
            let _entered = guard.enter().unwrap();
            assert!(guard.is_locked());
            assert!(matches!(guard.enter(), Err(AmmError::Locked)));
        }
        assert!(!guard.is_locked());
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn test_released_on_error_path() {
        fn failing(guard: &ReentrancyGuard) -> Result<()> {
            let _entered = guard.enter()?;
            Err(AmmError::KInvariantViolated)
        }

        let guard = ReentrancyGuard::new();
        assert_eq!(failing(&guard), Err(AmmError::KInvariantViolated));
        assert!(!guard.is_locked());
    }
}
