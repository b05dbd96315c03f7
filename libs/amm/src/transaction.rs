//! Transactions spanning the ledger and pair state
//!
//! A ledger checkpoint only covers balances. Pair reserves, accumulators
//! and `k_last` live next to each pair, so an operation that commits inside
//! an enclosing transaction (a router call, or a ledger callback reentering
//! another pair) must leave an undo record for that state too. The
//! [`StateJournal`] keeps those records with the same nesting rules as the
//! ledger: an inner commit keeps its undo records until the outermost
//! transaction commits, and rolling back an outer transaction restores every
//! pair written inside it.
//!
//! The journal also serializes transactions: one thread at a time may hold
//! an open [`AmmTx`] per journal. Nested transactions on the same thread
//! (reentrant ledger callbacks, router calls into pairs) do not block.

use crate::ledger::{LedgerTx, TokenLedger};
use crate::pair::PairState;
use ethereum_types::Address;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock};
use std::sync::Arc;
use tracing::debug;

/// Shared state cell of one pair
pub(crate) type StateCell = Arc<RwLock<PairState>>;

struct Undo {
    pair: Address,
    cell: StateCell,
    previous: PairState,
}

#[derive(Default)]
struct Entries {
    undo: Vec<Undo>,
    depth: usize,
}

/// Undo log for pair state, shared by every pair of one factory
#[derive(Default)]
pub struct StateJournal {
    serial: ReentrantMutex<()>,
    entries: Mutex<Entries>,
}

impl std::fmt::Debug for StateJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("StateJournal")
            .field("depth", &entries.depth)
            .field("pending", &entries.undo.len())
            .finish()
    }
}

impl StateJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Undo records held by open transactions
    pub fn pending_entries(&self) -> usize {
        self.entries.lock().undo.len()
    }

    /// Replace the state in `cell`, keeping an undo record while a
    /// transaction is open
    pub(crate) fn write(&self, pair: Address, cell: &StateCell, next: PairState) {
        let previous = std::mem::replace(&mut *cell.write(), next);
        let mut entries = self.entries.lock();
        if entries.depth > 0 {
            entries.undo.push(Undo {
                pair,
                cell: Arc::clone(cell),
                previous,
            });
        }
    }

    fn open(&self) -> usize {
        let mut entries = self.entries.lock();
        entries.depth += 1;
        entries.undo.len()
    }

    fn close(&self) {
        let mut entries = self.entries.lock();
        entries.depth = entries.depth.saturating_sub(1);
        if entries.depth == 0 {
            entries.undo.clear();
        }
    }

    fn undo_to(&self, mark: usize) {
        let undone = {
            let mut entries = self.entries.lock();
            let keep = mark.min(entries.undo.len());
            entries.undo.split_off(keep)
        };
        for undo in undone.into_iter().rev() {
            *undo.cell.write() = undo.previous;
            debug!(pair = ?undo.pair, "pair state restored");
        }
        self.close();
    }
}

/// Scoped transaction over a ledger and a [`StateJournal`]
///
/// Dropping it without [`AmmTx::commit`] restores every pair state written
/// since it was opened and rolls the ledger back to its checkpoint.
pub struct AmmTx<'a, L: TokenLedger + ?Sized> {
    journal: &'a StateJournal,
    mark: usize,
    open: bool,
    ledger_tx: Option<LedgerTx<'a, L>>,
    // released last, after both rollbacks
    _serial: ReentrantMutexGuard<'a, ()>,
}

impl<'a, L: TokenLedger + ?Sized> AmmTx<'a, L> {
    pub fn begin(journal: &'a StateJournal, ledger: &'a L) -> Self {
        let serial = journal.serial.lock();
        let ledger_tx = LedgerTx::begin(ledger);
        let mark = journal.open();
        Self {
            journal,
            mark,
            open: true,
            ledger_tx: Some(ledger_tx),
            _serial: serial,
        }
    }

    pub fn commit(mut self) {
        self.open = false;
        self.journal.close();
        if let Some(ledger_tx) = self.ledger_tx.take() {
            ledger_tx.commit();
        }
    }
}

impl<L: TokenLedger + ?Sized> Drop for AmmTx<'_, L> {
    fn drop(&mut self) {
        if self.open {
            self.journal.undo_to(self.mark);
        }
        // an uncommitted ledger transaction rolls back on drop
        self.ledger_tx.take();
    }
}
