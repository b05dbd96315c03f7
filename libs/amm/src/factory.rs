//! Pair registry
//!
//! Creates pairs, canonicalizes token order and guarantees at most one pair
//! per unordered token pair. Also owns the protocol fee switch shared with
//! every pair it creates.

use crate::clock::Clock;
use crate::errors::{AmmError, Result};
use crate::ledger::TokenLedger;
use crate::library::{pair_for, sort_tokens};
use crate::pair::Pair;
use crate::transaction::StateJournal;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ethereum_types::Address;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

/// Protocol fee recipient and the account allowed to change it
#[derive(Debug)]
pub struct ProtocolFee {
    fee_to: RwLock<Option<Address>>,
    fee_to_setter: RwLock<Address>,
}

impl ProtocolFee {
    pub fn new(fee_to_setter: Address) -> Self {
        Self {
            fee_to: RwLock::new(None),
            fee_to_setter: RwLock::new(fee_to_setter),
        }
    }

    /// Recipient of protocol fee shares; `None` while the fee is off
    pub fn fee_to(&self) -> Option<Address> {
        *self.fee_to.read()
    }

    pub fn fee_to_setter(&self) -> Address {
        *self.fee_to_setter.read()
    }
}

/// Registry of pairs keyed by token pair
pub struct PairFactory {
    address: Address,
    ledger: Arc<dyn TokenLedger>,
    clock: Arc<dyn Clock>,
    protocol_fee: Arc<ProtocolFee>,
    journal: Arc<StateJournal>,
    /// Both token orders map to the same pair address
    pairs_by_tokens: DashMap<(Address, Address), Address>,
    pairs: DashMap<Address, Arc<Pair>>,
    all_pairs: RwLock<Vec<Address>>,
}

impl std::fmt::Debug for PairFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairFactory")
            .field("address", &self.address)
            .field("pairs", &self.all_pairs_length())
            .field("protocol_fee", &self.protocol_fee)
            .finish()
    }
}

impl PairFactory {
    pub fn new(
        address: Address,
        fee_to_setter: Address,
        ledger: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            address,
            ledger,
            clock,
            protocol_fee: Arc::new(ProtocolFee::new(fee_to_setter)),
            journal: Arc::new(StateJournal::new()),
            pairs_by_tokens: DashMap::new(),
            pairs: DashMap::new(),
            all_pairs: RwLock::new(Vec::new()),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Pair-state journal shared by every pair of this factory
    ///
    /// Hosts composing several operations into one unit open an
    /// [`AmmTx`](crate::transaction::AmmTx) over it; a bare ledger
    /// checkpoint does not cover pair state.
    pub fn journal(&self) -> &Arc<StateJournal> {
        &self.journal
    }

    /// Create the pair for `token_a`/`token_b`, returning its address
    pub fn create_pair(&self, token_a: Address, token_b: Address) -> Result<Address> {
        let (token0, token1) = sort_tokens(token_a, token_b)?;
        let address = pair_for(self.address, token0, token1)?;

        // the canonical entry is the uniqueness point for concurrent creators
        match self.pairs_by_tokens.entry((token0, token1)) {
            Entry::Occupied(_) => return Err(AmmError::PairExists),
            Entry::Vacant(entry) => {
                let pair = Arc::new(Pair::new(
                    address,
                    self.address,
                    token0,
                    token1,
                    Arc::clone(&self.ledger),
                    Arc::clone(&self.clock),
                    Arc::clone(&self.protocol_fee),
                    Arc::clone(&self.journal),
                ));
                self.pairs.insert(address, pair);
                entry.insert(address);
            }
        }
        self.pairs_by_tokens.insert((token1, token0), address);

        let count = {
            let mut all_pairs = self.all_pairs.write();
            all_pairs.push(address);
            all_pairs.len()
        };

        info!(?token0, ?token1, pair = ?address, count, "pair created");
        Ok(address)
    }

    /// Undo a creation made by an operation that later failed
    ///
    /// Only valid while the host still serializes that operation, so no
    /// other caller can have used the new pair.
    pub(crate) fn discard_pair(&self, address: Address) {
        if let Some((_, pair)) = self.pairs.remove(&address) {
            self.pairs_by_tokens.remove(&(pair.token0(), pair.token1()));
            self.pairs_by_tokens.remove(&(pair.token1(), pair.token0()));
            self.all_pairs.write().retain(|created| *created != address);
            warn!(pair = ?address, "pair creation reverted");
        }
    }

    /// Address of the pair for two tokens, in either order
    pub fn get_pair(&self, token_a: Address, token_b: Address) -> Option<Address> {
        self.pairs_by_tokens
            .get(&(token_a, token_b))
            .map(|entry| *entry.value())
    }

    /// Pair engine at `address`
    pub fn pair(&self, address: Address) -> Option<Arc<Pair>> {
        self.pairs
            .get(&address)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Pair engine for two tokens, in either order
    pub fn pair_for_tokens(&self, token_a: Address, token_b: Address) -> Option<Arc<Pair>> {
        self.get_pair(token_a, token_b)
            .and_then(|address| self.pair(address))
    }

    /// Address of the `index`-th pair created
    pub fn all_pairs(&self, index: usize) -> Option<Address> {
        self.all_pairs.read().get(index).copied()
    }

    pub fn all_pairs_length(&self) -> usize {
        self.all_pairs.read().len()
    }

    pub fn fee_to(&self) -> Option<Address> {
        self.protocol_fee.fee_to()
    }

    pub fn fee_to_setter(&self) -> Address {
        self.protocol_fee.fee_to_setter()
    }

    /// Turn the protocol fee on (`Some`) or off (`None`)
    pub fn set_fee_to(&self, caller: Address, fee_to: Option<Address>) -> Result<()> {
        if caller != self.protocol_fee.fee_to_setter() {
            return Err(AmmError::Forbidden);
        }
        *self.protocol_fee.fee_to.write() = fee_to;
        info!(?fee_to, "protocol fee recipient changed");
        Ok(())
    }

    pub fn set_fee_to_setter(&self, caller: Address, fee_to_setter: Address) -> Result<()> {
        let mut setter = self.protocol_fee.fee_to_setter.write();
        if caller != *setter {
            return Err(AmmError::Forbidden);
        }
        *setter = fee_to_setter;
        info!(?fee_to_setter, "protocol fee setter changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory_ledger::MemoryLedger;

    fn factory() -> PairFactory {
        PairFactory::new(
            Address::repeat_byte(0xfa),
            Address::repeat_byte(0x5e),
            Arc::new(MemoryLedger::new(Address::repeat_byte(0xee))),
            Arc::new(ManualClock::new(1)),
        )
    }

    #[test]
    fn test_create_pair_records_both_orders() {
        let factory = factory();
        let a = Address::from_low_u64_be(0x2000);
        let b = Address::from_low_u64_be(0x1000);

        let pair = factory.create_pair(a, b).unwrap();
        assert_eq!(factory.get_pair(a, b), Some(pair));
        assert_eq!(factory.get_pair(b, a), Some(pair));
        assert_eq!(factory.all_pairs(0), Some(pair));
        assert_eq!(factory.all_pairs_length(), 1);
        assert_eq!(pair, pair_for(factory.address(), a, b).unwrap());

        let engine = factory.pair(pair).unwrap();
        assert_eq!(engine.token0(), b);
        assert_eq!(engine.token1(), a);
        assert_eq!(engine.factory(), factory.address());
    }

    #[test]
    fn test_create_pair_rejects_invalid_tokens() {
        let factory = factory();
        let a = Address::from_low_u64_be(1);
        assert_eq!(factory.create_pair(a, a), Err(AmmError::IdenticalTokens));
        assert_eq!(
            factory.create_pair(a, Address::zero()),
            Err(AmmError::ZeroAddress)
        );
        assert_eq!(factory.all_pairs_length(), 0);
    }

    #[test]
    fn test_discard_pair_allows_recreation() {
        let factory = factory();
        let a = Address::from_low_u64_be(1);
        let b = Address::from_low_u64_be(2);

        let pair = factory.create_pair(a, b).unwrap();
        factory.discard_pair(pair);
        assert_eq!(factory.get_pair(a, b), None);
        assert_eq!(factory.get_pair(b, a), None);
        assert_eq!(factory.all_pairs_length(), 0);

        assert_eq!(factory.create_pair(b, a).unwrap(), pair);
    }

    #[test]
    fn test_fee_switch_requires_setter() {
        let factory = factory();
        let setter = Address::repeat_byte(0x5e);
        let other = Address::repeat_byte(0x01);

        assert_eq!(factory.set_fee_to(other, Some(other)), Err(AmmError::Forbidden));
        factory.set_fee_to(setter, Some(other)).unwrap();
        assert_eq!(factory.fee_to(), Some(other));

        assert_eq!(
            factory.set_fee_to_setter(other, other),
            Err(AmmError::Forbidden)
        );
        factory.set_fee_to_setter(setter, other).unwrap();
        assert_eq!(factory.fee_to_setter(), other);
        assert_eq!(factory.set_fee_to(setter, None), Err(AmmError::Forbidden));
        factory.set_fee_to(other, None).unwrap();
        assert_eq!(factory.fee_to(), None);
    }
}
