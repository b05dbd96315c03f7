//! Shared fixture for the AMM integration tests
#![allow(dead_code)]

use std::sync::Arc;
use torq_amm::{
    Address, ManualClock, MemoryLedger, Pair, PairFactory, Router, TokenLedger, U256,
};

pub const START: u64 = 1_700_000_000;

pub fn addr(value: u64) -> Address {
    Address::from_low_u64_be(value)
}

/// `value * 10^18`
pub fn e18(value: u64) -> U256 {
    U256::from(value) * U256::exp10(18)
}

pub fn dec(value: &str) -> U256 {
    U256::from_dec_str(value).unwrap()
}

pub fn token_a() -> Address {
    addr(0x1000)
}

pub fn token_b() -> Address {
    addr(0x2000)
}

pub fn wrapped_native() -> Address {
    addr(0x3000)
}

pub fn wallet() -> Address {
    addr(0xa11ce)
}

pub fn other() -> Address {
    addr(0xb0b)
}

pub fn fee_to_setter() -> Address {
    addr(0x5e7)
}

pub fn factory_address() -> Address {
    addr(0xfac)
}

pub fn router_address() -> Address {
    addr(0x707)
}

/// Factory, router, ledger and clock wired together
pub struct TestEnv {
    pub ledger: Arc<MemoryLedger>,
    pub clock: Arc<ManualClock>,
    pub factory: Arc<PairFactory>,
    pub router: Router,
}

impl TestEnv {
    pub fn new() -> Self {
        let ledger = Arc::new(MemoryLedger::new(wrapped_native()));
        let clock = Arc::new(ManualClock::new(START));
        let factory = Arc::new(PairFactory::new(
            factory_address(),
            fee_to_setter(),
            ledger.clone(),
            clock.clone(),
        ));
        let router = Router::new(
            router_address(),
            factory.clone(),
            ledger.clone(),
            clock.clone(),
        );
        Self {
            ledger,
            clock,
            factory,
            router,
        }
    }

    /// Create the `token_a`/`token_b` pair and return its engine
    pub fn pair(&self) -> Arc<Pair> {
        let address = self.factory.create_pair(token_a(), token_b()).unwrap();
        self.factory.pair(address).unwrap()
    }

    pub fn fund(&self, token: Address, holder: Address, amount: U256) {
        self.ledger.mint(token, holder, amount).unwrap();
    }

    pub fn fund_native(&self, holder: Address, amount: U256) {
        self.ledger.deposit_native(holder, amount).unwrap();
    }

    pub fn balance(&self, token: Address, holder: Address) -> U256 {
        self.ledger.balance_of(token, holder)
    }

    /// Unlimited router allowance for `owner` on each token
    pub fn approve_router(&self, owner: Address, tokens: &[Address]) {
        for token in tokens {
            self.ledger
                .approve(*token, owner, router_address(), U256::MAX)
                .unwrap();
        }
    }

    /// Deposit directly into the pair from `wallet()` and mint to it
    pub fn add_liquidity(&self, pair: &Pair, amount0: U256, amount1: U256) -> U256 {
        self.fund(pair.token0(), wallet(), amount0);
        self.fund(pair.token1(), wallet(), amount1);
        self.ledger
            .transfer(pair.token0(), wallet(), pair.address(), amount0)
            .unwrap();
        self.ledger
            .transfer(pair.token1(), wallet(), pair.address(), amount1)
            .unwrap();
        pair.mint(wallet()).unwrap()
    }

    /// Balances the pair holds in both tokens
    pub fn pair_balances(&self, pair: &Pair) -> (U256, U256) {
        (
            self.balance(pair.token0(), pair.address()),
            self.balance(pair.token1(), pair.address()),
        )
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Reserves as wide integers
pub fn reserves(pair: &Pair) -> (U256, U256) {
    let (reserve0, reserve1, _) = pair.get_reserves();
    (U256::from(reserve0), U256::from(reserve1))
}
