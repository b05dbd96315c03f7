//! Factory and router wiring from a loaded [`AmmConfig`]

use crate::clock::Clock;
use crate::factory::PairFactory;
use crate::ledger::{NativeLedger, TokenLedger};
use crate::router::Router;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use torq_config::AmmConfig;
use tracing::info;

/// A factory and the router in front of it, sharing one ledger and clock
#[derive(Debug, Clone)]
pub struct Deployment {
    pub factory: Arc<PairFactory>,
    pub router: Arc<Router>,
}

impl Deployment {
    /// Build the deployment described by `config` on top of `ledger`
    ///
    /// The ledger's wrapped native token must match the configured one.
    /// A configured `fee_to` switches the protocol fee on immediately.
    pub fn from_config<L>(
        config: &AmmConfig,
        ledger: Arc<L>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self>
    where
        L: NativeLedger + 'static,
    {
        let settings = &config.deployment;
        settings.validate()?;

        let wrapped_native = settings.wrapped_native_address()?;
        if ledger.wrapped_native() != wrapped_native {
            bail!(
                "Ledger wraps native value at {:?}, configuration expects {:?}",
                ledger.wrapped_native(),
                wrapped_native
            );
        }

        let fee_to_setter = settings.fee_to_setter_address()?;
        let token_ledger: Arc<dyn TokenLedger> = ledger.clone();
        let factory = Arc::new(PairFactory::new(
            settings.factory_address()?,
            fee_to_setter,
            token_ledger,
            Arc::clone(&clock),
        ));

        if let Some(fee_to) = settings.fee_to_address()? {
            factory
                .set_fee_to(fee_to_setter, Some(fee_to))
                .context("Failed to enable protocol fee")?;
        }

        let router = Arc::new(Router::new(
            settings.router_address()?,
            Arc::clone(&factory),
            ledger,
            clock,
        ));

        info!(
            factory = ?factory.address(),
            router = ?router.address(),
            ?wrapped_native,
            fee_to = ?factory.fee_to(),
            "AMM deployment ready"
        );
        Ok(Self { factory, router })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory_ledger::MemoryLedger;
    use ethereum_types::Address;
    use torq_config::parse_address;

    #[test]
    fn test_from_default_config() {
        let config = AmmConfig::default();
        let wrapped = config.deployment.wrapped_native_address().unwrap();
        let ledger = Arc::new(MemoryLedger::new(wrapped));

        let deployment =
            Deployment::from_config(&config, ledger, Arc::new(ManualClock::new(1))).unwrap();
        assert_eq!(
            deployment.factory.address(),
            config.deployment.factory_address().unwrap()
        );
        assert_eq!(deployment.router.wrapped_native(), wrapped);
        assert_eq!(deployment.factory.fee_to(), None);
    }

    #[test]
    fn test_fee_to_enabled_from_config() {
        let mut config = AmmConfig::default();
        config.deployment.fee_to = Some("0x0000000000000000000000000000000000000fee".to_string());
        let wrapped = config.deployment.wrapped_native_address().unwrap();

        let deployment = Deployment::from_config(
            &config,
            Arc::new(MemoryLedger::new(wrapped)),
            Arc::new(ManualClock::new(1)),
        )
        .unwrap();
        assert_eq!(
            deployment.factory.fee_to(),
            Some(parse_address("0x0000000000000000000000000000000000000fee").unwrap())
        );
    }

    #[test]
    fn test_mismatched_wrapped_native_rejected() {
        let config = AmmConfig::default();
        let ledger = Arc::new(MemoryLedger::new(Address::repeat_byte(0x42)));
        assert!(Deployment::from_config(&config, ledger, Arc::new(ManualClock::new(1))).is_err());
    }
}
