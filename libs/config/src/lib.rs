//! # Torq AMM Configuration
//!
//! Configuration loading, defaults and logging setup for AMM deployments.
//!
//! ## Features
//!
//! - **AMM Configuration**: deployment identities and logging level loaded
//!   from TOML with environment overlays and `AMM_` variable overrides
//! - **Defaults**: development deployment addresses and loading paths
//! - **Logging**: `tracing-subscriber` initialisation with `EnvFilter`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use torq_config::{init_logging, AmmConfig};
//!
//! let config = AmmConfig::load(None, Some("staging"))?;
//! init_logging(&config.logging.level)?;
//! let factory = config.deployment.factory_address()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod amm_config;
pub mod defaults;
pub mod logging;

// Re-export commonly used types
pub use amm_config::{load_config, parse_address, AmmConfig, DeploymentConfig, LoggingConfig};
pub use logging::init_logging;
