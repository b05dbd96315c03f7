//! AMM Configuration Module
//!
//! Loads the deployment and logging settings of an AMM instance from a TOML
//! file, an optional environment-specific overlay and `AMM_` prefixed
//! environment variables, in increasing order of precedence.
//!
//! Nested keys are addressed with a double underscore, e.g.
//! `AMM_DEPLOYMENT__FEE_TO=0x...` or `AMM_LOGGING__LEVEL=debug`.

use crate::defaults;
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use ethereum_types::Address;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Main AMM configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
pub struct AmmConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Identities of the deployed components
    pub deployment: DeploymentConfig,
}

/// Logging settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `torq_amm=debug,warn`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::logging::LEVEL.to_string(),
        }
    }
}

/// Addresses of the factory, router, wrapped native token and fee admin
///
/// Stored as hex strings so the file stays readable; use the accessor
/// methods to obtain parsed addresses.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DeploymentConfig {
    pub factory: String,
    pub router: String,
    pub wrapped_native: String,
    pub fee_to_setter: String,

    /// Protocol fee recipient; the fee is off when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_to: Option<String>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            factory: defaults::deployment::FACTORY.to_string(),
            router: defaults::deployment::ROUTER.to_string(),
            wrapped_native: defaults::deployment::WRAPPED_NATIVE.to_string(),
            fee_to_setter: defaults::deployment::FEE_TO_SETTER.to_string(),
            fee_to: None,
        }
    }
}

impl DeploymentConfig {
    pub fn factory_address(&self) -> Result<Address> {
        parse_address(&self.factory).context("Invalid factory address")
    }

    pub fn router_address(&self) -> Result<Address> {
        parse_address(&self.router).context("Invalid router address")
    }

    pub fn wrapped_native_address(&self) -> Result<Address> {
        parse_address(&self.wrapped_native).context("Invalid wrapped native address")
    }

    pub fn fee_to_setter_address(&self) -> Result<Address> {
        parse_address(&self.fee_to_setter).context("Invalid fee_to_setter address")
    }

    pub fn fee_to_address(&self) -> Result<Option<Address>> {
        self.fee_to
            .as_deref()
            .map(|fee_to| parse_address(fee_to).context("Invalid fee_to address"))
            .transpose()
    }

    /// Parse every address, failing on the first malformed one
    pub fn validate(&self) -> Result<()> {
        self.factory_address()?;
        self.router_address()?;
        let wrapped_native = self.wrapped_native_address()?;
        if wrapped_native.is_zero() {
            bail!("Wrapped native token cannot be the zero address");
        }
        self.fee_to_setter_address()?;
        self.fee_to_address()?;
        Ok(())
    }
}

impl AmmConfig {
    /// Load configuration from files with environment overrides
    ///
    /// `environment` selects `environments/<name>.toml` next to the base
    /// file; a missing overlay is logged and skipped.
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        Self::load_with_prefix(base_path, environment, defaults::loading::ENV_PREFIX)
    }

    /// [`AmmConfig::load`] with a custom environment variable prefix
    pub fn load_with_prefix(
        base_path: Option<&Path>,
        environment: Option<&str>,
        env_prefix: &str,
    ) -> Result<Self> {
        let base = base_path.unwrap_or(Path::new(defaults::loading::CONFIG_PATH));

        let mut builder = Config::builder().add_source(File::from(base).required(true));

        if let Some(env) = environment {
            let env_file = base
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(PathBuf::new)
                .join(defaults::loading::ENVIRONMENTS_DIR)
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__"),
        );

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.deployment.validate()?;
        Ok(config)
    }

    /// Write the configuration as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration to {:?}", path))
    }
}

/// Convenience function to load configuration from the default path
pub fn load_config(environment: Option<&str>) -> Result<AmmConfig> {
    AmmConfig::load(None, environment)
}

/// Parse a `0x`-prefixed (or bare) 40 digit hex address
pub fn parse_address(value: &str) -> Result<Address> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(digits).with_context(|| format!("Not a hex string: {}", value))?;
    if bytes.len() != Address::len_bytes() {
        bail!(
            "Expected {} bytes, got {} in {}",
            Address::len_bytes(),
            bytes.len(),
            value
        );
    }
    Ok(Address::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const BASE: &str = r#"
[logging]
level = "debug"

[deployment]
factory = "0x00000000000000000000000000000000000000fa"
router = "0x0000000000000000000000000000000000000070"
wrapped_native = "0x00000000000000000000000000000000000000ee"
fee_to_setter = "0x000000000000000000000000000000000000005e"
"#;

    #[test]
    fn test_load_base_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("amm.toml");
        fs::write(&config_path, BASE).unwrap();

        let config = AmmConfig::load(Some(&config_path), None).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.deployment.factory_address().unwrap(),
            Address::from_low_u64_be(0xfa)
        );
        assert_eq!(
            config.deployment.wrapped_native_address().unwrap(),
            Address::from_low_u64_be(0xee)
        );
        assert_eq!(config.deployment.fee_to_address().unwrap(), None);
    }

    #[test]
    fn test_environment_overlay() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("amm.toml");
        fs::write(&config_path, BASE).unwrap();
        fs::create_dir(dir.path().join("environments")).unwrap();
        fs::write(
            dir.path().join("environments").join("staging.toml"),
            r#"
[deployment]
fee_to = "0x0000000000000000000000000000000000000fee"
"#,
        )
        .unwrap();

        let config = AmmConfig::load(Some(&config_path), Some("staging")).unwrap();
        assert_eq!(
            config.deployment.fee_to_address().unwrap(),
            Some(Address::from_low_u64_be(0xfee))
        );
        // untouched keys keep the base value
        assert_eq!(config.logging.level, "debug");

        // unknown environment falls back to the base file
        let config = AmmConfig::load(Some(&config_path), Some("missing")).unwrap();
        assert_eq!(config.deployment.fee_to, None);
    }

    #[test]
    fn test_environment_variable_override() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("amm.toml");
        fs::write(&config_path, BASE).unwrap();

        // private prefix keeps concurrently running loads unaffected
        std::env::set_var("AMMTEST_LOGGING__LEVEL", "trace");
        std::env::set_var(
            "AMMTEST_DEPLOYMENT__FEE_TO",
            "0x0000000000000000000000000000000000000fee",
        );
        let config = AmmConfig::load_with_prefix(Some(&config_path), None, "AMMTEST");
        std::env::remove_var("AMMTEST_LOGGING__LEVEL");
        std::env::remove_var("AMMTEST_DEPLOYMENT__FEE_TO");

        let config = config.unwrap();
        assert_eq!(config.logging.level, "trace");
        assert_eq!(
            config.deployment.fee_to_address().unwrap(),
            Some(Address::from_low_u64_be(0xfee))
        );
    }

    #[test]
    fn test_invalid_address_rejected() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("amm.toml");
        let broken = BASE.replace("0x00000000000000000000000000000000000000fa", "0xzz");
        fs::write(&config_path, broken).unwrap();

        assert!(AmmConfig::load(Some(&config_path), None).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("amm.toml");
        let mut config = AmmConfig::default();
        config.deployment.fee_to = Some(defaults::deployment::FEE_TO_SETTER.to_string());

        config.save(&config_path).unwrap();
        assert_eq!(AmmConfig::load(Some(&config_path), None).unwrap(), config);
    }

    #[test]
    fn test_parse_address() {
        let expected = Address::from_low_u64_be(0xabc);
        assert_eq!(
            parse_address("0x0000000000000000000000000000000000000abc").unwrap(),
            expected
        );
        assert_eq!(
            parse_address("0000000000000000000000000000000000000abc").unwrap(),
            expected
        );
        assert!(parse_address("0x0abc").is_err());
        assert!(parse_address("0xnothex").is_err());
    }
}
