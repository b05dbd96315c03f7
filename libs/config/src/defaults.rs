//! AMM configuration defaults
//!
//! Default values and constants used when a setting is absent from the
//! configuration file.

/// Configuration loading
pub mod loading {
    /// Base configuration file, relative to the working directory
    pub const CONFIG_PATH: &str = "config/amm.toml";

    /// Directory holding `<environment>.toml` overlays, next to the base file
    pub const ENVIRONMENTS_DIR: &str = "environments";

    /// Prefix of environment variable overrides (`AMM_LOGGING__LEVEL`)
    pub const ENV_PREFIX: &str = "AMM";
}

/// Logging defaults
pub mod logging {
    /// Filter used when neither the config nor `RUST_LOG` sets one
    pub const LEVEL: &str = "info";
}

/// Local development deployment
pub mod deployment {
    /// Zero address constant for unset identities
    pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

    pub const FACTORY: &str = "0x00000000000000000000000000000000000000fa";
    pub const ROUTER: &str = "0x0000000000000000000000000000000000000070";
    pub const WRAPPED_NATIVE: &str = "0x00000000000000000000000000000000000000ee";
    pub const FEE_TO_SETTER: &str = "0x000000000000000000000000000000000000005e";
}
