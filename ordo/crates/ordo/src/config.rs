//! Configuration Module - Raw Layer Tuning Parameters
//!
//! Manages the few knobs the raw layer exposes: debug validation, the weak-CAS
//! spin bound, the per-allocation ceiling and the trusted-caller list.

/// Default number of weak CAS attempts made by spin helpers
pub const DEFAULT_WEAK_CAS_SPIN_LIMIT: u32 = 64;

/// Main configuration for the raw layer
///
/// # Examples
///
/// ```rust
/// use ordo::OrdoConfig;
///
/// let config = OrdoConfig {
///     debug_checks: true,
///     max_allocation_bytes: 1 << 20,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct OrdoConfig {
    /// Validate locations and buffer lifetimes in `CheckedAccessor`
    ///
    /// Has no effect on the unchecked accessor, which never validates.
    /// Default: on in debug builds, off in release builds
    pub debug_checks: bool,

    /// Number of weak CAS attempts before a spin helper gives up
    ///
    /// Default: 64
    pub weak_cas_spin_limit: u32,

    /// Largest single allocation (bytes) the accessor will forward to the system
    ///
    /// Requests above this fail with `OutOfResource` without calling `malloc`.
    /// Default: `isize::MAX`
    pub max_allocation_bytes: usize,

    /// Caller names trusted in addition to the bootstrap and platform domains
    ///
    /// Default: empty
    pub trusted_callers: Vec<String>,

    /// Echo raw-layer events to the console
    ///
    /// Default: false
    pub verbose: bool,

    /// Record buffer statistics
    ///
    /// Default: true
    pub stats_enabled: bool,
}

impl Default for OrdoConfig {
    fn default() -> Self {
        OrdoConfig {
            debug_checks: cfg!(debug_assertions),
            weak_cas_spin_limit: DEFAULT_WEAK_CAS_SPIN_LIMIT,
            max_allocation_bytes: isize::MAX as usize,
            trusted_callers: Vec::new(),
            verbose: false,
            stats_enabled: true,
        }
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL_CONFIG: OrdoConfig = OrdoConfig::from_env();
}

impl OrdoConfig {
    /// Process-wide configuration, read from the environment on first use
    pub fn global() -> &'static OrdoConfig {
        &GLOBAL_CONFIG
    }

    /// Validate configuration
    ///
    /// ```rust
    /// use ordo::OrdoConfig;
    ///
    /// let config = OrdoConfig {
    ///     weak_cas_spin_limit: 0,
    ///     ..Default::default()
    /// };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.weak_cas_spin_limit == 0 {
            return Err(ConfigError::InvalidSpinLimit(
                "weak_cas_spin_limit must be > 0".to_string(),
            ));
        }

        if self.max_allocation_bytes == 0 {
            return Err(ConfigError::InvalidAllocationLimit(
                "max_allocation_bytes must be > 0".to_string(),
            ));
        }

        if self.max_allocation_bytes > isize::MAX as usize {
            return Err(ConfigError::InvalidAllocationLimit(
                "max_allocation_bytes must not exceed isize::MAX".to_string(),
            ));
        }

        if let Some(name) = self.trusted_callers.iter().find(|n| n.trim().is_empty()) {
            return Err(ConfigError::InvalidTrustedCaller(format!(
                "empty caller name {:?} in trusted_callers",
                name
            )));
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - ORDO_DEBUG_CHECKS
    /// - ORDO_WEAK_CAS_SPIN_LIMIT
    /// - ORDO_MAX_ALLOCATION
    /// - ORDO_TRUSTED_CALLERS (comma-separated)
    /// - ORDO_VERBOSE
    ///
    /// ```bash
    /// export ORDO_DEBUG_CHECKS=1
    /// export ORDO_TRUSTED_CALLERS=queue-core,skiplist
    /// ```
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ORDO_DEBUG_CHECKS") {
            config.debug_checks = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("ORDO_WEAK_CAS_SPIN_LIMIT") {
            if let Ok(limit) = val.parse::<u32>() {
                config.weak_cas_spin_limit = limit;
            }
        }

        if let Ok(val) = std::env::var("ORDO_MAX_ALLOCATION") {
            if let Ok(bytes) = val.parse::<usize>() {
                config.max_allocation_bytes = bytes;
            }
        }

        if let Ok(val) = std::env::var("ORDO_TRUSTED_CALLERS") {
            config.trusted_callers = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if let Ok(val) = std::env::var("ORDO_VERBOSE") {
            config.verbose = parse_flag(&val);
        }

        config
    }
}

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid spin limit: {0}")]
    InvalidSpinLimit(String),

    #[error("Invalid allocation limit: {0}")]
    InvalidAllocationLimit(String),

    #[error("Invalid trusted caller: {0}")]
    InvalidTrustedCaller(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrdoConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.weak_cas_spin_limit, DEFAULT_WEAK_CAS_SPIN_LIMIT);
        assert!(config.trusted_callers.is_empty());
    }

    #[test]
    fn test_invalid_allocation_limit() {
        let config = OrdoConfig {
            max_allocation_bytes: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAllocationLimit(_))
        ));
    }

    #[test]
    fn test_blank_trusted_caller_rejected() {
        let config = OrdoConfig {
            trusted_callers: vec!["queue".to_string(), "  ".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTrustedCaller(_))
        ));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("yes"));
    }
}
