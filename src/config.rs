//! Study configuration
//!
//! Values come from a TOML file, the environment, or both (environment
//! wins). Everything has a default, so an empty file is a valid config.
//!
//! ```toml
//! block_size = 10
//! default_condition = "control"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::record::Condition;
use crate::{Error, Result};

/// Trials handed out per start or extend call when not configured.
pub const DEFAULT_BLOCK_SIZE: usize = 10;

/// Environment variable overriding [`StudyConfig::block_size`].
pub const BLOCK_SIZE_ENV: &str = "STUDY_TRIALS_PER_PARTICIPANT";

/// Environment variable overriding [`StudyConfig::default_condition`].
pub const DEFAULT_CONDITION_ENV: &str = "STUDY_DEFAULT_CONDITION";

/// Study configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Number of trials per block, for both start and extend.
    pub block_size: usize,
    /// Condition assigned when a start request names none.
    pub default_condition: Condition,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            default_condition: Condition::Control,
        }
    }
}

impl StudyConfig {
    /// Set the block size.
    #[must_use]
    pub const fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the default condition.
    #[must_use]
    pub const fn with_default_condition(mut self, condition: Condition) -> Self {
        self.default_condition = condition;
        self
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the TOML is malformed or fails validation.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, [`Error::Config`] if
    /// it or an override is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)?.with_overrides(|key| std::env::var(key).ok())
    }

    /// Defaults plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an override is invalid.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a value does not parse or the result
    /// fails validation.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(BLOCK_SIZE_ENV) {
            self.block_size = raw
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("{BLOCK_SIZE_ENV}='{raw}': {e}")))?;
        }
        if let Some(raw) = lookup(DEFAULT_CONDITION_ENV) {
            self.default_condition = raw
                .parse()
                .map_err(|e| Error::Config(format!("{DEFAULT_CONDITION_ENV}: {e}")))?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `block_size` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::Config("block_size must be at least 1".to_string()));
        }
        Ok(())
    }
}
