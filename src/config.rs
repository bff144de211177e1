//! # Compiler Configuration
//!
//! Settings that change how statements are compiled. Values are layered:
//! built-in defaults, then an optional config file, then environment
//! variables prefixed with `VOLUNTEER_SEARCH_` (for example
//! `VOLUNTEER_SEARCH_STRICT_JOINS=true`).
//!
//! ```rust,no_run
//! use volunteer_search::config::CompilerConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CompilerConfig::load()?;
//! println!("strict joins: {}", config.strict_joins);
//! # Ok(())
//! # }
//! ```

use crate::error::{QueryError, Result};
use crate::query_builder::predicate::TypeHint;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "VOLUNTEER_SEARCH";

/// Config file consulted by [`CompilerConfig::load`] when present
pub const DEFAULT_CONFIG_FILE: &str = "config/volunteer_search.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Fail on joins whose dependencies never appear instead of emitting them
    pub strict_joins: bool,
    /// Accept raw SQL strings among join entries
    pub allow_raw_joins: bool,
    /// Type hint for leaves that do not name one
    pub default_type_hint: TypeHint,
    /// First placeholder index
    pub param_offset: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            strict_joins: false,
            allow_raw_joins: true,
            default_type_hint: TypeHint::String,
            param_offset: 0,
        }
    }
}

impl CompilerConfig {
    /// Load from the default file (if it exists) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load from `path` (required when given) and the environment
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path.to_path_buf()).required(true),
            None => File::from(PathBuf::from(DEFAULT_CONFIG_FILE)).required(false),
        };

        let config: CompilerConfig = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        debug!(
            strict_joins = config.strict_joins,
            allow_raw_joins = config.allow_raw_joins,
            default_type_hint = %config.default_type_hint,
            param_offset = config.param_offset,
            "compiler configuration loaded"
        );
        Ok(config)
    }

    /// Defaults overridden by environment variables only, no file lookup
    pub fn from_env() -> Result<Self> {
        let config: CompilerConfig = Config::builder()
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let TypeHint::Other(name) = &self.default_type_hint {
            if name.is_empty() {
                return Err(QueryError::Configuration(
                    "default_type_hint must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
