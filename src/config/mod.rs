//! Configuration management for parex
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. the embedded `default-config.toml`
//! 2. `~/.config/parex/config.{toml,json,yaml,yml}`
//! 3. `./parex.{toml,json,yaml,yml}`
//! 4. `PAREX_` environment variables, `__` separating sections
//!
//! A custom file given with `--config` replaces layers 2 and 3. Command-line
//! flags are applied on top by the CLI.

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::input::{NEWLINE, NUL};
use crate::parallel::{PoolOptions, default_concurrency};


// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

const ENV_PREFIX: &str = "PAREX_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParexConfig {
    pub pool: PoolConfig,
    pub logging: LoggingConfig,
}

/// Worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolConfig {
    /// Concurrent commands, 0 for one per logical core
    pub jobs: usize,
    /// NUL-delimited input
    pub null: bool,
    /// Queue capacity as a multiple of `jobs`
    pub queue_factor: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Base `tracing` filter directive
    pub level: String,
}

impl ParexConfig {
    pub fn load_with_custom_config(custom_config: Option<&str>) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));

        if let Some(custom_path) = custom_config {
            if !std::path::Path::new(custom_path).is_file() {
                bail!("Config file not found: {custom_path}");
            }
            figment = match custom_path.rsplit_once('.').map(|(_, ext)| ext) {
                Some("json") => figment.merge(Json::file(custom_path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(custom_path)),
                _ => figment.merge(Toml::file(custom_path)),
            };
        } else {
            let user_dir = Self::user_config_dir();
            figment = figment
                .merge(Toml::file(user_dir.join("config.toml")))
                .merge(Json::file(user_dir.join("config.json")))
                .merge(Yaml::file(user_dir.join("config.yaml")))
                .merge(Yaml::file(user_dir.join("config.yml")))
                .merge(Toml::file("parex.toml"))
                .merge(Json::file("parex.json"))
                .merge(Yaml::file("parex.yaml"))
                .merge(Yaml::file("parex.yml"));
        }

        // Environment variables always have highest priority
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: ParexConfig = figment
            .extract()
            .context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool.queue_factor == 0 {
            bail!("pool.queue_factor must be at least 1");
        }
        Ok(())
    }

    /// Job count with `0` resolved to the number of logical cores
    pub fn jobs(&self) -> usize {
        match self.pool.jobs {
            0 => default_concurrency(),
            jobs => jobs,
        }
    }

    pub fn delimiter(&self) -> u8 {
        if self.pool.null { NUL } else { NEWLINE }
    }

    /// Pool options for `jobs` workers, which may override the configured count
    pub fn pool_options(&self, jobs: Option<usize>) -> PoolOptions {
        let concurrency = jobs.unwrap_or_else(|| self.jobs());
        PoolOptions::new(concurrency)
            .with_delimiter(self.delimiter())
            .with_queue_capacity(concurrency.saturating_mul(self.pool.queue_factor))
    }

    fn user_config_dir() -> PathBuf {
        match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(".config").join("parex"),
            None => PathBuf::from("~/.config/parex"),
        }
    }
}

impl Default for ParexConfig {
    fn default() -> Self {
        Figment::new()
            .merge(Toml::string(DEFAULT_CONFIG))
            .extract()
            .unwrap_or_else(|_| ParexConfig {
                pool: PoolConfig {
                    jobs: 0,
                    null: false,
                    queue_factor: 1,
                },
                logging: LoggingConfig {
                    level: "warn".to_string(),
                },
            })
    }
}
