//! Process configuration, read from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::anyhow;
use log::LevelFilter;

pub const DATABASE_PATH_VAR: &str = "SPLITLEDGER_DB";
pub const LOG_DIR_VAR: &str = "SPLITLEDGER_LOG_DIR";
pub const LOG_LEVEL_VAR: &str = "SPLITLEDGER_LOG_LEVEL";

const DEFAULT_DATABASE_PATH: &str = "splitledger.db";

/// Use this as database path to keep everything in memory.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub database_path: String,
    /// When set, logs go to a rolling file in this directory instead of stderr.
    pub log_dir: Option<PathBuf>,
    pub log_level: LevelFilter,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration using *lookup* to read each variable.
    ///
    /// Empty values count as missing.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> anyhow::Result<Config> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_path = get(DATABASE_PATH_VAR).unwrap_or_else(|| DEFAULT_DATABASE_PATH.into());
        let log_dir = get(LOG_DIR_VAR).map(PathBuf::from);
        let log_level = match get(LOG_LEVEL_VAR) {
            Some(level) => LevelFilter::from_str(level.trim())
                .map_err(|_| anyhow!("invalid value `{level}` for {LOG_LEVEL_VAR}"))?,
            None => LevelFilter::Info,
        };

        Ok(Config {
            database_path,
            log_dir,
            log_level,
        })
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == IN_MEMORY_DATABASE
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() -> anyhow::Result<()> {
        let config = Config::from_lookup(lookup_from(&[]))?;
        assert_eq!(config.database_path, "splitledger.db");
        assert_eq!(config.log_dir, None);
        assert_eq!(config.log_level, LevelFilter::Info);
        assert!(!config.is_in_memory());
        Ok(())
    }

    #[test]
    fn test_overrides() -> anyhow::Result<()> {
        let config = Config::from_lookup(lookup_from(&[
            (DATABASE_PATH_VAR, ":memory:"),
            (LOG_DIR_VAR, "/tmp/logs"),
            (LOG_LEVEL_VAR, "Debug"),
        ]))?;
        assert!(config.is_in_memory());
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(config.log_level, LevelFilter::Debug);
        Ok(())
    }

    #[test]
    fn test_empty_values_are_ignored() -> anyhow::Result<()> {
        let config = Config::from_lookup(lookup_from(&[(DATABASE_PATH_VAR, " "), (LOG_DIR_VAR, "")]))?;
        assert_eq!(config.database_path, "splitledger.db");
        assert_eq!(config.log_dir, None);
        Ok(())
    }

    #[test]
    fn test_invalid_log_level() {
        let result = Config::from_lookup(lookup_from(&[(LOG_LEVEL_VAR, "loud")]));
        assert!(result.is_err());
    }
}
