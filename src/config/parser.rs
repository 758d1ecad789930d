use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Reads, parses and validates a harvest config
///
/// ```no_run
/// use std::path::Path;
/// use irbis_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Seeds: {:?}", config.crawler.start_urls);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&raw)?;
    validate(&config)?;
    Ok(config)
}

/// Hex SHA-256 of the raw config file, stored on each run row
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let raw = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&raw)))
}

/// [`load_config`] plus [`compute_config_hash`] for the same file
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
