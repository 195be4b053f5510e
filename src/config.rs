//! Configuration Module
//!
//! This module reads decode limits from environment variables, provides
//! sensible defaults, and validates the maximum input size.

use anyhow::Result;
use std::env;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Cap on compressed input: a buffered zip, or a `.gz`/`.zip` file on disk.
    pub max_file_size: usize,
    /// Cap on the XML document itself: plain input, gzip output, zip entry.
    pub max_decompressed_size: usize,
    pub max_files_in_zip: usize,
    pub max_compression_ratio: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_file_size: 10 * 1024 * 1024,
            max_decompressed_size: 100 * 1024 * 1024,
            max_files_in_zip: 1000,
            max_compression_ratio: 1000.0,
        }
    }
}

impl Config {
    /// Creates a configuration from environment variables.
    /// If a variable is missing or unparsable, the default value is used.
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let max_file_size = env_or("DMARC_MAX_FILE_SIZE", defaults.max_file_size);
        if max_file_size > 500_000_000 {
            return Err(anyhow::anyhow!("Max file size too large (500MB limit)"));
        }

        Ok(Config {
            max_file_size,
            max_decompressed_size: env_or("DMARC_MAX_DECOMPRESSED_SIZE", defaults.max_decompressed_size),
            max_files_in_zip: env_or("DMARC_MAX_FILES_IN_ZIP", defaults.max_files_in_zip),
            max_compression_ratio: env_or("DMARC_MAX_COMPRESSION_RATIO", defaults.max_compression_ratio),
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
