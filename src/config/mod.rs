//! Configuration module for Shop-Scraper
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use shop_scraper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scraper.toml")).unwrap();
//! println!("Retrying each page up to {} times", config.scraper.max_attempts);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{AssetsConfig, Config, OutputConfig, OutputFormat, ScraperConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, hash_content, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
