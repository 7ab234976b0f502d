//! Parsing of `Name[option=value,...]` config values.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{DatacenterError, Result};

/// Splits config value into the name and the options string.
/// Example: `Consolidation[underload=0.3]` gives name `Consolidation` and options `underload=0.3`.
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    match config_str.trim().split_once('[') {
        Some((l, r)) => (l.trim().to_string(), Some(r.replace(']', ""))),
        None => (config_str.trim().to_string(), None),
    }
}

/// Parses options string into a map of option names and values.
pub fn parse_options(options_str: &str) -> HashMap<String, String> {
    let mut options = HashMap::new();
    for option_str in options_str.split(',') {
        if let Some((name, value)) = option_str.split_once('=') {
            options.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    options
}

/// Reads typed option value, falling back to `default` if the option is absent.
pub fn option_or<T: FromStr>(options: &HashMap<String, String>, name: &str, default: T, config: &str) -> Result<T> {
    match options.get(name) {
        Some(value) => value.parse().map_err(|_| DatacenterError::InvalidOption {
            config: config.to_string(),
            option: format!("{}={}", name, value),
        }),
        None => Ok(default),
    }
}
