use std::str::FromStr;

use anyhow::{Context, Result};

/// Load an environment variable and parse it to the given type
///
/// # Errors
///
/// Returns an error if the environment variable is not set or is not a valid value for the given type
pub fn load_env_var<T: FromStr>(var_name: &str) -> Result<T> {
    let var = std::env::var(var_name).context(format!("{} is not set", var_name))?;
    parse_env_value(var_name, &var)
}

/// Load an optional environment variable, falling back to `default` when it is not set
///
/// # Errors
///
/// Returns an error if the variable is set but cannot be parsed
pub fn load_env_var_or<T: FromStr>(var_name: &str, default: T) -> Result<T> {
    match std::env::var(var_name) {
        Ok(var) if !var.trim().is_empty() => parse_env_value(var_name, &var),
        _ => Ok(default),
    }
}

/// Load a comma separated environment variable. An unset variable yields an empty list.
pub fn load_env_list<T: FromStr>(var_name: &str) -> Result<Vec<T>> {
    let Ok(var) = std::env::var(var_name) else {
        return Ok(vec![]);
    };

    var.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| parse_env_value(var_name, item))
        .collect()
}

fn parse_env_value<T: FromStr>(var_name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| anyhow::anyhow!("{} is not a valid {}", var_name, value))
}
