//! Default/override merging for settings tables.
//!
//! Every builder owns a table of defaults and receives a table of user
//! overrides. [`resolve`] merges the two one level deep: a key present in the
//! overrides replaces the default value wholesale, even when that value is
//! itself a table. Validation is left to the builders.

use serde::de::DeserializeOwned;
use toml::{Table, Value};

use crate::core::errors::EstimationResult;

/// Merge `overrides` on top of `defaults`.
///
/// Keys absent from `overrides` keep their default. Nested tables are not
/// merged key-by-key.
///
/// # Examples
///
/// ```
/// use epi_rt::config::resolver::resolve;
///
/// let defaults: toml::Table = toml::from_str("a = { x = 1, y = 2 }\nb = 3").unwrap();
/// let overrides: toml::Table = toml::from_str("a = { x = 9 }").unwrap();
///
/// let merged = resolve(&defaults, &overrides);
/// assert_eq!(merged["a"].as_table().unwrap().len(), 1);
/// assert_eq!(merged["b"].as_integer(), Some(3));
/// ```
pub fn resolve(defaults: &Table, overrides: &Table) -> Table {
    let mut merged = defaults.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Merge and deserialize into a typed configuration.
///
/// Deserialization errors carry the path of the offending key.
pub fn resolve_into<T: DeserializeOwned>(defaults: &Table, overrides: &Table) -> EstimationResult<T> {
    let merged = resolve(defaults, overrides);
    let typed = serde_path_to_error::deserialize(Value::Table(merged))?;
    Ok(typed)
}
