//! Cache generation naming.
//!
//! A generation is one logical cache instance. Shipping a new generation name
//! is how previously cached bytes get released: at activation every other
//! generation is destroyed.

use crate::cache::traits::StoreError;

/// Generation name used when none is configured.
pub const DEFAULT_GENERATION: &str = "tile-cache-v1";

/// Longest accepted generation name.
pub const MAX_GENERATION_NAME_LEN: usize = 64;

/// Check that `name` is usable as a generation name.
///
/// Names double as directory names for the disk backend, so they are limited
/// to ASCII alphanumerics, `.`, `_` and `-`, must not start with `.`, and
/// must be at most [`MAX_GENERATION_NAME_LEN`] bytes.
pub fn validate_generation_name(name: &str) -> Result<(), StoreError> {
    let invalid = |reason: &str| StoreError::InvalidGeneration {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_GENERATION_NAME_LEN {
        return Err(invalid("name is too long"));
    }
    if name.starts_with('.') {
        return Err(invalid("name must not start with '.'"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(invalid("only ASCII letters, digits, '.', '_' and '-' are allowed"));
    }
    Ok(())
}

/// Generations in `existing` that are not `active`, in their original order.
pub fn stale_generations<'a>(existing: &'a [String], active: &str) -> Vec<&'a str> {
    existing
        .iter()
        .map(String::as_str)
        .filter(|name| *name != active)
        .collect()
}
