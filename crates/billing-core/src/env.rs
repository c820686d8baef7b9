//! Environment variable helpers shared by the config loaders.

use crate::error::{BillingError, BillingResult};
use std::env;

/// Read a variable, falling back to `default` when unset.
pub fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a boolean variable, falling back to `default` when unset.
///
/// Accepts the same spellings as Go's `strconv.ParseBool`, which is what the
/// deployment manifests were written against.
pub fn bool_var(key: &str, default: bool) -> BillingResult<bool> {
    match env::var(key) {
        Ok(raw) => parse_bool(&raw).ok_or_else(|| {
            BillingError::Configuration(format!("{} must be a boolean, got {:?}", key, raw))
        }),
        Err(_) => Ok(default),
    }
}

/// Parse a boolean flag value.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        for raw in ["1", "t", "T", "true", "TRUE", "True"] {
            assert_eq!(parse_bool(raw), Some(true), "{}", raw);
        }
        for raw in ["0", "f", "F", "false", "FALSE", "False"] {
            assert_eq!(parse_bool(raw), Some(false), "{}", raw);
        }
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_bool_var() {
        env::set_var("BILLING_CORE_TEST_FLAG", "nope");
        assert!(bool_var("BILLING_CORE_TEST_FLAG", false).is_err());

        env::set_var("BILLING_CORE_TEST_FLAG", "true");
        assert!(bool_var("BILLING_CORE_TEST_FLAG", false).unwrap());

        env::remove_var("BILLING_CORE_TEST_FLAG");
        assert!(bool_var("BILLING_CORE_TEST_FLAG", true).unwrap());
        assert_eq!(var_or("BILLING_CORE_TEST_FLAG", "fallback"), "fallback");
    }
}
