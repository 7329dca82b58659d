//! Environment variable utilities
//!
//! Every runtime knob can be overridden through a `COT_*` variable.
//!
//! ```ignore
//! use cothread_core::env::{env_get, env_get_bool};
//!
//! let stack: usize = env_get("COT_STACK_SIZE", 1 << 20);
//! let debug = env_get_bool("COT_DEBUG", false);
//! ```

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default
///
/// Unset and unparseable values both fall back to `default`.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as boolean
///
/// "1", "true", "yes", "on" (any case) are true, "0", "false", "no",
/// "off" are false, anything else keeps the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Get environment variable as optional value
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_get_default() {
        let val: usize = env_get("__COT_TEST_UNSET__", 42);
        assert_eq!(val, 42);
        let val: Option<u64> = env_get_opt("__COT_TEST_UNSET__");
        assert!(val.is_none());
    }

    #[test]
    fn test_env_get_parses_trimmed() {
        std::env::set_var("__COT_TEST_NUM__", " 65536 ");
        let val: usize = env_get("__COT_TEST_NUM__", 0);
        assert_eq!(val, 65536);
        std::env::remove_var("__COT_TEST_NUM__");
    }

    #[test]
    fn test_env_get_invalid_falls_back() {
        std::env::set_var("__COT_TEST_BAD__", "lots");
        let val: usize = env_get("__COT_TEST_BAD__", 7);
        assert_eq!(val, 7);
        std::env::remove_var("__COT_TEST_BAD__");
    }

    #[test]
    fn test_env_get_bool() {
        std::env::set_var("__COT_TEST_BOOL__", "On");
        assert!(env_get_bool("__COT_TEST_BOOL__", false));

        std::env::set_var("__COT_TEST_BOOL__", "0");
        assert!(!env_get_bool("__COT_TEST_BOOL__", true));

        std::env::set_var("__COT_TEST_BOOL__", "maybe");
        assert!(env_get_bool("__COT_TEST_BOOL__", true));
        assert!(!env_get_bool("__COT_TEST_BOOL__", false));

        std::env::remove_var("__COT_TEST_BOOL__");
        assert!(env_get_bool("__COT_TEST_BOOL__", true));
    }
}
