//! Environment-driven runtime settings.
//!
//! ## `SPECGUARD_STACK_SIZE`
//!
//! Stack size in bytes for handler coroutines, decimal (`32768`) or hex
//! (`0x8000`). Default `0x4000` (16 KB). Memory cost is per concurrent
//! coroutine, so size for the deepest handler, not the biggest machine.

use std::env;

/// Settings read once at startup.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Coroutine stack size in bytes
    pub stack_size: usize,
}

const DEFAULT_STACK_SIZE: usize = 0x4000;

impl RuntimeConfig {
    /// Read settings from the environment, falling back to defaults on
    /// unset or unparseable values.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = match env::var("SPECGUARD_STACK_SIZE") {
            Ok(val) => {
                if let Some(hex) = val.strip_prefix("0x") {
                    usize::from_str_radix(hex, 16).unwrap_or(DEFAULT_STACK_SIZE)
                } else {
                    val.parse().unwrap_or(DEFAULT_STACK_SIZE)
                }
            }
            Err(_) => DEFAULT_STACK_SIZE,
        };
        RuntimeConfig { stack_size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env mutation is process-global; exercise the parsing branches in one
    // test to avoid interleaving.
    #[test]
    fn test_stack_size_parsing() {
        env::remove_var("SPECGUARD_STACK_SIZE");
        assert_eq!(RuntimeConfig::from_env().stack_size, DEFAULT_STACK_SIZE);

        env::set_var("SPECGUARD_STACK_SIZE", "0x8000");
        assert_eq!(RuntimeConfig::from_env().stack_size, 0x8000);

        env::set_var("SPECGUARD_STACK_SIZE", "32768");
        assert_eq!(RuntimeConfig::from_env().stack_size, 32768);

        env::set_var("SPECGUARD_STACK_SIZE", "not a number");
        assert_eq!(RuntimeConfig::from_env().stack_size, DEFAULT_STACK_SIZE);

        env::remove_var("SPECGUARD_STACK_SIZE");
    }
}
