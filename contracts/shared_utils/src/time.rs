//! Time utilities

use soroban_sdk::Env;

/// Time utility functions for working with ledger timestamps
pub struct TimeUtils;

impl TimeUtils {
    /// Get the current ledger timestamp
    pub fn now(e: &Env) -> u64 {
        e.ledger().timestamp()
    }
}
