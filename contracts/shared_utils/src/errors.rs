//! Error logging helpers
//!
//! Contracts return their own `contracterror` values; these helpers only
//! attach a diagnostic log line before the error is propagated.

use soroban_sdk::{log, Env};

/// Error helper functions
pub struct ErrorHelper;

impl ErrorHelper {
    /// Log an error message
    pub fn log_error(e: &Env, message: &str) {
        log!(e, "Error: {}", message);
    }

    /// Log an error with context
    ///
    /// # Arguments
    /// * `e` - The environment
    /// * `context` - The operation that failed
    /// * `message` - The error message
    pub fn log_error_with_context(e: &Env, context: &str, message: &str) {
        log!(e, "Error [{}]: {}", context, message);
    }

    /// Log `message` under `context` and return `Err(err)`
    ///
    /// Intended for early returns:
    /// `return ErrorHelper::fail(&e, "buy_nft", "not for sale", Error::NotForSale);`
    pub fn fail<T, E>(e: &Env, context: &str, message: &str, err: E) -> Result<T, E> {
        Self::log_error_with_context(e, context, message);
        Err(err)
    }
}
