//! Validation utilities for common input validation patterns
//!
//! Each guard takes the error the calling contract wants to surface.

use soroban_sdk::String;

/// Validation utility functions
pub struct Validation;

impl Validation {
    /// Validate that an amount is greater than zero
    pub fn require_positive<E>(amount: i128, err: E) -> Result<(), E> {
        if amount <= 0 {
            return Err(err);
        }
        Ok(())
    }

    /// Validate that a string is not empty
    pub fn require_non_empty_string<E>(value: &String, err: E) -> Result<(), E> {
        if value.is_empty() {
            return Err(err);
        }
        Ok(())
    }

    /// Validate that a value does not exceed `max`
    pub fn require_max_u32<E>(value: u32, max: u32, err: E) -> Result<(), E> {
        if value > max {
            return Err(err);
        }
        Ok(())
    }
}
