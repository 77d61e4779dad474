//! Access control patterns and utilities
//!
//! Contracts pass their own `contracterror` value so a failed check
//! surfaces as that contract's error code.

use super::storage::Storage;
use soroban_sdk::{Address, Env};

/// Access control helper functions
pub struct AccessControl;

impl AccessControl {
    /// Require that the caller is the stored admin
    ///
    /// # Arguments
    /// * `e` - The environment
    /// * `caller` - The caller address
    /// * `not_initialized` - Error returned when no admin is stored
    /// * `unauthorized` - Error returned when caller is not admin
    pub fn require_admin<E>(
        e: &Env,
        caller: &Address,
        not_initialized: E,
        unauthorized: E,
    ) -> Result<(), E> {
        caller.require_auth();
        let admin = Storage::get_admin(e).ok_or(not_initialized)?;
        if *caller != admin {
            return Err(unauthorized);
        }
        Ok(())
    }

    /// Require that the caller is the owner
    ///
    /// # Arguments
    /// * `caller` - The caller address
    /// * `owner` - The owner address
    /// * `err` - Error returned when caller != owner
    pub fn require_owner<E>(caller: &Address, owner: &Address, err: E) -> Result<(), E> {
        caller.require_auth();
        if *caller != *owner {
            return Err(err);
        }
        Ok(())
    }
}
