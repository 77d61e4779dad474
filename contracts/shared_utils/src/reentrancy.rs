//! Reentrancy guard kept in instance storage
//!
//! Entry points that call out to other contracts set the flag on entry and
//! clear it on every exit path.

use soroban_sdk::{symbol_short, Env, Symbol};

const GUARD: Symbol = symbol_short!("REENTRY");

pub struct ReentrancyGuard;

impl ReentrancyGuard {
    /// Set the guard. Returns `false` if it was already set.
    pub fn enter(e: &Env) -> bool {
        let locked: bool = e.storage().instance().get(&GUARD).unwrap_or(false);
        if locked {
            return false;
        }
        e.storage().instance().set(&GUARD, &true);
        true
    }

    /// Clear the guard
    pub fn exit(e: &Env) {
        e.storage().instance().set(&GUARD, &false);
    }
}
