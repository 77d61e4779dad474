//! Event emission patterns and utilities

use soroban_sdk::{symbol_short, Address, Env, IntoVal, Symbol, Topics, Val};

/// Event emission helper functions
pub struct Events;

impl Events {
    /// Emit a simple event with topic and data
    pub fn emit<T>(e: &Env, topic: Symbol, data: T)
    where
        T: IntoVal<Env, Val>,
    {
        e.events().publish((topic,), data);
    }

    /// Emit an event with multiple topics
    pub fn emit_with_topics<T, U>(e: &Env, topics: T, data: U)
    where
        T: Topics,
        U: IntoVal<Env, Val>,
    {
        e.events().publish(topics, data);
    }

    /// Emit a token transfer event
    ///
    /// * topics - `["transfer", from, to]`
    /// * data - `(token_id, timestamp)`
    pub fn emit_transfer(e: &Env, from: &Address, to: &Address, token_id: u32) {
        Self::emit_with_topics(
            e,
            (symbol_short!("transfer"), from.clone(), to.clone()),
            (token_id, e.ledger().timestamp()),
        );
    }
}
