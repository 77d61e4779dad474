//! Client for the collection contracts the marketplace creates and trades.
//!
//! Declared as an interface rather than a crate dependency so the
//! marketplace wasm does not link the collection's exported functions.

use soroban_sdk::{contractclient, Address, Env, String, Vec};

#[allow(dead_code)]
#[contractclient(name = "CollectionClient")]
pub trait CollectionInterface {
    fn creator(env: Env) -> Address;

    fn initialize(env: Env, owner: Address, name: String, symbol: String);

    fn mint(env: Env, to: Address, uri: String) -> u32;

    fn owner_of(env: Env, token_id: u32) -> Address;

    fn token_uri(env: Env, token_id: u32) -> String;

    fn tokens_of(env: Env, owner: Address) -> Vec<u32>;

    fn get_approved(env: Env, token_id: u32) -> Option<Address>;

    fn is_approved_for_all(env: Env, owner: Address, operator: Address) -> bool;

    fn transfer_from(env: Env, spender: Address, from: Address, to: Address, token_id: u32);
}
