#![no_std]
use shared_utils::{Events, Storage, Validation};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, Address, Env, String, Vec,
};


// ============================================================================
// Error Types
// ============================================================================

/// Contract errors for structured error handling
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum CollectionError {
    /// Contract has not been initialized
    NotInitialized = 1,
    /// Contract has already been initialized
    AlreadyInitialized = 2,
    /// Token with the given token_id does not exist
    TokenNotFound = 3,
    /// Caller is not the collection owner
    Unauthorized = 4,
    /// `from` is not the owner of the token
    NotOwner = 5,
    /// Caller is neither the token owner, the approved address nor an operator
    NotOwnerOrApproved = 6,
    /// Collection name is empty
    EmptyName = 7,
    /// Collection symbol is empty
    EmptySymbol = 8,
    /// Approving the current owner is meaningless
    ApprovalToCurrentOwner = 9,
    /// Token counter or supply overflow
    MathOverflow = 10,
}

// ============================================================================
// Data Types
// ============================================================================

/// Public view of a single token
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenInfo {
    pub token_id: u32,
    pub owner: Address,
    pub uri: String,
}

/// Storage keys for the contract
#[contracttype]
pub enum DataKey {
    /// Address that deployed the collection, fixed at construction
    Creator,
    /// Collection name
    Name,
    /// Collection symbol
    Symbol,
    /// Counter for generating token IDs, also the number of tokens ever minted
    TokenCounter,
    /// Tokens currently in existence
    TotalSupply,
    /// Owner mapping (token_id -> Address)
    Owner(u32),
    /// Metadata URI (token_id -> String)
    TokenUri(u32),
    /// Single approved spender (token_id -> Address)
    Approved(u32),
    /// Token count per holder
    Balance(Address),
    /// Token ids per holder
    OwnedTokens(Address),
    /// Operator approval (owner, operator) -> bool
    Operator(Address, Address),
}

// ============================================================================
// Storage Module
// ============================================================================

mod storage {
    use super::*;

    // --- Collection info ---

    pub fn set_creator(e: &Env, creator: &Address) {
        e.storage().instance().set(&DataKey::Creator, creator);
    }

    pub fn get_creator(e: &Env) -> Option<Address> {
        e.storage().instance().get(&DataKey::Creator)
    }

    pub fn set_name(e: &Env, name: &String) {
        e.storage().instance().set(&DataKey::Name, name);
    }

    pub fn get_name(e: &Env) -> Option<String> {
        e.storage().instance().get(&DataKey::Name)
    }

    pub fn set_symbol(e: &Env, symbol: &String) {
        e.storage().instance().set(&DataKey::Symbol, symbol);
    }

    pub fn get_symbol(e: &Env) -> Option<String> {
        e.storage().instance().get(&DataKey::Symbol)
    }

    // --- Counters ---

    pub fn increment_token_counter(e: &Env) -> Option<u32> {
        let new_count = get_token_counter(e).checked_add(1)?;
        e.storage()
            .instance()
            .set(&DataKey::TokenCounter, &new_count);
        Some(new_count)
    }

    pub fn get_token_counter(e: &Env) -> u32 {
        e.storage()
            .instance()
            .get(&DataKey::TokenCounter)
            .unwrap_or(0)
    }

    pub fn get_total_supply(e: &Env) -> u32 {
        e.storage()
            .instance()
            .get(&DataKey::TotalSupply)
            .unwrap_or(0)
    }

    pub fn set_total_supply(e: &Env, supply: u32) {
        e.storage().instance().set(&DataKey::TotalSupply, &supply);
    }

    // --- Ownership ---

    pub fn set_owner(e: &Env, token_id: u32, owner: &Address) {
        e.storage()
            .persistent()
            .set(&DataKey::Owner(token_id), owner);
    }

    pub fn get_owner(e: &Env, token_id: u32) -> Option<Address> {
        e.storage().persistent().get(&DataKey::Owner(token_id))
    }

    pub fn remove_owner(e: &Env, token_id: u32) {
        e.storage().persistent().remove(&DataKey::Owner(token_id));
    }

    // --- Token URI ---

    pub fn set_token_uri(e: &Env, token_id: u32, uri: &String) {
        e.storage()
            .persistent()
            .set(&DataKey::TokenUri(token_id), uri);
    }

    pub fn get_token_uri(e: &Env, token_id: u32) -> Option<String> {
        e.storage().persistent().get(&DataKey::TokenUri(token_id))
    }

    pub fn remove_token_uri(e: &Env, token_id: u32) {
        e.storage().persistent().remove(&DataKey::TokenUri(token_id));
    }

    // --- Approvals ---

    pub fn set_approved(e: &Env, token_id: u32, approved: &Address) {
        e.storage()
            .persistent()
            .set(&DataKey::Approved(token_id), approved);
    }

    pub fn get_approved(e: &Env, token_id: u32) -> Option<Address> {
        e.storage().persistent().get(&DataKey::Approved(token_id))
    }

    pub fn clear_approved(e: &Env, token_id: u32) {
        e.storage().persistent().remove(&DataKey::Approved(token_id));
    }

    pub fn set_operator(e: &Env, owner: &Address, operator: &Address, approved: bool) {
        let key = DataKey::Operator(owner.clone(), operator.clone());
        if approved {
            e.storage().persistent().set(&key, &true);
        } else {
            e.storage().persistent().remove(&key);
        }
    }

    pub fn is_operator(e: &Env, owner: &Address, operator: &Address) -> bool {
        e.storage()
            .persistent()
            .get(&DataKey::Operator(owner.clone(), operator.clone()))
            .unwrap_or(false)
    }

    // --- Holder index ---

    pub fn get_balance(e: &Env, owner: &Address) -> u32 {
        e.storage()
            .persistent()
            .get(&DataKey::Balance(owner.clone()))
            .unwrap_or(0)
    }

    pub fn get_owned_tokens(e: &Env, owner: &Address) -> Vec<u32> {
        e.storage()
            .persistent()
            .get(&DataKey::OwnedTokens(owner.clone()))
            .unwrap_or(Vec::new(e))
    }

    pub fn add_owned_token(e: &Env, owner: &Address, token_id: u32) {
        let mut tokens = get_owned_tokens(e, owner);
        tokens.push_back(token_id);
        e.storage()
            .persistent()
            .set(&DataKey::OwnedTokens(owner.clone()), &tokens);
        e.storage()
            .persistent()
            .set(&DataKey::Balance(owner.clone()), &tokens.len());
    }

    pub fn remove_owned_token(e: &Env, owner: &Address, token_id: u32) {
        let mut tokens = get_owned_tokens(e, owner);
        if let Some(index) = tokens.iter().position(|id| id == token_id) {
            tokens.remove(index as u32);
        }
        e.storage()
            .persistent()
            .set(&DataKey::OwnedTokens(owner.clone()), &tokens);
        e.storage()
            .persistent()
            .set(&DataKey::Balance(owner.clone()), &tokens.len());
    }
}

// ============================================================================
// Contract Implementation
// ============================================================================

#[contract]
pub struct NftCollectionContract;

#[contractimpl]
impl NftCollectionContract {
    // ========================================================================
    // Initialization
    // ========================================================================

    /// Record the creator at deployment. Only the creator can authorize
    /// `initialize`, so nobody else can claim the collection afterwards.
    pub fn __constructor(e: Env, creator: Address) {
        storage::set_creator(&e, &creator);
    }

    /// Initialize the collection
    ///
    /// # Arguments
    /// * `owner` - The collection owner, the only address allowed to mint.
    ///   When created through the marketplace this is the marketplace itself.
    /// * `name` - Collection name
    /// * `symbol` - Collection symbol
    ///
    /// Requires the creator's auth, and the owner's when they differ.
    ///
    /// # Errors
    /// * `AlreadyInitialized` - If the contract has already been initialized
    /// * `EmptyName` / `EmptySymbol` - If either string is empty
    pub fn initialize(
        e: Env,
        owner: Address,
        name: String,
        symbol: String,
    ) -> Result<(), CollectionError> {
        if Storage::is_initialized(&e) {
            return Err(CollectionError::AlreadyInitialized);
        }
        let creator = storage::get_creator(&e).ok_or(CollectionError::NotInitialized)?;
        creator.require_auth();
        if owner != creator {
            owner.require_auth();
        }

        Validation::require_non_empty_string(&name, CollectionError::EmptyName)?;
        Validation::require_non_empty_string(&symbol, CollectionError::EmptySymbol)?;

        Storage::set_initialized(&e);
        Storage::set_admin(&e, &owner);
        storage::set_name(&e, &name);
        storage::set_symbol(&e, &symbol);
        e.storage().instance().set(&DataKey::TokenCounter, &0u32);
        storage::set_total_supply(&e, 0);

        Events::emit_with_topics(&e, (symbol_short!("init"), owner), (name, symbol));

        Ok(())
    }

    /// Address the collection was deployed for
    pub fn creator(e: Env) -> Result<Address, CollectionError> {
        storage::get_creator(&e).ok_or(CollectionError::NotInitialized)
    }

    pub fn name(e: Env) -> Result<String, CollectionError> {
        storage::get_name(&e).ok_or(CollectionError::NotInitialized)
    }

    pub fn symbol(e: Env) -> Result<String, CollectionError> {
        storage::get_symbol(&e).ok_or(CollectionError::NotInitialized)
    }

    /// Get the collection owner (minter)
    pub fn owner(e: Env) -> Result<Address, CollectionError> {
        Storage::get_admin(&e).ok_or(CollectionError::NotInitialized)
    }

    /// Hand the collection (and minting rights) to a new owner
    pub fn transfer_ownership(e: Env, new_owner: Address) -> Result<(), CollectionError> {
        let owner = Storage::get_admin(&e).ok_or(CollectionError::NotInitialized)?;
        owner.require_auth();

        Storage::set_admin(&e, &new_owner);

        Events::emit_with_topics(&e, (symbol_short!("own_xfer"), owner), new_owner);

        Ok(())
    }

    // ========================================================================
    // Minting / Burning
    // ========================================================================

    /// Mint a new token to `to` with metadata `uri`
    ///
    /// Only the collection owner may mint. Token ids start at 1.
    ///
    /// # Returns
    /// The token_id of the newly minted token
    pub fn mint(e: Env, to: Address, uri: String) -> Result<u32, CollectionError> {
        let owner = Storage::get_admin(&e).ok_or(CollectionError::NotInitialized)?;
        owner.require_auth();

        let token_id =
            storage::increment_token_counter(&e).ok_or(CollectionError::MathOverflow)?;
        let supply = storage::get_total_supply(&e)
            .checked_add(1)
            .ok_or(CollectionError::MathOverflow)?;

        storage::set_owner(&e, token_id, &to);
        storage::set_token_uri(&e, token_id, &uri);
        storage::add_owned_token(&e, &to, token_id);
        storage::set_total_supply(&e, supply);

        Events::emit_with_topics(&e, (symbol_short!("mint"), to), (token_id, uri));

        Ok(token_id)
    }

    /// Destroy a token
    ///
    /// # Errors
    /// * `TokenNotFound` - If the token does not exist
    /// * `NotOwnerOrApproved` - If `caller` may not move the token
    pub fn burn(e: Env, caller: Address, token_id: u32) -> Result<(), CollectionError> {
        caller.require_auth();

        let owner = storage::get_owner(&e, token_id).ok_or(CollectionError::TokenNotFound)?;
        if !Self::can_move(&e, &caller, &owner, token_id) {
            return Err(CollectionError::NotOwnerOrApproved);
        }

        storage::clear_approved(&e, token_id);
        storage::remove_owner(&e, token_id);
        storage::remove_token_uri(&e, token_id);
        storage::remove_owned_token(&e, &owner, token_id);
        storage::set_total_supply(&e, storage::get_total_supply(&e).saturating_sub(1));

        Events::emit_with_topics(&e, (symbol_short!("burn"), owner), token_id);

        Ok(())
    }

    // ========================================================================
    // Query Functions
    // ========================================================================

    pub fn owner_of(e: Env, token_id: u32) -> Result<Address, CollectionError> {
        storage::get_owner(&e, token_id).ok_or(CollectionError::TokenNotFound)
    }

    pub fn token_uri(e: Env, token_id: u32) -> Result<String, CollectionError> {
        storage::get_token_uri(&e, token_id).ok_or(CollectionError::TokenNotFound)
    }

    pub fn token_info(e: Env, token_id: u32) -> Result<TokenInfo, CollectionError> {
        let owner = storage::get_owner(&e, token_id).ok_or(CollectionError::TokenNotFound)?;
        let uri = storage::get_token_uri(&e, token_id).ok_or(CollectionError::TokenNotFound)?;
        Ok(TokenInfo {
            token_id,
            owner,
            uri,
        })
    }

    pub fn exists(e: Env, token_id: u32) -> bool {
        storage::get_owner(&e, token_id).is_some()
    }

    /// Number of tokens ever minted (burned tokens included)
    pub fn nft_count(e: Env) -> u32 {
        storage::get_token_counter(&e)
    }

    /// Number of tokens currently in existence
    pub fn total_supply(e: Env) -> u32 {
        storage::get_total_supply(&e)
    }

    pub fn balance_of(e: Env, owner: Address) -> u32 {
        storage::get_balance(&e, &owner)
    }

    pub fn tokens_of(e: Env, owner: Address) -> Vec<u32> {
        storage::get_owned_tokens(&e, &owner)
    }

    // ========================================================================
    // Approvals
    // ========================================================================

    /// Allow `approved` to move `token_id`. Replaces any previous approval.
    ///
    /// `approver` must be the token owner or one of the owner's operators.
    pub fn approve(
        e: Env,
        approver: Address,
        approved: Address,
        token_id: u32,
    ) -> Result<(), CollectionError> {
        approver.require_auth();

        let owner = storage::get_owner(&e, token_id).ok_or(CollectionError::TokenNotFound)?;
        if approved == owner {
            return Err(CollectionError::ApprovalToCurrentOwner);
        }
        if approver != owner && !storage::is_operator(&e, &owner, &approver) {
            return Err(CollectionError::NotOwnerOrApproved);
        }

        storage::set_approved(&e, token_id, &approved);

        Events::emit_with_topics(
            &e,
            (symbol_short!("approve"), owner, approved),
            token_id,
        );

        Ok(())
    }

    /// Clear the single approval on `token_id`
    pub fn revoke_approval(e: Env, approver: Address, token_id: u32) -> Result<(), CollectionError> {
        approver.require_auth();

        let owner = storage::get_owner(&e, token_id).ok_or(CollectionError::TokenNotFound)?;
        if approver != owner && !storage::is_operator(&e, &owner, &approver) {
            return Err(CollectionError::NotOwnerOrApproved);
        }

        storage::clear_approved(&e, token_id);

        Events::emit_with_topics(&e, (symbol_short!("revoke"), owner), token_id);

        Ok(())
    }

    pub fn get_approved(e: Env, token_id: u32) -> Result<Option<Address>, CollectionError> {
        if storage::get_owner(&e, token_id).is_none() {
            return Err(CollectionError::TokenNotFound);
        }
        Ok(storage::get_approved(&e, token_id))
    }

    /// Grant or revoke `operator` rights over every token held by `owner`
    pub fn set_approval_for_all(e: Env, owner: Address, operator: Address, approved: bool) {
        owner.require_auth();

        storage::set_operator(&e, &owner, &operator, approved);

        Events::emit_with_topics(
            &e,
            (symbol_short!("appr_all"), owner),
            (operator, approved),
        );
    }

    pub fn is_approved_for_all(e: Env, owner: Address, operator: Address) -> bool {
        storage::is_operator(&e, &owner, &operator)
    }

    // ========================================================================
    // Transfers
    // ========================================================================

    /// Transfer a token held by `from`
    ///
    /// # Errors
    /// * `TokenNotFound` - If the token does not exist
    /// * `NotOwner` - If `from` does not own the token
    pub fn transfer(e: Env, from: Address, to: Address, token_id: u32) -> Result<(), CollectionError> {
        from.require_auth();

        let owner = storage::get_owner(&e, token_id).ok_or(CollectionError::TokenNotFound)?;
        if owner != from {
            return Err(CollectionError::NotOwner);
        }

        Self::move_token(&e, &from, &to, token_id);
        Ok(())
    }

    /// Transfer a token on behalf of its owner
    ///
    /// `spender` must be the owner, the approved address or an operator.
    pub fn transfer_from(
        e: Env,
        spender: Address,
        from: Address,
        to: Address,
        token_id: u32,
    ) -> Result<(), CollectionError> {
        spender.require_auth();

        let owner = storage::get_owner(&e, token_id).ok_or(CollectionError::TokenNotFound)?;
        if owner != from {
            return Err(CollectionError::NotOwner);
        }
        if !Self::can_move(&e, &spender, &owner, token_id) {
            return Err(CollectionError::NotOwnerOrApproved);
        }

        Self::move_token(&e, &from, &to, token_id);
        Ok(())
    }
}

impl NftCollectionContract {
    fn can_move(e: &Env, spender: &Address, owner: &Address, token_id: u32) -> bool {
        if spender == owner || storage::is_operator(e, owner, spender) {
            return true;
        }
        matches!(storage::get_approved(e, token_id), Some(approved) if approved == *spender)
    }

    fn move_token(e: &Env, from: &Address, to: &Address, token_id: u32) {
        storage::clear_approved(e, token_id);
        storage::remove_owned_token(e, from, token_id);
        storage::add_owned_token(e, to, token_id);
        storage::set_owner(e, token_id, to);

        Events::emit_transfer(e, from, to, token_id);
    }
}
