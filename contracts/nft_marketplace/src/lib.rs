#![no_std]

use shared_utils::{
    AccessControl, ErrorHelper, Events, ReentrancyGuard, SafeMath, Storage, TimeUtils, Validation,
    MAX_BPS,
};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, token, Address, Env, String,
    Vec,
};

mod collection;
mod storage;

pub use collection::CollectionClient;


// ============================================================================
// Error Types
// ============================================================================

/// Marketplace errors
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum MarketplaceError {
    /// Marketplace not initialized
    NotInitialized = 1,
    /// Already initialized
    AlreadyInitialized = 2,
    /// Caller is not the marketplace admin
    Unauthorized = 3,
    /// Fee above 10_000 basis points
    InvalidFee = 4,
    /// Collection name is empty
    CollectionNameEmpty = 5,
    /// Collection symbol is empty
    CollectionSymbolEmpty = 6,
    /// Collection already registered
    CollectionAlreadyExists = 7,
    /// Collection not registered with the marketplace
    CollectionNotFound = 8,
    /// Collection contract refused initialization
    CollectionInitFailed = 9,
    /// Only the collection creator can mint
    NotCollectionOwner = 10,
    /// NFT not minted through the marketplace, or burned
    NftNotFound = 11,
    /// Caller does not own the NFT
    NotNftOwner = 12,
    /// Price or offer amount must be > 0
    InvalidPrice = 13,
    /// NFT is not listed
    NotForSale = 14,
    /// Buyer already owns the NFT
    CannotBuyOwnNft = 15,
    /// Buyer offered zero funds
    ZeroFunds = 16,
    /// Buyer's funds are below the listing price
    InsufficientFunds = 17,
    /// The listing was created by a previous owner
    SellerNoLongerOwner = 18,
    /// Owner has not approved the marketplace to move the NFT
    MarketplaceNotApproved = 19,
    /// Owner cannot make or withdraw offers on their own NFT
    CannotOfferOnOwnNft = 20,
    /// Buyer already has an open offer on this NFT
    OfferExists = 21,
    /// Offer not found
    OfferNotFound = 22,
    /// No accumulated profit
    NoProfitToWithdraw = 23,
    /// Reentrancy detected
    ReentrancyDetected = 24,
    /// Arithmetic overflow
    MathOverflow = 25,
    /// Collection contract was deployed for a different creator
    CollectionCreatorMismatch = 26,
    /// NFT already holds the maximum number of open offers
    TooManyOffers = 27,
    /// Page limit is zero or above `MAX_PAGE_SIZE`
    InvalidPageSize = 28,
}

/// Largest page returned by the NFT list views
pub const MAX_PAGE_SIZE: u32 = 50;

/// Open offers one NFT can hold at a time
pub const MAX_OFFERS_PER_NFT: u32 = 32;

// ============================================================================
// Data Types
// ============================================================================

/// A collection created through the marketplace
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CollectionInfo {
    pub address: Address,
    pub creator: Address,
    pub name: String,
    pub symbol: String,
    pub created_at: u64,
    /// NFTs minted through the marketplace; token ids run 1..=nft_count
    pub nft_count: u32,
}

/// Marketplace record of an NFT minted through it
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NftItem {
    pub collection: Address,
    pub token_id: u32,
    pub owner: Address,
    pub uri: String,
    pub price: i128,
    pub is_for_sale: bool,
}

/// Escrowed offer for an NFT
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Offer {
    pub buyer: Address,
    pub amount: i128,
    pub created_at: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NftKey {
    pub collection: Address,
    pub token_id: u32,
}

/// Indexed NFT lists
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NftList {
    /// Listings placed by their current owner
    ForSale,
    /// NFTs whose record names this owner
    Owner(Address),
}

/// Storage keys
#[contracttype]
pub enum DataKey {
    /// Token used for prices, offers and fees
    PaymentToken,
    /// Marketplace fee (basis points, e.g., 250 = 2.5%)
    FeeBps,
    /// Fees collected and not yet withdrawn
    Profit,
    /// Sum of open offers held by the marketplace
    Escrow,
    /// Number of NFTs minted through the marketplace
    TotalNftCount,
    /// All registered collections
    Collections,
    /// Collection address -> CollectionInfo
    Collection(Address),
    /// Creator -> collections they created
    CreatorCollections(Address),
    /// (collection, token_id) -> NftItem
    Nft(Address, u32),
    /// List -> number of entries
    ListLen(NftList),
    /// (list, position) -> NftKey
    ListItem(NftList, u32),
    /// (list, NftKey) -> position
    ListSlot(NftList, NftKey),
    /// (collection, token_id, buyer) -> Offer
    Offer(Address, u32, Address),
    /// (collection, token_id) -> bidders with an open offer
    Bidders(Address, u32),
}

// ============================================================================
// Contract Implementation
// ============================================================================

#[contract]
pub struct NftMarketplace;

#[contractimpl]
impl NftMarketplace {
    // ========================================================================
    // Initialization / Configuration
    // ========================================================================

    /// Initialize the marketplace
    ///
    /// # Arguments
    /// * `admin` - Admin address, receives withdrawn profit
    /// * `payment_token` - Token contract used for every payment
    /// * `fee_bps` - Marketplace fee in basis points (e.g., 250 = 2.5%)
    pub fn initialize(
        e: Env,
        admin: Address,
        payment_token: Address,
        fee_bps: u32,
    ) -> Result<(), MarketplaceError> {
        if Storage::is_initialized(&e) {
            return Err(MarketplaceError::AlreadyInitialized);
        }

        admin.require_auth();
        Validation::require_max_u32(fee_bps, MAX_BPS, MarketplaceError::InvalidFee)?;

        Storage::set_initialized(&e);
        Storage::set_admin(&e, &admin);
        storage::set_payment_token(&e, &payment_token);
        storage::set_fee_bps(&e, fee_bps);
        storage::set_profit(&e, 0);
        storage::set_escrow(&e, 0);

        Events::emit(&e, symbol_short!("init"), (admin, payment_token, fee_bps));

        Ok(())
    }

    /// Get admin address
    pub fn get_admin(e: Env) -> Result<Address, MarketplaceError> {
        Storage::get_admin(&e).ok_or(MarketplaceError::NotInitialized)
    }

    pub fn get_payment_token(e: Env) -> Result<Address, MarketplaceError> {
        storage::get_payment_token(&e).ok_or(MarketplaceError::NotInitialized)
    }

    pub fn get_fee(e: Env) -> u32 {
        storage::get_fee_bps(&e)
    }

    /// Update marketplace fee (admin only)
    pub fn update_fee(e: Env, fee_bps: u32) -> Result<(), MarketplaceError> {
        let admin = Self::get_admin(e.clone())?;
        admin.require_auth();

        Validation::require_max_u32(fee_bps, MAX_BPS, MarketplaceError::InvalidFee)?;
        storage::set_fee_bps(&e, fee_bps);

        Events::emit(&e, symbol_short!("fee_upd"), fee_bps);

        Ok(())
    }

    /// Hand the admin role to `new_admin` (admin only)
    pub fn transfer_admin(e: Env, new_admin: Address) -> Result<(), MarketplaceError> {
        let admin = Self::get_admin(e.clone())?;
        admin.require_auth();

        Storage::set_admin(&e, &new_admin);

        Events::emit_with_topics(&e, (symbol_short!("admin_set"), admin), new_admin);

        Ok(())
    }

    // ========================================================================
    // Collection Factory
    // ========================================================================

    /// Register a freshly deployed collection contract and initialize it
    /// with the marketplace as its minter
    ///
    /// The collection must have been deployed with `creator` as its
    /// constructor argument.
    ///
    /// # Arguments
    /// * `creator` - The collection creator, the only one allowed to mint
    /// * `collection` - Address of an uninitialized collection contract
    /// * `name` - Collection name
    /// * `symbol` - Collection symbol
    pub fn create_collection(
        e: Env,
        creator: Address,
        collection: Address,
        name: String,
        symbol: String,
    ) -> Result<Address, MarketplaceError> {
        Self::guarded(&e, || {
            Self::payment_token(&e)?;
            creator.require_auth();

            Validation::require_non_empty_string(&name, MarketplaceError::CollectionNameEmpty)?;
            Validation::require_non_empty_string(&symbol, MarketplaceError::CollectionSymbolEmpty)?;

            if storage::has_collection(&e, &collection) {
                return Err(MarketplaceError::CollectionAlreadyExists);
            }

            let client = CollectionClient::new(&e, &collection);
            match client.try_creator() {
                Ok(Ok(deployed_for)) if deployed_for == creator => {}
                _ => {
                    return ErrorHelper::fail(
                        &e,
                        "create_collection",
                        "collection was not deployed for this creator",
                        MarketplaceError::CollectionCreatorMismatch,
                    )
                }
            }
            match client.try_initialize(&e.current_contract_address(), &name, &symbol) {
                Ok(Ok(())) => {}
                _ => {
                    return ErrorHelper::fail(
                        &e,
                        "create_collection",
                        "collection contract refused initialization",
                        MarketplaceError::CollectionInitFailed,
                    )
                }
            }

            let info = CollectionInfo {
                address: collection.clone(),
                creator: creator.clone(),
                name,
                symbol,
                created_at: TimeUtils::now(&e),
                nft_count: 0,
            };
            storage::add_collection(&e, &info);

            Events::emit_with_topics(&e, (symbol_short!("coll_new"), creator), collection.clone());

            Ok(collection)
        })
    }

    pub fn collection_count(e: Env) -> u32 {
        storage::get_collections(&e).len()
    }

    pub fn get_collections(e: Env) -> Vec<Address> {
        storage::get_collections(&e)
    }

    pub fn get_collections_by_creator(e: Env, creator: Address) -> Vec<Address> {
        storage::get_creator_collections(&e, &creator)
    }

    pub fn get_collection(e: Env, collection: Address) -> Result<CollectionInfo, MarketplaceError> {
        storage::get_collection(&e, &collection).ok_or(MarketplaceError::CollectionNotFound)
    }

    pub fn get_owner_of_collection(e: Env, collection: Address) -> Result<Address, MarketplaceError> {
        Ok(Self::get_collection(e, collection)?.creator)
    }

    pub fn is_collection(e: Env, collection: Address) -> bool {
        storage::has_collection(&e, &collection)
    }

    // ========================================================================
    // Minting
    // ========================================================================

    /// Mint an NFT in a marketplace collection
    ///
    /// # Arguments
    /// * `caller` - Must be the collection creator
    /// * `collection` - Registered collection address
    /// * `to` - Recipient of the token
    /// * `uri` - Metadata URI
    ///
    /// # Returns
    /// The new token id
    pub fn mint_nft(
        e: Env,
        caller: Address,
        collection: Address,
        to: Address,
        uri: String,
    ) -> Result<u32, MarketplaceError> {
        Self::guarded(&e, || {
            let mut info = storage::get_collection(&e, &collection)
                .ok_or(MarketplaceError::CollectionNotFound)?;
            AccessControl::require_owner(&caller, &info.creator, MarketplaceError::NotCollectionOwner)?;

            let total = storage::get_total_nft_count(&e)
                .checked_add(1)
                .ok_or(MarketplaceError::MathOverflow)?;
            info.nft_count = info
                .nft_count
                .checked_add(1)
                .ok_or(MarketplaceError::MathOverflow)?;

            let token_id = CollectionClient::new(&e, &collection).mint(&to, &uri);

            let nft = NftItem {
                collection: collection.clone(),
                token_id,
                owner: to.clone(),
                uri,
                price: 0,
                is_for_sale: false,
            };
            storage::set_nft(&e, &nft);
            storage::list_insert(&e, &NftList::Owner(to.clone()), &Self::key_of(&nft));
            storage::set_collection(&e, &info);
            storage::set_total_nft_count(&e, total);

            Events::emit_with_topics(&e, (symbol_short!("nft_mint"), collection), (token_id, to));

            Ok(token_id)
        })
    }

    /// Get an NFT as the collection currently sees it
    ///
    /// The owner is read from the collection. A listing placed by a previous
    /// owner is reported as not for sale.
    pub fn get_nft(e: Env, collection: Address, token_id: u32) -> Result<NftItem, MarketplaceError> {
        let nft = Self::require_nft(&e, &collection, token_id)?;
        Self::live_view(&e, nft).ok_or(MarketplaceError::NftNotFound)
    }

    pub fn total_nft_count(e: Env) -> u32 {
        storage::get_total_nft_count(&e)
    }

    /// Marketplace-minted NFTs held by `owner`
    ///
    /// Pages over the owner index. Tokens the owner received outside the
    /// marketplace show up once `sync_nft` or `sync_owner_nfts` has run;
    /// tokens that left the owner are skipped, so a page may hold fewer
    /// than `limit` entries.
    ///
    /// # Arguments
    /// * `offset` - Position in the owner index to start from
    /// * `limit` - Maximum results to return, 1..=MAX_PAGE_SIZE
    pub fn get_nfts_by_owner(
        e: Env,
        owner: Address,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<NftItem>, MarketplaceError> {
        Self::check_page(limit)?;

        let mut nfts: Vec<NftItem> = Vec::new(&e);
        for key in storage::list_page(&e, &NftList::Owner(owner.clone()), offset, limit).iter() {
            if let Some(nft) = Self::live_item(&e, &key) {
                if nft.owner == owner {
                    nfts.push_back(nft);
                }
            }
        }

        Ok(nfts)
    }

    /// Entries in `owner`'s index, including ones not yet reconciled
    pub fn owner_nft_count(e: Env, owner: Address) -> u32 {
        storage::list_len(&e, &NftList::Owner(owner))
    }

    /// NFTs minted in `collection` through the marketplace, by token id
    ///
    /// Burned tokens are skipped.
    ///
    /// # Arguments
    /// * `offset` - Number of token ids to skip
    /// * `limit` - Maximum results to return, 1..=MAX_PAGE_SIZE
    pub fn get_nfts_in_collection(
        e: Env,
        collection: Address,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<NftItem>, MarketplaceError> {
        Self::check_page(limit)?;
        let info = storage::get_collection(&e, &collection)
            .ok_or(MarketplaceError::CollectionNotFound)?;

        let mut nfts: Vec<NftItem> = Vec::new(&e);
        let end = info.nft_count.min(offset.saturating_add(limit));
        for token_id in offset.saturating_add(1)..=end {
            if let Some(nft) = storage::get_nft(&e, &collection, token_id) {
                if let Some(nft) = Self::live_view(&e, nft) {
                    nfts.push_back(nft);
                }
            }
        }

        Ok(nfts)
    }

    /// Active listings
    ///
    /// Listings whose seller no longer owns the token are skipped.
    ///
    /// # Arguments
    /// * `offset` - Position in the listing index to start from
    /// * `limit` - Maximum results to return, 1..=MAX_PAGE_SIZE
    pub fn get_nfts_for_sale(e: Env, offset: u32, limit: u32) -> Result<Vec<NftItem>, MarketplaceError> {
        Self::check_page(limit)?;

        let mut nfts: Vec<NftItem> = Vec::new(&e);
        for key in storage::list_page(&e, &NftList::ForSale, offset, limit).iter() {
            if let Some(nft) = Self::live_item(&e, &key) {
                if nft.is_for_sale {
                    nfts.push_back(nft);
                }
            }
        }

        Ok(nfts)
    }

    /// Entries in the listing index, including stale ones
    pub fn for_sale_count(e: Env) -> u32 {
        storage::list_len(&e, &NftList::ForSale)
    }

    /// Bring one NFT's record and indexes in line with the collection
    ///
    /// Moves the record to the current owner, drops a listing placed by a
    /// previous owner, and drops a burned token from every index. Anyone
    /// may call it.
    ///
    /// # Returns
    /// Whether anything changed
    pub fn sync_nft(e: Env, collection: Address, token_id: u32) -> Result<bool, MarketplaceError> {
        Self::guarded(&e, || {
            let nft = Self::require_nft(&e, &collection, token_id)?;
            let changed = Self::reconcile(&e, nft);

            if changed {
                Events::emit_with_topics(&e, (symbol_short!("nft_sync"), collection), token_id);
            }

            Ok(changed)
        })
    }

    /// Reconcile every marketplace NFT `owner` holds in `collection`
    /// according to the collection's `tokens_of`
    ///
    /// # Returns
    /// Number of records that changed
    pub fn sync_owner_nfts(e: Env, owner: Address, collection: Address) -> Result<u32, MarketplaceError> {
        Self::guarded(&e, || {
            if !storage::has_collection(&e, &collection) {
                return Err(MarketplaceError::CollectionNotFound);
            }

            let mut changed: u32 = 0;
            for token_id in CollectionClient::new(&e, &collection).tokens_of(&owner).iter() {
                if let Some(nft) = storage::get_nft(&e, &collection, token_id) {
                    if Self::reconcile(&e, nft) {
                        changed += 1;
                    }
                }
            }

            if changed > 0 {
                Events::emit_with_topics(
                    &e,
                    (symbol_short!("own_sync"), owner),
                    (collection, changed),
                );
            }

            Ok(changed)
        })
    }

    // ========================================================================
    // Listing Management
    // ========================================================================

    /// List an NFT at a fixed price, or change the price of an existing listing
    ///
    /// The owner must also approve the marketplace on the collection before
    /// the NFT can be bought.
    pub fn put_nft_for_sale(
        e: Env,
        seller: Address,
        collection: Address,
        token_id: u32,
        price: i128,
    ) -> Result<(), MarketplaceError> {
        Self::guarded(&e, || {
            seller.require_auth();

            let mut nft = Self::require_nft(&e, &collection, token_id)?;
            let owner = Self::current_owner(&e, &collection, token_id)?;
            if owner != seller {
                return Err(MarketplaceError::NotNftOwner);
            }
            Validation::require_positive(price, MarketplaceError::InvalidPrice)?;

            if nft.owner != seller {
                Self::reassign(&e, &mut nft, &seller);
            }
            nft.price = price;
            nft.is_for_sale = true;
            storage::set_nft(&e, &nft);
            storage::list_insert(&e, &NftList::ForSale, &Self::key_of(&nft));

            Events::emit_with_topics(
                &e,
                (symbol_short!("listed"), collection),
                (token_id, seller, price),
            );

            Ok(())
        })
    }

    /// Cancel a listing
    pub fn remove_nft_from_sale(
        e: Env,
        seller: Address,
        collection: Address,
        token_id: u32,
    ) -> Result<(), MarketplaceError> {
        Self::guarded(&e, || {
            seller.require_auth();

            let mut nft = Self::require_nft(&e, &collection, token_id)?;
            let owner = Self::current_owner(&e, &collection, token_id)?;
            if owner != seller {
                return Err(MarketplaceError::NotNftOwner);
            }
            // A listing left by a previous owner is not the seller's to cancel
            if !nft.is_for_sale || nft.owner != seller {
                return Err(MarketplaceError::NotForSale);
            }

            nft.price = 0;
            nft.is_for_sale = false;
            storage::set_nft(&e, &nft);
            storage::list_remove(&e, &NftList::ForSale, &Self::key_of(&nft));

            Events::emit_with_topics(&e, (symbol_short!("unlisted"), collection), (token_id, seller));

            Ok(())
        })
    }

    /// Buy a listed NFT
    ///
    /// # Arguments
    /// * `buyer` - The buyer's address
    /// * `collection` - Collection of the NFT
    /// * `token_id` - The NFT token ID
    /// * `max_price` - Most the buyer is willing to pay; exactly the listing
    ///   price is charged
    pub fn buy_nft(
        e: Env,
        buyer: Address,
        collection: Address,
        token_id: u32,
        max_price: i128,
    ) -> Result<(), MarketplaceError> {
        Self::guarded(&e, || {
            // CHECKS
            buyer.require_auth();

            if max_price <= 0 {
                return Err(MarketplaceError::ZeroFunds);
            }

            let payment_token = Self::payment_token(&e)?;
            let mut nft = Self::require_nft(&e, &collection, token_id)?;
            let seller = Self::current_owner(&e, &collection, token_id)?;

            if seller == buyer {
                return Err(MarketplaceError::CannotBuyOwnNft);
            }
            if !nft.is_for_sale {
                return Err(MarketplaceError::NotForSale);
            }
            if max_price < nft.price {
                return Err(MarketplaceError::InsufficientFunds);
            }
            if nft.owner != seller {
                return ErrorHelper::fail(
                    &e,
                    "buy_nft",
                    "listing was made by a previous owner",
                    MarketplaceError::SellerNoLongerOwner,
                );
            }
            Self::require_approved(&e, &collection, &seller, token_id)?;

            let price = nft.price;
            let (fee, proceeds) = SafeMath::split_fee(price, storage::get_fee_bps(&e))
                .ok_or(MarketplaceError::MathOverflow)?;

            // EFFECTS
            Self::reassign(&e, &mut nft, &buyer);
            storage::set_nft(&e, &nft);

            Self::add_profit(&e, fee)?;
            let refund = storage::take_offer(&e, &collection, token_id, &buyer);
            if let Some(offer) = &refund {
                Self::add_escrow(&e, -offer.amount)?;
            }

            // INTERACTIONS
            let marketplace = e.current_contract_address();
            let payment = token::Client::new(&e, &payment_token);
            if proceeds > 0 {
                payment.transfer(&buyer, &seller, &proceeds);
            }
            if fee > 0 {
                payment.transfer(&buyer, &marketplace, &fee);
            }
            if let Some(offer) = refund {
                payment.transfer(&marketplace, &buyer, &offer.amount);
            }
            CollectionClient::new(&e, &collection).transfer_from(&marketplace, &seller, &buyer, &token_id);

            Events::emit_with_topics(
                &e,
                (symbol_short!("nft_sold"), collection),
                (token_id, seller, buyer, price),
            );

            Ok(())
        })
    }

    // ========================================================================
    // Offer System
    // ========================================================================

    /// Make an offer on an NFT; `amount` is held by the marketplace until
    /// the offer is accepted, rejected or withdrawn
    ///
    /// At most `MAX_OFFERS_PER_NFT` offers can be open on one NFT.
    pub fn make_offer(
        e: Env,
        buyer: Address,
        collection: Address,
        token_id: u32,
        amount: i128,
    ) -> Result<(), MarketplaceError> {
        Self::guarded(&e, || {
            buyer.require_auth();

            let payment_token = Self::payment_token(&e)?;
            Self::require_nft(&e, &collection, token_id)?;
            let owner = Self::current_owner(&e, &collection, token_id)?;

            if owner == buyer {
                return Err(MarketplaceError::CannotOfferOnOwnNft);
            }
            Validation::require_positive(amount, MarketplaceError::InvalidPrice)?;

            if storage::has_offer(&e, &collection, token_id, &buyer) {
                return Err(MarketplaceError::OfferExists);
            }
            if storage::get_bidders(&e, &collection, token_id).len() >= MAX_OFFERS_PER_NFT {
                return Err(MarketplaceError::TooManyOffers);
            }

            let offer = Offer {
                buyer: buyer.clone(),
                amount,
                created_at: TimeUtils::now(&e),
            };
            storage::add_offer(&e, &collection, token_id, &offer);
            Self::add_escrow(&e, amount)?;

            token::Client::new(&e, &payment_token).transfer(
                &buyer,
                &e.current_contract_address(),
                &amount,
            );

            Events::emit_with_topics(
                &e,
                (symbol_short!("offer"), collection),
                (token_id, buyer, amount),
            );

            Ok(())
        })
    }

    /// Withdraw an open offer and get the escrowed funds back
    pub fn withdraw_offer(
        e: Env,
        buyer: Address,
        collection: Address,
        token_id: u32,
    ) -> Result<(), MarketplaceError> {
        Self::guarded(&e, || {
            buyer.require_auth();

            let payment_token = Self::payment_token(&e)?;
            Self::require_nft(&e, &collection, token_id)?;

            let offer = match storage::take_offer(&e, &collection, token_id, &buyer) {
                Some(offer) => offer,
                None => {
                    // An open offer is always refundable, even if the bidder
                    // has since come to own the NFT.
                    return match Self::current_owner(&e, &collection, token_id) {
                        Ok(owner) if owner == buyer => Err(MarketplaceError::CannotOfferOnOwnNft),
                        _ => Err(MarketplaceError::OfferNotFound),
                    };
                }
            };
            Self::add_escrow(&e, -offer.amount)?;

            token::Client::new(&e, &payment_token).transfer(
                &e.current_contract_address(),
                &buyer,
                &offer.amount,
            );

            Events::emit_with_topics(
                &e,
                (symbol_short!("offer_wd"), collection),
                (token_id, buyer, offer.amount),
            );

            Ok(())
        })
    }

    /// Accept `buyer`'s offer: the NFT goes to the buyer, the escrowed
    /// amount minus the fee goes to the seller
    pub fn accept_offer(
        e: Env,
        seller: Address,
        collection: Address,
        token_id: u32,
        buyer: Address,
    ) -> Result<(), MarketplaceError> {
        Self::guarded(&e, || {
            // CHECKS
            seller.require_auth();

            let payment_token = Self::payment_token(&e)?;
            let mut nft = Self::require_nft(&e, &collection, token_id)?;
            let owner = Self::current_owner(&e, &collection, token_id)?;
            if owner != seller {
                return Err(MarketplaceError::NotNftOwner);
            }

            let offer = storage::take_offer(&e, &collection, token_id, &buyer)
                .ok_or(MarketplaceError::OfferNotFound)?;
            Self::require_approved(&e, &collection, &seller, token_id)?;

            let (fee, proceeds) = SafeMath::split_fee(offer.amount, storage::get_fee_bps(&e))
                .ok_or(MarketplaceError::MathOverflow)?;

            // EFFECTS
            Self::add_escrow(&e, -offer.amount)?;
            Self::add_profit(&e, fee)?;

            Self::reassign(&e, &mut nft, &buyer);
            storage::set_nft(&e, &nft);

            // INTERACTIONS
            let marketplace = e.current_contract_address();
            if proceeds > 0 {
                token::Client::new(&e, &payment_token).transfer(&marketplace, &seller, &proceeds);
            }
            CollectionClient::new(&e, &collection).transfer_from(&marketplace, &seller, &buyer, &token_id);

            Events::emit_with_topics(
                &e,
                (symbol_short!("offer_ok"), collection),
                (token_id, seller, buyer, offer.amount),
            );

            Ok(())
        })
    }

    /// Reject `buyer`'s offer and refund it
    pub fn reject_offer(
        e: Env,
        seller: Address,
        collection: Address,
        token_id: u32,
        buyer: Address,
    ) -> Result<(), MarketplaceError> {
        Self::guarded(&e, || {
            seller.require_auth();

            let payment_token = Self::payment_token(&e)?;
            Self::require_nft(&e, &collection, token_id)?;
            let owner = Self::current_owner(&e, &collection, token_id)?;
            if owner != seller {
                return Err(MarketplaceError::NotNftOwner);
            }

            let offer = storage::take_offer(&e, &collection, token_id, &buyer)
                .ok_or(MarketplaceError::OfferNotFound)?;
            Self::add_escrow(&e, -offer.amount)?;

            token::Client::new(&e, &payment_token).transfer(
                &e.current_contract_address(),
                &buyer,
                &offer.amount,
            );

            Events::emit_with_topics(
                &e,
                (symbol_short!("offer_no"), collection),
                (token_id, seller, buyer, offer.amount),
            );

            Ok(())
        })
    }

    /// Get all open offers for an NFT, oldest bidder first
    pub fn get_offers(e: Env, collection: Address, token_id: u32) -> Vec<Offer> {
        let mut offers: Vec<Offer> = Vec::new(&e);
        for buyer in storage::get_bidders(&e, &collection, token_id).iter() {
            if let Some(offer) = storage::get_offer(&e, &collection, token_id, &buyer) {
                offers.push_back(offer);
            }
        }
        offers
    }

    pub fn get_offer(
        e: Env,
        collection: Address,
        token_id: u32,
        buyer: Address,
    ) -> Result<Offer, MarketplaceError> {
        storage::get_offer(&e, &collection, token_id, &buyer).ok_or(MarketplaceError::OfferNotFound)
    }

    pub fn has_user_made_offer(e: Env, user: Address, collection: Address, token_id: u32) -> bool {
        storage::has_offer(&e, &collection, token_id, &user)
    }

    // ========================================================================
    // Funds
    // ========================================================================

    /// Fees collected and not yet withdrawn
    pub fn marketplace_profit(e: Env) -> i128 {
        storage::get_profit(&e)
    }

    /// Funds held for open offers
    pub fn escrow_balance(e: Env) -> i128 {
        storage::get_escrow(&e)
    }

    /// Send all collected fees to the admin
    ///
    /// # Returns
    /// The amount withdrawn
    pub fn withdraw_marketplace_profit(e: Env, admin: Address) -> Result<i128, MarketplaceError> {
        Self::guarded(&e, || {
            AccessControl::require_admin(
                &e,
                &admin,
                MarketplaceError::NotInitialized,
                MarketplaceError::Unauthorized,
            )?;
            let payment_token = Self::payment_token(&e)?;

            let profit = storage::get_profit(&e);
            if profit <= 0 {
                return Err(MarketplaceError::NoProfitToWithdraw);
            }
            storage::set_profit(&e, 0);

            token::Client::new(&e, &payment_token).transfer(
                &e.current_contract_address(),
                &admin,
                &profit,
            );

            Events::emit_with_topics(&e, (symbol_short!("withdraw"), admin), profit);

            Ok(profit)
        })
    }
}

impl NftMarketplace {
    /// Run `f` with the reentrancy flag held
    fn guarded<T>(
        e: &Env,
        f: impl FnOnce() -> Result<T, MarketplaceError>,
    ) -> Result<T, MarketplaceError> {
        if !ReentrancyGuard::enter(e) {
            return Err(MarketplaceError::ReentrancyDetected);
        }
        let result = f();
        ReentrancyGuard::exit(e);
        result
    }

    fn payment_token(e: &Env) -> Result<Address, MarketplaceError> {
        storage::get_payment_token(e).ok_or(MarketplaceError::NotInitialized)
    }

    fn require_nft(e: &Env, collection: &Address, token_id: u32) -> Result<NftItem, MarketplaceError> {
        storage::get_nft(e, collection, token_id).ok_or(MarketplaceError::NftNotFound)
    }

    fn check_page(limit: u32) -> Result<(), MarketplaceError> {
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(MarketplaceError::InvalidPageSize);
        }
        Ok(())
    }

    fn key_of(nft: &NftItem) -> NftKey {
        NftKey {
            collection: nft.collection.clone(),
            token_id: nft.token_id,
        }
    }

    /// Owner according to the collection contract, `None` once burned
    fn live_owner(e: &Env, collection: &Address, token_id: u32) -> Option<Address> {
        match CollectionClient::new(e, collection).try_owner_of(&token_id) {
            Ok(Ok(owner)) => Some(owner),
            _ => None,
        }
    }

    fn current_owner(e: &Env, collection: &Address, token_id: u32) -> Result<Address, MarketplaceError> {
        Self::live_owner(e, collection, token_id).ok_or(MarketplaceError::NftNotFound)
    }

    /// The record as the collection currently sees it, `None` once burned
    fn live_view(e: &Env, mut nft: NftItem) -> Option<NftItem> {
        let owner = Self::live_owner(e, &nft.collection, nft.token_id)?;
        if owner != nft.owner {
            nft.owner = owner;
            nft.price = 0;
            nft.is_for_sale = false;
        }
        Some(nft)
    }

    fn live_item(e: &Env, key: &NftKey) -> Option<NftItem> {
        Self::live_view(e, storage::get_nft(e, &key.collection, key.token_id)?)
    }

    /// Hand the record to `owner` and drop any listing. Caller stores it.
    fn reassign(e: &Env, nft: &mut NftItem, owner: &Address) {
        let key = Self::key_of(nft);
        storage::list_remove(e, &NftList::Owner(nft.owner.clone()), &key);
        storage::list_insert(e, &NftList::Owner(owner.clone()), &key);
        storage::list_remove(e, &NftList::ForSale, &key);

        nft.owner = owner.clone();
        nft.price = 0;
        nft.is_for_sale = false;
    }

    /// Apply the collection's view of `nft` to the record and indexes
    fn reconcile(e: &Env, mut nft: NftItem) -> bool {
        match Self::live_owner(e, &nft.collection, nft.token_id) {
            Some(owner) if owner == nft.owner => false,
            Some(owner) => {
                Self::reassign(e, &mut nft, &owner);
                storage::set_nft(e, &nft);
                true
            }
            None => {
                let key = Self::key_of(&nft);
                let owner_list = NftList::Owner(nft.owner.clone());
                let indexed = storage::list_contains(e, &owner_list, &key)
                    || storage::list_contains(e, &NftList::ForSale, &key);
                if indexed {
                    storage::list_remove(e, &owner_list, &key);
                    storage::list_remove(e, &NftList::ForSale, &key);
                    nft.price = 0;
                    nft.is_for_sale = false;
                    storage::set_nft(e, &nft);
                }
                indexed
            }
        }
    }

    fn require_approved(
        e: &Env,
        collection: &Address,
        owner: &Address,
        token_id: u32,
    ) -> Result<(), MarketplaceError> {
        let marketplace = e.current_contract_address();
        let client = CollectionClient::new(e, collection);

        if client.get_approved(&token_id) == Some(marketplace.clone())
            || client.is_approved_for_all(owner, &marketplace)
        {
            return Ok(());
        }
        ErrorHelper::fail(
            e,
            "require_approved",
            "marketplace is not approved for this token",
            MarketplaceError::MarketplaceNotApproved,
        )
    }

    fn add_profit(e: &Env, amount: i128) -> Result<(), MarketplaceError> {
        let profit = SafeMath::add(storage::get_profit(e), amount).ok_or(MarketplaceError::MathOverflow)?;
        storage::set_profit(e, profit);
        Ok(())
    }

    fn add_escrow(e: &Env, delta: i128) -> Result<(), MarketplaceError> {
        let escrow = SafeMath::add(storage::get_escrow(e), delta).ok_or(MarketplaceError::MathOverflow)?;
        storage::set_escrow(e, escrow);
        Ok(())
    }
}
