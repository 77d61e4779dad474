use crate::{CollectionInfo, DataKey, NftItem, NftKey, NftList, Offer};
use soroban_sdk::{Address, Env, Vec};

// --- Configuration ---

pub fn set_payment_token(e: &Env, token: &Address) {
    e.storage().instance().set(&DataKey::PaymentToken, token);
}

pub fn get_payment_token(e: &Env) -> Option<Address> {
    e.storage().instance().get(&DataKey::PaymentToken)
}

pub fn set_fee_bps(e: &Env, fee_bps: u32) {
    e.storage().instance().set(&DataKey::FeeBps, &fee_bps);
}

pub fn get_fee_bps(e: &Env) -> u32 {
    e.storage().instance().get(&DataKey::FeeBps).unwrap_or(0)
}

// --- Funds ---

pub fn get_profit(e: &Env) -> i128 {
    e.storage().instance().get(&DataKey::Profit).unwrap_or(0)
}

pub fn set_profit(e: &Env, amount: i128) {
    e.storage().instance().set(&DataKey::Profit, &amount);
}

pub fn get_escrow(e: &Env) -> i128 {
    e.storage().instance().get(&DataKey::Escrow).unwrap_or(0)
}

pub fn set_escrow(e: &Env, amount: i128) {
    e.storage().instance().set(&DataKey::Escrow, &amount);
}

// --- Collections ---

pub fn get_collections(e: &Env) -> Vec<Address> {
    e.storage()
        .persistent()
        .get(&DataKey::Collections)
        .unwrap_or(Vec::new(e))
}

pub fn get_collection(e: &Env, collection: &Address) -> Option<CollectionInfo> {
    e.storage()
        .persistent()
        .get(&DataKey::Collection(collection.clone()))
}

pub fn has_collection(e: &Env, collection: &Address) -> bool {
    e.storage()
        .persistent()
        .has(&DataKey::Collection(collection.clone()))
}

pub fn get_creator_collections(e: &Env, creator: &Address) -> Vec<Address> {
    e.storage()
        .persistent()
        .get(&DataKey::CreatorCollections(creator.clone()))
        .unwrap_or(Vec::new(e))
}

pub fn set_collection(e: &Env, info: &CollectionInfo) {
    e.storage()
        .persistent()
        .set(&DataKey::Collection(info.address.clone()), info);
}

pub fn add_collection(e: &Env, info: &CollectionInfo) {
    set_collection(e, info);

    let mut all = get_collections(e);
    all.push_back(info.address.clone());
    e.storage().persistent().set(&DataKey::Collections, &all);

    let mut created = get_creator_collections(e, &info.creator);
    created.push_back(info.address.clone());
    e.storage()
        .persistent()
        .set(&DataKey::CreatorCollections(info.creator.clone()), &created);
}

// --- NFTs ---

pub fn get_nft(e: &Env, collection: &Address, token_id: u32) -> Option<NftItem> {
    e.storage()
        .persistent()
        .get(&DataKey::Nft(collection.clone(), token_id))
}

pub fn set_nft(e: &Env, nft: &NftItem) {
    e.storage()
        .persistent()
        .set(&DataKey::Nft(nft.collection.clone(), nft.token_id), nft);
}

pub fn get_total_nft_count(e: &Env) -> u32 {
    e.storage()
        .instance()
        .get(&DataKey::TotalNftCount)
        .unwrap_or(0)
}

pub fn set_total_nft_count(e: &Env, count: u32) {
    e.storage().instance().set(&DataKey::TotalNftCount, &count);
}

// --- NFT lists ---
//
// Each list is stored entry by entry: `ListItem(list, i)` holds the key at
// position i and `ListSlot(list, key)` its position, so inserts and removals
// touch a constant number of entries. Order is not preserved on removal.

pub fn list_len(e: &Env, list: &NftList) -> u32 {
    e.storage()
        .persistent()
        .get(&DataKey::ListLen(list.clone()))
        .unwrap_or(0)
}

pub fn list_contains(e: &Env, list: &NftList, key: &NftKey) -> bool {
    e.storage()
        .persistent()
        .has(&DataKey::ListSlot(list.clone(), key.clone()))
}

/// Append `key` unless it is already present
pub fn list_insert(e: &Env, list: &NftList, key: &NftKey) {
    if list_contains(e, list, key) {
        return;
    }
    // Bounded by the total NFT count, which is overflow-checked
    let len = list_len(e, list);
    let store = e.storage().persistent();
    store.set(&DataKey::ListItem(list.clone(), len), key);
    store.set(&DataKey::ListSlot(list.clone(), key.clone()), &len);
    store.set(&DataKey::ListLen(list.clone()), &(len + 1));
}

/// Remove `key` by moving the last entry into its slot
pub fn list_remove(e: &Env, list: &NftList, key: &NftKey) {
    let store = e.storage().persistent();
    let slot_key = DataKey::ListSlot(list.clone(), key.clone());
    let slot: u32 = match store.get(&slot_key) {
        Some(slot) => slot,
        None => return,
    };

    let last = list_len(e, list).saturating_sub(1);
    if slot != last {
        if let Some(moved) = store.get::<_, NftKey>(&DataKey::ListItem(list.clone(), last)) {
            store.set(&DataKey::ListItem(list.clone(), slot), &moved);
            store.set(&DataKey::ListSlot(list.clone(), moved), &slot);
        }
    }
    store.remove(&DataKey::ListItem(list.clone(), last));
    store.remove(&slot_key);

    if last == 0 {
        store.remove(&DataKey::ListLen(list.clone()));
    } else {
        store.set(&DataKey::ListLen(list.clone()), &last);
    }
}

/// Up to `limit` keys starting at position `offset`
pub fn list_page(e: &Env, list: &NftList, offset: u32, limit: u32) -> Vec<NftKey> {
    let mut keys: Vec<NftKey> = Vec::new(e);
    let end = list_len(e, list).min(offset.saturating_add(limit));

    for i in offset..end {
        if let Some(key) = e
            .storage()
            .persistent()
            .get(&DataKey::ListItem(list.clone(), i))
        {
            keys.push_back(key);
        }
    }

    keys
}

// --- Offers ---

pub fn get_bidders(e: &Env, collection: &Address, token_id: u32) -> Vec<Address> {
    e.storage()
        .persistent()
        .get(&DataKey::Bidders(collection.clone(), token_id))
        .unwrap_or(Vec::new(e))
}

fn set_bidders(e: &Env, collection: &Address, token_id: u32, bidders: &Vec<Address>) {
    let key = DataKey::Bidders(collection.clone(), token_id);
    if bidders.is_empty() {
        e.storage().persistent().remove(&key);
    } else {
        e.storage().persistent().set(&key, bidders);
    }
}

pub fn get_offer(e: &Env, collection: &Address, token_id: u32, buyer: &Address) -> Option<Offer> {
    e.storage()
        .persistent()
        .get(&DataKey::Offer(collection.clone(), token_id, buyer.clone()))
}

pub fn has_offer(e: &Env, collection: &Address, token_id: u32, buyer: &Address) -> bool {
    e.storage()
        .persistent()
        .has(&DataKey::Offer(collection.clone(), token_id, buyer.clone()))
}

pub fn add_offer(e: &Env, collection: &Address, token_id: u32, offer: &Offer) {
    e.storage().persistent().set(
        &DataKey::Offer(collection.clone(), token_id, offer.buyer.clone()),
        offer,
    );

    let mut bidders = get_bidders(e, collection, token_id);
    bidders.push_back(offer.buyer.clone());
    set_bidders(e, collection, token_id, &bidders);
}

/// Remove `buyer`'s offer and return it, if there was one
pub fn take_offer(e: &Env, collection: &Address, token_id: u32, buyer: &Address) -> Option<Offer> {
    let offer = get_offer(e, collection, token_id, buyer)?;
    e.storage()
        .persistent()
        .remove(&DataKey::Offer(collection.clone(), token_id, buyer.clone()));

    let mut bidders = get_bidders(e, collection, token_id);
    if let Some(index) = bidders.first_index_of(buyer) {
        bidders.remove(index);
        set_bidders(e, collection, token_id, &bidders);
    }

    Some(offer)
}
