//! Error and Edge Case Tests
//!
//! These tests verify:
//! - Unauthorized access attempts
//! - Ownership changes made outside the marketplace
//! - Boundary values (0, max, empty)
//! - Expected error assertions

use crate::harness::{TestHarness, ONE_TOKEN};
use soroban_sdk::{testutils::Address as _, Address};

use nft_collection::{CollectionError, NftCollectionContract};
use nft_marketplace::{MarketplaceError, MAX_OFFERS_PER_NFT, MAX_PAGE_SIZE};

// ============================================================================
// Unauthorized Access Tests
// ============================================================================

/// Test: attacker cannot mint in someone else's collection
#[test]
fn test_error_attacker_cannot_mint() {
    let harness = TestHarness::new();
    let attacker = &harness.accounts.attacker;
    let collection = harness.create_collection(&harness.accounts.creator, "Stellar Apes", "APE");

    let result = harness.market().try_mint_nft(
        attacker,
        &collection,
        attacker,
        &harness.text("ipfs://fake"),
    );
    assert_eq!(result, Err(Ok(MarketplaceError::NotCollectionOwner)));
}

/// Test: collections created through the marketplace are minted only by it
#[test]
fn test_error_collection_owned_by_marketplace() {
    let harness = TestHarness::new();
    let creator = &harness.accounts.creator;
    let collection = harness.create_collection(creator, "Stellar Apes", "APE");

    assert_eq!(
        harness.collection(&collection).owner(),
        harness.contracts.marketplace
    );
}

/// Test: attacker cannot withdraw marketplace profit
#[test]
fn test_error_attacker_cannot_withdraw_profit() {
    let harness = TestHarness::new();
    let market = harness.market();
    let creator = &harness.accounts.creator;
    let collection = harness.create_collection(creator, "Stellar Apes", "APE");
    let token_id = harness.mint(&collection, creator, "ipfs://ape/1");
    harness.list(creator, &collection, token_id, 10 * ONE_TOKEN);
    market.buy_nft(&harness.accounts.alice, &collection, &token_id, &(10 * ONE_TOKEN));

    let result = market.try_withdraw_marketplace_profit(&harness.accounts.attacker);
    assert_eq!(result, Err(Ok(MarketplaceError::Unauthorized)));
    assert!(market.marketplace_profit() > 0);
}

/// Test: attacker cannot list, unlist, accept or reject for the owner
#[test]
fn test_error_attacker_cannot_manage_listing() {
    let harness = TestHarness::new();
    let market = harness.market();
    let creator = &harness.accounts.creator;
    let attacker = &harness.accounts.attacker;
    let alice = &harness.accounts.alice;

    let collection = harness.create_collection(creator, "Stellar Apes", "APE");
    let token_id = harness.mint(&collection, creator, "ipfs://ape/1");

    assert_eq!(
        market.try_put_nft_for_sale(attacker, &collection, &token_id, &1),
        Err(Ok(MarketplaceError::NotNftOwner))
    );

    harness.list(creator, &collection, token_id, ONE_TOKEN);
    assert_eq!(
        market.try_remove_nft_from_sale(attacker, &collection, &token_id),
        Err(Ok(MarketplaceError::NotNftOwner))
    );

    market.make_offer(alice, &collection, &token_id, &ONE_TOKEN);
    assert_eq!(
        market.try_accept_offer(attacker, &collection, &token_id, alice),
        Err(Ok(MarketplaceError::NotNftOwner))
    );
    assert_eq!(
        market.try_reject_offer(attacker, &collection, &token_id, alice),
        Err(Ok(MarketplaceError::NotNftOwner))
    );
    assert!(market.has_user_made_offer(alice, &collection, &token_id));
}

/// Test: attacker cannot move a token through the collection either
#[test]
fn test_error_attacker_cannot_transfer_token() {
    let harness = TestHarness::new();
    let creator = &harness.accounts.creator;
    let attacker = &harness.accounts.attacker;
    let collection = harness.create_collection(creator, "Stellar Apes", "APE");
    let token_id = harness.mint(&collection, creator, "ipfs://ape/1");

    let result = harness
        .collection(&collection)
        .try_transfer_from(attacker, creator, attacker, &token_id);
    assert_eq!(result, Err(Ok(CollectionError::NotOwnerOrApproved)));
}

/// Test: attacker cannot register a collection deployed for someone else
#[test]
fn test_error_attacker_cannot_claim_collection() {
    let harness = TestHarness::new();
    let market = harness.market();
    let creator = &harness.accounts.creator;
    let attacker = &harness.accounts.attacker;

    let collection = harness.env.register(NftCollectionContract, (creator.clone(),));
    assert_eq!(
        market.try_create_collection(
            attacker,
            &collection,
            &harness.text("Stolen"),
            &harness.text("STL"),
        ),
        Err(Ok(MarketplaceError::CollectionCreatorMismatch))
    );

    market.create_collection(creator, &collection, &harness.text("Stellar Apes"), &harness.text("APE"));
    assert_eq!(market.get_owner_of_collection(&collection), *creator);
    assert_eq!(
        market.try_mint_nft(attacker, &collection, attacker, &harness.text("ipfs://fake")),
        Err(Ok(MarketplaceError::NotCollectionOwner))
    );
}

/// Test: throwaway offers cannot lock up a token's offer book
#[test]
fn test_error_offer_spam_is_bounded() {
    let harness = TestHarness::new();
    let market = harness.market();
    let creator = &harness.accounts.creator;
    let alice = &harness.accounts.alice;

    let collection = harness.create_collection(creator, "Stellar Apes", "APE");
    let token_id = harness.mint(&collection, creator, "ipfs://ape/1");

    for _ in 0..MAX_OFFERS_PER_NFT - 1 {
        let spammer = Address::generate(&harness.env);
        harness.token_admin_client().mint(&spammer, &1);
        market.make_offer(&spammer, &collection, &token_id, &1);
    }
    market.make_offer(alice, &collection, &token_id, &(5 * ONE_TOKEN));

    assert_eq!(
        market.try_make_offer(&harness.accounts.bob, &collection, &token_id, &ONE_TOKEN),
        Err(Ok(MarketplaceError::TooManyOffers))
    );

    harness.approve_marketplace(creator, &collection, token_id);
    market.accept_offer(creator, &collection, &token_id, alice);
    assert_eq!(harness.collection(&collection).owner_of(&token_id), *alice);
    harness.assert_custody_balanced();
}

// ============================================================================
// Out-of-band Ownership Changes
// ============================================================================

/// Test: views agree with the collection after transfers and burns
#[test]
fn test_error_views_follow_collection() {
    let harness = TestHarness::new();
    let market = harness.market();
    let creator = &harness.accounts.creator;
    let bob = &harness.accounts.bob;

    let collection = harness.create_collection(creator, "Stellar Apes", "APE");
    let moved = harness.mint(&collection, creator, "ipfs://ape/1");
    let burned = harness.mint(&collection, creator, "ipfs://ape/2");
    harness.list(creator, &collection, moved, ONE_TOKEN);
    harness.list(creator, &collection, burned, ONE_TOKEN);

    let nfts = harness.collection(&collection);
    nfts.transfer(creator, bob, &moved);
    nfts.burn(creator, &burned);

    assert_eq!(market.get_nfts_for_sale(&0, &MAX_PAGE_SIZE).len(), 0);
    assert_eq!(market.get_nfts_by_owner(creator, &0, &MAX_PAGE_SIZE).len(), 0);

    let in_collection = market.get_nfts_in_collection(&collection, &0, &MAX_PAGE_SIZE);
    assert_eq!(in_collection.len(), 1);
    assert_eq!(in_collection.get(0).unwrap().owner, *bob);
    assert!(!in_collection.get(0).unwrap().is_for_sale);

    assert_eq!(market.sync_owner_nfts(bob, &collection), 1);
    assert!(market.sync_nft(&collection, &burned));
    assert_eq!(market.for_sale_count(), 0);
    assert_eq!(market.owner_nft_count(creator), 0);
    assert_eq!(market.get_nfts_by_owner(bob, &0, &MAX_PAGE_SIZE).len(), 1);
}

/// Test: one owner's view does not grow with the rest of the marketplace
#[test]
fn test_error_owner_view_with_many_nfts() {
    let harness = TestHarness::new();
    let market = harness.market();
    let creator = &harness.accounts.creator;
    let bob = &harness.accounts.bob;

    let collection = harness.create_collection(creator, "Stellar Apes", "APE");
    for _ in 0..700 {
        harness.mint(&collection, &harness.accounts.alice, "ipfs://ape");
    }
    let token_id = harness.mint(&collection, bob, "ipfs://ape/bob");

    let held = market.get_nfts_by_owner(bob, &0, &MAX_PAGE_SIZE);
    assert_eq!(held.len(), 1);
    assert_eq!(held.get(0).unwrap().token_id, token_id);

    assert_eq!(market.owner_nft_count(&harness.accounts.alice), 700);
    assert_eq!(
        market
            .get_nfts_by_owner(&harness.accounts.alice, &0, &MAX_PAGE_SIZE)
            .len(),
        MAX_PAGE_SIZE
    );
}

/// Test: a listing does not survive a transfer made outside the marketplace
#[test]
fn test_error_stale_listing_after_direct_transfer() {
    let harness = TestHarness::new();
    let market = harness.market();
    let creator = &harness.accounts.creator;
    let bob = &harness.accounts.bob;

    let collection = harness.create_collection(creator, "Stellar Apes", "APE");
    let token_id = harness.mint(&collection, creator, "ipfs://ape/1");
    harness.list(creator, &collection, token_id, ONE_TOKEN);

    harness
        .collection(&collection)
        .transfer(creator, bob, &token_id);

    assert_eq!(
        market.try_buy_nft(&harness.accounts.alice, &collection, &token_id, &ONE_TOKEN),
        Err(Ok(MarketplaceError::SellerNoLongerOwner))
    );

    // The new owner can relist
    harness.list(bob, &collection, token_id, 2 * ONE_TOKEN);
    market.buy_nft(&harness.accounts.alice, &collection, &token_id, &(2 * ONE_TOKEN));
    assert_eq!(
        harness.collection(&collection).owner_of(&token_id),
        harness.accounts.alice
    );
}

/// Test: revoking approval after listing blocks the sale
#[test]
fn test_error_revoked_approval_blocks_sale() {
    let harness = TestHarness::new();
    let market = harness.market();
    let creator = &harness.accounts.creator;

    let collection = harness.create_collection(creator, "Stellar Apes", "APE");
    let token_id = harness.mint(&collection, creator, "ipfs://ape/1");
    harness.list(creator, &collection, token_id, ONE_TOKEN);

    harness
        .collection(&collection)
        .revoke_approval(creator, &token_id);

    assert_eq!(
        market.try_buy_nft(&harness.accounts.alice, &collection, &token_id, &ONE_TOKEN),
        Err(Ok(MarketplaceError::MarketplaceNotApproved))
    );
}

/// Test: an offer stays refundable after the bidder receives the token
#[test]
fn test_error_offer_refundable_after_bidder_becomes_owner() {
    let harness = TestHarness::new();
    let market = harness.market();
    let creator = &harness.accounts.creator;
    let alice = &harness.accounts.alice;

    let collection = harness.create_collection(creator, "Stellar Apes", "APE");
    let token_id = harness.mint(&collection, creator, "ipfs://ape/1");

    market.make_offer(alice, &collection, &token_id, &ONE_TOKEN);
    harness
        .collection(&collection)
        .transfer(creator, alice, &token_id);

    market.withdraw_offer(alice, &collection, &token_id);
    assert_eq!(market.escrow_balance(), 0);
    harness.assert_custody_balanced();
}

/// Test: burned tokens disappear from marketplace views but offers refund
#[test]
fn test_error_burned_token() {
    let harness = TestHarness::new();
    let market = harness.market();
    let creator = &harness.accounts.creator;
    let alice = &harness.accounts.alice;

    let collection = harness.create_collection(creator, "Stellar Apes", "APE");
    let token_id = harness.mint(&collection, creator, "ipfs://ape/1");
    market.make_offer(alice, &collection, &token_id, &ONE_TOKEN);

    harness.collection(&collection).burn(creator, &token_id);

    assert_eq!(
        market.try_get_nft(&collection, &token_id),
        Err(Ok(MarketplaceError::NftNotFound))
    );
    assert_eq!(
        market.try_buy_nft(alice, &collection, &token_id, &ONE_TOKEN),
        Err(Ok(MarketplaceError::NftNotFound))
    );

    market.withdraw_offer(alice, &collection, &token_id);
    harness.assert_custody_balanced();
}

// ============================================================================
// Boundary Tests
// ============================================================================

/// Test: boundary fees
#[test]
fn test_error_fee_boundaries() {
    let harness = TestHarness::new();
    let market = harness.market();

    market.update_fee(&10_000);
    assert_eq!(market.get_fee(), 10_000);

    assert_eq!(
        market.try_update_fee(&10_001),
        Err(Ok(MarketplaceError::InvalidFee))
    );
    assert_eq!(market.get_fee(), 10_000);
}

/// Test: with a 100% fee the seller receives nothing
#[test]
fn test_error_full_fee_sale() {
    let harness = TestHarness::new();
    let market = harness.market();
    let creator = &harness.accounts.creator;

    market.update_fee(&10_000);

    let collection = harness.create_collection(creator, "Stellar Apes", "APE");
    let token_id = harness.mint(&collection, creator, "ipfs://ape/1");
    harness.list(creator, &collection, token_id, ONE_TOKEN);
    market.buy_nft(&harness.accounts.alice, &collection, &token_id, &ONE_TOKEN);

    assert_eq!(harness.balance(creator), 0);
    assert_eq!(market.marketplace_profit(), ONE_TOKEN);
    harness.assert_custody_balanced();
}

/// Test: empty names and unknown addresses
#[test]
fn test_error_invalid_inputs() {
    let harness = TestHarness::new();
    let market = harness.market();
    let creator = &harness.accounts.creator;
    let unknown = Address::generate(&harness.env);

    let collection = harness
        .env
        .register(nft_collection::NftCollectionContract, (creator.clone(),));
    assert_eq!(
        market.try_create_collection(creator, &collection, &harness.text(""), &harness.text("APE")),
        Err(Ok(MarketplaceError::CollectionNameEmpty))
    );
    assert_eq!(
        market.try_create_collection(creator, &collection, &harness.text("Apes"), &harness.text("")),
        Err(Ok(MarketplaceError::CollectionSymbolEmpty))
    );
    assert!(!market.is_collection(&collection));

    assert_eq!(
        market.try_get_collection(&unknown),
        Err(Ok(MarketplaceError::CollectionNotFound))
    );
    assert_eq!(
        market.try_get_nft(&unknown, &1),
        Err(Ok(MarketplaceError::NftNotFound))
    );
    assert_eq!(
        market.try_make_offer(&harness.accounts.alice, &unknown, &1, &ONE_TOKEN),
        Err(Ok(MarketplaceError::NftNotFound))
    );
}
