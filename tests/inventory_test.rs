// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Inventory store behavior under direct use and under contention.

use boxoffice_rs::inventory::{issue_batch, InventoryStore};
use boxoffice_rs::{CategoryId, Channel, EventId, SaleId, TicketError, TicketStatus};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn make_store(quantity: u32) -> (InventoryStore, CategoryId, EventId) {
    let store = InventoryStore::new();
    let category = CategoryId::new();
    let event = EventId::new();
    let batch = issue_batch(category, event, dec!(1000), quantity, Channel::Online).unwrap();
    store.add_batch(category, event, dec!(1000), batch).unwrap();
    (store, category, event)
}

#[test]
fn later_batches_extend_the_same_shelf() {
    let (store, category, event) = make_store(3);
    let batch = issue_batch(category, event, dec!(1000), 2, Channel::Print).unwrap();
    store.add_batch(category, event, dec!(1000), batch).unwrap();

    let counts = store.counts(category).unwrap();
    assert_eq!(counts.issued, 5);
    assert_eq!(counts.available, 5);
}

#[test]
fn claims_are_ordered_oldest_first() {
    let (store, category, event) = make_store(2);
    let later_ids: Vec<_> = {
        let batch = issue_batch(category, event, dec!(1000), 2, Channel::Online).unwrap();
        store
            .add_batch(category, event, dec!(1000), batch.clone())
            .unwrap();
        batch.iter().map(|t| t.id).collect()
    };

    // Claiming 2 takes the original batch, not the later one.
    let (claimed, _) = store.claim_available(category, 2, SaleId::new()).unwrap();
    for id in &claimed {
        assert!(!later_ids.contains(id));
    }
}

#[test]
fn claim_against_unknown_category_is_not_found() {
    let store = InventoryStore::new();
    assert_eq!(
        store.claim_available(CategoryId::new(), 1, SaleId::new()),
        Err(TicketError::NotFound { entity: "category" })
    );
}

#[test]
fn release_is_idempotent() {
    let (store, category, _) = make_store(2);
    let sale = SaleId::new();
    let (claimed, _) = store.claim_available(category, 2, sale).unwrap();

    store.release(category, &claimed).unwrap();
    store.release(category, &claimed).unwrap();

    let counts = store.counts(category).unwrap();
    assert_eq!(counts.available, 2);
    assert_eq!(counts.sold, 0);
}

#[test]
fn redeemed_ticket_keeps_its_sale_reference() {
    let (store, category, _) = make_store(1);
    let sale = SaleId::new();
    let (claimed, _) = store.claim_available(category, 1, sale).unwrap();

    let redeemed = store.redeem(category, claimed[0]).unwrap();
    assert_eq!(redeemed.status, TicketStatus::Used);
    assert_eq!(redeemed.sale, Some(sale));
}

#[test]
fn concurrent_claims_split_the_shelf_without_overlap() {
    let (store, category, _) = make_store(100);
    let store = Arc::new(store);

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let store = store.clone();
            std::thread::spawn(move || store.claim_available(category, 10, SaleId::new()))
        })
        .collect();

    let mut all_claimed = Vec::new();
    for handle in handles {
        let (claimed, amount) = handle.join().unwrap().unwrap();
        assert_eq!(amount, dec!(10000));
        all_claimed.extend(claimed);
    }

    all_claimed.sort_by_key(|id| id.0);
    all_claimed.dedup();
    assert_eq!(all_claimed.len(), 100);

    let counts = store.counts(category).unwrap();
    assert_eq!(counts.sold, 100);
    assert_eq!(counts.available, 0);
}

#[test]
fn concurrent_redeems_of_one_ticket_have_one_winner() {
    let (store, category, _) = make_store(1);
    let (claimed, _) = store.claim_available(category, 1, SaleId::new()).unwrap();
    let ticket = claimed[0];
    let store = Arc::new(store);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            std::thread::spawn(move || store.redeem(category, ticket))
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(Result::is_ok)
        .count();
    assert_eq!(winners, 1);
}
