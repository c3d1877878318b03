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

//! The box office engine.
//!
//! [`BoxOffice`] owns the inventory, the sales ledger, the code registry,
//! the gate log, and the card deck, and coordinates the external
//! collaborators around them. It is the one type callers hold; every
//! operation takes `&self` and is safe to drive from many threads at once.
//!
//! Locking discipline: each operation takes at most one of the fine-grained
//! mutexes (a category shelf, a sale, a card) at a time and never nests
//! them. Follow-ups that need a second lock (releasing tickets after a
//! cancellation, say) run after the first is dropped.

use crate::base::{BuyerId, CardId, CategoryId, EventId, OperatorId, SaleId, TicketCode};
use crate::card::{self, CardDeck, CardSnapshot, CardStats};
use crate::checkin::{CheckIn, GateLog};
use crate::error::TicketError;
use crate::external::{
    BuyerProfile, CodeRenderer, IdentityService, LogNotifier, Notifier, OfflineProvider,
    PaymentProvider, PaymentRequest, PaymentSession, PhoneDirectory, PlainRenderer,
};
use crate::inventory::{self, CategoryCounts, InventoryStore};
use crate::registry::{CodeRegistry, TicketLocator};
use crate::sale::{PaymentOutcome, Sale, SaleSnapshot, SaleStatus, Settlement};
use crate::ticket::{Channel, Ticket};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

/// Where the payment provider sends the buyer back to.
#[derive(Debug, Clone)]
pub struct PaymentPages {
    pub success_base: String,
    pub cancel_base: String,
}

impl PaymentPages {
    fn urls_for(&self, sale: SaleId) -> (String, String) {
        (
            format!("{}/{sale}", self.success_base),
            format!("{}/{sale}", self.cancel_base),
        )
    }
}

impl Default for PaymentPages {
    fn default() -> Self {
        PaymentPages {
            success_base: "https://boxoffice.invalid/payment/success".to_string(),
            cancel_base: "https://boxoffice.invalid/payment/cancel".to_string(),
        }
    }
}

/// Revenue summary over paid sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SalesStats {
    pub total_sales: u32,
    pub total_revenue: Decimal,
    pub total_tickets: u32,
}

/// The ticket lifecycle engine.
pub struct BoxOffice {
    inventory: InventoryStore,
    sales: DashMap<SaleId, Sale>,
    registry: CodeRegistry,
    gate_log: GateLog,
    cards: CardDeck,
    identity: Arc<dyn IdentityService>,
    payments: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn Notifier>,
    renderer: Arc<dyn CodeRenderer>,
    pages: PaymentPages,
}

impl Default for BoxOffice {
    fn default() -> Self {
        Self::new()
    }
}

impl BoxOffice {
    /// Engine wired to the in-process default collaborators.
    pub fn new() -> Self {
        Self::with_collaborators(
            Arc::new(PhoneDirectory::new()),
            Arc::new(OfflineProvider),
            Arc::new(LogNotifier),
            Arc::new(PlainRenderer),
            PaymentPages::default(),
        )
    }

    pub fn with_collaborators(
        identity: Arc<dyn IdentityService>,
        payments: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
        renderer: Arc<dyn CodeRenderer>,
        pages: PaymentPages,
    ) -> Self {
        BoxOffice {
            inventory: InventoryStore::new(),
            sales: DashMap::new(),
            registry: CodeRegistry::new(),
            gate_log: GateLog::new(),
            cards: CardDeck::new(),
            identity,
            payments,
            notifier,
            renderer,
            pages,
        }
    }

    /// Issues a batch of tickets into a category.
    ///
    /// Every code in the batch is rendered before anything is stored, so a
    /// rendering failure aborts the whole batch. The first batch binds the
    /// category to its event and unit price.
    pub fn issue_tickets(
        &self,
        category: CategoryId,
        event: EventId,
        unit_price: Decimal,
        quantity: u32,
        channel: Channel,
    ) -> Result<Vec<Ticket>, TicketError> {
        let batch = inventory::issue_batch(category, event, unit_price, quantity, channel)?;
        for ticket in &batch {
            self.renderer.render(ticket.code.payload())?;
        }
        self.inventory
            .add_batch(category, event, unit_price, batch.clone())?;
        for ticket in &batch {
            self.registry.register(
                ticket.code.clone(),
                TicketLocator {
                    category,
                    ticket: ticket.id,
                },
            )?;
        }
        log::info!(
            "issued {} {} ticket(s) in category {category}",
            batch.len(),
            channel
        );
        Ok(batch)
    }

    /// Reserves `quantity` tickets for a buyer and opens a pending sale.
    ///
    /// The buyer identity is resolved (or created) first; if the claim then
    /// fails and the identity was created solely for this purchase, it is
    /// removed again.
    pub fn reserve(
        &self,
        category: CategoryId,
        quantity: u32,
        profile: &BuyerProfile,
    ) -> Result<SaleSnapshot, TicketError> {
        if quantity == 0 {
            return Err(TicketError::Validation {
                field: "quantity",
                reason: "must be at least 1",
            });
        }
        profile.validate()?;

        let resolved = self.identity.find_or_create(profile)?;
        let sale_id = SaleId::new();
        let (tickets, amount) = match self.inventory.claim_available(category, quantity, sale_id) {
            Ok(claim) => claim,
            Err(err) => {
                if resolved.created {
                    self.identity.remove(resolved.buyer);
                }
                return Err(err);
            }
        };
        // Claim succeeded, so the category shelf exists.
        let event = match self.inventory.event_of(category) {
            Some(event) => event,
            None => {
                self.inventory.release(category, &tickets).ok();
                if resolved.created {
                    self.identity.remove(resolved.buyer);
                }
                return Err(TicketError::NotFound { entity: "category" });
            }
        };

        let sale = Sale::open(
            sale_id,
            event,
            category,
            resolved.buyer,
            profile.phone.clone(),
            tickets,
            amount,
        );
        let snapshot = sale.snapshot();
        self.sales.insert(sale_id, sale);
        log::info!("sale {sale_id} opened: {quantity} ticket(s), amount {amount}");
        Ok(snapshot)
    }

    /// Opens a payment session for a pending sale and records its token.
    ///
    /// One session per sale: a second call fails with
    /// [`TicketError::InvalidState`].
    pub fn payment_url(&self, sale_id: SaleId) -> Result<PaymentSession, TicketError> {
        let sale = self
            .sales
            .get(&sale_id)
            .ok_or(TicketError::NotFound { entity: "sale" })?;
        if sale.status() != SaleStatus::Pending {
            return Err(TicketError::InvalidState("sale is no longer pending"));
        }
        if sale.payment_token().is_some() {
            return Err(TicketError::InvalidState(
                "payment already requested for this sale",
            ));
        }

        let (success_url, cancel_url) = self.pages.urls_for(sale_id);
        let request = PaymentRequest {
            amount: sale.amount(),
            reference: format!("TICKET-{sale_id}"),
            contact: sale.contact(),
            success_url,
            cancel_url,
        };
        let session = self.payments.request_payment(&request)?;
        // A concurrent caller may have won the race since the pre-check;
        // store_payment_token re-validates under the sale lock.
        sale.store_payment_token(session.token.clone())?;
        Ok(session)
    }

    /// Applies a payment outcome to a sale. Safe to call any number of
    /// times, in any order: settled sales absorb further deliveries.
    ///
    /// A completion notifies the buyer (failures are logged, never fatal);
    /// a failure cancels the sale and returns its tickets to the pool.
    pub fn apply_outcome(
        &self,
        sale_id: SaleId,
        outcome: PaymentOutcome,
    ) -> Result<SaleStatus, TicketError> {
        let sale = self
            .sales
            .get(&sale_id)
            .ok_or(TicketError::NotFound { entity: "sale" })?;
        let category = sale.category();
        let settlement = sale.settle(outcome)?;
        match settlement {
            Settlement::Paid { contact, quantity } => {
                log::info!("sale {sale_id} paid: {quantity} ticket(s)");
                let message =
                    format!("Payment received: {quantity} ticket(s) confirmed, reference TICKET-{sale_id}");
                if let Err(err) = self.notifier.notify(&contact, &message) {
                    log::warn!("notification for sale {sale_id} failed: {err}");
                }
            }
            Settlement::Cancelled { tickets } => {
                log::info!("sale {sale_id} cancelled, releasing {} ticket(s)", tickets.len());
                self.inventory.release(category, &tickets)?;
            }
            Settlement::AlreadySettled => {
                log::debug!("sale {sale_id}: duplicate outcome delivery ignored");
            }
        }
        Ok(sale.status())
    }

    /// Admits a scanned ticket code at the gate.
    ///
    /// Unknown, unsold, and already-used codes all fail with the same
    /// [`TicketError::TicketNotAdmissible`]. Under concurrent scans of one
    /// code exactly one operator wins.
    pub fn check_in(
        &self,
        code: &TicketCode,
        operator: OperatorId,
    ) -> Result<CheckIn, TicketError> {
        let locator = self
            .registry
            .resolve(code)
            .ok_or(TicketError::TicketNotAdmissible)?;
        let ticket = self.inventory.redeem(locator.category, locator.ticket)?;
        let entry = self.gate_log.record(ticket.id, ticket.sale, operator);
        log::info!("ticket {} admitted by operator {operator}", ticket.id);
        Ok(entry)
    }

    /// Admissions performed by one gate operator.
    pub fn check_ins_by_operator(&self, operator: OperatorId) -> Vec<CheckIn> {
        self.gate_log.by_operator(operator)
    }

    /// Occupancy counters for one category.
    pub fn counts(&self, category: CategoryId) -> Result<CategoryCounts, TicketError> {
        self.inventory.counts(category)
    }

    /// Occupancy counters for every category.
    pub fn counts_all(&self) -> Vec<(CategoryId, CategoryCounts)> {
        self.inventory.counts_all()
    }

    /// Point-in-time view of a sale.
    pub fn sale(&self, sale_id: SaleId) -> Option<SaleSnapshot> {
        self.sales.get(&sale_id).map(|sale| sale.snapshot())
    }

    /// Tickets currently attached to a sale, in claim order.
    pub fn sale_tickets(&self, sale_id: SaleId) -> Vec<Ticket> {
        let Some(sale) = self.sales.get(&sale_id) else {
            return Vec::new();
        };
        let category = sale.category();
        sale.ticket_ids()
            .iter()
            .filter_map(|id| self.inventory.ticket_snapshot(category, *id))
            .collect()
    }

    /// Revenue summary over paid sales only.
    pub fn sales_stats(&self) -> SalesStats {
        let mut stats = SalesStats {
            total_sales: 0,
            total_revenue: Decimal::ZERO,
            total_tickets: 0,
        };
        for entry in self.sales.iter() {
            let snapshot = entry.value().snapshot();
            if snapshot.status == SaleStatus::Paid {
                stats.total_sales += 1;
                stats.total_revenue += snapshot.amount;
                stats.total_tickets += snapshot.quantity;
            }
        }
        stats
    }

    // ------------------------------------------------------------------
    // Access cards
    // ------------------------------------------------------------------

    /// Creates one access card for a holder. The card number is rendered
    /// before the card is stored, like ticket codes.
    pub fn issue_card(
        &self,
        holder: BuyerId,
        price: Decimal,
    ) -> Result<CardSnapshot, TicketError> {
        let card = card::issue_card(holder, price)?;
        self.renderer.render(&card.number.0)?;
        self.cards.add_card(&card);
        Ok(card)
    }

    pub fn block_card(&self, id: CardId) -> Result<(), TicketError> {
        self.cards.block(id)
    }

    pub fn disable_card(&self, id: CardId) -> Result<(), TicketError> {
        self.cards.disable(id)
    }

    pub fn activate_card(&self, id: CardId) -> Result<(), TicketError> {
        self.cards.activate(id)
    }

    pub fn sell_card(&self, id: CardId) -> Result<(), TicketError> {
        self.cards.mark_sold(id)
    }

    pub fn card(&self, id: CardId) -> Option<CardSnapshot> {
        self.cards.snapshot(id)
    }

    pub fn card_stats(&self) -> CardStats {
        self.cards.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn buyer(phone: &str) -> BuyerProfile {
        BuyerProfile {
            phone: phone.to_string(),
            first_name: "Awa".to_string(),
            last_name: "Ndiaye".to_string(),
            email: None,
        }
    }

    fn stocked_office(quantity: u32) -> (BoxOffice, CategoryId) {
        let office = BoxOffice::new();
        let category = CategoryId::new();
        office
            .issue_tickets(category, EventId::new(), dec!(1000), quantity, Channel::Online)
            .unwrap();
        (office, category)
    }

    #[test]
    fn reserve_opens_pending_sale_with_summed_amount() {
        let (office, category) = stocked_office(5);
        let sale = office.reserve(category, 3, &buyer("+221770000001")).unwrap();
        assert_eq!(sale.status, SaleStatus::Pending);
        assert_eq!(sale.quantity, 3);
        assert_eq!(sale.amount, dec!(3000));
        assert_eq!(office.counts(category).unwrap().available, 2);
    }

    #[test]
    fn reserve_of_zero_is_rejected() {
        let (office, category) = stocked_office(1);
        assert!(matches!(
            office.reserve(category, 0, &buyer("+221770000001")),
            Err(TicketError::Validation { field: "quantity", .. })
        ));
    }

    #[test]
    fn failed_reserve_removes_identity_it_created() {
        let directory = Arc::new(PhoneDirectory::new());
        let office = BoxOffice::with_collaborators(
            directory.clone(),
            Arc::new(OfflineProvider),
            Arc::new(LogNotifier),
            Arc::new(PlainRenderer),
            PaymentPages::default(),
        );
        let category = CategoryId::new();
        office
            .issue_tickets(category, EventId::new(), dec!(1000), 1, Channel::Online)
            .unwrap();

        let result = office.reserve(category, 5, &buyer("+221770000002"));
        assert!(matches!(
            result,
            Err(TicketError::InsufficientInventory { requested: 5, available: 1 })
        ));
        // Identity created for the failed purchase was compensated away.
        let resolved = directory.find_or_create(&buyer("+221770000002")).unwrap();
        assert!(resolved.created);
    }

    #[test]
    fn failed_reserve_keeps_preexisting_identity() {
        let directory = Arc::new(PhoneDirectory::new());
        let office = BoxOffice::with_collaborators(
            directory.clone(),
            Arc::new(OfflineProvider),
            Arc::new(LogNotifier),
            Arc::new(PlainRenderer),
            PaymentPages::default(),
        );
        let category = CategoryId::new();
        office
            .issue_tickets(category, EventId::new(), dec!(1000), 3, Channel::Online)
            .unwrap();

        let first = office.reserve(category, 1, &buyer("+221770000003")).unwrap();
        let result = office.reserve(category, 5, &buyer("+221770000003"));
        assert!(result.is_err());

        let resolved = directory.find_or_create(&buyer("+221770000003")).unwrap();
        assert!(!resolved.created);
        assert_eq!(resolved.buyer, first.buyer);
    }

    #[test]
    fn payment_flow_pays_sale_and_counts_revenue() {
        let (office, category) = stocked_office(5);
        let sale = office.reserve(category, 2, &buyer("+221770000004")).unwrap();
        let session = office.payment_url(sale.id).unwrap();
        assert!(session.redirect_url.contains(&session.token));

        let status = office
            .apply_outcome(sale.id, PaymentOutcome::Completed)
            .unwrap();
        assert_eq!(status, SaleStatus::Paid);

        let stats = office.sales_stats();
        assert_eq!(stats.total_sales, 1);
        assert_eq!(stats.total_revenue, dec!(2000));
        assert_eq!(stats.total_tickets, 2);
    }

    #[test]
    fn second_payment_url_is_rejected() {
        let (office, category) = stocked_office(2);
        let sale = office.reserve(category, 1, &buyer("+221770000005")).unwrap();
        office.payment_url(sale.id).unwrap();
        assert!(matches!(
            office.payment_url(sale.id),
            Err(TicketError::InvalidState(_))
        ));
    }

    #[test]
    fn outcome_without_payment_request_is_spurious() {
        let (office, category) = stocked_office(2);
        let sale = office.reserve(category, 1, &buyer("+221770000006")).unwrap();
        assert_eq!(
            office.apply_outcome(sale.id, PaymentOutcome::Completed),
            Err(TicketError::NoPendingPayment)
        );
    }

    #[test]
    fn cancellation_returns_tickets_to_pool() {
        let (office, category) = stocked_office(3);
        let sale = office.reserve(category, 3, &buyer("+221770000007")).unwrap();
        office.payment_url(sale.id).unwrap();
        let status = office.apply_outcome(sale.id, PaymentOutcome::Failed).unwrap();
        assert_eq!(status, SaleStatus::Cancelled);

        let counts = office.counts(category).unwrap();
        assert_eq!(counts.available, 3);
        assert_eq!(counts.sold, 0);

        let snapshot = office.sale(sale.id).unwrap();
        assert_eq!(snapshot.amount, Decimal::ZERO);
        assert!(snapshot.tickets.is_empty());
    }

    #[test]
    fn check_in_admits_sold_ticket_once() {
        let (office, category) = stocked_office(2);
        let sale = office.reserve(category, 1, &buyer("+221770000008")).unwrap();
        office.payment_url(sale.id).unwrap();
        office
            .apply_outcome(sale.id, PaymentOutcome::Completed)
            .unwrap();

        let ticket = office.sale_tickets(sale.id).remove(0);
        let operator = OperatorId::new();
        let entry = office.check_in(&ticket.code, operator).unwrap();
        assert_eq!(entry.ticket, ticket.id);
        assert_eq!(entry.sale, Some(sale.id));

        assert_eq!(
            office.check_in(&ticket.code, operator),
            Err(TicketError::TicketNotAdmissible)
        );
        assert_eq!(office.check_ins_by_operator(operator).len(), 1);
    }

    struct BrokenRenderer;

    impl crate::external::CodeRenderer for BrokenRenderer {
        fn render(&self, _payload: &str) -> Result<Vec<u8>, TicketError> {
            Err(TicketError::ExternalService {
                service: "renderer",
                reason: "out of ink".to_string(),
            })
        }
    }

    #[test]
    fn issued_card_is_stored_and_sellable() {
        let office = BoxOffice::new();
        let card = office.issue_card(BuyerId::new(), dec!(5000)).unwrap();
        office.sell_card(card.id).unwrap();

        let stats = office.card_stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.sold, 1);
        assert!(office.card(card.id).unwrap().sold);
    }

    #[test]
    fn render_failure_aborts_issuance_entirely() {
        let office = BoxOffice::with_collaborators(
            Arc::new(PhoneDirectory::new()),
            Arc::new(OfflineProvider),
            Arc::new(LogNotifier),
            Arc::new(BrokenRenderer),
            PaymentPages::default(),
        );
        let category = CategoryId::new();
        let result =
            office.issue_tickets(category, EventId::new(), dec!(1000), 3, Channel::Online);
        assert!(matches!(result, Err(TicketError::ExternalService { .. })));
        // Nothing was stored or registered.
        assert_eq!(
            office.counts(category),
            Err(TicketError::NotFound { entity: "category" })
        );

        let card = office.issue_card(BuyerId::new(), dec!(5000));
        assert!(card.is_err());
        assert_eq!(office.card_stats().total, 0);
    }

    #[test]
    fn unsold_and_unknown_codes_are_not_admissible() {
        let office = BoxOffice::new();
        let category = CategoryId::new();
        let batch = office
            .issue_tickets(category, EventId::new(), dec!(1000), 1, Channel::Print)
            .unwrap();

        // Issued but never sold.
        assert_eq!(
            office.check_in(&batch[0].code, OperatorId::new()),
            Err(TicketError::TicketNotAdmissible)
        );
        // Never issued at all.
        assert_eq!(
            office.check_in(&TicketCode("TKT-bogus".into()), OperatorId::new()),
            Err(TicketError::TicketNotAdmissible)
        );
    }
}
