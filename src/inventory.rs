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

//! Per-category ticket inventory.
//!
//! Each category owns a shelf of tickets guarded by one mutex. Claims,
//! releases, and redemptions are single critical sections on that mutex,
//! which is what makes a claim all-or-nothing: either every requested ticket
//! flips to sold inside the section, or none does.

use crate::base::{CategoryId, EventId, SaleId, TicketId};
use crate::error::TicketError;
use crate::ticket::{Channel, Ticket, TicketStatus};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;

/// Per-category occupancy counters.
///
/// Conservation holds at every point: `available + sold + used == issued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub issued: u32,
    pub available: u32,
    pub sold: u32,
    pub used: u32,
}

#[derive(Debug)]
struct ShelfData {
    event: EventId,
    unit_price: Decimal,
    /// Creation order; claims always take the oldest available tickets first.
    tickets: Vec<Ticket>,
}

impl ShelfData {
    fn available(&self) -> u32 {
        self.tickets.iter().filter(|t| t.is_available()).count() as u32
    }

    fn claim(&mut self, quantity: u32, sale: SaleId) -> Result<(Vec<TicketId>, Decimal), TicketError> {
        let available = self.available();
        if available < quantity {
            return Err(TicketError::InsufficientInventory {
                requested: quantity,
                available,
            });
        }
        let mut claimed = Vec::with_capacity(quantity as usize);
        let mut amount = Decimal::ZERO;
        for ticket in self.tickets.iter_mut().filter(|t| t.is_available()) {
            if claimed.len() as u32 == quantity {
                break;
            }
            ticket.status = TicketStatus::Sold;
            ticket.sale = Some(sale);
            amount += ticket.unit_price;
            claimed.push(ticket.id);
        }
        Ok((claimed, amount))
    }

    fn release(&mut self, ids: &[TicketId]) {
        for ticket in &mut self.tickets {
            if !ids.contains(&ticket.id) {
                continue;
            }
            // Used is terminal; a released ticket that was already admitted
            // stays admitted.
            if ticket.status == TicketStatus::Sold {
                ticket.status = TicketStatus::Available;
                ticket.sale = None;
            }
        }
    }

    fn redeem(&mut self, id: TicketId) -> Result<Ticket, TicketError> {
        let ticket = self
            .tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TicketError::TicketNotAdmissible)?;
        if ticket.status != TicketStatus::Sold {
            return Err(TicketError::TicketNotAdmissible);
        }
        ticket.status = TicketStatus::Used;
        Ok(ticket.clone())
    }

    fn counts(&self) -> CategoryCounts {
        let mut counts = CategoryCounts {
            issued: self.tickets.len() as u32,
            available: 0,
            sold: 0,
            used: 0,
        };
        for ticket in &self.tickets {
            match ticket.status {
                TicketStatus::Available => counts.available += 1,
                TicketStatus::Sold => counts.sold += 1,
                TicketStatus::Used => counts.used += 1,
            }
        }
        counts
    }
}

/// One category's shelf of tickets.
#[derive(Debug)]
struct CategoryShelf {
    inner: Mutex<ShelfData>,
}

impl CategoryShelf {
    fn new(event: EventId, unit_price: Decimal) -> Self {
        CategoryShelf {
            inner: Mutex::new(ShelfData {
                event,
                unit_price,
                tickets: Vec::new(),
            }),
        }
    }
}

/// Concurrent store of ticket shelves keyed by category.
#[derive(Debug, Default)]
pub struct InventoryStore {
    shelves: DashMap<CategoryId, CategoryShelf>,
}

impl InventoryStore {
    pub fn new() -> Self {
        InventoryStore {
            shelves: DashMap::new(),
        }
    }

    /// Adds an issued batch of tickets to a category's shelf.
    ///
    /// The first batch binds the category to its event and unit price; later
    /// batches must match that binding or the whole batch is rejected.
    pub fn add_batch(
        &self,
        category: CategoryId,
        event: EventId,
        unit_price: Decimal,
        tickets: Vec<Ticket>,
    ) -> Result<(), TicketError> {
        let shelf = self
            .shelves
            .entry(category)
            .or_insert_with(|| CategoryShelf::new(event, unit_price));
        let mut data = shelf.inner.lock();
        if data.event != event {
            return Err(TicketError::Validation {
                field: "event",
                reason: "category is bound to a different event",
            });
        }
        if data.unit_price != unit_price {
            return Err(TicketError::Validation {
                field: "unit_price",
                reason: "category is bound to a different unit price",
            });
        }
        data.tickets.extend(tickets);
        Ok(())
    }

    /// Claims `quantity` available tickets for a sale, oldest first.
    ///
    /// All-or-nothing: on [`TicketError::InsufficientInventory`] no ticket
    /// has changed state. Returns the claimed ids and the summed price.
    pub fn claim_available(
        &self,
        category: CategoryId,
        quantity: u32,
        sale: SaleId,
    ) -> Result<(Vec<TicketId>, Decimal), TicketError> {
        let shelf = self
            .shelves
            .get(&category)
            .ok_or(TicketError::NotFound { entity: "category" })?;
        let mut data = shelf.inner.lock();
        data.claim(quantity, sale)
    }

    /// Returns sold tickets to the available pool after a cancellation.
    ///
    /// Tickets already admitted at the gate are left untouched.
    pub fn release(&self, category: CategoryId, tickets: &[TicketId]) -> Result<(), TicketError> {
        let shelf = self
            .shelves
            .get(&category)
            .ok_or(TicketError::NotFound { entity: "category" })?;
        let mut data = shelf.inner.lock();
        data.release(tickets);
        Ok(())
    }

    /// Marks a sold ticket as used. The returned snapshot carries the sale
    /// reference for the gate log.
    ///
    /// # Errors
    ///
    /// [`TicketError::TicketNotAdmissible`] if the ticket is unknown to the
    /// shelf, still unsold, or already used.
    pub fn redeem(&self, category: CategoryId, ticket: TicketId) -> Result<Ticket, TicketError> {
        let shelf = self
            .shelves
            .get(&category)
            .ok_or(TicketError::TicketNotAdmissible)?;
        let mut data = shelf.inner.lock();
        data.redeem(ticket)
    }

    /// Point-in-time copy of one ticket.
    pub fn ticket_snapshot(&self, category: CategoryId, ticket: TicketId) -> Option<Ticket> {
        let shelf = self.shelves.get(&category)?;
        let data = shelf.inner.lock();
        data.tickets.iter().find(|t| t.id == ticket).cloned()
    }

    /// Tickets of a sale still attached to it, in creation order.
    pub fn tickets_of_sale(&self, category: CategoryId, sale: SaleId) -> Vec<Ticket> {
        let Some(shelf) = self.shelves.get(&category) else {
            return Vec::new();
        };
        let data = shelf.inner.lock();
        data.tickets
            .iter()
            .filter(|t| t.sale == Some(sale))
            .cloned()
            .collect()
    }

    /// Occupancy counters for one category.
    pub fn counts(&self, category: CategoryId) -> Result<CategoryCounts, TicketError> {
        let shelf = self
            .shelves
            .get(&category)
            .ok_or(TicketError::NotFound { entity: "category" })?;
        let data = shelf.inner.lock();
        Ok(data.counts())
    }

    /// Occupancy counters for every known category.
    pub fn counts_all(&self) -> Vec<(CategoryId, CategoryCounts)> {
        self.shelves
            .iter()
            .map(|entry| {
                let data = entry.value().inner.lock();
                (*entry.key(), data.counts())
            })
            .collect()
    }

    /// The event a category's shelf is bound to.
    pub fn event_of(&self, category: CategoryId) -> Option<EventId> {
        let shelf = self.shelves.get(&category)?;
        let data = shelf.inner.lock();
        Some(data.event)
    }

    /// The unit price a category's shelf is bound to.
    pub fn unit_price_of(&self, category: CategoryId) -> Option<Decimal> {
        let shelf = self.shelves.get(&category)?;
        let data = shelf.inner.lock();
        Some(data.unit_price)
    }
}

/// Builds a batch of fresh tickets for a category.
pub fn issue_batch(
    category: CategoryId,
    event: EventId,
    unit_price: Decimal,
    quantity: u32,
    channel: Channel,
) -> Result<Vec<Ticket>, TicketError> {
    if quantity == 0 {
        return Err(TicketError::Validation {
            field: "quantity",
            reason: "must be at least 1",
        });
    }
    if unit_price < Decimal::ZERO {
        return Err(TicketError::Validation {
            field: "unit_price",
            reason: "must not be negative",
        });
    }
    Ok((0..quantity)
        .map(|_| Ticket::issue(category, event, unit_price, channel))
        .collect())
}
