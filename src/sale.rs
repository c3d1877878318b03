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

//! Sale aggregates and payment settlement.
//!
//! A [`Sale`] groups the tickets one buyer reserved in one purchase. Its
//! status moves along a monotonic lattice:
//!
//  Sale (Pending) ──completed──► Sale (Paid)
//         │
//         └──other outcome──► Sale (Cancelled) + tickets released
//
//! There are no transitions out of `Paid` or `Cancelled`, which is what makes
//! duplicate or out-of-order provider deliveries safe to re-apply.

use crate::base::{BuyerId, CategoryId, EventId, SaleId, TicketId};
use crate::error::TicketError;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;
use std::fmt;
use std::mem;

/// Settlement status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Pending,
    Paid,
    Cancelled,
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Paid => "paid",
            SaleStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Final outcome reported by the payment provider.
///
/// Anything the provider reports that is not `completed` maps to [`Failed`];
/// the engine treats all non-completions the same way.
///
/// [`Failed`]: PaymentOutcome::Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Completed,
    Failed,
}

impl PaymentOutcome {
    /// Maps a raw provider status string to an outcome.
    pub fn from_provider_status(status: &str) -> Self {
        if status.eq_ignore_ascii_case("completed") {
            PaymentOutcome::Completed
        } else {
            PaymentOutcome::Failed
        }
    }
}

/// Effect of applying a payment outcome, reported back to the engine so it
/// can run the follow-up (notify the buyer, release tickets) outside the
/// sale's critical section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Sale transitioned `Pending` → `Paid`; the buyer should be notified.
    Paid { contact: String, quantity: u32 },
    /// Sale transitioned `Pending` → `Cancelled`; these tickets must be
    /// returned to the available pool.
    Cancelled { tickets: Vec<TicketId> },
    /// Sale was already settled; duplicate delivery, nothing to do.
    AlreadySettled,
}

#[derive(Debug)]
struct SaleData {
    id: SaleId,
    event: EventId,
    category: CategoryId,
    buyer: BuyerId,
    /// Phone contact captured at reservation, used for payment and notification.
    contact: String,
    quantity: u32,
    amount: Decimal,
    status: SaleStatus,
    payment_token: Option<String>,
    tickets: Vec<TicketId>,
}

/// A buyer's purchase aggregate.
///
/// All mutation happens under the internal mutex; concurrent outcome
/// deliveries serialize here and the status lattice decides the winner.
#[derive(Debug)]
pub struct Sale {
    inner: Mutex<SaleData>,
}

impl Sale {
    /// Opens a pending sale over an already-claimed set of tickets.
    pub fn open(
        id: SaleId,
        event: EventId,
        category: CategoryId,
        buyer: BuyerId,
        contact: String,
        tickets: Vec<TicketId>,
        amount: Decimal,
    ) -> Self {
        let quantity = tickets.len() as u32;
        Sale {
            inner: Mutex::new(SaleData {
                id,
                event,
                category,
                buyer,
                contact,
                quantity,
                amount,
                status: SaleStatus::Pending,
                payment_token: None,
                tickets,
            }),
        }
    }

    pub fn id(&self) -> SaleId {
        self.inner.lock().id
    }

    pub fn status(&self) -> SaleStatus {
        self.inner.lock().status
    }

    pub fn amount(&self) -> Decimal {
        self.inner.lock().amount
    }

    pub fn quantity(&self) -> u32 {
        self.inner.lock().quantity
    }

    pub fn category(&self) -> CategoryId {
        self.inner.lock().category
    }

    pub fn contact(&self) -> String {
        self.inner.lock().contact.clone()
    }

    pub fn payment_token(&self) -> Option<String> {
        self.inner.lock().payment_token.clone()
    }

    /// Tickets currently attached to this sale.
    pub fn ticket_ids(&self) -> Vec<TicketId> {
        self.inner.lock().tickets.clone()
    }

    /// Records the provider token issued for this sale.
    ///
    /// The token is set once: a second payment request against the same sale
    /// fails with [`TicketError::InvalidState`], as does a request against a
    /// sale that is no longer pending.
    pub fn store_payment_token(&self, token: String) -> Result<(), TicketError> {
        let mut data = self.inner.lock();
        if data.status != SaleStatus::Pending {
            return Err(TicketError::InvalidState("sale is no longer pending"));
        }
        if data.payment_token.is_some() {
            return Err(TicketError::InvalidState(
                "payment already requested for this sale",
            ));
        }
        data.payment_token = Some(token);
        Ok(())
    }

    /// Applies a provider outcome to the sale.
    ///
    /// # Errors
    ///
    /// [`TicketError::NoPendingPayment`] if the sale is pending but no
    /// payment token was ever issued — a spurious callback.
    pub fn settle(&self, outcome: PaymentOutcome) -> Result<Settlement, TicketError> {
        let mut data = self.inner.lock();
        match data.status {
            // Settled sales absorb any further delivery, in any order.
            SaleStatus::Paid | SaleStatus::Cancelled => Ok(Settlement::AlreadySettled),
            SaleStatus::Pending => {
                if data.payment_token.is_none() {
                    return Err(TicketError::NoPendingPayment);
                }
                match outcome {
                    PaymentOutcome::Completed => {
                        data.status = SaleStatus::Paid;
                        Ok(Settlement::Paid {
                            contact: data.contact.clone(),
                            quantity: data.quantity,
                        })
                    }
                    PaymentOutcome::Failed => {
                        data.status = SaleStatus::Cancelled;
                        data.payment_token = None;
                        data.amount = Decimal::ZERO;
                        let tickets = mem::take(&mut data.tickets);
                        Ok(Settlement::Cancelled { tickets })
                    }
                }
            }
        }
    }

    /// Point-in-time copy of the sale for reporting and wire responses.
    pub fn snapshot(&self) -> SaleSnapshot {
        let data = self.inner.lock();
        SaleSnapshot {
            id: data.id,
            event: data.event,
            category: data.category,
            buyer: data.buyer,
            quantity: data.quantity,
            amount: data.amount,
            status: data.status,
            payment_token: data.payment_token.clone(),
            tickets: data.tickets.clone(),
        }
    }
}

/// Immutable view of a [`Sale`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct SaleSnapshot {
    pub id: SaleId,
    pub event: EventId,
    pub category: CategoryId,
    pub buyer: BuyerId,
    pub quantity: u32,
    pub amount: Decimal,
    pub status: SaleStatus,
    pub payment_token: Option<String>,
    pub tickets: Vec<TicketId>,
}

impl Serialize for Sale {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.inner.lock();
        let mut state = serializer.serialize_struct("Sale", 6)?;
        state.serialize_field("id", &data.id)?;
        state.serialize_field("event", &data.event)?;
        state.serialize_field("category", &data.category)?;
        state.serialize_field("quantity", &data.quantity)?;
        state.serialize_field("amount", &data.amount)?;
        state.serialize_field("status", &data.status)?;
        state.end()
    }
}
