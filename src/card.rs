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

//! Physical access cards.
//!
//! Cards are created singly for a holder, unlike tickets which are issued in
//! batches. Each card carries two independent pieces of state: an
//! operational status (active, blocked, disabled) that moves freely, and a
//! sold latch that only ever goes one way. Blocking a sold card does not
//! unsell it.

use crate::base::{BuyerId, CardId, CardNumber};
use crate::error::TicketError;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operational status of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Active,
    Blocked,
    Disabled,
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CardStatus::Active => "active",
            CardStatus::Blocked => "blocked",
            CardStatus::Disabled => "disabled",
        };
        write!(f, "{s}")
    }
}

/// Deck-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CardStats {
    pub total: u32,
    pub sold: u32,
    pub unsold: u32,
}

/// Immutable view of one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardSnapshot {
    pub id: CardId,
    pub number: CardNumber,
    pub holder: BuyerId,
    pub price: Decimal,
    pub status: CardStatus,
    pub sold: bool,
}

#[derive(Debug)]
struct CardData {
    number: CardNumber,
    holder: BuyerId,
    price: Decimal,
    status: CardStatus,
    sold: bool,
}

/// Concurrent store of access cards.
#[derive(Debug, Default)]
pub struct CardDeck {
    cards: DashMap<CardId, Mutex<CardData>>,
}

impl CardDeck {
    pub fn new() -> Self {
        CardDeck {
            cards: DashMap::new(),
        }
    }

    /// Stores a freshly built card (see [`issue_card`]).
    pub fn add_card(&self, card: &CardSnapshot) {
        self.cards.insert(
            card.id,
            Mutex::new(CardData {
                number: card.number.clone(),
                holder: card.holder,
                price: card.price,
                status: card.status,
                sold: card.sold,
            }),
        );
    }

    fn with_card<T>(
        &self,
        id: CardId,
        f: impl FnOnce(&mut CardData) -> Result<T, TicketError>,
    ) -> Result<T, TicketError> {
        let card = self
            .cards
            .get(&id)
            .ok_or(TicketError::NotFound { entity: "card" })?;
        let mut data = card.lock();
        f(&mut data)
    }

    pub fn block(&self, id: CardId) -> Result<(), TicketError> {
        self.with_card(id, |data| {
            data.status = CardStatus::Blocked;
            Ok(())
        })
    }

    pub fn disable(&self, id: CardId) -> Result<(), TicketError> {
        self.with_card(id, |data| {
            data.status = CardStatus::Disabled;
            Ok(())
        })
    }

    pub fn activate(&self, id: CardId) -> Result<(), TicketError> {
        self.with_card(id, |data| {
            data.status = CardStatus::Active;
            Ok(())
        })
    }

    /// Latches the card as sold. One way: selling a sold card fails.
    pub fn mark_sold(&self, id: CardId) -> Result<(), TicketError> {
        self.with_card(id, |data| {
            if data.sold {
                return Err(TicketError::InvalidState("card already sold"));
            }
            data.sold = true;
            Ok(())
        })
    }

    pub fn snapshot(&self, id: CardId) -> Option<CardSnapshot> {
        let card = self.cards.get(&id)?;
        let data = card.lock();
        Some(CardSnapshot {
            id,
            number: data.number.clone(),
            holder: data.holder,
            price: data.price,
            status: data.status,
            sold: data.sold,
        })
    }

    pub fn stats(&self) -> CardStats {
        let mut stats = CardStats {
            total: 0,
            sold: 0,
            unsold: 0,
        };
        for entry in self.cards.iter() {
            let data = entry.value().lock();
            stats.total += 1;
            if data.sold {
                stats.sold += 1;
            } else {
                stats.unsold += 1;
            }
        }
        stats
    }
}

/// Builds one active, unsold card for a holder, with a number derived from
/// its fresh id.
pub fn issue_card(holder: BuyerId, price: Decimal) -> Result<CardSnapshot, TicketError> {
    if price < Decimal::ZERO {
        return Err(TicketError::Validation {
            field: "price",
            reason: "must not be negative",
        });
    }
    let id = CardId::new();
    Ok(CardSnapshot {
        id,
        number: CardNumber::for_card(&id),
        holder,
        price,
        status: CardStatus::Active,
        sold: false,
    })
}
