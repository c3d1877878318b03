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

//! Ticket records and their lifecycle.
//!
//! Tickets follow a state machine:
//! - [`Available`] → [`Sold`] (via reservation claim)
//! - [`Sold`] → [`Available`] (via payment cancellation)
//! - [`Sold`] → [`Used`] (via gate check-in)
//!
//! [`Used`] is terminal; no path returns from it.
//!
//! [`Available`]: TicketStatus::Available
//! [`Sold`]: TicketStatus::Sold
//! [`Used`]: TicketStatus::Used

use crate::base::{CategoryId, EventId, SaleId, TicketCode, TicketId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Available,
    Sold,
    Used,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TicketStatus::Available => "available",
            TicketStatus::Sold => "sold",
            TicketStatus::Used => "used",
        };
        write!(f, "{s}")
    }
}

/// Sale channel a ticket was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Print,
    Online,
}

impl Channel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "print" => Some(Channel::Print),
            "online" => Some(Channel::Online),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Print => write!(f, "print"),
            Channel::Online => write!(f, "online"),
        }
    }
}

/// A single numbered admission ticket.
///
/// Invariant: `sale` is `Some` iff `status` is `Sold` or `Used`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticket {
    pub id: TicketId,
    pub category: CategoryId,
    pub event: EventId,
    pub unit_price: Decimal,
    pub channel: Channel,
    pub code: TicketCode,
    pub status: TicketStatus,
    pub sale: Option<SaleId>,
}

impl Ticket {
    /// Creates a fresh `Available` ticket with a code derived from its id.
    pub fn issue(
        category: CategoryId,
        event: EventId,
        unit_price: Decimal,
        channel: Channel,
    ) -> Self {
        let id = TicketId::new();
        let code = TicketCode::for_ticket(&id);
        Ticket {
            id,
            category,
            event,
            unit_price,
            channel,
            code,
            status: TicketStatus::Available,
            sale: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == TicketStatus::Available
    }
}
