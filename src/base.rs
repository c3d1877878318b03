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

//! Core identifier types for tickets, sales, and the people around them.
//!
//! All identifiers wrap a v4 [`Uuid`]. The machine-readable codes printed on
//! tickets and cards ([`TicketCode`], [`CardNumber`]) are derived from the
//! owning identifier and are not secrets.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generates a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a single admission ticket.
    TicketId
);
uuid_id!(
    /// Unique identifier for a sale aggregate (one buyer, one purchase).
    SaleId
);
uuid_id!(
    /// Unique identifier for a pricing/seating tier scoping ticket inventory.
    CategoryId
);
uuid_id!(
    /// Unique identifier for a scheduled event.
    EventId
);
uuid_id!(
    /// Unique identifier for a buyer resolved by the identity service.
    BuyerId
);
uuid_id!(
    /// Unique identifier for a gate operator.
    OperatorId
);
uuid_id!(
    /// Unique identifier for an access card.
    CardId
);
uuid_id!(
    /// Unique identifier for a check-in record.
    CheckInId
);

/// Machine-readable code carried by a ticket.
///
/// Derived from the ticket id at issuance (`TKT-<uuid-simple>`), so a code
/// generated for a ticket always resolves back to that ticket. Uniqueness is
/// additionally enforced by the code registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TicketCode(pub String);

impl TicketCode {
    pub fn for_ticket(id: &TicketId) -> Self {
        TicketCode(format!("TKT-{}", id.0.simple()))
    }

    /// The payload handed to the code-rendering service.
    pub fn payload(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Printed number of an access card, derived from the card id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CardNumber(pub String);

impl CardNumber {
    pub fn for_card(id: &CardId) -> Self {
        CardNumber(format!("CRD-{}", id.0.simple()))
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_code_embeds_ticket_id() {
        let id = TicketId::new();
        let code = TicketCode::for_ticket(&id);
        assert!(code.0.starts_with("TKT-"));
        assert!(code.0.contains(&id.0.simple().to_string()));
    }

    #[test]
    fn distinct_tickets_get_distinct_codes() {
        let a = TicketCode::for_ticket(&TicketId::new());
        let b = TicketCode::for_ticket(&TicketId::new());
        assert_ne!(a, b);
    }

    #[test]
    fn card_number_embeds_card_id() {
        let id = CardId::new();
        let number = CardNumber::for_card(&id);
        assert!(number.0.starts_with("CRD-"));
    }
}
