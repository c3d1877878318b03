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

//! Error types for the ticket lifecycle engine.

use thiserror::Error;

/// Ticket lifecycle errors.
///
/// Inventory and state errors carry enough detail for the caller to act;
/// compensating actions (ticket release, buyer cleanup) have already run by
/// the time one of these surfaces.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    /// Malformed input; the caller must correct and resubmit
    #[error("invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: &'static str,
    },

    /// A referenced entity does not exist
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Not enough available tickets in the category
    #[error("insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: u32, available: u32 },

    /// Operation not valid for the entity's current lifecycle state
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Ticket cannot be admitted at the gate.
    ///
    /// Deliberately covers both "never purchased" and "already used" so a
    /// rejected code reveals nothing about why it was rejected.
    #[error("ticket not admissible")]
    TicketNotAdmissible,

    /// Payment outcome received for a sale that never requested payment
    #[error("no pending payment for this sale")]
    NoPendingPayment,

    /// Generated code collides with one already registered
    #[error("duplicate ticket code")]
    DuplicateCode,

    /// Actor's role does not permit the action
    #[error("forbidden: role does not permit this action")]
    Forbidden,

    /// An external collaborator (identity, payment, rendering) failed
    #[error("external service failure ({service}): {reason}")]
    ExternalService {
        service: &'static str,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::TicketError;

    #[test]
    fn error_display_messages() {
        assert_eq!(
            TicketError::Validation {
                field: "quantity",
                reason: "must be at least 1"
            }
            .to_string(),
            "invalid quantity: must be at least 1"
        );
        assert_eq!(
            TicketError::NotFound { entity: "sale" }.to_string(),
            "sale not found"
        );
        assert_eq!(
            TicketError::InsufficientInventory {
                requested: 3,
                available: 2
            }
            .to_string(),
            "insufficient inventory: requested 3, available 2"
        );
        assert_eq!(
            TicketError::TicketNotAdmissible.to_string(),
            "ticket not admissible"
        );
        assert_eq!(
            TicketError::NoPendingPayment.to_string(),
            "no pending payment for this sale"
        );
        assert_eq!(TicketError::DuplicateCode.to_string(), "duplicate ticket code");
        assert_eq!(
            TicketError::ExternalService {
                service: "payment",
                reason: "timeout".into()
            }
            .to_string(),
            "external service failure (payment): timeout"
        );
    }

    #[test]
    fn errors_are_cloneable() {
        let error = TicketError::TicketNotAdmissible;
        let cloned = error.clone();
        assert_eq!(error, cloned);
    }
}
