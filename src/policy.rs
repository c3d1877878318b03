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

//! Role-based authorization.
//!
//! A flat role/action matrix: back-office roles run issuance, reporting and
//! card management; gate operators check tickets in; purchasing and payment
//! callbacks are open to everyone.

use crate::error::TicketError;
use serde::{Deserialize, Serialize};

/// Actor role attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    ClubManager,
    Gate,
    Supporter,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "super_admin" => Some(Role::SuperAdmin),
            "admin" => Some(Role::Admin),
            "club_manager" => Some(Role::ClubManager),
            "gate" => Some(Role::Gate),
            "supporter" => Some(Role::Supporter),
            _ => None,
        }
    }

    fn is_back_office(self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin | Role::ClubManager)
    }
}

/// Actions the policy gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    IssueTickets,
    ViewInventory,
    ViewSalesStats,
    ManageCards,
    CheckIn,
    ViewOwnCheckIns,
    Purchase,
    PaymentCallback,
}

/// Checks whether `role` may perform `action`.
pub fn authorize(role: Role, action: Action) -> Result<(), TicketError> {
    let allowed = match action {
        Action::IssueTickets
        | Action::ViewInventory
        | Action::ViewSalesStats
        | Action::ManageCards => role.is_back_office(),
        Action::CheckIn | Action::ViewOwnCheckIns => role == Role::Gate,
        Action::Purchase | Action::PaymentCallback => true,
    };
    if allowed {
        Ok(())
    } else {
        Err(TicketError::Forbidden)
    }
}
