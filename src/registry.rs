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

//! Ticket code registry.
//!
//! The registry is the single lookup path from a scanned code back to the
//! ticket it belongs to, and the uniqueness gate for every code the system
//! ever issues. Registration uses the map's entry API so a concurrent
//! duplicate registration loses atomically rather than overwriting.

use crate::base::{CategoryId, TicketCode, TicketId};
use crate::error::TicketError;
use dashmap::DashMap;

/// Where a registered code points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketLocator {
    pub category: CategoryId,
    pub ticket: TicketId,
}

/// Concurrent map from ticket code to its ticket.
#[derive(Debug, Default)]
pub struct CodeRegistry {
    codes: DashMap<TicketCode, TicketLocator>,
}

impl CodeRegistry {
    pub fn new() -> Self {
        CodeRegistry {
            codes: DashMap::new(),
        }
    }

    /// Registers a code, rejecting collisions.
    ///
    /// # Errors
    ///
    /// [`TicketError::DuplicateCode`] if the code is already registered,
    /// even for the same ticket.
    pub fn register(&self, code: TicketCode, locator: TicketLocator) -> Result<(), TicketError> {
        match self.codes.entry(code) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(TicketError::DuplicateCode),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(locator);
                Ok(())
            }
        }
    }

    /// Resolves a scanned code to the ticket it was issued for.
    pub fn resolve(&self, code: &TicketCode) -> Option<TicketLocator> {
        self.codes.get(code).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
