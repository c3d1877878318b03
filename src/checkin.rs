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

//! Gate admission log.
//!
//! Every successful check-in appends one immutable record here. The log is
//! append-only; the single-use guarantee itself lives in the inventory (a
//! ticket only redeems once), so at most one record can ever exist per
//! ticket.

use crate::base::{CheckInId, OperatorId, SaleId, TicketId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// One admission at the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckIn {
    pub id: CheckInId,
    pub ticket: TicketId,
    pub sale: Option<SaleId>,
    pub operator: OperatorId,
    pub checkin_time: DateTime<Utc>,
}

/// Append-only log of gate admissions.
#[derive(Debug, Default)]
pub struct GateLog {
    entries: Mutex<Vec<CheckIn>>,
}

impl GateLog {
    pub fn new() -> Self {
        GateLog {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Records an admission and returns the stored entry.
    pub fn record(
        &self,
        ticket: TicketId,
        sale: Option<SaleId>,
        operator: OperatorId,
    ) -> CheckIn {
        let entry = CheckIn {
            id: CheckInId::new(),
            ticket,
            sale,
            operator,
            checkin_time: Utc::now(),
        };
        self.entries.lock().push(entry.clone());
        entry
    }

    /// Admissions performed by one operator, in admission order.
    pub fn by_operator(&self, operator: OperatorId) -> Vec<CheckIn> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.operator == operator)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
