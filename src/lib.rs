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

//! A concurrent ticket lifecycle engine for scheduled events.
//!
//! `boxoffice-rs` tracks tickets from bulk issuance through reservation,
//! payment settlement, and single-use gate admission. All state lives in
//! memory behind fine-grained locks; every operation on [`BoxOffice`] takes
//! `&self` and can be driven from many threads at once.
//!
//! # Example
//!
//! ```
//! use boxoffice_rs::{
//!     BoxOffice, BuyerProfile, CategoryId, Channel, EventId, PaymentOutcome,
//! };
//! use rust_decimal_macros::dec;
//!
//! let office = BoxOffice::new();
//! let category = CategoryId::new();
//! office.issue_tickets(category, EventId::new(), dec!(1000), 5, Channel::Online)?;
//!
//! let profile = BuyerProfile {
//!     phone: "+221770000001".to_string(),
//!     first_name: "Awa".to_string(),
//!     last_name: "Ndiaye".to_string(),
//!     email: None,
//! };
//! let sale = office.reserve(category, 2, &profile)?;
//! let session = office.payment_url(sale.id)?;
//! println!("pay at {}", session.redirect_url);
//!
//! office.apply_outcome(sale.id, PaymentOutcome::Completed)?;
//! assert_eq!(office.counts(category)?.sold, 2);
//! # Ok::<(), boxoffice_rs::TicketError>(())
//! ```

pub mod base;
pub mod card;
pub mod checkin;
pub mod engine;
pub mod error;
pub mod external;
pub mod inventory;
pub mod policy;
pub mod registry;
pub mod sale;
pub mod ticket;

pub use base::{
    BuyerId, CardId, CardNumber, CategoryId, CheckInId, EventId, OperatorId, SaleId, TicketCode,
    TicketId,
};
pub use card::{CardSnapshot, CardStats, CardStatus};
pub use checkin::{CheckIn, GateLog};
pub use engine::{BoxOffice, PaymentPages, SalesStats};
pub use error::TicketError;
pub use external::{
    BuyerProfile, CodeRenderer, IdentityService, LogNotifier, Notifier, OfflineProvider,
    PaymentProvider, PaymentRequest, PaymentSession, PhoneDirectory, PlainRenderer, ResolvedBuyer,
};
pub use inventory::{CategoryCounts, InventoryStore};
pub use policy::{authorize, Action, Role};
pub use registry::{CodeRegistry, TicketLocator};
pub use sale::{PaymentOutcome, Sale, SaleSnapshot, SaleStatus};
pub use ticket::{Channel, Ticket, TicketStatus};
