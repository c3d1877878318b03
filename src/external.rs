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

//! External collaborators the engine depends on, behind traits.
//!
//! Identity resolution, payment, buyer notification, and code rendering are
//! pluggable seams. The defaults here are in-process stand-ins good enough
//! for tests, demos, and the CLI: [`PhoneDirectory`], [`OfflineProvider`],
//! [`LogNotifier`], and [`PlainRenderer`].

use crate::base::BuyerId;
use crate::error::TicketError;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Contact details a buyer supplies at purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerProfile {
    /// Phone number; the buyer's identity key and notification address.
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

impl BuyerProfile {
    pub fn validate(&self) -> Result<(), TicketError> {
        if self.phone.trim().is_empty() {
            return Err(TicketError::Validation {
                field: "phone",
                reason: "must not be empty",
            });
        }
        if self.first_name.trim().is_empty() {
            return Err(TicketError::Validation {
                field: "first_name",
                reason: "must not be empty",
            });
        }
        if self.last_name.trim().is_empty() {
            return Err(TicketError::Validation {
                field: "last_name",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

/// Outcome of resolving a buyer profile to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedBuyer {
    pub buyer: BuyerId,
    /// Whether the identity was created by this resolution. The engine
    /// deletes identities it created if the rest of the purchase fails.
    pub created: bool,
}

/// Resolves buyer profiles to stable identities.
pub trait IdentityService: Send + Sync {
    fn find_or_create(&self, profile: &BuyerProfile) -> Result<ResolvedBuyer, TicketError>;

    /// Removes an identity. Used to compensate a failed purchase; removing
    /// an unknown buyer is a no-op.
    fn remove(&self, buyer: BuyerId);
}

/// In-process identity service keyed by phone number.
#[derive(Debug, Default)]
pub struct PhoneDirectory {
    buyers: DashMap<String, BuyerId>,
}

impl PhoneDirectory {
    pub fn new() -> Self {
        PhoneDirectory {
            buyers: DashMap::new(),
        }
    }
}

impl IdentityService for PhoneDirectory {
    fn find_or_create(&self, profile: &BuyerProfile) -> Result<ResolvedBuyer, TicketError> {
        match self.buyers.entry(profile.phone.clone()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => Ok(ResolvedBuyer {
                buyer: *entry.get(),
                created: false,
            }),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let buyer = BuyerId::new();
                entry.insert(buyer);
                Ok(ResolvedBuyer {
                    buyer,
                    created: true,
                })
            }
        }
    }

    fn remove(&self, buyer: BuyerId) {
        self.buyers.retain(|_, id| *id != buyer);
    }
}

/// What the engine asks a payment provider to collect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub amount: Decimal,
    /// Provider-visible reference, `TICKET-<sale-id>`.
    pub reference: String,
    pub contact: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// A provider-side payment session the buyer is redirected into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSession {
    pub token: String,
    pub redirect_url: String,
}

/// Creates payment sessions with an external provider.
pub trait PaymentProvider: Send + Sync {
    fn request_payment(&self, request: &PaymentRequest) -> Result<PaymentSession, TicketError>;
}

/// Provider stand-in that mints a session without any network call.
#[derive(Debug, Default)]
pub struct OfflineProvider;

impl PaymentProvider for OfflineProvider {
    fn request_payment(&self, request: &PaymentRequest) -> Result<PaymentSession, TicketError> {
        if request.amount <= Decimal::ZERO {
            return Err(TicketError::ExternalService {
                service: "payment",
                reason: format!("amount {} not chargeable", request.amount),
            });
        }
        let token = format!("PT-{}", Uuid::new_v4().simple());
        let redirect_url = format!("https://pay.invalid/checkout/{token}");
        Ok(PaymentSession {
            token,
            redirect_url,
        })
    }
}

/// Sends short messages to buyers.
pub trait Notifier: Send + Sync {
    fn notify(&self, contact: &str, message: &str) -> Result<(), TicketError>;
}

/// Notifier that writes to the log instead of a gateway.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, contact: &str, message: &str) -> Result<(), TicketError> {
        log::info!("notify {contact}: {message}");
        Ok(())
    }
}

/// Renders a ticket code payload into scannable form.
pub trait CodeRenderer: Send + Sync {
    fn render(&self, payload: &str) -> Result<Vec<u8>, TicketError>;
}

/// Renderer that passes the payload through as bytes.
#[derive(Debug, Default)]
pub struct PlainRenderer;

impl CodeRenderer for PlainRenderer {
    fn render(&self, payload: &str) -> Result<Vec<u8>, TicketError> {
        if payload.is_empty() {
            return Err(TicketError::ExternalService {
                service: "renderer",
                reason: "empty payload".to_string(),
            });
        }
        Ok(payload.as_bytes().to_vec())
    }
}
