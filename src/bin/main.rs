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

//! Command-line driver for the box office engine.
//!
//! Reads a CSV of lifecycle operations, replays them through a fresh
//! [`BoxOffice`], and writes the final per-category occupancy to stdout.
//!
//! Input rows (no header, variable arity):
//!
//! ```csv
//! issue,vip,1000,5,online
//! reserve,vip,3,+221770000001,Awa,Ndiaye,sale-1
//! payment,sale-1
//! outcome,sale-1,completed
//! checkin,sale-1,gate-north
//! ```
//!
//! Labels (`vip`, `sale-1`, `gate-north`) are caller-chosen names mapped to
//! engine identifiers on first use. Malformed or rejected rows are skipped
//! with a warning; the replay keeps going.

use boxoffice_rs::{
    BoxOffice, BuyerProfile, CategoryId, Channel, EventId, OperatorId, PaymentOutcome, SaleId,
    TicketStatus,
};
use clap::Parser;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "boxoffice", about = "Replay ticket lifecycle operations from CSV")]
struct Cli {
    /// Path to the operations CSV
    input: PathBuf,
}

#[derive(Debug, Serialize)]
struct CountsRow<'a> {
    category: &'a str,
    issued: u32,
    available: u32,
    sold: u32,
    used: u32,
}

/// Caller-chosen labels mapped to engine identifiers.
#[derive(Default)]
struct Labels {
    categories: HashMap<String, CategoryId>,
    sales: HashMap<String, SaleId>,
    operators: HashMap<String, OperatorId>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let office = BoxOffice::new();
    let event = EventId::new();
    let mut labels = Labels::default();

    let file = File::open(&cli.input)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);

    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                log::warn!("line {}: unreadable row: {err}", line + 1);
                continue;
            }
        };
        if let Err(err) = apply_record(&office, event, &mut labels, &record) {
            log::warn!("line {}: skipped: {err}", line + 1);
        }
    }

    write_counts(&office, &labels)?;
    Ok(())
}

fn apply_record(
    office: &BoxOffice,
    event: EventId,
    labels: &mut Labels,
    record: &csv::StringRecord,
) -> Result<(), Box<dyn Error>> {
    let field = |i: usize| -> Result<&str, Box<dyn Error>> {
        record.get(i).ok_or_else(|| "missing field".into())
    };

    match field(0)? {
        "issue" => {
            let label = field(1)?.to_string();
            let unit_price: Decimal = field(2)?.parse()?;
            let quantity: u32 = field(3)?.parse()?;
            let channel = Channel::parse(field(4)?).ok_or("unknown channel")?;
            let category = *labels
                .categories
                .entry(label)
                .or_insert_with(CategoryId::new);
            office.issue_tickets(category, event, unit_price, quantity, channel)?;
        }
        "reserve" => {
            let category = *labels
                .categories
                .get(field(1)?)
                .ok_or("unknown category label")?;
            let quantity: u32 = field(2)?.parse()?;
            let profile = BuyerProfile {
                phone: field(3)?.to_string(),
                first_name: field(4)?.to_string(),
                last_name: field(5)?.to_string(),
                email: None,
            };
            let sale_label = field(6)?.to_string();
            let sale = office.reserve(category, quantity, &profile)?;
            labels.sales.insert(sale_label, sale.id);
        }
        "payment" => {
            let sale = *labels.sales.get(field(1)?).ok_or("unknown sale label")?;
            let session = office.payment_url(sale)?;
            log::info!("sale {sale}: pay at {}", session.redirect_url);
        }
        "outcome" => {
            let sale = *labels.sales.get(field(1)?).ok_or("unknown sale label")?;
            let outcome = PaymentOutcome::from_provider_status(field(2)?);
            office.apply_outcome(sale, outcome)?;
        }
        "checkin" => {
            let sale = *labels.sales.get(field(1)?).ok_or("unknown sale label")?;
            let operator = *labels
                .operators
                .entry(field(2)?.to_string())
                .or_insert_with(OperatorId::new);
            let ticket = office
                .sale_tickets(sale)
                .into_iter()
                .find(|t| t.status == TicketStatus::Sold)
                .ok_or("no admissible ticket left on sale")?;
            office.check_in(&ticket.code, operator)?;
        }
        op => return Err(format!("unknown operation {op:?}").into()),
    }
    Ok(())
}

fn write_counts(office: &BoxOffice, labels: &Labels) -> Result<(), Box<dyn Error>> {
    let mut writer = WriterBuilder::new().from_writer(io::stdout());
    let mut rows: Vec<(&str, CategoryId)> = labels
        .categories
        .iter()
        .map(|(label, id)| (label.as_str(), *id))
        .collect();
    rows.sort_by_key(|(label, _)| *label);

    for (label, category) in rows {
        let counts = office.counts(category)?;
        writer.serialize(CountsRow {
            category: label,
            issued: counts.issued,
            available: counts.available,
            sold: counts.sold,
            used: counts.used,
        })?;
    }
    writer.flush()?;
    Ok(())
}
