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

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use csv::{ReaderBuilder, Trim, Writer};
use earnings_ledger::currency::round_currency;
use earnings_ledger::{
    LedgerConfig, LedgerError, LedgerStore, Record, RecordDraft, RecordId, RecordPatch, Settings,
    StorageBackend, format_currency, load_config, parse_currency,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Earnings Ledger - Track daily earnings against an advance balance
///
/// Every edit keeps the running remaining balance of all later days in step.
#[derive(Parser, Debug)]
#[command(name = "earnings-ledger")]
#[command(about = "Track daily earnings against an advance balance", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    ///
    /// Defaults are used when the file does not exist.
    #[arg(long, short, value_name = "FILE", default_value = "ledger.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a day's earnings
    Add {
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, default_value = "0")]
        bookings: Decimal,
        /// Total earned; derived from settings and bookings when omitted
        #[arg(long, value_parser = parse_currency)]
        earnings: Option<Decimal>,
        #[arg(long, value_parser = parse_currency)]
        advance_used: Option<Decimal>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Edit a record and cascade the change
    Edit {
        id: u64,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        bookings: Option<Decimal>,
        #[arg(long, value_parser = parse_currency)]
        earnings: Option<Decimal>,
        #[arg(long, value_parser = parse_currency)]
        advance_used: Option<Decimal>,
        /// New amount for the initial advance record
        #[arg(long, value_parser = parse_currency)]
        amount: Option<Decimal>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a record and cascade the change
    Delete { id: u64 },
    /// Record the one-time initial advance
    Anchor {
        #[arg(long, value_parser = parse_currency)]
        amount: Decimal,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Print all records as CSV, newest first
    List,
    /// Import records from a CSV file
    ///
    /// Expected columns: date,bookings,totalEarnings,advanceUsed,notes
    Import {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Show or change pay rates and the fallback balance
    Settings {
        #[arg(long, value_parser = parse_currency)]
        base_pay: Option<Decimal>,
        #[arg(long, value_parser = parse_currency)]
        per_booking: Option<Decimal>,
        #[arg(long, value_parser = parse_currency)]
        advance_balance: Option<Decimal>,
    },
    /// Recompute every balance from scratch
    Recalc,
    /// Print the current remaining balance
    Balance,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot open '{path}': {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let config = if args.config.exists() {
        load_config(&args.config)?
    } else {
        info!("No config at {}, using defaults", args.config.display());
        LedgerConfig::default()
    };
    let store = LedgerStore::with_config(config.open_backend(), config.store);
    let stdout = std::io::stdout();

    match args.command {
        Command::Add {
            date,
            bookings,
            earnings,
            advance_used,
            notes,
        } => {
            let settings = store.settings()?;
            let mut draft = RecordDraft::for_day(date, bookings, &settings)?
                .with_advance_used(advance_used.unwrap_or_default())
                .with_notes(notes);
            if let Some(total) = earnings {
                draft = draft.with_total_earnings(total);
            }
            let record = store.add_record(draft)?;
            write_records(std::slice::from_ref(&record), stdout.lock())?;
        }
        Command::Edit {
            id,
            date,
            bookings,
            earnings,
            advance_used,
            amount,
            notes,
        } => {
            let patch = RecordPatch {
                date,
                bookings,
                total_earnings: earnings,
                advance_used,
                anchor_amount: amount,
                notes,
                ..Default::default()
            };
            let record = store.update_record(RecordId(id), patch)?;
            write_records(std::slice::from_ref(&record), stdout.lock())?;
        }
        Command::Delete { id } => {
            let removed = store.delete_record(RecordId(id))?;
            println!("deleted record {} ({})", removed.id, removed.date);
        }
        Command::Anchor { amount, date } => {
            let anchor = store.create_anchor(amount, date)?;
            write_records(std::slice::from_ref(&anchor), stdout.lock())?;
        }
        Command::List => {
            write_records(&store.list_records()?, stdout.lock())?;
        }
        Command::Import { input } => {
            let file = File::open(&input).map_err(|source| CliError::Open {
                path: input.display().to_string(),
                source,
            })?;
            let imported = import_records(&store, BufReader::new(file))?;
            println!("imported {} records", imported.len());
        }
        Command::Settings {
            base_pay,
            per_booking,
            advance_balance,
        } => {
            let current = store.settings()?;
            let settings = if base_pay.is_none() && per_booking.is_none() && advance_balance.is_none() {
                current
            } else {
                store.update_settings(Settings {
                    base_pay: base_pay.unwrap_or(current.base_pay),
                    per_booking: per_booking.unwrap_or(current.per_booking),
                    advance_balance: advance_balance.unwrap_or(current.advance_balance),
                })?
            };
            println!("base pay:        {}", format_currency(settings.base_pay));
            println!("per booking:     {}", format_currency(settings.per_booking));
            println!("advance balance: {}", format_currency(settings.advance_balance));
        }
        Command::Recalc => {
            let changed = store.recalculate_all()?;
            println!("{} records restamped", changed);
        }
        Command::Balance => {
            println!("{}", format_currency(store.current_balance()?));
        }
    }

    Ok(())
}

/// Raw CSV row for imports.
///
/// Fields: `date, bookings, totalEarnings, advanceUsed, notes`. Only `date`
/// is required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsvRecord {
    date: NaiveDate,
    #[serde(default, deserialize_with = "empty_as_none")]
    bookings: Option<Decimal>,
    #[serde(default, deserialize_with = "empty_as_none")]
    total_earnings: Option<Decimal>,
    #[serde(default, deserialize_with = "empty_as_none")]
    advance_used: Option<Decimal>,
    #[serde(default)]
    notes: String,
}

impl CsvRecord {
    /// Converts the row to a draft, deriving pay from `settings` when the
    /// total is not given.
    fn into_draft(self, settings: &Settings) -> Result<RecordDraft, LedgerError> {
        let mut draft =
            RecordDraft::for_day(self.date, self.bookings.unwrap_or_default(), settings)?
                .with_advance_used(self.advance_used.unwrap_or_default())
                .with_notes(self.notes);
        if let Some(total) = self.total_earnings {
            draft = draft.with_total_earnings(total);
        }
        Ok(draft)
    }
}

/// Reads an optional amount: an empty field is `None`, anything else must
/// parse as a decimal.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if raw.trim().is_empty() {
        return Ok(None);
    }
    raw.trim()
        .parse::<Decimal>()
        .map(Some)
        .map_err(|e| serde::de::Error::custom(format!("invalid amount {raw:?}: {e}")))
}

/// Reads record drafts from CSV.
///
/// Malformed rows, including unparseable amounts, are skipped with a warning.
///
/// # Example
///
/// ```csv
/// date,bookings,totalEarnings,advanceUsed,notes
/// 2024-01-02,3,,,
/// 2024-01-03,,150.00,,slow day
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the header cannot be read.
fn read_drafts<R: Read>(reader: R, settings: &Settings) -> Result<Vec<RecordDraft>, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let mut drafts = Vec::new();
    for (line, result) in rdr.deserialize::<CsvRecord>().enumerate() {
        let draft = result
            .map_err(CliError::from)
            .and_then(|row| row.into_draft(settings).map_err(CliError::from));
        match draft {
            Ok(draft) => drafts.push(draft),
            Err(e) => warn!(row = line + 1, error = %e, "skipping malformed row"),
        }
    }
    Ok(drafts)
}

/// Imports every well-formed row from `reader` in one atomic write.
fn import_records<B: StorageBackend, R: Read>(
    store: &LedgerStore<B>,
    reader: R,
) -> Result<Vec<Record>, CliError> {
    let settings = store.settings()?;
    let drafts = read_drafts(reader, &settings)?;
    Ok(store.import_records(drafts)?)
}

/// Output row, with money rounded to cents.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow<'a> {
    id: RecordId,
    date: NaiveDate,
    bookings: Decimal,
    total_earnings: Decimal,
    advance_used: Decimal,
    remaining: Decimal,
    initial_advance: bool,
    notes: &'a str,
}

impl<'a> From<&'a Record> for CsvRow<'a> {
    fn from(record: &'a Record) -> Self {
        CsvRow {
            id: record.id,
            date: record.date,
            bookings: record.bookings,
            total_earnings: round_currency(record.total_earnings),
            advance_used: round_currency(record.advance_used),
            remaining: round_currency(record.remaining),
            initial_advance: record.is_initial_advance,
            notes: &record.notes,
        }
    }
}

/// Writes records as CSV in the given order.
///
/// # CSV Format
///
/// Columns: `id, date, bookings, totalEarnings, advanceUsed, remaining,
/// initialAdvance, notes`
fn write_records<W: Write>(records: &[Record], writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for record in records {
        wtr.serialize(CsvRow::from(record))?;
    }
    wtr.flush()?;
    Ok(())
}
