//! `fait` CLI — resolve provider availability and manage bookings against a
//! JSON data file.
//!
//! ## Usage
//!
//! ```sh
//! # Bookable slots for the next two weeks (JSON on stdout)
//! fait slots --data store.json --provider agent-1
//!
//! # A fixed window with 15-minute slots, one object per slot
//! fait slots --data store.json --provider agent-1 --from 2024-06-03 --days 7 --increment 15 --flat
//!
//! # Check a rules file before importing it
//! fait validate -i rules.json
//!
//! # Mondays become 09:00-12:00 and 13:00-17:00; block a holiday
//! fait availability set-weekly --data store.json --provider agent-1 --day 1 \
//!     --window 09:00-12:00 --window 13:00-17:00
//! fait availability block --data store.json --provider agent-1 --date 2024-07-04 --reason holiday
//!
//! # Book, then cancel
//! fait book --data store.json --provider agent-1 --client client-9 --date 2024-06-03 --time 09:30
//! fait cancel --data store.json --booking 1b4e28ba-2fa1-11d2-883f-0016d3cca427 --reason "rain"
//! ```
//!
//! Commands that change the data file hold a lock on `<file>.lock` from load
//! to save, so concurrent runs against one file are serialized.
//!
//! Logs go to stderr. `--verbose` or `RUST_LOG=debug` shows resolver detail.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fait_scheduling::{
    flatten_slots, AvailabilityStore, BookingRequest, BookingService, ClockTime, DataFile,
    DateRangeAvailabilityRule, InMemoryStore, RecurrenceType, RecurringAvailabilityRule,
    SchedulingConfig, StoreSnapshot, UnavailableDate,
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "fait",
    version,
    about = "FAIT Co-Op availability and booking CLI"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration (increment_minutes, window_days, timezone)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Treat this date as today (defaults to the current date in the configured timezone)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a provider's bookable slots as JSON
    Slots {
        /// Data file holding rules, blackout dates and bookings
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        provider: String,
        /// First day of the window (defaults to today in the configured timezone)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Window length in days (overrides the config)
        #[arg(long)]
        days: Option<u32>,
        /// Minutes between slot start times (overrides the config)
        #[arg(long)]
        increment: Option<u32>,
        /// One object per slot instead of one per day
        #[arg(long)]
        flat: bool,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Validate every availability rule in a JSON document
    Validate {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Book a slot, or a recurring series of slots
    Book {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        provider: String,
        #[arg(long)]
        client: String,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        time: ClockTime,
        /// Price in cents
        #[arg(long, default_value_t = 0)]
        price: i64,
        #[arg(long)]
        package: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// weekly, biweekly or monthly
        #[arg(long, requires = "occurrences")]
        recurrence: Option<RecurrenceType>,
        /// Number of bookings in the series
        #[arg(long, requires = "recurrence")]
        occurrences: Option<u32>,
    },
    /// Cancel a pending or confirmed booking
    Cancel {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        booking: Uuid,
        #[arg(long, default_value = "")]
        reason: String,
        /// Refund in cents (defaults to the full price)
        #[arg(long)]
        refund: Option<i64>,
    },
    /// Move a booking to another slot
    Reschedule {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        booking: Uuid,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        time: ClockTime,
    },
    /// Mark a booking completed
    Complete {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        booking: Uuid,
    },
    /// Edit a provider's availability rules and blackout dates
    Availability {
        #[command(subcommand)]
        action: AvailabilityAction,
    },
}

#[derive(Subcommand)]
enum AvailabilityAction {
    /// Print the provider's rules and blackout dates as JSON
    Show {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        provider: String,
    },
    /// Add one weekly window
    AddWeekly {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        provider: String,
        /// 0 = Sunday ... 6 = Saturday
        #[arg(long)]
        day: u8,
        #[arg(long)]
        start: ClockTime,
        #[arg(long)]
        end: ClockTime,
    },
    /// Replace every weekly window on one day (no --window clears the day)
    SetWeekly {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        provider: String,
        /// 0 = Sunday ... 6 = Saturday
        #[arg(long)]
        day: u8,
        /// HH:MM-HH:MM, repeatable
        #[arg(long = "window", value_parser = parse_window)]
        windows: Vec<(ClockTime, ClockTime)>,
    },
    /// Add a date-ranged window
    AddRange {
        #[arg(short, long)]
        data: PathBuf,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Remove a date-ranged window
    RemoveRange {
        #[arg(short, long)]
        data: PathBuf,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Mark a date unavailable
    Block {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        provider: String,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Make a blocked date available again
    Unblock {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        provider: String,
        #[arg(long)]
        date: NaiveDate,
    },
}

#[derive(clap::Args)]
struct RangeArgs {
    #[arg(long)]
    provider: String,
    #[arg(long)]
    start_date: NaiveDate,
    /// Inclusive; omit for a single day
    #[arg(long)]
    end_date: Option<NaiveDate>,
    #[arg(long)]
    start: ClockTime,
    #[arg(long)]
    end: ClockTime,
}

impl RangeArgs {
    fn into_rule(self) -> DateRangeAvailabilityRule {
        DateRangeAvailabilityRule {
            provider_id: self.provider,
            start_date: self.start_date,
            end_date: self.end_date,
            start_time: self.start.to_string(),
            end_time: self.end.to_string(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let today = cli.today;

    match cli.command {
        Commands::Slots {
            data,
            provider,
            from,
            days,
            increment,
            flat,
            output,
        } => {
            let mut config = config;
            if let Some(increment) = increment {
                config.increment_minutes = increment;
            }
            let days = days.unwrap_or(config.window_days);

            // Saves replace the file atomically, so reads need no lock.
            let store = InMemoryStore::load(&data)
                .with_context(|| format!("Failed to load data file: {}", data.display()))?;
            let service = build_service(store, config, today);
            let from = match from {
                Some(date) => date,
                None => service.today().context("Failed to determine today's date")?,
            };

            let resolved = service
                .available_slots(&provider, from, days)
                .with_context(|| format!("Failed to resolve slots for provider {}", provider))?;

            let json = if flat {
                let slots = flatten_slots(&resolved, service.config().increment_minutes);
                serde_json::to_string_pretty(&slots)?
            } else {
                serde_json::to_string_pretty(&resolved)?
            };
            write_output(output.as_deref(), &json)?;
        }
        Commands::Validate { input } => {
            let json = read_input(input.as_deref())?;
            let snapshot: StoreSnapshot =
                serde_json::from_str(&json).context("Failed to parse rules JSON")?;

            for (i, rule) in snapshot.recurring_rules.iter().enumerate() {
                rule.validate()
                    .with_context(|| format!("recurring_rules[{}] is invalid", i))?;
            }
            for (i, rule) in snapshot.ranged_rules.iter().enumerate() {
                rule.validate()
                    .with_context(|| format!("ranged_rules[{}] is invalid", i))?;
            }

            println!(
                "{} recurring and {} ranged rules are valid",
                snapshot.recurring_rules.len(),
                snapshot.ranged_rules.len()
            );
        }
        Commands::Book {
            data,
            provider,
            client,
            date,
            time,
            price,
            package,
            notes,
            recurrence,
            occurrences,
        } => {
            let (file, service) = open_service(&data, config, today)?;
            let request = BookingRequest {
                client_id: client,
                provider_id: provider,
                service_package_id: package,
                scheduled_date: date,
                scheduled_time: time,
                price,
                notes,
            };

            let json = match (recurrence, occurrences) {
                (Some(recurrence), Some(occurrences)) => {
                    let series = service
                        .create_recurring_bookings(request, recurrence, occurrences)
                        .context("Failed to create recurring bookings")?;
                    serde_json::to_string_pretty(&series)?
                }
                _ => {
                    let booking = service
                        .create_booking(request)
                        .context("Failed to create booking")?;
                    serde_json::to_string_pretty(&booking)?
                }
            };

            save_store(&file, service.store())?;
            println!("{}", json);
        }
        Commands::Cancel {
            data,
            booking,
            reason,
            refund,
        } => {
            let (file, service) = open_service(&data, config, today)?;
            let cancelled = service
                .cancel_booking(booking, &reason, refund)
                .context("Failed to cancel booking")?;
            save_store(&file, service.store())?;
            println!("{}", serde_json::to_string_pretty(&cancelled)?);
        }
        Commands::Reschedule {
            data,
            booking,
            date,
            time,
        } => {
            let (file, service) = open_service(&data, config, today)?;
            let moved = service
                .reschedule_booking(booking, date, time)
                .context("Failed to reschedule booking")?;
            save_store(&file, service.store())?;
            println!("{}", serde_json::to_string_pretty(&moved)?);
        }
        Commands::Complete { data, booking } => {
            let (file, service) = open_service(&data, config, today)?;
            let done = service
                .complete_booking(booking)
                .context("Failed to complete booking")?;
            save_store(&file, service.store())?;
            println!("{}", serde_json::to_string_pretty(&done)?);
        }
        Commands::Availability { action } => run_availability(action)?,
    }

    Ok(())
}

fn run_availability(action: AvailabilityAction) -> Result<()> {
    match action {
        AvailabilityAction::Show { data, provider } => {
            let store = InMemoryStore::load(&data)
                .with_context(|| format!("Failed to load data file: {}", data.display()))?;
            let shown = serde_json::json!({
                "recurring_rules": store.recurring_rules(&provider)?,
                "ranged_rules": store.ranged_rules(&provider, NaiveDate::MIN)?,
                "unavailable_dates": store.unavailable_dates(&provider, NaiveDate::MIN)?,
            });
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        AvailabilityAction::AddWeekly {
            data,
            provider,
            day,
            start,
            end,
        } => {
            let rule = RecurringAvailabilityRule {
                provider_id: provider,
                day_of_week: day,
                start_time: start.to_string(),
                end_time: end.to_string(),
            };
            edit_store(&data, |store| {
                store
                    .add_recurring_rule(rule)
                    .context("Failed to add weekly rule")
            })?;
        }
        AvailabilityAction::SetWeekly {
            data,
            provider,
            day,
            windows,
        } => {
            let rules = windows
                .into_iter()
                .map(|(start, end)| RecurringAvailabilityRule {
                    provider_id: provider.clone(),
                    day_of_week: day,
                    start_time: start.to_string(),
                    end_time: end.to_string(),
                })
                .collect();
            edit_store(&data, |store| {
                store
                    .replace_recurring_rules(&provider, day, rules)
                    .context("Failed to replace weekly rules")
            })?;
        }
        AvailabilityAction::AddRange { data, range } => {
            let rule = range.into_rule();
            edit_store(&data, |store| {
                store
                    .add_ranged_rule(rule)
                    .context("Failed to add date-ranged rule")
            })?;
        }
        AvailabilityAction::RemoveRange { data, range } => {
            let rule = range.into_rule();
            edit_store(&data, |store| {
                if !store.remove_ranged_rule(&rule)? {
                    bail!(
                        "No date-ranged rule for provider {} from {} at {}-{}",
                        rule.provider_id,
                        rule.start_date,
                        rule.start_time,
                        rule.end_time
                    );
                }
                Ok(())
            })?;
        }
        AvailabilityAction::Block {
            data,
            provider,
            date,
            reason,
        } => {
            let blackout = UnavailableDate {
                provider_id: provider,
                date,
                reason,
            };
            edit_store(&data, |store| {
                store
                    .add_unavailable_date(blackout)
                    .context("Failed to block date")
            })?;
        }
        AvailabilityAction::Unblock {
            data,
            provider,
            date,
        } => {
            edit_store(&data, |store| {
                if !store.remove_unavailable_date(&provider, date)? {
                    bail!("{} is not blocked for provider {}", date, provider);
                }
                Ok(())
            })?;
        }
    }
    Ok(())
}

fn parse_window(s: &str) -> std::result::Result<(ClockTime, ClockTime), String> {
    let (start, end) = s
        .split_once('-')
        .ok_or_else(|| format!("expected HH:MM-HH:MM, got '{}'", s))?;
    let start = ClockTime::parse(start.trim()).map_err(|e| e.to_string())?;
    let end = ClockTime::parse(end.trim()).map_err(|e| e.to_string())?;
    Ok((start, end))
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<SchedulingConfig> {
    match path {
        Some(path) => {
            let config = SchedulingConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?;
            info!(path = %path.display(), "loaded configuration");
            Ok(config)
        }
        None => Ok(SchedulingConfig::default()),
    }
}

fn build_service(
    store: InMemoryStore,
    config: SchedulingConfig,
    today: Option<NaiveDate>,
) -> BookingService<InMemoryStore> {
    let service = BookingService::new(store, config);
    match today {
        Some(today) => service.with_today(today),
        None => service,
    }
}

/// Lock the data file and load it. Keep the returned guard until saved.
fn open_locked(data: &Path) -> Result<(DataFile, InMemoryStore)> {
    let file = DataFile::lock(data)
        .with_context(|| format!("Failed to lock data file: {}", data.display()))?;
    let store = file
        .load()
        .with_context(|| format!("Failed to load data file: {}", data.display()))?;
    Ok((file, store))
}

fn open_service(
    data: &Path,
    config: SchedulingConfig,
    today: Option<NaiveDate>,
) -> Result<(DataFile, BookingService<InMemoryStore>)> {
    let (file, store) = open_locked(data)?;
    Ok((file, build_service(store, config, today)))
}

fn save_store(file: &DataFile, store: &InMemoryStore) -> Result<()> {
    file.save(store)
        .with_context(|| format!("Failed to write data file: {}", file.path().display()))
}

fn edit_store(data: &Path, edit: impl FnOnce(&InMemoryStore) -> Result<()>) -> Result<()> {
    let (file, store) = open_locked(data)?;
    edit(&store)?;
    save_store(&file, &store)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
