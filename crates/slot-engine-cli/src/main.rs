//! `slots`: compute booking slot calendars from JSON files.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use slot_engine::{
    compute_calendar, convert_instant, display_calendar, parse_rfc3339, summarize, Booking,
    CalendarOptions, CalendarSlot, Event, DEFAULT_HORIZON_DAYS, MAX_HORIZON_DAYS,
};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "slots")]
#[command(about = "Compute bookable slots from an event's weekly availability and its bookings")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the slot calendar as JSON
    Calendar {
        #[command(flatten)]
        input: CalendarInput,

        /// Render slots in local time instead of UTC
        #[arg(long)]
        local: bool,

        /// Zone used with --local (defaults to the event's timezone)
        #[arg(long, requires = "local")]
        timezone: Option<String>,
    },
    /// Print free/booked/blocked counts as JSON
    Summary {
        #[command(flatten)]
        input: CalendarInput,
    },
    /// Convert an RFC 3339 instant to an IANA timezone
    Convert {
        /// Instant, e.g. 2026-03-15T14:00:00Z
        instant: String,
        /// IANA timezone, e.g. Europe/Madrid
        timezone: String,
    },
    /// Check an event definition and exit non-zero if it is invalid
    Validate {
        /// Event JSON file
        #[arg(short, long)]
        event: PathBuf,
    },
}

#[derive(Args)]
struct CalendarInput {
    /// Event JSON file
    #[arg(short, long)]
    event: PathBuf,

    /// Bookings JSON array file, or "-" for stdin
    #[arg(short, long)]
    bookings: Option<PathBuf>,

    /// Reference instant (RFC 3339); defaults to the current time
    #[arg(long)]
    now: Option<String>,

    /// Number of local days to compute
    #[arg(
        long,
        env = "SLOTS_HORIZON_DAYS",
        default_value_t = DEFAULT_HORIZON_DAYS,
        value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_HORIZON_DAYS))
    )]
    horizon_days: u32,

    /// Drop booked and blocked slots that already started
    #[arg(long)]
    hide_past_bookings: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Calendar {
            input,
            local,
            timezone,
        } => {
            let (event, slots) = calendar(&input)?;
            if local {
                let zone = timezone.unwrap_or_else(|| event.timezone.clone());
                print_json(&display_calendar(&slots, &zone)?)
            } else {
                print_json(&slots)
            }
        }
        Command::Summary { input } => {
            let (_, slots) = calendar(&input)?;
            print_json(&summarize(&slots))
        }
        Command::Convert { instant, timezone } => {
            let instant = parse_rfc3339(&instant)?;
            print_json(&convert_instant(instant, &timezone)?)
        }
        Command::Validate { event } => {
            let event = read_event(&event)?;
            event.validate()?;
            println!("ok");
            Ok(())
        }
    }
}

fn calendar(input: &CalendarInput) -> Result<(Event, Vec<CalendarSlot>)> {
    let event = read_event(&input.event)?;
    let bookings = match &input.bookings {
        Some(path) => read_bookings(path)?,
        None => Vec::new(),
    };
    let now = resolve_now(input.now.as_deref())?;

    let options = CalendarOptions::default()
        .with_horizon_days(input.horizon_days)
        .with_past_bookings(!input.hide_past_bookings);

    debug!(event_id = %event.id, bookings = bookings.len(), %now, "computing calendar");
    let slots = compute_calendar(&event, &bookings, now, &options)
        .with_context(|| format!("computing calendar for event '{}'", event.id))?;
    Ok((event, slots))
}

fn resolve_now(now: Option<&str>) -> Result<DateTime<Utc>> {
    match now {
        Some(s) => Ok(parse_rfc3339(s)?),
        None => Ok(Utc::now()),
    }
}

fn read_event(path: &Path) -> Result<Event> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading event file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing event file {}", path.display()))
}

fn read_bookings(path: &Path) -> Result<Vec<Booking>> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("reading bookings from stdin")?;
        buf
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("reading bookings file {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("parsing bookings {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{out}");
    Ok(())
}
