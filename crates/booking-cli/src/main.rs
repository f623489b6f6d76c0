//! `booking` CLI — inspect a reservation dataset from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Space-scoped day calendar
//! booking calendar -d campus.json --date 2026-03-02 --space 1
//!
//! # Aggregate 7-day calendar in a specific zone
//! booking calendar -d campus.json --date 2026-03-02 --range week --timezone UTC
//!
//! # Which laboratories are free 08:00-10:00?
//! booking search -d campus.json --date 2026-03-02 --start 08:00 --end 10:00 --type laboratory
//! ```
//!
//! The dataset is a JSON file with `spaces` and `reservations` arrays in
//! the engine's serialized shapes. Output is pretty-printed JSON.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use booking_engine::availability::search_available;
use booking_engine::calendar::build_calendar;
use booking_engine::{
    CalendarConfig, CalendarRange, MemoryReservations, MemorySpaces, Reservation, Space, SpaceId,
    SpaceType,
};

#[derive(Parser)]
#[command(name = "booking", version, about = "Space reservation calendar inspector")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Materialize the calendar slot grid for a day or a week
    Calendar {
        /// Dataset JSON file (spaces + reservations)
        #[arg(short, long)]
        data: String,
        /// Reference date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// "day" (default) or "week"
        #[arg(long, default_value = "day")]
        range: String,
        /// Scope the grid to one space id
        #[arg(long)]
        space: Option<SpaceId>,
        /// IANA time zone (default America/Bogota)
        #[arg(long)]
        timezone: Option<String>,
        /// Slot width in minutes
        #[arg(long)]
        slot_minutes: Option<u32>,
        /// Day start time (HH:MM)
        #[arg(long)]
        day_start: Option<String>,
        /// Day end time (HH:MM)
        #[arg(long)]
        day_end: Option<String>,
    },
    /// Find spaces free for a whole window
    Search {
        /// Dataset JSON file (spaces + reservations)
        #[arg(short, long)]
        data: String,
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Window start time (HH:MM)
        #[arg(long)]
        start: String,
        /// Window end time (HH:MM)
        #[arg(long)]
        end: String,
        /// Restrict to one space type
        #[arg(long = "type")]
        kind: Option<String>,
        /// IANA time zone (default America/Bogota)
        #[arg(long)]
        timezone: Option<String>,
    },
}

/// On-disk dataset: the engine's serialized shapes.
#[derive(Deserialize)]
struct Dataset {
    spaces: Vec<Space>,
    #[serde(default)]
    reservations: Vec<Reservation>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Calendar {
            data,
            date,
            range,
            space,
            timezone,
            slot_minutes,
            day_start,
            day_end,
        } => {
            let (spaces, reservations) = load_dataset(&data)?;
            let mut config = config_for(timezone.as_deref())?;
            if let Some(minutes) = slot_minutes {
                config.slot_minutes = minutes;
            }
            if let Some(s) = day_start.as_deref() {
                config.day_start = parse_time(s)?;
            }
            if let Some(e) = day_end.as_deref() {
                config.day_end = parse_time(e)?;
            }

            let view = build_calendar(
                &spaces,
                &reservations,
                &config,
                parse_date(&date)?,
                parse_range(&range)?,
                space,
            )?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Commands::Search {
            data,
            date,
            start,
            end,
            kind,
            timezone,
        } => {
            let (spaces, reservations) = load_dataset(&data)?;
            let config = config_for(timezone.as_deref())?;
            let free = search_available(
                &spaces,
                &reservations,
                &config,
                parse_date(&date)?,
                parse_time(&start)?,
                parse_time(&end)?,
                kind.as_deref().map(parse_kind).transpose()?,
            )?;
            println!("{}", serde_json::to_string_pretty(&free)?);
        }
    }
    Ok(())
}

fn load_dataset(path: &str) -> Result<(MemorySpaces, MemoryReservations)> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset file '{path}'"))?;
    let dataset: Dataset =
        serde_json::from_str(&raw).with_context(|| format!("Invalid dataset in '{path}'"))?;

    let spaces = MemorySpaces::new();
    for space in dataset.spaces {
        spaces.put(space);
    }
    let reservations = MemoryReservations::new();
    for reservation in dataset.reservations {
        reservations.put(reservation);
    }
    Ok((spaces, reservations))
}

fn config_for(timezone: Option<&str>) -> Result<CalendarConfig> {
    match timezone {
        Some(name) => Ok(CalendarConfig::with_timezone(name)?),
        None => Ok(CalendarConfig::default()),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    s.parse()
        .with_context(|| format!("Invalid date '{s}', expected YYYY-MM-DD"))
}

fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .with_context(|| format!("Invalid time '{s}', expected HH:MM"))
}

fn parse_range(s: &str) -> Result<CalendarRange> {
    match s {
        "day" => Ok(CalendarRange::Day),
        "week" => Ok(CalendarRange::Week),
        other => bail!("Invalid range '{other}', expected 'day' or 'week'"),
    }
}

fn parse_kind(s: &str) -> Result<SpaceType> {
    match s {
        "auditorium" => Ok(SpaceType::Auditorium),
        "laboratory" => Ok(SpaceType::Laboratory),
        "classroom" => Ok(SpaceType::Classroom),
        "systemsrooms" => Ok(SpaceType::Systemsrooms),
        "other" => Ok(SpaceType::Other),
        unknown => bail!("Unknown space type '{unknown}'"),
    }
}
