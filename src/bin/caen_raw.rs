//! caen_raw - Inspection tool for raw CAEN digitizer record files
//!
//! Usage:
//!   caen_raw info <file>                         - Show record counts and setup
//!   caen_raw dump <file> [--json] [-n <count>]   - Print every record
//!   caen_raw validate <file>                     - Strict decode of the whole file
//!   caen_raw events <file>                       - Summarise assembled events
//!   caen_raw trace <file> -e <id> -c <ch> [--volts] - Print one channel's samples

use std::path::Path;

use anyhow::Context;
use caen_raw::common::cli::{CaenRawArgs, RawCommand};
use caen_raw::config::{DecoderConfig, SizeCheck};
use caen_raw::{Magnitude, RawFileReader, RunContents};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("caen_raw=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = CaenRawArgs::parse();
    let config = args.common.load_config()?;

    match args.command {
        RawCommand::Info { file } => show_info(&file, &config.decoder),
        RawCommand::Dump { file, json, limit } => dump_records(&file, &config.decoder, json, limit),
        RawCommand::Validate { file } => {
            if !validate_file(&file, &config.decoder)? {
                std::process::exit(1);
            }
            Ok(())
        }
        RawCommand::Events { file } => show_events(&file, &config.decoder),
        RawCommand::Trace {
            file,
            event,
            channel,
            volts,
        } => {
            let magnitude = if volts {
                Magnitude::Voltage
            } else {
                Magnitude::AdcCounts
            };
            print_trace(&file, &config.decoder, event, channel, magnitude)
        }
    }
}

fn show_info(path: &Path, config: &DecoderConfig) -> anyhow::Result<()> {
    let contents = RunContents::load(path, config)
        .with_context(|| format!("Failed to decode {}", path.display()))?;

    println!("File: {}", path.display());
    println!("Size: {} bytes", std::fs::metadata(path)?.len());
    println!();

    println!("=== Records ===");
    println!("  Digitizers:     {}", contents.stats.digitizers);
    println!("  Settings:       {}", contents.stats.settings);
    println!("  Waveforms:      {}", contents.stats.waveforms);
    if contents.stats.skipped > 0 {
        println!("  Skipped:        {}", contents.stats.skipped);
    }
    println!("  Events:         {}", contents.events.len());

    if !contents.digitizers.is_empty() {
        println!();
        println!("=== Digitizers ===");
        for digitizer in contents.digitizers.values() {
            println!("  {}", digitizer);
            let (vlow, vhigh) = digitizer.voltage_range();
            println!(
                "    groups:{} zsuppress:{} inspect:{} dual-edge:{} range:[{:.3}, {:.3}] V",
                digitizer.has_groups(),
                digitizer.can_zsuppress(),
                digitizer.can_inspect(),
                digitizer.dual_edge_clock(),
                vlow,
                vhigh
            );
        }
    }

    if !contents.settings.is_empty() {
        println!();
        println!("=== Settings ===");
        for settings in contents.settings.values() {
            println!("  {}", settings);
            for ch in settings.channels() {
                println!(
                    "    ch {:2}: dc_offset={:6} trigger_level={:6}",
                    ch.channel, ch.dc_offset, ch.trigger_level
                );
            }
        }
    }

    Ok(())
}

fn dump_records(
    path: &Path,
    config: &DecoderConfig,
    json: bool,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let mut reader = RawFileReader::open_with_config(path, config.clone())?;
    let mut stream = reader.records();
    let mut count = 0usize;

    for record in stream.by_ref() {
        if limit.is_some_and(|n| count >= n) {
            break;
        }
        let record = record.with_context(|| format!("After {} records", count))?;
        if json {
            println!("{}", serde_json::to_string(&record)?);
        } else {
            println!("{}", record);
        }
        count += 1;
    }

    info!(records = count, bytes = stream.stats().bytes, "Dump complete");
    Ok(())
}

fn validate_file(path: &Path, config: &DecoderConfig) -> anyhow::Result<bool> {
    println!("Validating: {}", path.display());

    let strict = DecoderConfig {
        size_check: SizeCheck::Strict,
        ..config.clone()
    };
    let mut reader = RawFileReader::open_with_config(path, strict)?;
    let mut stream = reader.records();
    let mut failure = None;

    for record in stream.by_ref() {
        if let Err(e) = record {
            failure = Some(e);
            break;
        }
    }

    let stats = stream.stats();
    println!("  Records:        {}", stats.records());
    println!("  Bytes decoded:  {}", stats.bytes);

    match failure {
        None => {
            println!("\n\x1b[32m✓ File is valid\x1b[0m");
            Ok(true)
        }
        Some(e) => {
            if e.is_premature_eof() {
                println!("\n\x1b[33m⚠ File is truncated: {}\x1b[0m", e);
            } else {
                println!("\n\x1b[31m✗ File is corrupted: {}\x1b[0m", e);
            }
            Ok(false)
        }
    }
}

fn show_events(path: &Path, config: &DecoderConfig) -> anyhow::Result<()> {
    let contents = RunContents::load(path, config)
        .with_context(|| format!("Failed to decode {}", path.display()))?;

    println!(
        "{:>8} {:>6} {:>6} {:>12} {:>6} {:<25} Channels",
        "Event", "Dig", "Set", "TriggerTag", "Shift", "Clock time"
    );
    println!("{}", "-".repeat(84));

    for event in contents.events.values() {
        let clock = event
            .clock_time()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| event.tod_stamp.to_string());
        let channels: Vec<String> = event.channels().map(|c| c.to_string()).collect();
        println!(
            "{:>8} {:>6} {:>6} {:>12} {:>6} {:<25} {}",
            event.id,
            event.digitizer_id,
            event.settings_id,
            event.trigger_tag,
            event.shift,
            clock,
            channels.join(",")
        );
    }

    println!("{}", "-".repeat(84));
    println!("Total: {} events", contents.events.len());
    Ok(())
}

fn print_trace(
    path: &Path,
    config: &DecoderConfig,
    event: u32,
    channel: u32,
    magnitude: Magnitude,
) -> anyhow::Result<()> {
    let contents = RunContents::load(path, config)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    let points = contents.channel_samples(event, channel, magnitude)?;

    let unit = match magnitude {
        Magnitude::AdcCounts => "adc",
        Magnitude::Voltage => "V",
    };
    println!("# event {} channel {} ({} points)", event, channel, points.len());
    println!("# time_s amplitude_{}", unit);
    for p in points {
        println!("{:.9e} {}", p.time, p.amplitude);
    }
    Ok(())
}
