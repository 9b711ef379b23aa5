//! Decode command - turn a candump log into channel values

use anyhow::{Context, Result};
use devdash_protocol::{format_frame_id, BusDecoder};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

use crate::candump::parse_line;
use crate::output::{round_value, ChannelRow, LatestRow, OutputContext};

/// Counters reported after a decode run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub lines: u64,
    pub frames: u64,
    pub decoded_frames: u64,
    pub channels: u64,
    pub skipped: u64,
}

/// Everything produced by one pass over a log
#[derive(Debug, Default)]
pub struct DecodeReport {
    /// Every decoded channel in log order (empty in latest-only mode)
    pub rows: Vec<ChannelRow>,
    /// Last value per channel name
    pub latest: BTreeMap<String, LatestRow>,
    pub stats: DecodeStats,
}

impl DecodeReport {
    /// Decode every line from `reader`
    ///
    /// Lines that are not valid candump frames are counted and skipped.
    pub fn from_reader<R: BufRead>(bus: &BusDecoder, reader: R, keep_rows: bool) -> Result<Self> {
        let mut report = Self::default();

        for (index, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", index + 1))?;
            report.stats.lines += 1;

            let frame = match parse_line(&line) {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) => {
                    debug!(line = index + 1, error = %e, "Skipping malformed line");
                    report.stats.skipped += 1;
                    continue;
                }
            };
            report.stats.frames += 1;

            let decoded = bus.decode(frame.id, &frame.data);
            if decoded.is_empty() {
                continue;
            }
            report.stats.decoded_frames += 1;

            let id = format_frame_id(frame.id);
            let timestamp = frame
                .timestamp
                .map(|t| format!("{:.6}", t))
                .unwrap_or_default();

            for (channel, value) in decoded {
                report.stats.channels += 1;
                let rounded = round_value(value.value);

                let entry = report
                    .latest
                    .entry(channel.clone())
                    .or_insert_with(|| LatestRow {
                        channel: channel.clone(),
                        value: rounded,
                        unit: value.unit.clone(),
                        id: id.clone(),
                        updates: 0,
                    });
                entry.value = rounded;
                entry.unit.clone_from(&value.unit);
                entry.updates += 1;

                if keep_rows {
                    report.rows.push(ChannelRow {
                        timestamp: timestamp.clone(),
                        id: id.clone(),
                        channel,
                        value: rounded,
                        unit: value.unit,
                    });
                }
            }
        }

        Ok(report)
    }
}

/// Decode a log file (or stdin) and print the result
pub fn decode(
    bus: &BusDecoder,
    input: Option<&Path>,
    latest: bool,
    ctx: &OutputContext,
) -> Result<()> {
    let report = match input {
        Some(path) if path != Path::new("-") => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            DecodeReport::from_reader(bus, BufReader::new(file), !latest)?
        }
        _ => DecodeReport::from_reader(bus, io::stdin().lock(), !latest)?,
    };

    let stats = &report.stats;
    info!(
        lines = stats.lines,
        frames = stats.frames,
        decoded = stats.decoded_frames,
        channels = stats.channels,
        skipped = stats.skipped,
        "Decode complete"
    );
    if stats.frames == 0 && stats.skipped > 0 {
        ctx.warn(&format!(
            "No frames recognised; {} lines were not in candump format",
            stats.skipped
        ));
    }

    if latest {
        let rows: Vec<LatestRow> = report.latest.into_values().collect();
        ctx.print(&rows);
    } else {
        ctx.print(&report.rows);
    }
    Ok(())
}
