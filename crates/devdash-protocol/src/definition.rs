//! Frame and channel definitions
//!
//! Represents the layout of one CAN frame: which bytes carry which
//! measurement, and how to convert them.

use serde::{Deserialize, Serialize};

use crate::bytes::{read_i8, read_u16_from, read_u8};
use crate::conversion::{resolve_conversion, ConversionType};

/// Definition of a single channel within a CAN frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelDefinition {
    /// Display name (e.g., "Coolant Temperature")
    pub name: String,
    /// Output channel name derived from `name` (e.g., "coolantTemperature")
    pub key: String,
    /// Byte offsets: one for an 8-bit field, two (MSB first) for a 16-bit field
    pub byte_indices: Vec<usize>,
    /// Interpret the field as two's complement
    pub is_signed: bool,
    /// Input unit from the definition (e.g., "K", "kPa", "RPM")
    pub units: String,
    /// Resolved conversion
    pub conversion: ConversionType,
}

impl ChannelDefinition {
    /// Build a channel from its definition-file entry
    ///
    /// Returns `None` when the entry does not describe an 8- or 16-bit field.
    pub fn from_entry(entry: ChannelEntry) -> Option<Self> {
        if !matches!(entry.bytes.len(), 1 | 2) {
            return None;
        }
        let conversion = resolve_conversion(&entry.units, &entry.conversion);
        Some(Self {
            key: to_camel_case(&entry.name),
            name: entry.name,
            byte_indices: entry.bytes,
            is_signed: entry.signed,
            units: entry.units,
            conversion,
        })
    }

    /// Create a channel directly (units drive the Kelvin override as for loaded channels)
    pub fn new(
        name: impl Into<String>,
        byte_indices: Vec<usize>,
        is_signed: bool,
        units: impl Into<String>,
        formula: &str,
    ) -> Option<Self> {
        Self::from_entry(ChannelEntry {
            name: name.into(),
            bytes: byte_indices,
            signed: is_signed,
            units: units.into(),
            conversion: formula.to_string(),
        })
    }

    /// Highest byte offset this channel reads
    pub fn max_byte_index(&self) -> usize {
        self.byte_indices.iter().copied().max().unwrap_or(0)
    }

    /// Unit emitted for this channel
    pub fn output_unit(&self) -> &str {
        self.conversion.output_unit(&self.units)
    }

    /// Extract the raw (unconverted) integer value from a payload
    ///
    /// Returns `None` if any referenced byte lies outside the payload.
    pub fn extract_raw(&self, payload: &[u8]) -> Option<f64> {
        if self.max_byte_index() >= payload.len() {
            return None;
        }
        match self.byte_indices.as_slice() {
            [offset] => {
                if self.is_signed {
                    read_i8(payload, *offset).map(f64::from)
                } else {
                    read_u8(payload, *offset).map(f64::from)
                }
            }
            [msb, lsb] => {
                let raw = read_u16_from(payload, *msb, *lsb)?;
                if self.is_signed {
                    Some(f64::from(raw as i16))
                } else {
                    Some(f64::from(raw))
                }
            }
            _ => None,
        }
    }
}

/// Definition of a CAN frame and its channels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameDefinition {
    /// CAN frame ID (e.g., 0x360)
    pub frame_id: u32,
    /// Human-readable name (e.g., "Engine Core 1")
    pub name: String,
    /// Expected update rate in Hz (informational)
    pub rate_hz: u32,
    /// Channels in wire order
    pub channels: Vec<ChannelDefinition>,
}

impl FrameDefinition {
    /// Create an empty frame definition
    pub fn new(frame_id: u32, name: impl Into<String>) -> Self {
        Self {
            frame_id,
            name: name.into(),
            rate_hz: 0,
            channels: Vec::new(),
        }
    }

    /// Set the expected update rate
    pub fn with_rate(mut self, rate_hz: u32) -> Self {
        self.rate_hz = rate_hz;
        self
    }

    /// Append a channel
    pub fn with_channel(mut self, channel: ChannelDefinition) -> Self {
        self.channels.push(channel);
        self
    }
}

/// Frame object as it appears in a definition document
#[derive(Debug, Clone, Deserialize)]
pub struct FrameEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rate_hz: u32,
    /// Kept as raw values so one malformed channel does not reject the frame
    #[serde(default)]
    pub channels: Vec<serde_json::Value>,
}

/// Channel object as it appears in a definition document
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelEntry {
    pub name: String,
    pub bytes: Vec<usize>,
    #[serde(default)]
    pub signed: bool,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub conversion: String,
}

/// Convert a display name to the output channel name
///
/// Spaces are removed and the first character lowercased:
/// "Coolant Temperature" → "coolantTemperature". A leading acronym is
/// lowercased as a whole, so "RPM" → "rpm" and "ECU Temperature" →
/// "ecuTemperature".
pub fn to_camel_case(name: &str) -> String {
    let mut words = name.split(' ').filter(|w| !w.is_empty());
    let Some(first) = words.next() else {
        return String::new();
    };

    let is_acronym = first.chars().count() > 1
        && first.chars().any(char::is_alphabetic)
        && !first.chars().any(char::is_lowercase);

    let mut out = if is_acronym {
        first.to_lowercase()
    } else {
        let mut chars = first.chars();
        match chars.next() {
            Some(c) => c.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    };
    out.extend(words);
    out
}
