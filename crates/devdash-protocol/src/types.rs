//! Decoder output types
//!
//! Every decoder in this crate produces the same flat record: a channel name
//! paired with a [`ChannelValue`].

use serde::{Deserialize, Serialize};

/// Celsius temperature unit emitted for Kelvin-encoded channels
pub const UNIT_CELSIUS: &str = "°C";

/// A single decoded measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelValue {
    /// Numeric value in engineering units
    pub value: f64,
    /// Output unit (may differ from the schema's input unit, e.g. "K" → "°C")
    pub unit: String,
    /// Always true for emitted values; absence of a channel means "no data"
    pub valid: bool,
}

impl ChannelValue {
    /// Create a valid value with the given unit
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
            valid: true,
        }
    }

    /// Create a valid, unitless value (states, counters, codes)
    pub fn unitless(value: f64) -> Self {
        Self::new(value, "")
    }
}

/// A `(channel name, value)` pair as returned by every `decode` call
pub type DecodedChannel = (String, ChannelValue);
