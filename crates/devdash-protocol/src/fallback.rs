//! Degraded-mode frame table
//!
//! A small fixed set of Haltech frames decoded when no definition document
//! has been loaded, or when a loaded document does not cover a frame. Each
//! entry carries a sanity range; a value outside it is dropped rather than
//! emitted.

use std::ops::RangeInclusive;

use tracing::debug;

use crate::bytes::{read_i8, read_u16_be};
use crate::conversion::{ConversionType, ATMOSPHERIC_PRESSURE_KPA};
use crate::types::{ChannelValue, DecodedChannel, UNIT_CELSIUS};

/// How a fallback channel is laid out in the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLayout {
    /// Big-endian u16 starting at the offset
    U16 { offset: usize },
    /// Signed byte at the offset
    I8 { offset: usize },
}

impl FieldLayout {
    fn read(self, payload: &[u8]) -> Option<f64> {
        match self {
            FieldLayout::U16 { offset } => read_u16_be(payload, offset).map(f64::from),
            FieldLayout::I8 { offset } => read_i8(payload, offset).map(f64::from),
        }
    }
}

/// One channel of the degraded-mode table
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackChannel {
    pub name: &'static str,
    pub layout: FieldLayout,
    pub conversion: ConversionType,
    pub unit: &'static str,
    /// Inclusive plausible range after conversion
    pub range: RangeInclusive<f64>,
}

/// Fixed-layout frame decoded in degraded mode
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackFrame {
    pub frame_id: u32,
    pub channels: Vec<FallbackChannel>,
}

impl FallbackFrame {
    /// Decode every channel that fits the payload and passes its sanity range
    pub fn decode(&self, payload: &[u8]) -> Vec<DecodedChannel> {
        let mut out = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let Some(raw) = channel.layout.read(payload) else {
                continue;
            };
            let value = channel.conversion.apply(raw);
            if !channel.range.contains(&value) {
                debug!(
                    frame_id = self.frame_id,
                    channel = channel.name,
                    value,
                    "Dropping implausible fallback value"
                );
                continue;
            }
            out.push((
                channel.name.to_string(),
                ChannelValue::new(value, channel.unit),
            ));
        }
        out
    }
}

const TEMPERATURE_RANGE: RangeInclusive<f64> = -40.0..=200.0;
const PRESSURE_RANGE: RangeInclusive<f64> = -ATMOSPHERIC_PRESSURE_KPA..=1000.0;

fn channel(
    name: &'static str,
    layout: FieldLayout,
    conversion: ConversionType,
    unit: &'static str,
    range: RangeInclusive<f64>,
) -> FallbackChannel {
    FallbackChannel {
        name,
        layout,
        conversion,
        unit,
        range,
    }
}

fn temperature(name: &'static str, offset: usize) -> FallbackChannel {
    channel(
        name,
        FieldLayout::U16 { offset },
        ConversionType::KelvinToCelsius,
        UNIT_CELSIUS,
        TEMPERATURE_RANGE,
    )
}

fn pressure(name: &'static str, offset: usize) -> FallbackChannel {
    channel(
        name,
        FieldLayout::U16 { offset },
        ConversionType::GaugePressure,
        "kPa",
        PRESSURE_RANGE,
    )
}

/// The degraded-mode frame table
pub fn default_frames() -> Vec<FallbackFrame> {
    vec![
        FallbackFrame {
            frame_id: 0x360,
            channels: vec![
                channel(
                    "rpm",
                    FieldLayout::U16 { offset: 0 },
                    ConversionType::Identity,
                    "RPM",
                    0.0..=20000.0,
                ),
                channel(
                    "throttlePosition",
                    FieldLayout::U16 { offset: 2 },
                    ConversionType::DivideBy10,
                    "%",
                    0.0..=100.0,
                ),
            ],
        },
        FallbackFrame {
            frame_id: 0x361,
            channels: vec![pressure("fuelPressure", 0), pressure("oilPressure", 2)],
        },
        FallbackFrame {
            frame_id: 0x370,
            channels: vec![channel(
                "vehicleSpeed",
                FieldLayout::U16 { offset: 0 },
                ConversionType::DivideBy10,
                "km/h",
                0.0..=400.0,
            )],
        },
        FallbackFrame {
            frame_id: 0x3E0,
            channels: vec![
                temperature("coolantTemperature", 0),
                temperature("airTemperature", 2),
                temperature("fuelTemperature", 4),
                temperature("oilTemperature", 6),
            ],
        },
        FallbackFrame {
            frame_id: 0x470,
            channels: vec![channel(
                "gear",
                FieldLayout::I8 { offset: 7 },
                ConversionType::Identity,
                "",
                -1.0..=10.0,
            )],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame(id: u32) -> FallbackFrame {
        default_frames()
            .into_iter()
            .find(|f| f.frame_id == id)
            .unwrap()
    }

    fn names(decoded: &[DecodedChannel]) -> Vec<&str> {
        decoded.iter().map(|(n, _)| n.as_str()).collect()
    }

    #[test]
    fn test_table_ids_are_unique() {
        let mut ids: Vec<u32> = default_frames().iter().map(|f| f.frame_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids, vec![0x360, 0x361, 0x370, 0x3E0, 0x470]);
    }

    #[test]
    fn test_engine_core() {
        let decoded = frame(0x360).decode(&[0x0D, 0xAC, 0x01, 0xF4, 0, 0, 0, 0]);
        assert_eq!(names(&decoded), vec!["rpm", "throttlePosition"]);
        assert_eq!(decoded[0].1, ChannelValue::new(3500.0, "RPM"));
        assert_eq!(decoded[1].1, ChannelValue::new(50.0, "%"));
    }

    #[test]
    fn test_out_of_range_is_dropped() {
        // throttle 0x0FA0 = 400.0 %
        let decoded = frame(0x360).decode(&[0x0D, 0xAC, 0x0F, 0xA0]);
        assert_eq!(names(&decoded), vec!["rpm"]);

        // 0 K is far below -40 °C
        let decoded = frame(0x3E0).decode(&[0x0E, 0x30, 0x00, 0x00]);
        assert_eq!(names(&decoded), vec!["coolantTemperature"]);
    }

    #[test]
    fn test_truncated_payload() {
        let decoded = frame(0x3E0).decode(&[0x0E, 0x30, 0x0B, 0xB8, 0x0B]);
        assert_eq!(names(&decoded), vec!["coolantTemperature", "airTemperature"]);
        assert!((decoded[0].1.value - 90.05).abs() < 1e-9);
        assert_eq!(decoded[0].1.unit, "°C");
    }

    #[test]
    fn test_signed_gear() {
        let mut payload = [0u8; 8];
        payload[7] = 0xFF;
        let decoded = frame(0x470).decode(&payload);
        assert_eq!(decoded, vec![("gear".to_string(), ChannelValue::new(-1.0, ""))]);

        payload[7] = 0x80;
        assert!(frame(0x470).decode(&payload).is_empty());
        assert!(frame(0x470).decode(&payload[..7]).is_empty());
    }

    #[test]
    fn test_gauge_pressure_floor() {
        let decoded = frame(0x361).decode(&[0, 0, 0x07, 0xDD]);
        assert_eq!(names(&decoded), vec!["fuelPressure", "oilPressure"]);
        assert_eq!(decoded[0].1.value, -ATMOSPHERIC_PRESSURE_KPA);
        assert!((decoded[1].1.value - 100.0).abs() < 0.1);
    }
}
