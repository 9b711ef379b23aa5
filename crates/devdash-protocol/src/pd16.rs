//! Haltech PD16 power distribution module decoder
//!
//! Each PD16 owns a block of eight consecutive CAN identifiers starting at
//! `0x6D0 + device_index * 8`. The offset within the block selects the
//! message family; for input and output status messages the first payload
//! byte is a multiplexer naming which I/O pin the rest of the payload
//! describes:
//!
//! ```text
//!   bit  7   6   5   4   3   2   1   0
//!       [  io type  ] [-] [   index    ]
//! ```
//!
//! Channel names follow `pd16_<device>_<type>_<index>_<field>`, e.g.
//! `pd16_A_25A_3_currentLow`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bytes::{bit_field, read_u16_be, read_u8};
use crate::error::{ProtocolError, ProtocolResult};
use crate::types::{ChannelValue, DecodedChannel};

/// First identifier of device A's block
pub const PD16_BASE_ID: u32 = 0x6D0;

/// Identifiers per device block
pub const PD16_BLOCK_SIZE: u32 = 8;

const OFFSET_INPUT_STATUS: u32 = 3;
const OFFSET_OUTPUT_STATUS: u32 = 4;
const OFFSET_DEVICE_STATUS: u32 = 5;

/// PD16 unit address, set with the device's rotary switch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceId {
    #[default]
    A,
    B,
    C,
    D,
}

impl DeviceId {
    /// All addressable devices
    pub const ALL: [DeviceId; 4] = [DeviceId::A, DeviceId::B, DeviceId::C, DeviceId::D];

    /// Zero-based device index
    pub fn index(self) -> u32 {
        match self {
            DeviceId::A => 0,
            DeviceId::B => 1,
            DeviceId::C => 2,
            DeviceId::D => 3,
        }
    }

    /// Device letter
    pub fn letter(self) -> char {
        match self {
            DeviceId::A => 'A',
            DeviceId::B => 'B',
            DeviceId::C => 'C',
            DeviceId::D => 'D',
        }
    }

    /// First CAN identifier of this device's block
    pub fn base_id(self) -> u32 {
        PD16_BASE_ID + self.index() * PD16_BLOCK_SIZE
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for DeviceId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> ProtocolResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(DeviceId::A),
            "B" => Ok(DeviceId::B),
            "C" => Ok(DeviceId::C),
            "D" => Ok(DeviceId::D),
            _ => Err(ProtocolError::InvalidDevice(s.to_string())),
        }
    }
}

impl Serialize for DeviceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// I/O pin family encoded in the top three bits of the multiplexer byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoType {
    Output25A = 0,
    Output8A = 1,
    HalfBridge = 2,
    SpeedPulse = 3,
    AnalogVoltage = 4,
}

impl IoType {
    /// Map a 3-bit type code; codes 5-7 are unassigned
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(IoType::Output25A),
            1 => Some(IoType::Output8A),
            2 => Some(IoType::HalfBridge),
            3 => Some(IoType::SpeedPulse),
            4 => Some(IoType::AnalogVoltage),
            _ => None,
        }
    }

    /// Abbreviation used in channel names
    pub fn short_name(self) -> &'static str {
        match self {
            IoType::Output25A => "25A",
            IoType::Output8A => "8A",
            IoType::HalfBridge => "HBO",
            IoType::SpeedPulse => "SPI",
            IoType::AnalogVoltage => "AVI",
        }
    }
}

impl fmt::Display for IoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Handler for one message family, selected by frame offset
type OffsetHandler = fn(&Pd16Protocol, &[u8]) -> Vec<DecodedChannel>;

/// Handler for one I/O type within a status message
type IoHandler = fn(&ChannelNamer, &[u8], &mut Vec<DecodedChannel>);

const OFFSET_HANDLERS: [(u32, OffsetHandler); 3] = [
    (OFFSET_INPUT_STATUS, Pd16Protocol::decode_input_status),
    (OFFSET_OUTPUT_STATUS, Pd16Protocol::decode_output_status),
    (OFFSET_DEVICE_STATUS, Pd16Protocol::decode_device_status),
];

const INPUT_HANDLERS: [(IoType, IoHandler); 2] = [
    (IoType::SpeedPulse, decode_speed_pulse_input),
    (IoType::AnalogVoltage, decode_analog_voltage_input),
];

const OUTPUT_HANDLERS: [(IoType, IoHandler); 2] = [
    (IoType::Output25A, decode_25a_output),
    (IoType::Output8A, decode_8a_output),
];

/// Decoder for one PD16 device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pd16Protocol {
    device_id: DeviceId,
    base_id: u32,
    prefix: String,
}

impl Default for Pd16Protocol {
    fn default() -> Self {
        Self::new()
    }
}

impl Pd16Protocol {
    /// Decoder for device A
    pub fn new() -> Self {
        Self::for_device(DeviceId::A)
    }

    /// Decoder for a specific device
    pub fn for_device(device_id: DeviceId) -> Self {
        Self {
            device_id,
            base_id: device_id.base_id(),
            prefix: format!("pd16_{}", device_id),
        }
    }

    /// Re-address this decoder
    pub fn set_device_id(&mut self, device_id: DeviceId) {
        *self = Self::for_device(device_id);
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn base_id(&self) -> u32 {
        self.base_id
    }

    /// Channel name prefix, e.g. `pd16_A`
    pub fn device_prefix(&self) -> &str {
        &self.prefix
    }

    /// Check if a frame identifier falls inside this device's block
    pub fn handles(&self, frame_id: u32) -> bool {
        frame_id >= self.base_id && frame_id - self.base_id < PD16_BLOCK_SIZE
    }

    /// I/O type from a multiplexer byte
    pub fn mux_type(mux: u8) -> Option<IoType> {
        IoType::from_code(bit_field(mux, 5, 0x07))
    }

    /// Pin index from a multiplexer byte
    pub fn mux_index(mux: u8) -> u8 {
        bit_field(mux, 0, 0x0F)
    }

    /// Decode one frame
    ///
    /// Frames outside this device's block, empty payloads and unhandled
    /// message families produce an empty result.
    pub fn decode(&self, frame_id: u32, payload: &[u8]) -> Vec<DecodedChannel> {
        if payload.is_empty() || !self.handles(frame_id) {
            return Vec::new();
        }
        let offset = frame_id - self.base_id;
        OFFSET_HANDLERS
            .iter()
            .find(|(o, _)| *o == offset)
            .map(|(_, handler)| handler(self, payload))
            .unwrap_or_default()
    }

    fn decode_input_status(&self, payload: &[u8]) -> Vec<DecodedChannel> {
        self.decode_muxed(payload, &INPUT_HANDLERS)
    }

    fn decode_output_status(&self, payload: &[u8]) -> Vec<DecodedChannel> {
        self.decode_muxed(payload, &OUTPUT_HANDLERS)
    }

    fn decode_muxed(&self, payload: &[u8], handlers: &[(IoType, IoHandler)]) -> Vec<DecodedChannel> {
        if payload.len() < 2 {
            return Vec::new();
        }
        let mux = payload[0];
        let Some(io_type) = Self::mux_type(mux) else {
            return Vec::new();
        };
        let Some((_, handler)) = handlers.iter().find(|(t, _)| *t == io_type) else {
            return Vec::new();
        };

        let namer = ChannelNamer {
            stem: format!("{}_{}_{}", self.prefix, io_type, Self::mux_index(mux)),
        };
        let mut out = Vec::new();
        handler(&namer, payload, &mut out);
        out
    }

    fn decode_device_status(&self, payload: &[u8]) -> Vec<DecodedChannel> {
        let mut out = Vec::new();
        if let Some(b0) = read_u8(payload, 0) {
            out.push((
                format!("{}_status", self.prefix),
                ChannelValue::unitless(f64::from(bit_field(b0, 4, 0x0F))),
            ));
        }
        if payload.len() >= 4 {
            let major = f64::from(payload[1] & 0x03);
            let minor = f64::from(payload[2]);
            let patch = f64::from(payload[3]);
            out.push((
                format!("{}_firmwareVersion", self.prefix),
                ChannelValue::unitless(major + minor / 100.0 + patch / 10000.0),
            ));
        }
        out
    }
}

/// Builds `<prefix>_<type>_<index>_<field>` names for one multiplexed pin
struct ChannelNamer {
    stem: String,
}

impl ChannelNamer {
    fn push(&self, out: &mut Vec<DecodedChannel>, field: &str, value: f64, unit: &str) {
        out.push((format!("{}_{}", self.stem, field), ChannelValue::new(value, unit)));
    }
}

fn millis(payload: &[u8], offset: usize) -> Option<f64> {
    read_u16_be(payload, offset).map(|raw| f64::from(raw) / 1000.0)
}

fn push_state(namer: &ChannelNamer, payload: &[u8], out: &mut Vec<DecodedChannel>) {
    namer.push(out, "state", f64::from(payload[1] & 0x01), "");
}

fn push_voltage(namer: &ChannelNamer, payload: &[u8], out: &mut Vec<DecodedChannel>) {
    if let Some(volts) = millis(payload, 2) {
        namer.push(out, "voltage", volts, "V");
    }
}

fn decode_speed_pulse_input(namer: &ChannelNamer, payload: &[u8], out: &mut Vec<DecodedChannel>) {
    push_state(namer, payload, out);
    push_voltage(namer, payload, out);
    if let Some(raw) = read_u16_be(payload, 4) {
        namer.push(out, "dutyCycle", f64::from(raw) / 10.0, "%");
    }
    if let Some(raw) = read_u16_be(payload, 6) {
        namer.push(out, "frequency", f64::from(raw), "Hz");
    }
}

fn decode_analog_voltage_input(namer: &ChannelNamer, payload: &[u8], out: &mut Vec<DecodedChannel>) {
    push_state(namer, payload, out);
    push_voltage(namer, payload, out);
}

fn decode_25a_output(namer: &ChannelNamer, payload: &[u8], out: &mut Vec<DecodedChannel>) {
    namer.push(out, "load", f64::from(payload[1]), "%");
    push_voltage(namer, payload, out);
    if let Some(amps) = millis(payload, 4) {
        namer.push(out, "currentLow", amps, "A");
    }
    if let Some(raw) = read_u8(payload, 6) {
        namer.push(out, "currentHigh", f64::from(raw) / 1000.0, "A");
    }
    if let Some(b7) = read_u8(payload, 7) {
        namer.push(out, "retries", f64::from(bit_field(b7, 4, 0x0F)), "");
        namer.push(out, "pinState", f64::from(bit_field(b7, 0, 0x0F)), "");
    }
}

fn decode_8a_output(namer: &ChannelNamer, payload: &[u8], out: &mut Vec<DecodedChannel>) {
    let b1 = payload[1];
    namer.push(out, "retries", f64::from(bit_field(b1, 3, 0x1F)), "");
    namer.push(out, "pinState", f64::from(bit_field(b1, 0, 0x07)), "");
    push_voltage(namer, payload, out);
    if let Some(amps) = millis(payload, 4) {
        namer.push(out, "current", amps, "A");
    }
    if let Some(raw) = read_u8(payload, 6) {
        namer.push(out, "load", f64::from(raw), "%");
    }
}
