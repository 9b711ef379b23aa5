//! Primary Haltech frame decoder
//!
//! [`HaltechProtocol`] turns `(frame_id, payload)` into named channel values.
//! Loading a definition document builds a table of per-frame decode closures
//! once; decoding is a single map lookup followed by the frame's closure.
//! Frames the document does not cover are served from the degraded-mode
//! table in [`crate::fallback`].

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracing::{info, warn};

use crate::bytes::{decode_uint16, read_u16_be};
use crate::conversion::ConversionType;
use crate::definition::{ChannelDefinition, FrameDefinition};
use crate::error::ProtocolResult;
use crate::fallback::{default_frames, FallbackFrame};
use crate::schema::ProtocolSchema;
use crate::types::{ChannelValue, DecodedChannel};

/// Shortest payload worth decoding
const MIN_PAYLOAD_LEN: usize = 2;

/// Decode closure for one frame identifier
pub type FrameDecoder = Box<dyn Fn(&[u8]) -> Vec<DecodedChannel> + Send + Sync>;

/// Data-driven decoder for the Haltech ECU CAN broadcast
pub struct HaltechProtocol {
    schema: Option<ProtocolSchema>,
    decoders: HashMap<u32, FrameDecoder>,
    fallback: HashMap<u32, FallbackFrame>,
}

impl Default for HaltechProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HaltechProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fallback_ids: Vec<_> = self.fallback.keys().collect();
        fallback_ids.sort_unstable();
        f.debug_struct("HaltechProtocol")
            .field("frame_ids", &self.frame_ids())
            .field("fallback_ids", &fallback_ids)
            .finish()
    }
}

impl HaltechProtocol {
    /// Create a decoder with no schema; only degraded-mode frames decode
    pub fn new() -> Self {
        Self {
            schema: None,
            decoders: HashMap::new(),
            fallback: default_frames()
                .into_iter()
                .map(|f| (f.frame_id, f))
                .collect(),
        }
    }

    /// Create a decoder from an already-built schema
    pub fn with_schema(schema: ProtocolSchema) -> Self {
        let mut protocol = Self::new();
        protocol.install(schema);
        protocol
    }

    /// Disable the degraded-mode table; unknown frames then decode to nothing
    pub fn without_fallback(mut self) -> Self {
        self.fallback.clear();
        self
    }

    /// Load a definition document, logging the outcome
    ///
    /// Returns `false` if the document could not be loaded. The previously
    /// loaded schema, if any, stays in effect.
    pub fn load_definition(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.try_load_definition(path) {
            Ok(count) => {
                info!(path = %path.display(), frames = count, "Loaded protocol definition");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load protocol definition");
                false
            }
        }
    }

    /// Load a definition document, returning the number of frames
    pub fn try_load_definition(&mut self, path: impl AsRef<Path>) -> ProtocolResult<usize> {
        let schema = ProtocolSchema::from_file(path)?;
        let count = schema.len();
        self.install(schema);
        Ok(count)
    }

    /// Replace the current schema and rebuild the decoder table
    pub fn install(&mut self, schema: ProtocolSchema) {
        self.decoders = schema
            .frames()
            .map(|frame| (frame.frame_id, build_frame_decoder(frame)))
            .collect();
        self.schema = Some(schema);
    }

    /// Decode one frame
    ///
    /// Unknown identifiers and payloads shorter than two bytes produce an
    /// empty result. Channels whose bytes lie beyond the payload are omitted.
    pub fn decode(&self, frame_id: u32, payload: &[u8]) -> Vec<DecodedChannel> {
        if payload.len() < MIN_PAYLOAD_LEN {
            return Vec::new();
        }
        if let Some(decoder) = self.decoders.get(&frame_id) {
            return decoder(payload);
        }
        match self.fallback.get(&frame_id) {
            Some(frame) => frame.decode(payload),
            None => Vec::new(),
        }
    }

    /// Check if this decoder produces anything for a frame identifier
    pub fn handles(&self, frame_id: u32) -> bool {
        self.decoders.contains_key(&frame_id) || self.fallback.contains_key(&frame_id)
    }

    /// Check if a definition document has been loaded
    pub fn is_loaded(&self) -> bool {
        self.schema.is_some()
    }

    /// The loaded schema
    pub fn schema(&self) -> Option<&ProtocolSchema> {
        self.schema.as_ref()
    }

    /// Frame IDs defined by the loaded schema, ascending
    pub fn frame_ids(&self) -> Vec<u32> {
        self.schema
            .as_ref()
            .map(ProtocolSchema::frame_ids)
            .unwrap_or_default()
    }

    /// Look up a frame definition in the loaded schema
    pub fn frame(&self, frame_id: u32) -> Option<&FrameDefinition> {
        self.schema.as_ref()?.frame(frame_id)
    }

    /// Number of frames in the loaded schema
    pub fn len(&self) -> usize {
        self.schema.as_ref().map_or(0, ProtocolSchema::len)
    }

    /// Check if no schema frames are loaded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Engine speed from bytes 0-1 of an Engine Core frame
    pub fn decode_rpm(payload: &[u8]) -> f64 {
        f64::from(decode_uint16(payload, 0))
    }

    /// Kelvin x10 temperature at `offset`, in °C (0 if out of range)
    pub fn decode_temperature(payload: &[u8], offset: usize) -> f64 {
        read_u16_be(payload, offset)
            .map(|raw| ConversionType::KelvinToCelsius.apply(f64::from(raw)))
            .unwrap_or(0.0)
    }

    /// Absolute kPa x10 pressure at `offset`, in kPa (0 if out of range)
    pub fn decode_pressure(payload: &[u8], offset: usize) -> f64 {
        read_u16_be(payload, offset)
            .map(|raw| ConversionType::DivideBy10.apply(f64::from(raw)))
            .unwrap_or(0.0)
    }
}

struct CompiledChannel {
    key: String,
    unit: String,
    definition: ChannelDefinition,
}

fn build_frame_decoder(frame: &FrameDefinition) -> FrameDecoder {
    let channels: Vec<CompiledChannel> = frame
        .channels
        .iter()
        .map(|c| CompiledChannel {
            key: c.key.clone(),
            unit: c.output_unit().to_string(),
            definition: c.clone(),
        })
        .collect();

    Box::new(move |payload: &[u8]| {
        channels
            .iter()
            .filter_map(|c| {
                let raw = c.definition.extract_raw(payload)?;
                let value = c.definition.conversion.apply(raw);
                Some((c.key.clone(), ChannelValue::new(value, c.unit.as_str())))
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const ENGINE_JSON: &str = r#"{
        "0x360": {
            "name": "Engine Core 1",
            "rate_hz": 50,
            "channels": [
                { "name": "RPM", "bytes": [0, 1], "signed": false, "units": "RPM", "conversion": "x" },
                { "name": "Manifold Pressure", "bytes": [2, 3], "signed": false, "units": "kPa", "conversion": "x / 10" },
                { "name": "Throttle Position", "bytes": [4, 5], "signed": false, "units": "%", "conversion": "x / 10" },
                { "name": "Coolant Pressure", "bytes": [6, 7], "signed": false, "units": "kPa", "conversion": "(x / 10) - 101.3" }
            ]
        }
    }"#;

    fn loaded() -> HaltechProtocol {
        HaltechProtocol::with_schema(ProtocolSchema::from_json(ENGINE_JSON).unwrap())
    }

    fn names(decoded: &[DecodedChannel]) -> Vec<&str> {
        decoded.iter().map(|(n, _)| n.as_str()).collect()
    }

    #[test]
    fn test_schema_decode() {
        let protocol = loaded();
        let decoded = protocol.decode(0x360, &[0x0D, 0xAC, 0x03, 0xF5, 0x01, 0xF4, 0x07, 0xDD]);
        assert_eq!(
            names(&decoded),
            vec!["rpm", "manifoldPressure", "throttlePosition", "coolantPressure"]
        );
        assert_eq!(decoded[0].1, ChannelValue::new(3500.0, "RPM"));
        assert!((decoded[1].1.value - 101.3).abs() < 1e-9);
        assert_eq!(decoded[2].1, ChannelValue::new(50.0, "%"));
        assert!((decoded[3].1.value - 100.0).abs() < 0.1);
        assert!(decoded.iter().all(|(_, v)| v.valid));
    }

    #[test]
    fn test_truncated_payload_omits_channels() {
        let protocol = loaded();
        let decoded = protocol.decode(0x360, &[0x0D, 0xAC, 0x03, 0xF5, 0x01]);
        assert_eq!(names(&decoded), vec!["rpm", "manifoldPressure"]);
    }

    #[test]
    fn test_short_payload_is_empty() {
        let protocol = loaded();
        assert!(protocol.decode(0x360, &[]).is_empty());
        assert!(protocol.decode(0x360, &[0x0D]).is_empty());
    }

    #[test]
    fn test_fallback_without_schema() {
        let protocol = HaltechProtocol::new();
        assert!(!protocol.is_loaded());
        let decoded = protocol.decode(0x360, &[0x0D, 0xAC, 0x01, 0xF4, 0, 0, 0, 0]);
        assert_eq!(names(&decoded), vec!["rpm", "throttlePosition"]);
        assert_eq!(decoded[1].1.value, 50.0);
    }

    #[test]
    fn test_schema_overrides_fallback_per_frame() {
        let protocol = loaded();
        // Schema layout: throttle at bytes 4-5
        let decoded = protocol.decode(0x360, &[0x0D, 0xAC, 0x01, 0xF4]);
        assert_eq!(names(&decoded), vec!["rpm", "manifoldPressure"]);

        // 0x3E0 is not in the schema, so the fallback still answers
        let temps = protocol.decode(0x3E0, &[0x0E, 0x30]);
        assert_eq!(names(&temps), vec!["coolantTemperature"]);
    }

    #[test]
    fn test_without_fallback() {
        let protocol = HaltechProtocol::new().without_fallback();
        assert!(protocol.decode(0x360, &[0x0D, 0xAC, 0x01, 0xF4]).is_empty());
        assert!(!protocol.handles(0x360));
    }

    #[test]
    fn test_unknown_frame_is_empty() {
        let protocol = loaded();
        for len in 0..=8 {
            assert!(protocol.decode(0x7FF, &vec![0xAA; len]).is_empty());
        }
    }

    #[test]
    fn test_failed_load_keeps_schema() {
        let mut protocol = loaded();
        assert!(!protocol.load_definition("/nonexistent/haltech.json"));
        assert!(protocol.is_loaded());
        assert_eq!(protocol.frame_ids(), vec![0x360]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, "{}").unwrap();
        assert!(!protocol.load_definition(&path));
        assert_eq!(protocol.len(), 1);
    }

    #[test]
    fn test_reload_replaces_schema() {
        let mut protocol = loaded();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speed.json");
        std::fs::write(
            &path,
            r#"{ "0x370": { "name": "Vehicle Speed", "channels": [
                { "name": "Vehicle Speed", "bytes": [0, 1], "units": "km/h", "conversion": "x / 10" }
            ] } }"#,
        )
        .unwrap();

        assert_eq!(protocol.try_load_definition(&path).unwrap(), 1);
        assert_eq!(protocol.frame_ids(), vec![0x370]);
        assert!(protocol.frame(0x360).is_none());
        // 0x360 is back on the fallback table
        let decoded = protocol.decode(0x360, &[0x0D, 0xAC, 0x01, 0xF4]);
        assert_eq!(names(&decoded), vec!["rpm", "throttlePosition"]);
    }

    #[test]
    fn test_convenience_extractors() {
        let payload = [0x0D, 0xAC, 0x0E, 0x30, 0x07, 0xDD];
        assert_eq!(HaltechProtocol::decode_rpm(&payload), 3500.0);
        assert!((HaltechProtocol::decode_temperature(&payload, 2) - 90.05).abs() < 1e-9);
        assert!((HaltechProtocol::decode_pressure(&payload, 4) - 201.3).abs() < 1e-9);
        assert_eq!(HaltechProtocol::decode_temperature(&payload, 5), 0.0);
        assert_eq!(HaltechProtocol::decode_rpm(&[]), 0.0);
    }

    #[test]
    fn test_decode_pressure_is_absolute() {
        assert!((HaltechProtocol::decode_pressure(&[0x03, 0xF5], 0) - 101.3).abs() < 1e-9);
        assert_eq!(HaltechProtocol::decode_pressure(&[0x07, 0xD0], 0), 200.0);
        assert_eq!(HaltechProtocol::decode_pressure(&[0x07], 0), 0.0);
    }

    #[test]
    fn test_shared_across_threads() {
        let protocol = Arc::new(loaded());
        let payload = [0x0D, 0xAC, 0x03, 0xF5, 0x01, 0xF4, 0x07, 0xDD];
        let expected = protocol.decode(0x360, &payload);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let protocol = Arc::clone(&protocol);
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| protocol.decode(0x360, &payload))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            for decoded in handle.join().unwrap() {
                assert_eq!(decoded, expected);
            }
        }
    }
}
