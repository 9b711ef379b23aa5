//! Protocol schema - the frame table loaded from a definition document
//!
//! A definition document maps hex frame identifiers to frame objects:
//!
//! ```json
//! {
//!   "0x360": {
//!     "name": "Engine Core 1",
//!     "rate_hz": 50,
//!     "channels": [
//!       { "name": "RPM", "bytes": [0, 1], "signed": false, "units": "RPM", "conversion": "x" },
//!       { "name": "Throttle Position", "bytes": [4, 5], "signed": false, "units": "%", "conversion": "x / 10" }
//!     ]
//!   }
//! }
//! ```
//!
//! The same mapping may also be nested under a top-level `frames` key. YAML
//! documents with the same structure are accepted as well.
//!
//! Loading is tolerant: a bad frame key, frame object or channel is skipped
//! with a warning and the rest of the document still loads. Only an
//! unreadable document or an empty result is an error.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::definition::{ChannelDefinition, ChannelEntry, FrameDefinition, FrameEntry};
use crate::error::{parse_frame_id, ProtocolError, ProtocolResult};

/// Key under which some documents nest the frame mapping
const FRAMES_KEY: &str = "frames";

/// Serialization format of a definition document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Pick the format from a file extension (`.yaml`/`.yml` → YAML, otherwise JSON)
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml") | Some("yml") => DocumentFormat::Yaml,
            _ => DocumentFormat::Json,
        }
    }
}

/// Frame table keyed by CAN identifier
///
/// Immutable once built; a reload builds a fresh schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtocolSchema {
    frames: HashMap<u32, FrameDefinition>,
}

/// Document shape with the frame mapping nested under `frames`
#[derive(Deserialize)]
struct NestedDocument<V> {
    frames: BTreeMap<String, V>,
}

impl ProtocolSchema {
    /// Build a schema from already-constructed frame definitions
    pub fn from_frames(frames: impl IntoIterator<Item = FrameDefinition>) -> Self {
        Self {
            frames: frames.into_iter().map(|f| (f.frame_id, f)).collect(),
        }
    }

    /// Load a definition document from disk
    pub fn from_file(path: impl AsRef<Path>) -> ProtocolResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match DocumentFormat::from_path(path) {
            DocumentFormat::Json => Self::from_json(&content),
            DocumentFormat::Yaml => Self::from_yaml(&content),
        }
    }

    /// Parse a JSON definition document
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        let entries = top_level_entries(
            json,
            |s| serde_json::from_str::<BTreeMap<String, serde_json::Value>>(s),
            |s| serde_json::from_str::<NestedDocument<serde_json::Value>>(s),
        )?;
        Self::from_entries(entries, |v| {
            serde_json::from_value::<FrameEntry>(v).map_err(|e| e.to_string())
        })
    }

    /// Parse a YAML definition document
    pub fn from_yaml(yaml: &str) -> ProtocolResult<Self> {
        let entries = top_level_entries(
            yaml,
            |s| serde_yaml::from_str::<BTreeMap<String, serde_yaml::Value>>(s),
            |s| serde_yaml::from_str::<NestedDocument<serde_yaml::Value>>(s),
        )?;
        Self::from_entries(entries, |v| {
            serde_yaml::from_value::<FrameEntry>(v).map_err(|e| e.to_string())
        })
    }

    fn from_entries<V>(
        entries: BTreeMap<String, V>,
        read_frame: impl Fn(V) -> Result<FrameEntry, String>,
    ) -> ProtocolResult<Self> {
        let mut frames = HashMap::new();

        for (key, value) in entries {
            let frame_id = match parse_frame_id(&key) {
                Ok(id) => id,
                Err(_) => {
                    warn!(key = %key, "Skipping frame with invalid ID");
                    continue;
                }
            };

            let entry = match read_frame(value) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping unreadable frame definition");
                    continue;
                }
            };

            let frame = build_frame(frame_id, entry);
            if frames.insert(frame_id, frame).is_some() {
                warn!(key = %key, "Duplicate frame ID, keeping the later definition");
            }
        }

        if frames.is_empty() {
            return Err(ProtocolError::EmptySchema);
        }

        Ok(Self { frames })
    }

    /// Look up a frame definition
    pub fn frame(&self, frame_id: u32) -> Option<&FrameDefinition> {
        self.frames.get(&frame_id)
    }

    /// Check if a frame is defined
    pub fn contains(&self, frame_id: u32) -> bool {
        self.frames.contains_key(&frame_id)
    }

    /// All defined frame IDs, ascending
    pub fn frame_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.frames.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over frame definitions (unordered)
    pub fn frames(&self) -> impl Iterator<Item = &FrameDefinition> {
        self.frames.values()
    }

    /// Number of defined frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if the schema has no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total number of channels across all frames
    pub fn channel_count(&self) -> usize {
        self.frames.values().map(|f| f.channels.len()).sum()
    }
}

/// Read the frame mapping, unwrapping a top-level `frames` key if present
///
/// The nested shape is re-read from the source text so identifier keys stay
/// strings in both formats.
fn top_level_entries<V, E>(
    text: &str,
    flat: impl Fn(&str) -> Result<BTreeMap<String, V>, E>,
    nested: impl Fn(&str) -> Result<NestedDocument<V>, E>,
) -> ProtocolResult<BTreeMap<String, V>>
where
    V: DeserializeOwned,
    ProtocolError: From<E>,
{
    let entries = flat(text)?;
    if entries.contains_key(FRAMES_KEY) {
        return Ok(nested(text)?.frames);
    }
    Ok(entries)
}

fn build_frame(frame_id: u32, entry: FrameEntry) -> FrameDefinition {
    let mut frame = FrameDefinition::new(frame_id, entry.name).with_rate(entry.rate_hz);

    for (index, value) in entry.channels.into_iter().enumerate() {
        let channel = match serde_json::from_value::<ChannelEntry>(value) {
            Ok(channel) => channel,
            Err(e) => {
                warn!(
                    frame = %frame.name,
                    index,
                    error = %e,
                    "Skipping unreadable channel definition"
                );
                continue;
            }
        };

        let byte_count = channel.bytes.len();
        let name = channel.name.clone();
        match ChannelDefinition::from_entry(channel) {
            Some(def) => {
                debug!(
                    frame = %frame.name,
                    channel = %def.key,
                    conversion = ?def.conversion,
                    "Loaded channel"
                );
                frame.channels.push(def);
            }
            None => warn!(
                frame = %frame.name,
                channel = %name,
                byte_count,
                "Skipping channel: expected 1 or 2 byte offsets"
            ),
        }
    }

    frame
}
