//! devdash-protocol - Haltech CAN Protocol Decoding
//!
//! Decodes the Haltech ECU CAN broadcast and the Haltech PD16 power
//! distribution module into named, unit-tagged channel values. Frame layouts
//! come from a definition document, so new channels need no code changes.
//!
//! # Features
//!
//! - **Data-driven frames** - JSON or YAML definition documents
//! - **Load-time compilation** - formulas and unit overrides resolved once
//! - **Degraded mode** - a built-in table for core engine frames
//! - **PD16 multiplexing** - per-pin input and output status decoding
//! - **Lock-free decoding** - decoders are `Send + Sync` and decode through `&self`
//!
//! # Quick Start
//!
//! ```rust
//! use devdash_protocol::{HaltechProtocol, ProtocolSchema};
//!
//! let schema = ProtocolSchema::from_json(r#"{
//!     "0x360": {
//!         "name": "Engine Core 1",
//!         "rate_hz": 50,
//!         "channels": [
//!             { "name": "RPM", "bytes": [0, 1], "signed": false, "units": "RPM", "conversion": "x" },
//!             { "name": "Throttle Position", "bytes": [4, 5], "signed": false, "units": "%", "conversion": "x / 10" }
//!         ]
//!     }
//! }"#).unwrap();
//!
//! let protocol = HaltechProtocol::with_schema(schema);
//! let channels = protocol.decode(0x360, &[0x0D, 0xAC, 0x03, 0xF5, 0x01, 0xF4, 0x00, 0x00]);
//!
//! assert_eq!(channels[0].0, "rpm");
//! assert_eq!(channels[0].1.value, 3500.0);
//! assert_eq!(channels[1].0, "throttlePosition");
//! assert_eq!(channels[1].1.value, 50.0);
//! ```
//!
//! # Definition Documents
//!
//! ```yaml
//! 0x3E0:
//!   name: Temperatures 1
//!   rate_hz: 5
//!   channels:
//!     - name: Coolant Temperature
//!       bytes: [0, 1]
//!       units: K              # Kelvin x10, emitted as °C
//!       conversion: x
//!     - name: Air Temperature
//!       bytes: [2, 3]
//!       units: K
//!       conversion: x
//! ```
//!
//! # Conversions
//!
//! | Formula | Result |
//! |---------|--------|
//! | `x` | raw value |
//! | `x / 10` | raw / 10 |
//! | `x / 1000` | raw / 1000 |
//! | `(x / 10) - 101.3` | gauge pressure, kPa |
//! | units `K` | (raw / 10) - 273.15, °C |

pub mod bytes;
pub mod conversion;
pub mod decoder;
pub mod definition;
pub mod error;
pub mod fallback;
pub mod pd16;
pub mod router;
pub mod schema;
pub mod types;

// Re-export main types
pub use conversion::{apply_conversion, parse_conversion, ConversionType};
pub use decoder::{FrameDecoder, HaltechProtocol};
pub use definition::{to_camel_case, ChannelDefinition, FrameDefinition};
pub use error::{format_frame_id, parse_frame_id, ProtocolError, ProtocolResult};
pub use pd16::{DeviceId, IoType, Pd16Protocol};
pub use router::{BusDecoder, FrameSource};
pub use schema::ProtocolSchema;
pub use types::{ChannelValue, DecodedChannel};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::decoder::HaltechProtocol;
    pub use crate::error::{ProtocolError, ProtocolResult};
    pub use crate::pd16::{DeviceId, Pd16Protocol};
    pub use crate::router::BusDecoder;
    pub use crate::schema::ProtocolSchema;
    pub use crate::types::{ChannelValue, DecodedChannel};
}
