//! Error types for protocol loading

use thiserror::Error;

/// Errors that can occur while loading protocol definitions or configuring decoders
///
/// Decoding itself never fails: unknown or truncated frames simply produce
/// fewer channels.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Invalid frame identifier string
    #[error("invalid frame ID: {0}")]
    InvalidFrameId(String),

    /// Definition document parsed but produced no usable frames
    #[error("protocol definition contains no frames")]
    EmptySchema,

    /// Unknown PD16 device letter
    #[error("invalid PD16 device: {0} (expected A, B, C or D)")]
    InvalidDevice(String),

    /// The same PD16 device was registered twice on one bus
    #[error("PD16 device {0} already registered")]
    DuplicateDevice(char),

    /// YAML parsing error
    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Parse a CAN frame identifier string (hex) to u32
///
/// Accepts formats: "360", "0x360", "0X360", "18DB33F1"
pub fn parse_frame_id(s: &str) -> ProtocolResult<u32> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(ProtocolError::InvalidFrameId(s.to_string()));
    }
    u32::from_str_radix(digits, 16).map_err(|_| ProtocolError::InvalidFrameId(s.to_string()))
}

/// Format a frame identifier as hex string (uppercase, `0x` prefix)
///
/// Standard 11-bit identifiers are padded to three digits, extended
/// identifiers to eight.
pub fn format_frame_id(frame_id: u32) -> String {
    if frame_id <= 0x7FF {
        format!("0x{:03X}", frame_id)
    } else {
        format!("0x{:08X}", frame_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_id() {
        assert_eq!(parse_frame_id("360").unwrap(), 0x360);
        assert_eq!(parse_frame_id("0x360").unwrap(), 0x360);
        assert_eq!(parse_frame_id("0X3E0").unwrap(), 0x3E0);
        assert_eq!(parse_frame_id("0x3e0").unwrap(), 0x3E0);
        assert_eq!(parse_frame_id("  0x6D0  ").unwrap(), 0x6D0);
        assert_eq!(parse_frame_id("18DB33F1").unwrap(), 0x18DB33F1);
        assert!(parse_frame_id("frames").is_err());
        assert!(parse_frame_id("0x").is_err());
        assert!(parse_frame_id("").is_err());
        assert!(parse_frame_id("1FFFFFFFF").is_err()); // Too large
    }

    #[test]
    fn test_format_frame_id() {
        assert_eq!(format_frame_id(0x360), "0x360");
        assert_eq!(format_frame_id(0x06D), "0x06D");
        assert_eq!(format_frame_id(0x18DB33F1), "0x18DB33F1");
    }

    #[test]
    fn test_error_display() {
        let err = ProtocolError::InvalidFrameId("zz".to_string());
        assert_eq!(err.to_string(), "invalid frame ID: zz");
        assert_eq!(
            ProtocolError::DuplicateDevice('B').to_string(),
            "PD16 device B already registered"
        );
    }
}
