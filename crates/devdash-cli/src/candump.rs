//! candump log line parsing
//!
//! Accepts the three layouts `candump` and friends produce:
//!
//! ```text
//! (1700000000.123456) can0 360#0DAC03F501F40000     # candump -l
//! 360#0DAC03F501F40000                              # cansend syntax
//!   can0  360   [8]  0D AC 03 F5 01 F4 00 00        # candump default
//! ```

use anyhow::{bail, Context, Result};
use devdash_protocol::parse_frame_id;

/// Classic CAN payload limit
const MAX_PAYLOAD_LEN: usize = 8;

/// One frame read from a log
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedFrame {
    pub timestamp: Option<f64>,
    pub interface: Option<String>,
    pub id: u32,
    pub data: Vec<u8>,
}

/// Parse one log line
///
/// Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<LoggedFrame>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut tokens: Vec<&str> = line.split_whitespace().collect();

    let mut timestamp = None;
    if let Some(first) = tokens.first() {
        if let Some(inner) = first.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
            timestamp = Some(
                inner
                    .parse::<f64>()
                    .with_context(|| format!("invalid timestamp: {}", first))?,
            );
            tokens.remove(0);
        }
    }

    if let Some(pos) = tokens.iter().position(|t| t.contains('#')) {
        let interface = pos.checked_sub(1).map(|i| tokens[i].to_string());
        let (id, data) = parse_compact(tokens[pos])?;
        return Ok(Some(LoggedFrame {
            timestamp,
            interface,
            id,
            data,
        }));
    }

    if let Some(pos) = tokens
        .iter()
        .position(|t| t.starts_with('[') && t.ends_with(']'))
    {
        let Some(id_pos) = pos.checked_sub(1) else {
            bail!("missing frame ID before length field");
        };
        let interface = id_pos.checked_sub(1).map(|i| tokens[i].to_string());
        let id = parse_frame_id(tokens[id_pos])?;
        let dlc: usize = tokens[pos][1..tokens[pos].len() - 1]
            .parse()
            .with_context(|| format!("invalid length field: {}", tokens[pos]))?;

        let data = tokens[pos + 1..]
            .iter()
            .map(|b| hex::decode(b).with_context(|| format!("invalid data byte: {}", b)))
            .collect::<Result<Vec<Vec<u8>>>>()?
            .concat();
        if data.len() != dlc {
            bail!("length field says {} bytes, found {}", dlc, data.len());
        }
        check_len(&data)?;
        return Ok(Some(LoggedFrame {
            timestamp,
            interface,
            id,
            data,
        }));
    }

    bail!("unrecognised candump line")
}

/// Parse `ID#DATA`
fn parse_compact(token: &str) -> Result<(u32, Vec<u8>)> {
    let (id, data) = token
        .split_once('#')
        .context("missing '#' separator")?;
    if data.starts_with('#') {
        bail!("CAN FD frames are not supported");
    }
    if data.starts_with(['R', 'r']) {
        bail!("remote frames carry no data");
    }
    let id = parse_frame_id(id)?;
    let data = hex::decode(data).with_context(|| format!("invalid payload: {}", data))?;
    check_len(&data)?;
    Ok((id, data))
}

fn check_len(data: &[u8]) -> Result<()> {
    if data.len() > MAX_PAYLOAD_LEN {
        bail!("payload of {} bytes exceeds {}", data.len(), MAX_PAYLOAD_LEN);
    }
    Ok(())
}
