//! Low-level payload extraction
//!
//! Haltech transmits every multi-byte field big-endian. All readers are
//! bounds-checked and return `None` rather than indexing past the payload.

/// Read an unsigned byte at `offset`
pub fn read_u8(payload: &[u8], offset: usize) -> Option<u8> {
    payload.get(offset).copied()
}

/// Read a signed byte at `offset`
pub fn read_i8(payload: &[u8], offset: usize) -> Option<i8> {
    read_u8(payload, offset).map(|b| b as i8)
}

/// Read a big-endian u16 from two arbitrary offsets (`msb` first)
pub fn read_u16_from(payload: &[u8], msb: usize, lsb: usize) -> Option<u16> {
    let hi = read_u8(payload, msb)?;
    let lo = read_u8(payload, lsb)?;
    Some(u16::from_be_bytes([hi, lo]))
}

/// Read a big-endian u16 starting at `offset`
pub fn read_u16_be(payload: &[u8], offset: usize) -> Option<u16> {
    read_u16_from(payload, offset, offset.checked_add(1)?)
}

/// Read a big-endian i16 starting at `offset`
pub fn read_i16_be(payload: &[u8], offset: usize) -> Option<i16> {
    read_u16_be(payload, offset).map(|v| v as i16)
}

/// Big-endian u16 at `offset`, or 0 when the payload is too short
pub fn decode_uint16(payload: &[u8], offset: usize) -> u16 {
    read_u16_be(payload, offset).unwrap_or(0)
}

/// Big-endian i16 at `offset`, or 0 when the payload is too short
pub fn decode_int16(payload: &[u8], offset: usize) -> i16 {
    read_i16_be(payload, offset).unwrap_or(0)
}

/// Extract `(byte >> shift) & mask`
pub fn bit_field(byte: u8, shift: u8, mask: u8) -> u8 {
    (byte >> shift) & mask
}
