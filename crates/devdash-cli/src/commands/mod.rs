//! Command implementations for devdash-decode

pub mod decode;
pub mod frames;

pub use decode::decode;
pub use frames::frames;
