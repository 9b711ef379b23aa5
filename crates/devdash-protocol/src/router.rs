//! Bus-level frame routing
//!
//! A Haltech CAN bus carries the ECU broadcast alongside up to four PD16
//! modules. [`BusDecoder`] owns one decoder per source and hands each frame
//! to the one whose identifier range contains it.

use tracing::debug;

use crate::decoder::HaltechProtocol;
use crate::error::{ProtocolError, ProtocolResult};
use crate::pd16::{DeviceId, Pd16Protocol};
use crate::types::DecodedChannel;

/// Which decoder a frame was routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSource {
    Ecu,
    Pd16(DeviceId),
}

/// Routes frames between the ECU decoder and PD16 decoders
#[derive(Debug, Default)]
pub struct BusDecoder {
    ecu: HaltechProtocol,
    pd16: Vec<Pd16Protocol>,
}

impl BusDecoder {
    /// Create a router around an ECU decoder
    pub fn new(ecu: HaltechProtocol) -> Self {
        Self {
            ecu,
            pd16: Vec::new(),
        }
    }

    /// Register a PD16 device
    pub fn with_pd16(mut self, device: DeviceId) -> ProtocolResult<Self> {
        self.add_pd16(device)?;
        Ok(self)
    }

    /// Register a PD16 device in place
    pub fn add_pd16(&mut self, device: DeviceId) -> ProtocolResult<()> {
        if self.pd16.iter().any(|p| p.device_id() == device) {
            return Err(ProtocolError::DuplicateDevice(device.letter()));
        }
        debug!(device = %device, base_id = device.base_id(), "Registered PD16 device");
        self.pd16.push(Pd16Protocol::for_device(device));
        self.pd16.sort_by_key(Pd16Protocol::device_id);
        Ok(())
    }

    /// The ECU decoder
    pub fn ecu(&self) -> &HaltechProtocol {
        &self.ecu
    }

    /// Mutable access to the ECU decoder, e.g. to reload its definition
    pub fn ecu_mut(&mut self) -> &mut HaltechProtocol {
        &mut self.ecu
    }

    /// Registered PD16 devices, in device order
    pub fn pd16_devices(&self) -> Vec<DeviceId> {
        self.pd16.iter().map(Pd16Protocol::device_id).collect()
    }

    /// Which decoder would handle a frame identifier
    pub fn route(&self, frame_id: u32) -> FrameSource {
        self.pd16
            .iter()
            .find(|p| p.handles(frame_id))
            .map_or(FrameSource::Ecu, |p| FrameSource::Pd16(p.device_id()))
    }

    /// Decode one frame with the decoder that owns its identifier
    pub fn decode(&self, frame_id: u32, payload: &[u8]) -> Vec<DecodedChannel> {
        match self.pd16.iter().find(|p| p.handles(frame_id)) {
            Some(pd16) => pd16.decode(frame_id, payload),
            None => self.ecu.decode(frame_id, payload),
        }
    }
}
