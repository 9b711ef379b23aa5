//! Frames command - show the loaded protocol definition

use anyhow::{bail, Result};
use devdash_protocol::{format_frame_id, FrameDefinition, HaltechProtocol, ProtocolSchema};

use crate::output::{ChannelDefRow, FrameRow, OutputContext};

/// List frames, or every channel layout with `channels`
pub fn frames(protocol: &HaltechProtocol, channels: bool, ctx: &OutputContext) -> Result<()> {
    let Some(schema) = protocol.schema() else {
        bail!("No protocol definition loaded (use --protocol or set `protocol` in the config file)");
    };

    if channels {
        ctx.print(&channel_rows(schema));
    } else {
        ctx.print(&frame_rows(schema));
    }
    Ok(())
}

fn ordered(schema: &ProtocolSchema) -> impl Iterator<Item = &FrameDefinition> {
    schema
        .frame_ids()
        .into_iter()
        .filter_map(move |id| schema.frame(id))
}

/// One row per frame, ascending by ID
pub fn frame_rows(schema: &ProtocolSchema) -> Vec<FrameRow> {
    ordered(schema)
        .map(|frame| FrameRow {
            id: format_frame_id(frame.frame_id),
            name: frame.name.clone(),
            rate_hz: frame.rate_hz,
            channels: frame.channels.len(),
        })
        .collect()
}

/// One row per channel, frames ascending by ID and channels in wire order
pub fn channel_rows(schema: &ProtocolSchema) -> Vec<ChannelDefRow> {
    ordered(schema)
        .flat_map(|frame| {
            frame.channels.iter().map(move |c| ChannelDefRow {
                id: format_frame_id(frame.frame_id),
                channel: c.key.clone(),
                bytes: c
                    .byte_indices
                    .iter()
                    .map(usize::to_string)
                    .collect::<Vec<_>>()
                    .join("-"),
                signed: c.is_signed,
                conversion: c.conversion.to_string(),
                unit: c.output_unit().to_string(),
            })
        })
        .collect()
}
