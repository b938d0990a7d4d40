//! Dual-chip normalization
//!
//! Logs captured from two independent OPL2 chips put the second chip on the
//! secondary port. An OPL3 in combined mode plays them as one chip once each
//! half is routed to its own stereo side and the mode register is set.

use crate::command::{Command, CommandStream};
use crate::opl3::registers::{is_channel_output, ChannelOutput, OPL3_MODE};

/// Rewrite a dual-OPL2 stream for a single OPL3
///
/// Channel output registers (`0xC0`-`0xC8` on either port) whose value has
/// no routing bits get the left bit on the primary port and the right bit on
/// the secondary port. A `0x105 = 1` write is prepended at time 0 and the
/// dual flag is cleared, so normalizing twice is a no-op. Streams without
/// the dual flag are returned unchanged.
///
/// # Examples
/// ```
/// use opl3_replayer::{normalize_dual_chip, Command, CommandStream};
///
/// let mut stream = CommandStream::from_commands(vec![Command::new(0, 0x1C0, 0x01)], 1000.0);
/// stream.dual_chip_mode = true;
/// let stream = normalize_dual_chip(stream);
/// assert_eq!(stream.commands[0], Command::new(0, 0x105, 0x01));
/// assert_eq!(stream.commands[1], Command::new(0, 0x1C0, 0x21));
/// ```
pub fn normalize_dual_chip(mut stream: CommandStream) -> CommandStream {
    if !stream.dual_chip_mode {
        return stream;
    }

    let mut routed = 0usize;
    for command in stream.commands.iter_mut() {
        if let Some(value) = route_channel_output(command.register, command.value) {
            command.value = value;
            routed += 1;
        }
    }

    stream.commands.insert(0, Command::new(0, OPL3_MODE, 0x01));
    stream.dual_chip_mode = false;

    log::debug!(
        "normalized dual-chip stream: {} channel output writes routed",
        routed
    );
    stream
}

/// Stereo-routed value for a channel output write, if it needs one
fn route_channel_output(register: u16, value: u8) -> Option<u8> {
    if !is_channel_output(register) || !ChannelOutput::from_value(value).is_empty() {
        return None;
    }

    let side = if register & 0x100 != 0 {
        ChannelOutput::RIGHT
    } else {
        ChannelOutput::LEFT
    };
    Some(value | side.bits())
}
