//! Normalized Command Stream
//!
//! Every decoder produces the same representation: an ordered list of
//! timed register writes plus the clock rate those times are expressed in.
//!
//! Register space is two 256-entry banks:
//! - `0x000-0x0FF`: primary port
//! - `0x100-0x1FF`: secondary port (OPL3 extension, or the second chip of a
//!   dual-OPL2 capture)

/// Offset added to a register number to address the secondary port
pub const SECONDARY_PORT_OFFSET: u16 = 0x100;

/// Highest valid register address (secondary port, register 0xFF)
pub const MAX_REGISTER: u16 = 0x1FF;

/// Register bank selected by port-select opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Port {
    /// Registers 0x000-0x0FF
    #[default]
    Primary,
    /// Registers 0x100-0x1FF
    Secondary,
}

impl Port {
    /// Offset added to a bank-local register number
    pub fn offset(self) -> u16 {
        match self {
            Port::Primary => 0,
            Port::Secondary => SECONDARY_PORT_OFFSET,
        }
    }

    /// Full register address for a bank-local register number
    pub fn address(self, register: u8) -> u16 {
        self.offset() | register as u16
    }

    /// Port that a full register address belongs to
    pub fn of(register: u16) -> Self {
        if register & SECONDARY_PORT_OFFSET != 0 {
            Port::Secondary
        } else {
            Port::Primary
        }
    }
}

/// A single timed register write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// Time in command-clock ticks since stream start
    pub time: u64,
    /// Register address (0x000-0x1FF)
    pub register: u16,
    /// Value written to the register
    pub value: u8,
}

impl Command {
    /// Create a command, masking the register into the valid range
    pub fn new(time: u64, register: u16, value: u8) -> Self {
        Command {
            time,
            register: register & MAX_REGISTER,
            value,
        }
    }
}

/// Time-ordered register writes plus their native clock rate
#[derive(Debug, Clone, PartialEq)]
pub struct CommandStream {
    /// Commands in non-decreasing time order, equal times in decode order
    pub commands: Vec<Command>,
    /// Ticks per second of `Command::time`
    pub cmd_rate: f64,
    /// Both banks were authored as two independent OPL2 chips
    pub dual_chip_mode: bool,
}

impl CommandStream {
    /// Create an empty stream at the given command rate
    pub fn new(cmd_rate: f64) -> Self {
        CommandStream {
            commands: Vec::new(),
            cmd_rate,
            dual_chip_mode: false,
        }
    }

    /// Create a stream from commands already in time order
    pub fn from_commands(commands: Vec<Command>, cmd_rate: f64) -> Self {
        debug_assert!(commands.windows(2).all(|w| w[0].time <= w[1].time));
        CommandStream {
            commands,
            cmd_rate,
            dual_chip_mode: false,
        }
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the stream holds no commands
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Time of the last command in ticks, or 0 for an empty stream
    pub fn last_time(&self) -> u64 {
        self.commands.last().map_or(0, |cmd| cmd.time)
    }

    /// Stream duration in seconds (last command time / rate)
    pub fn total_seconds(&self) -> f64 {
        if self.commands.is_empty() || self.cmd_rate <= 0.0 {
            0.0
        } else {
            self.last_time() as f64 / self.cmd_rate
        }
    }

    /// Convert a time in seconds to command ticks
    pub fn seconds_to_ticks(&self, seconds: f64) -> f64 {
        seconds * self.cmd_rate
    }
}

/// Accumulates commands while a decoder walks its body
///
/// Decoders add delays and writes in file order; the builder keeps the
/// running time so every format shares the "delay after write" bookkeeping.
#[cfg_attr(not(feature = "formats"), allow(dead_code))]
#[derive(Debug, Clone)]
pub(crate) struct StreamBuilder {
    commands: Vec<Command>,
    time: u64,
}

#[cfg_attr(not(feature = "formats"), allow(dead_code))]
impl StreamBuilder {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        StreamBuilder {
            commands: Vec::with_capacity(capacity),
            time: 0,
        }
    }

    pub(crate) fn write(&mut self, register: u16, value: u8) {
        self.commands.push(Command::new(self.time, register, value));
    }

    pub(crate) fn delay(&mut self, ticks: u64) {
        self.time = self.time.saturating_add(ticks);
    }

    pub(crate) fn finish(self, cmd_rate: f64, dual_chip_mode: bool) -> CommandStream {
        CommandStream {
            commands: self.commands,
            cmd_rate,
            dual_chip_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_port_addressing() {
        assert_eq!(Port::Primary.address(0xB0), 0x0B0);
        assert_eq!(Port::Secondary.address(0xB0), 0x1B0);
        assert_eq!(Port::of(0x1C3), Port::Secondary);
        assert_eq!(Port::of(0x0C3), Port::Primary);
    }

    #[test]
    fn test_command_masks_register() {
        let cmd = Command::new(0, 0x3FF, 0x12);
        assert_eq!(cmd.register, 0x1FF);
    }

    #[test]
    fn test_total_seconds() {
        let stream = CommandStream::from_commands(
            vec![Command::new(0, 0x20, 1), Command::new(1000, 0x20, 2)],
            1000.0,
        );
        assert_relative_eq!(stream.total_seconds(), 1.0);
        assert_eq!(stream.last_time(), 1000);
    }

    #[test]
    fn test_empty_stream_has_zero_duration() {
        let stream = CommandStream::new(44_100.0);
        assert!(stream.is_empty());
        assert_eq!(stream.total_seconds(), 0.0);
    }

    #[test]
    fn test_builder_delays_after_write() {
        let mut builder = StreamBuilder::with_capacity(4);
        builder.write(0x20, 1);
        builder.delay(5);
        builder.write(0x40, 2);
        builder.write(0x60, 3);
        let stream = builder.finish(560.0, false);
        let times: Vec<u64> = stream.commands.iter().map(|c| c.time).collect();
        assert_eq!(times, vec![0, 5, 5]);
    }
}
