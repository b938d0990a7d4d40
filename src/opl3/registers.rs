//! OPL3 Register Definitions
//!
//! Only the registers the replayer itself has to reason about are named
//! here; everything else is passed through to the backend untouched.

use bitflags::bitflags;
use std::fmt;

/// Number of addressable registers across both ports
pub const REGISTER_COUNT: usize = 0x200;

/// OPL3 mode register (secondary port 0x05, bit 0 enables OPL3 features)
pub const OPL3_MODE: u16 = 0x105;

/// First channel feedback/connection/output register
pub const CHANNEL_OUTPUT_FIRST: u8 = 0xC0;

/// Last channel feedback/connection/output register
pub const CHANNEL_OUTPUT_LAST: u8 = 0xC8;

/// Whether the bank-local part of `register` is a channel output register
pub fn is_channel_output(register: u16) -> bool {
    let local = (register & 0xFF) as u8;
    (CHANNEL_OUTPUT_FIRST..=CHANNEL_OUTPUT_LAST).contains(&local)
}

bitflags! {
    /// Output routing bits in the high nibble of 0xC0-0xC8
    ///
    /// OPL2 never sets these; an OPL3 channel with none of them set is silent.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelOutput: u8 {
        /// Output A (left)
        const LEFT = 0x10;
        /// Output B (right)
        const RIGHT = 0x20;
        /// Output C
        const C = 0x40;
        /// Output D
        const D = 0x80;
    }
}

impl ChannelOutput {
    /// Routing bits already present in a register value
    pub fn from_value(value: u8) -> Self {
        ChannelOutput::from_bits_truncate(value)
    }
}

/// Full 0x200-entry register image
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterFile {
    values: [u8; REGISTER_COUNT],
}

impl RegisterFile {
    /// Create a register file with every register cleared
    pub fn new() -> Self {
        RegisterFile {
            values: [0; REGISTER_COUNT],
        }
    }

    /// Read a register (addresses wrap into 0x000-0x1FF)
    pub fn get(&self, register: u16) -> u8 {
        self.values[register as usize % REGISTER_COUNT]
    }

    /// Write a register (addresses wrap into 0x000-0x1FF)
    pub fn set(&mut self, register: u16, value: u8) {
        self.values[register as usize % REGISTER_COUNT] = value;
    }

    /// Clear every register
    pub fn clear(&mut self) {
        self.values = [0; REGISTER_COUNT];
    }

    /// Raw register values, indexed by address
    pub fn as_slice(&self) -> &[u8] {
        &self.values
    }

    /// Iterate over (address, value) pairs with a nonzero value
    pub fn nonzero(&self) -> impl Iterator<Item = (u16, u8)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value != 0)
            .map(|(addr, &value)| (addr as u16, value))
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.nonzero()).finish()
    }
}
