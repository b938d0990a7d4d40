//! Recording backend
//!
//! A silent [`Opl3Backend`] that remembers everything written to it.

use super::registers::RegisterFile;
use super::Opl3Backend;

/// Silent backend that records register state and writes
#[derive(Debug, Clone, Default)]
pub struct RecordingDevice {
    registers: RegisterFile,
    writes: Vec<(u16, u8)>,
    sample_rate: u32,
    reset_count: usize,
    rendered: u64,
}

impl RecordingDevice {
    /// Create a recorder with cleared registers
    pub fn new() -> Self {
        Self::default()
    }

    /// Current register image
    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Value of one register
    pub fn register(&self, register: u16) -> u8 {
        self.registers.get(register)
    }

    /// Writes received since the last reset, in order
    pub fn writes(&self) -> &[(u16, u8)] {
        &self.writes
    }

    /// Sample rate passed to the last reset (0 before any reset)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of resets so far
    pub fn reset_count(&self) -> usize {
        self.reset_count
    }

    /// Number of sample pairs rendered since the last reset
    pub fn rendered(&self) -> u64 {
        self.rendered
    }
}

impl Opl3Backend for RecordingDevice {
    fn reset(&mut self, sample_rate: u32) {
        self.registers.clear();
        self.writes.clear();
        self.sample_rate = sample_rate;
        self.reset_count += 1;
        self.rendered = 0;
    }

    fn write(&mut self, register: u16, value: u8) {
        self.registers.set(register, value);
        self.writes.push((register, value));
    }

    fn render(&mut self) -> (i16, i16) {
        self.rendered += 1;
        (0, 0)
    }
}
