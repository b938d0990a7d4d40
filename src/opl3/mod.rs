//! OPL3 Device Adapter
//!
//! The synthesis chip lives outside this crate. The replayer only needs three
//! capabilities from it, captured by [`Opl3Backend`]:
//! - reset at a given output sample rate
//! - buffered register writes across both ports
//! - rendering one stereo sample pair
//!
//! [`RecordingDevice`] is a silent backend that keeps the register file and
//! a write log, for state-reconstruction checks and headless tools.

pub mod recorder;
pub mod registers;

pub use recorder::RecordingDevice;
pub use registers::{ChannelOutput, RegisterFile};

/// Common interface for OPL3 synthesis backends
///
/// # Example
///
/// ```
/// use opl3_replayer::{Opl3Backend, RecordingDevice};
///
/// fn key_on<B: Opl3Backend>(chip: &mut B) {
///     chip.write(0x105, 0x01); // OPL3 mode
///     chip.write(0x0A0, 0x41); // F-number low, channel 0
///     chip.write(0x0B0, 0x32); // Key on, block 4
///     let (_left, _right) = chip.render();
/// }
///
/// key_on(&mut RecordingDevice::new());
/// ```
pub trait Opl3Backend: Send {
    /// Reset the chip and set its output sample rate in Hz
    fn reset(&mut self, sample_rate: u32);

    /// Write a register
    ///
    /// `register` covers both ports (0x000-0x1FF).
    fn write(&mut self, register: u16, value: u8);

    /// Render the next stereo sample pair
    fn render(&mut self) -> (i16, i16);
}

impl<B: Opl3Backend + ?Sized> Opl3Backend for Box<B> {
    fn reset(&mut self, sample_rate: u32) {
        (**self).reset(sample_rate);
    }

    fn write(&mut self, register: u16, value: u8) {
        (**self).write(register, value);
    }

    fn render(&mut self) -> (i16, i16) {
        (**self).render()
    }
}
