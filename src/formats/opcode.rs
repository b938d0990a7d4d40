//! Opcode classification
//!
//! Every byte-code format is decoded in two steps: a per-format `classify`
//! function maps the opcode byte (plus whatever decoder state it depends on)
//! to an [`Opcode`], and the decode loop then consumes the operands that
//! variant calls for. Keeping the tables separate from the loops lets each
//! format's quirks be tested on their own.

use crate::command::Port;

/// Meaning of one opcode in a register-log body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Delay carried by a one-byte operand
    DelayShort,
    /// Delay carried by a wider (or scaled) operand
    DelayLong,
    /// Delay fully encoded in the opcode, in ticks
    Delay(u64),
    /// Route following literal writes to a port
    SelectPort(Port),
    /// A new clock divisor follows as a LE16 operand (RAW)
    ClockChange,
    /// Register and value follow as operands, written to the given port
    EscapedWrite(Port),
    /// Write the next operand byte to this register
    LiteralWrite(u16),
    /// End of data
    End,
    /// Byte with no meaning in this format
    Unknown(u8),
}
