//! RAW (RdosPlay capture) decoder
//!
//! Layout:
//! - `RAWA` + `DATA` magic (8 bytes)
//! - LE16 initial clock divisor at offset 8
//! - Body: byte pairs `(value, register)`, value first
//!
//! Register 0 is a delay of `value * clock` PIT ticks, register 2 is a
//! control code (clock change / port select), and `0xFF 0xFF` ends the data.

use super::opcode::Opcode;
use super::reader::{BodyCursor, HeaderReader};
use super::{FormatDecoder, FormatError};
use crate::command::{CommandStream, Port, StreamBuilder};

const FORMAT: &str = "RAW";

/// Full 8-byte magic
pub const MAGIC: &[u8] = b"RAWADATA";

/// Offset of the first body pair
pub const BODY_OFFSET: usize = 10;

/// PIT input clock divided by 12: the rate RAW delays are counted in
pub const CMD_RATE: f64 = 14_318_180.0 / 12.0;

/// Map a `(register, value)` pair to its meaning
pub fn classify(register: u8, value: u8, port: Port) -> Opcode {
    match (register, value) {
        (0x00, _) => Opcode::DelayShort,
        (0x02, 0x00) => Opcode::ClockChange,
        (0x02, 0x01) => Opcode::SelectPort(Port::Primary),
        (0x02, 0x02) => Opcode::SelectPort(Port::Secondary),
        (0xFF, 0xFF) => Opcode::End,
        (register, _) => Opcode::LiteralWrite(port.address(register)),
    }
}

/// RAW decoder (fixed rate)
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl FormatDecoder for RawDecoder {
    fn name(&self) -> &str {
        FORMAT
    }

    fn cmd_rate(&self) -> f64 {
        CMD_RATE
    }

    fn try_decode(&self, data: &[u8]) -> Result<CommandStream, FormatError> {
        let header = HeaderReader::new(data, FORMAT);
        header.expect_magic(0, b"RAWA", "RAWA")?;
        header.expect_magic(4, b"DATA", "DATA")?;
        let mut clock = header.u16(8, "clock divisor")? as u64;

        let mut body = BodyCursor::new(data, BODY_OFFSET, data.len());
        let mut builder = StreamBuilder::with_capacity(data.len().saturating_sub(BODY_OFFSET) / 2);
        let mut port = Port::Primary;

        while let Some((value, register)) = body.pair() {
            match classify(register, value, port) {
                Opcode::DelayShort => builder.delay(value as u64 * clock),
                Opcode::ClockChange => match body.le16() {
                    Some(divisor) => clock = divisor as u64,
                    None => {
                        log::debug!("{}: clock change cut short at end of data", FORMAT);
                        break;
                    }
                },
                Opcode::SelectPort(selected) => port = selected,
                Opcode::LiteralWrite(address) => builder.write(address, value),
                Opcode::End => break,
                Opcode::DelayLong
                | Opcode::Delay(_)
                | Opcode::EscapedWrite(_)
                | Opcode::Unknown(_) => {}
            }
        }

        Ok(builder.finish(CMD_RATE, false))
    }
}
