//! DRO (DOSBox Raw OPL) decoders
//!
//! Both versions share the `DBRAWOPL` magic and a LE16 major version at
//! offset 8. Times are milliseconds.
//!
//! Version 0.1 / 1 header:
//! - 0x0C: LE32 length in ms
//! - 0x10: LE32 body length in bytes
//! - 0x14: hardware type (0 = OPL2, 1 = OPL3, 2 = dual OPL2)
//!
//! Some writers stored the hardware type as a LE32 rather than a byte; the
//! body then starts at 0x18 instead of 0x15.
//!
//! Version 2 header:
//! - 0x0C: LE32 body length in register/value pairs
//! - 0x10: LE32 length in ms
//! - 0x14: hardware type (0 = OPL2, 1 = dual OPL2, 2 = OPL3)
//! - 0x15: data format (0 = interleaved), 0x16: compression (0 = none)
//! - 0x17 / 0x18: short / long delay codes
//! - 0x19: code map length, followed by the code map itself

use super::opcode::Opcode;
use super::reader::{le32_at, BodyCursor, HeaderReader};
use super::{ChipMode, FormatDecoder, FormatError};
use crate::command::{CommandStream, Port, StreamBuilder};

/// Full 8-byte magic
pub const MAGIC: &[u8] = b"DBRAWOPL";

/// Offset of the LE16 major version
pub const VERSION_OFFSET: usize = 8;

/// DRO delays are milliseconds
pub const CMD_RATE: f64 = 1000.0;

const FORMAT_V1: &str = "DRO v1";
const FORMAT_V2: &str = "DRO v2";

const V1_HARDWARE_OFFSET: usize = 0x14;
const V1_SHORT_BODY_OFFSET: usize = 0x15;
const V1_LONG_BODY_OFFSET: usize = 0x18;

const V2_CODEMAP_OFFSET: usize = 0x1A;

fn check_magic(header: &HeaderReader<'_>) -> Result<(), FormatError> {
    header.expect_magic(0, b"DBRA", "DBRA")?;
    header.expect_magic(4, b"WOPL", "WOPL")
}

/// Chip mode for a v1 hardware type byte
pub fn chip_mode_v1(hardware: u8) -> Option<ChipMode> {
    match hardware {
        0 => Some(ChipMode::Single),
        1 => Some(ChipMode::Combined),
        2 => Some(ChipMode::DualIndependent),
        _ => None,
    }
}

/// Chip mode for a v2 hardware type byte (1 and 2 are swapped against v1)
pub fn chip_mode_v2(hardware: u8) -> Option<ChipMode> {
    match hardware {
        0 => Some(ChipMode::Single),
        1 => Some(ChipMode::DualIndependent),
        2 => Some(ChipMode::Combined),
        _ => None,
    }
}

/// Map a v1 body byte to its meaning
pub fn classify_v1(code: u8, port: Port) -> Opcode {
    match code {
        0x00 => Opcode::DelayShort,
        0x01 => Opcode::DelayLong,
        0x02 => Opcode::SelectPort(Port::Primary),
        0x03 => Opcode::SelectPort(Port::Secondary),
        0x04 => Opcode::EscapedWrite(port),
        register => Opcode::LiteralWrite(port.address(register)),
    }
}

/// Body start for a v1 file
///
/// The body follows a LE32 hardware field when the three bytes after the
/// hardware byte are zero, otherwise it follows the single hardware byte.
pub fn v1_body_offset(data: &[u8]) -> usize {
    let hardware = data.get(V1_HARDWARE_OFFSET).copied();
    match (le32_at(data, V1_HARDWARE_OFFSET), hardware) {
        (Some(wide), Some(byte)) if wide == byte as u32 => V1_LONG_BODY_OFFSET,
        _ => V1_SHORT_BODY_OFFSET,
    }
}

/// DRO v0.1 / v1 decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct DroV1Decoder;

impl FormatDecoder for DroV1Decoder {
    fn name(&self) -> &str {
        FORMAT_V1
    }

    fn cmd_rate(&self) -> f64 {
        CMD_RATE
    }

    fn try_decode(&self, data: &[u8]) -> Result<CommandStream, FormatError> {
        let header = HeaderReader::new(data, FORMAT_V1);
        check_magic(&header)?;

        let major = header.u16(VERSION_OFFSET, "version")?;
        if major >= 2 {
            return Err(FormatError::UnsupportedVersion {
                format: FORMAT_V1,
                version: major as u32,
            });
        }

        let body_len = header.u32(0x10, "body length")? as usize;
        let hardware = header.u8(V1_HARDWARE_OFFSET, "hardware type")?;
        let mode = chip_mode_v1(hardware).ok_or_else(|| FormatError::Unsupported {
            format: FORMAT_V1,
            feature: format!("hardware type {}", hardware),
        })?;

        let start = v1_body_offset(data);
        let mut body = BodyCursor::new(data, start, start.saturating_add(body_len));
        let mut builder = StreamBuilder::with_capacity(body_len / 2);
        let mut port = Port::Primary;

        while let Some(code) = body.u8() {
            let operand_ok = match classify_v1(code, port) {
                Opcode::DelayShort => body.u8().map(|ms| builder.delay(ms as u64 + 1)),
                Opcode::DelayLong => body.le16().map(|ms| builder.delay(ms as u64 + 1)),
                Opcode::SelectPort(selected) => {
                    port = selected;
                    Some(())
                }
                Opcode::EscapedWrite(target) => body
                    .pair()
                    .map(|(register, value)| builder.write(target.address(register), value)),
                Opcode::LiteralWrite(address) => body.u8().map(|value| builder.write(address, value)),
                Opcode::Delay(_) | Opcode::ClockChange | Opcode::End | Opcode::Unknown(_) => {
                    Some(())
                }
            };

            if operand_ok.is_none() {
                log::debug!("{}: code {:#04x} cut short at end of data", FORMAT_V1, code);
                break;
            }
        }

        Ok(builder.finish(CMD_RATE, mode.is_dual()))
    }
}

/// DRO v2 delay codes and register code map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    /// Code for a one-byte delay (`value + 1` ms)
    pub short_delay: u8,
    /// Code for a 256-scaled delay (`(value + 1) << 8` ms)
    pub long_delay: u8,
    /// Compact index to register number
    pub codemap: Vec<u8>,
}

impl CodeTable {
    /// Map a v2 body code to its meaning
    ///
    /// Bit 7 of a register code selects the secondary port.
    pub fn classify(&self, code: u8) -> Opcode {
        if code == self.short_delay {
            return Opcode::DelayShort;
        }
        if code == self.long_delay {
            return Opcode::DelayLong;
        }

        let port = if code & 0x80 != 0 {
            Port::Secondary
        } else {
            Port::Primary
        };
        match self.codemap.get((code & 0x7F) as usize) {
            Some(&register) => Opcode::LiteralWrite(port.address(register)),
            None => Opcode::Unknown(code),
        }
    }
}

/// DRO v2 decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct DroV2Decoder;

impl DroV2Decoder {
    fn parse_header(data: &[u8]) -> Result<(ChipMode, CodeTable, usize, usize), FormatError> {
        let header = HeaderReader::new(data, FORMAT_V2);
        check_magic(&header)?;

        let major = header.u16(VERSION_OFFSET, "version")?;
        if major != 2 {
            return Err(FormatError::UnsupportedVersion {
                format: FORMAT_V2,
                version: major as u32,
            });
        }

        let pairs = header.u32(0x0C, "pair count")? as usize;
        let hardware = header.u8(0x14, "hardware type")?;
        let mode = chip_mode_v2(hardware).ok_or_else(|| FormatError::Unsupported {
            format: FORMAT_V2,
            feature: format!("hardware type {}", hardware),
        })?;

        let data_format = header.u8(0x15, "data format")?;
        if data_format != 0 {
            return Err(FormatError::Unsupported {
                format: FORMAT_V2,
                feature: format!("non-interleaved data format {}", data_format),
            });
        }
        let compression = header.u8(0x16, "compression")?;
        if compression != 0 {
            return Err(FormatError::Unsupported {
                format: FORMAT_V2,
                feature: format!("compression {}", compression),
            });
        }

        let short_delay = header.u8(0x17, "short delay code")?;
        let long_delay = header.u8(0x18, "long delay code")?;
        let codemap_len = header.u8(0x19, "code map length")? as usize;
        let codemap = header
            .bytes(V2_CODEMAP_OFFSET, codemap_len, "code map")?
            .to_vec();

        let table = CodeTable {
            short_delay,
            long_delay,
            codemap,
        };
        Ok((mode, table, V2_CODEMAP_OFFSET + codemap_len, pairs))
    }
}

impl FormatDecoder for DroV2Decoder {
    fn name(&self) -> &str {
        FORMAT_V2
    }

    fn cmd_rate(&self) -> f64 {
        CMD_RATE
    }

    fn try_decode(&self, data: &[u8]) -> Result<CommandStream, FormatError> {
        let (mode, table, start, pairs) = Self::parse_header(data)?;

        let end = start.saturating_add(pairs.saturating_mul(2));
        let mut body = BodyCursor::new(data, start, end);
        let mut builder = StreamBuilder::with_capacity(pairs.min(data.len() / 2));

        while !body.is_at_end() {
            let offset = body.position();
            let Some((code, value)) = body.pair() else {
                log::debug!("{}: ignoring partial pair at offset {:#x}", FORMAT_V2, offset);
                break;
            };

            match table.classify(code) {
                Opcode::DelayShort => builder.delay(value as u64 + 1),
                Opcode::DelayLong => builder.delay((value as u64 + 1) << 8),
                Opcode::LiteralWrite(address) => builder.write(address, value),
                Opcode::Unknown(code) => {
                    return Err(FormatError::InvalidCodeMapIndex {
                        format: FORMAT_V2,
                        index: code & 0x7F,
                        offset,
                    })
                }
                Opcode::Delay(_)
                | Opcode::SelectPort(_)
                | Opcode::ClockChange
                | Opcode::EscapedWrite(_)
                | Opcode::End => {}
            }
        }

        Ok(builder.finish(CMD_RATE, mode.is_dual()))
    }
}
