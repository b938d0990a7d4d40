//! VGM (Video Game Music) decoder, OPL2/OPL3 subset
//!
//! Header fields used:
//! - 0x08: LE32 version (BCD, e.g. `0x151`)
//! - 0x1C: LE32 loop offset, relative to 0x1C (0 = no loop)
//! - 0x20: LE32 samples in the loop (informational)
//! - 0x34: LE32 data offset, relative to 0x34 (version 1.50 and later)
//! - 0x50: LE32 YM3812 clock, 0x5C: LE32 YMF262 clock
//!
//! Bit 30 of a clock marks a second chip of that kind. Times are samples at
//! 44100 Hz.

use super::opcode::Opcode;
use super::reader::{le32_at, BodyCursor, HeaderReader};
use super::{FormatDecoder, FormatError};
use crate::command::{CommandStream, Port, StreamBuilder};

const FORMAT: &str = "VGM";

/// 4-byte magic
pub const MAGIC: &[u8] = b"Vgm ";

/// VGM timing is fixed at the sample rate of the log
pub const CMD_RATE: f64 = 44_100.0;

const LEGACY_DATA_OFFSET: usize = 0x40;
const DATA_OFFSET_FIELD: usize = 0x34;
const LOOP_OFFSET_FIELD: usize = 0x1C;
const LOOP_SAMPLES_FIELD: usize = 0x20;
const YM3812_CLOCK_FIELD: usize = 0x50;
const YMF262_CLOCK_FIELD: usize = 0x5C;

const CLOCK_MASK: u32 = 0x3FFF_FFFF;
const DUAL_CHIP_BIT: u32 = 0x4000_0000;

/// First version with a relative data offset at 0x34
const RELATIVE_DATA_OFFSET_VERSION: u32 = 0x150;

/// Clock field with the dual-chip flag split out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChipClock {
    /// Clock in Hz (0 = chip absent)
    pub hz: u32,
    /// A second chip of this kind is present
    pub dual: bool,
}

impl ChipClock {
    fn from_field(raw: u32) -> Self {
        ChipClock {
            hz: raw & CLOCK_MASK,
            dual: raw & DUAL_CHIP_BIT != 0,
        }
    }

    /// Whether the chip is present at all
    pub fn is_present(&self) -> bool {
        self.hz != 0
    }
}

/// Parsed VGM header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VgmHeader {
    /// Raw version field
    pub version: u32,
    /// Absolute offset of the first command
    pub data_offset: usize,
    /// Absolute loop offset, if the file loops
    pub loop_offset: Option<usize>,
    /// Loop length in samples as stored in the header
    pub loop_samples: u32,
    /// YM3812 (OPL2) clock
    pub ym3812: ChipClock,
    /// YMF262 (OPL3) clock
    pub ymf262: ChipClock,
}

impl VgmHeader {
    /// Parse and validate the header
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        let header = HeaderReader::new(data, FORMAT);
        header.expect_magic(0, MAGIC, "Vgm ")?;
        let version = header.u32(0x08, "version")?;

        let data_offset = if version < RELATIVE_DATA_OFFSET_VERSION {
            LEGACY_DATA_OFFSET
        } else {
            match header.u32(DATA_OFFSET_FIELD, "data offset")? {
                0 => LEGACY_DATA_OFFSET,
                relative => DATA_OFFSET_FIELD + relative as usize,
            }
        };

        // Short headers end where the data begins; fields past that point
        // belong to the command stream.
        let field = |offset: usize| {
            if offset + 4 <= data_offset {
                le32_at(data, offset).unwrap_or(0)
            } else {
                0
            }
        };

        let loop_offset = match field(LOOP_OFFSET_FIELD) {
            0 => None,
            relative => Some(LOOP_OFFSET_FIELD + relative as usize),
        };
        let loop_samples = field(LOOP_SAMPLES_FIELD);

        let ym3812 = ChipClock::from_field(field(YM3812_CLOCK_FIELD));
        let ymf262 = ChipClock::from_field(field(YMF262_CLOCK_FIELD));

        if ymf262.dual {
            return Err(FormatError::Unsupported {
                format: FORMAT,
                feature: "dual YMF262".to_string(),
            });
        }
        if ym3812.is_present() && ymf262.is_present() {
            return Err(FormatError::Unsupported {
                format: FORMAT,
                feature: "YM3812 and YMF262 in one file".to_string(),
            });
        }
        if !ym3812.is_present() && !ymf262.is_present() {
            log::debug!("{}: no OPL clock in header", FORMAT);
        }

        Ok(VgmHeader {
            version,
            data_offset,
            loop_offset,
            loop_samples,
            ym3812,
            ymf262,
        })
    }

    /// Two independent OPL2 chips
    pub fn is_dual(&self) -> bool {
        self.ym3812.dual
    }
}

/// Map a command byte to its meaning
pub fn classify(opcode: u8) -> Opcode {
    match opcode {
        0x5A | 0x5B | 0x5E => Opcode::EscapedWrite(Port::Primary),
        0x5F | 0xAA => Opcode::EscapedWrite(Port::Secondary),
        0x61 => Opcode::DelayLong,
        0x62 => Opcode::Delay(735),
        0x63 => Opcode::Delay(882),
        0x66 => Opcode::End,
        0x70..=0x7F => Opcode::Delay((opcode & 0x0F) as u64),
        other => Opcode::Unknown(other),
    }
}

/// VGM decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct VgmDecoder {
    loop_repeat: Option<u32>,
}

impl VgmDecoder {
    /// Create a decoder replaying a loop region `loop_repeat` extra times
    /// (`None` = once)
    pub fn new(loop_repeat: Option<u32>) -> Self {
        VgmDecoder { loop_repeat }
    }

    /// Extra passes over the loop region
    pub fn loop_passes(&self) -> u32 {
        self.loop_repeat.unwrap_or(1)
    }

    /// Decode commands from the cursor position up to `0x66` or end of data
    fn scan(
        body: &mut BodyCursor<'_>,
        builder: &mut StreamBuilder,
        dual: bool,
    ) -> Result<(), FormatError> {
        while let Some(opcode) = body.u8() {
            let offset = body.position() - 1;

            let operand_ok = match classify(opcode) {
                Opcode::EscapedWrite(_) if dual && matches!(opcode, 0x5E | 0x5F) => {
                    return Err(FormatError::Unsupported {
                        format: FORMAT,
                        feature: format!("YMF262 write {:#04x} in dual YM3812 log", opcode),
                    });
                }
                Opcode::EscapedWrite(port) => body
                    .pair()
                    .map(|(register, value)| builder.write(port.address(register), value)),
                Opcode::DelayLong => body.le16().map(|samples| builder.delay(samples as u64)),
                Opcode::Delay(samples) => {
                    builder.delay(samples);
                    Some(())
                }
                Opcode::End => return Ok(()),
                Opcode::Unknown(opcode) => {
                    return Err(FormatError::UnknownOpcode {
                        format: FORMAT,
                        opcode,
                        offset,
                    });
                }
                Opcode::DelayShort
                | Opcode::SelectPort(_)
                | Opcode::ClockChange
                | Opcode::LiteralWrite(_) => Some(()),
            };

            if operand_ok.is_none() {
                log::debug!(
                    "{}: command {:#04x} at offset {:#x} cut short at end of data",
                    FORMAT,
                    opcode,
                    offset
                );
                break;
            }
        }
        Ok(())
    }
}

impl FormatDecoder for VgmDecoder {
    fn name(&self) -> &str {
        FORMAT
    }

    fn cmd_rate(&self) -> f64 {
        CMD_RATE
    }

    fn try_decode(&self, data: &[u8]) -> Result<CommandStream, FormatError> {
        let header = VgmHeader::parse(data)?;
        let dual = header.is_dual();

        let mut body = BodyCursor::new(data, header.data_offset, data.len());
        let mut builder = StreamBuilder::with_capacity(data.len().saturating_sub(header.data_offset) / 3);
        Self::scan(&mut body, &mut builder, dual)?;

        match header.loop_offset {
            Some(offset) if offset >= header.data_offset && offset < data.len() => {
                for _ in 0..self.loop_passes() {
                    body.seek(offset);
                    Self::scan(&mut body, &mut builder, dual)?;
                }
            }
            Some(offset) => {
                log::warn!("{}: loop offset {:#x} outside the data, not looping", FORMAT, offset);
            }
            None => {}
        }

        Ok(builder.finish(CMD_RATE, dual))
    }
}
