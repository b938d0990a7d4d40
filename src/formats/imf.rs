//! IMF (id Software Music Format) decoder
//!
//! Layout:
//! - Type 1: LE16 byte length of the command block, then the block
//! - Type 0: no header, the whole file is the command block
//! - Each record is 4 bytes: register, value, LE16 delay
//!
//! The delay of a record elapses after its write. The format has no
//! embedded rate; it depends on the game (560 Hz and 700 Hz are common).

use super::reader::{le16_at, BodyCursor};
use super::{FormatDecoder, FormatError, DEFAULT_IMF_RATE};
use crate::command::{CommandStream, StreamBuilder};

const FORMAT: &str = "IMF";
const RECORD_SIZE: usize = 4;

/// IMF decoder with a caller-supplied command rate
#[derive(Debug, Clone, Copy)]
pub struct ImfDecoder {
    rate: f64,
}

impl ImfDecoder {
    /// Create a decoder producing streams at `rate` ticks per second
    pub fn new(rate: f64) -> Self {
        ImfDecoder { rate }
    }

    /// Body region `(start, end)` for a buffer
    ///
    /// A zero length word means a headerless (type 0) file. When the second
    /// word is zero as well the data starts at the very beginning, otherwise
    /// it starts after the first word.
    pub fn body_region(data: &[u8]) -> (usize, usize) {
        let length = le16_at(data, 0).unwrap_or(0) as usize;
        let extra_search = le16_at(data, 2).unwrap_or(0);

        if length == 0 {
            let start = if extra_search == 0 { 0 } else { 2 };
            (start, data.len())
        } else {
            (2, 2 + length)
        }
    }
}

impl Default for ImfDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_IMF_RATE)
    }
}

impl FormatDecoder for ImfDecoder {
    fn name(&self) -> &str {
        FORMAT
    }

    fn cmd_rate(&self) -> f64 {
        self.rate
    }

    fn try_decode(&self, data: &[u8]) -> Result<CommandStream, FormatError> {
        if !(self.rate.is_finite() && self.rate > 0.0) {
            return Err(FormatError::Unsupported {
                format: FORMAT,
                feature: format!("command rate {}", self.rate),
            });
        }

        let (start, end) = Self::body_region(data);
        let mut body = BodyCursor::new(data, start, end);
        let mut builder = StreamBuilder::with_capacity((end.saturating_sub(start)) / RECORD_SIZE);

        while !body.is_at_end() {
            let offset = body.position();
            let (Some((register, value)), Some(delay)) = (body.pair(), body.le16()) else {
                log::debug!("{}: ignoring partial record at offset {:#x}", FORMAT, offset);
                break;
            };

            // Register 0 does not exist on the chip; type-0 files open with an
            // all-zero padding record.
            if register != 0 {
                builder.write(register as u16, value);
            }
            builder.delay(delay as u64);
        }

        Ok(builder.finish(self.rate, false))
    }
}
