//! File Format Support
//!
//! Decoders turning captured register logs into a [`CommandStream`]:
//! - IMF (id Software music format, type 0 and type 1)
//! - RAW (RdosPlay capture, `RAWADATA`)
//! - DRO v1 and v2 (DOSBox capture, `DBRAWOPL`)
//! - VGM (OPL2/OPL3 subsets)
//!
//! Each decoder is pure. [`FormatDecoder::try_decode`] reports failures as
//! a [`FormatError`]; [`FormatDecoder::decode`] never fails and hands back an
//! empty stream plus the diagnostic instead, so a bad file turns into
//! silence rather than a fault.

pub mod dro;
pub mod imf;
pub mod opcode;
pub mod raw;
pub(crate) mod reader;
pub mod vgm;

pub use dro::{DroV1Decoder, DroV2Decoder};
pub use imf::ImfDecoder;
pub use opcode::Opcode;
pub use raw::RawDecoder;
pub use vgm::VgmDecoder;

use crate::command::CommandStream;
use crate::compression;
use std::fmt;

/// Conventional IMF playback rate in Hz (Commander Keen / Wolfenstein 3D use 560/700)
pub const DEFAULT_IMF_RATE: f64 = 560.0;

/// Reasons a decoder rejects a file
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Magic bytes missing or wrong
    #[error("{format}: bad magic (expected {expected:?})")]
    BadMagic {
        /// Format being decoded
        format: &'static str,
        /// Expected magic bytes, as text
        expected: &'static str,
    },

    /// Version field outside the supported range
    #[error("{format}: unsupported version {version:#x}")]
    UnsupportedVersion {
        /// Format being decoded
        format: &'static str,
        /// Raw version value
        version: u32,
    },

    /// A flag or chip combination the replayer does not handle
    #[error("{format}: unsupported {feature}")]
    Unsupported {
        /// Format being decoded
        format: &'static str,
        /// What was requested
        feature: String,
    },

    /// Opcode with no meaning in this format
    #[error("{format}: unknown opcode {opcode:#04x} at offset {offset:#x}")]
    UnknownOpcode {
        /// Format being decoded
        format: &'static str,
        /// Opcode byte
        opcode: u8,
        /// Offset of the opcode in the file
        offset: usize,
    },

    /// Buffer ends before a required field
    #[error("{format}: truncated {context} (needed {needed} bytes, {available} available)")]
    Truncated {
        /// Format being decoded
        format: &'static str,
        /// Field being read
        context: &'static str,
        /// Bytes required from the start of the file
        needed: usize,
        /// Bytes present
        available: usize,
    },

    /// DRO v2 body references a register index past the code map
    #[error("{format}: code map index {index:#04x} out of range at offset {offset:#x}")]
    InvalidCodeMapIndex {
        /// Format being decoded
        format: &'static str,
        /// Compact register index (without the port bit)
        index: u8,
        /// Offset of the index byte in the file
        offset: usize,
    },

    /// Container data could not be unpacked
    #[error("{format}: {detail}")]
    Corrupt {
        /// Format being decoded
        format: &'static str,
        /// Underlying failure
        detail: String,
    },
}

/// How the two register banks of a capture are meant to be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipMode {
    /// One OPL2; only the primary bank is used
    Single,
    /// One OPL3; both banks address the same chip
    Combined,
    /// Two independent OPL2 chips, one per bank
    DualIndependent,
}

impl ChipMode {
    /// Whether the stream needs dual-chip normalization before playback
    pub fn is_dual(self) -> bool {
        self == ChipMode::DualIndependent
    }
}

/// Caller-supplied decoding parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeOptions {
    /// Command rate for IMF files, which carry none
    pub imf_rate: f64,
    /// Extra passes over a VGM loop region (`None` = one extra pass)
    pub vgm_loop_repeat: Option<u32>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            imf_rate: DEFAULT_IMF_RATE,
            vgm_loop_repeat: None,
        }
    }
}

/// Outcome of an infallible decode
#[derive(Debug, Clone)]
pub struct Decoded {
    /// Decoded commands (empty when `diagnostic` is set)
    pub stream: CommandStream,
    /// Why decoding stopped, if it failed
    pub diagnostic: Option<FormatError>,
}

impl Decoded {
    /// Whether decoding succeeded
    pub fn is_ok(&self) -> bool {
        self.diagnostic.is_none()
    }

    /// Convert back into a `Result`
    pub fn into_result(self) -> std::result::Result<CommandStream, FormatError> {
        match self.diagnostic {
            None => Ok(self.stream),
            Some(err) => Err(err),
        }
    }
}

/// Trait for decoding register-log formats into command streams
pub trait FormatDecoder {
    /// Decoder name used in diagnostics
    fn name(&self) -> &str;

    /// Native command rate in ticks per second
    fn cmd_rate(&self) -> f64;

    /// Decode a whole file
    fn try_decode(&self, data: &[u8]) -> std::result::Result<CommandStream, FormatError>;

    /// Decode a whole file, turning failures into an empty stream
    fn decode(&self, data: &[u8]) -> Decoded {
        match self.try_decode(data) {
            Ok(stream) => {
                log::debug!(
                    "{}: decoded {} commands at {:.2} Hz (dual chip: {}, {:.2}s)",
                    self.name(),
                    stream.len(),
                    stream.cmd_rate,
                    stream.dual_chip_mode,
                    stream.total_seconds()
                );
                Decoded {
                    stream,
                    diagnostic: None,
                }
            }
            Err(err) => {
                log::warn!("{}: {}", self.name(), err);
                Decoded {
                    stream: CommandStream::new(self.cmd_rate()),
                    diagnostic: Some(err),
                }
            }
        }
    }
}

/// Supported register-log formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    /// id Software music format (no magic)
    Imf,
    /// RdosPlay RAW capture
    Raw,
    /// DOSBox DRO v0.1 / v1
    DroV1,
    /// DOSBox DRO v2
    DroV2,
    /// Video Game Music log
    Vgm,
}

impl FileFormat {
    /// Guess the format of an (uncompressed) buffer from its magic bytes
    ///
    /// IMF carries no magic, so it is the fallback for anything unrecognised.
    pub fn detect(data: &[u8]) -> FileFormat {
        if data.starts_with(raw::MAGIC) {
            FileFormat::Raw
        } else if data.starts_with(dro::MAGIC) {
            match reader::le16_at(data, dro::VERSION_OFFSET) {
                Some(major) if major < 2 => FileFormat::DroV1,
                _ => FileFormat::DroV2,
            }
        } else if data.starts_with(vgm::MAGIC) {
            FileFormat::Vgm
        } else {
            FileFormat::Imf
        }
    }

    /// Human-readable format name
    pub fn name(self) -> &'static str {
        match self {
            FileFormat::Imf => "IMF",
            FileFormat::Raw => "RAW",
            FileFormat::DroV1 => "DRO v1",
            FileFormat::DroV2 => "DRO v2",
            FileFormat::Vgm => "VGM",
        }
    }

    /// Decoder for this format
    pub fn decoder(self, options: &DecodeOptions) -> Box<dyn FormatDecoder> {
        match self {
            FileFormat::Imf => Box::new(ImfDecoder::new(options.imf_rate)),
            FileFormat::Raw => Box::new(RawDecoder),
            FileFormat::DroV1 => Box::new(DroV1Decoder),
            FileFormat::DroV2 => Box::new(DroV2Decoder),
            FileFormat::Vgm => Box::new(VgmDecoder::new(options.vgm_loop_repeat)),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unwrap gzip if present, detect the format and decode
///
/// Returns `None` for the format only when the container itself could not
/// be unpacked.
pub fn decode_auto(data: &[u8], options: &DecodeOptions) -> (Option<FileFormat>, Decoded) {
    let data = match compression::decompress_if_needed(data) {
        Ok(data) => data,
        Err(err) => {
            let err = FormatError::Corrupt {
                format: "gzip",
                detail: err.to_string(),
            };
            log::warn!("{}", err);
            return (
                None,
                Decoded {
                    stream: CommandStream::new(options.imf_rate),
                    diagnostic: Some(err),
                },
            );
        }
    };

    let format = FileFormat::detect(&data);
    let decoded = format.decoder(options).decode(&data);
    (Some(format), decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_magic() {
        assert_eq!(FileFormat::detect(b"RAWADATA\x00\x01"), FileFormat::Raw);
        assert_eq!(FileFormat::detect(b"Vgm \x00\x00\x00\x00"), FileFormat::Vgm);
        assert_eq!(FileFormat::detect(&[0u8; 8]), FileFormat::Imf);

        let mut dro = b"DBRAWOPL".to_vec();
        dro.extend_from_slice(&[0, 0, 1, 0]);
        assert_eq!(FileFormat::detect(&dro), FileFormat::DroV1);

        let mut dro2 = b"DBRAWOPL".to_vec();
        dro2.extend_from_slice(&[2, 0, 0, 0]);
        assert_eq!(FileFormat::detect(&dro2), FileFormat::DroV2);
    }

    #[test]
    fn test_decode_reports_diagnostic_and_empty_stream() {
        let decoded = RawDecoder.decode(b"NOTARAWFILE");
        assert!(!decoded.is_ok());
        assert!(decoded.stream.is_empty());
        assert!(matches!(
            decoded.diagnostic,
            Some(FormatError::BadMagic { format: "RAW", .. })
        ));
    }

    #[test]
    fn test_decode_auto_falls_back_to_imf() {
        let data = [0u8, 0, 0, 0, 0x20, 0x01, 0x05, 0x00];
        let (format, decoded) = decode_auto(&data, &DecodeOptions::default());
        assert_eq!(format, Some(FileFormat::Imf));
        assert!(decoded.is_ok());
        assert_eq!(decoded.stream.len(), 1);
    }

    #[test]
    fn test_error_messages_name_the_format() {
        let err = FormatError::UnknownOpcode {
            format: "VGM",
            opcode: 0x4F,
            offset: 0x40,
        };
        assert_eq!(err.to_string(), "VGM: unknown opcode 0x4f at offset 0x40");
    }
}
