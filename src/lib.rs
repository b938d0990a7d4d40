//! OPL3 Register-Log Replayer
//!
//! Decodes the register-write logs produced by AdLib-era capture and tracker
//! tools into one normalized, timed command stream, and replays that stream
//! against an OPL3 synthesis backend with sample-accurate timing.
//!
//! # Features
//! - IMF, RAW (RdosPlay), DRO v1/v2 (DOSBox) and VGM (OPL2/OPL3) decoders
//! - Transparent gzip unwrap for `.vgz` files
//! - Dual-OPL2 to OPL3 normalization
//! - Fixed-buffer playback engine with debounced soft stop
//! - Seek-by-replay: register state rebuilt at any time offset without audio
//!
//! # Crate feature flags
//! - `formats` (default): file format decoders (`formats`, `compression`)
//! - `replayer` (default): playback and seek engine (`replayer`, `config`)
//! - `streaming` (opt-in): real-time audio output (enables optional `rodio` dep)
//!
//! The synthesis chip itself is not part of this crate. Anything that
//! implements [`Opl3Backend`] can be driven by the [`Player`].
//!
//! # Quick start
//! ```no_run
//! # #[cfg(feature = "replayer")]
//! # {
//! use opl3_replayer::formats::{decode_auto, DecodeOptions};
//! use opl3_replayer::{Player, RecordingDevice};
//!
//! let data = std::fs::read("song.dro").unwrap();
//! let (_format, decoded) = decode_auto(&data, &DecodeOptions::default());
//! let mut player = Player::new(RecordingDevice::new(), 44_100, 1024);
//! player.load_stream(decoded.stream);
//! player.play();
//! let mut buffer = vec![0i16; 1024 * 2];
//! player.process(&mut buffer);
//! # }
//! ```

#![warn(missing_docs)]

pub mod command; // Normalized command stream
pub mod normalize; // Dual-chip rewriting
pub mod opl3; // Device adapter

#[cfg(feature = "formats")]
pub mod compression; // Data Decompression (gzip)
#[cfg(feature = "replayer")]
pub mod config; // Player configuration
#[cfg(feature = "formats")]
pub mod formats; // File Format Decoding
#[cfg(feature = "replayer")]
pub mod replayer; // Playback Engine
#[cfg(feature = "streaming")]
pub mod streaming; // Audio Output & Streaming

#[cfg(feature = "formats")]
pub use formats::FormatError;

/// Error types for OPL3 replayer operations
#[derive(thiserror::Error, Debug)]
pub enum Opl3Error {
    /// Error while decoding a file format
    #[cfg(feature = "formats")]
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Decompression error
    #[error("Decompression error: {0}")]
    DecompressionError(String),

    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Audio device error
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Opl3Error {
    /// Converts a String into `Opl3Error::Other`.
    ///
    /// Prefer the specific variants (`ConfigError`, `AudioDeviceError`, ...)
    /// where the failure has a known category.
    fn from(msg: String) -> Self {
        Opl3Error::Other(msg)
    }
}

impl From<&str> for Opl3Error {
    fn from(msg: &str) -> Self {
        Opl3Error::Other(msg.to_string())
    }
}

/// Result type for replayer operations
pub type Result<T> = std::result::Result<T, Opl3Error>;

// Public API exports
pub use command::{Command, CommandStream, Port};
pub use normalize::normalize_dual_chip;
pub use opl3::{Opl3Backend, RecordingDevice};

#[cfg(feature = "formats")]
pub use compression::decompress_if_needed;
#[cfg(feature = "formats")]
pub use formats::{decode_auto, DecodeOptions, Decoded, FileFormat, FormatDecoder};
#[cfg(feature = "replayer")]
pub use config::PlayerConfig;
#[cfg(feature = "replayer")]
pub use replayer::{BufferStatus, PlaybackState, Player, SeekOutcome, SharedPlayer};
#[cfg(feature = "streaming")]
pub use streaming::{AudioDevice, PlayerSource};
