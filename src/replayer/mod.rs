//! Playback Engine
//!
//! [`Player`] owns one command stream and drives an [`Opl3Backend`] across
//! fixed-size stereo buffers supplied by an external audio clock:
//! - `player`: construction, loading and transport control
//! - `engine`: per-buffer rendering (the audio callback hot path)
//! - `seek`: register state reconstruction by replay
//!
//! Loads are queued and only take effect at the start of the next buffer.
//!
//! [`Opl3Backend`]: crate::Opl3Backend

mod engine;
mod player;
mod seek;

pub use player::Player;

use parking_lot::Mutex;
use std::sync::Arc;

/// Consecutive silent buffers before a suspend is requested
pub const SOFT_STOP_BUFFERS: u32 = 4;

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Nothing played yet
    #[default]
    Idle,
    /// Commands are being dispatched
    Playing,
    /// Stream exhausted or stop requested; silent buffers count down to a suspend
    Stopping,
    /// Suspend requested; nothing left to do until the next `play`
    Stopped,
}

/// What one call to [`Player::process`] produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferStatus {
    /// Buffer holds device output
    Rendered,
    /// Buffer was filled with silence
    Silent,
    /// Buffer was filled with silence and the output may now be suspended
    SuspendRequested,
}

/// Result of [`Player::seek`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// Registers rebuilt; playback resumes from the target time
    Positioned,
    /// Target at or past the last command; every write applied and playback stopping
    EndOfStream,
    /// No stream loaded
    NoStream,
}

/// Player shared between an audio callback and a control surface
///
/// Seek and load hold the lock for their whole scan, so the callback never
/// observes a half-rebuilt register state.
pub type SharedPlayer<B> = Arc<Mutex<Player<B>>>;
