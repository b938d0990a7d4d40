//! Player construction, loading and transport control

use super::{PlaybackState, SharedPlayer};
use crate::command::CommandStream;
use crate::config::PlayerConfig;
use crate::formats::{decode_auto, DecodeOptions, FileFormat};
use crate::normalize::normalize_dual_chip;
use crate::opl3::Opl3Backend;
use crate::{Opl3Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Register-log player driving an OPL3 backend
///
/// Multiple players can coexist; each owns its device and stream.
pub struct Player<B: Opl3Backend> {
    pub(in crate::replayer) device: B,
    pub(in crate::replayer) sample_rate: u32,
    pub(in crate::replayer) buffer_frames: usize,
    pub(in crate::replayer) stream: Option<CommandStream>,
    pub(in crate::replayer) queued: Option<CommandStream>,
    pub(in crate::replayer) cursor: usize,
    /// Audio samples emitted since the stream started
    pub(in crate::replayer) sample_position: u64,
    /// Consecutive silent buffers
    pub(in crate::replayer) soft_stop_counter: u32,
    pub(in crate::replayer) just_sought: bool,
    pub(in crate::replayer) suspended: bool,
    pub(in crate::replayer) state: PlaybackState,
}

impl<B: Opl3Backend> Player<B> {
    /// Create a player rendering `buffer_frames` stereo frames per buffer
    ///
    /// The device is reset at `sample_rate`. Zero values are raised to 1.
    pub fn new(mut device: B, sample_rate: u32, buffer_frames: usize) -> Self {
        let sample_rate = sample_rate.max(1);
        device.reset(sample_rate);
        Player {
            device,
            sample_rate,
            buffer_frames: buffer_frames.max(1),
            stream: None,
            queued: None,
            cursor: 0,
            sample_position: 0,
            soft_stop_counter: 0,
            just_sought: false,
            suspended: false,
            state: PlaybackState::Idle,
        }
    }

    /// Create a player from a validated configuration
    pub fn with_config(device: B, config: &PlayerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(device, config.sample_rate, config.buffer_frames))
    }

    /// Wrap the player for sharing with an audio thread
    pub fn into_shared(self) -> SharedPlayer<B> {
        Arc::new(Mutex::new(self))
    }

    /// Queue a stream for playback
    ///
    /// Dual-chip streams are normalized first. The stream becomes active at
    /// the start of the next buffer; a later load replaces one still queued.
    pub fn load_stream(&mut self, stream: CommandStream) {
        let stream = normalize_dual_chip(stream);
        if self.queued.is_some() {
            log::debug!("replacing queued stream before it started");
        }
        log::debug!(
            "queued stream: {} commands at {:.2} Hz ({:.2}s)",
            stream.len(),
            stream.cmd_rate,
            stream.total_seconds()
        );
        self.queued = Some(stream);
    }

    /// Decode a file (gzip, format detection), normalize and queue it
    ///
    /// On failure the diagnostic is returned and whatever is loaded or
    /// playing is left alone.
    pub fn load_bytes(&mut self, data: &[u8], options: &DecodeOptions) -> Result<FileFormat> {
        let (format, decoded) = decode_auto(data, options);
        let stream = decoded.into_result()?;
        let format = format.ok_or_else(|| Opl3Error::Other("format not detected".into()))?;
        self.load_stream(stream);
        Ok(format)
    }

    /// Start or resume playback
    ///
    /// Requires a loaded stream with at least one command. A finished stream
    /// restarts from the beginning.
    pub fn play(&mut self) {
        let Some(stream) = self.queued.as_ref().or(self.stream.as_ref()) else {
            log::debug!("play ignored: no stream loaded");
            return;
        };
        if stream.is_empty() {
            log::debug!("play ignored: stream has no commands");
            return;
        }

        let exhausted = self.queued.is_none()
            && self
                .stream
                .as_ref()
                .is_some_and(|active| self.cursor >= active.len());
        if exhausted {
            self.rewind();
        }

        self.state = PlaybackState::Playing;
        self.soft_stop_counter = 0;
        self.suspended = false;
    }

    /// Request a soft stop
    ///
    /// The position is kept; output fades through silent buffers until a
    /// suspend is requested.
    pub fn stop(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Stopping;
        }
    }

    /// Whether commands are being dispatched
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Current transport state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Position in seconds
    pub fn playback_time(&self) -> f64 {
        self.sample_position as f64 / self.sample_rate as f64
    }

    /// Duration of the most recently loaded stream in seconds (0 if none)
    pub fn total_time(&self) -> f64 {
        self.queued
            .as_ref()
            .or(self.stream.as_ref())
            .map_or(0.0, CommandStream::total_seconds)
    }

    /// Index of the next command to dispatch
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Output sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Stereo frames per buffer
    pub fn buffer_frames(&self) -> usize {
        self.buffer_frames
    }

    /// Whether a stream is active or queued
    pub fn has_stream(&self) -> bool {
        self.stream.is_some() || self.queued.is_some()
    }

    /// Whether a suspend has been requested and playback not restarted since
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// The backend
    pub fn device(&self) -> &B {
        &self.device
    }

    /// Mutable access to the backend
    pub fn device_mut(&mut self) -> &mut B {
        &mut self.device
    }

    /// Consume the player and return its backend
    pub fn into_device(self) -> B {
        self.device
    }

    /// Make a queued stream active and restart from its beginning
    pub(in crate::replayer) fn swap_in_queued(&mut self) {
        if let Some(stream) = self.queued.take() {
            log::debug!("starting stream: {} commands", stream.len());
            self.stream = Some(stream);
            self.rewind();
        }
    }

    /// Back to time 0 with a freshly reset device
    pub(in crate::replayer) fn rewind(&mut self) {
        self.cursor = 0;
        self.sample_position = 0;
        self.just_sought = false;
        self.device.reset(self.sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::opl3::RecordingDevice;

    fn stream(commands: &[(u64, u16, u8)]) -> CommandStream {
        CommandStream::from_commands(
            commands
                .iter()
                .map(|&(time, register, value)| Command::new(time, register, value))
                .collect(),
            1000.0,
        )
    }

    #[test]
    fn test_new_resets_device() {
        let player = Player::new(RecordingDevice::new(), 48_000, 256);
        assert_eq!(player.device().reset_count(), 1);
        assert_eq!(player.device().sample_rate(), 48_000);
        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(!player.has_stream());
    }

    #[test]
    fn test_play_requires_commands() {
        let mut player = Player::new(RecordingDevice::new(), 44_100, 64);
        player.play();
        assert!(!player.is_playing());

        player.load_stream(stream(&[]));
        player.play();
        assert!(!player.is_playing());

        player.load_stream(stream(&[(0, 0x20, 1)]));
        player.play();
        assert!(player.is_playing());
    }

    #[test]
    fn test_last_load_wins() {
        let mut player = Player::new(RecordingDevice::new(), 44_100, 64);
        player.load_stream(stream(&[(0, 0x20, 1), (1000, 0x20, 2)]));
        player.load_stream(stream(&[(0, 0x20, 1), (3000, 0x20, 2)]));
        assert_eq!(player.total_time(), 3.0);
    }

    #[test]
    fn test_load_normalizes_dual_streams() {
        let mut dual = stream(&[(0, 0x1C0, 0x01)]);
        dual.dual_chip_mode = true;
        let mut player = Player::new(RecordingDevice::new(), 44_100, 64);
        player.load_stream(dual);

        let queued = player.queued.as_ref().unwrap();
        assert!(!queued.dual_chip_mode);
        assert_eq!(queued.commands[0], Command::new(0, 0x105, 0x01));
    }

    #[test]
    fn test_stop_only_affects_playing() {
        let mut player = Player::new(RecordingDevice::new(), 44_100, 64);
        player.stop();
        assert_eq!(player.state(), PlaybackState::Idle);

        player.load_stream(stream(&[(0, 0x20, 1)]));
        player.play();
        player.stop();
        assert_eq!(player.state(), PlaybackState::Stopping);
        assert!(!player.is_playing());
    }

    #[test]
    fn test_load_bytes_failure_keeps_current_stream() {
        let mut player = Player::new(RecordingDevice::new(), 44_100, 64);
        player.load_stream(stream(&[(0, 0x20, 1), (2000, 0x20, 2)]));

        let result = player.load_bytes(b"RAWADATA", &DecodeOptions::default());
        assert!(matches!(result, Err(Opl3Error::Format(_))));
        assert_eq!(player.total_time(), 2.0);
    }

    #[test]
    fn test_with_config_validates() {
        let config = PlayerConfig {
            buffer_frames: 0,
            ..PlayerConfig::default()
        };
        assert!(Player::with_config(RecordingDevice::new(), &config).is_err());
        let player = Player::with_config(RecordingDevice::new(), &PlayerConfig::default()).unwrap();
        assert_eq!(player.buffer_frames(), 2048);
    }
}
