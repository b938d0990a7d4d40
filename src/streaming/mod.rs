//! Audio Output & Streaming
//!
//! [`PlayerSource`] is a rodio `Source` pulling interleaved stereo `i16`
//! samples from a [`SharedPlayer`], one engine buffer at a time, so the lock
//! is taken once per buffer rather than once per sample. [`AudioDevice`]
//! plays such a source on the default output.

pub mod audio_device;

pub use audio_device::AudioDevice;

use crate::opl3::Opl3Backend;
use crate::replayer::{BufferStatus, SharedPlayer};
use rodio::Source;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Output channels (the engine always renders stereo)
pub const CHANNELS: u16 = 2;

/// rodio source driving a shared player
pub struct PlayerSource<B: Opl3Backend> {
    player: SharedPlayer<B>,
    sample_rate: u32,
    buffer: Vec<i16>,
    buffer_pos: usize,
    suspend_requested: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl<B: Opl3Backend> PlayerSource<B> {
    /// Create a source rendering buffers of the player's configured size
    pub fn new(player: SharedPlayer<B>) -> Self {
        let (sample_rate, frames) = {
            let guard = player.lock();
            (guard.sample_rate(), guard.buffer_frames())
        };
        let len = frames * CHANNELS as usize;
        PlayerSource {
            player,
            sample_rate,
            buffer: vec![0; len],
            buffer_pos: len,
            suspend_requested: Arc::new(AtomicBool::new(false)),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set once the engine has asked for the output to be suspended
    pub fn suspend_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.suspend_requested)
    }

    /// Store `true` to end the source
    pub fn finished_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.finished)
    }

    fn refill(&mut self) {
        let status = self.player.lock().process(&mut self.buffer);
        match status {
            BufferStatus::SuspendRequested => {
                self.suspend_requested.store(true, Ordering::Relaxed);
            }
            BufferStatus::Rendered => {
                self.suspend_requested.store(false, Ordering::Relaxed);
            }
            BufferStatus::Silent => {}
        }
        self.buffer_pos = 0;
    }
}

impl<B: Opl3Backend> Iterator for PlayerSource<B> {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        if self.finished.load(Ordering::Relaxed) {
            return None;
        }
        if self.buffer_pos >= self.buffer.len() {
            self.refill();
        }
        let sample = self.buffer.get(self.buffer_pos).copied();
        self.buffer_pos += 1;
        sample
    }
}

impl<B: Opl3Backend> Source for PlayerSource<B> {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.buffer.len().saturating_sub(self.buffer_pos).max(1))
    }

    fn channels(&self) -> u16 {
        CHANNELS
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandStream};
    use crate::opl3::RecordingDevice;
    use crate::replayer::Player;

    fn shared_player(frames: usize) -> SharedPlayer<RecordingDevice> {
        Player::new(RecordingDevice::new(), 1000, frames).into_shared()
    }

    #[test]
    fn test_source_reports_format() {
        let source = PlayerSource::new(shared_player(64));
        assert_eq!(source.channels(), 2);
        assert_eq!(source.sample_rate(), 1000);
        assert!(source.current_frame_len().is_some());
        assert_eq!(source.total_duration(), None);
    }

    #[test]
    fn test_source_locks_once_per_buffer() {
        let player = shared_player(8);
        player.lock().load_stream(CommandStream::from_commands(
            vec![Command::new(0, 0x20, 1), Command::new(1000, 0x20, 2)],
            1000.0,
        ));
        player.lock().play();

        let mut source = PlayerSource::new(Arc::clone(&player));
        let samples: Vec<i16> = source.by_ref().take(16).collect();
        assert_eq!(samples.len(), 16);
        assert_eq!(player.lock().device().rendered(), 8);
        assert_eq!(player.lock().device().register(0x20), 1);
    }

    #[test]
    fn test_source_flags_suspend_after_silence() {
        let player = shared_player(4);
        let mut source = PlayerSource::new(player);
        let flag = source.suspend_flag();

        let _: Vec<i16> = source.by_ref().take(8 * 3).collect();
        assert!(!flag.load(Ordering::Relaxed));
        let _: Vec<i16> = source.by_ref().take(8).collect();
        assert!(flag.load(Ordering::Relaxed));
    }

    #[test]
    fn test_finished_flag_ends_source() {
        let mut source = PlayerSource::new(shared_player(4));
        assert!(source.next().is_some());
        source.finished_flag().store(true, Ordering::Relaxed);
        assert_eq!(source.next(), None);
    }
}
