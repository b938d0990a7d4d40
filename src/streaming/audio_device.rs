//! Audio device integration using rodio
//!
//! Plays a [`PlayerSource`] on the system's default output.

use super::PlayerSource;
use crate::opl3::Opl3Backend;
use crate::replayer::SharedPlayer;
use crate::{Opl3Error, Result};
use rodio::{OutputStream, Sink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Audio playback device using rodio
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    suspend_requested: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Open the default output and start pulling buffers from `player`
    pub fn new<B: Opl3Backend + 'static>(player: SharedPlayer<B>) -> Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default().map_err(|e| {
            Opl3Error::AudioDeviceError(format!("failed to create audio stream: {}", e))
        })?;
        let sink = Sink::try_new(&stream_handle).map_err(|e| {
            Opl3Error::AudioDeviceError(format!("failed to create audio sink: {}", e))
        })?;

        let source = PlayerSource::new(player);
        let suspend_requested = source.suspend_flag();
        let finished = source.finished_flag();
        sink.append(source);

        Ok(AudioDevice {
            _stream: stream,
            sink,
            suspend_requested,
            finished,
        })
    }

    /// Pause output
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume output
    pub fn resume(&self) {
        self.sink.play();
    }

    /// Whether output is paused
    pub fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }

    /// Whether the engine has run out of audio and asked to be suspended
    pub fn suspend_requested(&self) -> bool {
        self.suspend_requested.load(Ordering::Relaxed)
    }

    /// End the source; the sink drains and stops
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }

    /// Block until the sink is empty (after [`finish`](Self::finish))
    pub fn wait_for_finish(&self) {
        self.sink.sleep_until_end();
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.finish();
        self.sink.pause();
    }
}
