//! Buffer Rendering Hot Path
//!
//! Called once per audio buffer. Never blocks, never allocates and never
//! fails: anything missing renders as silence.

use super::player::Player;
use super::{BufferStatus, PlaybackState, SOFT_STOP_BUFFERS};
use crate::opl3::Opl3Backend;

impl<B: Opl3Backend> Player<B> {
    /// Render one buffer of interleaved stereo samples (`L, R, L, R, ...`)
    ///
    /// A queued stream is swapped in first. Commands are dispatched per
    /// output sample: everything with `time <= position * cmd_rate /
    /// sample_rate` goes to the device before it renders that sample.
    pub fn process(&mut self, buffer: &mut [i16]) -> BufferStatus {
        self.swap_in_queued();

        if self.state != PlaybackState::Playing || self.stream.is_none() {
            buffer.fill(0);
            return self.silent_buffer();
        }

        if self.just_sought {
            let frames = self.buffer_frames as u64;
            self.sample_position = self.sample_position / frames * frames;
            self.just_sought = false;
        }

        self.render_frames(buffer);
        self.soft_stop_counter = 0;
        BufferStatus::Rendered
    }

    /// Advance the command clock and render every frame of `buffer`
    fn render_frames(&mut self, buffer: &mut [i16]) {
        let Some(stream) = self.stream.as_ref() else {
            buffer.fill(0);
            return;
        };
        let commands = &stream.commands;
        let ratio = stream.cmd_rate / self.sample_rate as f64;

        let mut frames = buffer.chunks_exact_mut(2);
        for frame in &mut frames {
            if self.state == PlaybackState::Playing {
                let scaled_time = self.sample_position as f64 * ratio;
                while let Some(command) = commands.get(self.cursor) {
                    if command.time as f64 > scaled_time {
                        break;
                    }
                    self.device.write(command.register, command.value);
                    self.cursor += 1;
                }

                if self.cursor >= commands.len() {
                    log::debug!(
                        "stream finished at {:.3}s",
                        self.sample_position as f64 / self.sample_rate as f64
                    );
                    self.state = PlaybackState::Stopping;
                } else {
                    self.sample_position += 1;
                }
            }

            let (left, right) = self.device.render();
            frame[0] = left;
            frame[1] = right;
        }
        frames.into_remainder().fill(0);
    }

    /// Count a silent buffer toward the soft stop
    fn silent_buffer(&mut self) -> BufferStatus {
        if self.suspended {
            return BufferStatus::Silent;
        }

        self.soft_stop_counter += 1;
        if self.soft_stop_counter < SOFT_STOP_BUFFERS {
            return BufferStatus::Silent;
        }

        self.soft_stop_counter = 0;
        self.suspended = true;
        if self.state == PlaybackState::Stopping {
            self.state = PlaybackState::Stopped;
        }
        log::debug!("{} silent buffers, requesting suspend", SOFT_STOP_BUFFERS);
        BufferStatus::SuspendRequested
    }
}
