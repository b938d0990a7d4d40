//! Seek by replay
//!
//! The device cannot be rewound, so a seek resets it and replays every
//! command before the target into a shadow register file (last write wins),
//! then writes the surviving values. No audio is rendered.

use super::player::Player;
use super::{PlaybackState, SeekOutcome};
use crate::command::Command;
use crate::opl3::registers::{OPL3_MODE, REGISTER_COUNT};
use crate::opl3::Opl3Backend;

/// Last value written to each register, if any
#[derive(Debug, Clone)]
pub(in crate::replayer) struct ShadowRegisters {
    values: [Option<u8>; REGISTER_COUNT],
}

impl ShadowRegisters {
    pub(in crate::replayer) fn new() -> Self {
        ShadowRegisters {
            values: [None; REGISTER_COUNT],
        }
    }

    pub(in crate::replayer) fn apply(&mut self, command: &Command) {
        self.values[command.register as usize % REGISTER_COUNT] = Some(command.value);
    }

    /// Write every shadowed register, the OPL3 mode register first
    pub(in crate::replayer) fn flush<B: Opl3Backend>(&self, device: &mut B) {
        if let Some(mode) = self.values[OPL3_MODE as usize] {
            device.write(OPL3_MODE, mode);
        }
        for (register, value) in self.values.iter().enumerate() {
            if register == OPL3_MODE as usize {
                continue;
            }
            if let Some(value) = *value {
                device.write(register as u16, value);
            }
        }
    }
}

impl<B: Opl3Backend> Player<B> {
    /// Rebuild device state at `seconds` and continue from there
    ///
    /// Negative or NaN targets clamp to 0. A target at or past the last
    /// command applies the whole stream and stops playback instead of
    /// leaving the cursor dangling at the end.
    pub fn seek(&mut self, seconds: f64) -> SeekOutcome {
        self.swap_in_queued();
        let Some(stream) = self.stream.as_ref() else {
            log::debug!("seek ignored: no stream loaded");
            return SeekOutcome::NoStream;
        };

        let seconds = if seconds > 0.0 { seconds } else { 0.0 };
        let target_ticks = stream.seconds_to_ticks(seconds);
        let to_end = seconds >= stream.total_seconds() || target_ticks >= stream.last_time() as f64;

        self.device.reset(self.sample_rate);
        let mut shadow = ShadowRegisters::new();
        let mut cursor = 0;
        for command in &stream.commands {
            if !to_end && command.time as f64 >= target_ticks {
                break;
            }
            shadow.apply(command);
            cursor += 1;
        }
        shadow.flush(&mut self.device);
        self.cursor = cursor;

        if cursor >= stream.commands.len() {
            self.sample_position = (stream.total_seconds() * self.sample_rate as f64) as u64;
            self.just_sought = false;
            self.state = match self.state {
                PlaybackState::Playing | PlaybackState::Stopping => PlaybackState::Stopping,
                PlaybackState::Idle | PlaybackState::Stopped => PlaybackState::Stopped,
            };
            log::debug!("seek to {:.3}s reached end of stream", seconds);
            return SeekOutcome::EndOfStream;
        }

        self.sample_position = (seconds * self.sample_rate as f64) as u64;
        self.just_sought = true;
        log::debug!(
            "seek to {:.3}s: {} of {} commands replayed",
            seconds,
            cursor,
            stream.commands.len()
        );
        SeekOutcome::Positioned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandStream;
    use crate::opl3::RecordingDevice;
    use crate::replayer::BufferStatus;

    fn sample_stream() -> CommandStream {
        CommandStream::from_commands(
            vec![
                Command::new(0, 0x20, 0x01),
                Command::new(0, 0x105, 0x01),
                Command::new(100, 0x20, 0x02),
                Command::new(200, 0xB0, 0x32),
                Command::new(300, 0x20, 0x03),
            ],
            1000.0,
        )
    }

    fn loaded_player() -> Player<RecordingDevice> {
        let mut player = Player::new(RecordingDevice::new(), 1000, 16);
        player.load_stream(sample_stream());
        player
    }

    #[test]
    fn test_seek_without_stream() {
        let mut player = Player::new(RecordingDevice::new(), 1000, 16);
        assert_eq!(player.seek(1.0), SeekOutcome::NoStream);
    }

    #[test]
    fn test_seek_replays_last_write_wins() {
        let mut player = loaded_player();
        assert_eq!(player.seek(0.25), SeekOutcome::Positioned);
        assert_eq!(player.cursor(), 4);
        assert_eq!(player.device().register(0x20), 0x02);
        assert_eq!(player.device().register(0xB0), 0x32);
        assert_eq!(player.playback_time(), 0.25);
    }

    #[test]
    fn test_mode_register_written_first() {
        let mut player = loaded_player();
        player.seek(0.15);
        assert_eq!(player.device().writes()[0], (0x105, 0x01));
        assert_eq!(player.device().writes().len(), 2);
    }

    #[test]
    fn test_target_excludes_commands_at_that_time() {
        let mut player = loaded_player();
        player.seek(0.1);
        assert_eq!(player.cursor(), 2);
        assert_eq!(player.device().register(0x20), 0x01);
    }

    #[test]
    fn test_negative_target_clamps_to_start() {
        let mut player = loaded_player();
        assert_eq!(player.seek(-3.0), SeekOutcome::Positioned);
        assert_eq!(player.cursor(), 0);
        assert!(player.device().writes().is_empty());
        assert_eq!(player.playback_time(), 0.0);
    }

    #[test]
    fn test_seek_past_end_stops() {
        let mut player = loaded_player();
        player.play();
        assert_eq!(player.seek(10.0), SeekOutcome::EndOfStream);
        assert_eq!(player.state(), PlaybackState::Stopping);
        assert_eq!(player.cursor(), 5);
        assert_eq!(player.device().register(0x20), 0x03);
        assert_eq!(player.playback_time(), 0.3);
    }

    #[test]
    fn test_playback_resumes_from_buffer_boundary() {
        let mut player = loaded_player();
        player.play();
        player.seek(0.2);
        assert_eq!(player.playback_time(), 0.2);

        let mut buffer = [0i16; 16 * 2];
        assert_eq!(player.process(&mut buffer), BufferStatus::Rendered);
        // 200 snaps to 192, then one buffer of 16 frames
        assert_eq!(player.playback_time(), 0.208);
        assert_eq!(player.device().register(0x20), 0x02);
    }
}
