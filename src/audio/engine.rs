// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::sync::Arc;

use crossbeam_channel::Receiver;

use super::decode::TrackBuffer;
use super::pitch_shift::PitchShifter;
use super::transport::{Command, Transport};

/// The realtime render core.
///
/// Pulls frames from the loop buffer through a fractional read head
/// (varispeed tempo), runs them through the pitch shifter, and writes them
/// into the device's output buffer. Owned by the output callback; the
/// control side talks to it only through the command channel and the
/// transport atomics.
pub struct Engine {
    buffer: Arc<TrackBuffer>,
    transport: Arc<Transport>,
    commands: Receiver<Command>,
    /// Fractional playhead in frames.
    position: f64,
    /// Varispeed rate, target BPM over original BPM.
    rate: f64,
    shifter: PitchShifter,
}

impl Engine {
    pub fn new(
        buffer: Arc<TrackBuffer>,
        transport: Arc<Transport>,
        commands: Receiver<Command>,
    ) -> Engine {
        Engine {
            buffer,
            transport,
            commands,
            position: 0.0,
            rate: 1.0,
            shifter: PitchShifter::new(),
        }
    }

    /// Renders one block of interleaved output.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        self.drain_commands();

        let frames = self.buffer.frames();
        if channels == 0 || frames == 0 || !self.transport.is_playing() {
            out.fill(0.0);
            return;
        }

        for frame in out.chunks_mut(channels) {
            let (l, r) = self.buffer.frame_at(self.position);
            let (l, r) = self.shifter.process(l, r);

            if channels == 1 {
                frame[0] = (l + r) * 0.5;
            } else {
                frame[0] = l;
                frame[1] = r;
                for extra in frame[2..].iter_mut() {
                    *extra = 0.0;
                }
            }

            self.position += self.rate;
            while self.position >= frames as f64 {
                self.position -= frames as f64;
            }
        }

        self.transport.set_position(self.position as usize);
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::SetRate(rate) => {
                    if rate > 0.0 && rate.is_finite() {
                        self.rate = rate;
                    }
                }
                Command::SetShift(semitones) => {
                    // A zero-BPM catalog entry makes the varispeed
                    // correction infinite; never hand that to the shifter.
                    if semitones.is_finite() {
                        self.shifter.set_shift(semitones);
                    }
                }
                Command::Seek(pct) => {
                    let frames = self.buffer.frames() as f64;
                    self.position = (pct.clamp(0.0, 100.0) / 100.0 * frames).min(frames);
                    if self.position >= frames {
                        self.position = 0.0;
                    }
                    self.transport.set_position(self.position as usize);
                }
            }
        }
    }
}
