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
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use tracing::{info, span, Level};

use super::decode::TrackBuffer;
use super::engine::Engine;
use super::error::AudioError;
use super::transport::{Command, Transport};

/// Frames rendered per mock callback.
const BLOCK_FRAMES: usize = 256;

const SAMPLE_RATE: u32 = 44100;

/// A mock device. Runs the real render engine against a scratch buffer at
/// roughly realtime pace, so player behavior can be tested without audio
/// hardware.
#[derive(Clone)]
pub struct Device {
    name: String,
    is_playing: Arc<AtomicBool>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            is_playing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns true if the device is currently inside a play call.
    #[cfg(test)]
    pub fn is_playing(&self) -> bool {
        self.is_playing.load(Ordering::Relaxed)
    }
}

impl super::Device for Device {
    fn sample_rate(&self) -> Result<u32, AudioError> {
        Ok(SAMPLE_RATE)
    }

    fn play(
        &self,
        buffer: Arc<TrackBuffer>,
        transport: Arc<Transport>,
        commands: Receiver<Command>,
    ) -> Result<(), AudioError> {
        let span = span!(Level::INFO, "play (mock)");
        let _enter = span.enter();

        info!(device = self.name, "Playing through mock device.");

        self.is_playing.store(true, Ordering::Relaxed);

        let mut engine = Engine::new(buffer, transport.clone(), commands);
        let mut scratch = vec![0.0f32; BLOCK_FRAMES * 2];
        let block = Duration::from_secs_f64(BLOCK_FRAMES as f64 / SAMPLE_RATE as f64);

        while !transport.is_stopped() {
            engine.render(&mut scratch, 2);
            thread::sleep(block);
        }

        self.is_playing.store(false, Ordering::Relaxed);
        Ok(())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
