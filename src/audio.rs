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
use std::sync::Arc;

use crossbeam_channel::Receiver;

pub mod cpal;
pub mod decode;
pub mod engine;
pub mod error;
pub mod mock;
pub mod pitch_shift;
pub mod resample;
pub mod transport;

pub use decode::{decode_file, TrackBuffer};
pub use error::AudioError;
pub use resample::resample_to;
pub use transport::{Command, Transport};

/// An output device that can play a looped track buffer.
pub trait Device: fmt::Display + Send + Sync {
    /// The device's output sample rate, for resampling tracks at load time.
    fn sample_rate(&self) -> Result<u32, AudioError>;

    /// Plays the buffer in a loop until the transport is stopped. Blocks
    /// for the duration of playback.
    fn play(
        &self,
        buffer: Arc<TrackBuffer>,
        transport: Arc<Transport>,
        commands: Receiver<Command>,
    ) -> Result<(), AudioError>;
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, AudioError> {
    cpal::Device::list()
}

/// Gets a device with the given name. Names starting with `mock` resolve to
/// the mock device; no name means the default output device.
pub fn get_device(name: Option<&str>) -> Result<Arc<dyn Device>, AudioError> {
    if let Some(name) = name {
        if name.starts_with("mock") {
            return Ok(Arc::new(mock::Device::get(name)));
        }
    }
    Ok(Arc::new(cpal::Device::get(name)?))
}
