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

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Receiver;
use tracing::{error, info, span, Level};

use super::decode::TrackBuffer;
use super::engine::Engine;
use super::error::AudioError;
use super::transport::{Command, Transport};
use super::Device as AudioDevice;

/// A small wrapper around a cpal::Device carrying the bits we need for
/// listing and display.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
}

impl Device {
    /// Lists output-capable devices as audio devices.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, AudioError> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices that have at least one output config.
    fn list_cpal_devices() -> Result<Vec<Device>, AudioError> {
        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host = match cpal::host_from_id(host_id) {
                Ok(host) => host,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to open host."
                    );
                    continue;
                }
            };
            let host_devices = match host.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host."
                    );
                    continue;
                }
            };

            for device in host_devices {
                let has_output = device
                    .supported_output_configs()
                    .map(|mut configs| configs.next().is_some())
                    .unwrap_or(false);
                if !has_output {
                    continue;
                }
                devices.push(Device {
                    name: device.name()?,
                    host_id,
                    device,
                });
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the named cpal device, or the default output device when no
    /// name is given.
    pub fn get(name: Option<&str>) -> Result<Device, AudioError> {
        match name {
            Some(name) => Device::list_cpal_devices()?
                .into_iter()
                .find(|device| device.name.trim() == name)
                .ok_or_else(|| {
                    AudioError::Device(format!("no device found with name {}", name))
                }),
            None => {
                let host = cpal::default_host();
                let device = host.default_output_device().ok_or_else(|| {
                    AudioError::Device("no default output device".to_string())
                })?;
                Ok(Device {
                    name: device.name()?,
                    host_id: host.id(),
                    device,
                })
            }
        }
    }
}

impl AudioDevice for Device {
    fn sample_rate(&self) -> Result<u32, AudioError> {
        Ok(self.device.default_output_config()?.sample_rate())
    }

    fn play(
        &self,
        buffer: Arc<TrackBuffer>,
        transport: Arc<Transport>,
        commands: Receiver<Command>,
    ) -> Result<(), AudioError> {
        let span = span!(Level::INFO, "play (cpal)");
        let _enter = span.enter();

        let config = self.device.default_output_config()?;
        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(AudioError::UnsupportedFormat(format!(
                "device wants {:?}, only f32 output is supported",
                config.sample_format()
            )));
        }
        let channels = config.channels() as usize;
        let stream_config: cpal::StreamConfig = config.into();

        info!(
            device = self.name,
            channels,
            sample_rate = stream_config.sample_rate,
            "Starting playback."
        );

        let mut engine = Engine::new(buffer, transport.clone(), commands);
        let stream = self.device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _| engine.render(data, channels),
            |e| error!(err = e.to_string(), "Output stream error."),
            None,
        )?;
        stream.play()?;

        // The stream renders on its own thread until the transport stops.
        transport.wait();
        Ok(())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.host_id.name())
    }
}
