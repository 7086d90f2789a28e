// Copyright (C) 2025 the stemmix authors
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

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, StreamConfig};
use tracing::{error, info};

use crate::error::EngineError;

use super::{ErrorFn, OutputStream, RenderFn};

/// A cpal-backed output device.
pub struct Device {
    name: String,
    device: cpal::Device,
}

impl Device {
    /// Lists all cpal output devices on the default host.
    pub fn list() -> Result<Vec<Box<dyn super::Device>>, EngineError> {
        let host = cpal::default_host();
        let devices = host
            .output_devices()
            .map_err(|e| EngineError::Device(format!("unable to enumerate devices: {}", e)))?;

        let mut result: Vec<Box<dyn super::Device>> = Vec::new();
        for device in devices {
            let name = device
                .name()
                .unwrap_or_else(|_| "(unnamed device)".to_string());
            result.push(Box::new(Device { name, device }));
        }
        Ok(result)
    }

    /// Gets the cpal output device with the given name, or the system default
    /// for the name "default".
    pub fn get(name: &str) -> Result<Device, EngineError> {
        let host = cpal::default_host();

        if name == "default" {
            let device = host
                .default_output_device()
                .ok_or_else(|| EngineError::Device("no default output device".to_string()))?;
            let name = device.name().unwrap_or_else(|_| "default".to_string());
            return Ok(Device { name, device });
        }

        host.output_devices()
            .map_err(|e| EngineError::Device(format!("unable to enumerate devices: {}", e)))?
            .find(|device| device.name().is_ok_and(|n| n == name))
            .map(|device| Device {
                name: name.to_string(),
                device,
            })
            .ok_or_else(|| EngineError::Device(format!("no output device named '{}'", name)))
    }

    /// The maximum output channel count the device advertises, for listing.
    fn max_channels(&self) -> u16 {
        self.device
            .supported_output_configs()
            .map(|configs| configs.map(|config| config.channels()).max().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl super::Device for Device {
    fn open_output(
        &self,
        sample_rate: u32,
        mut render: RenderFn,
        mut on_error: ErrorFn,
    ) -> Result<Box<dyn OutputStream>, EngineError> {
        let config = StreamConfig {
            channels: 1,
            sample_rate,
            buffer_size: BufferSize::Default,
        };

        info!(device = self.name, sample_rate, "Opening output stream.");
        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| render(data),
                move |err| {
                    error!(err = format!("{}", err), "Output stream error.");
                    on_error(err.to_string());
                },
                None,
            )
            .map_err(|e| EngineError::Device(format!("unable to open output stream: {}", e)))?;
        stream
            .play()
            .map_err(|e| EngineError::Device(format!("unable to start output stream: {}", e)))?;

        Ok(Box::new(Stream { _stream: stream }))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (channels={})", self.name, self.max_channels())
    }
}

/// Keeps the cpal stream alive; dropping it closes the stream.
struct Stream {
    _stream: cpal::Stream,
}

impl OutputStream for Stream {}
