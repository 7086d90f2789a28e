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
use std::{fmt, sync::Arc};

use crate::error::EngineError;

pub mod cpal;
pub mod mock;

/// Fills `out` with the next mono samples. Runs in the device's real-time
/// context, so implementations must not block.
pub type RenderFn = Box<dyn FnMut(&mut [f32]) + Send>;

/// Receives device errors reported after the stream has opened.
pub type ErrorFn = Box<dyn FnMut(String) + Send>;

/// An open output stream. Dropping the handle stops the stream and releases
/// the device; there is no other way to close it, so release happens exactly
/// once. Handles are not required to be Send: the transport opens and drops
/// them on its own thread.
pub trait OutputStream {}

pub trait Device: fmt::Display + Send + Sync {
    /// Opens a mono output stream at the given sample rate. The stream pulls
    /// every hardware frame from `render` until the returned handle is
    /// dropped; failures after open are delivered to `on_error`.
    fn open_output(
        &self,
        sample_rate: u32,
        render: RenderFn,
        on_error: ErrorFn,
    ) -> Result<Box<dyn OutputStream>, EngineError>;
}

/// Lists devices usable for playback.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, EngineError> {
    cpal::Device::list()
}

/// Gets the output device with the given name. Names starting with "mock"
/// yield a mock device; "default" (or no name) yields the system default
/// output.
pub fn get_device(name: Option<&str>) -> Result<Arc<dyn Device>, EngineError> {
    let name = name.unwrap_or("default");
    if name.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(name)));
    }

    Ok(Arc::new(cpal::Device::get(name)?))
}
