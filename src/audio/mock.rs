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
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use parking_lot::Mutex;
use tracing::info;

use crate::error::EngineError;

use super::{ErrorFn, OutputStream, RenderFn};

/// The frame size the mock device pulls with.
const MOCK_FRAME_SIZE: usize = 256;

/// A mock device. Pulls the render callback on a thread and records every
/// sample it is handed instead of playing anything.
#[derive(Clone)]
pub struct Device {
    name: String,
    captured: Arc<Mutex<Vec<f32>>>,
    open_streams: Arc<AtomicUsize>,
    fail_to_open: bool,
    stream_failures: Arc<Mutex<Vec<usize>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            captured: Arc::new(Mutex::new(Vec::new())),
            open_streams: Arc::new(AtomicUsize::new(0)),
            fail_to_open: false,
            stream_failures: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A mock device that refuses to open a stream.
    #[cfg(test)]
    pub fn failing_open(name: &str) -> Device {
        let mut device = Device::get(name);
        device.fail_to_open = true;
        device
    }

    /// A mock device whose streams report an error after rendering the given
    /// number of samples. Each opened stream consumes one entry; streams
    /// opened after the list is exhausted run clean.
    #[cfg(test)]
    pub fn with_stream_failures(name: &str, failures: &[usize]) -> Device {
        let device = Device::get(name);
        *device.stream_failures.lock() = failures.to_vec();
        device
    }

    /// All samples handed to this device so far, across every stream.
    #[cfg(test)]
    pub fn captured(&self) -> Vec<f32> {
        self.captured.lock().clone()
    }

    /// The number of streams currently open on this device.
    #[cfg(test)]
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::Relaxed)
    }
}

impl super::Device for Device {
    fn open_output(
        &self,
        sample_rate: u32,
        mut render: RenderFn,
        mut on_error: ErrorFn,
    ) -> Result<Box<dyn OutputStream>, EngineError> {
        if self.fail_to_open {
            return Err(EngineError::Device(format!(
                "mock device '{}' refused to open",
                self.name
            )));
        }

        info!(device = self.name, sample_rate, "Opening mock output stream.");

        let fail_after = {
            let mut failures = self.stream_failures.lock();
            if failures.is_empty() {
                None
            } else {
                Some(failures.remove(0))
            }
        };

        self.open_streams.fetch_add(1, Ordering::Relaxed);
        let stop = Arc::new(AtomicBool::new(false));
        let join = {
            let stop = stop.clone();
            let captured = self.captured.clone();
            thread::spawn(move || {
                let mut rendered: usize = 0;
                let mut frame = [0.0_f32; MOCK_FRAME_SIZE];
                while !stop.load(Ordering::Relaxed) {
                    render(&mut frame);
                    captured.lock().extend_from_slice(&frame);
                    rendered += frame.len();

                    if fail_after.is_some_and(|limit| rendered >= limit) {
                        on_error("mock stream failure".to_string());
                        break;
                    }

                    thread::sleep(Duration::from_micros(200));
                }
            })
        };

        Ok(Box::new(Stream {
            stop,
            join: Some(join),
            open_streams: self.open_streams.clone(),
        }))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

struct Stream {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
    open_streams: Arc<AtomicUsize>,
}

impl OutputStream for Stream {}

impl Drop for Stream {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
        self.open_streams.fetch_sub(1, Ordering::Relaxed);
    }
}
