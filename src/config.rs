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
use std::{fs, path::Path};

use serde::Deserialize;

use crate::error::EngineError;

/// A YAML representation of the engine configuration.
#[derive(Deserialize, Clone, Default)]
pub struct Config {
    /// The audio output device.
    device: Option<String>,

    /// The canonical sample rate in Hz. When unset, the rate of the first
    /// stem that loads becomes canonical.
    sample_rate: Option<u32>,
}

impl Config {
    /// Parses the configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Config, EngineError> {
        let contents = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        serde_yml::from_str(&contents)
            .map_err(|e| EngineError::unsupported(path, format!("invalid configuration: {}", e)))
    }

    /// Returns the device from the configuration (default: "default").
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or("default")
    }

    /// Returns the canonical sample rate override, if set.
    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }
}
