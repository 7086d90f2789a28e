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
use std::{io, path::Path, path::PathBuf};

/// Errors produced by the stem engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The file could not be read at all.
    #[error("Unable to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not linear PCM in a container we can decode.
    #[error("Unsupported format in {}: {reason}", path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    /// The output device failed to open or write.
    #[error("Audio device error: {0}")]
    Device(String),

    /// The operation is not valid for the current session state or arguments.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl EngineError {
    /// Wraps an I/O error with the path that produced it.
    pub fn io(path: &Path, source: io::Error) -> EngineError {
        EngineError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Flags a file as undecodable with a human readable reason.
    pub fn unsupported(path: &Path, reason: impl Into<String>) -> EngineError {
        EngineError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}
