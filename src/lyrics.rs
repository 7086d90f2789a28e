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
use std::error::Error;

/// Turns a vocal stem into lyric text. Implementations get the decoded mono
/// samples read-only; a failure is reported to the caller but never affects
/// mixing or export.
pub trait Transcriber {
    /// Transcribes the given mono vocal samples at the given sample rate.
    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String, Box<dyn Error>>;
}

/// A transcriber that returns a canned result, for tests.
#[cfg(test)]
pub(crate) struct StubTranscriber {
    pub(crate) result: Result<String, String>,
}

#[cfg(test)]
impl Transcriber for StubTranscriber {
    fn transcribe(&self, _: &[f32], _: u32) -> Result<String, Box<dyn Error>> {
        match &self.result {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(message.clone().into()),
        }
    }
}
