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
//! A synchronized stem player, mixer, and exporter. Pre-separated stems are
//! decoded onto one sample-aligned timeline, mixed with per-track gain,
//! mute, and solo, played through an output device, and bounced offline to
//! a WAV whose samples match playback exactly.

pub mod audio;
pub mod config;
pub mod decode;
pub mod error;
pub mod export;
pub mod lyrics;
pub mod mixer;
pub mod playsync;
pub mod scan;
pub mod session;
pub mod track;
pub mod transport;
pub mod util;
pub mod waveform;

#[cfg(test)]
pub(crate) mod testutil;
