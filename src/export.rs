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
use std::{io, path::Path};

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use crate::{error::EngineError, mixer::MixSnapshot};
use crate::{mixer, util};

/// The block size the offline bounce renders with.
const EXPORT_BLOCK_SIZE: usize = 4096;

/// Bounces the given mix to a mono 32-bit float WAV file at the given rate.
/// The bounce runs the same block renderer playback does, over the full
/// session duration from sample zero. Peaks beyond full scale are written
/// as-is; the float format carries them without clipping.
pub fn render_to_wav(
    snapshot: &MixSnapshot,
    sample_rate: u32,
    path: &Path,
) -> Result<(), EngineError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec).map_err(|e| write_err(path, e))?;

    let duration = snapshot.duration();
    let mut block = vec![0.0_f32; EXPORT_BLOCK_SIZE];
    let mut position: usize = 0;
    while position < duration {
        let frames = EXPORT_BLOCK_SIZE.min(duration - position);
        mixer::render_block(snapshot, position, &mut block[..frames]);
        for sample in &block[..frames] {
            writer.write_sample(*sample).map_err(|e| write_err(path, e))?;
        }
        position += frames;
    }

    writer.finalize().map_err(|e| write_err(path, e))?;
    info!(
        path = path.display().to_string(),
        samples = duration,
        duration = util::duration_minutes_seconds(util::samples_to_duration(
            duration,
            sample_rate
        )),
        "Exported mix."
    );
    Ok(())
}

fn write_err(path: &Path, e: hound::Error) -> EngineError {
    match e {
        hound::Error::IoError(source) => EngineError::io(path, source),
        other => EngineError::io(path, io::Error::other(other.to_string())),
    }
}
