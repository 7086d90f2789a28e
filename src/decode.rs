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
use std::path::Path;

use hound::{SampleFormat, WavReader};
use rubato::{FastFixedIn, PolynomialDegree, VecResampler};
use tracing::debug;

use crate::error::EngineError;
use crate::track::StemBuffer;

/// Input block size for the resampler.
const RESAMPLE_CHUNK_SIZE: usize = 1024;

/// Reads a RIFF/WAVE file into a mono [`StemBuffer`].
///
/// Multi-channel input is downmixed by averaging all channels per frame so
/// neither side of a stereo stem loses energy. When `target_rate` is given
/// and differs from the file's native rate, the samples are resampled at load
/// time with linear interpolation; playback and export then never resample.
pub fn load_stem(path: &Path, target_rate: Option<u32>) -> Result<StemBuffer, EngineError> {
    let reader = WavReader::open(path).map_err(|e| from_hound(path, e))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(EngineError::unsupported(path, "file reports zero channels"));
    }

    let interleaved = read_samples(path, reader)?;
    let mono = downmix(&interleaved, spec.channels as usize);

    let source_rate = spec.sample_rate;
    let canonical_rate = target_rate.unwrap_or(source_rate);
    let samples = if canonical_rate == source_rate {
        mono
    } else {
        debug!(
            file = %path.display(),
            from = source_rate,
            to = canonical_rate,
            "Resampling stem to the canonical rate."
        );
        resample(mono, source_rate, canonical_rate, path)?
    };

    Ok(StemBuffer::new(samples, canonical_rate, source_rate))
}

/// Reads the interleaved samples out of a WAV file as f32, scaling integer
/// formats into [-1.0, 1.0].
fn read_samples(
    path: &Path,
    reader: WavReader<std::io::BufReader<std::fs::File>>,
) -> Result<Vec<f32>, EngineError> {
    let spec = reader.spec();
    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .map(|sample| sample.map_err(|e| from_hound(path, e)))
            .collect(),
        (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let scale = 1.0 / (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|sample| {
                    sample
                        .map(|sample| sample as f32 * scale)
                        .map_err(|e| from_hound(path, e))
                })
                .collect()
        }
        (format, bits) => Err(EngineError::unsupported(
            path,
            format!("{} bit {:?} samples", bits, format),
        )),
    }
}

/// Averages interleaved frames down to mono.
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }
    let inverse = 1.0 / channels as f32;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * inverse)
        .collect()
}

/// Resamples a mono buffer with rubato's fixed-ratio linear interpolator.
/// Deterministic for a given input, which keeps repeated exports byte-stable.
fn resample(
    samples: Vec<f32>,
    from_rate: u32,
    to_rate: u32,
    path: &Path,
) -> Result<Vec<f32>, EngineError> {
    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let mut resampler = FastFixedIn::<f32>::new(
        ratio,
        1.0,
        PolynomialDegree::Linear,
        RESAMPLE_CHUNK_SIZE,
        1,
    )
    .map_err(|e| {
        EngineError::unsupported(path, format!("resampling {}Hz -> {}Hz: {}", from_rate, to_rate, e))
    })?;

    let resample_err = |_| {
        EngineError::unsupported(
            path,
            format!("resampling failed: {}Hz -> {}Hz", from_rate, to_rate),
        )
    };

    let mut output = Vec::with_capacity((samples.len() as f64 * ratio) as usize + RESAMPLE_CHUNK_SIZE);
    let mut scratch = resampler.output_buffer_allocate(true);
    let mut input = vec![Vec::with_capacity(RESAMPLE_CHUNK_SIZE)];
    let mut position = 0;

    loop {
        let needed = resampler.input_frames_next();
        if samples.len() - position < needed {
            break;
        }
        input[0].clear();
        input[0].extend_from_slice(&samples[position..position + needed]);
        let (_, output_frames) = resampler
            .process_into_buffer(&input, &mut scratch, None)
            .map_err(resample_err)?;
        output.extend_from_slice(&scratch[0][..output_frames]);
        position += needed;
    }

    // Feed the remaining partial block, then flush the resampler's tail.
    if position < samples.len() {
        input[0].clear();
        input[0].extend_from_slice(&samples[position..]);
        let (_, output_frames) = resampler
            .process_partial_into_buffer(Some(&input as &[Vec<f32>]), &mut scratch, None)
            .map_err(resample_err)?;
        output.extend_from_slice(&scratch[0][..output_frames]);
    }
    let (_, output_frames) = resampler
        .process_partial_into_buffer(None::<&[Vec<f32>]>, &mut scratch, None)
        .map_err(resample_err)?;
    output.extend_from_slice(&scratch[0][..output_frames]);

    Ok(output)
}

/// Maps a hound error into the engine taxonomy: real I/O failures stay I/O
/// errors, everything else means the file is not WAV we can decode.
fn from_hound(path: &Path, err: hound::Error) -> EngineError {
    match err {
        hound::Error::IoError(source) => EngineError::io(path, source),
        other => EngineError::unsupported(path, other.to_string()),
    }
}
