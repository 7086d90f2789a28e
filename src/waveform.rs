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
//! Fixed-resolution peak/RMS envelopes for waveform displays. Purely a
//! function of the buffer contents and the bucket count; never consulted by
//! the mixing path.

/// One display bucket of a waveform envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaveformPoint {
    /// Largest absolute sample value in the bucket.
    pub peak: f32,
    /// Root mean square of the bucket's samples.
    pub rms: f32,
}

/// Downsamples a buffer into `buckets` (peak, RMS) pairs tiling its full
/// length. Bucket boundaries use integer arithmetic so every sample lands in
/// exactly one bucket; buckets with no samples (a buffer shorter than the
/// bucket count) come back as silence.
pub fn summarize(samples: &[f32], buckets: usize) -> Vec<WaveformPoint> {
    let mut points = Vec::with_capacity(buckets);
    let len = samples.len();

    for bucket in 0..buckets {
        let start = bucket * len / buckets;
        let end = (bucket + 1) * len / buckets;
        if start >= end {
            points.push(WaveformPoint::default());
            continue;
        }

        let mut peak = 0.0f32;
        let mut sum_squares = 0.0f64;
        for &sample in &samples[start..end] {
            peak = peak.max(sample.abs());
            sum_squares += f64::from(sample) * f64::from(sample);
        }
        points.push(WaveformPoint {
            peak,
            rms: (sum_squares / (end - start) as f64).sqrt() as f32,
        });
    }

    points
}
