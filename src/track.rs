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
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    sync::Arc,
    time::Duration,
};

use crate::scan::StemRole;
use crate::util::{duration_minutes_seconds, filename_display, samples_to_duration};
use crate::waveform::{self, WaveformPoint};

/// Counter for generating unique track IDs.
static TRACK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifies one track within a session. IDs are never reused, so a stale ID
/// held by a UI after a remove can be detected rather than silently hitting a
/// different track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(u64);

impl TrackId {
    pub(crate) fn next() -> TrackId {
        TrackId(TRACK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track-{}", self.0)
    }
}

/// The decoded samples of one stem: mono, at the session's canonical sample
/// rate. Immutable after load; shared with the playback context behind an Arc.
pub struct StemBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    source_rate: u32,
}

impl StemBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, source_rate: u32) -> StemBuffer {
        StemBuffer {
            samples,
            sample_rate,
            source_rate,
        }
    }

    /// An empty buffer, used as the placeholder behind disabled tracks.
    pub fn empty(sample_rate: u32) -> StemBuffer {
        StemBuffer::new(Vec::new(), sample_rate, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The canonical rate the samples are stored at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The native rate of the source file before load-time resampling.
    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }

    pub fn duration(&self) -> Duration {
        samples_to_duration(self.samples.len(), self.sample_rate)
    }
}

/// One stem of the loaded song: a decoded buffer plus the mutable mix state
/// the UI pokes at. Mix state is only ever written from the control context;
/// the playback context sees it through published snapshots.
pub struct StemTrack {
    id: TrackId,
    path: PathBuf,
    role: StemRole,
    buffer: Arc<StemBuffer>,
    gain: f32,
    muted: bool,
    solo: bool,
    enabled: bool,
}

impl StemTrack {
    /// Creates an enabled track at unity gain around a decoded buffer.
    pub fn new(path: &Path, role: StemRole, buffer: Arc<StemBuffer>) -> StemTrack {
        StemTrack {
            id: TrackId::next(),
            path: path.to_path_buf(),
            role,
            buffer,
            gain: 1.0,
            muted: false,
            solo: false,
            enabled: true,
        }
    }

    /// Creates a disabled placeholder for a stem that failed to load. It
    /// holds an empty buffer and never contributes to the mix, but stays
    /// listed so the UI can show what went missing.
    pub fn disabled(path: &Path, role: StemRole, sample_rate: u32) -> StemTrack {
        let mut track = StemTrack::new(path, role, Arc::new(StemBuffer::empty(sample_rate)));
        track.enabled = false;
        track
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn role(&self) -> StemRole {
        self.role
    }

    pub fn buffer(&self) -> &Arc<StemBuffer> {
        &self.buffer
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn solo(&self) -> bool {
        self.solo
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn duration(&self) -> Duration {
        self.buffer.duration()
    }

    pub(crate) fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    pub(crate) fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub(crate) fn set_solo(&mut self, solo: bool) {
        self.solo = solo;
    }

    /// Produces a peak/RMS envelope of this track's buffer for display.
    pub fn waveform_summary(&self, buckets: usize) -> Vec<WaveformPoint> {
        waveform::summarize(self.buffer.samples(), buckets)
    }
}

impl fmt::Display for StemTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({})",
            self.role,
            filename_display(&self.path),
            duration_minutes_seconds(self.duration()),
        )?;
        if !self.enabled {
            write!(f, " [failed to load]")?;
        }
        if self.muted {
            write!(f, " [muted]")?;
        }
        if self.solo {
            write!(f, " [solo]")?;
        }
        Ok(())
    }
}
