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
//! The mix equation, shared verbatim by real-time playback and offline
//! export. Both paths hand [`render_block`] the same snapshot type, which is
//! what makes "what you heard" and "what you exported" the same samples.

use std::sync::Arc;

use crate::track::{StemBuffer, StemTrack};

/// Immutable per-track mix state captured into a snapshot.
pub struct TrackMix {
    pub buffer: Arc<StemBuffer>,
    pub gain: f32,
    pub muted: bool,
    pub solo: bool,
    pub enabled: bool,
}

impl TrackMix {
    pub fn of(track: &StemTrack) -> TrackMix {
        TrackMix {
            buffer: track.buffer().clone(),
            gain: track.gain(),
            muted: track.muted(),
            solo: track.solo(),
            enabled: track.enabled(),
        }
    }
}

/// A consistent point-in-time view of the whole track collection. The control
/// context builds a fresh snapshot after every mutation and publishes it; the
/// playback context swaps snapshots at frame boundaries, so a frame is never
/// rendered from half-updated state.
pub struct MixSnapshot {
    tracks: Vec<TrackMix>,
    duration: usize,
}

impl MixSnapshot {
    pub fn new(tracks: Vec<TrackMix>) -> MixSnapshot {
        let duration = tracks.iter().map(|t| t.buffer.len()).max().unwrap_or(0);
        MixSnapshot { tracks, duration }
    }

    pub fn empty() -> MixSnapshot {
        MixSnapshot::new(Vec::new())
    }

    pub fn tracks(&self) -> &[TrackMix] {
        &self.tracks
    }

    /// Session duration in samples: the longest buffer. Shorter stems are
    /// treated as silent past their own end.
    pub fn duration(&self) -> usize {
        self.duration
    }

    /// True if any enabled track has its solo flag set, which gates every
    /// non-soloed track out of the mix.
    pub fn solo_active(&self) -> bool {
        self.tracks.iter().any(|t| t.enabled && t.solo)
    }
}

/// Resolves the gain actually applied to a track: disabled and muted tracks
/// are silent; when any solo is active, so is every non-soloed track. A
/// soloed track still honors its own mute.
pub fn effective_gain(track: &TrackMix, solo_active: bool) -> f32 {
    if !track.enabled || track.muted {
        return 0.0;
    }
    if solo_active && !track.solo {
        return 0.0;
    }
    track.gain
}

/// Renders `out.len()` samples of the mix starting at sample `position`.
///
/// Every audible track contributes its gain-scaled samples; positions past a
/// track's end contribute silence, and positions past the session duration
/// leave the prefilled zeros untouched. The sum is intentionally not clipped
/// or limited: overflow beyond +/-1.0 is accepted and identical in preview
/// and export.
pub fn render_block(snapshot: &MixSnapshot, position: usize, out: &mut [f32]) {
    out.fill(0.0);
    let solo_active = snapshot.solo_active();

    for track in snapshot.tracks() {
        let gain = effective_gain(track, solo_active);
        if gain == 0.0 {
            continue;
        }

        let samples = track.buffer.samples();
        if position >= samples.len() {
            continue;
        }
        let available = (samples.len() - position).min(out.len());
        for (out_sample, sample) in out[..available]
            .iter_mut()
            .zip(&samples[position..position + available])
        {
            *out_sample += sample * gain;
        }
    }
}
