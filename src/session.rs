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
use std::{path::Path, sync::Arc};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::{
    audio::{self, Device},
    config::Config,
    decode,
    error::EngineError,
    export,
    lyrics::Transcriber,
    mixer::{MixSnapshot, TrackMix},
    scan::{self, StemRole},
    track::{StemTrack, TrackId},
    transport::{EngineMessage, PlaybackState, Timeline, Transport},
    util,
};

/// The canonical rate used before any stem has loaded.
const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// A set of stems sharing one sample-aligned timeline. The session owns the
/// mix state and the transport; everything the render thread sees goes out
/// through immutable snapshots, so a control-side mutation can never tear a
/// frame in half.
pub struct MixSession {
    tracks: Vec<StemTrack>,
    timeline: Arc<Timeline>,
    sample_rate: Option<u32>,
    device_name: String,
    device: Option<Arc<dyn Device>>,
    sender: Sender<EngineMessage>,
    receiver: Receiver<EngineMessage>,
    transport: Transport,
    last_error: Arc<Mutex<Option<EngineError>>>,
}

impl MixSession {
    /// An empty session with the given configuration applied.
    pub fn new(config: &Config) -> MixSession {
        let (sender, receiver) = unbounded();
        MixSession {
            tracks: Vec::new(),
            timeline: Arc::new(Timeline::new()),
            sample_rate: config.sample_rate(),
            device_name: config.device().to_string(),
            device: None,
            sender,
            receiver,
            transport: Transport::new(),
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Scans the folder for stems and loads every recognized file. A stem
    /// that fails to decode is added disabled so the rest of the session
    /// still mixes.
    pub fn load_folder(path: &Path, config: &Config) -> Result<MixSession, EngineError> {
        let mut session = MixSession::new(config);

        let entries = scan::scan_folder(path)?;
        if entries.is_empty() {
            warn!(
                folder = path.display().to_string(),
                "No stems recognized in the folder."
            );
        }

        for (file, role) in entries {
            if let Err(e) = session.add_track(&file, role) {
                warn!(
                    err = format!("{}", e),
                    file = util::filename_display(&file),
                    "Unable to load stem; adding it disabled."
                );
                let rate = session.sample_rate();
                session.tracks.push(StemTrack::disabled(&file, role, rate));
            }
        }

        info!(
            folder = path.display().to_string(),
            tracks = session.tracks.len(),
            duration = util::duration_minutes_seconds(util::samples_to_duration(
                session.duration(),
                session.sample_rate()
            )),
            "Loaded session."
        );
        Ok(session)
    }

    /// Decodes the given file at the canonical rate and appends it to the
    /// session. The first stem to load successfully fixes the canonical
    /// rate when the configuration does not.
    pub fn add_track(&mut self, path: &Path, role: StemRole) -> Result<TrackId, EngineError> {
        let buffer = decode::load_stem(path, self.sample_rate)?;
        if self.sample_rate.is_none() {
            self.sample_rate = Some(buffer.sample_rate());
        }

        let track = StemTrack::new(path, role, Arc::new(buffer));
        let id = track.id();
        info!(
            track = id.to_string(),
            role = role.as_str(),
            file = util::filename_display(path),
            duration = util::duration_minutes_seconds(track.duration()),
            "Added track."
        );
        self.tracks.push(track);
        self.publish();
        Ok(id)
    }

    /// Removes the track. If the remaining stems are shorter than the
    /// current playhead, the playhead is clamped to the new duration; the
    /// render engine does the same when a shrunken mix reaches it mid-play.
    pub fn remove_track(&mut self, id: TrackId) -> Result<(), EngineError> {
        let index = self
            .tracks
            .iter()
            .position(|t| t.id() == id)
            .ok_or_else(|| EngineError::InvalidState(format!("no track with id {}", id)))?;
        let track = self.tracks.remove(index);
        info!(
            track = id.to_string(),
            file = util::filename_display(track.path()),
            "Removed track."
        );
        self.publish();

        let duration = self.duration();
        if self.state() != PlaybackState::Playing && self.timeline.position() > duration {
            self.timeline.set_position(duration);
        }
        Ok(())
    }

    pub fn tracks(&self) -> &[StemTrack] {
        &self.tracks
    }

    /// The session duration in samples: the longest stem wins, shorter
    /// stems are silent past their own end.
    pub fn duration(&self) -> usize {
        self.tracks
            .iter()
            .map(|t| t.buffer().len())
            .max()
            .unwrap_or(0)
    }

    /// The canonical sample rate all stems are aligned to.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    pub fn state(&self) -> PlaybackState {
        self.timeline.state()
    }

    /// The playhead position in samples at the canonical rate.
    pub fn playhead_position(&self) -> usize {
        self.timeline.position()
    }

    /// Sets a track's gain. Gains scale that track's contribution linearly
    /// and may exceed 1.0; negative or non-finite values are rejected.
    pub fn set_gain(&mut self, id: TrackId, gain: f32) -> Result<(), EngineError> {
        if !gain.is_finite() || gain < 0.0 {
            return Err(EngineError::InvalidState(format!(
                "gain must be a non-negative finite number, got {}",
                gain
            )));
        }
        self.track_mut(id)?.set_gain(gain);
        info!(track = id.to_string(), gain, "Set track gain.");
        self.publish();
        Ok(())
    }

    pub fn set_mute(&mut self, id: TrackId, muted: bool) -> Result<(), EngineError> {
        self.track_mut(id)?.set_muted(muted);
        info!(track = id.to_string(), muted, "Set track mute.");
        self.publish();
        Ok(())
    }

    pub fn set_solo(&mut self, id: TrackId, solo: bool) -> Result<(), EngineError> {
        self.track_mut(id)?.set_solo(solo);
        info!(track = id.to_string(), solo, "Set track solo.");
        self.publish();
        Ok(())
    }

    /// Starts or resumes playback. A no-op while already playing; when the
    /// playhead rests at the end of the session, playback restarts from
    /// sample zero. An empty session stays stopped.
    pub fn play(&mut self) -> Result<(), EngineError> {
        match self.state() {
            PlaybackState::Playing => Ok(()),
            PlaybackState::Paused if self.transport.is_active() => {
                info!(position = self.timeline.position(), "Resuming playback.");
                self.timeline.set_state(PlaybackState::Playing);
                Ok(())
            }
            _ => self.start_stream(),
        }
    }

    /// Pauses playback in place. The output stream stays open and renders
    /// silence, so resuming is gapless. A no-op unless playing.
    pub fn pause(&mut self) {
        if self.state() == PlaybackState::Playing {
            info!(position = self.timeline.position(), "Pausing playback.");
            self.timeline.set_state(PlaybackState::Paused);
        }
    }

    /// Stops playback, releases the output stream, and rewinds the playhead
    /// to sample zero. After a natural end the session is already stopped
    /// but resting at the duration; stop() still rewinds it.
    pub fn stop(&mut self) {
        if self.state() == PlaybackState::Stopped
            && !self.transport.is_active()
            && self.timeline.position() == 0
        {
            return;
        }
        info!("Stopping playback.");
        self.transport.stop();
        self.timeline.set_state(PlaybackState::Stopped);
        self.timeline.set_position(0);
    }

    /// Moves the playhead. Valid in any transport state; positions beyond
    /// the session duration clamp to the duration and stop playback. While
    /// a stream is open the move is applied by the render engine between
    /// frames, so a frame never straddles the splice.
    pub fn seek(&mut self, position: usize) {
        if self.transport.is_active() {
            let _ = self.sender.send(EngineMessage::Seek(position));
            return;
        }

        let duration = self.duration();
        let clamped = position.min(duration);
        self.timeline.set_position(clamped);
        if clamped >= duration && duration > 0 && self.state() != PlaybackState::Stopped {
            self.timeline.set_state(PlaybackState::Stopped);
        }
    }

    /// Bounces the current mix to a mono float WAV at the canonical rate.
    /// The mix state is frozen when the call starts; playback state and the
    /// playhead are untouched.
    pub fn export(&self, path: &Path) -> Result<(), EngineError> {
        export::render_to_wav(&self.snapshot_now(), self.sample_rate(), path)
    }

    /// Runs the transcriber over the vocal stem, if the session has one.
    /// Failures are logged and swallowed; lyrics never block the mix.
    pub fn transcribe_vocals(&self, transcriber: &dyn Transcriber) -> Option<String> {
        let track = self
            .tracks
            .iter()
            .find(|t| t.enabled() && t.role() == StemRole::Vocals)?;
        match transcriber.transcribe(track.buffer().samples(), self.sample_rate()) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(err = format!("{}", e), "Lyric transcription failed.");
                None
            }
        }
    }

    /// The most recent playback error, if one has been surfaced since the
    /// last call. Device failures mid-play pause the session and park the
    /// error here.
    pub fn take_error(&self) -> Option<EngineError> {
        self.last_error.lock().take()
    }

    /// Overrides the output device. Hosts that resolve devices themselves
    /// (or tests) inject one here instead of going through the configured
    /// device name.
    pub fn set_device(&mut self, device: Arc<dyn Device>) {
        self.device = Some(device);
    }

    fn start_stream(&mut self) -> Result<(), EngineError> {
        let snapshot = Arc::new(self.snapshot_now());
        if snapshot.duration() == 0 {
            warn!("Nothing to play; the session has no audible samples.");
            return Ok(());
        }

        if self.timeline.position() >= snapshot.duration() {
            self.timeline.set_position(0);
        }

        let device = self.device()?;
        let sample_rate = self.sample_rate();

        // Control messages queued while no engine was listening are stale;
        // the fresh snapshot below already reflects them.
        while self.receiver.try_recv().is_ok() {}

        info!(
            device = device.to_string(),
            sample_rate,
            position = self.timeline.position(),
            "Starting playback."
        );
        self.timeline.set_state(PlaybackState::Playing);
        if let Err(e) = self.transport.start(
            device,
            sample_rate,
            self.timeline.clone(),
            self.receiver.clone(),
            snapshot,
            self.last_error.clone(),
        ) {
            self.timeline.set_state(PlaybackState::Stopped);
            return Err(e);
        }
        Ok(())
    }

    fn device(&mut self) -> Result<Arc<dyn Device>, EngineError> {
        if let Some(device) = &self.device {
            return Ok(device.clone());
        }
        let device = audio::get_device(Some(self.device_name.as_str()))?;
        self.device = Some(device.clone());
        Ok(device)
    }

    fn track_mut(&mut self, id: TrackId) -> Result<&mut StemTrack, EngineError> {
        self.tracks
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| EngineError::InvalidState(format!("no track with id {}", id)))
    }

    fn snapshot_now(&self) -> MixSnapshot {
        MixSnapshot::new(self.tracks.iter().map(TrackMix::of).collect())
    }

    /// Hands the render engine a fresh snapshot if a stream is open.
    fn publish(&self) {
        if self.transport.is_active() {
            let _ = self
                .sender
                .send(EngineMessage::Mix(Arc::new(self.snapshot_now())));
        }
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, path::Path, sync::Arc};

    use hound::WavReader;
    use tempfile::{tempdir, TempDir};

    use crate::{
        audio::mock,
        config::Config,
        error::EngineError,
        lyrics::StubTranscriber,
        scan::StemRole,
        testutil::{eventually, write_wav},
        track::TrackId,
        transport::PlaybackState,
    };

    use super::MixSession;

    /// Long enough that the mock device takes a few hundred milliseconds to
    /// reach the end, leaving room for mid-play assertions.
    const LONG: usize = 480_000;

    fn session_with_stem(
        samples: &[f32],
        name: &str,
        rate: u32,
    ) -> Result<(TempDir, MixSession, mock::Device, TrackId), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join(name);
        write_wav(&path, samples, 1, rate)?;

        let mut session = MixSession::new(&Config::default());
        let id = session.add_track(&path, StemRole::Other)?;

        let device = mock::Device::get("mock-session");
        session.set_device(Arc::new(device.clone()));
        Ok((dir, session, device, id))
    }

    fn read_samples(path: &Path) -> Result<Vec<f32>, Box<dyn Error>> {
        let mut reader = WavReader::open(path)?;
        Ok(reader.samples::<f32>().collect::<Result<Vec<f32>, _>>()?)
    }

    #[test]
    fn walks_the_transport_state_machine() -> Result<(), Box<dyn Error>> {
        let (_dir, mut session, device, _) =
            session_with_stem(&vec![0.25; LONG], "other.wav", 8000)?;
        assert_eq!(PlaybackState::Stopped, session.state());

        session.play()?;
        assert_eq!(PlaybackState::Playing, session.state());
        session.play()?;
        assert_eq!(PlaybackState::Playing, session.state());

        session.pause();
        assert_eq!(PlaybackState::Paused, session.state());
        assert_eq!(1, device.open_streams());

        session.play()?;
        assert_eq!(PlaybackState::Playing, session.state());

        session.stop();
        assert_eq!(PlaybackState::Stopped, session.state());
        assert_eq!(0, session.playhead_position());
        assert_eq!(0, device.open_streams());

        // Stop and pause while stopped stay no-ops.
        session.stop();
        session.pause();
        assert_eq!(PlaybackState::Stopped, session.state());
        Ok(())
    }

    #[test]
    fn pausing_keeps_the_stream_open_and_silent() -> Result<(), Box<dyn Error>> {
        let (_dir, mut session, device, _) =
            session_with_stem(&vec![0.25; LONG], "other.wav", 8000)?;

        session.play()?;
        eventually(|| session.playhead_position() > 0, "playback never advanced");
        session.pause();

        // Let the in-flight frame land, then confirm the playhead holds
        // while the stream keeps pulling silence.
        let before = device.captured().len();
        eventually(
            || device.captured().len() > before + 1024,
            "paused stream stopped pulling",
        );
        let position = session.playhead_position();
        let settled = device.captured().len();
        eventually(
            || device.captured().len() > settled + 1024,
            "paused stream stopped pulling",
        );
        assert_eq!(position, session.playhead_position());

        let captured = device.captured();
        assert!(captured[captured.len() - 512..].iter().all(|s| *s == 0.0));

        session.stop();
        Ok(())
    }

    #[test]
    fn finishes_and_rests_at_the_end() -> Result<(), Box<dyn Error>> {
        let (_dir, mut session, _device, _) =
            session_with_stem(&vec![0.25; 2000], "other.wav", 8000)?;

        session.play()?;
        eventually(
            || session.state() == PlaybackState::Stopped,
            "playback never finished",
        );
        assert_eq!(2000, session.playhead_position());
        Ok(())
    }

    #[test]
    fn exported_mix_matches_what_playback_rendered() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        write_wav(&dir.path().join("vocals.wav"), &vec![0.5; 8000], 1, 1000)?;
        write_wav(&dir.path().join("drums.wav"), &vec![0.25; 8000], 1, 1000)?;

        let mut session = MixSession::load_folder(dir.path(), &Config::default())?;
        let vocals = session
            .tracks()
            .iter()
            .find(|t| t.role() == StemRole::Vocals)
            .map(|t| t.id())
            .ok_or("no vocals track")?;
        session.set_gain(vocals, 0.5)?;

        let exported = dir.path().join("mix.wav");
        session.export(&exported)?;
        let expected = read_samples(&exported)?;
        assert_eq!(8000, expected.len());
        assert!(expected.iter().all(|s| *s == 0.25_f32 + 0.25));

        let device = mock::Device::get("mock-parity");
        session.set_device(Arc::new(device.clone()));
        session.play()?;
        eventually(
            || session.state() == PlaybackState::Stopped,
            "playback never finished",
        );

        let captured = device.captured();
        assert!(captured.len() >= expected.len());
        assert_eq!(expected, captured[..expected.len()]);
        assert!(captured[expected.len()..].iter().all(|s| *s == 0.0));
        Ok(())
    }

    #[test]
    fn short_stems_fall_silent_and_seek_starts_mid_mix() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        write_wav(&dir.path().join("vocals.wav"), &vec![0.2; 5000], 1, 1000)?;
        write_wav(&dir.path().join("drums.wav"), &vec![0.3; 4000], 1, 1000)?;
        write_wav(&dir.path().join("bass.wav"), &vec![0.4; 5000], 1, 1000)?;

        let mut session = MixSession::load_folder(dir.path(), &Config::default())?;
        assert_eq!(5000, session.duration());
        assert_eq!(1000, session.sample_rate());

        let exported = dir.path().join("mix.wav");
        session.export(&exported)?;
        let expected = read_samples(&exported)?;
        let full = (0.3_f32 + 0.2) + 0.4;
        let tail = 0.2_f32 + 0.4;
        assert!(expected[..4000].iter().all(|s| *s == full));
        assert!(expected[4000..].iter().all(|s| *s == tail));

        // Seek while stopped lands directly, and playback picks up there.
        session.seek(4500);
        assert_eq!(4500, session.playhead_position());

        let device = mock::Device::get("mock-scenario");
        session.set_device(Arc::new(device.clone()));
        session.play()?;
        eventually(
            || session.state() == PlaybackState::Stopped,
            "playback never finished",
        );
        assert_eq!(5000, session.playhead_position());

        let captured = device.captured();
        assert!(captured.len() >= 500);
        assert_eq!(expected[4500..], captured[..500]);

        // An explicit stop after the natural end still rewinds.
        session.stop();
        assert_eq!(0, session.playhead_position());
        Ok(())
    }

    #[test]
    fn seeking_past_the_end_stops_and_clamps() -> Result<(), Box<dyn Error>> {
        let (_dir, mut session, device, _) =
            session_with_stem(&vec![0.25; LONG], "other.wav", 8000)?;

        // While stopped, the clamp applies immediately.
        session.seek(LONG + 99);
        assert_eq!(LONG, session.playhead_position());
        assert_eq!(PlaybackState::Stopped, session.state());

        // While playing, the engine applies it between frames.
        session.play()?;
        eventually(|| session.playhead_position() < LONG, "rewind never applied");
        session.seek(LONG + 99);
        eventually(
            || session.state() == PlaybackState::Stopped,
            "seek past the end never stopped playback",
        );
        assert_eq!(LONG, session.playhead_position());
        eventually(|| device.open_streams() == 0, "stream never released");
        Ok(())
    }

    #[test]
    fn playing_from_the_end_rewinds_to_the_start() -> Result<(), Box<dyn Error>> {
        let (_dir, mut session, _device, _) =
            session_with_stem(&vec![0.25; LONG], "other.wav", 8000)?;

        session.seek(LONG);
        assert_eq!(LONG, session.playhead_position());

        session.play()?;
        session.pause();
        assert_eq!(PlaybackState::Paused, session.state());
        assert!(session.playhead_position() < LONG);

        session.stop();
        Ok(())
    }

    #[test]
    fn seek_applies_while_paused() -> Result<(), Box<dyn Error>> {
        let (_dir, mut session, _device, _) =
            session_with_stem(&vec![0.25; LONG], "other.wav", 8000)?;

        session.play()?;
        session.pause();

        session.seek(100_000);
        eventually(
            || session.playhead_position() == 100_000,
            "seek never applied while paused",
        );
        assert_eq!(PlaybackState::Paused, session.state());

        session.stop();
        Ok(())
    }

    #[test]
    fn mix_changes_apply_mid_play() -> Result<(), Box<dyn Error>> {
        let (_dir, mut session, device, id) =
            session_with_stem(&vec![0.25; LONG], "other.wav", 8000)?;

        session.play()?;
        eventually(
            || device.captured().last() == Some(&0.25),
            "playback never rendered the stem",
        );

        session.set_gain(id, 0.0)?;
        eventually(
            || device.captured().last() == Some(&0.0),
            "gain change never reached the render engine",
        );

        session.set_gain(id, 2.0)?;
        eventually(
            || device.captured().last() == Some(&0.5),
            "second gain change never reached the render engine",
        );

        session.stop();
        Ok(())
    }

    #[test]
    fn repeated_play_stop_cycles_release_the_device() -> Result<(), Box<dyn Error>> {
        let (_dir, mut session, device, _) =
            session_with_stem(&vec![0.25; LONG], "other.wav", 8000)?;

        for _ in 0..3 {
            session.play()?;
            eventually(|| session.playhead_position() > 0, "playback never advanced");
            session.stop();
            assert_eq!(PlaybackState::Stopped, session.state());
            assert_eq!(0, session.playhead_position());
            assert_eq!(0, device.open_streams());
        }
        Ok(())
    }

    #[test]
    fn empty_session_stays_stopped() {
        let mut session = MixSession::new(&Config::default());
        let device = mock::Device::get("mock-empty");
        session.set_device(Arc::new(device.clone()));

        session.play().expect("play on empty session");
        assert_eq!(PlaybackState::Stopped, session.state());
        assert_eq!(0, device.open_streams());
    }

    #[test]
    fn rejects_invalid_gains_and_unknown_tracks() -> Result<(), Box<dyn Error>> {
        let (_dir, mut session, _device, id) =
            session_with_stem(&vec![0.25; 100], "other.wav", 8000)?;

        assert!(matches!(
            session.set_gain(id, -1.0),
            Err(EngineError::InvalidState(_))
        ));
        assert!(matches!(
            session.set_gain(id, f32::NAN),
            Err(EngineError::InvalidState(_))
        ));
        assert!(matches!(
            session.set_gain(TrackId::next(), 1.0),
            Err(EngineError::InvalidState(_))
        ));

        session.set_gain(id, 2.5)?;
        assert_eq!(2.5, session.tracks()[0].gain());
        Ok(())
    }

    #[test]
    fn unreadable_stems_load_disabled() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        write_wav(&dir.path().join("vocals.wav"), &vec![0.5; 1000], 1, 1000)?;
        std::fs::write(dir.path().join("drums.wav"), b"not really a wav")?;

        let session = MixSession::load_folder(dir.path(), &Config::default())?;
        assert_eq!(2, session.tracks().len());

        let drums = session
            .tracks()
            .iter()
            .find(|t| t.role() == StemRole::Drums)
            .ok_or("no drums track")?;
        assert!(!drums.enabled());
        assert_eq!(1000, session.duration());

        let exported = dir.path().join("mix.wav");
        session.export(&exported)?;
        let samples = read_samples(&exported)?;
        assert!(samples.iter().all(|s| *s == 0.5));
        Ok(())
    }

    #[test]
    fn refusal_to_open_the_device_fails_play() -> Result<(), Box<dyn Error>> {
        let (_dir, mut session, _device, _) =
            session_with_stem(&vec![0.25; 100], "other.wav", 8000)?;
        session.set_device(Arc::new(mock::Device::failing_open("mock-broken")));

        assert!(matches!(session.play(), Err(EngineError::Device(_))));
        assert_eq!(PlaybackState::Stopped, session.state());
        assert_eq!(0, session.playhead_position());
        Ok(())
    }

    #[test]
    fn repeated_device_failures_pause_and_surface() -> Result<(), Box<dyn Error>> {
        let (_dir, mut session, _ignored, _) =
            session_with_stem(&vec![0.25; LONG], "other.wav", 8000)?;
        let device = mock::Device::with_stream_failures("mock-dying", &[256, 256]);
        session.set_device(Arc::new(device.clone()));

        session.play()?;
        eventually(
            || session.state() == PlaybackState::Paused,
            "device failure never surfaced",
        );
        assert!(matches!(
            session.take_error(),
            Some(EngineError::Device(_))
        ));
        assert!(session.take_error().is_none());
        eventually(|| device.open_streams() == 0, "dead streams never released");

        // The failure queue is exhausted, so playback can resume cleanly.
        session.play()?;
        assert_eq!(PlaybackState::Playing, session.state());
        session.stop();
        Ok(())
    }

    #[test]
    fn transcribes_the_vocal_stem_only() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        write_wav(&dir.path().join("vocals.wav"), &vec![0.5; 200], 1, 1000)?;
        let session = MixSession::load_folder(dir.path(), &Config::default())?;

        let found = session.transcribe_vocals(&StubTranscriber {
            result: Ok("sing to me".to_string()),
        });
        assert_eq!(Some("sing to me".to_string()), found);

        let failed = session.transcribe_vocals(&StubTranscriber {
            result: Err("transcriber offline".to_string()),
        });
        assert_eq!(None, failed);

        let no_vocals = MixSession::new(&Config::default());
        let missing = no_vocals.transcribe_vocals(&StubTranscriber {
            result: Ok("unused".to_string()),
        });
        assert_eq!(None, missing);
        Ok(())
    }

    #[test]
    fn configured_rate_overrides_the_first_stem() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        write_wav(&dir.path().join("vocals.wav"), &vec![0.5; 1000], 1, 8000)?;
        fs_write_config(&dir, "sample_rate: 16000\n")?;

        let config = Config::load(&dir.path().join("stemmix.yaml"))?;
        let session = MixSession::load_folder(dir.path(), &config)?;
        assert_eq!(16000, session.sample_rate());

        // Resampling 8000 -> 16000 roughly doubles the stem length.
        let duration = session.duration();
        assert!((1900..=2100).contains(&duration), "duration {}", duration);
        Ok(())
    }

    fn fs_write_config(dir: &TempDir, contents: &str) -> Result<(), Box<dyn Error>> {
        std::fs::write(dir.path().join("stemmix.yaml"), contents)?;
        Ok(())
    }
}
