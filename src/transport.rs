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
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::{
    audio::{Device, ErrorFn, OutputStream, RenderFn},
    error::EngineError,
    mixer::{self, MixSnapshot},
    playsync::CancelHandle,
};

/// The number of samples over which a seek splice is crossfaded.
pub(crate) const DECLICK_SAMPLES: usize = 64;

/// The largest render callback the engine preallocates scratch for. Larger
/// callbacks still render, the splice crossfade just spans more of them.
pub(crate) const MAX_FRAME_SIZE: usize = 8192;

/// The transport state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    fn as_u8(self) -> u8 {
        match self {
            PlaybackState::Stopped => 0,
            PlaybackState::Playing => 1,
            PlaybackState::Paused => 2,
        }
    }

    fn from_u8(value: u8) -> PlaybackState {
        match value {
            1 => PlaybackState::Playing,
            2 => PlaybackState::Paused,
            _ => PlaybackState::Stopped,
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// The playhead position and transport state, shared between the control
/// surface and the render thread. Reads and writes are individually atomic;
/// readers may see a position one frame stale, never torn.
pub struct Timeline {
    position: AtomicU64,
    state: AtomicU8,
}

impl Timeline {
    pub(crate) fn new() -> Timeline {
        Timeline {
            position: AtomicU64::new(0),
            state: AtomicU8::new(PlaybackState::Stopped.as_u8()),
        }
    }

    /// The playhead position in samples at the canonical rate.
    pub fn position(&self) -> usize {
        self.position.load(Ordering::Relaxed) as usize
    }

    pub(crate) fn set_position(&self, position: usize) {
        self.position.store(position as u64, Ordering::Relaxed);
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState::from_u8(self.state.load(Ordering::Relaxed))
    }

    pub(crate) fn set_state(&self, state: PlaybackState) {
        self.state.store(state.as_u8(), Ordering::Relaxed);
    }
}

/// Control messages handed to the render engine. Applied between frames, so
/// a single frame never mixes two mix configurations.
pub(crate) enum EngineMessage {
    /// Replace the mix snapshot.
    Mix(Arc<MixSnapshot>),
    /// Move the playhead to the given sample position.
    Seek(usize),
}

/// An in-progress seek splice. The pre-seek trajectory keeps advancing from
/// `from` while the crossfade runs.
struct Declick {
    from: usize,
    done: usize,
}

/// The render engine. Owns the active mix snapshot and produces mono frames
/// for whatever output is pulling on it.
pub(crate) struct Engine {
    timeline: Arc<Timeline>,
    messages: Receiver<EngineMessage>,
    snapshot: Arc<MixSnapshot>,
    declick: Option<Declick>,
    scratch: Vec<f32>,
    finished: Arc<AtomicBool>,
    waker: CancelHandle,
}

impl Engine {
    pub(crate) fn new(
        timeline: Arc<Timeline>,
        messages: Receiver<EngineMessage>,
        snapshot: Arc<MixSnapshot>,
        finished: Arc<AtomicBool>,
        waker: CancelHandle,
    ) -> Engine {
        Engine {
            timeline,
            messages,
            snapshot,
            declick: None,
            scratch: vec![0.0; MAX_FRAME_SIZE],
            finished,
            waker,
        }
    }

    /// Renders one frame into `out`. Pending control messages are drained
    /// first, then the frame is mixed from the current snapshot. Outside of
    /// the playing state the frame is silence and the playhead holds.
    pub(crate) fn render(&mut self, out: &mut [f32]) {
        while let Ok(message) = self.messages.try_recv() {
            match message {
                EngineMessage::Mix(snapshot) => self.snapshot = snapshot,
                EngineMessage::Seek(target) => self.seek(target),
            }
        }

        if self.timeline.state() != PlaybackState::Playing {
            out.fill(0.0);
            return;
        }

        let position = self.timeline.position();
        let duration = self.snapshot.duration();
        if position >= duration {
            // A mix update can shrink the session underneath the playhead;
            // pull it back to the new end before stopping.
            self.timeline.set_position(duration);
            out.fill(0.0);
            self.finish();
            return;
        }

        let frames = out.len().min(duration - position);
        mixer::render_block(&self.snapshot, position, &mut out[..frames]);
        out[frames..].fill(0.0);
        self.blend_splice(&mut out[..frames]);

        self.timeline.set_position(position + frames);
        if position + frames >= duration {
            self.finish();
        }
    }

    /// Moves the playhead, clamping to the session duration. Seeking past
    /// the end stops playback with the playhead resting at the duration.
    fn seek(&mut self, target: usize) {
        let duration = self.snapshot.duration();
        let clamped = target.min(duration);
        let current = self.timeline.position();
        if clamped == current {
            return;
        }

        if clamped >= duration {
            self.declick = None;
            self.timeline.set_position(clamped);
            self.finish();
            return;
        }

        if self.timeline.state() == PlaybackState::Playing {
            self.declick = Some(Declick {
                from: current,
                done: 0,
            });
        }
        self.timeline.set_position(clamped);
    }

    /// Crossfades the head of a freshly sought frame against the trajectory
    /// the playhead was on before the seek.
    fn blend_splice(&mut self, out: &mut [f32]) {
        let Some(mut declick) = self.declick.take() else {
            return;
        };

        let frames = out.len().min(self.scratch.len());
        mixer::render_block(
            &self.snapshot,
            declick.from + declick.done,
            &mut self.scratch[..frames],
        );

        let blend = (DECLICK_SAMPLES - declick.done).min(frames);
        for i in 0..blend {
            let t = (declick.done + i + 1) as f32 / DECLICK_SAMPLES as f32;
            out[i] = out[i] * t + self.scratch[i] * (1.0 - t);
        }
        declick.done += blend;

        if declick.done < DECLICK_SAMPLES {
            self.declick = Some(declick);
        }
    }

    fn finish(&mut self) {
        self.declick = None;
        self.timeline.set_state(PlaybackState::Stopped);
        self.finished.store(true, Ordering::Relaxed);
        self.waker.notify();
    }
}

/// Owns the thread that holds the output stream open. The stream handle
/// never leaves that thread; starting and stopping the transport are the
/// only ways a stream is created or released.
pub(crate) struct Transport {
    handles: Option<Handles>,
}

struct Handles {
    join: JoinHandle<()>,
    cancel: CancelHandle,
}

impl Transport {
    pub(crate) fn new() -> Transport {
        Transport { handles: None }
    }

    /// Whether the stream thread is still running. The thread exits on
    /// stop, on natural end of playback, and on unrecovered device failure.
    pub(crate) fn is_active(&self) -> bool {
        self.handles
            .as_ref()
            .is_some_and(|handles| !handles.join.is_finished())
    }

    /// Opens an output stream on a fresh thread and waits for the open
    /// result. On success the stream stays open until the transport is
    /// stopped or the engine reports the end of playback.
    pub(crate) fn start(
        &mut self,
        device: Arc<dyn Device>,
        sample_rate: u32,
        timeline: Arc<Timeline>,
        messages: Receiver<EngineMessage>,
        snapshot: Arc<MixSnapshot>,
        last_error: Arc<Mutex<Option<EngineError>>>,
    ) -> Result<(), EngineError> {
        self.stop();

        let cancel = CancelHandle::new();
        let finished = Arc::new(AtomicBool::new(false));
        let engine = Engine::new(
            timeline.clone(),
            messages,
            snapshot,
            finished.clone(),
            cancel.clone(),
        );
        let (open_tx, open_rx) = bounded::<Result<(), EngineError>>(1);

        let join = {
            let cancel = cancel.clone();
            thread::spawn(move || {
                run_stream(
                    device, sample_rate, engine, timeline, cancel, finished, last_error, open_tx,
                )
            })
        };

        match open_rx.recv() {
            Ok(Ok(())) => {
                self.handles = Some(Handles { join, cancel });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            Err(_) => {
                let _ = join.join();
                Err(EngineError::Device(
                    "output thread exited before opening the stream".to_string(),
                ))
            }
        }
    }

    /// Releases the output stream and joins the stream thread. Idempotent.
    pub(crate) fn stop(&mut self) {
        let Some(handles) = self.handles.take() else {
            return;
        };
        handles.cancel.cancel();
        if handles.join.join().is_err() {
            error!("Output stream thread panicked.");
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the stream thread. Opens the stream, reports the result, then
/// parks until cancellation, natural end, or a device failure. One reopen
/// is attempted after a failure; a second failure pauses the session and
/// records the error for the control surface to pick up.
#[allow(clippy::too_many_arguments)]
fn run_stream(
    device: Arc<dyn Device>,
    sample_rate: u32,
    engine: Engine,
    timeline: Arc<Timeline>,
    cancel: CancelHandle,
    finished: Arc<AtomicBool>,
    last_error: Arc<Mutex<Option<EngineError>>>,
    open_result: Sender<Result<(), EngineError>>,
) {
    let engine = Arc::new(Mutex::new(engine));
    let failed = Arc::new(AtomicBool::new(false));

    let open = || -> Result<Box<dyn OutputStream>, EngineError> {
        let render: RenderFn = {
            let engine = engine.clone();
            Box::new(move |data: &mut [f32]| engine.lock().render(data))
        };
        let on_error: ErrorFn = {
            let failed = failed.clone();
            let cancel = cancel.clone();
            Box::new(move |message| {
                warn!(err = message, "Output stream reported an error.");
                failed.store(true, Ordering::Relaxed);
                cancel.notify();
            })
        };
        device.open_output(sample_rate, render, on_error)
    };

    let mut stream = match open() {
        Ok(stream) => {
            if open_result.send(Ok(())).is_err() {
                return;
            }
            stream
        }
        Err(e) => {
            let _ = open_result.send(Err(e));
            return;
        }
    };

    let mut reopened = false;
    loop {
        cancel.wait_until(|| {
            finished.load(Ordering::Relaxed) || failed.load(Ordering::Relaxed)
        });

        if cancel.is_cancelled() || finished.load(Ordering::Relaxed) {
            break;
        }

        if failed.swap(false, Ordering::Relaxed) {
            drop(stream);
            if reopened {
                surface_device_failure(
                    &timeline,
                    &last_error,
                    EngineError::Device("output stream failed after reopening".to_string()),
                );
                return;
            }

            info!("Reopening output stream after device failure.");
            match open() {
                Ok(new_stream) => {
                    stream = new_stream;
                    reopened = true;
                }
                Err(e) => {
                    surface_device_failure(&timeline, &last_error, e);
                    return;
                }
            }
        }
    }

    drop(stream);
}

/// Pauses the session in place of the dead stream and records the error.
fn surface_device_failure(
    timeline: &Timeline,
    last_error: &Mutex<Option<EngineError>>,
    error: EngineError,
) {
    error!(
        err = format!("{}", error),
        "Output device failed; pausing playback."
    );
    timeline.set_state(PlaybackState::Paused);
    *last_error.lock() = Some(error);
}
