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
use std::path::PathBuf;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};

use stemmix::config::Config;
use stemmix::scan::StemRole;
use stemmix::session::MixSession;
use stemmix::track::TrackId;
use stemmix::transport::PlaybackState;
use stemmix::waveform::WaveformPoint;
use stemmix::{audio, decode, util, waveform};

#[derive(Parser)]
#[clap(
    author = "the stemmix authors",
    version = crate_version!(),
    about = "A synchronized stem player, mixer, and exporter."
)]
struct Cli {
    /// The path to a YAML engine configuration.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scans a folder and lists the stems detected in it.
    Stems {
        /// The path to the stem folder.
        path: PathBuf,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Plays a stem folder through the output device.
    Play {
        /// The path to the stem folder.
        path: PathBuf,
        /// Per-track gains. Should be in the form <ROLE>=<GAIN>,...
        /// For example, vocals=0.5,drums=2.
        #[arg(short, long)]
        gain: Option<String>,
        /// Roles to mute, comma separated.
        #[arg(short, long)]
        mute: Option<String>,
        /// Roles to solo, comma separated.
        #[arg(short, long)]
        solo: Option<String>,
        /// Start playback this many seconds into the session.
        #[arg(long)]
        seek: Option<f64>,
    },
    /// Renders the mix of a stem folder to a WAV file.
    Export {
        /// The path to the stem folder.
        path: PathBuf,
        /// The path to write the mix to.
        output: PathBuf,
        /// Per-track gains. Should be in the form <ROLE>=<GAIN>,...
        #[arg(short, long)]
        gain: Option<String>,
        /// Roles to mute, comma separated.
        #[arg(short, long)]
        mute: Option<String>,
        /// Roles to solo, comma separated.
        #[arg(short, long)]
        solo: Option<String>,
    },
    /// Prints a peak/RMS envelope of a single audio file.
    Waveform {
        /// The path to the audio file.
        path: PathBuf,
        /// The number of buckets to summarize the file into.
        #[arg(short, long, default_value_t = 64)]
        buckets: usize,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Stems { path } => {
            let session = MixSession::load_folder(&path, &config)?;
            if session.tracks().is_empty() {
                println!("No stems found in {}.", path.display());
                return Ok(());
            }

            println!("Stems (count: {}):", session.tracks().len());
            for track in session.tracks() {
                println!("- {}", track);
            }
            println!(
                "\nSession duration: {}",
                util::duration_minutes_seconds(util::samples_to_duration(
                    session.duration(),
                    session.sample_rate()
                ))
            );
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;
            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Play {
            path,
            gain,
            mute,
            solo,
            seek,
        } => {
            let mut session = MixSession::load_folder(&path, &config)?;
            apply_mix_flags(&mut session, gain, mute, solo)?;
            if let Some(seconds) = seek {
                session.seek(util::seconds_to_samples(seconds, session.sample_rate()));
            }

            session.play()?;
            while session.state() != PlaybackState::Stopped {
                if let Some(e) = session.take_error() {
                    return Err(e.into());
                }
                thread::sleep(Duration::from_millis(50));
            }
        }
        Commands::Export {
            path,
            output,
            gain,
            mute,
            solo,
        } => {
            let mut session = MixSession::load_folder(&path, &config)?;
            apply_mix_flags(&mut session, gain, mute, solo)?;
            session.export(&output)?;
            println!("Exported mix to {}.", output.display());
        }
        Commands::Waveform { path, buckets } => {
            let buffer = decode::load_stem(&path, config.sample_rate())?;
            let points = waveform::summarize(buffer.samples(), buckets);
            println!("{}:", path.display());
            println!("{}", render_envelope(&points));
        }
    }

    Ok(())
}

/// Applies the --gain/--mute/--solo flags to the loaded session, resolving
/// roles to tracks.
fn apply_mix_flags(
    session: &mut MixSession,
    gain: Option<String>,
    mute: Option<String>,
    solo: Option<String>,
) -> Result<(), Box<dyn Error>> {
    if let Some(gain) = gain {
        for mapping in gain.split(',') {
            let role_and_gain: Vec<&str> = mapping.split('=').collect();
            if role_and_gain.len() != 2 {
                return Err("malformed role to gain mapping".into());
            }
            let role = StemRole::from_str(role_and_gain[0])?;
            let value = role_and_gain[1].parse::<f32>()?;
            let id = track_with_role(session, role)?;
            session.set_gain(id, value)?;
        }
    }

    if let Some(mute) = mute {
        for role in mute.split(',') {
            let role = StemRole::from_str(role)?;
            let id = track_with_role(session, role)?;
            session.set_mute(id, true)?;
        }
    }

    if let Some(solo) = solo {
        for role in solo.split(',') {
            let role = StemRole::from_str(role)?;
            let id = track_with_role(session, role)?;
            session.set_solo(id, true)?;
        }
    }

    Ok(())
}

fn track_with_role(session: &MixSession, role: StemRole) -> Result<TrackId, Box<dyn Error>> {
    session
        .tracks()
        .iter()
        .find(|t| t.role() == role)
        .map(|t| t.id())
        .ok_or_else(|| format!("no {} track in this session", role).into())
}

const ENVELOPE_GLYPHS: [char; 9] = [' ', '.', ':', '-', '=', '+', '*', '#', '@'];

fn envelope_glyph(value: f32) -> char {
    let clamped = value.clamp(0.0, 1.0);
    let index = (clamped * (ENVELOPE_GLYPHS.len() - 1) as f32).round() as usize;
    ENVELOPE_GLYPHS[index]
}

fn render_envelope(points: &[WaveformPoint]) -> String {
    let peaks: String = points.iter().map(|p| envelope_glyph(p.peak)).collect();
    let rms: String = points.iter().map(|p| envelope_glyph(p.rms)).collect();
    format!("peak |{}|\n rms |{}|", peaks, rms)
}
