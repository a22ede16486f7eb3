// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Sender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, span, Level, Span};

use crate::audio::{self, decode_file, resample_to, Command, Transport};
use crate::catalog::Track;
use crate::notify;
use crate::session::Session;
use crate::store::{Origin, Store, StoreError};
use crate::util;

type PlayerError = Box<dyn Error + Send + Sync>;

/// How often the progress watcher samples the transport. Matches a display
/// refresh, so a UI reading `progress` never sees a stale loop position.
const PROGRESS_POLL: Duration = Duration::from_millis(16);

/// State for the track currently loaded into the audio device.
struct Active {
    session: Session,
    transport: Arc<Transport>,
    commands: Sender<Command>,
    join: JoinHandle<()>,
}

impl Active {
    /// Pushes the session's derived rate and total shift into the render
    /// engine. Sent together since a tempo change moves both.
    fn push_params(&self) -> Result<(), PlayerError> {
        self.commands
            .send(Command::SetRate(self.session.playback_rate()))?;
        self.commands
            .send(Command::SetShift(self.session.pitch_shift()))?;
        Ok(())
    }
}

/// A point-in-time snapshot of playback for display.
pub struct Status {
    pub track: String,
    pub bpm: f64,
    pub pitch: String,
    pub playing: bool,
    pub progress: f64,
    pub position: String,
    pub duration: String,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {:.0} BPM | {} | {} / {} ({:.0}%) [{}]",
            self.track,
            self.bpm,
            self.pitch,
            self.position,
            self.duration,
            self.progress,
            if self.playing { "playing" } else { "paused" },
        )
    }
}

/// Plays lehra tracks in a loop with independent tempo and pitch control.
pub struct Player {
    /// The audio device to play tracks through.
    device: Arc<dyn audio::Device>,
    /// Resolves catalog audio, locally or over the network.
    store: Arc<Store>,
    /// The currently loaded track, if any.
    active: Arc<Mutex<Option<Active>>>,
    /// Loop progress in percent as sampled by the watcher, stored as f64
    /// bits.
    progress: Arc<AtomicU64>,
    /// Bumped on every play so a superseded watcher stops publishing.
    watch_generation: Arc<AtomicU64>,
    /// The logging span.
    span: Span,
}

impl Player {
    pub fn new(device: Arc<dyn audio::Device>, store: Arc<Store>) -> Player {
        Player {
            device,
            store,
            active: Arc::new(Mutex::new(None)),
            progress: Arc::new(AtomicU64::new(0.0_f64.to_bits())),
            watch_generation: Arc::new(AtomicU64::new(0)),
            span: span!(Level::INFO, "player"),
        }
    }

    /// Loads and plays a track in a loop, replacing whatever was playing.
    /// The initial tempo defaults to the track's recorded BPM.
    pub async fn play(
        &self,
        track: Arc<Track>,
        bpm: Option<f64>,
        transpose: i32,
    ) -> Result<(), PlayerError> {
        self.stop().await?;

        let path = {
            let store = self.store.clone();
            let track = track.clone();
            let resolved: Result<_, StoreError> =
                tokio::task::spawn_blocking(move || store.audio_path(&track)).await?;
            match resolved {
                Ok((path, origin)) => {
                    if origin == Origin::Network {
                        notify::notice("Lehra saved for offline use.");
                    }
                    path
                }
                Err(e) => {
                    notify::error_notice("Failed to load audio.");
                    return Err(e.into());
                }
            }
        };

        let device_rate = self.device.sample_rate()?;
        let buffer = {
            let loaded = tokio::task::spawn_blocking(move || {
                decode_file(&path).and_then(|buffer| resample_to(buffer, device_rate))
            })
            .await?;
            match loaded {
                Ok(buffer) => Arc::new(buffer),
                Err(e) => {
                    notify::error_notice("Failed to load audio.");
                    return Err(e.into());
                }
            }
        };

        let mut session = Session::new(track.clone());
        if let Some(bpm) = bpm {
            session.set_bpm(bpm);
        }
        session.set_semitone_offset(transpose);

        let transport = Arc::new(Transport::new(buffer.frames(), device_rate));
        let (commands, command_rx) = unbounded();

        self.span.in_scope(|| {
            info!(
                track = %track,
                bpm = session.bpm(),
                pitch = session.pitch_name(),
                rate = session.playback_rate(),
                "Playing lehra."
            )
        });

        let join = {
            let device = self.device.clone();
            let buffer = buffer.clone();
            let transport = transport.clone();
            tokio::task::spawn_blocking(move || {
                if let Err(e) = device.play(buffer, transport, command_rx) {
                    error!(err = e.to_string(), "Audio device failed.");
                    notify::error_notice("Playback failed.");
                }
            })
        };

        // Sample the transport at display rate until playback stops. The
        // generation stamp keeps a superseded watcher from writing over its
        // replacement once the track changes.
        {
            let generation = self.watch_generation.fetch_add(1, Ordering::Relaxed) + 1;
            let watch_generation = self.watch_generation.clone();
            let transport = transport.clone();
            let progress = self.progress.clone();
            tokio::spawn(async move {
                while !transport.is_stopped() {
                    if watch_generation.load(Ordering::Relaxed) != generation {
                        return;
                    }
                    progress.store(transport.progress().to_bits(), Ordering::Relaxed);
                    tokio::time::sleep(PROGRESS_POLL).await;
                }
                if watch_generation.load(Ordering::Relaxed) == generation {
                    progress.store(0.0_f64.to_bits(), Ordering::Relaxed);
                }
            });
        }

        let active = Active {
            session,
            transport,
            commands,
            join,
        };
        active.push_params()?;
        *self.active.lock().await = Some(active);

        Ok(())
    }

    /// Stops playback and waits for the device to let go of the track.
    pub async fn stop(&self) -> Result<(), PlayerError> {
        let mut active = self.active.lock().await;
        if let Some(active) = active.take() {
            active.transport.stop();
            active.join.await?;
            self.span.in_scope(|| info!("Playback stopped."));
        }
        Ok(())
    }

    /// Toggles between paused and playing. Returns the new playing state,
    /// or None when nothing is loaded.
    pub async fn toggle(&self) -> Option<bool> {
        let active = self.active.lock().await;
        let active = active.as_ref()?;
        let playing = active.transport.toggle();
        self.span.in_scope(|| info!(playing, "Toggled playback."));
        Some(playing)
    }

    /// Jumps to a position in the loop, given as progress in percent.
    pub async fn seek(&self, pct: f64) -> Result<(), PlayerError> {
        let active = self.active.lock().await;
        if let Some(active) = active.as_ref() {
            active.commands.send(Command::Seek(pct.clamp(0.0, 100.0)))?;
        }
        Ok(())
    }

    /// Sets the playback tempo in BPM.
    pub async fn set_bpm(&self, bpm: f64) -> Result<(), PlayerError> {
        self.with_session(|session| session.set_bpm(bpm)).await
    }

    /// Nudges the playback tempo by the given amount.
    pub async fn adjust_bpm(&self, delta: f64) -> Result<(), PlayerError> {
        self.with_session(|session| session.adjust_bpm(delta)).await
    }

    /// Sets the transposition in semitones from the track's recorded scale.
    pub async fn set_transpose(&self, semitones: i32) -> Result<(), PlayerError> {
        self.with_session(|session| session.set_semitone_offset(semitones))
            .await
    }

    /// Nudges the transposition by the given number of semitones.
    pub async fn adjust_transpose(&self, delta: i32) -> Result<(), PlayerError> {
        self.with_session(|session| session.adjust_pitch(delta))
            .await
    }

    /// Applies a session change and pushes the resulting parameters to the
    /// render engine.
    async fn with_session<F>(&self, apply: F) -> Result<(), PlayerError>
    where
        F: FnOnce(&mut Session),
    {
        let mut active = self.active.lock().await;
        if let Some(active) = active.as_mut() {
            apply(&mut active.session);
            active.push_params()?;
            self.span.in_scope(|| {
                info!(
                    bpm = active.session.bpm(),
                    transpose = active.session.semitone_offset(),
                    pitch = active.session.pitch_name(),
                    "Updated playback parameters."
                )
            });
        }
        Ok(())
    }

    /// The loop progress in percent as of the last watcher sample.
    pub fn progress(&self) -> f64 {
        f64::from_bits(self.progress.load(Ordering::Relaxed))
    }

    /// A snapshot of the current playback state, if a track is loaded.
    pub async fn status(&self) -> Option<Status> {
        let active = self.active.lock().await;
        let active = active.as_ref()?;
        Some(Status {
            track: active.session.track.to_string(),
            bpm: active.session.bpm(),
            pitch: active.session.pitch_name(),
            playing: active.transport.is_playing(),
            progress: active.transport.progress(),
            position: util::format_time(active.transport.position_seconds()),
            duration: util::format_time(active.transport.duration_seconds()),
        })
    }
}
