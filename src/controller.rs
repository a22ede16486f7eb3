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
use std::io;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info, span, Level};

use crate::catalog::Catalog;
use crate::notify;
use crate::player::Player;

pub mod keyboard;

/// Controller events that will trigger behavior in the player.
#[derive(Debug, PartialEq)]
pub enum Event {
    /// Loads and plays the catalog track with the given id.
    Track(u32),

    /// Toggles between paused and playing.
    Toggle,

    /// Stops the currently playing track. If nothing is playing, does
    /// nothing.
    Stop,

    /// Sets the tempo in BPM.
    SetBpm(f64),

    /// Nudges the tempo by the given amount.
    AdjustBpm(f64),

    /// Sets the transposition in semitones.
    SetPitch(i32),

    /// Nudges the transposition by the given number of semitones.
    AdjustPitch(i32),

    /// Jumps to a loop position, in percent.
    Seek(f64),

    /// Prints the current playback status.
    Status,

    /// Stops playback and shuts the controller down.
    Quit,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Drives a player from controller events.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(
        player: Player,
        catalog: Arc<Catalog>,
        driver: Arc<dyn Driver>,
    ) -> Result<Controller, Box<dyn Error>> {
        Ok(Controller {
            handle: tokio::spawn(async move {
                Controller::trigger_events(player, catalog, driver).await
            }),
        })
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Triggers player events by watching the driver and getting events
    /// from it.
    async fn trigger_events(player: Player, catalog: Arc<Catalog>, driver: Arc<dyn Driver>) {
        let span = span!(Level::INFO, "controller");

        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);

        span.in_scope(|| info!(tracks = catalog.len(), "Controller started."));

        loop {
            if let Some(event) = events_rx.recv().await {
                span.in_scope(|| info!(event = format!("{:?}", event), "Received event."));

                if let Err(e) = Controller::apply(&player, &catalog, &event).await {
                    error!("Error talking to player: {}", e);
                }
                if event == Event::Quit {
                    join_handle.abort();
                    return;
                }
            } else {
                span.in_scope(|| info!("Controller closing."));
                if let Err(e) = player.stop().await {
                    error!("Error stopping player: {}", e);
                }
                if let Err(e) = join_handle.await {
                    error!("Error waiting for event monitor to stop: {}", e);
                }
                return;
            }
        }
    }

    async fn apply(
        player: &Player,
        catalog: &Catalog,
        event: &Event,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        match event {
            Event::Track(id) => match catalog.get(*id) {
                Some(track) => player.play(track, None, 0).await,
                None => {
                    notify::error_notice(&format!("No track with id {}.", id));
                    Ok(())
                }
            },
            Event::Toggle => {
                if player.toggle().await.is_none() {
                    notify::notice("Nothing is playing.");
                }
                Ok(())
            }
            Event::Stop => player.stop().await,
            Event::SetBpm(bpm) => player.set_bpm(*bpm).await,
            Event::AdjustBpm(delta) => player.adjust_bpm(*delta).await,
            Event::SetPitch(semitones) => player.set_transpose(*semitones).await,
            Event::AdjustPitch(delta) => player.adjust_transpose(*delta).await,
            Event::Seek(pct) => player.seek(*pct).await,
            Event::Status => {
                match player.status().await {
                    Some(status) => notify::notice(&status.to_string()),
                    None => notify::notice("Nothing is playing."),
                }
                Ok(())
            }
            Event::Quit => player.stop().await,
        }
    }
}
