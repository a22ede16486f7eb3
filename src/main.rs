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
mod audio;
mod catalog;
mod config;
mod controller;
mod notify;
mod player;
mod session;
mod store;
#[cfg(test)]
mod testutil;
mod util;

use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use controller::keyboard;
use player::Player;
use store::Store;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A lehra player with independent tempo and pitch control."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the tracks in a catalog, with optional filtering.
    Tracks {
        /// The catalog base: an HTTP URL or a local directory.
        catalog: String,
        /// Filter by taal. Defaults to the catalog's first taal.
        #[arg(short, long)]
        taal: Option<String>,
        /// Filter by instrument.
        #[arg(short, long)]
        instrument: Option<String>,
        /// Re-fetch the catalog instead of using a cached copy.
        #[arg(short, long)]
        refresh: bool,
        /// The offline cache directory.
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Plays a catalog track in a loop.
    Play {
        /// The catalog base: an HTTP URL or a local directory.
        catalog: String,
        /// The id of the track to play.
        id: u32,
        /// The starting tempo. Defaults to the track's recorded BPM.
        #[arg(short, long)]
        bpm: Option<f64>,
        /// Transposition in semitones from the track's recorded scale.
        #[arg(short = 'p', long, default_value_t = 0)]
        transpose: i32,
        /// The device name to play through. Defaults to the system output.
        #[arg(short, long)]
        device: Option<String>,
        /// The offline cache directory.
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Downloads every catalog track into the offline cache.
    Prefetch {
        /// The catalog base: an HTTP URL or a local directory.
        catalog: String,
        /// The offline cache directory.
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Starts the player from a config file.
    Start {
        /// The path to the player config.
        player_path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tracks {
            catalog,
            taal,
            instrument,
            refresh,
            cache_dir,
        } => {
            let store = new_store(&catalog, cache_dir, None);
            let catalog = load_catalog(store, refresh).await?;

            if catalog.is_empty() {
                println!("No tracks found.");
                return Ok(());
            }

            let facets = catalog.facets();
            let default = catalog
                .default_filter()
                .ok_or("catalog has no tracks to derive a filter from")?;
            let filter = catalog::Filter {
                taal: taal.unwrap_or(default.taal),
                instrument: instrument.unwrap_or(default.instrument),
            };

            let tracks = catalog.filtered(&filter);
            println!("Tracks (count: {}):", tracks.len());
            for track in tracks {
                println!("- {}", track);
            }

            println!("\nTaals: {}", facets.taals.join(", "));
            println!("Instruments: {}", facets.instruments.join(", "));
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
            catalog,
            id,
            bpm,
            transpose,
            device,
            cache_dir,
        } => {
            let store = new_store(&catalog, cache_dir, None);
            let catalog = load_catalog(store.clone(), false).await?;
            let track = catalog
                .get(id)
                .ok_or_else(|| format!("no track with id {}", id))?;

            let device = audio::get_device(device.as_deref())?;
            let player = Player::new(device, store);
            player
                .play(track, bpm, transpose)
                .await
                .map_err(|e| e.to_string())?;

            run_controller(player, catalog).await?;
        }
        Commands::Prefetch { catalog, cache_dir } => {
            let store = new_store(&catalog, cache_dir, None);
            let catalog = load_catalog(store.clone(), true).await?;

            let (downloaded, cached, failed) =
                tokio::task::spawn_blocking(move || store.prefetch(&catalog)).await?;
            println!(
                "Prefetch complete: {} downloaded, {} already cached, {} failed.",
                downloaded, cached, failed
            );
            if failed > 0 {
                return Err("some tracks could not be fetched".into());
            }
        }
        Commands::Start { player_path } => {
            let config = config::parse_player(&PathBuf::from(&player_path))?;
            let store = new_store(&config.catalog, config.cache_dir, config.cache_version);
            let catalog = load_catalog(store.clone(), false).await?;

            let device = audio::get_device(config.device.as_deref())?;
            let player = Player::new(device, store);

            run_controller(player, catalog).await?;
        }
    }

    Ok(())
}

/// Builds a store, defaulting the cache location and version.
fn new_store(catalog: &str, cache_dir: Option<PathBuf>, version: Option<String>) -> Arc<Store> {
    let cache_dir = cache_dir.unwrap_or_else(default_cache_dir);
    let version = version.unwrap_or_else(|| crate_version!().to_string());
    Arc::new(Store::new(catalog, cache_dir, &version))
}

/// Loads the catalog off the async runtime.
async fn load_catalog(
    store: Arc<Store>,
    refresh: bool,
) -> Result<Arc<catalog::Catalog>, Box<dyn Error>> {
    let catalog = tokio::task::spawn_blocking(move || store.load_catalog(refresh)).await??;
    Ok(Arc::new(catalog))
}

/// Runs the keyboard controller until the user quits.
async fn run_controller(
    player: Player,
    catalog: Arc<catalog::Catalog>,
) -> Result<(), Box<dyn Error>> {
    let driver = Arc::new(keyboard::Driver::new());
    let mut controller = controller::Controller::new(player, catalog, driver)?;
    controller.join().await?;
    Ok(())
}

fn default_cache_dir() -> PathBuf {
    if let Some(dir) = env::var_os("XDG_CACHE_HOME") {
        return PathBuf::from(dir).join("lehra");
    }
    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".cache").join("lehra");
    }
    env::temp_dir().join("lehra")
}
