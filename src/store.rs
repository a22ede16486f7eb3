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
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::catalog::{Catalog, Track};

/// The catalog document name, under the catalog base.
const CATALOG_FILE: &str = "tracks.json";

/// The directory holding audio files, under the catalog base.
const AUDIO_DIR: &str = "audio";

/// Errors from fetching or caching catalog data.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("audio file {0} not found")]
    AudioNotFound(String),
}

/// Where a track's audio ended up coming from. Lets the player surface
/// "saved for offline use" exactly once, on the download.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Read from the offline cache.
    Cache,
    /// Fetched over the network (and now cached).
    Network,
    /// Read straight from a local catalog directory.
    Local,
}

/// Where the catalog lives.
enum Source {
    /// A remote catalog served over HTTP.
    Remote(String),
    /// A catalog directory on disk. No caching involved.
    Local(PathBuf),
}

/// Fetches the track catalog and audio files, keeping offline copies.
///
/// The audio cache directory is versioned (`audio-v<version>`) so a release
/// that re-renders the tracks starts from an empty cache instead of serving
/// stale audio.
pub struct Store {
    source: Source,
    cache_dir: PathBuf,
    cache_version: String,
}

impl Store {
    /// Creates a store for the given catalog base. A base starting with
    /// `http://` or `https://` is remote; anything else is a local
    /// directory.
    pub fn new(base: &str, cache_dir: impl Into<PathBuf>, cache_version: &str) -> Store {
        let source = if base.starts_with("http://") || base.starts_with("https://") {
            Source::Remote(base.trim_end_matches('/').to_string())
        } else {
            Source::Local(PathBuf::from(base))
        };
        Store {
            source,
            cache_dir: cache_dir.into(),
            cache_version: cache_version.to_string(),
        }
    }

    /// The on-disk location of the cached catalog document.
    fn catalog_cache_path(&self) -> PathBuf {
        self.cache_dir.join(CATALOG_FILE)
    }

    /// The versioned audio cache directory.
    fn audio_cache_dir(&self) -> PathBuf {
        self.cache_dir.join(format!("audio-v{}", self.cache_version))
    }

    /// Loads the track catalog.
    ///
    /// For a remote source the cached copy is preferred, so a previously
    /// fetched catalog keeps working across sessions without a network.
    /// `refresh` forces a fetch; if that fetch fails but a cache exists, the
    /// cache is used and the failure is logged rather than fatal.
    pub fn load_catalog(&self, refresh: bool) -> Result<Catalog, StoreError> {
        let base = match &self.source {
            Source::Local(dir) => {
                let path = dir.join(CATALOG_FILE);
                return Ok(Catalog::from_reader(fs::File::open(&path)?)?);
            }
            Source::Remote(base) => base,
        };

        let cache_path = self.catalog_cache_path();
        if !refresh && cache_path.exists() {
            return Ok(Catalog::from_reader(fs::File::open(&cache_path)?)?);
        }

        let url = format!("{}/{}", base, CATALOG_FILE);
        match self.fetch_bytes(&url) {
            Ok(document) => {
                write_atomically(&cache_path, &document)?;
                info!(url, "Fetched track catalog.");
                Ok(Catalog::from_json(std::str::from_utf8(&document).map_err(
                    |e| std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                )?)?)
            }
            Err(e) if cache_path.exists() => {
                warn!(err = e.to_string(), "Catalog fetch failed, using cached copy.");
                crate::notify::notice("Could not reach the catalog; using the offline copy.");
                Ok(Catalog::from_reader(fs::File::open(&cache_path)?)?)
            }
            Err(e) => Err(e),
        }
    }

    /// Resolves the local path of a track's audio, fetching it into the
    /// offline cache if it isn't there yet.
    pub fn audio_path(&self, track: &Track) -> Result<(PathBuf, Origin), StoreError> {
        let base = match &self.source {
            Source::Local(dir) => {
                let path = dir.join(AUDIO_DIR).join(&track.file);
                if !path.exists() {
                    return Err(StoreError::AudioNotFound(path.display().to_string()));
                }
                return Ok((path, Origin::Local));
            }
            Source::Remote(base) => base,
        };

        let cached = self.audio_cache_dir().join(&track.file);
        if cached.exists() {
            return Ok((cached, Origin::Cache));
        }

        let url = format!("{}/{}/{}", base, AUDIO_DIR, track.file);
        let bytes = self.fetch_bytes(&url)?;
        write_atomically(&cached, &bytes)?;
        info!(url, file = track.file, "Fetched audio into offline cache.");
        Ok((cached, Origin::Network))
    }

    /// Downloads every catalog track into the offline cache. Individual
    /// failures are logged and skipped; returns (downloaded, already cached,
    /// failed) counts.
    pub fn prefetch(&self, catalog: &Catalog) -> (usize, usize, usize) {
        let mut downloaded = 0;
        let mut cached = 0;
        let mut failed = 0;
        for track in catalog.list() {
            match self.audio_path(track) {
                Ok((_, Origin::Network)) => downloaded += 1,
                Ok(_) => cached += 1,
                Err(e) => {
                    warn!(
                        err = e.to_string(),
                        file = track.file,
                        "Unable to prefetch track."
                    );
                    failed += 1;
                }
            }
        }
        (downloaded, cached, failed)
    }

    /// Fetches a URL, treating non-success statuses as errors.
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, StoreError> {
        let response = reqwest::blocking::get(url)?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

/// Writes a file via a sibling temp file and rename, so a failed download
/// never leaves a truncated file behind to be mistaken for a cache hit.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"))?;
    let staged = path.with_file_name(format!("{}.part", file_name.to_string_lossy()));
    fs::write(&staged, bytes)?;
    fs::rename(&staged, path)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use std::fs;

    use crate::catalog::Track;

    use super::{Origin, Store, StoreError};

    const CATALOG_JSON: &str = r#"[
        {"id": 1, "file": "one.wav", "taal": "teental", "instrument": "santoor", "bpm": 100, "scale": "C#"},
        {"id": 2, "file": "two.wav", "taal": "rupak", "instrument": "sarangi", "bpm": 85, "scale": "D"}
    ]"#;

    fn track(file: &str) -> Track {
        Track {
            id: 1,
            file: file.to_string(),
            taal: "teental".to_string(),
            instrument: "santoor".to_string(),
            bpm: 100.0,
            scale: "C#".to_string(),
        }
    }

    #[test]
    fn test_local_catalog_and_audio() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("tracks.json"), CATALOG_JSON).expect("write catalog");
        fs::create_dir_all(dir.path().join("audio")).expect("create audio dir");
        fs::write(dir.path().join("audio/one.wav"), b"not really audio").expect("write audio");

        let cache = tempfile::tempdir().expect("tempdir");
        let store = Store::new(
            dir.path().to_str().expect("utf-8 path"),
            cache.path(),
            "test",
        );

        let catalog = store.load_catalog(false).expect("catalog should load");
        assert_eq!(2, catalog.len());

        let (path, origin) = store
            .audio_path(&track("one.wav"))
            .expect("audio should resolve");
        assert_eq!(Origin::Local, origin);
        assert!(path.ends_with("audio/one.wav"));

        // Local mode never writes to the cache directory.
        assert!(fs::read_dir(cache.path()).expect("read cache dir").next().is_none());
    }

    #[test]
    fn test_local_audio_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = tempfile::tempdir().expect("tempdir");
        let store = Store::new(
            dir.path().to_str().expect("utf-8 path"),
            cache.path(),
            "test",
        );

        let result = store.audio_path(&track("missing.wav"));
        assert!(matches!(result, Err(StoreError::AudioNotFound(_))));
    }

    #[test]
    fn test_cached_catalog_skips_network() {
        let cache = tempfile::tempdir().expect("tempdir");
        fs::write(cache.path().join("tracks.json"), CATALOG_JSON).expect("write cache");

        // The base URL is unreachable; the cached catalog must satisfy the
        // load without touching the network.
        let store = Store::new("http://127.0.0.1:1/lehra", cache.path(), "test");
        let catalog = store.load_catalog(false).expect("cached catalog should load");
        assert_eq!(2, catalog.len());
    }

    #[test]
    fn test_refresh_failure_falls_back_to_cache() {
        let cache = tempfile::tempdir().expect("tempdir");
        fs::write(cache.path().join("tracks.json"), CATALOG_JSON).expect("write cache");

        // A forced refresh against an unreachable base must still succeed
        // off the cached copy.
        let store = Store::new("http://127.0.0.1:1/lehra", cache.path(), "test");
        let catalog = store.load_catalog(true).expect("cached catalog should load");
        assert_eq!(2, catalog.len());
        assert!(catalog.get(1).is_some());
    }

    #[test]
    fn test_prefetch_counts_cached_and_failed() {
        let cache = tempfile::tempdir().expect("tempdir");
        let audio_dir = cache.path().join("audio-vtest");
        fs::create_dir_all(&audio_dir).expect("create cache dir");
        fs::write(audio_dir.join("one.wav"), b"cached bytes").expect("write cache");
        fs::write(cache.path().join("tracks.json"), CATALOG_JSON).expect("write cache");

        // Track one is already cached; track two needs the unreachable
        // network and fails. The failure is counted, not fatal.
        let store = Store::new("http://127.0.0.1:1/lehra", cache.path(), "test");
        let catalog = store.load_catalog(false).expect("cached catalog should load");
        assert_eq!((0, 1, 1), store.prefetch(&catalog));
    }

    #[test]
    fn test_prefetch_local_catalog() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("tracks.json"), CATALOG_JSON).expect("write catalog");
        fs::create_dir_all(dir.path().join("audio")).expect("create audio dir");
        fs::write(dir.path().join("audio/one.wav"), b"one").expect("write audio");
        fs::write(dir.path().join("audio/two.wav"), b"two").expect("write audio");

        let cache = tempfile::tempdir().expect("tempdir");
        let store = Store::new(
            dir.path().to_str().expect("utf-8 path"),
            cache.path(),
            "test",
        );

        // Local tracks resolve without downloading anything.
        let catalog = store.load_catalog(false).expect("catalog should load");
        assert_eq!((0, 2, 0), store.prefetch(&catalog));
    }

    #[test]
    fn test_cached_audio_skips_network() {
        let cache = tempfile::tempdir().expect("tempdir");
        let audio_dir = cache.path().join("audio-vtest");
        fs::create_dir_all(&audio_dir).expect("create cache dir");
        fs::write(audio_dir.join("one.wav"), b"cached bytes").expect("write cache");

        let store = Store::new("http://127.0.0.1:1/lehra", cache.path(), "test");
        let (path, origin) = store
            .audio_path(&track("one.wav"))
            .expect("cached audio should resolve");
        assert_eq!(Origin::Cache, origin);
        assert_eq!(b"cached bytes".to_vec(), fs::read(path).expect("read cache"));
    }

    #[test]
    fn test_cache_versions_are_disjoint() {
        let cache = tempfile::tempdir().expect("tempdir");
        let old_dir = cache.path().join("audio-vold");
        fs::create_dir_all(&old_dir).expect("create cache dir");
        fs::write(old_dir.join("one.wav"), b"stale").expect("write cache");

        // A store with a newer cache version must not see the old entry.
        let store = Store::new("http://127.0.0.1:1/lehra", cache.path(), "new");
        assert!(store.audio_path(&track("one.wav")).is_err());
    }

    #[test]
    fn test_unreachable_remote_without_cache_fails() {
        let cache = tempfile::tempdir().expect("tempdir");
        let store = Store::new("http://127.0.0.1:1/lehra", cache.path(), "test");
        assert!(store.load_catalog(false).is_err());
    }
}
