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

use serde::Deserialize;

/// Typed error for config load/parse failures so callers can distinguish
/// file-not-found from parse errors without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_yml::Error),
}

/// The configuration for the lehra player.
#[derive(Deserialize)]
pub struct Player {
    /// The catalog base, either an HTTP URL or a local directory.
    pub catalog: String,
    /// The audio device to use. Defaults to the system output device.
    pub device: Option<String>,
    /// Where to keep the offline cache. Defaults next to the config file.
    pub cache_dir: Option<PathBuf>,
    /// Overrides the audio cache version. Defaults to the crate version.
    pub cache_version: Option<String>,
}

/// Parses a player configuration from a YAML file.
pub fn parse_player(file: &Path) -> Result<Player, ConfigError> {
    Ok(serde_yml::from_str(&fs::read_to_string(file)?)?)
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::PathBuf;

    use super::{parse_player, ConfigError};

    #[test]
    fn test_parse_player() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("lehra.yaml");
        fs::write(
            &path,
            concat!(
                "catalog: https://riyaazz.example.com\n",
                "device: USB Audio\n",
                "cache_dir: /var/cache/lehra\n",
            ),
        )
        .expect("write config");

        let config = parse_player(&path).expect("config should parse");
        assert_eq!("https://riyaazz.example.com", config.catalog);
        assert_eq!(Some("USB Audio".to_string()), config.device);
        assert_eq!(Some(PathBuf::from("/var/cache/lehra")), config.cache_dir);
        assert_eq!(None, config.cache_version);
    }

    #[test]
    fn test_minimal_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("lehra.yaml");
        fs::write(&path, "catalog: ./catalog\n").expect("write config");

        let config = parse_player(&path).expect("config should parse");
        assert_eq!("./catalog", config.catalog);
        assert_eq!(None, config.device);
    }

    #[test]
    fn test_missing_file() {
        let result = parse_player(&PathBuf::from("/nonexistent/lehra.yaml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_catalog_is_required() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("lehra.yaml");
        fs::write(&path, "device: USB Audio\n").expect("write config");

        assert!(matches!(parse_player(&path), Err(ConfigError::Parse(_))));
    }
}
