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
use std::fmt;
use std::io::Read;
use std::sync::Arc;

use serde::Deserialize;

use crate::util::capitalize;

/// The instrument selector that matches every instrument.
pub const ALL_INSTRUMENTS: &str = "all";

/// A single practice track in the catalog. Entries are immutable once
/// loaded; all playback state lives in the session instead.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Track {
    /// The track identifier.
    pub id: u32,
    /// The audio file name, relative to the catalog's audio directory.
    pub file: String,
    /// The rhythmic cycle of the track.
    pub taal: String,
    /// The accompanying instrument.
    pub instrument: String,
    /// The tempo the track was recorded at.
    pub bpm: f64,
    /// The pitch class the track was recorded in (e.g. "C#").
    pub scale: String,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{}: {} / {} ({} BPM, {})",
            self.id,
            capitalize(&self.taal),
            capitalize(&self.instrument),
            self.bpm,
            self.scale,
        )
    }
}

/// The filter facets derivable from a catalog.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Facets {
    /// Taals in order of first appearance in the catalog.
    pub taals: Vec<String>,
    /// Instruments, sorted, with the universal selector first.
    pub instruments: Vec<String>,
}

/// A taal and instrument selection to narrow the catalog with.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub taal: String,
    pub instrument: String,
}

/// The track catalog. Preserves the order of the source document.
pub struct Catalog {
    tracks: Vec<Arc<Track>>,
}

impl Catalog {
    /// Creates a catalog from a list of tracks.
    pub fn new(tracks: Vec<Track>) -> Catalog {
        Catalog {
            tracks: tracks.into_iter().map(Arc::new).collect(),
        }
    }

    /// Parses a catalog from a JSON document.
    pub fn from_json(document: &str) -> Result<Catalog, serde_json::Error> {
        Ok(Catalog::new(serde_json::from_str(document)?))
    }

    /// Parses a catalog from a reader over a JSON document.
    pub fn from_reader<R: Read>(reader: R) -> Result<Catalog, serde_json::Error> {
        Ok(Catalog::new(serde_json::from_reader(reader)?))
    }

    /// Gets a track by its identifier. If an id appears more than once, the
    /// first occurrence wins.
    pub fn get(&self, id: u32) -> Option<Arc<Track>> {
        self.tracks.iter().find(|t| t.id == id).cloned()
    }

    /// Returns all tracks in document order.
    pub fn list(&self) -> &[Arc<Track>] {
        &self.tracks
    }

    /// Returns the number of tracks in the catalog.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Returns true if the catalog holds no tracks.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Derives the filter facets from the catalog.
    pub fn facets(&self) -> Facets {
        let mut taals: Vec<String> = Vec::new();
        for track in self.tracks.iter() {
            if !taals.contains(&track.taal) {
                taals.push(track.taal.clone());
            }
        }

        let mut instruments: Vec<String> = Vec::new();
        for track in self.tracks.iter() {
            if !instruments.contains(&track.instrument) {
                instruments.push(track.instrument.clone());
            }
        }
        instruments.sort();
        instruments.insert(0, ALL_INSTRUMENTS.to_string());

        Facets { taals, instruments }
    }

    /// The default selection for this catalog: the first taal with every
    /// instrument. Returns None for an empty catalog.
    pub fn default_filter(&self) -> Option<Filter> {
        self.facets().taals.first().map(|taal| Filter {
            taal: taal.clone(),
            instrument: ALL_INSTRUMENTS.to_string(),
        })
    }

    /// Returns exactly the tracks matching the filter. The instrument match
    /// is universal when the filter's instrument is "all".
    pub fn filtered(&self, filter: &Filter) -> Vec<Arc<Track>> {
        self.tracks
            .iter()
            .filter(|t| {
                let taal_match = t.taal == filter.taal;
                let instrument_match =
                    filter.instrument == ALL_INSTRUMENTS || t.instrument == filter.instrument;
                taal_match && instrument_match
            })
            .cloned()
            .collect()
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Catalog ({} tracks):", self.tracks.len())?;
        for track in self.tracks.iter() {
            writeln!(f, "  - {}", track)?;
        }
        Ok(())
    }
}
