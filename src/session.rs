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
use std::sync::Arc;

use crate::catalog::Track;

/// The 12-tone pitch class table, starting at C.
pub const NOTES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Tempo adjustments never drop below this. Slower than 20 BPM isn't a
/// usable lehra and the playback rate math degenerates as bpm approaches 0.
pub const MIN_BPM: f64 = 20.0;

/// The playback parameters for one selected track. Created on track
/// selection, mutated by tempo/pitch changes, torn down when the player
/// moves on.
///
/// Tempo and pitch are decoupled the same way the speed-and-correction
/// trick works on a varispeed deck: speeding playback up by rate r raises
/// pitch by 12*log2(r) semitones, so the shifter is handed the opposite
/// correction plus whatever transposition the musician asked for.
#[derive(Clone, Debug)]
pub struct Session {
    /// The selected track.
    pub track: Arc<Track>,
    /// The target tempo.
    bpm: f64,
    /// The requested transposition in semitones.
    semitone_offset: i32,
}

impl Session {
    /// Creates a session for a track, starting at the track's own tempo and
    /// with no transposition.
    pub fn new(track: Arc<Track>) -> Session {
        let bpm = track.bpm;
        Session {
            track,
            bpm,
            semitone_offset: 0,
        }
    }

    /// The current target tempo.
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// The current transposition in semitones.
    pub fn semitone_offset(&self) -> i32 {
        self.semitone_offset
    }

    /// Sets the target tempo, clamped to the minimum.
    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = bpm.max(MIN_BPM);
    }

    /// Adjusts the target tempo by a delta, clamped to the minimum.
    pub fn adjust_bpm(&mut self, delta: f64) {
        self.set_bpm(self.bpm + delta);
    }

    /// Sets the transposition in semitones.
    pub fn set_semitone_offset(&mut self, semitones: i32) {
        self.semitone_offset = semitones;
    }

    /// Adjusts the transposition by a delta in semitones.
    pub fn adjust_pitch(&mut self, delta: i32) {
        self.semitone_offset += delta;
    }

    /// The varispeed rate: target tempo over the track's recorded tempo.
    pub fn playback_rate(&self) -> f64 {
        self.bpm / self.track.bpm
    }

    /// The correction that undoes the pitch artifact of the varispeed rate.
    pub fn pitch_correction(&self) -> f64 {
        -12.0 * self.playback_rate().log2()
    }

    /// The total shift handed to the pitch shifter: the musician's
    /// transposition plus the varispeed correction. At the track's native
    /// tempo this is exactly the semitone offset.
    pub fn pitch_shift(&self) -> f64 {
        self.semitone_offset as f64 + self.pitch_correction()
    }

    /// The displayed pitch class: the track's scale transposed by the
    /// semitone offset, wrapped onto the 12-tone table. A scale the table
    /// doesn't know is displayed untouched.
    pub fn pitch_name(&self) -> String {
        pitch_name(&self.track.scale, self.semitone_offset)
    }
}

/// Maps a base scale plus a semitone offset onto a pitch class name.
pub fn pitch_name(scale: &str, semitone_offset: i32) -> String {
    let scale_upper = scale.to_uppercase();
    let base = match NOTES.iter().position(|n| *n == scale_upper) {
        Some(base) => base as i32,
        None => return scale.to_string(),
    };

    let index = (base + semitone_offset).rem_euclid(12);
    NOTES[index as usize].to_string()
}
