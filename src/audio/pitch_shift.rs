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

/// Ring capacity in frames. Must stay above WINDOW plus the interpolation
/// margin.
const RING_FRAMES: usize = 8192;

/// Grain window in frames. Around 70ms at 44.1kHz.
const WINDOW: f64 = 3072.0;

/// A dual-tap delay-line pitch shifter.
///
/// Two read taps sweep through a short delay line at a rate offset from the
/// write head by the pitch ratio, half a window apart, each under a
/// triangular envelope so one fades in while the other fades out. This is
/// the classic real-time shifter: no spectral processing, constant latency,
/// and quality that holds up fine over the few-semitone range a lehra gets
/// transposed by.
pub struct PitchShifter {
    /// Interleaved stereo delay line.
    ring: Vec<f32>,
    /// Write head, in frames.
    write: usize,
    /// Tap phase within the window, in frames.
    phase: f64,
    /// Current shift in semitones.
    semitones: f64,
    /// Derived frequency ratio, 2^(semitones/12).
    ratio: f64,
}

impl PitchShifter {
    pub fn new() -> PitchShifter {
        PitchShifter {
            ring: vec![0.0; RING_FRAMES * 2],
            write: 0,
            phase: 0.0,
            semitones: 0.0,
            ratio: 1.0,
        }
    }

    /// Sets the shift in semitones. Fractional values are fine; the total
    /// shift includes the varispeed correction which is rarely integral.
    pub fn set_shift(&mut self, semitones: f64) {
        self.semitones = semitones;
        self.ratio = 2.0_f64.powf(semitones / 12.0);
    }

    /// Processes one stereo frame.
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        // Keep the delay line primed even while bypassed, so engaging the
        // shift doesn't start from silence.
        self.ring[self.write * 2] = left;
        self.ring[self.write * 2 + 1] = right;

        let out = if self.semitones == 0.0 {
            (left, right)
        } else {
            let delay_a = self.phase;
            let delay_b = (self.phase + WINDOW / 2.0) % WINDOW;
            let gain_a = triangle(delay_a);
            let gain_b = triangle(delay_b);

            let (la, ra) = self.read(delay_a);
            let (lb, rb) = self.read(delay_b);

            (la * gain_a + lb * gain_b, ra * gain_a + rb * gain_b)
        };

        self.write = (self.write + 1) % RING_FRAMES;
        // A tap's delay drifts at (1 - ratio) per frame: shifting up, the
        // taps chase the write head; shifting down, they fall behind.
        self.phase = (self.phase + (1.0 - self.ratio)).rem_euclid(WINDOW);

        out
    }

    /// Reads the frame `delay` frames behind the write head with linear
    /// interpolation.
    fn read(&self, delay: f64) -> (f32, f32) {
        let pos = self.write as f64 - delay;
        let base = pos.floor();
        let frac = (pos - base) as f32;

        let i0 = (base as isize).rem_euclid(RING_FRAMES as isize) as usize;
        let i1 = (i0 + 1) % RING_FRAMES;

        let l0 = self.ring[i0 * 2];
        let r0 = self.ring[i0 * 2 + 1];
        let l1 = self.ring[i1 * 2];
        let r1 = self.ring[i1 * 2 + 1];

        (l0 + (l1 - l0) * frac, r0 + (r1 - r0) * frac)
    }
}

impl Default for PitchShifter {
    fn default() -> Self {
        Self::new()
    }
}

/// Triangular envelope over the window: zero at the wrap points, unity in
/// the middle. The two taps' envelopes sum to one.
fn triangle(delay: f64) -> f32 {
    (1.0 - (2.0 * delay / WINDOW - 1.0).abs()) as f32
}
