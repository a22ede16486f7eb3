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
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

/// Control messages sent into the render callback. The callback drains the
/// channel at the top of each block, so parameter changes land within one
/// buffer of when they were sent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Sets the varispeed playback rate.
    SetRate(f64),
    /// Sets the pitch shift in semitones.
    SetShift(f64),
    /// Jumps to a position given as loop progress in percent.
    Seek(f64),
}

/// Shared playback state between the render callback and the player.
///
/// The callback is the only writer of the position; everything else is
/// toggled from the control side and observed by the callback. All fields
/// are atomics so the audio thread never takes a lock.
pub struct Transport {
    /// Loop length in frames at the device rate.
    frames: usize,
    /// Device sample rate in Hz.
    sample_rate: u32,
    /// Current playhead in frames.
    position: AtomicUsize,
    /// False while paused.
    playing: AtomicBool,
    /// True once playback has been stopped for good.
    stopped: AtomicBool,
    /// Signalled on stop so `wait` can return.
    done: Mutex<bool>,
    done_signal: Condvar,
}

impl Transport {
    pub fn new(frames: usize, sample_rate: u32) -> Transport {
        Transport {
            frames,
            sample_rate,
            position: AtomicUsize::new(0),
            playing: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            done: Mutex::new(false),
            done_signal: Condvar::new(),
        }
    }

    /// Current playhead in frames.
    pub fn position(&self) -> usize {
        self.position.load(Ordering::Relaxed)
    }

    pub fn set_position(&self, frames: usize) {
        self.position.store(frames, Ordering::Relaxed);
    }

    /// Current playhead in seconds.
    pub fn position_seconds(&self) -> f64 {
        self.position() as f64 / self.sample_rate as f64
    }

    /// Loop duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    /// Progress through the loop as a percentage in [0, 100].
    pub fn progress(&self) -> f64 {
        if self.frames == 0 {
            return 0.0;
        }
        let pct = self.position() as f64 / self.frames as f64 * 100.0;
        pct.clamp(0.0, 100.0)
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed) && !self.is_stopped()
    }

    pub fn pause(&self) {
        self.playing.store(false, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.playing.store(true, Ordering::Relaxed);
    }

    /// Toggles between paused and playing. Returns true if now playing.
    pub fn toggle(&self) -> bool {
        let was_playing = self.playing.fetch_xor(true, Ordering::Relaxed);
        !was_playing
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Stops playback permanently and releases anything blocked in `wait`.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
        let mut done = self.done.lock();
        *done = true;
        self.done_signal.notify_all();
    }

    /// Blocks until `stop` is called.
    pub fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.done_signal.wait(&mut done);
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::Transport;

    #[test]
    fn test_progress_bounds() {
        let transport = Transport::new(1000, 44100);
        assert_eq!(0.0, transport.progress());

        transport.set_position(250);
        assert_eq!(25.0, transport.progress());

        // A position past the loop end clamps rather than exceeding 100.
        transport.set_position(2000);
        assert_eq!(100.0, transport.progress());
    }

    #[test]
    fn test_empty_loop_progress() {
        let transport = Transport::new(0, 44100);
        assert_eq!(0.0, transport.progress());
    }

    #[test]
    fn test_toggle() {
        let transport = Transport::new(1000, 44100);
        assert!(transport.is_playing());
        assert!(!transport.toggle());
        assert!(!transport.is_playing());
        assert!(transport.toggle());
        assert!(transport.is_playing());
    }

    #[test]
    fn test_stopped_is_not_playing() {
        let transport = Transport::new(1000, 44100);
        transport.stop();
        assert!(!transport.is_playing());
        assert!(transport.is_stopped());
    }

    #[test]
    fn test_wait_returns_after_stop() {
        let transport = Arc::new(Transport::new(1000, 44100));

        let stopper = transport.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            stopper.stop();
        });

        transport.wait();
        assert!(transport.is_stopped());
        handle.join().expect("stopper thread");
    }

    #[test]
    fn test_seconds() {
        let transport = Transport::new(44100 * 3, 44100);
        transport.set_position(44100);
        assert!((transport.position_seconds() - 1.0).abs() < 1e-9);
        assert!((transport.duration_seconds() - 3.0).abs() < 1e-9);
    }
}
