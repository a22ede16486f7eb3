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
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::decode::TrackBuffer;
use super::error::AudioError;

/// Input block size for the sinc resampler.
const INPUT_BLOCK_SIZE: usize = 1024;

/// Resamples a decoded track to the output device rate at load time, so the
/// render path only ever deals with one rate. Returns the buffer untouched
/// when the rates already agree.
pub fn resample_to(buffer: TrackBuffer, target_rate: u32) -> Result<TrackBuffer, AudioError> {
    if buffer.sample_rate == target_rate || buffer.frames() == 0 {
        return Ok(TrackBuffer {
            data: buffer.data,
            sample_rate: target_rate,
        });
    }

    let frames = buffer.frames();
    let mut left: Vec<f32> = Vec::with_capacity(frames);
    let mut right: Vec<f32> = Vec::with_capacity(frames);
    for frame in buffer.data.chunks_exact(2) {
        left.push(frame[0]);
        right.push(frame[1]);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(
        target_rate as f64 / buffer.sample_rate as f64,
        2.0,
        params,
        INPUT_BLOCK_SIZE,
        2,
    )?;

    let mut out_left: Vec<f32> = Vec::new();
    let mut out_right: Vec<f32> = Vec::new();
    let mut position = 0;

    loop {
        let needed = resampler.input_frames_next();
        if position + needed <= frames {
            let chunk = [
                &left[position..position + needed],
                &right[position..position + needed],
            ];
            let output = resampler.process(&chunk, None)?;
            out_left.extend_from_slice(&output[0]);
            out_right.extend_from_slice(&output[1]);
            position += needed;
        } else {
            // Final partial block, then drain the resampler's tail.
            let chunk = [&left[position..], &right[position..]];
            let output = resampler.process_partial(Some(&chunk), None)?;
            out_left.extend_from_slice(&output[0]);
            out_right.extend_from_slice(&output[1]);

            let output = resampler.process_partial::<&[f32]>(None, None)?;
            out_left.extend_from_slice(&output[0]);
            out_right.extend_from_slice(&output[1]);
            break;
        }
    }

    let mut data = Vec::with_capacity(out_left.len() * 2);
    for (l, r) in out_left.iter().zip(out_right.iter()) {
        data.push(*l);
        data.push(*r);
    }

    Ok(TrackBuffer {
        data,
        sample_rate: target_rate,
    })
}

#[cfg(test)]
mod test {
    use crate::testutil;

    use super::super::decode::TrackBuffer;
    use super::resample_to;

    #[test]
    fn test_same_rate_is_identity() {
        let buffer = TrackBuffer {
            data: vec![0.1, 0.2, 0.3, 0.4],
            sample_rate: 48000,
        };
        let out = resample_to(buffer, 48000).expect("resample should succeed");
        assert_eq!(vec![0.1, 0.2, 0.3, 0.4], out.data);
    }

    #[test]
    fn test_resample_changes_length_proportionally() {
        let frames = 44100;
        let mono = testutil::sine(440.0, 44100, frames);
        let mut data = Vec::with_capacity(frames * 2);
        for s in mono {
            data.push(s);
            data.push(s);
        }
        let buffer = TrackBuffer {
            data,
            sample_rate: 44100,
        };

        let out = resample_to(buffer, 48000).expect("resample should succeed");
        assert_eq!(48000, out.sample_rate);

        // One second of audio stays roughly one second long. The sinc
        // resampler adds a little transient delay at the edges.
        let expected = 48000.0;
        let actual = out.frames() as f64;
        assert!(
            (actual - expected).abs() < expected * 0.02,
            "expected ~{} frames, got {}",
            expected,
            actual
        );

        // And the signal still carries energy.
        assert!(testutil::rms(&out.data) > 0.1);
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = TrackBuffer {
            data: vec![],
            sample_rate: 44100,
        };
        let out = resample_to(buffer, 48000).expect("resample should succeed");
        assert_eq!(0, out.frames());
        assert_eq!(48000, out.sample_rate);
    }
}
