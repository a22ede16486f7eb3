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
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::warn;

use super::error::AudioError;

/// A fully decoded track held in memory as interleaved stereo f32 frames.
/// Lehras are a few minutes of audio at most, so decoding the whole file up
/// front is cheap and lets the loop transport wrap without touching disk.
pub struct TrackBuffer {
    /// Interleaved stereo samples (L, R, L, R, ...), in [-1.0, 1.0].
    pub data: Vec<f32>,
    /// Sample rate of the data in Hz.
    pub sample_rate: u32,
}

impl TrackBuffer {
    /// The number of stereo frames.
    pub fn frames(&self) -> usize {
        self.data.len() / 2
    }

    /// The duration of the buffer.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Reads the frame at a fractional position with linear interpolation,
    /// wrapping across the loop boundary.
    pub fn frame_at(&self, position: f64) -> (f32, f32) {
        let frames = self.frames();
        if frames == 0 {
            return (0.0, 0.0);
        }

        let index = position.floor() as usize % frames;
        let next = (index + 1) % frames;
        let frac = (position - position.floor()) as f32;

        let l0 = self.data[index * 2];
        let r0 = self.data[index * 2 + 1];
        let l1 = self.data[next * 2];
        let r1 = self.data[next * 2 + 1];

        (l0 + (l1 - l0) * frac, r0 + (r1 - r0) * frac)
    }
}

/// Decodes an audio file into a stereo TrackBuffer using symphonia. Mono is
/// duplicated onto both channels; anything wider than stereo keeps its first
/// two channels.
pub fn decode_file(path: &Path) -> Result<TrackBuffer, AudioError> {
    let file = File::open(path).map_err(|e| {
        std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::NoAudioTrack(path.display().to_string()))?;
    let track_id = track.id;
    let params = &track.codec_params;

    let sample_rate = params
        .sample_rate
        .ok_or_else(|| AudioError::UnsupportedFormat("sample rate not specified".to_string()))?;
    let channels = params
        .channels
        .map(|c| c.count())
        .ok_or_else(|| AudioError::UnsupportedFormat("channel count not specified".to_string()))?;
    if channels == 0 {
        return Err(AudioError::UnsupportedFormat(
            "file reports zero channels".to_string(),
        ));
    }

    let mut decoder = get_codecs().make(params, &DecoderOptions::default())?;

    let mut data: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let buf = sample_buf.get_or_insert_with(|| {
                    SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec())
                });
                buf.copy_interleaved_ref(decoded);
                interleave_stereo(buf.samples(), channels, &mut data);
            }
            // A corrupt packet isn't fatal; skip it and keep decoding.
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(err = e, file = %path.display(), "Skipping undecodable packet.");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(TrackBuffer { data, sample_rate })
}

/// Appends interleaved source samples to the stereo output, adapting the
/// channel count.
fn interleave_stereo(samples: &[f32], channels: usize, out: &mut Vec<f32>) {
    match channels {
        1 => {
            for &s in samples {
                out.push(s);
                out.push(s);
            }
        }
        2 => out.extend_from_slice(samples),
        n => {
            for frame in samples.chunks_exact(n) {
                out.push(frame[0]);
                out.push(frame[1]);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::testutil;

    use super::{decode_file, interleave_stereo, TrackBuffer};

    #[test]
    fn test_decode_wav() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tone.wav");
        testutil::write_sine_wav(&path, 440.0, 44100, 44100);

        let buffer = decode_file(&path).expect("wav should decode");
        assert_eq!(44100, buffer.sample_rate);
        assert_eq!(44100, buffer.frames());
        assert!((buffer.duration().as_secs_f64() - 1.0).abs() < 1e-6);

        // The decoded signal should actually carry energy.
        let rms = testutil::rms(&buffer.data);
        assert!(rms > 0.1, "rms was {}", rms);
    }

    #[test]
    fn test_decode_missing_file() {
        assert!(decode_file(std::path::Path::new("/nonexistent/file.wav")).is_err());
    }

    #[test]
    fn test_interleave_channel_adaptation() {
        let mut out = Vec::new();
        interleave_stereo(&[0.1, 0.2], 1, &mut out);
        assert_eq!(vec![0.1, 0.1, 0.2, 0.2], out);

        let mut out = Vec::new();
        interleave_stereo(&[0.1, 0.2, 0.3, 0.4], 2, &mut out);
        assert_eq!(vec![0.1, 0.2, 0.3, 0.4], out);

        // 4-channel frames keep their first two channels.
        let mut out = Vec::new();
        interleave_stereo(&[0.1, 0.2, 0.8, 0.9, 0.3, 0.4, 0.8, 0.9], 4, &mut out);
        assert_eq!(vec![0.1, 0.2, 0.3, 0.4], out);
    }

    #[test]
    fn test_frame_at_wraps_loop_boundary() {
        let buffer = TrackBuffer {
            data: vec![0.0, 0.0, 0.4, 0.4, 0.8, 0.8],
            sample_rate: 44100,
        };

        assert_eq!((0.4, 0.4), buffer.frame_at(1.0));

        // Midway between frames interpolates.
        let (l, _) = buffer.frame_at(0.5);
        assert!((l - 0.2).abs() < 1e-6);

        // Interpolation from the last frame wraps to frame zero.
        let (l, _) = buffer.frame_at(2.5);
        assert!((l - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_empty_buffer_is_silent() {
        let buffer = TrackBuffer {
            data: vec![],
            sample_rate: 44100,
        };
        assert_eq!((0.0, 0.0), buffer.frame_at(12.3));
        assert_eq!(0, buffer.frames());
    }
}
