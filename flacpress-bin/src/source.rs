// Copyright 2025- flacpress developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! WAV signal source for "flacpress-bin".

use std::fs::File;
use std::io::BufReader;
use std::io::ErrorKind;
use std::io::Read;
use std::path::Path;

use flacpress::error::SourceError;
use flacpress::error::SourceErrorReason;
use flacpress::source::Context;
use flacpress::source::FrameBuf;
use flacpress::source::Source;

/// A `flacpress::source::Source` based on `hound::WavReader`.
///
/// To mitigate I/O overhead due to sample-by-sample retrieval in the hound
/// API, hound is only used to parse the WAV header and seek to the first
/// sample; blocks of raw sample bytes are then read straight from the inner
/// `BufReader`.
#[allow(clippy::module_name_repetitions)]
pub struct HoundSource {
    spec: hound::WavSpec,
    duration: usize,
    reader: BufReader<File>,
    bytes_per_sample: usize,
    bytebuf: Vec<u8>,
    samplebuf: Vec<i32>,
    current_offset: usize,
}

impl HoundSource {
    /// Constructs `HoundSource` from `path`.
    ///
    /// # Errors
    ///
    /// Fails when the file is not found or is not an integer-format WAV.
    /// IEEE-float WAVs are reported as `SourceErrorReason::UnsupportedFormat`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let mut reader = hound::WavReader::open(&path).map_err(|e| {
            match e {
                hound::Error::IoError(cause) => SourceError::from_io_error(cause),
                hound::Error::Unsupported => {
                    SourceError::by_reason(SourceErrorReason::UnsupportedFormat)
                }
                _ => SourceError::by_reason(SourceErrorReason::InvalidFormat),
            }
            .set_path(&path)
        })?;
        let spec = reader.spec();
        let duration = reader.duration() as usize;
        reader
            .seek(0)
            .map_err(|e| SourceError::from_io_error(e).set_path(&path))?;
        if spec.sample_format != hound::SampleFormat::Int {
            return Err(
                SourceError::by_reason(SourceErrorReason::UnsupportedFormat).set_path(&path),
            );
        }
        Ok(Self {
            spec,
            duration,
            reader: reader.into_inner(),
            bytes_per_sample: (spec.bits_per_sample as usize + 7) / 8,
            bytebuf: Vec::new(),
            samplebuf: Vec::new(),
            current_offset: 0,
        })
    }

    /// Returns the length of the source in seconds.
    pub fn duration_as_secs(&self) -> f32 {
        self.duration as f32 / self.spec.sample_rate as f32
    }
}

/// Reassembles a sign-extended `i32` from little-endian sample bytes.
#[inline]
fn sign_extend_le(bytes: &[u8]) -> i32 {
    let mut v = 0u32;
    for (i, b) in bytes.iter().enumerate() {
        v |= u32::from(*b) << (8 * i);
    }
    let shift = 32 - 8 * bytes.len();
    ((v << shift) as i32) >> shift
}

impl Source for HoundSource {
    #[inline]
    fn channels(&self) -> usize {
        self.spec.channels as usize
    }

    #[inline]
    fn bits_per_sample(&self) -> usize {
        self.spec.bits_per_sample as usize
    }

    #[inline]
    fn sample_rate(&self) -> usize {
        self.spec.sample_rate as usize
    }

    fn read_samples(
        &mut self,
        block_size: usize,
        dest: &mut FrameBuf,
        context: &mut Context,
    ) -> Result<usize, SourceError> {
        let to_read = std::cmp::min(self.duration - self.current_offset, block_size);
        if to_read == 0 {
            dest.resize(0);
            return Ok(0);
        }

        let to_read_bytes = to_read * self.bytes_per_sample * self.channels();
        self.bytebuf.resize(to_read_bytes, 0u8);
        self.reader.read_exact(&mut self.bytebuf).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                // The data chunk ended before the declared duration.
                SourceError::by_reason(SourceErrorReason::IncompleteStream)
            } else {
                SourceError::from_io_error(e)
            }
        })?;
        self.current_offset += to_read;

        if self.bytes_per_sample == 1 {
            // 8-bit WAV is offset binary, not two's complement.
            self.bytebuf.iter_mut().for_each(|p| {
                *p = (i32::from(*p) - 128).to_le_bytes()[0];
            });
        }
        context.update_with_le_bytes(&self.bytebuf)?;

        self.samplebuf.clear();
        self.samplebuf.extend(
            self.bytebuf
                .chunks_exact(self.bytes_per_sample)
                .map(sign_extend_le),
        );
        dest.resize(to_read);
        dest.fill_from_interleaved(&self.samplebuf);
        Ok(to_read)
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_extension_from_le_bytes() {
        assert_eq!(sign_extend_le(&[0x7F]), 127);
        assert_eq!(sign_extend_le(&[0x80]), -128);
        assert_eq!(sign_extend_le(&[0x34, 0x12]), 0x1234);
        assert_eq!(sign_extend_le(&[0xFF, 0xFF]), -1);
        assert_eq!(sign_extend_le(&[0x00, 0x00, 0x80]), -(1 << 23));
        assert_eq!(sign_extend_le(&[0xFF, 0xFF, 0xFF, 0x7F]), i32::MAX);
    }

    #[test]
    fn wav_round_trip_through_source() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("source.wav");
        let mut writer = hound::WavWriter::create(&path, spec).expect("WAV write failed");
        for t in 0..500i32 {
            writer.write_sample((t - 500) as i16).unwrap();
            writer.write_sample((500 - t) as i16).unwrap();
        }
        writer.finalize().unwrap();

        let mut src = HoundSource::from_path(&path).expect("WAV open failed");
        assert_eq!(src.channels(), 2);
        assert_eq!(src.bits_per_sample(), 16);
        assert_eq!(src.len_hint(), Some(500));

        let mut framebuf = FrameBuf::with_size(2, 192);
        let mut ctx = Context::new(16, 2);
        let read = src.read_samples(192, &mut framebuf, &mut ctx).unwrap();
        assert_eq!(read, 192);
        assert_eq!(framebuf.channel_slice(0)[0], -500);
        assert_eq!(framebuf.channel_slice(1)[0], 500);
        assert_eq!(framebuf.channel_slice(0)[191], 191 - 500);

        // drain the rest
        let read = src.read_samples(192, &mut framebuf, &mut ctx).unwrap();
        assert_eq!(read, 192);
        let read = src.read_samples(192, &mut framebuf, &mut ctx).unwrap();
        assert_eq!(read, 116);
        let read = src.read_samples(192, &mut framebuf, &mut ctx).unwrap();
        assert_eq!(read, 0);
    }
}
