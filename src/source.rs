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

//! Module for input source handling.

use seq_macro::seq;

use super::error::SourceError;
use super::error::SourceErrorReason;

// The deinterleaver runs once per frame on the I/O side and benefits from
// per-channel-count specializations that LLVM can vectorize; `seq_macro`
// generates one loop body per supported channel count.

#[inline]
fn deinterleave_gen(interleaved: &[i32], channels: usize, dest: &mut [i32]) {
    let samples = dest.len() / channels;
    let src_samples = interleaved.len() / channels;
    for t in 0..samples {
        for ch in 0..channels {
            dest[samples * ch + t] = if t < src_samples {
                interleaved[channels * t + ch]
            } else {
                0i32
            }
        }
    }
}

seq!(N in 2..=8 {
    #[inline]
    #[allow(clippy::identity_op)]
    #[allow(clippy::erasing_op)]
    fn deinterleave_ch~N(interleaved: &[i32], dest: &mut [i32]) {
        let samples = dest.len() / N;
        let src_samples = interleaved.len() / N;
        for t in 0..samples {
            seq!(CH in 0..N {
                dest[samples * CH + t] = if t < src_samples {
                    interleaved[N * t + CH]
                } else {
                    0i32
                };
            });
        }
    }
});

fn deinterleave_ch1(interleaved: &[i32], dest: &mut [i32]) {
    let n = std::cmp::min(dest.len(), interleaved.len());
    dest[0..n].copy_from_slice(&interleaved[0..n]);
    dest[n..].fill(0i32);
}

/// Deinterleaves channel-interleaved samples to the channel-planar order.
///
/// When `interleaved` holds fewer samples than `dest`, the remainder of each
/// channel plane is zero-filled.
pub fn deinterleave(interleaved: &[i32], channels: usize, dest: &mut [i32]) {
    seq!(CH in 1..=8 {
        if channels == CH {
            return deinterleave_ch~CH(interleaved, dest);
        }
    });
    deinterleave_gen(interleaved, channels, dest);
}

/// Reusable buffer holding one block of channel-planar samples.
#[derive(Clone, Debug)]
pub struct FrameBuf {
    samples: Vec<i32>,
    channels: usize,
    size: usize,
}

impl FrameBuf {
    /// Constructs `FrameBuf` of the specified size.
    pub fn with_size(channels: usize, size: usize) -> Self {
        Self {
            samples: vec![0i32; size * channels],
            channels,
            size,
        }
    }

    /// Returns the size in the number of inter-channel samples.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Returns the number of channels.
    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Resizes `FrameBuf`, invalidating its current contents.
    ///
    /// Sources call this before [`Self::fill_from_interleaved`] so the final
    /// block of a stream shrinks to the number of samples actually read.
    pub fn resize(&mut self, new_size: usize) {
        self.size = new_size;
        self.samples.resize(new_size * self.channels, 0i32);
    }

    /// Fills the planes from an interleaved slice, zero-filling the rest.
    pub fn fill_from_interleaved(&mut self, interleaved: &[i32]) {
        deinterleave(interleaved, self.channels, &mut self.samples);
    }

    /// Returns samples from the given channel.
    pub fn channel_slice(&self, ch: usize) -> &[i32] {
        &self.samples[ch * self.size..(ch + 1) * self.size]
    }

    /// Returns mutable samples from the given channel.
    pub fn channel_slice_mut(&mut self, ch: usize) -> &mut [i32] {
        &mut self.samples[ch * self.size..(ch + 1) * self.size]
    }

    /// Returns the internal representation of multichannel signals.
    #[cfg(test)]
    pub fn raw_slice(&self) -> &[i32] {
        &self.samples
    }
}

/// Read-side state of an encoder run: MD5 of the consumed input and counters.
///
/// The MD5 covers the raw little-endian sample bytes in the original bit
/// depth (the digest a FLAC decoder checks its output against), so sources
/// must route every sample they deliver through [`Context::update`] or
/// [`Context::update_with_le_bytes`].
#[derive(Clone)]
pub struct Context {
    md5: md5::Context,
    bytes_per_sample: usize,
    channels: usize,
    sample_count: usize,
    frame_count: usize,
}

impl Context {
    /// Creates new context.
    ///
    /// # Panics
    ///
    /// Panics if `bits_per_sample > 32`.
    pub fn new(bits_per_sample: usize, channels: usize) -> Self {
        let bytes_per_sample = (bits_per_sample + 7) / 8;
        assert!(
            bytes_per_sample <= 4,
            "bits_per_sample={bits_per_sample} cannot be larger than 32."
        );
        Self {
            md5: md5::Context::new(),
            bytes_per_sample,
            channels,
            sample_count: 0,
            frame_count: 0,
        }
    }

    /// Updates the context with one block of interleaved samples.
    ///
    /// # Errors
    ///
    /// Returns `SourceErrorReason::IncompleteStream` when `interleaved` does
    /// not cover whole channel groups.
    pub fn update(&mut self, interleaved: &[i32]) -> Result<(), SourceError> {
        if interleaved.len() % self.channels != 0 {
            return Err(SourceError::by_reason(SourceErrorReason::IncompleteStream));
        }
        for v in interleaved {
            self.md5.consume(&v.to_le_bytes()[0..self.bytes_per_sample]);
        }
        self.sample_count += interleaved.len() / self.channels;
        self.frame_count += 1;
        Ok(())
    }

    /// Updates the context with one block of already-packed sample bytes.
    ///
    /// This is a short-cut for sources that hold a WAV-like little-endian
    /// byte buffer.
    ///
    /// # Errors
    ///
    /// Returns `SourceErrorReason::IncompleteStream` when `packed_samples`
    /// does not cover whole channel groups.
    pub fn update_with_le_bytes(&mut self, packed_samples: &[u8]) -> Result<(), SourceError> {
        let group_bytes = self.channels * self.bytes_per_sample;
        if packed_samples.len() % group_bytes != 0 {
            return Err(SourceError::by_reason(SourceErrorReason::IncompleteStream));
        }
        self.md5.consume(packed_samples);
        self.sample_count += packed_samples.len() / group_bytes;
        self.frame_count += 1;
        Ok(())
    }

    /// Returns the number of the last frame loaded.
    ///
    /// # Panics
    ///
    /// Panics when it is called before `update` is called (typically via
    /// `Source::read_samples`) at least once.
    #[inline]
    pub fn current_frame_number(&self) -> usize {
        assert!(self.frame_count > 0);
        self.frame_count - 1
    }

    /// Returns MD5 digest of the consumed samples.
    #[inline]
    pub fn md5_digest(&self) -> [u8; 16] {
        self.md5.clone().compute().into()
    }

    /// Returns the number of inter-channel samples consumed.
    #[inline]
    pub fn total_samples(&self) -> usize {
        self.sample_count
    }
}

/// Trait for input sources that deliver blocks of planar samples.
pub trait Source {
    /// Returns the number of channels.
    fn channels(&self) -> usize;
    /// Returns the number of bits per sample.
    fn bits_per_sample(&self) -> usize;
    /// Returns sampling rate in Hz.
    fn sample_rate(&self) -> usize;
    /// Reads up to `block_size` inter-channel samples into `dest`.
    ///
    /// `dest` is resized to the number of samples actually read, and
    /// `context` is updated with the consumed bytes. Returns the number of
    /// inter-channel samples read; zero signals the end of the stream.
    #[allow(clippy::missing_errors_doc)]
    fn read_samples(
        &mut self,
        block_size: usize,
        dest: &mut FrameBuf,
        context: &mut Context,
    ) -> Result<usize, SourceError>;
    /// Returns length of source if it's known.
    fn len_hint(&self) -> Option<usize> {
        None
    }
}

/// Source with preloaded samples.
#[derive(Clone, Debug)]
pub struct PreloadedSignal {
    channels: usize,
    bits_per_sample: usize,
    sample_rate: usize,
    samples: Vec<i32>,
    read_head: usize,
}

impl PreloadedSignal {
    /// Constructs `PreloadedSignal` from interleaved samples.
    pub fn from_samples(
        samples: &[i32],
        channels: usize,
        bits_per_sample: usize,
        sample_rate: usize,
    ) -> Self {
        Self {
            channels,
            bits_per_sample,
            sample_rate,
            samples: samples.to_owned(),
            read_head: 0,
        }
    }

    /// Returns the length in inter-channel samples.
    pub fn len(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Returns `true` if the signal holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns sample buffer as a raw interleaved slice.
    pub fn as_raw_slice(&self) -> &[i32] {
        &self.samples
    }
}

impl Source for PreloadedSignal {
    fn channels(&self) -> usize {
        self.channels
    }

    fn bits_per_sample(&self) -> usize {
        self.bits_per_sample
    }

    fn sample_rate(&self) -> usize {
        self.sample_rate
    }

    fn read_samples(
        &mut self,
        block_size: usize,
        dest: &mut FrameBuf,
        context: &mut Context,
    ) -> Result<usize, SourceError> {
        if dest.channels() != self.channels {
            return Err(SourceError::by_reason(SourceErrorReason::InvalidBuffer));
        }
        let begin = std::cmp::min(self.read_head * self.channels, self.samples.len());
        let end = std::cmp::min(begin + block_size * self.channels, self.samples.len());
        let src = &self.samples[begin..end];
        if src.len() % self.channels != 0 {
            return Err(SourceError::by_reason(SourceErrorReason::IncompleteStream));
        }

        let read = src.len() / self.channels;
        dest.resize(read);
        dest.fill_from_interleaved(src);
        if !src.is_empty() {
            context.update(src)?;
        }
        self.read_head += read;
        Ok(read)
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.len())
    }
}
