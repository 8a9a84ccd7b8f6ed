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

use std::cmp::max;
use std::cmp::min;

use super::bitrepr::BitRepr;
use super::verify::verify_block_size;
use super::verify::verify_bps;
use super::verify::verify_sample_range;
use crate::constant::fixed::MAX_ORDER as MAX_FIXED_ORDER;
use crate::constant::MAX_CHANNELS;
use crate::error::verify_range;
use crate::error::verify_true;
use crate::error::Verify;
use crate::error::VerifyError;
use crate::rice;
use crate::rice::RiceMethod;

/// [`METADATA_BLOCK_STREAM_INFO`](https://xiph.org/flac/format.html#metadata_block_streaminfo) component.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StreamInfo {
    min_block_size: u16, // 16 bits: Minimum block size in samples.
    max_block_size: u16, // 16 bits: Maximum block size in samples.
    min_frame_size: u32, // 24 bits: Minimum frame size in bytes.
    max_frame_size: u32, // 24 bits: Maximum frame size in bytes.
    sample_rate: u32,    // 20 bits: Sample rate in Hz.
    channels: u8,        // 3 bits: will be written with a bias (-1)
    bits_per_sample: u8, // 5 bits: will be written with a bias (-1)
    total_samples: u64,  // 36 bits: Can be zero (unknown)
    md5: [u8; 16],
}

impl StreamInfo {
    /// Constructs new `StreamInfo`.
    ///
    /// For unspecified fields, the following default values are used:
    ///
    /// -  `min_block_size`: [`u16::MAX`],
    /// -  `max_block_size`: `0`,
    /// -  `min_frame_size`: [`u32::MAX`] truncated to 24 bits,
    /// -  `max_frame_size`: `0`,
    /// -  `total_samples`: `0`,
    /// -  `md5_digest`: `[0u8; 16]` (indicating verification disabled.)
    ///
    /// # Errors
    ///
    /// Returns an error if an input argument is out of the supported range.
    ///
    /// # Examples
    ///
    /// ```
    /// # use flacpress::component::*;
    /// let info = StreamInfo::new(16000, 2, 16).unwrap();
    /// assert_eq!(info.max_frame_size(), 0);
    /// assert!(StreamInfo::new(16000, 2, 12).is_err());
    /// ```
    pub fn new(
        sample_rate: usize,
        channels: usize,
        bits_per_sample: usize,
    ) -> Result<Self, VerifyError> {
        let ret = Self {
            min_block_size: u16::MAX,
            max_block_size: 0,
            min_frame_size: 0x00FF_FFFF,
            max_frame_size: 0,
            sample_rate: sample_rate as u32,
            channels: channels as u8,
            bits_per_sample: bits_per_sample as u8,
            total_samples: 0,
            md5: [0; 16],
        };
        ret.verify()?;
        Ok(ret)
    }

    /// Updates `StreamInfo` with values from the given [`Frame`].
    ///
    /// This function updates `{min|max}_{block|frame}_size` and
    /// `total_samples`; MD5 is updated separately via [`Self::set_md5_digest`].
    pub fn update_frame_info(&mut self, frame: &Frame) {
        let block_size = frame.block_size() as u16;
        self.min_block_size = min(block_size, self.min_block_size);
        self.max_block_size = max(block_size, self.max_block_size);
        let frame_size_in_bytes = (frame.count_bits() / 8) as u32;
        self.min_frame_size = min(frame_size_in_bytes, self.min_frame_size);
        self.max_frame_size = max(frame_size_in_bytes, self.max_frame_size);

        self.total_samples += u64::from(block_size);
    }

    /// Returns the minimum frame size in bytes.
    #[inline]
    pub fn min_frame_size(&self) -> usize {
        self.min_frame_size as usize
    }

    /// Returns the maximum frame size in bytes.
    #[inline]
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size as usize
    }

    /// Returns the minimum block size in samples.
    #[inline]
    pub fn min_block_size(&self) -> usize {
        self.min_block_size as usize
    }

    /// Returns the maximum block size in samples.
    #[inline]
    pub fn max_block_size(&self) -> usize {
        self.max_block_size as usize
    }

    /// Returns sampling rate of the stream.
    #[inline]
    pub fn sample_rate(&self) -> usize {
        self.sample_rate as usize
    }

    /// Returns the number of channels of the stream.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels as usize
    }

    /// Returns bits-per-sample of the stream.
    #[inline]
    pub fn bits_per_sample(&self) -> usize {
        self.bits_per_sample as usize
    }

    /// Returns the number of inter-channel samples of the stream.
    #[inline]
    pub fn total_samples(&self) -> usize {
        self.total_samples as usize
    }

    /// Sets the number of inter-channel samples.
    #[inline]
    pub fn set_total_samples(&mut self, n: usize) {
        self.total_samples = n as u64;
    }

    /// Returns md5 digest of the input waveform.
    #[inline]
    pub fn md5_digest(&self) -> &[u8; 16] {
        &self.md5
    }

    /// Resets MD5 digest value by the given slice.
    ///
    /// The digest is computed over the raw little-endian input bytes by
    /// [`Context`], and patched in after all input samples are read.
    ///
    /// [`Context`]: crate::source::Context
    pub fn set_md5_digest(&mut self, digest: &[u8; 16]) {
        self.md5.copy_from_slice(digest);
    }
}

/// 7-bit metadata block types.
///
/// Only `StreamInfo` and `VorbisComment` blocks are ever produced by this
/// encoder; the remaining tags exist for completeness of the format.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum BlockType {
    StreamInfo = 0,
    Padding = 1,
    Application = 2,
    SeekTable = 3,
    VorbisComment = 4,
    CueSheet = 5,
    Picture = 6,
    Forbidden = 127,
}

/// [`METADATA_BLOCK`](https://xiph.org/flac/format.html#metadata_block) component.
#[derive(Clone, Debug)]
pub struct MetadataBlock {
    pub(crate) is_last: bool,
    pub(crate) data: MetadataBlockData,
}

impl MetadataBlock {
    pub(crate) const fn from_parts(is_last: bool, data: MetadataBlockData) -> Self {
        Self { is_last, data }
    }

    pub(crate) const fn from_stream_info(info: StreamInfo, is_last: bool) -> Self {
        Self {
            is_last,
            data: MetadataBlockData::StreamInfo(info),
        }
    }
}

/// Enum that covers the supported variants of `METADATA_BLOCK`.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum MetadataBlockData {
    /// Variant that contains [`StreamInfo`].
    StreamInfo(StreamInfo),
    /// Variant that contains [`VorbisComment`].
    VorbisComment(VorbisComment),
}

impl MetadataBlockData {
    pub(crate) const fn block_type(&self) -> BlockType {
        match self {
            Self::StreamInfo(_) => BlockType::StreamInfo,
            Self::VorbisComment(_) => BlockType::VorbisComment,
        }
    }
}

impl From<StreamInfo> for MetadataBlockData {
    fn from(value: StreamInfo) -> Self {
        Self::StreamInfo(value)
    }
}

impl From<VorbisComment> for MetadataBlockData {
    fn from(value: VorbisComment) -> Self {
        Self::VorbisComment(value)
    }
}

/// [`VORBIS_COMMENT`](https://xiph.org/flac/format.html#metadata_block_vorbis_comment) component.
///
/// Only the vendor string is stored; the user comment list is always empty.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VorbisComment {
    vendor: String,
}

impl VorbisComment {
    /// Constructs `VorbisComment` with the given vendor string.
    pub fn new(vendor: &str) -> Self {
        Self {
            vendor: vendor.to_owned(),
        }
    }

    /// Returns the vendor string.
    #[inline]
    pub fn vendor(&self) -> &str {
        &self.vendor
    }
}

impl Default for VorbisComment {
    fn default() -> Self {
        Self::new(concat!(
            env!("CARGO_PKG_NAME"),
            " ",
            env!("CARGO_PKG_VERSION")
        ))
    }
}

/// [`FRAME`](https://xiph.org/flac/format.html#frame) component.
#[derive(Clone, Debug)]
pub struct Frame {
    header: FrameHeader,
    subframes: Vec<SubFrame>,
}

impl Frame {
    /// Constructs `Frame` from header and subframes.
    ///
    /// # Errors
    ///
    /// Emits error if the number of channels specified in `header` does not
    /// match the length of `subframes`.
    pub fn new<I>(header: FrameHeader, subframes: I) -> Result<Self, VerifyError>
    where
        I: Iterator<Item = SubFrame>,
    {
        let subframes: Vec<SubFrame> = subframes.collect();
        verify_true!(
            "subframes.len()",
            header.channel_assignment().channels() == subframes.len(),
            "must match to the channel specification in the header"
        )?;
        Ok(Self::from_parts(header, subframes))
    }

    /// Constructs `Frame` from [`FrameHeader`] and [`SubFrame`]s.
    #[inline]
    pub(crate) fn from_parts(header: FrameHeader, subframes: Vec<SubFrame>) -> Self {
        Self { header, subframes }
    }

    /// Deconstructs frame and transfers ownership of the data structs.
    #[inline]
    pub fn into_parts(self) -> (FrameHeader, Vec<SubFrame>) {
        (self.header, self.subframes)
    }

    /// Adds a subframe.
    ///
    /// # Panics
    ///
    /// Panics when the number of subframes added exceeded `MAX_CHANNELS`.
    #[inline]
    pub(crate) fn add_subframe(&mut self, subframe: SubFrame) {
        self.subframes.push(subframe);
        assert!(self.subframes.len() <= MAX_CHANNELS);
    }

    /// Returns a reference to [`FrameHeader`] of this frame.
    #[inline]
    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// Returns [`SubFrame`] for the given channel.
    #[inline]
    pub fn subframe(&self, ch: usize) -> Option<&SubFrame> {
        self.subframes.get(ch)
    }

    /// Returns the number of [`SubFrame`]s in this `Frame`.
    #[inline]
    pub fn subframe_count(&self) -> usize {
        self.subframes.len()
    }

    #[inline]
    pub(crate) fn subframes(&self) -> &[SubFrame] {
        &self.subframes
    }

    /// Returns block size of this frame.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.header.block_size()
    }
}

/// Enum for channel assignment in `FRAME_HEADER`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChannelAssignment {
    /// Indicates that the frame contains multiple channels independently.
    ///
    /// The `u8` field indicates the number of channels. This is the only
    /// option if the number of channels is not two.
    Independent(u8),
    /// Indicates that the frame contains left and side channels.
    LeftSide,
    /// Indicates that the frame contains side and right channels.
    RightSide,
    /// Indicates that the frame contains mid and side channels.
    MidSide,
}

impl ChannelAssignment {
    /// Constructs `ChannelAssignment` from the 4-bit tag.
    ///
    /// # Examples
    ///
    /// ```
    /// # use flacpress::component::*;
    /// assert_eq!(
    ///     ChannelAssignment::from_tag(5),
    ///     Some(ChannelAssignment::Independent(6)),
    /// );
    /// assert_eq!(
    ///     ChannelAssignment::from_tag(10),
    ///     Some(ChannelAssignment::MidSide),
    /// );
    /// ```
    #[inline]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        if tag < 8 {
            Some(Self::Independent(tag + 1))
        } else if tag == 8 {
            Some(Self::LeftSide)
        } else if tag == 9 {
            Some(Self::RightSide)
        } else if tag == 10 {
            Some(Self::MidSide)
        } else {
            None
        }
    }

    /// Returns the number of extra bits required to store channel samples.
    ///
    /// A side signal needs one extra bit for values such as
    /// `i32::MAX - i32::MIN`. This function maps `ChannelAssignment` and
    /// channel id `ch` to the number of extra bits required (0 or 1).
    #[inline]
    pub const fn bits_per_sample_offset(&self, ch: usize) -> usize {
        #[allow(clippy::match_same_arms, clippy::bool_to_int_with_if)]
        match *self {
            Self::Independent(_) => 0,
            Self::LeftSide => {
                if ch == 1 {
                    1 // side
                } else {
                    0 // left
                }
            }
            Self::RightSide => {
                if ch == 0 {
                    1 // side
                } else {
                    0 // right
                }
            }
            Self::MidSide => {
                if ch == 1 {
                    1 // side
                } else {
                    0 // mid
                }
            }
        }
    }

    /// Returns the number of channels stored under this assignment.
    #[inline]
    pub(crate) fn channels(&self) -> usize {
        if let Self::Independent(n) = self {
            *n as usize
        } else {
            2
        }
    }
}

/// Enum representing the location of a frame either by a frame count or a
/// starting-sample number.
///
/// `Self::Frame` implies fixed-blocking mode, and `Self::StartSample` implies
/// variable-blocking mode. The stream encoder only emits fixed blocking.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameOffset {
    /// Frame offset specifier based on the number of frames preceding.
    Frame(u32),
    /// Frame offset specifier based on the number of samples preceding.
    StartSample(u64),
}

/// Enum for block size specifier in [`FrameHeader`].
///
/// Refer to the [`FRAME_HEADER`](https://xiph.org/flac/format.html#frame_header)
/// specification for details.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BlockSizeSpec {
    /// Special case when `size == 192`.
    S192,
    /// Size that can be represented as `size = 576 * 2^n` where `n` in `0..=3`.
    Pow2Mul576(u8),
    /// Size that is stored in a byte at the end of [`FrameHeader`].
    ExtraByte(u8),
    /// Size that is stored in two bytes at the end of [`FrameHeader`].
    ExtraTwoBytes(u16),
    /// Size that can be represented as `size = 256 * 2^n` where `n` in `0..=7`.
    Pow2Mul256(u8),
}

impl BlockSizeSpec {
    /// Constructs `BlockSizeSpec` from a block size in samples.
    #[inline]
    pub fn from_size(size: u16) -> Self {
        match size {
            192 => Self::S192,
            576 | 1152 | 2304 | 4608 => Self::Pow2Mul576((size / 576).ilog2() as u8),
            256 | 512 | 1024 | 2048 | 4096 | 8192 | 16384 | 32768 => {
                Self::Pow2Mul256((size / 256).ilog2() as u8)
            }
            x if x <= 256 => Self::ExtraByte((x - 1) as u8),
            x => Self::ExtraTwoBytes(x - 1),
        }
    }

    /// Returns the number of extra bits required to store the specification.
    #[inline]
    pub(crate) const fn count_extra_bits(self) -> usize {
        match self {
            Self::ExtraByte(_) => 8,
            Self::ExtraTwoBytes(_) => 16,
            Self::S192 | Self::Pow2Mul576(_) | Self::Pow2Mul256(_) => 0,
        }
    }

    /// Returns the block size in samples.
    #[inline]
    pub const fn block_size(self) -> usize {
        match self {
            Self::S192 => 192,
            Self::Pow2Mul576(x) => 576usize << x as usize,
            Self::ExtraByte(x) => x as usize + 1,
            Self::ExtraTwoBytes(x) => x as usize + 1,
            Self::Pow2Mul256(x) => 256usize << x as usize,
        }
    }

    /// Returns the 4-bit indicator for the block-size specifier.
    #[inline]
    pub(crate) const fn tag(self) -> u8 {
        match self {
            Self::S192 => 1,
            Self::Pow2Mul576(x) => 2 + x,
            Self::ExtraByte(_) => 6,
            Self::ExtraTwoBytes(_) => 7,
            Self::Pow2Mul256(x) => 8 + x,
        }
    }
}

/// Enum for supported sample sizes.
///
/// Refer to the [`FRAME_HEADER`](https://xiph.org/flac/format.html#frame_header)
/// specification for details.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SampleSizeSpec {
    /// Instructs decoders to get sample size information from `StreamInfo`.
    Unspecified = 0,
    /// 8 bits per sample.
    B8 = 1,
    /// 12 bits per sample (never produced by this encoder).
    B12 = 2,
    /// `tag == 3` is reserved.
    Reserved = 3,
    /// 16 bits per sample.
    B16 = 4,
    /// 20 bits per sample (never produced by this encoder).
    B20 = 5,
    /// 24 bits per sample.
    B24 = 6,
    /// 32 bits per sample.
    B32 = 7,
}

impl SampleSizeSpec {
    /// Constructs `SampleSizeSpec` from the bits-per-sample value.
    #[inline]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            8 => Some(Self::B8),
            12 => Some(Self::B12),
            16 => Some(Self::B16),
            20 => Some(Self::B20),
            24 => Some(Self::B24),
            32 => Some(Self::B32),
            _ => None,
        }
    }

    /// Returns the tag (an integer in the bitstream) corresponding to `self`.
    #[inline]
    pub const fn into_tag(self) -> u8 {
        self as u8
    }

    /// Returns the bits-per-sample value corresponding to `self`.
    #[inline]
    pub const fn into_bits(self) -> Option<u8> {
        match self {
            Self::Unspecified | Self::Reserved => None,
            Self::B8 => Some(8),
            Self::B12 => Some(12),
            Self::B16 => Some(16),
            Self::B20 => Some(20),
            Self::B24 => Some(24),
            Self::B32 => Some(32),
        }
    }
}

/// Enum for supported sampling rates.
///
/// Refer to the [`FRAME_HEADER`](https://xiph.org/flac/format.html#frame_header)
/// specification for details.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SampleRateSpec {
    /// Instructs decoders to get sample rate information from `StreamInfo`.
    Unspecified,
    /// 88.2kHz.
    R88_2kHz,
    /// 176.4kHz.
    R176_4kHz,
    /// 192kHz.
    R192kHz,
    /// 8kHz.
    R8kHz,
    /// 16kHz.
    R16kHz,
    /// 22.05kHz.
    R22_05kHz,
    /// 24kHz.
    R24kHz,
    /// 32kHz.
    R32kHz,
    /// 44.1kHz.
    R44_1kHz,
    /// 48kHz.
    R48kHz,
    /// 96kHz.
    R96kHz,
    /// An immediate value specifying kHz up to 255kHz.
    KHz(u8),
    /// An immediate value specifying Hz up to 65535Hz.
    Hz(u16),
    /// An immediate value specifying deca-Hz up to 655.35kHz.
    DaHz(u16),
}

impl SampleRateSpec {
    /// Constructs `SampleRateSpec` from frequency in Hz.
    ///
    /// Non-table frequencies try `KHz`, `DaHz`, and `Hz` immediates in this
    /// order; a frequency representable by none of them falls back to
    /// `Unspecified`, instructing decoders to use `StreamInfo`.
    #[inline]
    pub fn from_freq(freq: u32) -> Self {
        match freq {
            88_200 => Some(Self::R88_2kHz),
            176_400 => Some(Self::R176_4kHz),
            192_000 => Some(Self::R192kHz),
            8_000 => Some(Self::R8kHz),
            16_000 => Some(Self::R16kHz),
            22_050 => Some(Self::R22_05kHz),
            24_000 => Some(Self::R24kHz),
            32_000 => Some(Self::R32kHz),
            44_100 => Some(Self::R44_1kHz),
            48_000 => Some(Self::R48kHz),
            96_000 => Some(Self::R96kHz),
            _ => None,
        }
        .or_else(|| {
            (0 == freq % 1000)
                .then(|| (freq / 1000).try_into().ok().map(Self::KHz))
                .flatten()
        })
        .or_else(|| {
            (0 == freq % 10)
                .then(|| (freq / 10).try_into().ok().map(Self::DaHz))
                .flatten()
        })
        .or_else(|| freq.try_into().ok().map(Self::Hz))
        .unwrap_or(Self::Unspecified)
    }

    /// Returns the number of extra bits required to store the specification.
    #[inline]
    pub(crate) const fn count_extra_bits(self) -> usize {
        match self {
            Self::KHz(_) => 8,
            Self::DaHz(_) | Self::Hz(_) => 16,
            Self::Unspecified
            | Self::R88_2kHz
            | Self::R176_4kHz
            | Self::R192kHz
            | Self::R8kHz
            | Self::R16kHz
            | Self::R22_05kHz
            | Self::R24kHz
            | Self::R32kHz
            | Self::R44_1kHz
            | Self::R48kHz
            | Self::R96kHz => 0,
        }
    }

    /// Returns the 4-bit indicator for the sample-rate specifier.
    #[inline]
    pub(crate) const fn tag(self) -> u8 {
        match self {
            Self::Unspecified => 0,
            Self::R88_2kHz => 1,
            Self::R176_4kHz => 2,
            Self::R192kHz => 3,
            Self::R8kHz => 4,
            Self::R16kHz => 5,
            Self::R22_05kHz => 6,
            Self::R24kHz => 7,
            Self::R32kHz => 8,
            Self::R44_1kHz => 9,
            Self::R48kHz => 10,
            Self::R96kHz => 11,
            Self::KHz(_) => 12,
            Self::Hz(_) => 13,
            Self::DaHz(_) => 14,
        }
    }
}

/// [`FRAME_HEADER`](https://xiph.org/flac/format.html#frame_header) component.
#[derive(Clone, Debug)]
pub struct FrameHeader {
    variable_block_size: bool, // must be same in all frames
    block_size_spec: BlockSizeSpec,
    channel_assignment: ChannelAssignment,
    sample_size_spec: SampleSizeSpec,
    sample_rate_spec: SampleRateSpec,
    frame_number: u32,        // written when variable_block_size == false
    start_sample_number: u64, // written when variable_block_size == true
}

impl FrameHeader {
    /// Constructs `FrameHeader` from the given stream metadata.
    ///
    /// # Errors
    ///
    /// Returns error when `block_size` or `bits_per_sample` is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// # use flacpress::component::*;
    /// let header = FrameHeader::new(
    ///     192, ChannelAssignment::Independent(1), 8, 44100, FrameOffset::Frame(0)
    /// ).unwrap();
    /// assert_eq!(header.block_size(), 192);
    /// ```
    #[inline]
    pub fn new(
        block_size: usize,
        channel_assignment: ChannelAssignment,
        bits_per_sample: usize,
        sample_rate: usize,
        offset: FrameOffset,
    ) -> Result<Self, VerifyError> {
        verify_block_size!("block_size", block_size)?;
        let block_size_spec = BlockSizeSpec::from_size(block_size as u16);
        let sample_size_spec =
            SampleSizeSpec::from_bits(bits_per_sample as u8).ok_or_else(|| {
                VerifyError::new("bits_per_sample", "must be one of a supported value.")
            })?;
        channel_assignment.verify()?;
        let sample_rate_spec = SampleRateSpec::from_freq(sample_rate as u32);
        let mut ret = Self {
            variable_block_size: false,
            block_size_spec,
            channel_assignment,
            sample_size_spec,
            sample_rate_spec,
            frame_number: 0,
            start_sample_number: 0,
        };
        ret.set_frame_offset(offset);
        Ok(ret)
    }

    #[inline]
    pub(crate) const fn is_variable_blocking(&self) -> bool {
        self.variable_block_size
    }

    /// Sets the location of frame.
    #[inline]
    pub fn set_frame_offset(&mut self, offset: FrameOffset) {
        match offset {
            FrameOffset::Frame(n) => {
                self.variable_block_size = false;
                self.frame_number = n;
            }
            FrameOffset::StartSample(n) => {
                self.variable_block_size = true;
                self.start_sample_number = n;
            }
        }
    }

    #[inline]
    pub(crate) const fn frame_number(&self) -> u32 {
        self.frame_number
    }

    #[inline]
    pub(crate) const fn start_sample_number(&self) -> u64 {
        self.start_sample_number
    }

    #[inline]
    pub(crate) const fn sample_rate_spec(&self) -> SampleRateSpec {
        self.sample_rate_spec
    }

    #[inline]
    pub(crate) const fn sample_size_spec(&self) -> SampleSizeSpec {
        self.sample_size_spec
    }

    #[inline]
    pub(crate) const fn block_size_spec(&self) -> BlockSizeSpec {
        self.block_size_spec
    }

    /// Returns block size.
    #[inline]
    pub const fn block_size(&self) -> usize {
        self.block_size_spec.block_size()
    }

    /// Returns bits-per-sample, when the header specifies it.
    #[inline]
    pub fn bits_per_sample(&self) -> Option<usize> {
        self.sample_size_spec.into_bits().map(|x| x as usize)
    }

    /// Returns [`ChannelAssignment`] of this frame.
    #[inline]
    pub const fn channel_assignment(&self) -> &ChannelAssignment {
        &self.channel_assignment
    }
}

/// [`SUBFRAME`](https://xiph.org/flac/format.html#subframe) component.
#[derive(Clone, Debug)]
pub enum SubFrame {
    /// This variant contains [`Constant`] sub-frame.
    Constant(Constant),
    /// This variant contains [`Verbatim`] sub-frame.
    Verbatim(Verbatim),
    /// This variant contains [`Fixed`] sub-frame.
    Fixed(Fixed),
}

impl From<Constant> for SubFrame {
    fn from(c: Constant) -> Self {
        Self::Constant(c)
    }
}

impl From<Verbatim> for SubFrame {
    fn from(c: Verbatim) -> Self {
        Self::Verbatim(c)
    }
}

impl From<Fixed> for SubFrame {
    fn from(c: Fixed) -> Self {
        Self::Fixed(c)
    }
}

/// [`SUBFRAME_CONSTANT`](https://xiph.org/flac/format.html#subframe_constant) component.
///
/// Sample values are stored widened to `i64` so that 33-bit side-channel
/// signals fit; plain channels only ever use the `i32` range.
#[derive(Clone, Debug)]
pub struct Constant {
    block_size: usize,
    dc_offset: i64,
    bits_per_sample: u8,
}

impl Constant {
    /// Constructs new `Constant`.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError` if an argument is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// # use flacpress::bitsink::*;
    /// # use flacpress::component::*;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let subframe = Constant::new(1024, 3, 16)?;
    /// let mut sink = ByteSink::new();
    /// subframe.write(&mut sink)?;
    /// assert_eq!(sink.as_slice(), [
    ///     0x00, /* tag */
    ///     0x00, 0x03, /* 16 bits written from MSB to LSB */
    /// ]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(block_size: usize, dc_offset: i64, bits_per_sample: usize) -> Result<Self, VerifyError> {
        verify_block_size!("block_size", block_size)?;
        verify_bps!("bits_per_sample", bits_per_sample)?;
        verify_sample_range!("dc_offset", dc_offset, bits_per_sample)?;
        Ok(Self::from_parts(
            block_size,
            dc_offset,
            bits_per_sample as u8,
        ))
    }

    /// Constructs new `Constant`. (unverified version)
    #[inline]
    pub(crate) const fn from_parts(block_size: usize, dc_offset: i64, bits_per_sample: u8) -> Self {
        Self {
            block_size,
            dc_offset,
            bits_per_sample,
        }
    }

    /// Returns block size.
    #[inline]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the constant value of this block.
    #[inline]
    pub const fn dc_offset(&self) -> i64 {
        self.dc_offset
    }

    /// Returns bits-per-sample.
    #[inline]
    pub const fn bits_per_sample(&self) -> usize {
        self.bits_per_sample as usize
    }
}

/// [`SUBFRAME_VERBATIM`](https://xiph.org/flac/format.html#subframe_verbatim) component.
#[derive(Clone, Debug)]
pub struct Verbatim {
    data: Vec<i64>,
    bits_per_sample: u8,
}

impl Verbatim {
    /// Constructs new `Verbatim`.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError` if an argument is invalid.
    pub fn new(samples: &[i64], bits_per_sample: usize) -> Result<Self, VerifyError> {
        verify_block_size!("samples.len", samples.len())?;
        verify_bps!("bits_per_sample", bits_per_sample)?;
        for v in samples {
            verify_sample_range!("samples", *v, bits_per_sample)?;
        }
        Ok(Self::from_parts(
            Vec::from(samples),
            bits_per_sample as u8,
        ))
    }

    /// Constructs new `Verbatim`. (unverified version)
    pub(crate) fn from_parts(samples: Vec<i64>, bits_per_sample: u8) -> Self {
        Self {
            data: samples,
            bits_per_sample,
        }
    }

    /// Returns the bit count from the sizes only.
    #[inline]
    pub(crate) const fn count_bits_from_metadata(
        block_size: usize,
        bits_per_sample: usize,
    ) -> usize {
        8 + block_size * bits_per_sample
    }

    /// Returns a slice of the verbatim samples.
    #[inline]
    pub fn samples(&self) -> &[i64] {
        &self.data
    }

    /// Returns bits-per-sample.
    #[inline]
    pub const fn bits_per_sample(&self) -> usize {
        self.bits_per_sample as usize
    }
}

/// [`SUBFRAME_FIXED`](https://xiph.org/flac/format.html#subframe_fixed) component.
#[derive(Clone, Debug)]
pub struct Fixed {
    warm_up: heapless::Vec<i64, MAX_FIXED_ORDER>,
    residual: Residual,
    bits_per_sample: u8,
}

impl Fixed {
    /// Constructs new `Fixed`.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError` if an argument is invalid.
    pub fn new(
        warm_up: &[i64],
        residual: Residual,
        bits_per_sample: usize,
    ) -> Result<Self, VerifyError> {
        verify_bps!("bits_per_sample", bits_per_sample)?;
        for v in warm_up {
            verify_sample_range!("warm_up", *v, bits_per_sample)?;
        }
        let warm_up = heapless::Vec::from_slice(warm_up).map_err(|()| {
            VerifyError::new("warm_up", "must be shorter than (or equal to) 4")
        })?;
        verify_true!(
            "warm_up.len()",
            warm_up.len() == residual.warmup_length(),
            "must match the warm-up length of the residual"
        )?;
        Ok(Self::from_parts(warm_up, residual, bits_per_sample as u8))
    }

    /// Constructs `Fixed`. (unverified version)
    #[inline]
    pub(crate) fn from_parts(
        warm_up: heapless::Vec<i64, MAX_FIXED_ORDER>,
        residual: Residual,
        bits_per_sample: u8,
    ) -> Self {
        Self {
            warm_up,
            residual,
            bits_per_sample,
        }
    }

    /// Returns the predictor order.
    #[inline]
    pub fn order(&self) -> usize {
        self.warm_up.len()
    }

    /// Returns warm-up samples as a slice.
    #[inline]
    pub fn warm_up(&self) -> &[i64] {
        &self.warm_up
    }

    /// Returns a reference to the internal [`Residual`] component.
    #[inline]
    pub const fn residual(&self) -> &Residual {
        &self.residual
    }

    /// Returns bits-per-sample.
    #[inline]
    pub const fn bits_per_sample(&self) -> usize {
        self.bits_per_sample as usize
    }
}

/// [`RESIDUAL`](https://xiph.org/flac/format.html#residual) component.
///
/// Owns the raw residual signal together with the partitioned-rice layout
/// chosen for it. The first `warmup_length` entries of `residuals` are
/// zero placeholders; warm-up samples are stored in the enclosing
/// [`Fixed`] component and written at the subframe sample size.
#[derive(Clone, Debug)]
pub struct Residual {
    method: RiceMethod,
    partition_order: u8,
    block_size: usize,
    warmup_length: usize,
    rice_params: Vec<u8>,
    residuals: Vec<i32>,
    // Exact coded size, computed on construction.
    code_bits: usize,
}

impl Residual {
    /// Constructs `Residual` from parts, verifying the layout.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError` if an argument is invalid.
    pub fn new(
        method: RiceMethod,
        partition_order: usize,
        warmup_length: usize,
        rice_params: &[u8],
        residuals: &[i32],
    ) -> Result<Self, VerifyError> {
        let ret = Self::from_parts(
            method,
            partition_order as u8,
            residuals.len(),
            warmup_length,
            rice_params.to_owned(),
            residuals.to_owned(),
        );
        ret.verify()?;
        Ok(ret)
    }

    /// Constructs `Residual` with consuming parts.
    #[inline]
    pub(crate) fn from_parts(
        method: RiceMethod,
        partition_order: u8,
        block_size: usize,
        warmup_length: usize,
        rice_params: Vec<u8>,
        residuals: Vec<i32>,
    ) -> Self {
        debug_assert!(rice_params.len() == 1usize << partition_order as usize);
        debug_assert!(residuals.len() == block_size);

        let mut ret = Self {
            method,
            partition_order,
            block_size,
            warmup_length,
            rice_params,
            residuals,
            code_bits: 0,
        };
        ret.code_bits = ret.count_code_bits();
        ret
    }

    /// Computes the exact coded size in bits.
    fn count_code_bits(&self) -> usize {
        let nparts = 1usize << self.partition_order;
        let part_size = self.block_size >> self.partition_order;
        let mut ret = 2 + 4 + nparts * self.method.parameter_bits();
        for (p, rice_p) in self.rice_params.iter().enumerate() {
            let end = (p + 1) * part_size;
            let start = min(max(p * part_size, self.warmup_length), end);
            let rice_p = u32::from(*rice_p);
            for t in start..end {
                let quotient = rice::encode_signbit(self.residuals[t]) >> rice_p;
                ret += quotient as usize + 1 + rice_p as usize;
            }
        }
        ret
    }

    /// Returns the coding method (parameter field width).
    #[inline]
    pub const fn method(&self) -> RiceMethod {
        self.method
    }

    /// Returns the partition order for the PRC.
    #[inline]
    pub const fn partition_order(&self) -> usize {
        self.partition_order as usize
    }

    /// Returns the rice parameter for the `p`-th partition.
    #[inline]
    pub fn rice_parameter(&self, p: usize) -> usize {
        self.rice_params[p] as usize
    }

    /// Returns the residual value for the `t`-th sample.
    ///
    /// Entries below the warm-up length are zero placeholders.
    #[inline]
    pub fn residual(&self, t: usize) -> i32 {
        self.residuals[t]
    }

    /// Returns the block size of this `Residual`.
    #[inline]
    pub(crate) const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the warm-up length of this `Residual`.
    #[inline]
    pub(crate) const fn warmup_length(&self) -> usize {
        self.warmup_length
    }

    #[inline]
    pub(crate) fn rice_params(&self) -> &[u8] {
        &self.rice_params
    }

    #[inline]
    pub(crate) fn residuals(&self) -> &[i32] {
        &self.residuals
    }

    #[inline]
    pub(crate) const fn code_bits(&self) -> usize {
        self.code_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::BitRepr;

    #[test]
    fn channel_assignment_is_small_enough() {
        let size = std::mem::size_of::<ChannelAssignment>();
        assert_eq!(size, 2);
    }

    #[test]
    fn block_size_spec_covers_common_sizes() {
        assert_eq!(BlockSizeSpec::from_size(192), BlockSizeSpec::S192);
        assert_eq!(BlockSizeSpec::from_size(576), BlockSizeSpec::Pow2Mul576(0));
        assert_eq!(BlockSizeSpec::from_size(4608), BlockSizeSpec::Pow2Mul576(3));
        assert_eq!(BlockSizeSpec::from_size(256), BlockSizeSpec::Pow2Mul256(0));
        assert_eq!(BlockSizeSpec::from_size(4096), BlockSizeSpec::Pow2Mul256(4));
        assert_eq!(BlockSizeSpec::from_size(32768), BlockSizeSpec::Pow2Mul256(7));
        assert_eq!(BlockSizeSpec::from_size(10), BlockSizeSpec::ExtraByte(9));
        assert_eq!(BlockSizeSpec::from_size(1200), BlockSizeSpec::ExtraTwoBytes(1199));
        for size in [1u16, 10, 192, 576, 1200, 4096, 32768, 65535] {
            assert_eq!(BlockSizeSpec::from_size(size).block_size(), size as usize);
        }
    }

    #[test]
    fn sample_rate_spec_prefers_table_entries() {
        assert_eq!(SampleRateSpec::from_freq(44100), SampleRateSpec::R44_1kHz);
        assert_eq!(SampleRateSpec::from_freq(48000), SampleRateSpec::R48kHz);
        assert_eq!(SampleRateSpec::from_freq(11000), SampleRateSpec::KHz(11));
        assert_eq!(SampleRateSpec::from_freq(44110), SampleRateSpec::DaHz(4411));
        assert_eq!(SampleRateSpec::from_freq(44111), SampleRateSpec::Hz(44111));
        // over DaHz range and not on a kHz grid: resolved via StreamInfo.
        assert_eq!(
            SampleRateSpec::from_freq(1_000_001),
            SampleRateSpec::Unspecified
        );
    }

    #[test]
    fn stream_info_rejects_unsupported_formats() {
        assert!(StreamInfo::new(44100, 2, 16).is_ok());
        assert!(StreamInfo::new(44100, 0, 16).is_err());
        assert!(StreamInfo::new(44100, 9, 16).is_err());
        assert!(StreamInfo::new(44100, 2, 12).is_err());
        assert!(StreamInfo::new(1 << 20, 2, 16).is_err());
        assert!(StreamInfo::new((1 << 20) - 1, 2, 32).is_ok());
    }

    #[test]
    fn stream_info_tracks_frame_extremes() {
        let mut info = StreamInfo::new(44100, 1, 16).unwrap();
        let header = |bs: usize| {
            FrameHeader::new(
                bs,
                ChannelAssignment::Independent(1),
                16,
                44100,
                FrameOffset::Frame(0),
            )
            .unwrap()
        };
        let frame_small = Frame::from_parts(
            header(64),
            vec![Constant::from_parts(64, 0, 16).into()],
        );
        let frame_large = Frame::from_parts(
            header(4096),
            vec![Verbatim::from_parts(vec![0i64; 4096], 16).into()],
        );
        info.update_frame_info(&frame_small);
        info.update_frame_info(&frame_large);
        assert_eq!(info.min_block_size(), 64);
        assert_eq!(info.max_block_size(), 4096);
        assert_eq!(info.min_frame_size(), frame_small.count_bits() / 8);
        assert_eq!(info.max_frame_size(), frame_large.count_bits() / 8);
        assert_eq!(info.total_samples(), 64 + 4096);
    }

    #[test]
    fn residual_counts_exact_bits() {
        // two partitions with parameters 0 and 1 over eight residuals.
        let residuals = vec![0i32, 1, -1, 2, 1, 1, -2, 0];
        let r = Residual::new(RiceMethod::Bits4, 1, 0, &[0, 1], &residuals).unwrap();
        // header: 2 + 4; parameters: 2 * 4.
        // partition 0 (k=0): zigzags [0, 2, 1, 4] -> quotients 0,2,1,4 + 4 stops
        // partition 1 (k=1): zigzags [2, 2, 3, 0] -> quotients 1,1,1,0 + 4 stops + 4 remainder bits
        assert_eq!(r.code_bits(), 2 + 4 + 8 + (7 + 4) + (3 + 4 + 4));
    }

    #[test]
    fn default_vendor_carries_crate_version() {
        let vorbis = VorbisComment::default();
        assert!(vorbis.vendor().starts_with("flacpress "));
    }
}
