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

use super::super::bitsink::BitSink;
use super::super::bitsink::ByteSink;
use super::super::error::OutputError;
use super::super::error::RangeError;

use super::datatype::BlockSizeSpec;
use super::datatype::ChannelAssignment;
use super::datatype::Constant;
use super::datatype::Fixed;
use super::datatype::Frame;
use super::datatype::FrameHeader;
use super::datatype::MetadataBlock;
use super::datatype::MetadataBlockData;
use super::datatype::Residual;
use super::datatype::SampleRateSpec;
use super::datatype::StreamInfo;
use super::datatype::SubFrame;
use super::datatype::Verbatim;
use super::datatype::VorbisComment;

use crate::constant::panic_msg;
use crate::constant::rice::ESCAPE_PARAMETER;
use crate::rice;

const CRC_8_FLAC: crc::Algorithm<u8> = crc::CRC_8_SMBUS;
const CRC_16_FLAC: crc::Algorithm<u16> = crc::CRC_16_UMTS;

/// CRC-8 (polynomial 0x07) covering the frame header up to its own byte.
pub static HEADER_CRC: crc::Crc<u8, crc::Table<16>> =
    crc::Crc::<u8, crc::Table<16>>::new(&CRC_8_FLAC);

/// CRC-16 (polynomial 0x8005) covering the whole frame including the CRC-8.
pub static FRAME_CRC: crc::Crc<u16, crc::Table<16>> =
    crc::Crc::<u16, crc::Table<16>>::new(&CRC_16_FLAC);

pub mod seal_bit_repr {
    pub trait Sealed {}
    impl Sealed for super::MetadataBlock {}
    impl Sealed for super::MetadataBlockData {}
    impl Sealed for super::StreamInfo {}
    impl Sealed for super::VorbisComment {}
    impl Sealed for super::Frame {}
    impl Sealed for super::FrameHeader {}
    impl Sealed for super::ChannelAssignment {}
    impl Sealed for super::SubFrame {}
    impl Sealed for super::Constant {}
    impl Sealed for super::Fixed {}
    impl Sealed for super::Verbatim {}
    impl Sealed for super::Residual {}
}

/// FLAC components that can be represented in a bit sequence.
pub trait BitRepr: seal_bit_repr::Sealed {
    /// Counts the number of bits required to store the component.
    fn count_bits(&self) -> usize;

    /// Writes the bit sequence to `BitSink`.
    ///
    /// # Errors
    ///
    /// This function returns error if `self` contains an invalid value that
    /// does not fit to FLAC's bitstream format, or if a `BitSink` method
    /// returned an error.
    fn write<S: BitSink>(&self, dest: &mut S) -> Result<(), OutputError<S>>;

    /// Test utility for obtaining bits as a [`Vec`] of [`u8`].
    #[cfg(test)]
    fn to_bytes(&self) -> Vec<u8> {
        let mut sink = ByteSink::new();
        self.write(&mut sink).expect("No error expected");
        sink.into_inner()
    }

    /// Test utility for obtaining bits as eight-bit separated `String`.
    #[cfg(test)]
    fn to_bitstring(&self) -> String {
        let mut sink = ByteSink::new();
        self.write(&mut sink).expect("No error expected");
        sink.to_bitstring()
    }

    /// Checks if the number of bits actually written equals [`Self::count_bits`].
    ///
    /// # Errors
    ///
    /// Returns `Err((expected_bits, actual_bits))` on a mismatch.
    #[cfg(test)]
    fn verify_bit_counter(&self) -> Result<usize, (usize, usize)> {
        let expected = self.count_bits();
        let mut sink = ByteSink::new();
        self.write(&mut sink).expect("No error expected");
        if expected == sink.len() {
            Ok(expected)
        } else {
            Err((expected, sink.len()))
        }
    }
}

/// Lookup table for `encode_to_utf8like`.
const UTF8_HEADS: [u8; 7] = [0x80, 0xC0, 0xE0, 0xF0, 0xF8, 0xFC, 0xFE];

/// Encodes the given integer into UTF-8-like byte sequence.
///
/// # Errors
///
/// It returns an error if `val` exceeds 36 bits.
#[inline]
pub fn encode_to_utf8like(val: u64) -> Result<heapless::Vec<u8, 7>, RangeError> {
    let val_size = u64::BITS as usize;
    let code_bits: usize = val_size - val.leading_zeros() as usize;
    let mut ret = heapless::Vec::new();
    if code_bits <= 7 {
        ret.push(val as u8).unwrap();
    } else if code_bits > 36 {
        return Err(RangeError::from_display(
            "input",
            "cannot exceed 36 bits.",
            &val,
        ));
    } else {
        // A sequence of n trailing bytes carries 6n bits plus 6 - n bits in
        // the head byte.
        let trailing_bytes: usize = (code_bits - 2) / 5;
        debug_assert!((1..=6).contains(&trailing_bytes));
        let capacity = trailing_bytes * 6 + 6 - trailing_bytes;
        debug_assert!(capacity >= code_bits);

        let first_bits = 6 - trailing_bytes;
        let mut val = val << (val_size - capacity);
        let head_byte: u8 = if trailing_bytes == 6 {
            0xFEu8
        } else {
            UTF8_HEADS[trailing_bytes] | ((val >> (64 - first_bits)) & 0xFF) as u8
        };
        ret.push(head_byte).unwrap();
        val <<= first_bits;

        for _i in 0..trailing_bytes {
            let b = 0x80u8 | (val >> 58) as u8;
            ret.push(b).unwrap();
            val <<= 6;
        }
    }
    Ok(ret)
}

/// Computes the number of bytes required for UTF-8-like encoding of `val`.
const fn utf8like_bytesize(val: u64) -> usize {
    let val_size = u64::BITS as usize;
    let code_bits: usize = val_size - val.leading_zeros() as usize;
    if code_bits <= 7 {
        1
    } else {
        1 + (code_bits - 2) / 5
    }
}

impl BitRepr for MetadataBlock {
    #[inline]
    fn count_bits(&self) -> usize {
        // The 32 bits of `METADATA_BLOCK_HEADER` are accounted here; the
        // inner `count_bits` only covers the payload.
        32 + self.data.count_bits()
    }

    fn write<S: BitSink>(&self, dest: &mut S) -> Result<(), OutputError<S>> {
        let type_byte: u8 =
            self.data.block_type() as u8 + if self.is_last { 0x80 } else { 0x00 };
        dest.write(type_byte).map_err(OutputError::<S>::from_sink)?;
        let data_size: u32 = (self.data.count_bits() / 8) as u32;
        dest.write_lsbs(data_size, 24)
            .map_err(OutputError::<S>::from_sink)?;
        self.data.write(dest)?;
        Ok(())
    }
}

impl BitRepr for MetadataBlockData {
    #[inline]
    fn count_bits(&self) -> usize {
        match self {
            Self::StreamInfo(info) => info.count_bits(),
            Self::VorbisComment(comment) => comment.count_bits(),
        }
    }

    fn write<S: BitSink>(&self, dest: &mut S) -> Result<(), OutputError<S>> {
        match self {
            Self::StreamInfo(info) => info.write(dest),
            Self::VorbisComment(comment) => comment.write(dest),
        }
    }
}

impl BitRepr for StreamInfo {
    #[inline]
    fn count_bits(&self) -> usize {
        crate::constant::STREAM_INFO_SIZE * 8
    }

    fn write<S: BitSink>(&self, dest: &mut S) -> Result<(), OutputError<S>> {
        dest.write::<u16>(self.min_block_size() as u16)
            .map_err(OutputError::<S>::from_sink)?;
        dest.write::<u16>(self.max_block_size() as u16)
            .map_err(OutputError::<S>::from_sink)?;
        dest.write_lsbs(self.min_frame_size() as u32, 24)
            .map_err(OutputError::<S>::from_sink)?;
        dest.write_lsbs(self.max_frame_size() as u32, 24)
            .map_err(OutputError::<S>::from_sink)?;
        dest.write_lsbs(self.sample_rate() as u32, 20)
            .map_err(OutputError::<S>::from_sink)?;
        dest.write_lsbs((self.channels() - 1) as u8, 3)
            .map_err(OutputError::<S>::from_sink)?;
        dest.write_lsbs((self.bits_per_sample() - 1) as u8, 5)
            .map_err(OutputError::<S>::from_sink)?;
        dest.write_lsbs(self.total_samples() as u64, 36)
            .map_err(OutputError::<S>::from_sink)?;
        dest.write_bytes_aligned(self.md5_digest())
            .map_err(OutputError::<S>::from_sink)?;
        Ok(())
    }
}

impl BitRepr for VorbisComment {
    #[inline]
    fn count_bits(&self) -> usize {
        (4 + self.vendor().len() + 4) * 8
    }

    fn write<S: BitSink>(&self, dest: &mut S) -> Result<(), OutputError<S>> {
        // Vorbis comments use little-endian length fields, unlike the rest of
        // the FLAC bitstream.
        dest.write_bytes_aligned(&(self.vendor().len() as u32).to_le_bytes())
            .map_err(OutputError::<S>::from_sink)?;
        dest.write_bytes_aligned(self.vendor().as_bytes())
            .map_err(OutputError::<S>::from_sink)?;
        dest.write_bytes_aligned(&0u32.to_le_bytes())
            .map_err(OutputError::<S>::from_sink)?;
        Ok(())
    }
}

reusable!(FRAME_STAGE_BUFFER: ByteSink = ByteSink::new());

impl BitRepr for Frame {
    #[inline]
    fn count_bits(&self) -> usize {
        let header = self.header().count_bits();
        let body: usize = self.subframes().iter().map(BitRepr::count_bits).sum();

        let aligned = ((header + body + 7) >> 3) << 3;
        let footer = 16;
        aligned + footer
    }

    fn write<S: BitSink>(&self, dest: &mut S) -> Result<(), OutputError<S>> {
        reuse!(FRAME_STAGE_BUFFER, |frame_sink: &mut ByteSink| {
            frame_sink.clear();
            frame_sink.reserve(self.count_bits());

            self.header()
                .write(frame_sink)
                .map_err(OutputError::<S>::ignore_sink_error)?;
            for sub in self.subframes() {
                sub.write(frame_sink)
                    .map_err(OutputError::<S>::ignore_sink_error)?;
            }
            frame_sink.align_to_byte().unwrap();

            dest.write_bytes_aligned(frame_sink.as_slice())
                .map_err(OutputError::<S>::from_sink)?;
            dest.write(FRAME_CRC.checksum(frame_sink.as_slice()))
                .map_err(OutputError::<S>::from_sink)
        })
    }
}

impl BitRepr for ChannelAssignment {
    #[inline]
    fn count_bits(&self) -> usize {
        4
    }

    fn write<S: BitSink>(&self, dest: &mut S) -> Result<(), OutputError<S>> {
        match *self {
            Self::Independent(ch) => {
                if ch > 8 {
                    return Err(RangeError::from_display("#channel", "cannot exceed 8", &ch).into());
                }
                dest.write_lsbs(ch - 1, 4)
                    .map_err(OutputError::<S>::from_sink)?;
            }
            Self::LeftSide => {
                dest.write_lsbs(0x8u64, 4)
                    .map_err(OutputError::<S>::from_sink)?;
            }
            Self::RightSide => {
                dest.write_lsbs(0x9u64, 4)
                    .map_err(OutputError::<S>::from_sink)?;
            }
            Self::MidSide => {
                dest.write_lsbs(0xAu64, 4)
                    .map_err(OutputError::<S>::from_sink)?;
            }
        }
        Ok(())
    }
}

reusable!(HEADER_STAGE_BUFFER: ByteSink = ByteSink::new());

impl BitRepr for FrameHeader {
    #[inline]
    fn count_bits(&self) -> usize {
        let mut ret = 40;
        if self.is_variable_blocking() {
            ret += 8 * utf8like_bytesize(self.start_sample_number());
        } else {
            ret += 8 * utf8like_bytesize(u64::from(self.frame_number()));
        }
        ret += self.block_size_spec().count_extra_bits();
        ret += self.sample_rate_spec().count_extra_bits();
        ret
    }

    fn write<S: BitSink>(&self, dest: &mut S) -> Result<(), OutputError<S>> {
        reuse!(HEADER_STAGE_BUFFER, |header_buffer: &mut ByteSink| {
            header_buffer.clear();
            header_buffer.reserve(self.count_bits());

            // sync-code + reserved 1-bit + blocking-strategy indicator
            let header_word = 0xFFF8u16 + u16::from(self.is_variable_blocking());
            header_buffer.write_lsbs(header_word, 16).unwrap();

            // block-size tag + 4-bit sample-rate tag
            header_buffer
                .write_lsbs(
                    self.block_size_spec().tag() << 4 | self.sample_rate_spec().tag(),
                    8,
                )
                .unwrap();
            self.channel_assignment()
                .write(header_buffer)
                .map_err(OutputError::<S>::ignore_sink_error)?;

            // sample-size tag + 1-bit reserved (zero)
            header_buffer
                .write_lsbs(self.sample_size_spec().into_tag() << 1, 4)
                .unwrap();

            if self.is_variable_blocking() {
                let v = encode_to_utf8like(self.start_sample_number())?;
                header_buffer.write_bytes_aligned(&v).unwrap();
            } else {
                let v = encode_to_utf8like(self.frame_number().into())?;
                header_buffer.write_bytes_aligned(&v).unwrap();
            }
            match self.block_size_spec() {
                BlockSizeSpec::ExtraByte(v) => header_buffer.write_lsbs(v, 8).unwrap(),
                BlockSizeSpec::ExtraTwoBytes(v) => header_buffer.write_lsbs(v, 16).unwrap(),
                BlockSizeSpec::S192
                | BlockSizeSpec::Pow2Mul576(_)
                | BlockSizeSpec::Pow2Mul256(_) => {}
            }
            match self.sample_rate_spec() {
                SampleRateSpec::KHz(v) => header_buffer.write_lsbs(v, 8).unwrap(),
                SampleRateSpec::DaHz(v) | SampleRateSpec::Hz(v) => {
                    header_buffer.write_lsbs(v, 16).unwrap();
                }
                SampleRateSpec::Unspecified
                | SampleRateSpec::R88_2kHz
                | SampleRateSpec::R176_4kHz
                | SampleRateSpec::R192kHz
                | SampleRateSpec::R8kHz
                | SampleRateSpec::R16kHz
                | SampleRateSpec::R22_05kHz
                | SampleRateSpec::R24kHz
                | SampleRateSpec::R32kHz
                | SampleRateSpec::R44_1kHz
                | SampleRateSpec::R48kHz
                | SampleRateSpec::R96kHz => {}
            }

            dest.write_bytes_aligned(header_buffer.as_slice())
                .map_err(OutputError::<S>::from_sink)?;
            dest.write(HEADER_CRC.checksum(header_buffer.as_slice()))
                .map_err(OutputError::<S>::from_sink)?;
            Ok(())
        })
    }
}

impl BitRepr for SubFrame {
    #[inline]
    fn count_bits(&self) -> usize {
        match self {
            Self::Verbatim(c) => c.count_bits(),
            Self::Constant(c) => c.count_bits(),
            Self::Fixed(c) => c.count_bits(),
        }
    }

    fn write<S: BitSink>(&self, dest: &mut S) -> Result<(), OutputError<S>> {
        match self {
            Self::Verbatim(c) => c.write(dest),
            Self::Constant(c) => c.write(dest),
            Self::Fixed(c) => c.write(dest),
        }
    }
}

impl BitRepr for Constant {
    #[inline]
    fn count_bits(&self) -> usize {
        8 + self.bits_per_sample()
    }

    fn write<S: BitSink>(&self, dest: &mut S) -> Result<(), OutputError<S>> {
        dest.write(0u8).map_err(OutputError::<S>::from_sink)?;
        dest.write_twoc(self.dc_offset(), self.bits_per_sample())
            .map_err(OutputError::<S>::from_sink)?;
        Ok(())
    }
}

impl BitRepr for Verbatim {
    #[inline]
    fn count_bits(&self) -> usize {
        Self::count_bits_from_metadata(self.samples().len(), self.bits_per_sample())
    }

    fn write<S: BitSink>(&self, dest: &mut S) -> Result<(), OutputError<S>> {
        dest.write(0x02u8).map_err(OutputError::<S>::from_sink)?;
        for v in self.samples() {
            dest.write_twoc(*v, self.bits_per_sample())
                .map_err(OutputError::<S>::from_sink)?;
        }
        Ok(())
    }
}

impl BitRepr for Fixed {
    #[inline]
    fn count_bits(&self) -> usize {
        8 + self.bits_per_sample() * self.order() + self.residual().count_bits()
    }

    fn write<S: BitSink>(&self, dest: &mut S) -> Result<(), OutputError<S>> {
        let head_byte = 0x10u8 | (self.order() << 1) as u8;
        dest.write(head_byte).map_err(OutputError::<S>::from_sink)?;
        for v in self.warm_up() {
            dest.write_twoc(*v, self.bits_per_sample())
                .map_err(OutputError::<S>::from_sink)?;
        }
        self.residual().write(dest)
    }
}

impl BitRepr for Residual {
    #[inline]
    fn count_bits(&self) -> usize {
        self.code_bits()
    }

    /// Writes `Residual` to the [`BitSink`].
    ///
    /// This is the inner-most loop of the output side of the encoder.
    fn write<S: BitSink>(&self, dest: &mut S) -> Result<(), OutputError<S>> {
        dest.write_lsbs(self.method().tag(), 2)
            .map_err(OutputError::<S>::from_sink)?;
        dest.write_lsbs(self.partition_order() as u64, 4)
            .map_err(OutputError::<S>::from_sink)?;
        let nparts = 1usize << self.partition_order();
        let part_len = self.block_size() >> self.partition_order();
        let param_bits = self.method().parameter_bits();

        let mut offset = 0;
        for p in 0..nparts {
            let rice_p = self.rice_params()[p];
            assert!(
                usize::from(rice_p) < ESCAPE_PARAMETER,
                "{}",
                panic_msg::ESCAPE_NOT_SUPPORTED
            );
            dest.write_lsbs(rice_p, param_bits)
                .map_err(OutputError::<S>::from_sink)?;
            let end = offset + part_len;
            let start = min(max(self.warmup_length(), offset), end);
            offset = end;

            let stop_bit: u32 = 1u32 << rice_p;
            let rice_p_plus_1 = usize::from(rice_p) + 1;
            for t in start..end {
                let err = rice::encode_signbit(self.residuals()[t]);
                let quotient = (err >> rice_p) as usize;
                let remainder_plus_stop =
                    ((err & (stop_bit - 1)) | stop_bit) << (32 - rice_p_plus_1);
                dest.write_zeros(quotient)
                    .map_err(OutputError::<S>::from_sink)?;
                dest.write_msbs(remainder_plus_stop, rice_p_plus_1)
                    .map_err(OutputError::<S>::from_sink)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::FrameOffset;
    use crate::rice::RiceMethod;

    #[test]
    fn stream_info_bit_count() {
        let stream_info = StreamInfo::new(44100, 2, 16).expect("`StreamInfo::new` should not fail");
        let stream_info_bytes = stream_info.to_bytes();
        assert_eq!(
            stream_info_bytes.len() * 8,
            16 + 16 + 24 + 24 + 20 + 3 + 5 + 36 + 128
        );
        assert_eq!(stream_info.count_bits(), stream_info_bytes.len() * 8);
    }

    #[test]
    fn stream_info_field_layout() {
        let mut info = StreamInfo::new(44100, 2, 16).unwrap();
        info.set_total_samples(0x1_2345_6789);
        info.set_md5_digest(&[0xA5; 16]);
        let bytes = info.to_bytes();
        assert_eq!(bytes.len(), 34);
        // min/max block size.
        assert_eq!(&bytes[0..2], &[0xFF, 0xFF]);
        assert_eq!(&bytes[2..4], &[0x00, 0x00]);
        // sample rate (20 bits) | channels-1 (3 bits) | bps-1 (5 bits):
        // 44100 = 0x0AC44, channels-1 = 1, bps-1 = 15.
        assert_eq!(&bytes[10..13], &[0x0A, 0xC4, 0x42]);
        assert_eq!(bytes[13], 0xF1);
        // 36-bit total samples continues from the low nibble of byte 13.
        assert_eq!(&bytes[14..18], &[0x23, 0x45, 0x67, 0x89]);
        assert_eq!(&bytes[18..34], &[0xA5; 16]);
    }

    #[test]
    fn metadata_block_header_layout() {
        let info = StreamInfo::new(44100, 2, 16).unwrap();
        let block = MetadataBlock::from_stream_info(info, false);
        let bytes = block.to_bytes();
        assert_eq!(bytes.len(), 38);
        assert_eq!(&bytes[0..4], &[0x00, 0x00, 0x00, 0x22]);

        let info = StreamInfo::new(44100, 2, 16).unwrap();
        let block = MetadataBlock::from_stream_info(info, true);
        assert_eq!(block.to_bytes()[0], 0x80);
    }

    #[test]
    fn vorbis_comment_layout() {
        let comment = VorbisComment::new("vendor01");
        let bytes = comment.to_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], &[8, 0, 0, 0]);
        assert_eq!(&bytes[4..12], b"vendor01");
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0]);
        comment
            .verify_bit_counter()
            .expect("`VorbisComment::count_bits` should be accurate");
    }

    #[test]
    fn utf8like_encoding() {
        assert_eq!(encode_to_utf8like(0).unwrap().as_slice(), &[0x00]);
        assert_eq!(encode_to_utf8like(0x7F).unwrap().as_slice(), &[0x7F]);
        assert_eq!(encode_to_utf8like(0x80).unwrap().as_slice(), &[0xC2, 0x80]);
        assert_eq!(
            encode_to_utf8like(0x800).unwrap().as_slice(),
            &[0xE0, 0xA0, 0x80]
        );
        // The 36-bit maximum uses the 7-byte form.
        let encoded = encode_to_utf8like((1u64 << 36) - 1).unwrap();
        assert_eq!(encoded.len(), 7);
        assert_eq!(encoded[0], 0xFE);
        assert!(encode_to_utf8like(1u64 << 36).is_err());
        for v in [0u64, 0x7F, 0x80, 0x7FF, 0x800, 123_456, (1 << 36) - 1] {
            assert_eq!(encode_to_utf8like(v).unwrap().len(), utf8like_bytesize(v));
        }
    }

    #[test]
    fn frame_header_canonical_bits() {
        let header = FrameHeader::new(
            192,
            ChannelAssignment::Independent(2),
            16,
            44100,
            FrameOffset::Frame(0),
        )
        .unwrap();
        header
            .verify_bit_counter()
            .expect("`FrameHeader::count_bits` should be accurate");
        let bytes = header.to_bytes();
        // sync + fixed-blocking, block-size tag 1, rate tag 9 (44.1k),
        // channels tag 1, sample-size tag 4 (16-bit), frame number 0.
        assert_eq!(&bytes[..5], &[0xFF, 0xF8, 0x19, 0x18, 0x00]);
        // trailing CRC-8 covers exactly the preceding bytes.
        assert_eq!(*bytes.last().unwrap(), HEADER_CRC.checksum(&bytes[..5]));
        assert_eq!(header.count_bits(), 48);
    }

    #[test]
    fn frame_header_uncommon_block_size_trailer() {
        let header = FrameHeader::new(
            10,
            ChannelAssignment::Independent(1),
            16,
            44100,
            FrameOffset::Frame(0),
        )
        .unwrap();
        let bytes = header.to_bytes();
        // block-size tag 6 (8-bit trailer), rate tag 9.
        assert_eq!(&bytes[..5], &[0xFF, 0xF8, 0x69, 0x08, 0x00]);
        // trailer byte holds block_size - 1.
        assert_eq!(bytes[5], 0x09);
        assert_eq!(*bytes.last().unwrap(), HEADER_CRC.checksum(&bytes[..6]));
    }

    #[test]
    fn frame_header_variable_blocking_sample_number() {
        let mut header = FrameHeader::new(
            4096,
            ChannelAssignment::Independent(1),
            16,
            44100,
            FrameOffset::Frame(0),
        )
        .unwrap();
        header.set_frame_offset(FrameOffset::StartSample(123_456));
        let bytes = header.to_bytes();
        assert_eq!(&bytes[..2], &[0xFF, 0xF9]);
        header
            .verify_bit_counter()
            .expect("`FrameHeader::count_bits` should be accurate");
    }

    #[test]
    fn channel_assignment_encoding() {
        let ch = ChannelAssignment::Independent(8);
        assert_eq!(ch.to_bitstring(), "0111****");
        let ch = ChannelAssignment::RightSide;
        assert_eq!(ch.to_bitstring(), "1001****");
        ch.verify_bit_counter()
            .expect("`ChannelAssignment::count_bits` should be accurate");
    }

    #[test]
    fn constant_subframe_layout() {
        let subframe = Constant::new(1024, 0x1234, 16).unwrap();
        assert_eq!(subframe.to_bytes(), vec![0x00, 0x12, 0x34]);
        subframe
            .verify_bit_counter()
            .expect("`Constant::count_bits` should be accurate");
    }

    #[test]
    fn verbatim_subframe_layout() {
        let subframe = Verbatim::new(&[0xABi64; 4], 16).unwrap();
        let bytes = subframe.to_bytes();
        assert_eq!(bytes[0], 0x02);
        for t in 0..4 {
            assert_eq!(&bytes[(1 + t * 2)..][..2], &[0x00, 0xAB]);
        }
        subframe
            .verify_bit_counter()
            .expect("`Verbatim::count_bits` should be accurate");
    }

    #[test]
    fn fixed_subframe_layout() {
        let residual =
            Residual::new(RiceMethod::Bits4, 0, 1, &[0], &[0i32; 64]).unwrap();
        let warm_up = heapless::Vec::from_slice(&[0xCDi64]).unwrap();
        let subframe = Fixed::from_parts(warm_up, residual, 16);
        let bytes = subframe.to_bytes();
        assert_eq!(bytes[0], 0x12); // order-1 fixed subframe tag
        assert_eq!(&bytes[1..3], &[0x00, 0xCD]);
        subframe
            .verify_bit_counter()
            .expect("`Fixed::count_bits` should be accurate");
    }

    #[test]
    fn residual_bitstream() {
        // k=1 over four residuals, no warm-up, single partition.
        let residual = Residual::new(RiceMethod::Bits4, 0, 0, &[1], &[0, 1, -1, 2]).unwrap();
        // method(2) + order(4): 000000; parameter: 0001;
        // zigzag 0 -> q=0 r=0: "10"; 2 -> q=1 r=0: "010";
        // 1 -> q=0 r=1: "11"; 4 -> q=2 r=0: "0010"
        assert_eq!(
            residual.to_bitstring().replace('_', ""),
            concat!("000000", "0001", "10", "010", "11", "0010").to_owned() + "***"
        );
        residual
            .verify_bit_counter()
            .expect("`Residual::count_bits` should be accurate");
    }

    #[test]
    fn five_bit_parameter_field() {
        let residual =
            Residual::new(RiceMethod::Bits5, 0, 0, &[17], &[3i32; 8]).unwrap();
        let bits = residual.to_bitstring().replace('_', "");
        // method tag 01, order 0000, then a 5-bit parameter field.
        assert!(bits.starts_with("010000"));
        assert_eq!(&bits[6..11], "10001");
        residual
            .verify_bit_counter()
            .expect("`Residual::count_bits` should be accurate");
    }

    #[test]
    fn frame_crc16_covers_preceding_bytes() {
        let header = FrameHeader::new(
            16,
            ChannelAssignment::Independent(1),
            16,
            44100,
            FrameOffset::Frame(3),
        )
        .unwrap();
        let frame = Frame::from_parts(
            header,
            vec![Verbatim::from_parts(vec![-1i64; 16], 16).into()],
        );
        let bytes = frame.to_bytes();
        let crc_offset = bytes.len() - 2;
        let expected = FRAME_CRC.checksum(&bytes[..crc_offset]);
        assert_eq!(
            &bytes[crc_offset..],
            &[(expected >> 8) as u8, (expected & 0xFF) as u8]
        );
        frame
            .verify_bit_counter()
            .expect("`Frame::count_bits` should be accurate");
    }
}
