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

//! Controller connecting coding algorithms.

use std::cmp::min;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;

use super::bitsink::ByteSink;
use super::component::BitRepr;
use super::component::ChannelAssignment;
use super::component::Constant;
use super::component::Fixed;
use super::component::Frame;
use super::component::FrameHeader;
use super::component::FrameOffset;
use super::component::MetadataBlock;
use super::component::Residual;
use super::component::StreamInfo;
use super::component::SubFrame;
use super::component::Verbatim;
use super::component::VorbisComment;
use super::config;
use super::constant::fixed::MAX_ORDER as MAX_FIXED_ORDER;
use super::constant::fixed::RANGE_CHECK_BITS;
use super::constant::panic_msg;
use super::constant::rice::MAX_PARAMETER;
use super::constant::rice::MAX_PARAMETER_4BIT;
use super::constant::MAX_BITS_PER_SAMPLE;
use super::constant::STREAM_HEADER_SIZE;
use super::error::verify_range;
use super::error::verify_true;
use super::error::EncodeError;
use super::error::Verify;
use super::error::VerifyError;
use super::fixed::FixedPredictor;
use super::fixed::SampleInt;
use super::rice;
use super::source::Context;
use super::source::FrameBuf;
use super::source::Source;

/// Returns true if all samples have the same value.
#[inline]
fn is_constant<T: SampleInt>(samples: &[T]) -> bool {
    samples.iter().all(|x| *x == samples[0])
}

/// Widens a sample slice into a `Verbatim` subframe.
fn verbatim_subframe<T: SampleInt>(samples: &[T], bits_per_sample: u8) -> SubFrame {
    Verbatim::from_parts(
        samples.iter().map(|x| (*x).into()).collect(),
        bits_per_sample,
    )
    .into()
}

reusable!(FIXED_PREDICTOR_BUFFER: FixedPredictor = FixedPredictor::new());

/// Finds the best method to encode the given samples, and returns `SubFrame`.
///
/// `bits_per_sample` is the effective subframe sample size, i.e. the stream
/// sample size plus one for side channels. The generic parameter selects the
/// `i64` instantiation for 33-bit side signals.
fn encode_subframe<T: SampleInt>(
    config: &config::SubFrameCoding,
    samples: &[T],
    bits_per_sample: u8,
) -> SubFrame {
    debug_assert!(!samples.is_empty());
    if config.use_constant && is_constant(samples) {
        // Constant is always best when applicable.
        return Constant::from_parts(samples.len(), samples[0].into(), bits_per_sample).into();
    }
    if samples.len() <= MAX_FIXED_ORDER || !config.use_fixed {
        return verbatim_subframe(samples, bits_per_sample);
    }

    let baseline_bits = samples.len() * bits_per_sample as usize;
    reuse!(FIXED_PREDICTOR_BUFFER, |predictor: &mut FixedPredictor| {
        predictor.reset(samples);
        let check_range = usize::from(bits_per_sample) >= RANGE_CHECK_BITS;
        let Some(order) = predictor.best_order(check_range) else {
            return verbatim_subframe(samples, bits_per_sample);
        };

        // The residual array keeps zero placeholders where the warm-up
        // samples sit; `best_order` guaranteed the rest fits `i32`.
        let errors = predictor.errors(order);
        let mut residuals = vec![0i32; order];
        residuals.reserve(samples.len() - order);
        residuals.extend(errors[order..].iter().map(|e| *e as i32));

        let max_p = min(
            config.prc.max_parameter,
            if usize::from(bits_per_sample) <= 16 {
                MAX_PARAMETER_4BIT
            } else {
                MAX_PARAMETER
            },
        );
        let prc_p = rice::find_partitioned_rice_parameter(
            &residuals,
            order,
            max_p,
            config.prc.max_partition_order,
        );
        if prc_p.code_bits >= baseline_bits {
            return verbatim_subframe(samples, bits_per_sample);
        }

        let mut warm_up = heapless::Vec::new();
        for v in &samples[..order] {
            warm_up
                .push((*v).into())
                .expect(panic_msg::DATA_INCONSISTENT);
        }
        let residual = Residual::from_parts(
            prc_p.method,
            prc_p.order as u8,
            samples.len(),
            order,
            prc_p.ps,
            residuals,
        );
        Fixed::from_parts(warm_up, residual, bits_per_sample).into()
    })
}

/// Estimates the cheapest stereo decorrelation for one frame.
///
/// The estimate runs a second-order fixed predictor over both channels
/// without materializing any buffer, accumulates the four absolute residual
/// sums, and scores each with a single-partition rice estimate. Later
/// candidates win ties, so fully correlated input settles on mid-side.
fn estimate_channel_assignment(
    config: &config::StereoCoding,
    left: &[i32],
    right: &[i32],
) -> ChannelAssignment {
    debug_assert_eq!(left.len(), right.len());
    let block_size = left.len();

    let mut abs_left = 0u64;
    let mut abs_right = 0u64;
    let mut abs_mid = 0u64;
    let mut abs_side = 0u64;
    for t in 2..block_size {
        let l = i64::from(left[t]) - 2 * i64::from(left[t - 1]) + i64::from(left[t - 2]);
        let r = i64::from(right[t]) - 2 * i64::from(right[t - 1]) + i64::from(right[t - 2]);
        abs_left += l.unsigned_abs();
        abs_right += r.unsigned_abs();
        abs_mid += ((l + r) >> 1).unsigned_abs();
        abs_side += (l - r).unsigned_abs();
    }

    let bits_left = rice::estimate_code_bits(2 * abs_left, block_size);
    let bits_right = rice::estimate_code_bits(2 * abs_right, block_size);
    let bits_mid = rice::estimate_code_bits(2 * abs_mid, block_size);
    let bits_side = rice::estimate_code_bits(2 * abs_side, block_size);

    let candidates = [
        (ChannelAssignment::Independent(2), bits_left + bits_right, true),
        (
            ChannelAssignment::LeftSide,
            bits_left + bits_side,
            config.use_leftside,
        ),
        (
            ChannelAssignment::RightSide,
            bits_side + bits_right,
            config.use_rightside,
        ),
        (
            ChannelAssignment::MidSide,
            bits_mid + bits_side,
            config.use_midside,
        ),
    ];
    let mut best = &candidates[0];
    for candidate in &candidates[1..] {
        if candidate.2 && candidate.1 <= best.1 {
            best = candidate;
        }
    }
    best.0.clone()
}

/// Reusable storage for the derived mid/side signals.
///
/// The side channel of a 32-bit stream needs 33 bits and goes to the widened
/// buffer; everything else stays in `i32`.
#[derive(Clone, Debug, Default)]
struct StereoBuf {
    mid: Vec<i32>,
    side: Vec<i32>,
    wide_side: Vec<i64>,
}

reusable!(STEREO_BUFFER: StereoBuf);

/// Encodes the two subframes of a decorrelated stereo frame in emission order.
fn encode_stereo_subframes(
    config: &config::SubFrameCoding,
    framebuf: &FrameBuf,
    bits_per_sample: usize,
    assignment: &ChannelAssignment,
    buf: &mut StereoBuf,
    frame: &mut Frame,
) {
    let left = framebuf.channel_slice(0);
    let right = framebuf.channel_slice(1);
    let bps = bits_per_sample as u8;
    let side_bps = bps + 1;
    let widened = bits_per_sample == MAX_BITS_PER_SAMPLE;

    if matches!(assignment, ChannelAssignment::MidSide) {
        buf.mid.clear();
        buf.mid.extend(
            left.iter()
                .zip(right)
                .map(|(l, r)| ((i64::from(*l) + i64::from(*r)) >> 1) as i32),
        );
    }
    if widened {
        buf.wide_side.clear();
        buf.wide_side.extend(
            left.iter()
                .zip(right)
                .map(|(l, r)| i64::from(*l) - i64::from(*r)),
        );
    } else {
        buf.side.clear();
        buf.side.extend(
            left.iter()
                .zip(right)
                .map(|(l, r)| ((i64::from(*l) - i64::from(*r)) as i32)),
        );
    }

    let side_subframe = |buf: &StereoBuf| {
        if widened {
            encode_subframe(config, &buf.wide_side, side_bps)
        } else {
            encode_subframe(config, &buf.side, side_bps)
        }
    };

    match assignment {
        ChannelAssignment::LeftSide => {
            frame.add_subframe(encode_subframe(config, left, bps));
            frame.add_subframe(side_subframe(buf));
        }
        ChannelAssignment::RightSide => {
            frame.add_subframe(side_subframe(buf));
            frame.add_subframe(encode_subframe(config, right, bps));
        }
        ChannelAssignment::MidSide => {
            frame.add_subframe(encode_subframe(config, &buf.mid, bps));
            frame.add_subframe(side_subframe(buf));
        }
        ChannelAssignment::Independent(_) => unreachable!("{}", panic_msg::DATA_INCONSISTENT),
    }
}

/// Finds the best configuration for encoding samples and returns a `Frame`.
fn encode_frame(
    config: &config::Encoder,
    framebuf: &FrameBuf,
    frame_number: u32,
    stream_info: &StreamInfo,
) -> Frame {
    let nchannels = stream_info.channels();
    let bits_per_sample = stream_info.bits_per_sample();

    let ch_info = if nchannels == 2 {
        estimate_channel_assignment(
            &config.stereo_coding,
            framebuf.channel_slice(0),
            framebuf.channel_slice(1),
        )
    } else {
        ChannelAssignment::Independent(nchannels as u8)
    };

    let header = FrameHeader::new(
        framebuf.size(),
        ch_info.clone(),
        bits_per_sample,
        stream_info.sample_rate(),
        FrameOffset::Frame(frame_number),
    )
    .expect(panic_msg::DATA_INCONSISTENT);
    let mut frame = Frame::from_parts(header, Vec::with_capacity(nchannels));

    if let ChannelAssignment::Independent(_) = ch_info {
        for ch in 0..nchannels {
            frame.add_subframe(encode_subframe(
                &config.subframe_coding,
                framebuf.channel_slice(ch),
                bits_per_sample as u8,
            ));
        }
    } else {
        reuse!(STEREO_BUFFER, |buf: &mut StereoBuf| {
            encode_stereo_subframes(
                &config.subframe_coding,
                framebuf,
                bits_per_sample,
                &ch_info,
                buf,
                &mut frame,
            );
        });
    }
    frame
}

/// Encodes [`FrameBuf`] to [`Frame`].
///
/// The block size is taken from `FrameBuf::size`.
///
/// # Errors
///
/// Returns an error when the buffer shape or the sample range does not match
/// `stream_info`.
///
/// # Examples
///
/// ```
/// # use flacpress::*;
/// use flacpress::component::StreamInfo;
/// use flacpress::config;
/// use flacpress::source::{Context, FrameBuf, PreloadedSignal, Source};
///
/// let (signal_len, block_size, channels, sample_rate) = (32000, 160, 2, 16000);
/// let signal = vec![0i32; signal_len * channels];
/// let bits_per_sample = 16;
///
/// let mut source = PreloadedSignal::from_samples(&signal, channels, bits_per_sample, sample_rate);
/// let mut fb = FrameBuf::with_size(channels, block_size);
/// let mut ctx = Context::new(bits_per_sample, channels);
/// let stream_info = StreamInfo::new(sample_rate, channels, bits_per_sample).unwrap();
/// assert!(source.read_samples(block_size, &mut fb, &mut ctx).is_ok());
///
/// let frame = encode_fixed_size_frame(
///     &config::Encoder::default(),
///     &fb,
///     0,
///     &stream_info,
/// ).expect("encoder error");
/// assert_eq!(frame.block_size(), block_size);
/// ```
pub fn encode_fixed_size_frame(
    config: &config::Encoder,
    framebuf: &FrameBuf,
    frame_number: usize,
    stream_info: &StreamInfo,
) -> Result<Frame, EncodeError> {
    let block_size = framebuf.size();
    verify_range!(
        "framebuf.size",
        block_size,
        1..=(crate::constant::MAX_BLOCK_SIZE)
    )?;
    verify_true!(
        "framebuf.channels",
        framebuf.channels() == stream_info.channels(),
        "must match the stream channel count"
    )?;

    let bps = stream_info.bits_per_sample();
    let min_allowed = -(1i64 << (bps - 1));
    let max_allowed = (1i64 << (bps - 1)) - 1;
    for ch in 0..framebuf.channels() {
        for v in framebuf.channel_slice(ch) {
            if i64::from(*v) < min_allowed || i64::from(*v) > max_allowed {
                return Err(VerifyError::new(
                    "framebuf",
                    &format!("input samples must be in the range of bits={bps}"),
                )
                .into());
            }
        }
    }

    Ok(encode_frame(config, framebuf, frame_number as u32, stream_info))
}

reusable!(STREAM_STAGE_BUFFER: ByteSink = ByteSink::new());

/// Stages a component and writes its bytes to an `io::Write` destination.
///
/// Returns the number of bytes written.
fn write_component_to<C: BitRepr, W: Write>(
    component: &C,
    dest: &mut W,
) -> Result<usize, EncodeError> {
    reuse!(STREAM_STAGE_BUFFER, |sink: &mut ByteSink| {
        sink.clear();
        sink.reserve(component.count_bits());
        component
            .write(sink)
            .map_err(|e| VerifyError::new("stream", &format!("{e}")))?;
        dest.write_all(sink.as_slice())?;
        Ok(sink.as_slice().len())
    })
}

/// Encodes a [`Source`] into a FLAC stream written to `dest`.
///
/// This is the main entry point of this library crate. The stream prefix
/// ("fLaC" and `StreamInfo`) is written as a placeholder first and patched
/// after all frames are emitted, so `dest` must be seekable. The final
/// `StreamInfo` (with MD5, frame-size bounds, and the total sample count) is
/// also returned.
///
/// # Errors
///
/// Returns [`EncodeError`] when the source format is unsupported, the source
/// fails to deliver samples, or the destination fails to accept bytes.
///
/// # Examples
///
/// ```
/// # use flacpress::*;
/// use flacpress::config;
/// use flacpress::source::PreloadedSignal;
///
/// let (signal_len, block_size, channels, sample_rate) = (32000, 160, 2, 16000);
/// let signal = vec![0i32; signal_len * channels];
/// let source = PreloadedSignal::from_samples(&signal, channels, 16, sample_rate);
///
/// let mut dest = std::io::Cursor::new(Vec::new());
/// let result = encode_with_fixed_block_size(
///     &config::Encoder::default(), source, block_size, &mut dest,
/// );
/// assert!(result.is_ok());
/// assert_eq!(&dest.get_ref()[0..4], b"fLaC");
/// ```
pub fn encode_with_fixed_block_size<T: Source, W: Write + Seek>(
    config: &config::Encoder,
    mut src: T,
    block_size: usize,
    dest: &mut W,
) -> Result<StreamInfo, EncodeError> {
    config.verify()?;
    verify_range!(
        "block_size",
        block_size,
        1..=(crate::constant::MAX_BLOCK_SIZE)
    )?;
    let mut stream_info =
        StreamInfo::new(src.sample_rate(), src.channels(), src.bits_per_sample())?;

    // Pass 1: a zeroed placeholder where "fLaC" + StreamInfo belong, then the
    // vendor block, then the frames.
    dest.write_all(&[0u8; STREAM_HEADER_SIZE])?;
    write_component_to(
        &MetadataBlock::from_parts(true, VorbisComment::default().into()),
        dest,
    )?;

    let mut framebuf = FrameBuf::with_size(src.channels(), block_size);
    let mut context = Context::new(src.bits_per_sample(), src.channels());
    loop {
        let read = src.read_samples(block_size, &mut framebuf, &mut context)?;
        if read == 0 {
            break;
        }
        let frame = encode_fixed_size_frame(
            config,
            &framebuf,
            context.current_frame_number(),
            &stream_info,
        )?;
        let frame_bytes = write_component_to(&frame, dest)?;
        debug_assert_eq!(frame_bytes * 8, frame.count_bits());
        stream_info.update_frame_info(&frame);
    }

    stream_info.set_md5_digest(&context.md5_digest());
    stream_info.set_total_samples(src.len_hint().unwrap_or_else(|| context.total_samples()));

    // Pass 2: patch the stream prefix.
    dest.seek(SeekFrom::Start(0))?;
    dest.write_all(b"fLaC")?;
    write_component_to(
        &MetadataBlock::from_stream_info(stream_info.clone(), false),
        dest,
    )?;
    dest.flush()?;
    Ok(stream_info)
}
