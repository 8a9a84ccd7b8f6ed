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

#![doc = include_str!("../README.md")]
#![warn(clippy::all, clippy::nursery, clippy::pedantic, clippy::cargo)]
// Some of clippy::pedantic rules are actually useful, so use it with a lot of
// ad-hoc exceptions.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::missing_const_for_fn,
    clippy::multiple_crate_versions,
    clippy::must_use_candidate
)]
// Some from restriction lint-group
#![warn(
    clippy::clone_on_ref_ptr,
    clippy::create_dir,
    clippy::dbg_macro,
    clippy::empty_structs_with_brackets,
    clippy::exit,
    clippy::if_then_some_else_none,
    clippy::let_underscore_must_use,
    clippy::lossy_float_literal,
    clippy::print_stdout,
    clippy::rc_buffer,
    clippy::rc_mutex,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::separated_literal_suffix,
    clippy::str_to_string,
    clippy::string_add,
    clippy::string_to_string,
    clippy::try_err,
    clippy::unnecessary_self_imports,
    clippy::wildcard_enum_match_arm
)]

#[macro_use]
pub(crate) mod reuse;

pub mod bitsink;
pub(crate) mod coding;
pub mod component;
pub mod config;
pub mod constant;
pub mod error;
pub(crate) mod fixed;
pub(crate) mod rice;
pub mod sigen;
pub mod source;

#[cfg(test)]
pub mod test_helper;

// import global entry points
pub use coding::encode_fixed_size_frame;

pub use coding::encode_with_fixed_block_size;

#[cfg(test)]
mod test {
    // end-to-end, but transparent test.
    use super::*;
    use std::io::Cursor;

    use rstest::rstest;

    use crate::constant::STREAM_HEADER_SIZE;

    fn interleave(channel_signals: &[Vec<i32>]) -> Vec<i32> {
        let len = channel_signals[0].len();
        let mut ret = Vec::with_capacity(len * channel_signals.len());
        for t in 0..len {
            for s in channel_signals {
                ret.push(s[t]);
            }
        }
        ret
    }

    #[rstest]
    fn e2e_with_generated_sinusoids(
        #[values(1, 2, 3, 5, 8)] channels: usize,
        #[values(123, 512, 4096)] block_size: usize,
    ) {
        let signal_len = 16123;
        let bits_per_sample = 16;
        let sample_rate = 16000;

        let mut channel_signals = vec![];
        for ch in 0..channels {
            channel_signals.push(
                test_helper::sinusoid_plus_noise(signal_len, 36 + ch, 10000.0, 123),
            );
        }
        let signal = interleave(&channel_signals);

        let source =
            source::PreloadedSignal::from_samples(&signal, channels, bits_per_sample, sample_rate);
        let mut dest = Cursor::new(Vec::new());
        let stream_info = encode_with_fixed_block_size(
            &config::Encoder::default(),
            source,
            block_size,
            &mut dest,
        )
        .expect("encoder error");
        let bytes = dest.into_inner();

        assert_eq!(&bytes[0..4], b"fLaC");
        assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x00, 0x22]);
        assert_eq!(bytes[STREAM_HEADER_SIZE], 0x84);

        assert_eq!(stream_info.total_samples(), signal_len);
        assert_eq!(stream_info.max_block_size(), block_size);
        assert_eq!(stream_info.min_block_size(), signal_len % block_size);
        assert!(stream_info.min_frame_size() <= stream_info.max_frame_size());
        assert!(stream_info.max_frame_size() > 0);

        // The embedded MD5 covers exactly the raw little-endian input bytes.
        let mut raw = Vec::with_capacity(signal.len() * 2);
        for v in &signal {
            raw.extend_from_slice(&v.to_le_bytes()[0..2]);
        }
        let expected = <[u8; 16]>::from(md5::compute(&raw));
        assert_eq!(stream_info.md5_digest(), &expected);
        assert_eq!(&bytes[8 + 18..8 + 34], &expected);
    }

    #[rstest]
    fn e2e_silence_compresses_to_constant_frames(#[values(8, 16, 24, 32)] bits_per_sample: usize) {
        let channels = 2;
        let signal = vec![0i32; 4096 * channels];
        let source =
            source::PreloadedSignal::from_samples(&signal, channels, bits_per_sample, 44100);
        let mut dest = Cursor::new(Vec::new());
        let stream_info = encode_with_fixed_block_size(
            &config::Encoder::default(),
            source,
            4096,
            &mut dest,
        )
        .expect("encoder error");

        // One frame of two constant subframes: a handful of bytes.
        assert_eq!(stream_info.max_frame_size(), stream_info.min_frame_size());
        assert!(stream_info.max_frame_size() < 32);
    }
}
