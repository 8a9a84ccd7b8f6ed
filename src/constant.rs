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

//! Constants for the FLAC bitstream format and this encoder.

/// Maximum block size in inter-channel samples (16-bit field in `FrameHeader`).
pub const MAX_BLOCK_SIZE: usize = 65535;

/// Maximum number of channels.
pub const MAX_CHANNELS: usize = 8;

/// Minimum bits-per-sample of a stream.
pub const MIN_BITS_PER_SAMPLE: usize = 4;

/// Maximum bits-per-sample of a stream.
///
/// Side channels are stored with one extra bit, so subframe components accept
/// `MAX_BITS_PER_SAMPLE + 1`.
pub const MAX_BITS_PER_SAMPLE: usize = 32;

/// Bits-per-sample values this encoder accepts as stream input.
pub const SUPPORTED_BITS_PER_SAMPLE: [usize; 4] = [8, 16, 24, 32];

/// Exclusive upper bound of the sample rate (20-bit field in `StreamInfo`).
pub const MAX_SAMPLE_RATE: usize = 1 << 20;

/// Exclusive upper bound of the total sample count (36-bit field in `StreamInfo`).
pub const MAX_TOTAL_SAMPLES: u64 = 1u64 << 36;

/// Size of the stream prefix that is rewritten after encoding, in bytes.
///
/// "fLaC" magic (4) + `StreamInfo` block header (4) + `StreamInfo` payload (34).
pub const STREAM_HEADER_SIZE: usize = 42;

/// Size of the `StreamInfo` payload in bytes.
pub const STREAM_INFO_SIZE: usize = 34;

/// Constants for fixed-order prediction.
pub mod fixed {
    /// Maximum order of the fixed predictors.
    pub const MAX_ORDER: usize = 4;

    /// Sample size (bits) from which prediction residuals can exceed `i32`.
    ///
    /// The order-4 predictor multiplies the sample magnitude by at most 16, so
    /// anything below 28 bits is safe without checking.
    pub const RANGE_CHECK_BITS: usize = 28;
}

/// Constants for partitioned Rice coding.
pub mod rice {
    /// Maximum rice parameter representable with a 4-bit parameter field.
    ///
    /// `0b1111` is the escape tag of the 4-bit method, so 14 is the largest
    /// codable parameter.
    pub const MAX_PARAMETER_4BIT: usize = 14;

    /// Maximum rice parameter representable with a 5-bit parameter field.
    ///
    /// `0b11111` is the escape tag of the 5-bit method.
    pub const MAX_PARAMETER: usize = 30;

    /// Parameter tag reserved for escaped (raw binary) partitions.
    ///
    /// This encoder never emits escaped partitions.
    pub const ESCAPE_PARAMETER: usize = 31;

    /// Maximum order of rice parameter partitioning (incl.)
    pub const MAX_PARTITION_ORDER: usize = 8;

    /// Maximum number of rice partitions.
    pub const MAX_PARTITIONS: usize = 1usize << MAX_PARTITION_ORDER;
}

/// Error messages for panics caused by internal data inconsistency.
pub(crate) mod panic_msg {
    pub const DATA_INCONSISTENT: &str = "INTERNAL ERROR: encoder data got inconsistent.";
    pub const ESCAPE_NOT_SUPPORTED: &str =
        "INTERNAL ERROR: escaped rice partition must not be emitted.";
}
