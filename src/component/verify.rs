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

use crate::constant::rice::MAX_PARAMETER;
use crate::constant::MAX_CHANNELS;
use crate::constant::MAX_SAMPLE_RATE;
use crate::constant::MAX_TOTAL_SAMPLES;
use crate::constant::SUPPORTED_BITS_PER_SAMPLE;
use crate::error::verify_range;
use crate::error::verify_true;
use crate::error::Verify;
use crate::error::VerifyError;

use super::datatype::ChannelAssignment;
use super::datatype::Constant;
use super::datatype::Fixed;
use super::datatype::Frame;
use super::datatype::FrameHeader;
use super::datatype::MetadataBlock;
use super::datatype::MetadataBlockData;
use super::datatype::Residual;
use super::datatype::StreamInfo;
use super::datatype::SubFrame;
use super::datatype::Verbatim;
use super::datatype::VorbisComment;

// Some (internal) utility macros for value verification.
macro_rules! verify_block_size {
    ($varname:literal, $size:expr) => {
        verify_range!($varname, $size, 1..=(crate::constant::MAX_BLOCK_SIZE))
    };
}
pub(crate) use verify_block_size;

macro_rules! verify_bps {
    ($varname:literal, $bps:expr) => {
        verify_range!(
            $varname,
            $bps,
            (crate::constant::MIN_BITS_PER_SAMPLE)..=(crate::constant::MAX_BITS_PER_SAMPLE + 1)
        )
    };
}
pub(crate) use verify_bps;

macro_rules! verify_sample_range {
    ($varname:literal, $sample:expr, $bps:expr) => {{
        let min_sample = -(1i64 << ($bps as usize - 1));
        let max_sample = (1i64 << ($bps as usize - 1)) - 1;
        let sample = i64::from($sample);
        verify_range!($varname, sample, min_sample..=max_sample)
    }};
}
pub(crate) use verify_sample_range;

impl Verify for StreamInfo {
    fn verify(&self) -> Result<(), VerifyError> {
        verify_range!("sample_rate", self.sample_rate(), ..MAX_SAMPLE_RATE)?;
        verify_range!("channels", self.channels(), 1..=MAX_CHANNELS)?;
        verify_true!(
            "bits_per_sample",
            SUPPORTED_BITS_PER_SAMPLE.contains(&self.bits_per_sample()),
            "must be one of 8, 16, 24, or 32"
        )?;
        verify_true!(
            "total_samples",
            (self.total_samples() as u64) < MAX_TOTAL_SAMPLES,
            "must fit in 36 bits"
        )?;
        if self.max_block_size() != 0 {
            verify_true!(
                "min_block_size",
                self.min_block_size() <= self.max_block_size(),
                "must not be greater than `max_block_size`"
            )?;
            verify_block_size!("max_block_size", self.max_block_size())?;
        }
        Ok(())
    }
}

impl Verify for MetadataBlock {
    fn verify(&self) -> Result<(), VerifyError> {
        self.data.verify()
    }
}

impl Verify for MetadataBlockData {
    fn verify(&self) -> Result<(), VerifyError> {
        match self {
            Self::StreamInfo(info) => info.verify(),
            Self::VorbisComment(comment) => comment.verify(),
        }
    }
}

impl Verify for VorbisComment {
    fn verify(&self) -> Result<(), VerifyError> {
        // The block length field is 24 bits; 8 bytes of length fields
        // surround the vendor string.
        verify_range!("vendor.len", self.vendor().len(), ..((1usize << 24) - 8))
    }
}

impl Verify for Frame {
    fn verify(&self) -> Result<(), VerifyError> {
        verify_true!(
            "subframes.len",
            self.subframe_count() == self.header().channel_assignment().channels(),
            "must match the channel assignment of the header"
        )?;
        for (ch, sf) in self.subframes().iter().enumerate() {
            sf.verify()
                .map_err(|e| e.within(&format!("subframe[{ch}]")))?;
        }
        self.header().verify().map_err(|e| e.within("header"))
    }
}

impl Verify for ChannelAssignment {
    fn verify(&self) -> Result<(), VerifyError> {
        match *self {
            Self::Independent(ch) => {
                verify_range!("Independent(ch)", ch as usize, 1..=MAX_CHANNELS)
            }
            Self::LeftSide | Self::RightSide | Self::MidSide => Ok(()),
        }
    }
}

impl Verify for FrameHeader {
    fn verify(&self) -> Result<(), VerifyError> {
        verify_block_size!("block_size", self.block_size())?;

        self.channel_assignment()
            .verify()
            .map_err(|e| e.within("channel_assignment"))
    }
}

impl Verify for SubFrame {
    fn verify(&self) -> Result<(), VerifyError> {
        match self {
            Self::Verbatim(c) => c.verify(),
            Self::Constant(c) => c.verify(),
            Self::Fixed(c) => c.verify(),
        }
    }
}

impl Verify for Constant {
    fn verify(&self) -> Result<(), VerifyError> {
        verify_block_size!("block_size", self.block_size())?;
        verify_bps!("bits_per_sample", self.bits_per_sample())?;
        verify_sample_range!("dc_offset", self.dc_offset(), self.bits_per_sample())
    }
}

impl Verify for Verbatim {
    fn verify(&self) -> Result<(), VerifyError> {
        verify_block_size!("data.len", self.samples().len())?;
        verify_bps!("bits_per_sample", self.bits_per_sample())?;
        for (t, v) in self.samples().iter().enumerate() {
            verify_sample_range!("data[{t}]", *v, self.bits_per_sample())?;
        }
        Ok(())
    }
}

impl Verify for Fixed {
    fn verify(&self) -> Result<(), VerifyError> {
        verify_bps!("bits_per_sample", self.bits_per_sample())?;
        for (t, v) in self.warm_up().iter().enumerate() {
            verify_sample_range!("warm_up[{t}]", *v, self.bits_per_sample())?;
        }
        verify_true!(
            "warm_up.len",
            self.warm_up().len() == self.residual().warmup_length(),
            "must match the warm-up length of the residual"
        )?;
        self.residual()
            .verify()
            .map_err(|err| err.within("residual"))
    }
}

impl Verify for Residual {
    fn verify(&self) -> Result<(), VerifyError> {
        verify_block_size!("residuals.len", self.residuals().len())?;
        verify_true!(
            "residuals.len",
            self.residuals().len() == self.block_size(),
            "must have the same length as the block size"
        )?;
        verify_range!("warmup_length", self.warmup_length(), ..=4)?;
        let nparts = 1usize << self.partition_order();
        verify_true!(
            "rice_params.len",
            self.rice_params().len() == nparts,
            "must have an entry per partition"
        )?;
        verify_true!(
            "block_size",
            nparts == 1 || self.block_size() % nparts == 0,
            "must be divisible into partitions"
        )?;
        for (p, rice_p) in self.rice_params().iter().enumerate() {
            verify_range!("rice_params[{p}]", usize::from(*rice_p), ..=MAX_PARAMETER)?;
        }
        for t in 0..self.warmup_length() {
            verify_true!(
                "residuals[{t}]",
                self.residual(t) == 0,
                "must be a zero placeholder for warm-up samples"
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rice::RiceMethod;

    #[test]
    fn residual_with_escape_parameter_is_rejected() {
        let res = Residual::new(RiceMethod::Bits5, 0, 0, &[31], &[0i32; 16]);
        assert!(res.is_err());
    }

    #[test]
    fn residual_with_mismatched_parameter_count_is_rejected() {
        let res = Residual::new(RiceMethod::Bits4, 1, 0, &[3], &[0i32; 16]);
        assert!(res.is_err());
    }

    #[test]
    fn side_channel_sample_sizes_are_accepted() {
        let c = Constant::new(64, -(1i64 << 32), 33);
        assert!(c.is_ok());
        let c = Constant::new(64, 1i64 << 32, 33);
        assert!(c.is_err()); // one past the positive bound
    }
}
