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

//! Encoder configuration structs.

use serde::Deserialize;
use serde::Serialize;

use super::constant::rice::MAX_PARAMETER;
use super::constant::rice::MAX_PARTITION_ORDER;
use super::constant::MAX_BLOCK_SIZE;
use super::error::verify_range;
use super::error::verify_true;
use super::error::Verify;
use super::error::VerifyError;

/// Configuration for encoder.
#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct Encoder {
    /// The number of inter-channel samples per frame.
    ///
    /// Only fixed-size blocking is supported; the final frame of a stream may
    /// be shorter.
    pub block_size: usize,
    /// Configuration for stereo-coding module.
    pub stereo_coding: StereoCoding,
    /// Configuration for individual channels.
    pub subframe_coding: SubFrameCoding,
}

impl Default for Encoder {
    fn default() -> Self {
        Self {
            block_size: 4096,
            stereo_coding: StereoCoding::default(),
            subframe_coding: SubFrameCoding::default(),
        }
    }
}

impl Verify for Encoder {
    fn verify(&self) -> Result<(), VerifyError> {
        verify_range!("block_size", self.block_size, 1..=MAX_BLOCK_SIZE)?;
        self.stereo_coding
            .verify()
            .map_err(|e| e.within("stereo_coding"))?;
        self.subframe_coding
            .verify()
            .map_err(|e| e.within("subframe_coding"))
    }
}

/// Configuration for stereo coding algorithms.
#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct StereoCoding {
    /// If set to false, left-side coding will not be used.
    pub use_leftside: bool,
    /// If set to false, side-right coding will not be used.
    pub use_rightside: bool,
    /// If set to false, mid-side coding will not be used.
    pub use_midside: bool,
}

impl Default for StereoCoding {
    fn default() -> Self {
        Self {
            use_leftside: true,
            use_rightside: true,
            use_midside: true,
        }
    }
}

impl Verify for StereoCoding {
    fn verify(&self) -> Result<(), VerifyError> {
        Ok(())
    }
}

/// Configuration for sub-frame (individual channel) coding.
#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct SubFrameCoding {
    // Disabling verbatim coding is intentionally prohibited.
    /// If set to false, constant mode will not be used.
    pub use_constant: bool,
    /// If set to false, fixed-prediction mode will not be used.
    pub use_fixed: bool,
    /// Configuration for partitioned rice coding.
    pub prc: Prc,
}

impl Default for SubFrameCoding {
    fn default() -> Self {
        Self {
            use_constant: true,
            use_fixed: true,
            prc: Prc::default(),
        }
    }
}

impl Verify for SubFrameCoding {
    fn verify(&self) -> Result<(), VerifyError> {
        self.prc.verify().map_err(|e| e.within("prc"))
    }
}

/// Configuration for partitioned-rice coding (PRC).
#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct Prc {
    /// Max value for the parameter of rice coding.
    ///
    /// The effective ceiling of a subframe is the smaller of this and the
    /// widest parameter its sample size can use (14 up to 16-bit samples,
    /// 30 above).
    pub max_parameter: usize,
    /// Max partition order of rice coding.
    pub max_partition_order: usize,
}

impl Default for Prc {
    fn default() -> Self {
        Self {
            max_parameter: MAX_PARAMETER,
            max_partition_order: MAX_PARTITION_ORDER,
        }
    }
}

impl Verify for Prc {
    fn verify(&self) -> Result<(), VerifyError> {
        verify_range!("max_parameter", self.max_parameter, ..=MAX_PARAMETER)?;
        verify_range!(
            "max_partition_order",
            self.max_partition_order,
            ..=MAX_PARTITION_ORDER
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization() {
        let config = Encoder::default();
        assert!(toml::to_string(&config).is_ok());
    }

    #[test]
    fn deserialization() {
        let src = "
block_size = 1024
[subframe_coding.prc]
max_parameter = 12
";
        let config: Encoder = toml::from_str(src).expect("Parse error.");
        assert_eq!(config.block_size, 1024);
        assert_eq!(config.subframe_coding.prc.max_parameter, 12);

        // Check the rest is default.
        assert_eq!(
            config.subframe_coding.prc.max_partition_order,
            MAX_PARTITION_ORDER
        );
        assert!(config.stereo_coding.use_midside);
        assert!(config.subframe_coding.use_fixed);
    }

    #[test]
    fn empty_source_yields_default_config() {
        let config: Encoder = toml::from_str("").expect("Parse error.");
        let default_config = Encoder::default();
        assert_eq!(
            toml::to_string(&config).unwrap(),
            toml::to_string(&default_config).unwrap()
        );
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut config = Encoder::default();
        config.subframe_coding.prc.max_parameter = 256;
        assert!(config.verify().is_err());
        config.subframe_coding.prc.max_parameter = 10;
        assert!(config.verify().is_ok());

        config.block_size = 0;
        assert!(config.verify().is_err());
    }
}
