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

//! Functions for partitioned rice coding (PRC).

use std::cmp::max;
use std::cmp::min;

use super::constant::rice::MAX_PARAMETER_4BIT;

/// Parameter-field width selector of a partitioned-rice residual.
///
/// The 4-bit method codes parameters up to 14, the 5-bit method up to 30. The
/// remaining all-ones tag of either method escapes to raw binary partitions,
/// which this encoder never emits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RiceMethod {
    /// 4-bit partition parameters (coding method `0b00`).
    Bits4,
    /// 5-bit partition parameters (coding method `0b01`).
    Bits5,
}

impl RiceMethod {
    /// Returns the 2-bit coding-method tag.
    #[inline]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Bits4 => 0,
            Self::Bits5 => 1,
        }
    }

    /// Returns the width of each partition-parameter field in bits.
    #[inline]
    pub const fn parameter_bits(self) -> usize {
        match self {
            Self::Bits4 => 4,
            Self::Bits5 => 5,
        }
    }
}

/// Encodes the sign bit into its LSB (for rice coding).
///
/// The wrapping operations are exact: only `i32::MIN` reaches the wrap, and
/// it maps to `u32::MAX` as required.
#[inline]
pub const fn encode_signbit(v: i32) -> u32 {
    let is_negative = if v < 0 { 1u32 } else { 0u32 };
    v.unsigned_abs().wrapping_mul(2).wrapping_sub(is_negative)
}

/// Recovers a sign bit from its LSB.
#[inline]
pub const fn decode_signbit(v: u32) -> i32 {
    let is_negative = v % 2 == 1;
    if is_negative {
        (((v >> 1) + 1) as i32).wrapping_neg()
    } else {
        (v >> 1) as i32
    }
}

/// Estimates the bit count of one partition coded with parameter `p`.
///
/// `sum` is the sum of sign-encoded residuals and `len` the number of coded
/// residuals. The unary part is approximated from the sum; for near-silent
/// partitions (`sum < len / 2`) it saturates at the terminator bits alone.
#[inline]
const fn partition_cost(sum: u64, len: u64, p: usize) -> u64 {
    len * (p as u64 + 1) + (sum.saturating_sub(len / 2) >> p)
}

/// Finds the parameter in `0..=max_p` minimizing [`partition_cost`].
///
/// Returns the smallest such parameter and its estimated bit count.
#[inline]
fn best_parameter(sum: u64, len: u64, max_p: usize) -> (usize, u64) {
    let mut ret = (0usize, partition_cost(sum, len, 0));
    let mut p = 1;
    while p <= max_p {
        let bits = partition_cost(sum, len, p);
        if bits < ret.1 {
            ret = (p, bits);
        }
        p += 1;
    }
    ret
}

/// Finds the number of finest partitions.
///
/// The order is bounded by divisibility of `size` and by the requirement that
/// warm-up samples stay (mostly) within the first partition.
#[inline]
fn finest_partition_order(size: usize, warmup_length: usize, max_order: usize) -> usize {
    let mut ret = min(max_order, size.trailing_zeros() as usize);
    if warmup_length > 0 {
        ret = min(ret, (size.ilog2() - warmup_length.ilog2()) as usize);
    }
    ret
}

/// Parameter for PRC (partitioned rice coding).
#[derive(Clone, Debug)]
pub struct PrcParameter {
    /// Width of the parameter fields.
    pub method: RiceMethod,
    /// Partition order; the residual is split into `2^order` partitions.
    pub order: usize,
    /// Rice parameter of each partition.
    pub ps: Vec<u8>,
    /// Estimated total bit count including the partitioning overhead.
    pub code_bits: usize,
}

impl PrcParameter {
    pub(crate) fn new(method: RiceMethod, order: usize, ps: Vec<u8>, code_bits: usize) -> Self {
        Self {
            method,
            order,
            ps,
            code_bits,
        }
    }
}

/// Helper object that holds pre-allocated buffers for PRC optimization.
///
/// The partition sums of all orders form a `(P_max + 1) x 2^P_max` pyramid;
/// levels are computed in place by pairwise merging from the finest order.
#[derive(Default)]
struct PrcParameterFinder {
    sums: Vec<u64>,
    counts: Vec<u64>,
    ps: Vec<u8>,
    min_ps: Vec<u8>,
}

impl PrcParameterFinder {
    pub const fn new() -> Self {
        Self {
            sums: Vec::new(),
            counts: Vec::new(),
            ps: Vec::new(),
            min_ps: Vec::new(),
        }
    }

    pub fn find(
        &mut self,
        errors: &[i32],
        warmup_length: usize,
        max_p: usize,
        max_order: usize,
    ) -> PrcParameter {
        debug_assert!(errors.len() > warmup_length);
        let block_size = errors.len();
        let mut order = finest_partition_order(block_size, warmup_length, max_order);
        let mut nparts = 1usize << order;
        let part_size = block_size >> order;

        // Finest-order partition sums. Entries before `warmup_length` are raw
        // warm-up samples and are excluded from both the sum and the count.
        self.sums.clear();
        self.counts.clear();
        for j in 0..nparts {
            let end = (j + 1) * part_size;
            let start = min(max(j * part_size, warmup_length), end);
            let mut acc = 0u64;
            for e in &errors[start..end] {
                acc += u64::from(encode_signbit(*e));
            }
            self.sums.push(acc);
            self.counts.push((end - start) as u64);
        }

        let mut min_bits = u64::MAX;
        let mut min_order = order;
        let mut min_method = RiceMethod::Bits4;
        loop {
            self.ps.clear();
            let mut body = 0u64;
            let mut widest = 0usize;
            for j in 0..nparts {
                let (p, bits) = best_parameter(self.sums[j], self.counts[j], max_p);
                self.ps.push(p as u8);
                body += bits;
                widest = max(widest, p);
            }
            let method = if widest > MAX_PARAMETER_4BIT {
                RiceMethod::Bits5
            } else {
                RiceMethod::Bits4
            };
            let total = body + 4 + ((method.parameter_bits() as u64) << order);
            // Strict comparison while scanning from the finest order keeps the
            // finer partitioning on ties.
            if total < min_bits {
                min_bits = total;
                min_order = order;
                min_method = method;
                std::mem::swap(&mut self.min_ps, &mut self.ps);
            }
            if nparts == 1 {
                break;
            }
            for j in 0..nparts / 2 {
                self.sums[j] = self.sums[2 * j] + self.sums[2 * j + 1];
                self.counts[j] = self.counts[2 * j] + self.counts[2 * j + 1];
            }
            nparts /= 2;
            order -= 1;
        }
        PrcParameter::new(min_method, min_order, self.min_ps.clone(), min_bits as usize)
    }
}

reusable!(RICE_PARAMETER_FINDER: PrcParameterFinder = PrcParameterFinder::new());

/// Searches the partition order and per-partition parameters minimizing the
/// estimated bit count of the rice-coded `errors`.
///
/// The first `warmup_length` entries of `errors` are raw warm-up samples and
/// do not participate in residual coding. `max_p` caps the per-partition
/// parameter and `max_order` the partition order.
pub fn find_partitioned_rice_parameter(
    errors: &[i32],
    warmup_length: usize,
    max_p: usize,
    max_order: usize,
) -> PrcParameter {
    reuse!(RICE_PARAMETER_FINDER, |finder: &mut PrcParameterFinder| {
        finder.find(errors, warmup_length, max_p, max_order)
    })
}

/// Estimates the bit count of a single-partition rice code from an
/// (already doubled) residual magnitude sum.
///
/// Used by the stereo-mode chooser, which only needs a coarse per-channel
/// score and therefore derives the parameter directly from the logarithm of
/// the average magnitude instead of scanning.
pub fn estimate_code_bits(doubled_sum: u64, len: usize) -> usize {
    if doubled_sum == 0 {
        return 5;
    }
    let p = doubled_sum.ilog2().saturating_sub(len.max(1).ilog2() as u32) as usize;
    partition_cost(doubled_sum, len as u64, p) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signbit_encoding_interleaves() {
        assert_eq!(encode_signbit(0), 0);
        assert_eq!(encode_signbit(-1), 1);
        assert_eq!(encode_signbit(1), 2);
        assert_eq!(encode_signbit(-2), 3);
        assert_eq!(encode_signbit(2), 4);
        assert_eq!(encode_signbit(i32::MAX), 0xFFFF_FFFE);
        assert_eq!(encode_signbit(i32::MIN), 0xFFFF_FFFF);
    }

    #[test]
    fn signbit_round_trip() {
        for v in [
            0i32,
            1,
            -1,
            2,
            -2,
            12345,
            -12345,
            i32::MAX,
            i32::MIN,
            i32::MAX - 1,
            i32::MIN + 1,
        ] {
            assert_eq!(decode_signbit(encode_signbit(v)), v);
        }
    }

    #[test]
    fn signbit_is_monotone_in_magnitude() {
        let mut prev_max = 0u32;
        for mag in 1..2048i32 {
            let lo = encode_signbit(mag).min(encode_signbit(-mag));
            let hi = encode_signbit(mag).max(encode_signbit(-mag));
            assert!(lo > prev_max);
            prev_max = hi;
        }
    }

    #[test]
    fn quotient_remainder_round_trip() {
        for k in 0..=30u32 {
            for v in [0i32, 1, -1, 3, -4, 255, -256, 65535, -65536, 0x0FFF_FFFF] {
                let z = encode_signbit(v);
                let quotient = u64::from(z) >> k;
                let remainder = z & ((1u32 << k) - 1);
                let rebuilt = ((quotient as u32) << k) | remainder;
                assert_eq!(decode_signbit(rebuilt), v, "k={k} v={v}");
            }
        }
    }

    #[test]
    fn finest_partition_order_bounds() {
        assert_eq!(finest_partition_order(64, 0, 8), 6);
        assert_eq!(finest_partition_order(64, 1, 8), 6);
        assert_eq!(finest_partition_order(64, 2, 8), 5);
        assert_eq!(finest_partition_order(64, 4, 8), 4);
        assert_eq!(finest_partition_order(4096, 4, 8), 8);
        // odd sizes cannot be partitioned
        assert_eq!(finest_partition_order(63, 2, 8), 0);
        assert_eq!(finest_partition_order(192, 3, 8), 6);
    }

    #[test]
    fn ramp_residuals_use_single_partition() {
        // order-1 residual of a ramp: one warm-up then all ones.
        let mut errors = vec![1i32; 64];
        errors[0] = 0;
        let prc_p = find_partitioned_rice_parameter(&errors, 1, 14, 8);
        assert_eq!(prc_p.order, 0);
        assert_eq!(prc_p.ps, vec![0u8]);
        assert_eq!(prc_p.method, RiceMethod::Bits4);
        // 63 unary-coded ones (3 bits each under the estimate) + overhead.
        assert_eq!(prc_p.code_bits, 158 + 4 + 4);
    }

    #[test]
    fn partitioning_splits_mixed_magnitudes() {
        // First half loud, second half quiet: two partitions should beat one.
        let mut errors = vec![0i32; 128];
        for (t, e) in errors.iter_mut().enumerate() {
            *e = if t < 64 { 4096 + (t as i32 % 7) } else { 2 };
        }
        let prc_p = find_partitioned_rice_parameter(&errors, 0, 14, 8);
        assert!(prc_p.order >= 1);
        let nparts = 1 << prc_p.order;
        assert!(prc_p.ps[0] > prc_p.ps[nparts - 1]);
    }

    #[test]
    fn five_bit_method_engages_for_wide_parameters() {
        let errors = vec![0x1000_0000i32; 32];
        let prc_p = find_partitioned_rice_parameter(&errors, 0, 30, 8);
        assert_eq!(prc_p.method, RiceMethod::Bits5);
        assert!(prc_p.ps.iter().all(|p| usize::from(*p) > MAX_PARAMETER_4BIT));
    }

    #[test]
    fn parameter_cap_is_respected() {
        let errors = vec![0x1000_0000i32; 32];
        let prc_p = find_partitioned_rice_parameter(&errors, 0, 14, 8);
        assert!(prc_p.ps.iter().all(|p| usize::from(*p) <= MAX_PARAMETER_4BIT));
        assert_eq!(prc_p.method, RiceMethod::Bits4);
    }

    #[test]
    fn warmups_spill_into_second_partition() {
        // size 8 with 3 warm-ups allows order 2 (partition size 2); the third
        // warm-up lands in partition 1 and must not be counted there.
        let errors = [7, 7, 7, 100, 100, 100, 100, 100];
        let prc_p = find_partitioned_rice_parameter(&errors, 3, 14, 8);
        assert!(prc_p.order <= 2);
        assert!(prc_p.code_bits > 0);
    }

    #[test]
    fn single_partition_estimate() {
        assert_eq!(estimate_code_bits(0, 4096), 5);
        // sum chosen so the derived parameter is ilog2(8192) - ilog2(64) = 7.
        let bits = estimate_code_bits(8192, 64);
        assert_eq!(bits, 64 * 8 + ((8192u64 - 32) >> 7) as usize);
        // very small sums clamp the parameter at zero and saturate the
        // quotient estimate.
        let bits = estimate_code_bits(3, 64);
        assert_eq!(bits, 64);
    }

    #[test]
    fn zero_residuals_cost_their_terminators() {
        let errors = vec![0i32; 64];
        let prc_p = find_partitioned_rice_parameter(&errors, 2, 14, 8);
        assert_eq!(prc_p.order, 0);
        assert_eq!(prc_p.ps, vec![0u8]);
        // 62 coded residuals, one terminator bit each, plus overhead.
        assert_eq!(prc_p.code_bits, 62 + 4 + 4);
    }
}
