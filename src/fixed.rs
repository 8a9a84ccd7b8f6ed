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

//! Fixed-order linear prediction.
//!
//! The five fixed predictors are the binomial expansions of `(1 - z^-1)^n`
//! for `n` in `0..=4`; the order-`n` residual is therefore the `n`-th
//! successive difference of the signal, which lets all orders be computed by
//! one difference cascade.

use super::constant::fixed::MAX_ORDER;

/// Alias trait for integers accepted as input samples.
///
/// The encoder operates on `i32` channels; side channels of 32-bit streams
/// carry 33 significant bits and use the `i64` instantiation.
pub trait SampleInt: Copy + PartialEq + Into<i64> {}

impl SampleInt for i32 {}
impl SampleInt for i64 {}

/// Sum marker for orders whose residual left the `i32` range.
///
/// Any real sum of absolute residuals stays well below this (the block size
/// is 16-bit and residual magnitudes are below 2^37).
const POISONED_SUM: u64 = (1u64 << 49) - 1;

/// Difference cascade holding the residuals of every fixed order.
///
/// `errors[n][t]` is the order-`n` residual at time `t`; entries with
/// `t < n` are meaningless and skipped by all consumers.
#[derive(Clone, Debug, Default)]
pub struct FixedPredictor {
    errors: [Vec<i64>; MAX_ORDER + 1],
}

impl FixedPredictor {
    pub const fn new() -> Self {
        Self {
            errors: [
                Vec::new(),
                Vec::new(),
                Vec::new(),
                Vec::new(),
                Vec::new(),
            ],
        }
    }

    /// Recomputes the cascade from `samples`.
    pub fn reset<T: SampleInt>(&mut self, samples: &[T]) {
        let n = samples.len();
        self.errors[0].clear();
        self.errors[0].extend(samples.iter().map(|x| (*x).into()));
        for order in 0..MAX_ORDER {
            let (lower, upper) = self.errors.split_at_mut(order + 1);
            let prev = lower[order].as_slice();
            let next = &mut upper[0];
            next.clear();
            next.resize(n, 0i64);
            for t in (order + 1)..n {
                next[t] = prev[t] - prev[t - 1];
            }
        }
    }

    /// Returns the residual signal of the given order.
    ///
    /// The first `order` entries are meaningless placeholders.
    #[inline]
    pub fn errors(&self, order: usize) -> &[i64] {
        &self.errors[order]
    }

    /// Selects the fixed order minimizing the sum of absolute residuals.
    ///
    /// With `check_range` set, any residual that does not fit `i32` poisons
    /// its order; `None` is returned when every order is poisoned, and the
    /// caller is expected to fall back to verbatim coding. The lowest order
    /// wins ties.
    pub fn best_order(&self, check_range: bool) -> Option<usize> {
        let n = self.errors[0].len();
        let mut sums = [0u64; MAX_ORDER + 1];
        for order in 0..=MAX_ORDER {
            let mut acc = 0u64;
            for &e in &self.errors[order][order..n] {
                if check_range && i32::try_from(e).is_err() {
                    acc = POISONED_SUM;
                    break;
                }
                acc += e.unsigned_abs();
            }
            sums[order] = acc;
        }

        let mut best = 0;
        for order in 1..=MAX_ORDER {
            if sums[order] < sums[best] {
                best = order;
            }
        }
        (sums[best] != POISONED_SUM).then_some(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residuals_of(samples: &[i32], order: usize) -> Vec<i64> {
        let mut predictor = FixedPredictor::new();
        predictor.reset(samples);
        predictor.errors(order)[order..].to_vec()
    }

    #[test]
    fn order_zero_residual_is_the_signal() {
        let samples = [5i32, -3, 1000, 0, -1];
        let res = residuals_of(&samples, 0);
        assert_eq!(res, samples.iter().map(|x| i64::from(*x)).collect::<Vec<_>>());
    }

    #[test]
    fn residuals_follow_polynomial_coefficients() {
        let samples: Vec<i32> = (0..32).map(|t| (t * t * t - 7 * t) as i32).collect();
        let mut predictor = FixedPredictor::new();
        predictor.reset(&samples);

        let s = |t: usize| i64::from(samples[t]);
        for t in 4..samples.len() {
            assert_eq!(predictor.errors(1)[t], s(t) - s(t - 1));
            assert_eq!(predictor.errors(2)[t], s(t) - 2 * s(t - 1) + s(t - 2));
            assert_eq!(
                predictor.errors(3)[t],
                s(t) - 3 * s(t - 1) + 3 * s(t - 2) - s(t - 3)
            );
            assert_eq!(
                predictor.errors(4)[t],
                s(t) - 4 * s(t - 1) + 6 * s(t - 2) - 4 * s(t - 3) + s(t - 4)
            );
        }
    }

    #[test]
    fn ramp_differences_vanish_at_order_two() {
        let samples: Vec<i32> = (0..64).collect();
        let mut predictor = FixedPredictor::new();
        predictor.reset(&samples);
        // sums per order are [2016, 63, 0, 0, 0]; the lowest zero-sum order
        // wins.
        assert_eq!(predictor.best_order(false), Some(2));
        assert!(predictor.errors(1)[1..].iter().all(|e| *e == 1));
        assert!(predictor.errors(2)[2..].iter().all(|e| *e == 0));
    }

    #[test]
    fn perturbed_parabola_prefers_order_two() {
        // t^2 plus a period-3 ripple: the second difference is the constant 2
        // plus a small ripple, while the third difference amplifies the
        // ripple, so order 2 attains the minimum.
        let samples: Vec<i32> = (0..64).map(|t| t * t + t % 3).collect();
        let mut predictor = FixedPredictor::new();
        predictor.reset(&samples);
        assert_eq!(predictor.best_order(false), Some(2));
    }

    #[test]
    fn all_zero_signal_ties_to_lowest_order() {
        let samples = [0i32; 16];
        let mut predictor = FixedPredictor::new();
        predictor.reset(&samples);
        assert_eq!(predictor.best_order(false), Some(0));
    }

    #[test]
    fn wide_residuals_poison_high_orders() {
        // Alternating extremes at 33 bits: every difference overflows `i32`,
        // the plain signal does not fit either, so no order survives.
        let wide: Vec<i64> = (0..16)
            .map(|t| if t % 2 == 0 { 1i64 << 32 } else { -(1i64 << 32) })
            .collect();
        let mut predictor = FixedPredictor::new();
        predictor.reset(&wide);
        assert_eq!(predictor.best_order(true), None);
    }

    #[test]
    fn range_check_keeps_representable_orders() {
        // A 33-bit DC signal: order 0 is out of `i32` range but the first
        // difference is all zeros, so order 1 must be chosen.
        let wide = vec![1i64 << 32; 16];
        let mut predictor = FixedPredictor::new();
        predictor.reset(&wide);
        assert_eq!(predictor.best_order(true), Some(1));
    }

    #[test]
    fn range_check_disabled_keeps_all_orders() {
        let samples: Vec<i32> = (0..32).map(|t| t * 3).collect();
        let mut predictor = FixedPredictor::new();
        predictor.reset(&samples);
        assert_eq!(predictor.best_order(false), predictor.best_order(true));
    }
}
