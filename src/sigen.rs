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

//! Test signal generator module.
//!
//! This module is primarily intended to be used in tests, but it is exposed
//! so external harnesses can synthesize deterministic inputs.

use rand::Rng;
use rand::SeedableRng;

/// Test signal generators.
pub trait Signal {
    /// Generates a signal from t=`sample_offset` and fills the buffer `dest`.
    fn fill_buffer(&self, sample_offset: usize, dest: &mut [f32]);

    /// Generates a signal and returns `Vec` containing quantized ints.
    fn to_vec_quantized(&self, bits_per_sample: usize, block_size: usize) -> Vec<i32> {
        assert!((4..=24).contains(&bits_per_sample));
        let scalefactor = (1usize << (bits_per_sample - 1)) as f32;
        let min_target = -(1i32 << (bits_per_sample - 1)) as f32;
        let max_target = ((1i32 << (bits_per_sample - 1)) - 1) as f32;

        let mut buffer = vec![0.0f32; block_size];
        self.fill_buffer(0, &mut buffer);
        buffer
            .into_iter()
            .map(|x| (scalefactor * x).round().clamp(min_target, max_target) as i32)
            .collect()
    }

    /// Mixes uniform noise of the given amplitude into the signal.
    fn noise(self, amplitude: f32) -> Mix<Self, Noise>
    where
        Self: Sized,
    {
        self.mix(Noise::new(amplitude))
    }

    /// Mixes signal from the other generator.
    fn mix<T: Signal + Sized>(self, other: T) -> Mix<Self, T>
    where
        Self: Sized,
    {
        Mix::new(1.0, self, 1.0, other)
    }

    /// Concats `other` signal after `offset_time` samples.
    fn concat<T: Signal + Sized>(self, offset_time: usize, other: T) -> Switch<Self, T>
    where
        Self: Sized,
    {
        Switch::new(self, offset_time, other)
    }
}

/// Generator for constant signals.
#[derive(Clone, Debug)]
pub struct Dc {
    offset: f32,
}

impl Dc {
    /// Constructs new `Dc` signal.
    pub const fn new(offset: f32) -> Self {
        Self { offset }
    }
}

impl Signal for Dc {
    fn fill_buffer(&self, _offset: usize, dest: &mut [f32]) {
        for p in dest {
            *p = self.offset;
        }
    }
}

/// Generator for a sinusoidal wave.
#[derive(Clone, Debug)]
pub struct Sine {
    period: usize,
    amplitude: f32,
}

impl Sine {
    /// Constructs new sine wave signal with `period` and `amplitude`.
    pub const fn new(period: usize, amplitude: f32) -> Self {
        Self { period, amplitude }
    }
}

impl Signal for Sine {
    fn fill_buffer(&self, offset: usize, dest: &mut [f32]) {
        let period = self.period as f32;
        for (t, p) in dest.iter_mut().enumerate() {
            let t = (t + offset) as f32;
            *p = self.amplitude * f32::sin(2.0 * std::f32::consts::PI * t / period);
        }
    }
}

/// Generator for a uniform random white noise.
#[derive(Clone, Debug)]
pub struct Noise {
    seed: u64,
    amplitude: f32,
}

impl Noise {
    /// Constructs new noise generator with a random seed.
    pub fn new(amplitude: f32) -> Self {
        let seed: u64 = rand::thread_rng().gen();
        Self { seed, amplitude }
    }

    /// Constructs new noise generator with the given seed.
    pub const fn with_seed(seed: u64, amplitude: f32) -> Self {
        Self { seed, amplitude }
    }
}

impl Signal for Noise {
    fn fill_buffer(&self, offset: usize, dest: &mut [f32]) {
        let mut rng = rand::rngs::StdRng::seed_from_u64(self.seed.wrapping_add(offset as u64));
        for p in dest {
            *p = self.amplitude * 2.0 * (rng.sample::<f32, _>(rand::distributions::Open01) - 0.5);
        }
    }
}

/// Decorator that mixes outputs from the inner generators.
#[derive(Clone, Debug)]
pub struct Mix<T1: Signal + Sized, T2: Signal + Sized> {
    weight1: f32,
    weight2: f32,
    signal1: T1,
    signal2: T2,
}

impl<T1: Signal + Sized, T2: Signal + Sized> Mix<T1, T2> {
    /// Constructs new two-input mixer.
    pub const fn new(weight1: f32, signal1: T1, weight2: f32, signal2: T2) -> Self {
        Self {
            weight1,
            weight2,
            signal1,
            signal2,
        }
    }
}

impl<T1: Signal + Sized, T2: Signal + Sized> Signal for Mix<T1, T2> {
    fn fill_buffer(&self, offset: usize, dest: &mut [f32]) {
        let mut buf = vec![0.0f32; dest.len()];
        self.signal1.fill_buffer(offset, &mut buf);
        for (p, x) in dest.iter_mut().zip(buf.iter()) {
            *p = self.weight1 * *x;
        }
        self.signal2.fill_buffer(offset, &mut buf);
        for (p, x) in dest.iter_mut().zip(buf.iter()) {
            *p += self.weight2 * *x;
        }
    }
}

/// Decorator that switches two generators at a timestamp.
#[derive(Clone, Debug)]
pub struct Switch<T1: Signal + Sized, T2: Signal + Sized> {
    input1: T1,
    offset: usize,
    input2: T2,
}

impl<T1: Signal + Sized, T2: Signal + Sized> Switch<T1, T2> {
    /// Constructs a switcher.
    pub const fn new(input1: T1, offset: usize, input2: T2) -> Self {
        Self {
            input1,
            offset,
            input2,
        }
    }
}

impl<T1: Signal + Sized, T2: Signal + Sized> Signal for Switch<T1, T2> {
    fn fill_buffer(&self, offset: usize, dest: &mut [f32]) {
        self.input1.fill_buffer(offset, dest);
        if self.offset < dest.len() {
            let switch_at = self.offset;
            self.input2
                .fill_buffer(offset + switch_at, &mut dest[switch_at..]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantization_respects_bit_depth() {
        let signal = Dc::new(1.0).to_vec_quantized(8, 16);
        assert_eq!(signal, vec![127i32; 16]);
        let signal = Dc::new(-1.0).to_vec_quantized(8, 16);
        assert_eq!(signal, vec![-128i32; 16]);
    }

    #[test]
    fn noise_is_reproducible_with_seed() {
        let a = Noise::with_seed(42, 0.5).to_vec_quantized(16, 64);
        let b = Noise::with_seed(42, 0.5).to_vec_quantized(16, 64);
        assert_eq!(a, b);
    }

    #[test]
    fn switch_changes_generator_at_offset() {
        let signal = Dc::new(0.25).concat(8, Dc::new(-0.25)).to_vec_quantized(16, 16);
        assert!(signal[..8].iter().all(|v| *v > 0));
        assert!(signal[8..].iter().all(|v| *v < 0));
    }
}
