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

//! Abstract interface for bit-based output.

use std::convert::Infallible;
use std::ops::Shl;

use num_traits::ToBytes;

/// Alias trait for the bit-addressible integers.
pub trait PackedBits: ToBytes + Into<u64> + Shl<usize, Output = Self> + Copy {}

impl<T: ToBytes + Into<u64> + Shl<usize, Output = T> + Copy> PackedBits for T {}

/// Storage-agnostic interface trait for bit-based output.
///
/// All writes are MSB-first: the first bit written becomes the most
/// significant bit of the first output byte.
pub trait BitSink: Sized {
    /// Error type that the underlying storage may emit.
    type Error: std::error::Error;

    /// Puts zeros to `BitSink` until the length aligns to the byte boundaries.
    ///
    /// # Returns
    ///
    /// The number of zeros put.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying storage failed.
    fn align_to_byte(&mut self) -> Result<usize, Self::Error>;

    /// Writes bytes after alignment, and returns the number of padded bits.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying storage failed.
    fn write_bytes_aligned(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        let ret = self.align_to_byte()?;
        for b in bytes {
            self.write_lsbs(*b, 8)?;
        }
        Ok(ret)
    }

    /// Writes `n` LSBs to the sink.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying storage failed.
    fn write_lsbs<T: PackedBits>(&mut self, val: T, n: usize) -> Result<(), Self::Error>;

    /// Writes `n` MSBs to the sink.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying storage failed.
    fn write_msbs<T: PackedBits>(&mut self, val: T, n: usize) -> Result<(), Self::Error>;

    /// Writes all bits in `val: PackedBits`.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying storage failed.
    fn write<T: PackedBits>(&mut self, val: T) -> Result<(), Self::Error>;

    /// Writes `val` in two's complement format.
    ///
    /// This is the masked form of a raw bit write: negative values are
    /// truncated to the `bits_per_sample` low bits of their two's-complement
    /// representation.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying storage failed.
    #[inline]
    fn write_twoc<T: Into<i64>>(
        &mut self,
        val: T,
        bits_per_sample: usize,
    ) -> Result<(), Self::Error> {
        debug_assert!((1..=64).contains(&bits_per_sample));
        let val: i64 = val.into();
        let shifted = (val << (64 - bits_per_sample)) as u64;
        self.write_msbs(shifted, bits_per_sample)
    }

    /// Writes `n` zero bits.
    ///
    /// Unary-coded rice quotients can exceed 63 bits, so `n` is unbounded and
    /// emitted in 64-bit groups.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying storage failed.
    #[inline]
    fn write_zeros(&mut self, n: usize) -> Result<(), Self::Error> {
        let mut n = n;
        while n > 64 {
            self.write_lsbs(0u64, 64)?;
            n -= 64;
        }
        if n > 0 {
            self.write_lsbs(0u64, n)?;
        }
        Ok(())
    }
}

/// In-memory [`BitSink`] backed by `Vec<u8>`.
///
/// This is the workhorse sink of the encoder: frames and metadata blocks are
/// staged here (so CRCs can be computed over the staged bytes) before being
/// flushed to the output file.
#[derive(Clone, Debug, Default)]
pub struct ByteSink {
    bytes: Vec<u8>,
    bitlength: usize,
}

impl ByteSink {
    /// Creates new `ByteSink` instance with the default capacity.
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            bitlength: 0usize,
        }
    }

    /// Creates new `ByteSink` instance with the specified capacity (in bits).
    pub fn with_capacity(capacity_in_bits: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity_in_bits / 8 + 1),
            bitlength: 0usize,
        }
    }

    /// Clears the sink, removing all written bits.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.bitlength = 0;
    }

    /// Reserves capacity for at least `additional_in_bits` more bits.
    pub fn reserve(&mut self, additional_in_bits: usize) {
        self.bytes.reserve(additional_in_bits / 8 + 1);
    }

    /// Returns the number of bits written so far.
    #[inline]
    pub const fn len(&self) -> usize {
        self.bitlength
    }

    /// Returns `true` if no bits are written yet.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.bitlength == 0
    }

    /// Returns the remaining number of bits in the last byte in `self.bytes`.
    #[inline]
    const fn tail_len(&self) -> usize {
        let r = self.bitlength % 8;
        if r == 0 {
            0
        } else {
            8 - r
        }
    }

    /// Returns the written bytes (the last byte is zero-padded if unaligned).
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes `self` and returns the byte buffer.
    #[inline]
    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }

    /// Returns bits in a `String` with written bits as `0`/`1` and the
    /// unwritten remainder of the last byte as `*`.
    pub fn to_bitstring(&self) -> String {
        let mut ret = String::new();
        for b in &self.bytes {
            ret.push_str(&format!("{b:08b}_"));
        }
        ret.pop();
        let tail = self.tail_len();
        if tail > 0 {
            ret.truncate(ret.len() - tail);
            for _ in 0..tail {
                ret.push('*');
            }
        }
        ret
    }

    /// Appends first `n` bits (from MSB) of `val` to the buffer.
    #[inline]
    fn push_u64_msbs(&mut self, val: u64, n: usize) {
        let mut val: u64 = val;
        let mut n = n;
        let nbitlength = self.bitlength + n;
        let r = self.tail_len();

        if r != 0 {
            let b: u8 = ((val >> (64 - r)) & ((1 << r) - 1)) as u8;
            let tail = self.bytes.len() - 1;
            self.bytes[tail] |= b;
            val <<= r;
            n = n.saturating_sub(r);
        }
        while n >= 8 {
            let b: u8 = (val >> (64 - 8) & 0xFFu64) as u8;
            self.bytes.push(b);
            val <<= 8;
            n -= 8;
        }
        if n > 0 {
            let b: u8 = ((val >> (64 - n)) << (8 - n)) as u8;
            self.bytes.push(b);
        }
        self.bitlength = nbitlength;
    }
}

impl BitSink for ByteSink {
    type Error = Infallible;

    #[inline]
    fn write<T: PackedBits>(&mut self, val: T) -> Result<(), Self::Error> {
        let nbitlength = self.bitlength + 8 * std::mem::size_of::<T>();
        let tail = self.tail_len();
        if tail > 0 {
            self.write_msbs(val, tail)?;
        }
        let val = val << tail;
        let bytes: T::Bytes = val.to_be_bytes();
        self.bytes.extend_from_slice(bytes.as_ref());
        self.bitlength = nbitlength;
        Ok(())
    }

    #[inline]
    fn align_to_byte(&mut self) -> Result<usize, Self::Error> {
        let r = self.tail_len();
        self.bitlength += r;
        Ok(r)
    }

    #[inline]
    fn write_bytes_aligned(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        let ret = self.align_to_byte()?;
        self.bytes.extend_from_slice(bytes);
        self.bitlength += 8 * bytes.len();
        Ok(ret)
    }

    #[inline]
    fn write_msbs<T: PackedBits>(&mut self, val: T, n: usize) -> Result<(), Self::Error> {
        if n == 0 {
            return Ok(());
        }
        let initial_shift = 64 - (std::mem::size_of::<T>() * 8);
        let val: u64 = val.into();
        self.push_u64_msbs(val << initial_shift, n);
        Ok(())
    }

    #[inline]
    fn write_lsbs<T: PackedBits>(&mut self, val: T, n: usize) -> Result<(), Self::Error> {
        if n == 0 {
            return Ok(());
        }
        let val: u64 = val.into();
        self.push_u64_msbs(val << (64 - n), n);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bitvec::prelude::bits;
    use bitvec::prelude::BitOrder;
    use bitvec::prelude::BitStore;
    use bitvec::prelude::BitVec;
    use bitvec::prelude::Lsb0;
    use bitvec::prelude::Msb0;
    use bitvec::view::BitView;

    // Reference implementation used to cross-check `ByteSink`.
    impl<T2, O2> BitSink for BitVec<T2, O2>
    where
        T2: BitStore,
        O2: BitOrder,
    {
        type Error = Infallible;

        #[inline]
        fn align_to_byte(&mut self) -> Result<usize, Self::Error> {
            let npad = 8 - self.len() % 8;
            if npad == 8 {
                return Ok(0);
            }
            self.write_lsbs(0u8, npad)?;
            Ok(npad)
        }

        fn write_lsbs<T: PackedBits>(&mut self, val: T, n: usize) -> Result<(), Self::Error> {
            let val: u64 = val.into();
            self.extend_from_bitslice(&val.view_bits::<Msb0>()[64 - n..]);
            Ok(())
        }

        fn write_msbs<T: PackedBits>(&mut self, val: T, n: usize) -> Result<(), Self::Error> {
            let val: u64 = val.into();
            self.extend_from_bitslice(&val.view_bits::<Msb0>()[0..n]);
            Ok(())
        }

        fn write<T: PackedBits>(&mut self, val: T) -> Result<(), Self::Error> {
            self.write_lsbs(val, std::mem::size_of::<T>() * 8)
        }
    }

    #[test]
    fn byte_alignment() -> Result<(), Infallible> {
        let mut sink = ByteSink::new();
        sink.write_lsbs(0x01u8, 1)?;
        sink.align_to_byte()?;
        assert_eq!(sink.len(), 8);
        sink.align_to_byte()?;
        assert_eq!(sink.len(), 8);
        sink.write_lsbs(0x01u8, 2)?;
        assert_eq!(sink.len(), 10);
        sink.align_to_byte()?;
        assert_eq!(sink.len(), 16);
        Ok(())
    }

    #[test]
    fn twoc_writing() -> Result<(), Infallible> {
        let mut sink: BitVec<u8> = BitVec::new();
        sink.write_twoc(-7, 4)?;
        assert_eq!(sink, bits![1, 0, 0, 1]);

        let mut sink = ByteSink::new();
        sink.write_twoc(-7, 4)?;
        assert_eq!(sink.to_bitstring(), "1001****");
        Ok(())
    }

    #[test]
    fn msb_writing() -> Result<(), Infallible> {
        let mut bv = ByteSink::new();
        bv.write_msbs(0xFFu8, 3)?;
        bv.write_msbs(0x0u64, 12)?;
        bv.write_msbs(0xFFFF_FFFFu32, 9)?;
        bv.write_msbs(0x0u16, 8)?;
        assert_eq!(
            bv.to_bitstring(),
            "11100000_00000001_11111111_00000000"
        );
        Ok(())
    }

    #[test]
    fn lsb_writing() -> Result<(), Infallible> {
        let mut bv = ByteSink::new();
        bv.write_lsbs(0xFFu8, 3)?;
        bv.write_lsbs(0x0u64, 12)?;
        bv.write_lsbs(0xFFFF_FFFFu32, 9)?;
        bv.write_lsbs(0x0u16, 8)?;
        assert_eq!(
            bv.to_bitstring(),
            "11100000_00000001_11111111_00000000"
        );
        Ok(())
    }

    #[test]
    fn long_zero_runs() -> Result<(), Infallible> {
        let mut sink = ByteSink::new();
        sink.write_zeros(7)?;
        assert_eq!(sink.len(), 7);
        sink.write_zeros(130)?;
        assert_eq!(sink.len(), 137);
        sink.write_lsbs(1u8, 1)?;
        assert!(sink.as_slice()[..17].iter().all(|b| *b == 0));
        assert_eq!(sink.as_slice()[17], 0x40);
        Ok(())
    }

    #[test]
    fn aligned_byte_writing() -> Result<(), Infallible> {
        let mut sink = ByteSink::new();
        sink.write_lsbs(0x01u8, 2)?;
        let padded = sink.write_bytes_aligned(&[0xAB, 0xCD])?;
        assert_eq!(padded, 6);
        assert_eq!(sink.as_slice(), &[0x40, 0xAB, 0xCD]);
        Ok(())
    }

    #[test]
    fn matches_bitvec_reference() -> Result<(), Infallible> {
        let mut sink = ByteSink::new();
        let mut reference: BitVec<u8, Msb0> = BitVec::new();
        let values = [0x0123_4567u32, 0x89AB_CDEFu32, 0xFFFF_0000u32];
        for (i, v) in values.iter().enumerate() {
            sink.write_lsbs(*v, 7 + i)?;
            reference.write_lsbs(*v, 7 + i)?;
            sink.write_msbs(*v, 3 + i)?;
            reference.write_msbs(*v, 3 + i)?;
        }
        sink.align_to_byte()?;
        reference.align_to_byte()?;
        assert_eq!(sink.as_slice(), reference.as_raw_slice());
        Ok(())
    }
}
