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

//! Macros for thread-local scratch buffers that survive across calls.

/// Declares a thread-local re-usable storage for avoiding reallocation.
///
/// Encoding touches the same per-frame scratch buffers (staging sinks, stereo
/// buffers, predictor cascades) once per frame; keeping them in
/// [`thread_local!`] + [`RefCell`] storage keeps the hot path allocation-free.
///
/// [`RefCell`]: std::cell::RefCell
#[macro_export]
macro_rules! reusable {
    ($key:ident: $t:ty) => {
        thread_local! {
            static $key: std::cell::RefCell<$t> = std::cell::RefCell::new(Default::default());
        }
    };
    ($key:ident: $t:ty = $init:expr) => {
        thread_local! {
            static $key: std::cell::RefCell<$t> = std::cell::RefCell::new($init);
        }
    };
}

/// Borrows a storage declared with [`reusable!`] for the duration of a closure.
#[macro_export]
macro_rules! reuse {
    ($key:ident, $fn:expr) => {{
        #[allow(clippy::redundant_closure_call)]
        $key.with(|cell| $fn(&mut cell.borrow_mut()))
    }};
}

#[cfg(test)]
mod tests {
    reusable!(SCRATCH: Vec<u8>);

    #[test]
    fn storage_persists_between_uses() {
        fn produce() {
            reuse!(SCRATCH, |buf: &mut Vec<u8>| {
                assert!(buf.is_empty());
                buf.extend_from_slice(&[1, 2, 3]);
            });
        }

        fn observe() {
            reuse!(SCRATCH, |buf: &mut Vec<u8>| {
                assert_eq!(buf.as_slice(), &[1, 2, 3]);
            });
        }

        produce();
        observe();
    }
}
