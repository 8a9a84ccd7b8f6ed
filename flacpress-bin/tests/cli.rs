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

//! Exit-code and output-shape tests for the command line tool.

use std::fs;
use std::path::Path;
use std::process::Command;

fn write_test_wav(path: &Path, channels: u16, bits_per_sample: u16, len: usize) {
    let spec = hound::WavSpec {
        channels,
        sample_rate: 44100,
        bits_per_sample,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("WAV write failed");
    for t in 0..len {
        for ch in 0..channels {
            let v = ((t * (7 + ch as usize)) % 256) as i32 - 128;
            writer.write_sample(v).unwrap();
        }
    }
    writer.finalize().unwrap();
}

fn run_encoder(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_flacpress"))
        .args(args)
        .output()
        .expect("failed to spawn the encoder binary")
}

#[test]
fn encodes_wav_to_flac() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.wav");
    let output = dir.path().join("output.flac");
    write_test_wav(&input, 2, 16, 9000);

    let result = run_encoder(&[input.to_str().unwrap(), output.to_str().unwrap()]);
    assert_eq!(result.status.code(), Some(0));

    let encoded = fs::read(&output).unwrap();
    assert_eq!(&encoded[0..4], b"fLaC");
    assert_eq!(&encoded[4..8], &[0x00, 0x00, 0x00, 0x22]);
    // The patched StreamInfo carries the total sample count (9000) and a
    // nonzero MD5.
    assert_eq!(&encoded[8 + 14..8 + 18], &9000u32.to_be_bytes());
    assert!(encoded[8 + 18..8 + 34].iter().any(|b| *b != 0));
}

#[test]
fn missing_argument_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.wav");
    write_test_wav(&input, 1, 16, 100);

    let result = run_encoder(&[input.to_str().unwrap()]);
    assert_eq!(result.status.code(), Some(1));
}

#[test]
fn float_wav_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("float.wav");
    let output = dir.path().join("output.flac");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&input, spec).unwrap();
    for t in 0..256 {
        writer.write_sample((t as f32) / 256.0).unwrap();
    }
    writer.finalize().unwrap();

    let result = run_encoder(&[input.to_str().unwrap(), output.to_str().unwrap()]);
    assert_eq!(result.status.code(), Some(2));
}

#[test]
fn truncated_wav_reports_incomplete_stream() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("truncated.wav");
    let output = dir.path().join("output.flac");
    write_test_wav(&input, 2, 16, 5000);

    // Chop the tail of the data chunk without touching the header.
    let bytes = fs::read(&input).unwrap();
    fs::write(&input, &bytes[..bytes.len() - 1000]).unwrap();

    let result = run_encoder(&[input.to_str().unwrap(), output.to_str().unwrap()]);
    assert_eq!(result.status.code(), Some(3));
}

#[test]
fn unreadable_input_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("does-not-exist.wav");
    let output = dir.path().join("output.flac");

    let result = run_encoder(&[input.to_str().unwrap(), output.to_str().unwrap()]);
    assert_eq!(result.status.code(), Some(74));
}
