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

//! Command-line front-end of the flacpress encoder.

use std::fs::File;
use std::io::BufWriter;
use std::process::ExitCode;
use std::time::Instant;

use clap::error::ErrorKind;
use clap::Parser;
use log::error;
use log::info;

use flacpress::config;
use flacpress::error::EncodeError;
use flacpress::error::SourceError;
use flacpress::error::SourceErrorReason;
use flacpress::source::Source;

mod source;

use source::HoundSource;

// Exit codes of this tool. Anything I/O-shaped maps to `EX_IOERR` from
// "sysexits.h".
const EXIT_USAGE: u8 = 1;
const EXIT_UNSUPPORTED_FORMAT: u8 = 2;
const EXIT_INCOMPLETE_STREAM: u8 = 3;
const EXIT_IO_ERROR: u8 = 74;

/// FLAC encoder.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct ProgramArgs {
    /// Path for the input WAV file.
    source: String,
    /// Path for the output FLAC file.
    output: String,
    /// Frame size in inter-channel samples.
    #[clap(short, long)]
    block_size: Option<usize>,
}

fn source_exit_code(err: &SourceError) -> u8 {
    match err.reason() {
        SourceErrorReason::InvalidFormat | SourceErrorReason::UnsupportedFormat => {
            EXIT_UNSUPPORTED_FORMAT
        }
        SourceErrorReason::IncompleteStream => EXIT_INCOMPLETE_STREAM,
        SourceErrorReason::Open
        | SourceErrorReason::InvalidBuffer
        | SourceErrorReason::IO(_) => EXIT_IO_ERROR,
        _ => EXIT_IO_ERROR,
    }
}

fn encode_exit_code(err: &EncodeError) -> u8 {
    match err {
        EncodeError::Source(e) => source_exit_code(e),
        EncodeError::Config(_) => EXIT_UNSUPPORTED_FORMAT,
        EncodeError::Io(_) => EXIT_IO_ERROR,
        _ => EXIT_IO_ERROR,
    }
}

fn run(args: &ProgramArgs) -> Result<(), u8> {
    let source = HoundSource::from_path(&args.source).map_err(|e| {
        error!("{e}");
        source_exit_code(&e)
    })?;
    let duration_secs = source.duration_as_secs();
    info!(
        "input: {} ({} ch, {} bits, {} Hz, {:.2} s)",
        args.source,
        source.channels(),
        source.bits_per_sample(),
        source.sample_rate(),
        duration_secs,
    );

    let file = File::create(&args.output).map_err(|e| {
        error!("failed to create {}: {e}", args.output);
        EXIT_IO_ERROR
    })?;
    let mut writer = BufWriter::new(file);

    let mut encoder_config = config::Encoder::default();
    if let Some(block_size) = args.block_size {
        encoder_config.block_size = block_size;
    }

    let started = Instant::now();
    let stream_info = flacpress::encode_with_fixed_block_size(
        &encoder_config,
        source,
        encoder_config.block_size,
        &mut writer,
    )
    .map_err(|e| {
        error!("{e}");
        encode_exit_code(&e)
    })?;
    let elapsed = started.elapsed();

    info!(
        "output: {} ({} samples, frame sizes {}..={} bytes, {:.1}x realtime)",
        args.output,
        stream_info.total_samples(),
        stream_info.min_frame_size(),
        stream_info.max_frame_size(),
        f64::from(duration_secs) / elapsed.as_secs_f64().max(1e-9),
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = match ProgramArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let is_help =
                matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion);
            let _ = e.print();
            return if is_help {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_USAGE)
            };
        }
    };
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}
