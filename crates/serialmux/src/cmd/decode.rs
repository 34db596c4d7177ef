use std::fs;

use serialmux_frame::{FrameConfig, FrameDecoder};

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_frames, FrameRecord, FrameStatus, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let wire = match (&args.wire, &args.file) {
        (Some(hex), None) => crate::hex::parse(hex)?,
        (None, Some(path)) => fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
        _ => return Err(CliError::new(USAGE, "give hex wire bytes or --file")),
    };

    let config = FrameConfig {
        max_frame_size: args.max_frame,
    };
    let (records, pending) = split_frames(&wire, &config);
    print_frames(&records, format);

    if pending > 0 {
        tracing::warn!(pending, "input ends mid-frame; trailing bytes ignored");
    }
    if records.iter().any(|r| r.status == FrameStatus::Malformed) {
        return Err(CliError::new(DATA_INVALID, "input contains malformed frames"));
    }
    Ok(SUCCESS)
}

/// Decode every delimited frame in `wire`. Also returns how many bytes
/// trail the last delimiter.
fn split_frames(wire: &[u8], config: &FrameConfig) -> (Vec<FrameRecord>, usize) {
    let mut decoder = FrameDecoder::with_config(config);
    let mut records = Vec::new();
    decoder.push(wire, |result| {
        let index = records.len();
        records.push(match result {
            Ok(frame) => FrameRecord::ok(index, &frame),
            Err(err) => FrameRecord::malformed(index, err),
        });
    });
    (records, decoder.pending())
}
