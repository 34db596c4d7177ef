use serialmux_frame::FrameWriter;
use tracing::debug;

use crate::cmd::SendArgs;
use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.payload.resolve()?;
    let link = args.link.open()?;
    let mut writer = FrameWriter::new(link);

    if args.send_break {
        writer
            .send_break()
            .map_err(|err| frame_error("send failed", err))?;
    }
    let wire_size = writer
        .send(&payload)
        .map_err(|err| frame_error("send failed", err))?;
    writer
        .get_ref()
        .drain()
        .map_err(|err| transport_error("drain failed", err))?;
    debug!(size = payload.len(), wire_size, "frame sent");

    print_sent(
        &args.link.device.display().to_string(),
        payload.len(),
        wire_size,
        format,
    );
    Ok(SUCCESS)
}
