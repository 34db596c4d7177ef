use bytes::BytesMut;
use serialmux_frame::encode_frame;

use crate::cmd::EncodeArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.payload.resolve()?;
    let mut wire = BytesMut::new();
    encode_frame(&payload, &mut wire);
    print_encoded(payload.len(), &wire, format);
    Ok(SUCCESS)
}
