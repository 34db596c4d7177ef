use clap::{Args, Subcommand};
use std::path::PathBuf;

use serialmux_transport::{LinkStream, SerialPort};

use crate::exit::{transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod monitor;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stuff a payload and print its wire bytes.
    Encode(EncodeArgs),
    /// Split hex wire bytes into frames.
    Decode(DecodeArgs),
    /// Print frames received on a link.
    Monitor(MonitorArgs),
    /// Send a single frame.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where the link is and how to open it.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial device, or socket path with --unix.
    #[arg(env = "SERIALMUX_DEVICE")]
    pub device: PathBuf,
    /// Treat DEVICE as a Unix socket speaking the wire format.
    #[arg(long)]
    pub unix: bool,
    /// Line speed for serial devices.
    #[arg(long, env = "SERIALMUX_BAUD", default_value_t = SerialPort::DEFAULT_BAUD)]
    pub baud: u32,
}

impl LinkArgs {
    pub fn open(&self) -> CliResult<LinkStream> {
        let link = if self.unix {
            LinkStream::connect_unix(&self.device)
        } else {
            LinkStream::open_serial(&self.device, self.baud)
        };
        link.map_err(|err| transport_error("open failed", err))
    }
}

/// One payload, given inline or read from a file.
#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex payload (e.g. "11 22 00 33").
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    pub fn resolve(&self) -> CliResult<Vec<u8>> {
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(hex) = &self.hex {
            return crate::hex::parse(hex);
        }
        if let Some(path) = &self.file {
            return std::fs::read(path).map_err(|err| {
                crate::exit::io_error(&format!("failed reading {}", path.display()), err)
            });
        }
        Err(CliError::new(
            USAGE,
            "a payload is required: --data, --hex or --file",
        ))
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex wire bytes; frames end at each 00.
    #[arg(conflicts_with = "file")]
    pub wire: Option<String>,
    /// Read raw wire bytes from a file instead.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Largest stuffed frame accepted, in bytes.
    #[arg(long, default_value_t = serialmux_frame::DEFAULT_MAX_FRAME)]
    pub max_frame: usize,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Largest stuffed frame accepted, in bytes.
    #[arg(long, default_value_t = serialmux_frame::DEFAULT_MAX_FRAME)]
    pub max_frame: usize,
    /// Print link counters on exit.
    #[arg(long)]
    pub stats: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Send a bare delimiter first so a receiver stuck mid-frame resyncs.
    #[arg(long = "break")]
    pub send_break: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
