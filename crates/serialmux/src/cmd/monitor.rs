use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serialmux_channel::{ChannelError, Client, ClientConfig, Passthrough, RX};
use serialmux_frame::FrameConfig;
use serialmux_transport::TransportError;
use tracing::info;

use crate::cmd::MonitorArgs;
use crate::exit::{channel_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_frames, print_stats, FrameRecord, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const RX_CAPACITY: usize = 64;

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let link = args.link.open()?;
    let link_name = args.link.device.display().to_string();
    info!(link = %link_name, kind = link.kind(), "monitoring");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    // Nothing is queued on tx, so the rx channel alone decides the limit.
    let state = Passthrough::new(RX_CAPACITY, 1, args.max_frame);
    let config = ClientConfig {
        frame: FrameConfig {
            max_frame_size: args.max_frame,
        },
        ..ClientConfig::default()
    };
    let client = Client::start_with_state(link, state, config)
        .map_err(|err| channel_error("start failed", err))?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
        // Sampled before the take: once closed, nothing more can arrive.
        let connected = client.is_connected();
        match client.get(RX).map_err(|err| channel_error("receive failed", err))? {
            Some(frame) => {
                print_frames(&[FrameRecord::ok(printed, &frame)], format);
                printed = printed.saturating_add(1);
            }
            None if !connected => break,
            None => std::thread::sleep(POLL_INTERVAL),
        }
    }

    if args.stats {
        print_stats(&link_name, client.stats(), format);
    }

    match client.shutdown() {
        Ok(()) => Ok(SUCCESS),
        Err(ChannelError::Transport(TransportError::Closed)) => {
            info!(frames = printed, "link closed by peer");
            Ok(SUCCESS)
        }
        Err(err) => Err(channel_error("link failed", err)),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
