use std::io::{self, ErrorKind};
use std::os::fd::AsFd;
use std::sync::Arc;

use bytes::BytesMut;
use serialmux_frame::{write_frame, FrameDecoder, FrameError};
use serialmux_transport::{wait_readable, ByteStream, TransportError};
use tracing::{debug, info, trace, warn};

use crate::client::Shared;
use crate::error::{ChannelError, Result};
use crate::state::ChannelState;

const STREAM: usize = 0;
const TX_READY: usize = 1;

/// The background worker that owns the stream.
///
/// Each pass, with the gate held: drain whatever the stream has buffered
/// into the frame decoder and hand complete frames to the state, then ask
/// the state for frames to send until it has none. Only when a pass moved
/// nothing in either direction does the loop release the gate and block,
/// waiting for the stream to become readable or `tx_ready` to be raised.
pub(crate) struct TransportLoop<S: ChannelState, T> {
    shared: Arc<Shared<S>>,
    stream: T,
    decoder: FrameDecoder,
    rx_buf: BytesMut,
    tx_buf: Vec<u8>,
    scratch: BytesMut,
}

impl<S: ChannelState, T: ByteStream> TransportLoop<S, T> {
    pub(crate) fn new(shared: Arc<Shared<S>>, stream: T, decoder: FrameDecoder) -> Self {
        let tx_len = shared.gate.lock().max_frame_len();
        Self {
            shared,
            stream,
            decoder,
            rx_buf: BytesMut::new(),
            tx_buf: vec![0; tx_len],
            scratch: BytesMut::new(),
        }
    }

    /// Run until stopped or the link fails, then mark the link closed.
    pub(crate) fn run(mut self) -> Result<()> {
        info!("transport loop started");
        let result = self.pump();
        self.shared.mark_closed();

        match &result {
            Ok(()) => info!("transport loop stopped"),
            Err(err) => warn!(error = %err, "transport loop exited"),
        }
        result
    }

    fn pump(&mut self) -> Result<()> {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.gate.lock();
        let mut stream_woke = false;

        loop {
            if shared.stop_requested() {
                return Ok(());
            }

            let received = self.pump_rx(&mut state, stream_woke)?;
            let sent = self.pump_tx(&mut state)?;
            shared.table.publish(&state);

            if received > 0 || sent > 0 {
                stream_woke = false;
                continue;
            }

            drop(state);
            trace!("transport loop idle");
            let ready = wait_readable(
                &[self.stream.as_fd(), shared.gate.tx_ready().as_fd()],
                None,
            )
            .map_err(TransportError::Io)?;
            state = shared.gate.lock();

            stream_woke = ready.is_readable(STREAM);
            if ready.is_readable(TX_READY) {
                shared.gate.tx_ready().clear();
            }
        }
    }

    /// Returns the number of bytes taken off the stream.
    fn pump_rx(&mut self, state: &mut S, stream_woke: bool) -> Result<usize> {
        self.rx_buf.clear();
        let mut read = match self.stream.read_available(&mut self.rx_buf) {
            Ok(n) => n,
            Err(err) if is_transient(&err) => 0,
            Err(err) => return Err(TransportError::Io(err).into()),
        };

        // Readable with nothing buffered is how a hang-up shows itself.
        if read == 0 && stream_woke {
            read = self.probe_eof()?;
        }
        if read == 0 {
            return Ok(0);
        }

        let shared = &self.shared;
        shared.stats.record_bytes_received(read);
        self.decoder.push(&self.rx_buf, |result| match result {
            Ok(frame) => {
                debug!(len = frame.len(), "frame received");
                shared.stats.record_frame_received();
                state.decode(&frame);
            }
            Err(err @ FrameError::FrameTooLarge { .. }) => {
                debug!(error = %err, "dropping oversized frame");
                shared.stats.record_oversized();
            }
            Err(err) => {
                debug!(error = %err, "dropping malformed frame");
                shared.stats.record_malformed();
            }
        });

        Ok(read)
    }

    fn probe_eof(&mut self) -> Result<usize> {
        let mut byte = [0u8; 1];
        loop {
            match self.stream.read(&mut byte) {
                Ok(0) => return Err(TransportError::Closed.into()),
                Ok(n) => {
                    self.rx_buf.extend_from_slice(&byte[..n]);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(0),
                Err(err) => return Err(TransportError::Io(err).into()),
            }
        }
    }

    /// Returns the number of frames written.
    fn pump_tx(&mut self, state: &mut S) -> Result<usize> {
        let mut sent = 0;
        loop {
            let len = state.encode(&mut self.tx_buf);
            if len == 0 {
                return Ok(sent);
            }
            let frame = self.tx_buf.get(..len).ok_or(ChannelError::CodecOverrun {
                written: len,
                capacity: self.tx_buf.len(),
            })?;

            let wire_len = write_frame(&mut self.stream, frame, &mut self.scratch)?;
            debug!(len, wire_len, "frame sent");
            self.shared.stats.record_frame_sent(wire_len);
            self.shared.gate.tx_done().set();
            sent += 1;
        }
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted)
}
