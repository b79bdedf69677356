//! UDP ingestion loop: datagram -> pose snapshot -> dispatch queue.

use super::{PipelineState, PipelineStats};
use crate::error::{PipelineError, TransportError};
use crate::types::NetworkConfig;
use crate::utils::pose_codec;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use tracing::{debug, info, trace, warn};

pub struct CommandReceiver {
    socket: UdpSocket,
    state: PipelineState,
    recv_buf: Vec<u8>,
}

/// Bind the pose socket with a bounded receive wait so the loop can observe
/// cancellation.
pub fn bind_socket(config: &NetworkConfig) -> Result<UdpSocket, TransportError> {
    let socket = UdpSocket::bind(config.socket_addr())?;
    socket.set_read_timeout(Some(config.receive_timeout()))?;
    Ok(socket)
}

impl CommandReceiver {
    pub fn new(socket: UdpSocket, state: PipelineState, max_datagram_bytes: usize) -> Self {
        Self {
            socket,
            state,
            recv_buf: vec![0u8; max_datagram_bytes],
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive until cancelled or the socket fails. The socket is closed when
    /// this returns.
    pub fn run(mut self) -> Result<(), PipelineError> {
        match self.socket.local_addr() {
            Ok(addr) => info!("Receiving pose datagrams on {}", addr),
            Err(e) => warn!("Receiving pose datagrams on unknown address: {}", e),
        }

        while !self.state.cancel.is_cancelled() {
            match self.socket.recv_from(&mut self.recv_buf) {
                Ok((len, from)) => self.handle_datagram(len, from),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    // Receive wait elapsed; re-check cancellation
                    continue;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    if self.state.cancel.is_cancelled() {
                        break;
                    }
                    warn!("Pose socket failed: {}", e);
                    self.state.cancel.cancel();
                    return Err(TransportError(e).into());
                }
            }
        }

        info!("Command receiver stopped");
        Ok(())
    }

    fn handle_datagram(&mut self, len: usize, from: SocketAddr) {
        PipelineStats::incr(&self.state.stats.datagrams_received);
        trace!("{} bytes from {}", len, from);

        match pose_codec::decode(&self.recv_buf[..len]) {
            Ok(snapshot) => {
                if self.state.queue.push(snapshot).is_some() {
                    PipelineStats::incr(&self.state.stats.snapshots_dropped);
                    debug!("Dispatch queue full, dropped oldest snapshot");
                }
            }
            Err(e) => {
                PipelineStats::incr(&self.state.stats.decode_failures);
                warn!("Dropping datagram from {}: {}", from, e);
            }
        }
    }
}
