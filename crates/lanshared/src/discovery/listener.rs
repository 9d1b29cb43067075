//! Discovery listener and peer reaper.
//!
//! The listener upserts every valid announcement from someone other than
//! ourselves into the peer registry. The reaper evicts peers that have gone
//! quiet for longer than the peer timeout.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use lanshare_core::wire::{DiscoveryMessage, WireError};
use lanshare_services::{IdentityHandle, PeerKey, PeerRegistry};

/// Upper bound on a single receive, so the loop wakes up regularly.
const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// What happened to one received datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Valid JSON, but not a discovery announcement.
    Ignored,
    /// Malformed or incomplete; dropped.
    Rejected,
    /// Our own announcement looped back.
    OwnAnnouncement,
    NewPeer(PeerKey),
    Refreshed(PeerKey),
}

pub struct Listener {
    socket: Arc<UdpSocket>,
    identity: IdentityHandle,
    peers: PeerRegistry,
    buffer_size: usize,
    shutdown: broadcast::Receiver<()>,
}

impl Listener {
    pub fn new(
        socket: Arc<UdpSocket>,
        identity: IdentityHandle,
        peers: PeerRegistry,
        buffer_size: usize,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            socket,
            identity,
            peers,
            buffer_size,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let mut buf = vec![0u8; self.buffer_size];

        tracing::info!(local = ?self.socket.local_addr().ok(), "discovery listener starting");

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("discovery listener stopping");
                    return;
                }
                r = tokio::time::timeout(RECV_TIMEOUT, self.socket.recv_from(&mut buf)) => match r {
                    Err(_elapsed) => continue,
                    Ok(Ok((len, src))) => {
                        handle_datagram(&self.identity, &self.peers, &buf[..len], src, Instant::now());
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "recv_from failed");
                        // Avoid spinning on a persistent socket error.
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                },
            }
        }
    }
}

/// Validate one datagram and apply it to the registry.
pub fn handle_datagram(
    identity: &IdentityHandle,
    peers: &PeerRegistry,
    buf: &[u8],
    src: SocketAddr,
    now: Instant,
) -> Outcome {
    let msg = match DiscoveryMessage::decode(buf) {
        Ok(Some(msg)) => msg,
        Ok(None) => {
            tracing::trace!(%src, "ignoring non-discovery datagram");
            return Outcome::Ignored;
        }
        Err(WireError::Malformed(e)) => {
            tracing::warn!(%src, error = %e, "undecodable discovery datagram");
            return Outcome::Rejected;
        }
        Err(e) => {
            tracing::debug!(%src, error = %e, "dropping discovery datagram");
            return Outcome::Rejected;
        }
    };

    // A self-reported address wins over the UDP source.
    let addr = msg.ip.unwrap_or_else(|| src.ip());

    if identity.get().is_self(addr, msg.port, &msg.username) {
        tracing::trace!(%addr, port = msg.port, "ignoring own announcement");
        return Outcome::OwnAnnouncement;
    }

    let key = PeerKey::new(addr, msg.port);
    if peers.upsert(key, &msg.username, now) {
        tracing::info!(username = %msg.username, %addr, port = msg.port, "discovered new peer");
        Outcome::NewPeer(key)
    } else {
        tracing::trace!(username = %msg.username, %addr, port = msg.port, "peer refreshed");
        Outcome::Refreshed(key)
    }
}

// ── Reaper ────────────────────────────────────────────────────────────────────

pub struct Reaper {
    peers: PeerRegistry,
    timeout: Duration,
    interval: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl Reaper {
    pub fn new(
        peers: PeerRegistry,
        timeout: Duration,
        interval: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            peers,
            timeout,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => return,
                _ = ticker.tick() => {
                    for peer in self.peers.evict_expired(Instant::now(), self.timeout) {
                        tracing::info!(
                            username = %peer.username,
                            addr = %peer.addr,
                            port = peer.port,
                            "peer timed out"
                        );
                    }
                }
            }
        }
    }
}
