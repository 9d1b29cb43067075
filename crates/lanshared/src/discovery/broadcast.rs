//! Periodic discovery announcements.
//!
//! Every tick the current identity is read fresh, so a username change via
//! the API shows up in the next announcement.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::time;

use lanshare_core::wire::DiscoveryMessage;
use lanshare_services::{Identity, IdentityHandle};

pub struct Broadcaster {
    socket: Arc<UdpSocket>,
    dest: SocketAddr,
    identity: IdentityHandle,
    interval: Duration,
    /// Announcements larger than this would be truncated by receivers.
    max_datagram: usize,
    shutdown: broadcast::Receiver<()>,
}

impl Broadcaster {
    pub fn new(
        socket: Arc<UdpSocket>,
        dest: SocketAddr,
        identity: IdentityHandle,
        interval: Duration,
        max_datagram: usize,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            socket,
            dest,
            identity,
            interval,
            max_datagram,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        tracing::info!(
            dest = %self.dest,
            interval_secs = self.interval.as_secs_f64(),
            "discovery broadcast starting"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("discovery broadcast stopping");
                    return;
                }
                _ = ticker.tick() => self.announce_once().await,
            }
        }
    }

    async fn announce_once(&self) {
        let me = self.identity.get();
        let Some(bytes) = announcement(&me, self.max_datagram) else {
            return;
        };
        match self.socket.send_to(&bytes, self.dest).await {
            Ok(n) => tracing::trace!(bytes = n, username = %me.username, "announcement sent"),
            Err(e) => tracing::warn!(error = %e, dest = %self.dest, "announcement send failed"),
        }
    }
}

/// Encode the announcement for `me`, or `None` if it cannot be sent.
pub fn announcement(me: &Identity, max_datagram: usize) -> Option<Vec<u8>> {
    let msg = DiscoveryMessage {
        username: me.username.clone(),
        port: me.advertised_port,
        ip: me.local_ip,
    };
    let bytes = match msg.encode() {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode announcement");
            return None;
        }
    };
    if bytes.len() > max_datagram {
        tracing::warn!(
            len = bytes.len(),
            max = max_datagram,
            "announcement too large, not sent"
        );
        return None;
    }
    Some(bytes)
}
