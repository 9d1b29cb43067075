//! LAN discovery: multicast announcements in, peer registry out.
//!
//! One UDP socket is bound to the discovery port and joined to the
//! multicast group on all interfaces. The broadcaster sends from it and the
//! listener receives on it; a reaper evicts peers that stop announcing.

use std::net::{Ipv4Addr, SocketAddrV4};

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

pub mod broadcast;
pub mod listener;

pub use broadcast::Broadcaster;
pub use listener::{Listener, Reaper};

/// Create the shared discovery socket.
///
/// `send_iface` selects the outgoing interface for multicast; loopback or
/// unspecified leaves the choice to the OS. It is fixed for the life of the
/// socket; a later rename refreshes only the announced `ip`.
pub fn make_discovery_socket(group: Ipv4Addr, port: u16, send_iface: Ipv4Addr) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).context("socket()")?;

    // Several nodes on one host share the discovery port.
    socket.set_reuse_address(true).context("SO_REUSEADDR")?;
    socket.set_nonblocking(true).context("set_nonblocking")?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
    socket.bind(&bind_addr.into()).context("bind()")?;

    socket
        .join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)
        .context("IP_ADD_MEMBERSHIP")?;
    socket.set_multicast_loop_v4(true).context("IP_MULTICAST_LOOP")?;

    if !send_iface.is_loopback() && !send_iface.is_unspecified() {
        match socket.set_multicast_if_v4(&send_iface) {
            Ok(()) => tracing::info!(iface = %send_iface, "multicast sending interface set"),
            Err(e) => tracing::warn!(
                iface = %send_iface,
                error = %e,
                "failed to set multicast interface, using system default"
            ),
        }
    }

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).context("failed to convert to tokio UdpSocket")
}
