//! lanshared — LanShare node daemon.
//!
//! Announces itself on the LAN, tracks peers that do the same, and serves
//! the peer protocol plus the local API over one HTTP port.

use std::net::{IpAddr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use lanshare_api::{ApiState, RelayClient};
use lanshare_core::config::{IdentityConfig, LanshareConfig};
use lanshare_services::identity::{detect_local_ip, validate_username};
use lanshare_services::{FileRegistry, Identity, IdentityHandle, PeerRegistry};

mod discovery;

use discovery::{Broadcaster, Listener, Reaper};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load config
    if let Err(e) = LanshareConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = LanshareConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        let mut config = LanshareConfig::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    });

    // A username given on the command line wins over config.
    let requested = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.identity.username.clone());
    let username = validate_username(&requested).unwrap_or_else(|e| {
        let fallback = IdentityConfig::default().username;
        tracing::warn!(requested = %requested, error = %e, fallback = %fallback, "invalid username");
        validate_username(&fallback).unwrap_or_else(|_| "P2PUser".to_string())
    });

    let local_ip = detect_local_ip();
    tracing::info!(username = %username, local_ip = %local_ip, "lanshared starting");

    // ── HTTP listener ────────────────────────────────────────────────────────
    let listener = lanshare_api::bind_first_free(
        IpAddr::V4(config.server.bind_addr),
        config.server.port,
        config.server.port_search_range,
    )
    .await
    .context("failed to bind HTTP server")?;
    let server_port = listener.local_addr()?.port();
    if server_port != config.server.port {
        tracing::warn!(
            preferred = config.server.port,
            actual = server_port,
            "preferred port in use"
        );
    }

    // ── Shared state ─────────────────────────────────────────────────────────
    let identity = IdentityHandle::new(Identity {
        username,
        advertised_port: server_port,
        local_ip: Some(local_ip),
    });
    let peers = PeerRegistry::new();
    let files = FileRegistry::new();
    let relay = RelayClient::new(&config.relay).context("failed to build relay client")?;

    let state = ApiState {
        identity: identity.clone(),
        peers: peers.clone(),
        files,
        relay,
        uploads_dir: config.storage.uploads_dir.clone(),
    };

    // ── Discovery socket ─────────────────────────────────────────────────────
    let send_iface = match local_ip {
        IpAddr::V4(v4) => v4,
        IpAddr::V6(_) => std::net::Ipv4Addr::UNSPECIFIED,
    };
    let discovery_socket = Arc::new(
        discovery::make_discovery_socket(
            config.discovery.multicast_addr,
            config.discovery.multicast_port,
            send_iface,
        )
        .context("failed to create discovery socket")?,
    );
    let group = SocketAddr::V4(SocketAddrV4::new(
        config.discovery.multicast_addr,
        config.discovery.multicast_port,
    ));
    tracing::info!(%group, "discovery socket ready");

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let broadcast_task = tokio::spawn(
        Broadcaster::new(
            discovery_socket.clone(),
            group,
            identity.clone(),
            config.discovery.broadcast_interval(),
            config.discovery.buffer_size,
            shutdown_tx.subscribe(),
        )
        .run(),
    );

    let listener_task = tokio::spawn(
        Listener::new(
            discovery_socket,
            identity.clone(),
            peers.clone(),
            config.discovery.buffer_size,
            shutdown_tx.subscribe(),
        )
        .run(),
    );

    let reaper_task = tokio::spawn(
        Reaper::new(
            peers.clone(),
            config.discovery.peer_timeout(),
            config.discovery.reap_interval(),
            shutdown_tx.subscribe(),
        )
        .run(),
    );

    let mut server_task = tokio::spawn(lanshare_api::serve(listener, state, shutdown_tx.subscribe()));

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv()    => tracing::info!("shutting down"),
        r = broadcast_task        => tracing::error!("broadcast task exited: {:?}", r),
        r = listener_task         => tracing::error!("listener task exited: {:?}", r),
        r = reaper_task           => tracing::error!("reaper task exited: {:?}", r),
        r = &mut server_task      => {
            tracing::error!("HTTP server exited: {:?}", r);
            let _ = shutdown_tx.send(());
            return Ok(());
        }
    }

    // Give in-flight requests a moment to finish.
    let _ = shutdown_tx.send(());
    match tokio::time::timeout(SHUTDOWN_GRACE, server_task).await {
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "HTTP server failed"),
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server task panicked"),
        Ok(Ok(Ok(()))) => {}
        Err(_) => tracing::warn!("HTTP server still busy, exiting anyway"),
    }

    tracing::info!("lanshared stopped");
    Ok(())
}
