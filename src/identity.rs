//! Local owner identity, resolved once and cached for the process lifetime.

use std::env;
use std::net::UdpSocket;
use std::sync::OnceLock;

const FALLBACK_IDENTITY: &str = "unknown-host";

static NODE_IDENTITY: OnceLock<String> = OnceLock::new();

/// The identity recorded as the owner of every lease this process acquires.
///
/// Resolution order: `HOSTNAME` env var, `COMPUTERNAME` env var, the local
/// network address, else a fixed fallback. Computed on first use, frozen
/// thereafter.
pub fn node_identity() -> &'static str {
    NODE_IDENTITY.get_or_init(resolve)
}

fn resolve() -> String {
    env_identity("HOSTNAME")
        .or_else(|| env_identity("COMPUTERNAME"))
        .or_else(local_address)
        .unwrap_or_else(|| FALLBACK_IDENTITY.to_string())
}

fn env_identity(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// The local address the OS would route external traffic through. `connect`
/// on a UDP socket performs a route lookup only; no packet is sent.
fn local_address() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:53").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip().to_string())
}
