use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::UdpSocket;

use tracing::debug;

/// Builds the client identity sent with every probe: `host:port_<random id>`.
///
/// The random suffix keeps two processes on the same host and port apart
/// across restarts.
pub fn generate_identity(
    host: &str,
    port: u16,
) -> String {
    format!("{host}:{port}_{}", nanoid::nanoid!(16, &nanoid::alphabet::SAFE))
}

/// Best-effort discovery of the address other hosts reach us on.
///
/// Connecting a UDP socket sends no packet; it only asks the OS which local
/// address would route to the target. Falls back to loopback.
pub fn detect_local_ip() -> IpAddr {
    let detected = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
            socket.local_addr()
        })
        .map(|addr| addr.ip());

    match detected {
        Ok(ip) if !ip.is_unspecified() => ip,
        Ok(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        Err(e) => {
            debug!("local address detection failed, using loopback: {}", e);
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

/// Random nonce attached to each long-poll request.
pub fn request_nonce() -> String {
    nanoid::nanoid!(32, &nanoid::alphabet::SAFE)
}
