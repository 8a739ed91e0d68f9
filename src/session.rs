//! Portable session strings
//!
//! A session handle (data-center id, server address, auth key) is packed as
//!
//! ```text
//! "1" + base64url( dc_id:u8 | ip:4 or 16 bytes | port:u16 BE | auth_key:256 bytes )
//! ```
//!
//! The address width is implied by the payload length. The 8-byte key
//! fingerprint is derived from the auth key and never stored.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use sha1::{Digest, Sha1};

use crate::error::CodecError;

/// Length of an auth key in bytes
pub const AUTH_KEY_LEN: usize = 256;

/// Format version prefix
pub const VERSION: char = '1';

const V4_PAYLOAD_LEN: usize = 1 + 4 + 2 + AUTH_KEY_LEN;
const V6_PAYLOAD_LEN: usize = 1 + 16 + 2 + AUTH_KEY_LEN;

/// URL-safe alphabet; emits padding, accepts it present or absent
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Connection material for an authenticated protocol session
#[derive(Clone, PartialEq, Eq)]
pub struct SessionHandle {
    /// Data-center id
    pub dc_id: u8,

    /// Server address as `host:port`; IPv6 hosts are bracketed
    pub address: String,

    /// Secret auth key
    pub auth_key: Vec<u8>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("dc_id", &self.dc_id)
            .field("address", &self.address)
            .field("auth_key", &format_args!("[{} bytes]", self.auth_key.len()))
            .finish()
    }
}

impl SessionHandle {
    pub fn new(dc_id: u8, address: impl Into<String>, auth_key: Vec<u8>) -> Self {
        Self {
            dc_id,
            address: address.into(),
            auth_key,
        }
    }

    /// Key fingerprint: the low 8 bytes of SHA-1 over the auth key
    pub fn auth_key_id(&self) -> [u8; 8] {
        let digest = Sha1::digest(&self.auth_key);
        let mut id = [0u8; 8];
        id.copy_from_slice(&digest[12..20]);
        id
    }

    /// Parsed server address
    pub fn socket_addr(&self) -> Result<SocketAddr, CodecError> {
        parse_address(&self.address)
    }
}

/// Split `host:port` (IPv6 hosts in brackets) and parse both halves
fn parse_address(address: &str) -> Result<SocketAddr, CodecError> {
    if address.is_empty() {
        return Err(CodecError::EmptyAddress);
    }

    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| CodecError::InvalidAddress(format!("missing ']' in {}", address)))?;
        let port = tail
            .strip_prefix(':')
            .ok_or_else(|| CodecError::InvalidAddress(format!("missing port in {}", address)))?;
        (host, port)
    } else {
        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| CodecError::InvalidAddress(format!("missing port in {}", address)))?;
        if host.contains(':') {
            return Err(CodecError::InvalidAddress(format!(
                "too many colons in {}",
                address
            )));
        }
        (host, port)
    };

    let port: u16 = port
        .parse()
        .map_err(|_| CodecError::InvalidPort(port.to_string()))?;
    let ip: IpAddr = host
        .parse()
        .map_err(|_| CodecError::InvalidIp(host.to_string()))?;

    Ok(SocketAddr::new(ip, port))
}

/// Encode a session handle as a portable string
pub fn encode(session: &SessionHandle) -> Result<String, CodecError> {
    let addr = parse_address(&session.address)?;

    if session.auth_key.len() != AUTH_KEY_LEN {
        return Err(CodecError::InvalidKeyLength {
            expected: AUTH_KEY_LEN,
            actual: session.auth_key.len(),
        });
    }

    let mut buf = Vec::with_capacity(V6_PAYLOAD_LEN);
    buf.push(session.dc_id);
    match addr.ip() {
        IpAddr::V4(ip) => buf.extend_from_slice(&ip.octets()),
        IpAddr::V6(ip) => match ip.to_ipv4_mapped() {
            Some(v4) => buf.extend_from_slice(&v4.octets()),
            None => buf.extend_from_slice(&ip.octets()),
        },
    }
    buf.extend_from_slice(&addr.port().to_be_bytes());
    buf.extend_from_slice(&session.auth_key);

    let mut out = String::with_capacity(1 + buf.len().div_ceil(3) * 4);
    out.push(VERSION);
    URL_SAFE_LENIENT.encode_string(&buf, &mut out);
    Ok(out)
}

/// Decode a portable string back into a session handle
pub fn decode(input: &str) -> Result<SessionHandle, CodecError> {
    let mut chars = input.chars();
    let version = chars.next().ok_or(CodecError::EmptyInput)?;
    if version != VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let payload = URL_SAFE_LENIENT
        .decode(chars.as_str())
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))?;

    let ip_len = match payload.len() {
        V4_PAYLOAD_LEN => 4,
        V6_PAYLOAD_LEN => 16,
        n if n < V4_PAYLOAD_LEN => return Err(CodecError::Truncated(n)),
        n => return Err(CodecError::UnexpectedLength(n)),
    };

    let dc_id = payload[0];
    let ip_bytes = &payload[1..1 + ip_len];
    let port_at = 1 + ip_len;
    let port = u16::from_be_bytes([payload[port_at], payload[port_at + 1]]);
    let auth_key = payload[port_at + 2..].to_vec();

    let ip = if ip_len == 4 {
        IpAddr::V4(Ipv4Addr::new(ip_bytes[0], ip_bytes[1], ip_bytes[2], ip_bytes[3]))
    } else {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(ip_bytes);
        IpAddr::V6(Ipv6Addr::from(octets))
    };

    Ok(SessionHandle {
        dc_id,
        address: SocketAddr::new(ip, port).to_string(),
        auth_key,
    })
}
