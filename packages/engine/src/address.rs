// packages/engine/src/address.rs
//! Socket addresses as seen by the mapping engine
//!
//! [`SocketAddress`] is the engine-side view of the `sockaddr` an
//! intercepted call carries. Conversions to and from the raw libc
//! structures live here, including network/host byte order handling for
//! ports, so the mappers only ever see host-order values.
//!
//! Unix paths are held in [`SunPath`], a fixed-capacity buffer the size of
//! `sockaddr_un::sun_path`. Writing into it never overflows: oversized
//! input is truncated and the buffer always stays NUL-terminated.

use crate::utils::errors::{EngineError, Result};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;

/// Capacity of `sockaddr_un::sun_path`, terminating NUL included
pub const SUN_PATH_CAPACITY: usize = {
    // SAFETY: sockaddr_un is plain old data; all-zero is a valid value
    let addr: libc::sockaddr_un = unsafe { std::mem::zeroed() };
    addr.sun_path.len()
};

/// Result of a bounded copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedCopy {
    /// Bytes written before the terminating NUL
    pub written: usize,
    
    /// Whether the source did not fit
    pub truncated: bool,
}

/// Copy `src` into `dst` as a NUL-terminated string
///
/// Copying stops at the first NUL in `src`. At most `dst.len() - 1` bytes
/// are written, and everything after them is zero-filled, so the last byte
/// of `dst` is always NUL.
pub fn copy_bounded(dst: &mut [u8], src: &[u8]) -> BoundedCopy {
    let src = match src.iter().position(|&b| b == 0) {
        Some(nul) => &src[..nul],
        None => src,
    };
    
    let Some(limit) = dst.len().checked_sub(1) else {
        return BoundedCopy {
            written: 0,
            truncated: !src.is_empty(),
        };
    };
    
    let written = src.len().min(limit);
    dst[..written].copy_from_slice(&src[..written]);
    dst[written..].fill(0);
    
    BoundedCopy {
        written,
        truncated: written < src.len(),
    }
}

/// Fixed-capacity AF_UNIX socket path
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SunPath {
    bytes: [u8; SUN_PATH_CAPACITY],
    len: usize,
}

impl SunPath {
    /// Create an empty path
    pub fn new() -> Self {
        Self {
            bytes: [0; SUN_PATH_CAPACITY],
            len: 0,
        }
    }
    
    /// Build a path, silently truncating oversized input
    pub fn from_bytes(src: &[u8]) -> Self {
        Self::copy_from(src).0
    }
    
    /// Build a path and report whether the input was truncated
    pub fn copy_from(src: &[u8]) -> (Self, BoundedCopy) {
        let mut path = Self::new();
        let outcome = copy_bounded(&mut path.bytes, src);
        path.len = outcome.written;
        (path, outcome)
    }
    
    /// Path bytes without the terminating NUL
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
    
    /// The whole buffer, NUL padding included
    pub fn as_buffer(&self) -> &[u8; SUN_PATH_CAPACITY] {
        &self.bytes
    }
    
    pub fn len(&self) -> usize {
        self.len
    }
    
    /// Empty paths include abstract-namespace addresses (leading NUL)
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }
}

impl Default for SunPath {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SunPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SunPath").field(&self.to_string_lossy()).finish()
    }
}

impl fmt::Display for SunPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

/// Socket operation that triggered a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketOp {
    Bind,
    Connect,
    Unlink,
}

impl SocketOp {
    /// Name of the intercepted call
    pub fn as_str(&self) -> &'static str {
        match self {
            SocketOp::Bind => "bind",
            SocketOp::Connect => "connect",
            SocketOp::Unlink => "unlink",
        }
    }
}

impl fmt::Display for SocketOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address handed to the engine by the interception boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketAddress {
    /// AF_UNIX path
    Unix(SunPath),
    
    /// AF_INET address, port in host byte order
    Inet(SocketAddrV4),
    
    /// Any other family, passed through untouched
    Other { family: i32 },
}

impl SocketAddress {
    /// Unix address from a path string (truncated to capacity)
    pub fn unix(path: &str) -> Self {
        SocketAddress::Unix(SunPath::from_bytes(path.as_bytes()))
    }
    
    pub fn inet(ip: Ipv4Addr, port: u16) -> Self {
        SocketAddress::Inet(SocketAddrV4::new(ip, port))
    }
    
    /// Address family constant (`AF_UNIX`, `AF_INET`, ...)
    pub fn family(&self) -> i32 {
        match self {
            SocketAddress::Unix(_) => libc::AF_UNIX,
            SocketAddress::Inet(_) => libc::AF_INET,
            SocketAddress::Other { family } => *family,
        }
    }
    
    /// Read an AF_UNIX address, stopping at the first NUL
    pub fn from_sockaddr_un(addr: &libc::sockaddr_un) -> Self {
        let mut raw = [0u8; SUN_PATH_CAPACITY];
        for (dst, src) in raw.iter_mut().zip(addr.sun_path.iter()) {
            *dst = *src as u8;
        }
        SocketAddress::Unix(SunPath::from_bytes(&raw))
    }
    
    /// Read an AF_INET address, converting from network byte order
    pub fn from_sockaddr_in(addr: &libc::sockaddr_in) -> Self {
        let ip = Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr));
        let port = u16::from_be(addr.sin_port);
        SocketAddress::inet(ip, port)
    }
    
    /// Overwrite `sun_path` with this address's path
    ///
    /// No-op for non-unix addresses.
    pub fn write_sockaddr_un(&self, addr: &mut libc::sockaddr_un) {
        if let SocketAddress::Unix(path) = self {
            for (dst, src) in addr.sun_path.iter_mut().zip(path.as_buffer().iter()) {
                *dst = *src as libc::c_char;
            }
        }
    }
    
    /// Overwrite address and port, converting to network byte order
    ///
    /// No-op for non-inet addresses.
    pub fn write_sockaddr_in(&self, addr: &mut libc::sockaddr_in) {
        if let SocketAddress::Inet(inet) = self {
            addr.sin_addr.s_addr = u32::from(*inet.ip()).to_be();
            addr.sin_port = inet.port().to_be();
        }
    }
    
    /// Build a fresh `sockaddr_un` for this address
    pub fn to_sockaddr_un(&self) -> Option<libc::sockaddr_un> {
        match self {
            SocketAddress::Unix(_) => {
                // SAFETY: sockaddr_un is plain old data; all-zero is a valid value
                let mut addr: libc::sockaddr_un = unsafe { std::mem::zeroed() };
                addr.sun_family = libc::AF_UNIX as libc::sa_family_t;
                self.write_sockaddr_un(&mut addr);
                Some(addr)
            }
            _ => None,
        }
    }
    
    /// Build a fresh `sockaddr_in` for this address
    pub fn to_sockaddr_in(&self) -> Option<libc::sockaddr_in> {
        match self {
            SocketAddress::Inet(_) => {
                // SAFETY: sockaddr_in is plain old data; all-zero is a valid value
                let mut addr: libc::sockaddr_in = unsafe { std::mem::zeroed() };
                addr.sin_family = libc::AF_INET as libc::sa_family_t;
                self.write_sockaddr_in(&mut addr);
                Some(addr)
            }
            _ => None,
        }
    }
}

impl fmt::Display for SocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketAddress::Unix(path) => write!(f, "unix:{}", path),
            SocketAddress::Inet(inet) => write!(f, "{}", inet),
            SocketAddress::Other { family } => write!(f, "family {}", family),
        }
    }
}

impl FromStr for SocketAddress {
    type Err = EngineError;
    
    /// Accepts `unix:<path>`, an absolute or relative path, or `a.b.c.d:port`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        
        if let Some(path) = s.strip_prefix("unix:") {
            return Ok(SocketAddress::unix(path));
        }
        
        if s.starts_with('/') || s.starts_with('.') {
            return Ok(SocketAddress::unix(s));
        }
        
        s.parse::<SocketAddrV4>()
            .map(SocketAddress::Inet)
            .map_err(|e| EngineError::InvalidAddress(format!("{}: {}", s, e)))
    }
}
