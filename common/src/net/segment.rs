//! IPv4 address arithmetic for subnet enumeration.
//!
//! All math happens in **host order** (the plain numeric value of the
//! address, most significant octet first) so that comparisons and range
//! iteration behave naturally. Addresses are materialized back into
//! network order ([`Ipv4Addr`]) only at the edges.

use std::net::Ipv4Addr;

use crate::error::ScanError;

/// Numeric (host-order) value of an address, usable for arithmetic.
pub fn to_host_order(addr: Ipv4Addr) -> u32 {
    u32::from_be_bytes(addr.octets())
}

/// Inverse of [`to_host_order`].
pub fn to_network_order(value: u32) -> Ipv4Addr {
    Ipv4Addr::from(value.to_be_bytes())
}

/// Parses a dotted-quad IPv4 address.
///
/// This is the IPv4-only boundary of the tool: IPv6 text and anything
/// else that is not a dotted quad fails with
/// [`ScanError::InvalidAddressFormat`].
pub fn parse_ipv4(s: &str) -> Result<Ipv4Addr, ScanError> {
    s.trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| ScanError::InvalidAddressFormat(s.to_string()))
}

/// True when `mask` is a run of ones followed by a run of zeros.
///
/// Nothing in the arithmetic requires this; a non-contiguous mask still
/// produces a computable (if surprising) range. Callers use this to warn,
/// not to reject.
pub fn is_contiguous_mask(mask: Ipv4Addr) -> bool {
    let m = to_host_order(mask);
    m.leading_ones() + m.trailing_zeros() == 32
}

/// True when both addresses share the same network address under `mask`.
pub fn same_subnet(a: Ipv4Addr, b: Ipv4Addr, mask: Ipv4Addr) -> bool {
    let m = to_host_order(mask);
    to_host_order(a) & m == to_host_order(b) & m
}

/// The subnet derived from an (address, mask) pair.
///
/// Immutable once built. `network = ip & mask`,
/// `broadcast = network | !mask`, both kept in host order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    network: u32,
    broadcast: u32,
    mask: u32,
}

impl Segment {
    pub fn new(ip: Ipv4Addr, mask: Ipv4Addr) -> Self {
        let mask = to_host_order(mask);
        let network = to_host_order(ip) & mask;
        let broadcast = network | !mask;
        Self {
            network,
            broadcast,
            mask,
        }
    }

    pub fn network_address(&self) -> Ipv4Addr {
        to_network_order(self.network)
    }

    pub fn broadcast_address(&self) -> Ipv4Addr {
        to_network_order(self.broadcast)
    }

    pub fn mask(&self) -> Ipv4Addr {
        to_network_order(self.mask)
    }

    /// Count of assignable addresses between network and broadcast,
    /// exclusive of both: `!mask - 1` in wrapping arithmetic.
    ///
    /// For a /24 this is 254. A /32 mask wraps to `u32::MAX`; the range
    /// iterator is still empty in that case, so the wrap is visible only
    /// here. Kept unguarded to match the source arithmetic.
    pub fn usable_host_count(&self) -> u32 {
        (!self.mask).wrapping_sub(1)
    }

    /// True when `addr` falls inside this segment's subnet.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        to_host_order(addr) & self.mask == self.network
    }

    /// Every address strictly between network and broadcast, ascending.
    ///
    /// Restartable: each call builds a fresh range from the same immutable
    /// bounds, so concurrent or repeated iteration always yields the same
    /// sequence.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        let first = self.network.saturating_add(1);
        let last = self.broadcast;
        (first..last).map(to_network_order)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
