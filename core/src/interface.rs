//! Local network configuration lookup.
//!
//! Answers two questions for the scan engine: "which local IPv4 address
//! should I scan from?" and "what mask is that address bound with?". The
//! engine only ever talks to the [`LocalNetwork`] trait so tests can swap
//! the whole OS layer out.

use std::net::Ipv4Addr;

use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::IpNetwork;
use tracing::debug;

/// The environment the scanner runs in: local address discovery and
/// address-to-mask lookup.
pub trait LocalNetwork {
    /// A usable local IPv4 address, if one can be discovered.
    fn local_address(&self) -> Option<Ipv4Addr>;

    /// The subnet mask of the adapter bound to exactly `addr`, if any.
    fn subnet_mask(&self, addr: Ipv4Addr) -> Option<Ipv4Addr>;
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ViabilityError {
    /// The interface is operationally down.
    IsDown,
    /// The interface is a loopback device.
    IsLoopback,
    /// The interface does not have a MAC address.
    NoMacAddress,
    /// The interface does not support broadcast (required for ARP).
    NotBroadcast,
    /// The interface is a point-to-point link (e.g., a VPN).
    IsPointToPoint,
    /// The interface has no private IPv4 address.
    NoLanIpv4,
}

/// The OS-backed [`LocalNetwork`], built on pnet's interface listing.
pub struct SystemNetwork;

impl SystemNetwork {
    /// The interface whose address list contains exactly `addr`.
    ///
    /// This is what the ARP resolver binds to: replies for a segment only
    /// arrive on the adapter that owns the scanning address.
    pub fn interface_for(addr: Ipv4Addr) -> Option<NetworkInterface> {
        interface_owning(&datalink::interfaces(), addr)
    }
}

impl LocalNetwork for SystemNetwork {
    fn local_address(&self) -> Option<Ipv4Addr> {
        let interfaces = datalink::interfaces();
        debug!("inspecting {} network interface(s)", interfaces.len());
        first_lan_address(&interfaces)
    }

    fn subnet_mask(&self, addr: Ipv4Addr) -> Option<Ipv4Addr> {
        mask_for(&datalink::interfaces(), addr)
    }
}

fn is_viable_lan_interface(interface: &NetworkInterface) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if interface.is_loopback() {
        return Err(ViabilityError::IsLoopback);
    }
    if interface.mac.is_none() {
        return Err(ViabilityError::NoMacAddress);
    }
    if !interface.is_broadcast() {
        return Err(ViabilityError::NotBroadcast);
    }
    if interface.is_point_to_point() {
        return Err(ViabilityError::IsPointToPoint);
    }
    let has_lan_v4 = interface.ips.iter().any(|net| match net {
        IpNetwork::V4(v4) => v4.ip().is_private(),
        IpNetwork::V6(_) => false,
    });
    if !has_lan_v4 {
        return Err(ViabilityError::NoLanIpv4);
    }

    Ok(())
}

fn first_lan_address(interfaces: &[NetworkInterface]) -> Option<Ipv4Addr> {
    interfaces
        .iter()
        .filter(|interface| is_viable_lan_interface(interface).is_ok())
        .find_map(|interface| {
            interface.ips.iter().find_map(|net| match net {
                IpNetwork::V4(v4) if v4.ip().is_private() => Some(v4.ip()),
                _ => None,
            })
        })
}

fn mask_for(interfaces: &[NetworkInterface], addr: Ipv4Addr) -> Option<Ipv4Addr> {
    interfaces.iter().find_map(|interface| {
        interface.ips.iter().find_map(|net| match net {
            IpNetwork::V4(v4) if v4.ip() == addr => Some(v4.mask()),
            _ => None,
        })
    })
}

fn interface_owning(interfaces: &[NetworkInterface], addr: Ipv4Addr) -> Option<NetworkInterface> {
    interfaces
        .iter()
        .find(|interface| {
            interface.ips.iter().any(|net| match net {
                IpNetwork::V4(v4) => v4.ip() == addr,
                IpNetwork::V6(_) => false,
            })
        })
        .cloned()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
