//! Hardware-address resolution.
//!
//! The scan engine only sees [`HardwareResolver`]: one IPv4 address in, one
//! MAC (or "no answer") out. The production implementation speaks raw
//! ARP over a pnet datalink channel; tests substitute fakes.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use anyhow::Context;
use pnet::datalink::{self, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};
use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket, MutableEthernetPacket};
use pnet::packet::{MutablePacket, Packet};
use pnet::util::MacAddr;
use tracing::{debug, trace};

const ETHERNET_HEADER_LEN: usize = 14;
const ARP_PACKET_LEN: usize = 28;
const FRAME_LEN: usize = ETHERNET_HEADER_LEN + ARP_PACKET_LEN;

/// Attempts per host before declaring it unresolvable.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// How long one attempt waits for a matching reply.
const REPLY_TIMEOUT: Duration = Duration::from_millis(500);
/// Granularity of the blocking channel read, so reply waits can observe
/// their deadline.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Resolves one IPv4 address to its hardware address.
///
/// `None` means "no answer" and is the expected result for most of an
/// unoccupied range; it must never be treated as a failure.
pub trait HardwareResolver: Send + Sync {
    fn resolve(&self, ip: Ipv4Addr) -> Option<MacAddr>;
}

/// ARP-based [`HardwareResolver`] bound to one interface.
///
/// Each call opens its own channel, so concurrent resolutions never share
/// socket state. Needs a raw socket, hence root or CAP_NET_RAW.
pub struct ArpResolver {
    interface: NetworkInterface,
    src_mac: MacAddr,
    src_ip: Ipv4Addr,
    max_attempts: u32,
}

impl ArpResolver {
    pub fn new(interface: NetworkInterface, src_ip: Ipv4Addr) -> anyhow::Result<Self> {
        let src_mac = interface
            .mac
            .with_context(|| format!("interface {} has no MAC address", interface.name))?;
        Ok(Self {
            interface,
            src_mac,
            src_ip,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    fn open_channel(&self) -> anyhow::Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>)> {
        let config = Config {
            read_timeout: Some(READ_TIMEOUT),
            ..Default::default()
        };
        match datalink::channel(&self.interface, config) {
            Ok(datalink::Channel::Ethernet(tx, rx)) => Ok((tx, rx)),
            Ok(_) => anyhow::bail!("unsupported channel type on {}", self.interface.name),
            Err(e) => Err(e).with_context(|| format!("opening channel on {}", self.interface.name)),
        }
    }

    /// One request/reply round trip, bounded by [`REPLY_TIMEOUT`].
    fn probe_once(
        &self,
        tx: &mut dyn DataLinkSender,
        rx: &mut dyn DataLinkReceiver,
        target: Ipv4Addr,
    ) -> anyhow::Result<Option<MacAddr>> {
        let mut buffer = [0u8; FRAME_LEN];
        build_request(&mut buffer, self.src_mac, self.src_ip, target);
        tx.send_to(&buffer, None)
            .context("send returned no result")??;

        let deadline = Instant::now() + REPLY_TIMEOUT;
        while Instant::now() < deadline {
            match rx.next() {
                Ok(frame) => {
                    if let Some(mac) = parse_reply(frame, target) {
                        return Ok(Some(mac));
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e).context("reading from channel"),
            }
        }
        Ok(None)
    }
}

impl HardwareResolver for ArpResolver {
    fn resolve(&self, ip: Ipv4Addr) -> Option<MacAddr> {
        // The scanning address itself never answers its own broadcast.
        if ip == self.src_ip {
            return Some(self.src_mac);
        }

        let (mut tx, mut rx) = match self.open_channel() {
            Ok(channel) => channel,
            Err(e) => {
                debug!("ARP channel unavailable for {ip}: {e:#}");
                return None;
            }
        };

        for attempt in 1..=self.max_attempts {
            match self.probe_once(tx.as_mut(), rx.as_mut(), ip) {
                Ok(Some(mac)) => return Some(mac),
                Ok(None) => trace!("no ARP reply from {ip} (attempt {attempt})"),
                Err(e) => {
                    debug!("ARP probe for {ip} failed: {e:#}");
                    return None;
                }
            }
        }
        None
    }
}

/// Build an ARP request into `buffer`: "who has `target_ip`? tell
/// `src_ip` at `src_mac`."
fn build_request(buffer: &mut [u8], src_mac: MacAddr, src_ip: Ipv4Addr, target_ip: Ipv4Addr) {
    let mut eth = MutableEthernetPacket::new(buffer).expect("buffer too small for Ethernet header");
    eth.set_source(src_mac);
    eth.set_destination(MacAddr::broadcast());
    eth.set_ethertype(EtherTypes::Arp);

    let mut arp = MutableArpPacket::new(eth.payload_mut()).expect("buffer too small for ARP packet");
    arp.set_hardware_type(ArpHardwareTypes::Ethernet);
    arp.set_protocol_type(EtherTypes::Ipv4);
    arp.set_hw_addr_len(6);
    arp.set_proto_addr_len(4);
    arp.set_operation(ArpOperations::Request);
    arp.set_sender_hw_addr(src_mac);
    arp.set_sender_proto_addr(src_ip);
    arp.set_target_hw_addr(MacAddr::zero());
    arp.set_target_proto_addr(target_ip);
}

/// Parse a frame as an ARP reply from `want`, returning the sender MAC.
///
/// Anything else on the wire (requests, replies from other hosts, non-ARP
/// traffic, truncated frames) is `None`.
fn parse_reply(frame: &[u8], want: Ipv4Addr) -> Option<MacAddr> {
    let eth = EthernetPacket::new(frame)?;
    if eth.get_ethertype() != EtherTypes::Arp {
        return None;
    }
    let arp = ArpPacket::new(eth.payload())?;
    if arp.get_operation() != ArpOperations::Reply {
        return None;
    }
    if arp.get_sender_proto_addr() != want {
        return None;
    }
    Some(arp.get_sender_hw_addr())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
