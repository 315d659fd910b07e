use std::net::Ipv4Addr;

use thiserror::Error;

/// Failures that stop a scan before any network activity starts.
///
/// Per-host resolution misses are not represented here at all: a host that
/// does not answer is `None` at the resolver boundary and is skipped.
/// Cancellation is likewise a silent return, not an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScanError {
    /// The input was not a dotted-quad IPv4 address. This scanner is
    /// IPv4-only; IPv6 text lands here too.
    #[error("invalid IPv4 address: {0}")]
    InvalidAddressFormat(String),

    /// No usable local IPv4 address could be discovered on any adapter.
    #[error("can't find a local IPv4 address to scan from")]
    NoLocalAddress,

    /// The chosen address is not bound to any known adapter, so no subnet
    /// mask is available to derive the host range from.
    #[error("can't find subnet mask for IP {0}")]
    NoSubnetMask(Ipv4Addr),
}
