use std::io::Write;
use std::net::Ipv4Addr;

use colored::*;
use pnet::util::MacAddr;
use tracing::info;

use piscan_common::net::mac::is_raspberry_pi;

const SPOTTED_SUFFIX: &str = " <- Raspberry PI spotted !!!";

pub fn banner() {
    info!(
        "{} version {}",
        "piscan".bright_green().bold(),
        env!("CARGO_PKG_VERSION")
    );
    info!("Your Raspberry PI scanner");
}

/// Formats the per-host result line, or `None` when the filter
/// suppresses it.
///
/// The `IP=.. MAC=..` shape is a compatibility surface for scripts that
/// parse the output; keep it byte-stable and uncolored.
pub fn format_host_line(ip: Ipv4Addr, mac: MacAddr, only_pi: bool) -> Option<String> {
    let spotted = is_raspberry_pi(mac);
    if only_pi && !spotted {
        return None;
    }
    let suffix = if spotted { SPOTTED_SUFFIX } else { "" };
    Some(format!("IP={ip} MAC={mac}{suffix}"))
}

/// Prints one discovered host. Called concurrently from scan workers;
/// the stdout lock serializes the writes.
pub fn report_host(ip: Ipv4Addr, mac: MacAddr, only_pi: bool) {
    if let Some(line) = format_host_line(ip, mac, only_pi) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}");
    }
}
