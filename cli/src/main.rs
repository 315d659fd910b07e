mod args;
mod terminal;

use std::net::Ipv4Addr;

use tracing::{debug, warn};

use piscan_common::error::ScanError;
use piscan_core::interface::{LocalNetwork, SystemNetwork};
use piscan_core::resolver::ArpResolver;
use piscan_core::scanner::{self, CancelToken, ScanOptions};
use terminal::print;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = args::CommandLine::parse_args();

    terminal::logging::init();
    print::banner();

    if !is_root::is_root() {
        warn!("not running as root; raw ARP probes will likely get no answers");
    }

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    if cli.addresses.is_empty() {
        run_scan(None, cli.only_pi, cancel.clone()).await?;
    } else {
        for address in cli.addresses {
            if cancel.is_cancelled() {
                break;
            }
            run_scan(Some(address), cli.only_pi, cancel.clone()).await?;
        }
    }

    Ok(())
}

async fn run_scan(
    target: Option<Ipv4Addr>,
    only_pi: bool,
    cancel: CancelToken,
) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || scan_blocking(target, only_pi, &cancel)).await?
}

/// One full scan pass over the segment of `target` (or of the
/// discovered local address). Blocks for the duration of the fan-out.
fn scan_blocking(
    target: Option<Ipv4Addr>,
    only_pi: bool,
    cancel: &CancelToken,
) -> anyhow::Result<()> {
    let network = SystemNetwork;

    let local_ip = target
        .or_else(|| network.local_address())
        .ok_or(ScanError::NoLocalAddress)?;
    let interface =
        SystemNetwork::interface_for(local_ip).ok_or(ScanError::NoSubnetMask(local_ip))?;
    debug!("scanning via interface {} from {local_ip}", interface.name);

    let resolver = ArpResolver::new(interface, local_ip)?;

    scanner::scan(
        Some(local_ip),
        &network,
        &resolver,
        &ScanOptions::default(),
        cancel,
        move |ip, mac| print::report_host(ip, mac, only_pi),
    )
}
