//! The subnet scan engine.
//!
//! Derives the candidate host range from the local (or caller-supplied)
//! address, then drives hardware-address resolution across it on a
//! bounded worker pool. Hosts that answer are handed to the caller's
//! callback from whichever worker resolved them; hosts that stay silent
//! are skipped. A raised [`CancelToken`] stops new dispatches and the
//! scan returns silently.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use pnet::util::MacAddr;
use rayon::iter::{ParallelBridge, ParallelIterator};
use tracing::{debug, warn};

use piscan_common::error::ScanError;
use piscan_common::net::segment::{self, Segment};

use crate::interface::LocalNetwork;
use crate::resolver::HardwareResolver;

/// Cooperative cancellation flag, checked before each host's resolution.
///
/// Cloneable so a signal handler can hold one end while the scan holds
/// the other; cancellation is a normal termination path, never an error.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Tuning knobs for one scan pass.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Simultaneous in-flight resolutions. Any positive bound is
    /// correct; the default matches the machine's processing units.
    pub workers: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

impl ScanOptions {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }
}

/// Runs one full scan pass.
///
/// `target` substitutes for the discovered local address when given; the
/// mask lookup and the full segment walk happen either way, so a single
/// target still scans its whole subnet. Fails up front with
/// [`ScanError::NoLocalAddress`] or [`ScanError::NoSubnetMask`] when the
/// environment can't be determined; after that, nothing aborts the pass.
pub fn scan<F>(
    target: Option<Ipv4Addr>,
    network: &dyn LocalNetwork,
    resolver: &dyn HardwareResolver,
    options: &ScanOptions,
    cancel: &CancelToken,
    on_found: F,
) -> anyhow::Result<()>
where
    F: Fn(Ipv4Addr, MacAddr) + Send + Sync,
{
    let local_ip = target
        .or_else(|| network.local_address())
        .ok_or(ScanError::NoLocalAddress)?;
    let local_mask = network
        .subnet_mask(local_ip)
        .ok_or(ScanError::NoSubnetMask(local_ip))?;

    let segment = Segment::new(local_ip, local_mask);
    if !segment::is_contiguous_mask(segment.mask()) {
        warn!(
            "mask {} is not contiguous; the host range will look odd",
            segment.mask()
        );
    }
    debug!(
        "scanning from {local_ip} (mask {local_mask}): network {}, broadcast {}, {} usable hosts",
        segment.network_address(),
        segment.broadcast_address(),
        segment.usable_host_count(),
    );

    scan_segment(&segment, resolver, options, cancel, on_found)
}

/// Fans resolution out over `segment`'s host range.
///
/// Workers draw addresses from the shared range; completion order across
/// hosts is meaningless and `on_found` may fire from several workers at
/// once.
pub fn scan_segment<F>(
    segment: &Segment,
    resolver: &dyn HardwareResolver,
    options: &ScanOptions,
    cancel: &CancelToken,
    on_found: F,
) -> anyhow::Result<()>
where
    F: Fn(Ipv4Addr, MacAddr) + Send + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers.max(1))
        .build()?;

    pool.install(|| {
        segment.hosts().par_bridge().for_each(|ip| {
            if cancel.is_cancelled() {
                return;
            }
            if let Some(mac) = resolver.resolve(ip) {
                on_found(ip, mac);
            }
        });
    });

    if cancel.is_cancelled() {
        debug!("scan cancelled before the range completed");
    }
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
