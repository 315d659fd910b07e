//! End-to-end scan engine tests with injected collaborators, wired the
//! way the CLI wires production: the blocking scan runs under
//! `spawn_blocking` while cancellation arrives from the async side.

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pnet::util::MacAddr;

use piscan_common::error::ScanError;
use piscan_core::interface::LocalNetwork;
use piscan_core::resolver::HardwareResolver;
use piscan_core::scanner::{scan, CancelToken, ScanOptions};

struct FakeNetwork {
    address: Ipv4Addr,
    mask: Ipv4Addr,
}

impl LocalNetwork for FakeNetwork {
    fn local_address(&self) -> Option<Ipv4Addr> {
        Some(self.address)
    }

    fn subnet_mask(&self, addr: Ipv4Addr) -> Option<Ipv4Addr> {
        (addr == self.address).then_some(self.mask)
    }
}

/// Resolver where a known set of hosts answers and everything else is
/// silent, optionally with a per-probe delay to simulate the ARP round
/// trip.
struct FakeResolver {
    answers: HashMap<Ipv4Addr, MacAddr>,
    probed: Mutex<HashSet<Ipv4Addr>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl FakeResolver {
    fn new(answers: HashMap<Ipv4Addr, MacAddr>) -> Self {
        Self {
            answers,
            probed: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl HardwareResolver for FakeResolver {
    fn resolve(&self, ip: Ipv4Addr) -> Option<MacAddr> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.probed.lock().unwrap().insert(ip);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.answers.get(&ip).copied()
    }
}

fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

fn mac(last: u8) -> MacAddr {
    MacAddr(0xB8, 0x27, 0xEB, 0x00, 0x00, last)
}

fn known_hosts() -> HashMap<Ipv4Addr, MacAddr> {
    HashMap::from([
        (ip("192.168.1.1"), mac(1)),
        (ip("192.168.1.17"), mac(17)),
        (ip("192.168.1.254"), mac(254)),
    ])
}

/// Exactly the answering hosts come back, once each, with the right
/// pairing, whether the pool is serial or wide.
#[tokio::test]
async fn callback_fires_exactly_once_per_answering_host() {
    for workers in [1, 8] {
        let network = Arc::new(FakeNetwork {
            address: ip("192.168.1.10"),
            mask: ip("255.255.255.0"),
        });
        let resolver = Arc::new(FakeResolver::new(known_hosts()));
        let found: Arc<Mutex<Vec<(Ipv4Addr, MacAddr)>>> = Arc::new(Mutex::new(Vec::new()));

        let (net, res, sink) = (network.clone(), resolver.clone(), found.clone());
        tokio::task::spawn_blocking(move || {
            scan(
                None,
                net.as_ref(),
                res.as_ref(),
                &ScanOptions::with_workers(workers),
                &CancelToken::new(),
                move |ip, mac| sink.lock().unwrap().push((ip, mac)),
            )
        })
        .await
        .unwrap()
        .unwrap();

        let mut found = found.lock().unwrap().clone();
        found.sort_by_key(|(ip, _)| *ip);
        let mut expected: Vec<(Ipv4Addr, MacAddr)> = known_hosts().into_iter().collect();
        expected.sort_by_key(|(ip, _)| *ip);
        assert_eq!(found, expected, "workers={workers}");
        assert_eq!(resolver.calls.load(Ordering::Relaxed), 254);
    }
}

/// Every usable /24 address is probed; network and broadcast are not.
#[tokio::test]
async fn probes_cover_the_usable_range_only() {
    let network = Arc::new(FakeNetwork {
        address: ip("10.0.0.40"),
        mask: ip("255.255.255.0"),
    });
    let resolver = Arc::new(FakeResolver::new(HashMap::new()));

    let (net, res) = (network.clone(), resolver.clone());
    tokio::task::spawn_blocking(move || {
        scan(
            None,
            net.as_ref(),
            res.as_ref(),
            &ScanOptions::with_workers(4),
            &CancelToken::new(),
            |_, _| {},
        )
    })
    .await
    .unwrap()
    .unwrap();

    let probed = resolver.probed.lock().unwrap();
    assert_eq!(probed.len(), 254);
    assert!(probed.contains(&ip("10.0.0.1")));
    assert!(probed.contains(&ip("10.0.0.254")));
    assert!(!probed.contains(&ip("10.0.0.0")));
    assert!(!probed.contains(&ip("10.0.0.255")));
}

/// Environment-lookup failures surface through the orchestration layer
/// before any probe is dispatched.
#[tokio::test]
async fn unknown_address_fails_with_no_subnet_mask() {
    let network = Arc::new(FakeNetwork {
        address: ip("192.168.1.10"),
        mask: ip("255.255.255.0"),
    });
    let resolver = Arc::new(FakeResolver::new(HashMap::new()));

    let (net, res) = (network.clone(), resolver.clone());
    let err: anyhow::Error = tokio::task::spawn_blocking(move || {
        scan(
            Some(ip("172.16.0.9")),
            net.as_ref(),
            res.as_ref(),
            &ScanOptions::with_workers(1),
            &CancelToken::new(),
            |_, _| {},
        )
    })
    .await
    .unwrap()
    .unwrap_err();

    assert_eq!(
        err.downcast_ref::<ScanError>(),
        Some(&ScanError::NoSubnetMask(ip("172.16.0.9")))
    );
    assert_eq!(resolver.calls.load(Ordering::Relaxed), 0);
}

/// Cancelling right after startup over a /16 (65,534 candidates) ends
/// the scan quickly, silently, and well short of the full range.
#[tokio::test]
async fn cancellation_cuts_a_large_scan_short() {
    let network = Arc::new(FakeNetwork {
        address: ip("10.1.0.1"),
        mask: ip("255.255.0.0"),
    });
    let resolver =
        Arc::new(FakeResolver::new(HashMap::new()).with_delay(Duration::from_millis(1)));
    let cancel = CancelToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });
    }

    let started = Instant::now();
    let (net, res) = (network.clone(), resolver.clone());
    let result = tokio::task::spawn_blocking(move || {
        scan(
            None,
            net.as_ref(),
            res.as_ref(),
            &ScanOptions::with_workers(4),
            &cancel,
            |_, _| {},
        )
    })
    .await
    .unwrap();

    assert!(result.is_ok(), "cancellation must not surface as an error");
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "cancelled scan took {:?}",
        started.elapsed()
    );
    let calls = resolver.calls.load(Ordering::Relaxed);
    assert!(
        calls < 65_534,
        "cancellation should stop the fan-out early, saw {calls} probes"
    );
}
