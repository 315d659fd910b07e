use std::net::Ipv4Addr;

use clap::Parser;
use piscan_common::error::ScanError;
use piscan_common::net::segment::parse_ipv4;

#[derive(Parser)]
#[command(name = "piscan")]
#[command(version)]
#[command(about = "Your Raspberry PI scanner.")]
pub struct CommandLine {
    /// IPv4 addresses to scan from, in 0.0.0.0 format (ex: 192.168.1.1
    /// 10.0.0.1). All machines on the same network as each address are
    /// checked. With no address, the local network is scanned.
    #[arg(value_parser = parse_address)]
    pub addresses: Vec<Ipv4Addr>,

    /// List only Raspberry PI machines. By default, all machines are
    /// listed.
    #[arg(short = 'o', long = "only-pi")]
    pub only_pi: bool,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

fn parse_address(s: &str) -> Result<Ipv4Addr, ScanError> {
    parse_ipv4(s)
}
