use pnet::util::MacAddr;

/// Vendor prefix shared by every Raspberry Pi Foundation ethernet MAC.
pub const RASPBERRY_PI_OUI: [u8; 3] = [0xB8, 0x27, 0xEB];

/// Identify a Raspberry Pi by its hardware address.
///
/// Compares the first three octets against [`RASPBERRY_PI_OUI`]; byte
/// comparison, so text casing never comes into it.
pub fn is_raspberry_pi(mac: MacAddr) -> bool {
    [mac.0, mac.1, mac.2] == RASPBERRY_PI_OUI
}
