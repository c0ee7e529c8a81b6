//! Device identity derived from the ESP32 factory MAC address.
//!
//! The broker rejects duplicate client ids, so each node appends the last
//! two MAC bytes to the configured prefix: `EnvWatch-cafe`.

use core::fmt::Write;

/// `"<prefix>-xxxx"`; prefix is at most 24 bytes.
pub type ClientId = heapless::String<32>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: writes exactly six bytes into `mac`.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Append four lowercase hex digits from the MAC to `prefix`.
pub fn client_id(prefix: &str, mac: &MacAddress) -> ClientId {
    let mut id = ClientId::new();
    // Prefix length is bounded by NetworkConfig, so this cannot overflow.
    let _ = write!(id, "{}-{:02x}{:02x}", prefix, mac[4], mac[5]);
    id
}
