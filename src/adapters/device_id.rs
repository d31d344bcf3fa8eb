//! Tool identity.
//!
//! The tool name keys the config URL and the MQTT topics.  A build can
//! pin it with `AUTHBOX_TOOL_NAME`; otherwise it is derived from the
//! factory MAC as `authbox-xxyyzz` (last three bytes, lowercase hex),
//! stable across reboots.

use core::fmt::Write;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

pub type ToolName = heapless::String<32>;

/// Read the factory MAC address from eFuse.
#[cfg(feature = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the buffer is exactly the 6 bytes the call writes.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: a deterministic fake MAC.
#[cfg(not(feature = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// `authbox-xxyyzz` from the last three MAC bytes.
pub fn default_tool_name(mac: &MacAddress) -> ToolName {
    let mut name = ToolName::new();
    let _ = write!(name, "authbox-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    name
}

/// Build-time override wins when it is non-blank and fits.
pub fn resolve_tool_name(override_name: Option<&str>, mac: &MacAddress) -> ToolName {
    override_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .and_then(|n| ToolName::try_from(n).ok())
        .unwrap_or_else(|| default_tool_name(mac))
}
