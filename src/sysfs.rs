/*
 * This file is part of Wicard.
 *
 * Copyright (C) 2025 Wicard contributors
 *
 * Wicard is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Wicard is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Wicard. If not, see <https://www.gnu.org/licenses/>.
 */

//! Hardware identity resolution from the kernel's network-class tree.
//!
//! The interesting part is vendor/device recovery: the attribute files that
//! carry it differ per bus and driver, so the resolver walks up from the
//! device directory probing several sources per ancestor level until both
//! halves are known.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::profiles::normalize_id;

/// How many ancestor directories the vendor/device walk visits.
const MAX_WALK_DEPTH: usize = 6;

/// Resolved hardware identity of one wireless interface. Unknown string
/// fields are empty; an unknown PHY index is -1.
#[derive(Debug, Clone)]
pub struct HwIdentity {
    pub driver: String,
    pub phy_index: i32,
    pub mac: String,
    pub vendor_id: String,
    pub device_id: String,
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

fn is_hex4(s: &str) -> bool {
    s.len() == 4 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Driver name from a device uevent document (`DRIVER=<token>`).
pub fn extract_driver_name(uevent: &str) -> Option<String> {
    for line in uevent.lines() {
        if let Some(rest) = line.trim().strip_prefix("DRIVER=") {
            let token: String = rest
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            if !token.is_empty() {
                return Some(token);
            }
        }
    }
    None
}

/// Vendor/device from a uevent document: `PCI_ID=VVVV:DDDD`, else
/// `PRODUCT=vvvv/dddd/...`. Only still-empty slots are filled.
pub fn fill_vendor_device_from_uevent(uevent: &str, vendor: &mut String, device: &mut String) {
    if !vendor.is_empty() && !device.is_empty() {
        return;
    }
    for line in uevent.lines() {
        if let Some(rest) = line.trim().strip_prefix("PCI_ID=") {
            if let Some((v, d)) = rest.split_once(':') {
                let d = d.get(..4).unwrap_or("");
                if is_hex4(v) && is_hex4(d) {
                    if vendor.is_empty() {
                        *vendor = normalize_id(v);
                    }
                    if device.is_empty() {
                        *device = normalize_id(d);
                    }
                    return;
                }
            }
        }
    }
    for line in uevent.lines() {
        if let Some(rest) = line.trim().strip_prefix("PRODUCT=") {
            let parts: Vec<&str> = rest.split('/').collect();
            if parts.len() >= 3 && is_hex4(parts[0]) && is_hex4(parts[1]) {
                if vendor.is_empty() {
                    *vendor = normalize_id(parts[0]);
                }
                if device.is_empty() {
                    *device = normalize_id(parts[1]);
                }
                return;
            }
        }
    }
}

/// Vendor/device from a modalias document: `usb:vVVVVpDDDD`, else
/// `pci:vVVVVdDDDD`. Only still-empty slots are filled.
pub fn fill_vendor_device_from_modalias(modalias: &str, vendor: &mut String, device: &mut String) {
    if !vendor.is_empty() && !device.is_empty() {
        return;
    }
    let modalias = modalias.trim();
    for (prefix, sep) in [("usb:v", b'p'), ("pci:v", b'd')] {
        let Some(pos) = modalias.find(prefix) else {
            continue;
        };
        let rest = &modalias[pos + prefix.len()..];
        let v = rest.get(..4).unwrap_or("");
        let d = rest.get(5..9).unwrap_or("");
        if is_hex4(v) && rest.as_bytes().get(4) == Some(&sep) && is_hex4(d) {
            if vendor.is_empty() {
                *vendor = normalize_id(v);
            }
            if device.is_empty() {
                *device = normalize_id(d);
            }
            return;
        }
    }
}

/// Walk upward from the device directory through ancestor levels, probing
/// at each level: `vendor`/`device` attributes, `idVendor`/`idProduct`
/// attributes, the uevent document, the modalias document. Stops early once
/// both halves are known.
pub fn fill_vendor_device_from_sysfs(device_path: &Path, vendor: &mut String, device: &mut String) {
    if device_path.as_os_str().is_empty() {
        return;
    }
    let mut current: PathBuf =
        fs::canonicalize(device_path).unwrap_or_else(|_| device_path.to_path_buf());

    for _ in 0..MAX_WALK_DEPTH {
        if vendor.is_empty() {
            if let Some(value) = read_trimmed(&current.join("vendor")) {
                *vendor = normalize_id(&value);
            }
        }
        if device.is_empty() {
            if let Some(value) = read_trimmed(&current.join("device")) {
                *device = normalize_id(&value);
            }
        }
        if vendor.is_empty() {
            if let Some(value) = read_trimmed(&current.join("idVendor")) {
                *vendor = normalize_id(&value);
            }
        }
        if device.is_empty() {
            if let Some(value) = read_trimmed(&current.join("idProduct")) {
                *device = normalize_id(&value);
            }
        }
        if let Ok(uevent) = fs::read_to_string(current.join("uevent")) {
            fill_vendor_device_from_uevent(&uevent, vendor, device);
        }
        if let Ok(modalias) = fs::read_to_string(current.join("modalias")) {
            fill_vendor_device_from_modalias(&modalias, vendor, device);
        }
        if !vendor.is_empty() && !device.is_empty() {
            break;
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }
}

/// Resolve the full hardware identity of one interface under `net_root`.
pub fn resolve_identity(net_root: &Path, iface: &str) -> HwIdentity {
    let mut device_path = net_root.join(iface).join("device");
    let mut uevent_path = device_path.join("uevent");
    // Legacy alias: some Atheros setups expose the radio under wifi0
    if iface == "ath0" && !uevent_path.exists() {
        device_path = net_root.join("wifi0").join("device");
        uevent_path = device_path.join("uevent");
    }

    let uevent = fs::read_to_string(&uevent_path).unwrap_or_default();
    let driver = if uevent.is_empty() {
        String::new()
    } else {
        extract_driver_name(&uevent).unwrap_or_default()
    };

    let phy_index = read_trimmed(&net_root.join(iface).join("phy80211").join("index"))
        .and_then(|s| s.parse::<i32>().ok())
        .unwrap_or(-1);

    let mac = read_trimmed(&net_root.join(iface).join("address")).unwrap_or_default();

    let mut vendor_id = String::new();
    let mut device_id = String::new();
    fill_vendor_device_from_sysfs(&device_path, &mut vendor_id, &mut device_id);
    if !uevent.is_empty() {
        fill_vendor_device_from_uevent(&uevent, &mut vendor_id, &mut device_id);
    }

    HwIdentity {
        driver,
        phy_index,
        mac,
        vendor_id,
        device_id,
    }
}

/// Exact driver-name matches evaluated before the family table.
const DRIVER_TYPES_EXACT: &[(&str, &str)] = &[
    ("rtl88xxau_ohd", "OPENHD_RTL_88X2AU"),
    ("rtl88x2au_ohd", "OPENHD_RTL_88X2CU"),
    ("rtl88x2bu_ohd", "OPENHD_RTL_88X2BU"),
    ("rtl88x2eu_ohd", "OPENHD_RTL_88X2EU"),
    ("cnss_pci", "QUALCOMM"),
    ("rtl8852bu_ohd", "OPENHD_RTL_8852BU"),
    ("rtl88x2cu_ohd", "OPENHD_RTL_88X2CU"),
];

/// Substring matches against generic driver families.
const DRIVER_TYPES_FAMILY: &[(&str, &str)] = &[
    ("ath9k", "ATHEROS"),
    ("rt2800usb", "RALINK"),
    ("iwlwifi", "INTEL"),
    ("brcmfmac", "BROADCOM"),
    ("bcmsdh_sdmmc", "BROADCOM"),
    ("aicwf_sdio", "AIC"),
    ("88xxau", "RTL_88X2AU"),
    ("rtw_8822bu", "RTL_88X2BU"),
    ("mt7921u", "MT_7921u"),
];

/// Classification derived purely from the driver name: exact matches first,
/// then family substrings, both case-insensitive.
pub fn driver_to_type(driver_name: &str) -> &'static str {
    for (pattern, type_name) in DRIVER_TYPES_EXACT {
        if driver_name.eq_ignore_ascii_case(pattern) {
            return type_name;
        }
    }
    let upper = driver_name.to_ascii_uppercase();
    for (pattern, type_name) in DRIVER_TYPES_FAMILY {
        if upper.contains(&pattern.to_ascii_uppercase()) {
            return type_name;
        }
    }
    "UNKNOWN"
}

/// Whether a classification tag marks a wifibroadcast-capable card.
pub fn is_wifibroadcast_type(type_name: &str) -> bool {
    type_name.trim().to_ascii_uppercase().starts_with("OPENHD_")
}

/// Present wireless interfaces: entries under `net_root` exposing a
/// `phy80211` attribute directory. An enumeration failure propagates so the
/// engine can keep its previous snapshot.
pub fn list_wireless_interfaces(net_root: &Path) -> io::Result<Vec<String>> {
    let mut interfaces = Vec::new();
    for entry in fs::read_dir(net_root)? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if !path.join("phy80211").exists() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
            interfaces.push(name.to_string());
        }
    }
    interfaces.sort();
    Ok(interfaces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use tempfile::TempDir;

    #[test]
    fn test_extract_driver_name() {
        let uevent = "DEVTYPE=wlan\nDRIVER=rtl88x2eu_ohd\nMODALIAS=usb:x\n";
        assert_eq!(extract_driver_name(uevent).as_deref(), Some("rtl88x2eu_ohd"));
        assert_eq!(extract_driver_name("DEVTYPE=wlan\n"), None);
        assert_eq!(extract_driver_name(""), None);
    }

    #[test]
    fn test_uevent_pci_id() {
        let mut vendor = String::new();
        let mut device = String::new();
        fill_vendor_device_from_uevent("PCI_ID=10EC:8812\n", &mut vendor, &mut device);
        assert_eq!(vendor, "0x10EC");
        assert_eq!(device, "0x8812");
    }

    #[test]
    fn test_uevent_product() {
        let mut vendor = String::new();
        let mut device = String::new();
        fill_vendor_device_from_uevent("PRODUCT=bda/a81a/100\n", &mut vendor, &mut device);
        // Short components do not match; both halves must be 4 hex digits
        assert_eq!(vendor, "");
        fill_vendor_device_from_uevent("PRODUCT=0bda/a81a/100\n", &mut vendor, &mut device);
        assert_eq!(vendor, "0x0BDA");
        assert_eq!(device, "0xA81A");
    }

    #[test]
    fn test_uevent_does_not_overwrite_known() {
        let mut vendor = "0x1111".to_string();
        let mut device = "0x2222".to_string();
        fill_vendor_device_from_uevent("PCI_ID=10EC:8812\n", &mut vendor, &mut device);
        assert_eq!(vendor, "0x1111");
        assert_eq!(device, "0x2222");
    }

    #[test]
    fn test_modalias_usb_and_pci() {
        let mut vendor = String::new();
        let mut device = String::new();
        fill_vendor_device_from_modalias(
            "usb:v0BDApA81Ad0200dcEFdsc02dp01\n",
            &mut vendor,
            &mut device,
        );
        assert_eq!(vendor, "0x0BDA");
        assert_eq!(device, "0xA81A");

        let mut vendor = String::new();
        let mut device = String::new();
        fill_vendor_device_from_modalias("pci:v10ECd8812sv", &mut vendor, &mut device);
        assert_eq!(vendor, "0x10EC");
        assert_eq!(device, "0x8812");

        // Real pci modalias uses 8-digit ids; the 4-digit pattern must not match
        let mut vendor = String::new();
        let mut device = String::new();
        fill_vendor_device_from_modalias("pci:v000010ECd00008812sv", &mut vendor, &mut device);
        assert_eq!(vendor, "");
        assert_eq!(device, "");
    }

    #[test]
    fn test_driver_to_type_exact_and_family() {
        assert_eq!(driver_to_type("rtl88x2eu_ohd"), "OPENHD_RTL_88X2EU");
        assert_eq!(driver_to_type("RTL88X2EU_OHD"), "OPENHD_RTL_88X2EU");
        assert_eq!(driver_to_type("rtl88xxau_ohd"), "OPENHD_RTL_88X2AU");
        assert_eq!(driver_to_type("cnss_pci"), "QUALCOMM");
        // Family substring matches
        assert_eq!(driver_to_type("ath9k_htc"), "ATHEROS");
        assert_eq!(driver_to_type("iwlwifi"), "INTEL");
        assert_eq!(driver_to_type("brcmfmac_wcc"), "BROADCOM");
        assert_eq!(driver_to_type("rtl88xxau"), "RTL_88X2AU");
        assert_eq!(driver_to_type("mt7921u"), "MT_7921u");
        // Exact table wins over the 88xxau substring
        assert_eq!(driver_to_type("rtl88xxau_ohd"), "OPENHD_RTL_88X2AU");
        assert_eq!(driver_to_type("something_else"), "UNKNOWN");
        assert_eq!(driver_to_type(""), "UNKNOWN");
    }

    #[test]
    fn test_is_wifibroadcast_type() {
        assert!(is_wifibroadcast_type("OPENHD_RTL_88X2EU"));
        assert!(is_wifibroadcast_type(" openhd_rtl_88x2au "));
        assert!(!is_wifibroadcast_type("RTL_88X2AU"));
        assert!(!is_wifibroadcast_type("UNKNOWN"));
        assert!(!is_wifibroadcast_type(""));
    }

    #[test]
    fn test_resolve_identity_usb() {
        let root = TempDir::new().unwrap();
        let net_root = root.path().join("net");
        let device = test_utils::create_fake_interface(
            &net_root,
            "wlan0",
            "rtl88x2eu_ohd",
            1,
            "aa:bb:cc:dd:ee:ff",
        );
        test_utils::set_usb_identity(&device, "0bda", "a81a");

        let identity = resolve_identity(&net_root, "wlan0");
        assert_eq!(identity.driver, "rtl88x2eu_ohd");
        assert_eq!(identity.phy_index, 1);
        assert_eq!(identity.mac, "aa:bb:cc:dd:ee:ff");
        assert_eq!(identity.vendor_id, "0x0BDA");
        assert_eq!(identity.device_id, "0xA81A");
    }

    #[test]
    fn test_resolve_identity_ancestor_walk() {
        // Identity attributes two levels above the device directory
        let root = TempDir::new().unwrap();
        let net_root = root.path().join("net");
        let iface_dir = net_root.join("wlan1");
        let device = iface_dir.join("device").join("sub").join("leaf");
        fs::create_dir_all(&device).unwrap();
        fs::create_dir_all(iface_dir.join("phy80211")).unwrap();
        fs::write(iface_dir.join("phy80211").join("index"), "0\n").unwrap();
        fs::write(iface_dir.join("address"), "11:22:33:44:55:66\n").unwrap();
        fs::write(device.join("uevent"), "DRIVER=iwlwifi\n").unwrap();
        let grandparent = iface_dir.join("device");
        fs::write(grandparent.join("vendor"), "0x8086\n").unwrap();
        fs::write(grandparent.join("device"), "0x2723\n").unwrap();

        let mut vendor = String::new();
        let mut device_id = String::new();
        fill_vendor_device_from_sysfs(&device, &mut vendor, &mut device_id);
        assert_eq!(vendor, "0x8086");
        assert_eq!(device_id, "0x2723");
    }

    #[test]
    fn test_resolve_identity_modalias_fallback() {
        let root = TempDir::new().unwrap();
        let net_root = root.path().join("net");
        let device = test_utils::create_fake_interface(
            &net_root,
            "wlan2",
            "rtw_8822bu",
            2,
            "de:ad:be:ef:00:01",
        );
        fs::write(device.join("modalias"), "usb:v0BDApB812d0200\n").unwrap();
        let identity = resolve_identity(&net_root, "wlan2");
        assert_eq!(identity.vendor_id, "0x0BDA");
        assert_eq!(identity.device_id, "0xB812");
    }

    #[test]
    fn test_resolve_identity_missing_everything() {
        let root = TempDir::new().unwrap();
        let identity = resolve_identity(&root.path().join("net"), "wlan9");
        assert_eq!(identity.driver, "");
        assert_eq!(identity.phy_index, -1);
        assert_eq!(identity.mac, "");
        assert_eq!(identity.vendor_id, "");
        assert_eq!(identity.device_id, "");
    }

    #[test]
    fn test_resolve_identity_ath0_alias() {
        let root = TempDir::new().unwrap();
        let net_root = root.path().join("net");
        // ath0 exists but has no device uevent; wifi0 carries the device
        let ath0 = net_root.join("ath0");
        fs::create_dir_all(ath0.join("phy80211")).unwrap();
        fs::write(ath0.join("phy80211").join("index"), "3\n").unwrap();
        fs::write(ath0.join("address"), "02:00:00:00:00:01\n").unwrap();
        let wifi0_device = net_root.join("wifi0").join("device");
        fs::create_dir_all(&wifi0_device).unwrap();
        fs::write(wifi0_device.join("uevent"), "DRIVER=ath9k_htc\n").unwrap();

        let identity = resolve_identity(&net_root, "ath0");
        assert_eq!(identity.driver, "ath9k_htc");
        assert_eq!(identity.phy_index, 3);
        assert_eq!(identity.mac, "02:00:00:00:00:01");
    }

    #[test]
    fn test_list_wireless_interfaces() {
        let root = TempDir::new().unwrap();
        let net_root = root.path().join("net");
        test_utils::create_fake_interface(&net_root, "wlan1", "iwlwifi", 1, "");
        test_utils::create_fake_interface(&net_root, "wlan0", "iwlwifi", 0, "");
        // Wired interface without phy80211 is skipped
        fs::create_dir_all(net_root.join("eth0")).unwrap();

        let interfaces = list_wireless_interfaces(&net_root).unwrap();
        assert_eq!(interfaces, vec!["wlan0", "wlan1"]);
    }

    #[test]
    fn test_list_wireless_interfaces_enumeration_failure() {
        assert!(list_wireless_interfaces(Path::new("/nonexistent/net")).is_err());
    }
}
