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

//! Shared test fixtures: fake network-class trees under a temp directory.

use std::fs;
use std::path::{Path, PathBuf};

/// Create one fake wireless interface under `net_root` and return its
/// device directory.
pub fn create_fake_interface(
    net_root: &Path,
    iface: &str,
    driver: &str,
    phy_index: i32,
    mac: &str,
) -> PathBuf {
    let iface_dir = net_root.join(iface);
    let device_dir = iface_dir.join("device");
    fs::create_dir_all(&device_dir).unwrap();
    fs::create_dir_all(iface_dir.join("phy80211")).unwrap();
    fs::write(
        iface_dir.join("phy80211").join("index"),
        format!("{}\n", phy_index),
    )
    .unwrap();
    fs::write(iface_dir.join("address"), format!("{}\n", mac)).unwrap();
    fs::write(device_dir.join("uevent"), format!("DRIVER={}\n", driver)).unwrap();
    device_dir
}

/// Attach USB-style identity attributes to a fake device directory.
pub fn set_usb_identity(device_dir: &Path, vendor: &str, product: &str) {
    fs::write(device_dir.join("idVendor"), format!("{}\n", vendor)).unwrap();
    fs::write(device_dir.join("idProduct"), format!("{}\n", product)).unwrap();
}
