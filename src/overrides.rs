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

//! Persisted override stores.
//!
//! Two flat `key=value` documents: interface -> type override, and
//! `interface.field` -> TX power override field. Loading tolerates comments,
//! blank lines and malformed lines; writing rewrites the whole document and
//! reports failure as a boolean rather than an error.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::profiles::{normalize_chipset, normalize_id};

pub type TypeOverrides = BTreeMap<String, String>;

/// User-supplied TX power override record for one interface. Empty string
/// means unset; a record with every field empty is equivalent to absence
/// and is never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxPowerOverride {
    pub tx_power: String,
    pub tx_power_high: String,
    pub tx_power_low: String,
    pub card_name: String,
    pub power_level: String,
    pub profile_vendor_id: String,
    pub profile_device_id: String,
    pub profile_chipset: String,
}

impl TxPowerOverride {
    pub fn is_empty(&self) -> bool {
        self.tx_power.is_empty()
            && self.tx_power_high.is_empty()
            && self.tx_power_low.is_empty()
            && self.card_name.is_empty()
            && self.power_level.is_empty()
            && self.profile_vendor_id.is_empty()
            && self.profile_device_id.is_empty()
            && self.profile_chipset.is_empty()
    }
}

pub type TxPowerOverrides = BTreeMap<String, TxPowerOverride>;

/// Split one `key=value` line, skipping comments and malformed lines.
fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

pub fn load_type_overrides(path: &Path) -> TypeOverrides {
    let mut overrides = TypeOverrides::new();
    let Ok(content) = fs::read_to_string(path) else {
        return overrides;
    };
    for line in content.lines() {
        let Some((iface, type_name)) = parse_line(line) else {
            continue;
        };
        if type_name.is_empty() {
            continue;
        }
        overrides.insert(iface.to_string(), type_name.to_string());
    }
    overrides
}

pub fn write_type_overrides(path: &Path, overrides: &TypeOverrides) -> bool {
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return false;
        }
    }
    let mut out = String::from("# wicard Wi-Fi type overrides\n");
    for (iface, type_name) in overrides {
        let _ = writeln!(out, "{}={}", iface, type_name);
    }
    fs::write(path, out).is_ok()
}

pub fn load_tx_overrides(path: &Path) -> TxPowerOverrides {
    let mut overrides = TxPowerOverrides::new();
    let Ok(content) = fs::read_to_string(path) else {
        return overrides;
    };
    for line in content.lines() {
        let Some((key, value)) = parse_line(line) else {
            continue;
        };
        let Some((iface, field)) = key.split_once('.') else {
            continue;
        };
        let iface = iface.trim();
        let field = field.trim();
        if iface.is_empty() || field.is_empty() {
            continue;
        }
        let entry = overrides.entry(iface.to_string()).or_default();
        match field.to_ascii_uppercase().as_str() {
            "TX_POWER" => entry.tx_power = value.to_string(),
            "TX_POWER_HIGH" => entry.tx_power_high = value.to_string(),
            "TX_POWER_LOW" => entry.tx_power_low = value.to_string(),
            "CARD_NAME" => entry.card_name = value.to_string(),
            "POWER_LEVEL" => entry.power_level = value.to_string(),
            "PROFILE_VENDOR_ID" => entry.profile_vendor_id = normalize_id(value),
            "PROFILE_DEVICE_ID" => entry.profile_device_id = normalize_id(value),
            "PROFILE_CHIPSET" => entry.profile_chipset = normalize_chipset(value),
            // Unknown fields are ignored
            _ => {}
        }
    }
    overrides
}

pub fn write_tx_overrides(path: &Path, overrides: &TxPowerOverrides) -> bool {
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return false;
        }
    }
    let mut out = String::from("# wicard Wi-Fi TX power overrides\n");
    for (iface, entry) in overrides {
        if entry.is_empty() {
            continue;
        }
        let fields = [
            ("card_name", &entry.card_name),
            ("power_level", &entry.power_level),
            ("profile_vendor_id", &entry.profile_vendor_id),
            ("profile_device_id", &entry.profile_device_id),
            ("profile_chipset", &entry.profile_chipset),
            ("tx_power", &entry.tx_power),
            ("tx_power_high", &entry.tx_power_high),
            ("tx_power_low", &entry.tx_power_low),
        ];
        for (name, value) in fields {
            if !value.is_empty() {
                let _ = writeln!(out, "{}.{}={}", iface, name, value);
            }
        }
    }
    fs::write(path, out).is_ok()
}
