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

//! Card resolution engine.
//!
//! Merges hardware identity, the two override stores and the profile
//! catalog into one effective record per wireless interface, and keeps the
//! result as an atomically swapped snapshot. Resolution order per card:
//! identity, type override, catalog lookup keyed on the detected type,
//! forced-profile substitution, power-field derivation.

use std::io;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::config::Paths;
use crate::logger::log_event;
use crate::overrides::{self, TxPowerOverride, TxPowerOverrides, TypeOverrides};
use crate::profiles::{self, PowerMode, Profile};
use crate::sysfs;

#[derive(Debug, Error)]
pub enum CardError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Effective per-interface record, rebuilt on every refresh. String power
/// fields use "" for unset; levels are decimal milliwatt strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardRecord {
    pub interface: String,
    pub driver: String,
    pub phy_index: i32,
    pub mac: String,
    pub vendor_id: String,
    pub device_id: String,
    pub detected_type: String,
    pub override_type: String,
    /// The classification callers should trust.
    #[serde(rename = "type")]
    pub effective_type: String,
    pub tx_power: String,
    pub tx_power_high: String,
    pub tx_power_low: String,
    pub card_name: String,
    pub power_mode: String,
    pub power_level: String,
    pub power_lowest: String,
    pub power_low: String,
    pub power_mid: String,
    pub power_high: String,
    pub power_min: String,
    pub power_max: String,
    pub disabled: bool,
}

fn to_level_string(value: u32) -> String {
    if value > 0 {
        value.to_string()
    } else {
        String::new()
    }
}

/// Map a power-level selector onto the matching profile level. `FIXED` and
/// anything unknown select nothing.
fn selector_level(profile: &Profile, selector: &str) -> u32 {
    match selector {
        "LOWEST" => profile.lowest_mw,
        "LOW" => profile.low_mw,
        "MID" => profile.mid_mw,
        "HIGH" => profile.high_mw,
        _ => 0,
    }
}

/// Resolve one interface into its effective record. Best effort: an
/// interface whose identity cannot be recovered still yields a record with
/// the unknown fields empty.
pub fn build_card(
    net_root: &std::path::Path,
    iface: &str,
    type_overrides: &TypeOverrides,
    tx_overrides: &TxPowerOverrides,
    profiles: &[Profile],
) -> CardRecord {
    let identity = sysfs::resolve_identity(net_root, iface);
    let detected_type = sysfs::driver_to_type(&identity.driver).to_string();

    let mut card = CardRecord {
        interface: iface.to_string(),
        driver: identity.driver,
        phy_index: identity.phy_index,
        mac: identity.mac,
        vendor_id: identity.vendor_id,
        device_id: identity.device_id,
        detected_type: detected_type.clone(),
        override_type: String::new(),
        effective_type: detected_type.clone(),
        tx_power: String::new(),
        tx_power_high: String::new(),
        tx_power_low: String::new(),
        card_name: String::new(),
        power_mode: PowerMode::Mw.as_str().to_string(),
        power_level: String::new(),
        power_lowest: String::new(),
        power_low: String::new(),
        power_mid: String::new(),
        power_high: String::new(),
        power_min: String::new(),
        power_max: String::new(),
        disabled: false,
    };

    // A DISABLED override marks the card but the effective type stays the
    // detected one so diagnostics still show what the hardware is.
    if let Some(override_type) = type_overrides.get(iface) {
        card.override_type = override_type.clone();
        if override_type.eq_ignore_ascii_case("DISABLED") {
            card.disabled = true;
        } else {
            card.effective_type = override_type.clone();
        }
    }

    let default_override = TxPowerOverride::default();
    let tx_override = tx_overrides.get(iface).unwrap_or(&default_override);

    // Catalog lookup always keys on the detected type, not the override.
    let mut profile =
        profiles::find_profile(profiles, &card.vendor_id, &card.device_id, &detected_type);

    // Forced profile identity replaces the lookup result when it resolves.
    if !tx_override.profile_vendor_id.is_empty() && !tx_override.profile_device_id.is_empty() {
        let chipset_hint = if tx_override.profile_chipset.is_empty() {
            detected_type.as_str()
        } else {
            tx_override.profile_chipset.as_str()
        };
        let forced = profiles::find_profile(
            profiles,
            &tx_override.profile_vendor_id,
            &tx_override.profile_device_id,
            chipset_hint,
        )
        .or_else(|| {
            profiles::find_profile(
                profiles,
                &tx_override.profile_vendor_id,
                &tx_override.profile_device_id,
                "",
            )
        });
        if forced.is_some() {
            profile = forced;
        }
    }

    // The selector is echoed into the record even without a profile; only
    // the milliwatt mapping below needs one.
    let selector = tx_override.power_level.trim().to_ascii_uppercase();
    if !selector.is_empty() && selector != "AUTO" {
        card.power_level = selector.clone();
    }

    if let Some(profile) = profile {
        card.card_name = profile.name.clone();
        card.power_mode = profile.power_mode.as_str().to_string();
        if profile.power_mode == PowerMode::Fixed {
            // Fixed hardware: no level ladder, no adjustable power, and the
            // selector is forced whatever the override says.
            card.power_level = "FIXED".to_string();
        } else {
            card.power_lowest = to_level_string(profile.lowest_mw);
            card.power_low = to_level_string(profile.low_mw);
            card.power_mid = to_level_string(profile.mid_mw);
            card.power_high = to_level_string(profile.high_mw);
            card.power_min = to_level_string(profile.min_mw);
            card.power_max = to_level_string(profile.max_mw);
            card.tx_power_high = to_level_string(profile.high_mw);
            card.tx_power_low = to_level_string(profile.lowest_mw);

            if !selector.is_empty() && selector != "AUTO" {
                let level = selector_level(profile, &selector);
                if level > 0 {
                    card.tx_power = level.to_string();
                }
            }
        }
    }

    if card.power_mode != "FIXED" {
        // Explicit override values beat anything catalog-derived.
        if !tx_override.tx_power.is_empty() {
            card.tx_power = tx_override.tx_power.clone();
        }
        if !tx_override.tx_power_high.is_empty() {
            card.tx_power_high = tx_override.tx_power_high.clone();
        }
        if !tx_override.tx_power_low.is_empty() {
            card.tx_power_low = tx_override.tx_power_low.clone();
        }
    }
    if !tx_override.card_name.is_empty() {
        card.card_name = tx_override.card_name.clone();
    }

    card
}

/// One full detection pass: load both stores and the catalog, enumerate
/// wireless interfaces, resolve each. Only enumeration failure is fatal.
pub fn detect_cards(paths: &Paths) -> Result<Vec<CardRecord>, CardError> {
    let type_overrides = overrides::load_type_overrides(&paths.type_overrides);
    let tx_overrides = overrides::load_tx_overrides(&paths.tx_overrides);
    let profiles = profiles::load_profiles(&paths.catalog);
    let interfaces = sysfs::list_wireless_interfaces(&paths.net_root)?;
    Ok(interfaces
        .iter()
        .map(|iface| {
            build_card(
                &paths.net_root,
                iface,
                &type_overrides,
                &tx_overrides,
                &profiles,
            )
        })
        .collect())
}

/// Owns the current inventory snapshot. Refresh rebuilds the full set and
/// swaps it in one step; readers always see a complete, consistent set.
pub struct CardStore {
    paths: Paths,
    snapshot: Mutex<Vec<CardRecord>>,
}

impl CardStore {
    pub fn new(paths: Paths) -> Self {
        Self {
            paths,
            snapshot: Mutex::new(Vec::new()),
        }
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Rebuild the inventory. On enumeration failure the previous snapshot
    /// is kept and `false` is returned.
    pub fn refresh(&self) -> bool {
        match detect_cards(&self.paths) {
            Ok(cards) => {
                log_event("refresh", json!({ "ok": true, "cards": cards.len() }));
                let mut snapshot = self
                    .snapshot
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                *snapshot = cards;
                true
            }
            Err(e) => {
                log_event("refresh", json!({ "ok": false, "error": e.to_string() }));
                false
            }
        }
    }

    pub fn cards(&self) -> Vec<CardRecord> {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Whether any enabled card carries a wifibroadcast-capable effective
    /// type. Disabled cards do not count even when their type matches.
    pub fn has_wifibroadcast_cards(&self) -> bool {
        self.cards()
            .iter()
            .any(|card| !card.disabled && sysfs::is_wifibroadcast_type(&card.effective_type))
    }
}
