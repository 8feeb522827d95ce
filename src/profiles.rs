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

//! Capability-profile catalog.
//!
//! Profiles describe what a given vendor/device (optionally narrowed by a
//! chipset tag) can do: whether TX power is adjustable and, if so, which
//! milliwatt levels are advertised. The catalog is loaded from a document
//! on each refresh; a built-in default set covers the common cases when no
//! usable document exists.

use std::fs;
use std::path::Path;

use crate::fields;

/// Whether a card's transmit power is user-adjustable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    Mw,
    Fixed,
}

impl PowerMode {
    /// Case-insensitive; anything that is not `fixed` counts as `mw`.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("fixed") {
            PowerMode::Fixed
        } else {
            PowerMode::Mw
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerMode::Mw => "MW",
            PowerMode::Fixed => "FIXED",
        }
    }
}

/// Canonical `0x` + uppercase-hex form of a vendor/device id. Empty input
/// stays empty. Idempotent.
pub fn normalize_id(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return String::new();
    }
    let rest = if value.starts_with("0x") || value.starts_with("0X") {
        &value[2..]
    } else {
        value
    };
    format!("0x{}", rest.to_ascii_uppercase())
}

pub fn normalize_chipset(value: &str) -> String {
    value.trim().to_ascii_uppercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub vendor_id: String,
    pub device_id: String,
    /// Empty matches any chipset for this vendor/device pair.
    pub chipset: String,
    pub name: String,
    pub power_mode: PowerMode,
    pub min_mw: u32,
    pub max_mw: u32,
    pub lowest_mw: u32,
    pub low_mw: u32,
    pub mid_mw: u32,
    pub high_mw: u32,
}

fn first_positive(values: &[u32]) -> u32 {
    values.iter().copied().find(|v| *v > 0).unwrap_or(0)
}

fn level(object: &str, key: &str) -> u32 {
    match fields::extract_int_field(object, key) {
        Some(v) if v > 0 => v as u32,
        _ => 0,
    }
}

fn parse_profile(object: &str) -> Option<Profile> {
    let vendor = fields::extract_string_field(object, "vendor_id")?;
    let device = fields::extract_string_field(object, "device_id")?;
    if vendor.trim().is_empty() || device.trim().is_empty() {
        return None;
    }

    let power_mode = PowerMode::parse(
        &fields::extract_string_field(object, "power_mode").unwrap_or_else(|| "mw".to_string()),
    );
    let mut profile = Profile {
        vendor_id: normalize_id(&vendor),
        device_id: normalize_id(&device),
        chipset: normalize_chipset(&fields::extract_string_field(object, "chipset").unwrap_or_default()),
        name: fields::extract_string_field(object, "name").unwrap_or_default(),
        power_mode,
        min_mw: 0,
        max_mw: 0,
        lowest_mw: 0,
        low_mw: 0,
        mid_mw: 0,
        high_mw: 0,
    };

    // Fixed-power cards advertise no levels, whatever the entry supplied.
    if profile.power_mode == PowerMode::Fixed {
        return Some(profile);
    }

    profile.min_mw = level(object, "min_mw");
    profile.max_mw = level(object, "max_mw");
    profile.lowest_mw = level(object, "lowest");
    profile.low_mw = level(object, "low");
    profile.mid_mw = level(object, "mid");
    profile.high_mw = level(object, "high");

    if let Some(levels) = fields::extract_object_field(object, "levels_mw") {
        if profile.lowest_mw == 0 {
            profile.lowest_mw = level(&levels, "lowest");
        }
        if profile.low_mw == 0 {
            profile.low_mw = level(&levels, "low");
        }
        if profile.mid_mw == 0 {
            profile.mid_mw = level(&levels, "mid");
        }
        if profile.high_mw == 0 {
            profile.high_mw = level(&levels, "high");
        }
    }

    synthesize_levels(&mut profile);
    Some(profile)
}

/// Fill still-unset levels from the supplied ones so that a profile giving
/// only one level still yields a full, internally plausible ladder. The
/// fallback list per level is fixed and ordered.
fn synthesize_levels(profile: &mut Profile) {
    if profile.min_mw == 0 {
        profile.min_mw = first_positive(&[
            profile.lowest_mw,
            profile.low_mw,
            profile.mid_mw,
            profile.high_mw,
        ]);
    }
    if profile.max_mw == 0 {
        profile.max_mw = first_positive(&[
            profile.high_mw,
            profile.mid_mw,
            profile.low_mw,
            profile.lowest_mw,
        ]);
    }
    if profile.lowest_mw == 0 {
        profile.lowest_mw = first_positive(&[
            profile.low_mw,
            profile.mid_mw,
            profile.high_mw,
            profile.min_mw,
        ]);
    }
    if profile.low_mw == 0 {
        profile.low_mw = first_positive(&[
            profile.lowest_mw,
            profile.mid_mw,
            profile.high_mw,
            profile.min_mw,
        ]);
    }
    if profile.mid_mw == 0 {
        profile.mid_mw = first_positive(&[profile.low_mw, profile.high_mw, profile.max_mw]);
    }
    if profile.high_mw == 0 {
        profile.high_mw = first_positive(&[
            profile.max_mw,
            profile.mid_mw,
            profile.low_mw,
            profile.lowest_mw,
        ]);
    }
}

/// Built-in catalog used when the document is absent or yields no valid
/// entries: one fixed-power on-board adapter, one adjustable USB adapter.
pub fn default_profiles() -> Vec<Profile> {
    vec![
        Profile {
            vendor_id: normalize_id("0x02D0"),
            device_id: normalize_id("0xA9A6"),
            chipset: normalize_chipset("BROADCOM"),
            name: "Raspberry Internal".to_string(),
            power_mode: PowerMode::Fixed,
            min_mw: 0,
            max_mw: 0,
            lowest_mw: 0,
            low_mw: 0,
            mid_mw: 0,
            high_mw: 0,
        },
        Profile {
            vendor_id: normalize_id("0x0BDA"),
            device_id: normalize_id("0xA81A"),
            chipset: normalize_chipset("OPENHD_RTL_88X2EU"),
            name: "LB-Link 8812eu".to_string(),
            power_mode: PowerMode::Mw,
            min_mw: 25,
            max_mw: 1000,
            lowest_mw: 25,
            low_mw: 100,
            mid_mw: 500,
            high_mw: 1000,
        },
    ]
}

/// Load the catalog from `path`, falling back to [`default_profiles`] when
/// the document is absent, unreadable, or contains no valid entries.
pub fn load_profiles(path: &Path) -> Vec<Profile> {
    let Ok(content) = fs::read_to_string(path) else {
        return default_profiles();
    };
    let objects = fields::extract_array_objects(&content, "cards");
    let profiles: Vec<Profile> = objects.iter().filter_map(|o| parse_profile(o)).collect();
    if profiles.is_empty() {
        return default_profiles();
    }
    profiles
}

/// Catalog lookup. Priority among vendor/device matches: exact chipset
/// match wins immediately, then the first chipset-agnostic entry, then the
/// first match of any chipset. All comparisons are case-insensitive.
pub fn find_profile<'a>(
    profiles: &'a [Profile],
    vendor_id: &str,
    device_id: &str,
    chipset: &str,
) -> Option<&'a Profile> {
    let mut vendor_device_match: Option<&Profile> = None;
    let mut generic_match: Option<&Profile> = None;
    for profile in profiles {
        if profile.vendor_id.eq_ignore_ascii_case(vendor_id)
            && profile.device_id.eq_ignore_ascii_case(device_id)
        {
            if profile.chipset.is_empty() {
                if generic_match.is_none() {
                    generic_match = Some(profile);
                }
            } else if profile.chipset.eq_ignore_ascii_case(chipset) {
                return Some(profile);
            }
            if vendor_device_match.is_none() {
                vendor_device_match = Some(profile);
            }
        }
    }
    generic_match.or(vendor_device_match)
}
