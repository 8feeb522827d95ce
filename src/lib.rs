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

//! Wicard - Wi-Fi card inventory for Linux using sysfs
//!
//! This library maintains a queryable inventory of wireless adapters:
//! per interface it resolves hardware identity from sysfs, matches an RF
//! capability profile, applies user overrides, and exposes the merged record
//! over a line-oriented unix socket. RF parameter changes are relayed to the
//! OpenHD control socket.

pub mod cards;
pub mod config;
pub mod fields;
pub mod logger;
pub mod overrides;
pub mod profiles;
pub mod service;
pub mod sysfs;

#[cfg(test)]
pub mod test_utils;
