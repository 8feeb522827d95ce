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

use std::env;
use std::path::{Path, PathBuf};

/// Maximum accepted line length on the control and service sockets.
pub const MAX_CONTROL_LINE: usize = 4096;

/// Bounded wait for a reply from the external RF control endpoint.
pub const CONTROL_TIMEOUT_MS: u64 = 900;

const DEFAULT_CONFIG_DIR: &str = "/etc/wicard";

/// All filesystem locations the engine touches. Constructed once and handed
/// to the card store; tests rebase everything under a temp directory.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Flat `interface=type` override document.
    pub type_overrides: PathBuf,
    /// Flat `interface.field=value` TX power override document.
    pub tx_overrides: PathBuf,
    /// Capability-profile catalog document.
    pub catalog: PathBuf,
    /// Root of the kernel network-class tree.
    pub net_root: PathBuf,
    /// External RF control endpoint (OpenHD).
    pub control_socket: PathBuf,
    /// Socket this service listens on.
    pub service_socket: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        let config_dir = match env::var("WICARD_CONFIG_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => PathBuf::from(DEFAULT_CONFIG_DIR),
        };
        Self {
            type_overrides: config_dir.join("type_overrides.conf"),
            tx_overrides: config_dir.join("txpower_overrides.conf"),
            catalog: config_dir.join("cards.json"),
            net_root: PathBuf::from("/sys/class/net"),
            control_socket: PathBuf::from("/run/openhd/openhd_ctrl.sock"),
            service_socket: PathBuf::from("/run/wicard/wicard.sock"),
        }
    }
}

impl Paths {
    /// Rebase every location under one directory. Used by tests.
    pub fn under(root: &Path) -> Self {
        Self {
            type_overrides: root.join("type_overrides.conf"),
            tx_overrides: root.join("txpower_overrides.conf"),
            catalog: root.join("cards.json"),
            net_root: root.join("net"),
            control_socket: root.join("openhd_ctrl.sock"),
            service_socket: root.join("wicard.sock"),
        }
    }
}
