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

//! Request handling.
//!
//! Line-oriented requests: one JSON-shaped object per line, dispatched on
//! its `type` field. Three request types are understood: inventory query,
//! override update, and RF link control (relayed to the external OpenHD
//! control socket). Every handler returns a complete, newline-terminated
//! response line.

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use serde_json::{json, Map, Value};

use crate::cards::CardStore;
use crate::config::{Paths, CONTROL_TIMEOUT_MS, MAX_CONTROL_LINE};
use crate::fields;
use crate::logger::log_event;
use crate::overrides;
use crate::profiles::{normalize_chipset, normalize_id};

pub const CARDS_REQUEST: &str = "wicard.cards.request";
pub const CARDS_UPDATE: &str = "wicard.cards.update";
pub const LINK_CONTROL: &str = "wicard.link.control";

fn request_type(line: &str) -> String {
    fields::extract_string_field(line, "type").unwrap_or_default()
}

pub fn is_cards_request(line: &str) -> bool {
    request_type(line) == CARDS_REQUEST
}

pub fn is_update_request(line: &str) -> bool {
    request_type(line) == CARDS_UPDATE
}

pub fn is_link_control_request(line: &str) -> bool {
    request_type(line) == LINK_CONTROL
}

/// Full inventory reply from the current snapshot.
pub fn build_cards_response(store: &CardStore) -> String {
    let mut response = json!({
        "type": "wicard.cards.response",
        "ok": true,
        "cards": store.cards(),
    })
    .to_string();
    response.push('\n');
    response
}

fn update_response(action: &str, ok: bool, error: &str, store: &CardStore) -> String {
    let mut body = Map::new();
    body.insert(
        "type".to_string(),
        Value::from("wicard.cards.update.response"),
    );
    body.insert("ok".to_string(), Value::from(ok));
    body.insert("action".to_string(), Value::from(action));
    if ok {
        body.insert(
            "cards".to_string(),
            serde_json::to_value(store.cards()).unwrap_or(Value::Null),
        );
    } else if !error.is_empty() {
        body.insert("error".to_string(), Value::from(error));
    }
    let mut response = Value::Object(body).to_string();
    response.push('\n');
    response
}

/// Apply a `set` request's override fields to the persisted stores.
/// Returns false when a store could not be written back.
fn apply_set(paths: &Paths, line: &str, iface: &str) -> bool {
    let mut ok = true;

    if let Some(override_type) = fields::extract_string_field(line, "override_type") {
        let mut type_overrides = overrides::load_type_overrides(&paths.type_overrides);
        let trimmed = override_type.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("AUTO") {
            type_overrides.remove(iface);
        } else {
            type_overrides.insert(iface.to_string(), trimmed.to_string());
        }
        ok = overrides::write_type_overrides(&paths.type_overrides, &type_overrides) && ok;
    }

    let power_level = fields::extract_string_field(line, "power_level");
    let tx_power = fields::extract_string_field(line, "tx_power");
    let tx_power_high = fields::extract_string_field(line, "tx_power_high");
    let tx_power_low = fields::extract_string_field(line, "tx_power_low");
    let card_name = fields::extract_string_field(line, "card_name");
    let profile_vendor = fields::extract_string_field(line, "profile_vendor_id");
    let profile_device = fields::extract_string_field(line, "profile_device_id");
    let profile_chipset = fields::extract_string_field(line, "profile_chipset");

    let touches_tx_store = power_level.is_some()
        || tx_power.is_some()
        || tx_power_high.is_some()
        || tx_power_low.is_some()
        || card_name.is_some()
        || profile_vendor.is_some()
        || profile_device.is_some()
        || profile_chipset.is_some();
    if !touches_tx_store {
        return ok;
    }

    let mut tx_overrides = overrides::load_tx_overrides(&paths.tx_overrides);
    let entry = tx_overrides.entry(iface.to_string()).or_default();

    if let Some(value) = tx_power {
        entry.tx_power = value.trim().to_string();
    }
    if let Some(value) = tx_power_high {
        entry.tx_power_high = value.trim().to_string();
    }
    if let Some(value) = tx_power_low {
        entry.tx_power_low = value.trim().to_string();
    }
    if let Some(value) = card_name {
        entry.card_name = value.trim().to_string();
    }

    if let Some(level) = power_level {
        let level = level.trim().to_ascii_uppercase();
        // A selector invalidates any literal power values, including ones
        // supplied in the same request.
        entry.tx_power.clear();
        entry.tx_power_high.clear();
        entry.tx_power_low.clear();
        if level.is_empty() || level == "AUTO" {
            entry.power_level.clear();
        } else {
            entry.power_level = level;
        }
    }

    if profile_vendor.is_some() || profile_device.is_some() || profile_chipset.is_some() {
        let vendor = normalize_id(profile_vendor.as_deref().unwrap_or(""));
        let device = normalize_id(profile_device.as_deref().unwrap_or(""));
        if !vendor.is_empty() && !device.is_empty() {
            entry.profile_vendor_id = vendor;
            entry.profile_device_id = device;
            entry.profile_chipset = normalize_chipset(profile_chipset.as_deref().unwrap_or(""));
        } else {
            // A half-specified forced identity is meaningless; drop it.
            entry.profile_vendor_id.clear();
            entry.profile_device_id.clear();
            entry.profile_chipset.clear();
        }
    }

    if entry.is_empty() {
        tx_overrides.remove(iface);
    }
    overrides::write_tx_overrides(&paths.tx_overrides, &tx_overrides) && ok
}

fn apply_clear(paths: &Paths, iface: Option<&str>) -> bool {
    let mut type_overrides = overrides::load_type_overrides(&paths.type_overrides);
    let mut tx_overrides = overrides::load_tx_overrides(&paths.tx_overrides);
    match iface {
        Some(iface) => {
            type_overrides.remove(iface);
            tx_overrides.remove(iface);
        }
        None => {
            type_overrides.clear();
            tx_overrides.clear();
        }
    }
    let ok = overrides::write_type_overrides(&paths.type_overrides, &type_overrides);
    overrides::write_tx_overrides(&paths.tx_overrides, &tx_overrides) && ok
}

/// Apply an override update request and report back. A successful action
/// always triggers a full refresh, and the reply carries the fresh
/// inventory.
pub fn handle_update(store: &CardStore, line: &str) -> String {
    // A request without an action is a plain refresh.
    let action = fields::extract_string_field(line, "action")
        .unwrap_or_else(|| "refresh".to_string())
        .trim()
        .to_ascii_lowercase();
    let iface = fields::extract_string_field(line, "interface")
        .unwrap_or_default()
        .trim()
        .to_string();

    let (ok, error) = match action.as_str() {
        "set" => {
            if iface.is_empty() {
                (false, "set requires an interface")
            } else if apply_set(store.paths(), line, &iface) {
                (true, "")
            } else {
                (false, "failed to persist overrides")
            }
        }
        "clear" => {
            let target = if iface.is_empty() {
                None
            } else {
                Some(iface.as_str())
            };
            if apply_clear(store.paths(), target) {
                (true, "")
            } else {
                (false, "failed to persist overrides")
            }
        }
        "refresh" | "detect" => (true, ""),
        _ => (false, "unknown action"),
    };

    if ok {
        store.refresh();
    }
    log_event("update", json!({ "action": action, "ok": ok }));
    update_response(&action, ok, error, store)
}

/// Send one request line to the external control endpoint and read one
/// reply line, bounded by the control timeout and line cap. `None` means
/// the endpoint is unavailable or did not produce a usable reply in time.
fn send_control(socket_path: &Path, payload: &str) -> Option<String> {
    let timeout = Duration::from_millis(CONTROL_TIMEOUT_MS);
    let mut stream = UnixStream::connect(socket_path).ok()?;
    stream.set_read_timeout(Some(timeout)).ok()?;
    stream.set_write_timeout(Some(timeout)).ok()?;
    stream.write_all(payload.as_bytes()).ok()?;
    stream.write_all(b"\n").ok()?;

    let deadline = Instant::now() + timeout;
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        if Instant::now() >= deadline || line.len() >= MAX_CONTROL_LINE {
            return None;
        }
        match stream.read(&mut byte) {
            Ok(0) => return None,
            Ok(_) => {
                if byte[0] == b'\n' {
                    return String::from_utf8(line).ok();
                }
                line.push(byte[0]);
            }
            Err(_) => return None,
        }
    }
}

fn link_control_response(ok: bool, message: &str) -> String {
    let mut response = json!({
        "type": "wicard.link.control.response",
        "ok": ok,
        "message": message,
    })
    .to_string();
    response.push('\n');
    response
}

/// Relay an RF parameter change to the external control endpoint.
///
/// The request must carry at least one meaningful RF field, and a 40 MHz
/// channel width is rejected outright. The forwarded intent contains only
/// the fields the caller supplied; the endpoint's verdict is relayed back.
pub fn handle_link_control(paths: &Paths, line: &str) -> String {
    let interface = fields::extract_string_field(line, "interface").unwrap_or_default();
    let frequency_mhz = fields::extract_int_field(line, "frequency_mhz");
    let channel_width_mhz = fields::extract_int_field(line, "channel_width_mhz");
    let mcs_index = fields::extract_int_field(line, "mcs_index");
    let tx_power_mw = fields::extract_int_field(line, "tx_power_mw");
    let tx_power_index = fields::extract_int_field(line, "tx_power_index");
    let power_level = fields::extract_string_field(line, "power_level")
        .unwrap_or_default()
        .trim()
        .to_string();

    let has_value = !interface.trim().is_empty()
        || frequency_mhz.is_some()
        || channel_width_mhz.is_some()
        || mcs_index.is_some()
        || tx_power_mw.is_some()
        || tx_power_index.is_some()
        || !power_level.is_empty();
    if !has_value {
        log_event("link_control", json!({ "ok": false, "reason": "empty" }));
        return link_control_response(false, "No RF values provided.");
    }
    if channel_width_mhz == Some(40) {
        log_event("link_control", json!({ "ok": false, "reason": "width_40" }));
        return link_control_response(false, "40 MHz channel width is disabled.");
    }

    let mut intent = Map::new();
    intent.insert("type".to_string(), Value::from("openhd.link.control"));
    if !interface.trim().is_empty() {
        intent.insert("interface".to_string(), Value::from(interface.trim()));
    }
    if let Some(v) = frequency_mhz {
        intent.insert("frequency_mhz".to_string(), Value::from(v));
    }
    if let Some(v) = channel_width_mhz {
        intent.insert("channel_width_mhz".to_string(), Value::from(v));
    }
    if let Some(v) = mcs_index {
        intent.insert("mcs_index".to_string(), Value::from(v));
    }
    if let Some(v) = tx_power_mw {
        intent.insert("tx_power_mw".to_string(), Value::from(v));
    }
    if let Some(v) = tx_power_index {
        intent.insert("tx_power_index".to_string(), Value::from(v));
    }
    if !power_level.is_empty() {
        intent.insert("power_level".to_string(), Value::from(power_level));
    }

    let payload = Value::Object(intent).to_string();
    let Some(reply) = send_control(&paths.control_socket, &payload) else {
        log_event("link_control", json!({ "ok": false, "reason": "no_endpoint" }));
        return link_control_response(false, "OpenHD control socket not available.");
    };

    let ok = fields::extract_bool_field(&reply, "ok").unwrap_or(false);
    let mut message = fields::extract_string_field(&reply, "message").unwrap_or_default();
    if !ok && message.is_empty() {
        message = "OpenHD rejected the RF update.".to_string();
    }
    log_event("link_control", json!({ "ok": ok, "message": message }));
    link_control_response(ok, &message)
}

/// Dispatch one request line to its handler.
pub fn handle_request_line(store: &CardStore, line: &str) -> String {
    if is_cards_request(line) {
        build_cards_response(store)
    } else if is_update_request(line) {
        handle_update(store, line)
    } else if is_link_control_request(line) {
        handle_link_control(store.paths(), line)
    } else {
        let mut response = json!({
            "type": "wicard.error",
            "ok": false,
            "error": "unknown request type",
        })
        .to_string();
        response.push('\n');
        response
    }
}

/// Line-oriented service loop: one connection at a time, one request per
/// line, one response line per request.
pub fn serve(store: &CardStore) -> anyhow::Result<()> {
    let socket_path = &store.paths().service_socket;
    if let Some(parent) = socket_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating socket directory {}", parent.display()))?;
    }
    if socket_path.exists() {
        fs::remove_file(socket_path)
            .with_context(|| format!("removing stale socket {}", socket_path.display()))?;
    }
    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("binding {}", socket_path.display()))?;
    log_event(
        "serve_start",
        json!({ "socket": socket_path.display().to_string() }),
    );

    for stream in listener.incoming() {
        let Ok(stream) = stream else { continue };
        let Ok(read_half) = stream.try_clone() else {
            continue;
        };
        let mut writer = stream;
        let reader = BufReader::new(read_half);
        for line in reader.lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() || line.len() > MAX_CONTROL_LINE {
                continue;
            }
            let response = handle_request_line(store, line);
            if writer.write_all(response.as_bytes()).is_err() {
                break;
            }
        }
    }
    Ok(())
}
