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

use serde_json::json;

use wicard::cards::CardStore;
use wicard::config::Paths;
use wicard::logger::{init_logging, log_event};
use wicard::service;

fn print_usage() {
    println!("wicard - Wi-Fi card inventory and TX power profiles");
    println!();
    println!("Usage: wicard [list] [--serve] [--logging]");
    println!();
    println!("  list       print the current card inventory (default)");
    println!("  --serve    run the control service (requires root)");
    println!("  --logging  append JSON events to the log file");
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }
    if args.iter().any(|a| a == "--logging") {
        init_logging();
    }
    log_event("startup", json!({ "args": args }));

    let store = CardStore::new(Paths::default());

    if args.iter().any(|a| a == "--serve") {
        if unsafe { libc::geteuid() } != 0 {
            anyhow::bail!("--serve requires root privileges");
        }
        store.refresh();
        if let Err(e) = service::serve(&store) {
            log_event("fatal_error", json!({ "error": e.to_string() }));
            return Err(e);
        }
        return Ok(());
    }

    // Default action: one detection pass, inventory on stdout.
    store.refresh();
    print!("{}", service::build_cards_response(&store));
    Ok(())
}
