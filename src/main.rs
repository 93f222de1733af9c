mod backup;
mod calc;
mod cipher;
mod config;
mod error;
mod gradebook;
mod ids;
mod ipc;
mod model;
mod registry;
mod store;

use std::io::{self, BufRead, Write};

use clap::Parser;
use log::{error, info};

fn main() -> anyhow::Result<()> {
    let cfg = config::Config::parse();
    cfg.init_logging();
    info!("gradebookd {} starting", env!("CARGO_PKG_VERSION"));

    let mut state = ipc::AppState::new(cfg.seed);
    if let Some(dir) = &cfg.data_dir {
        // A bad data dir is fatal at startup; later selects report errors instead.
        state.open_workspace(dir).map_err(|e| {
            error!("cannot open {}: {e}", dir.display());
            anyhow::Error::new(e)
        })?;
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{resp}");
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    info!("stdin closed, exiting");
    Ok(())
}
