//! Sentinel emission.
//!
//! Stdout belongs to the control protocol: every status the worker
//! reports is a single line written here. The probe payload block is
//! written under one stdout lock so a concurrently completing watcher
//! task cannot interleave a line into the JSON document.

use std::io::Write;

use squash_models::{protocol, ProbeResult};

/// Write one sentinel line to stdout.
pub fn emit(line: &str) {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let _ = writeln!(out, "{line}");
    let _ = out.flush();
}

/// Write the bracketed probe payload block to stdout.
pub fn emit_probe_data(probe: &ProbeResult) {
    let payload = match serde_json::to_string(probe) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize probe result");
            emit(protocol::PROBE_FAILED);
            return;
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let _ = writeln!(out, "{}", protocol::START_PROBE_DATA);
    let _ = writeln!(out, "{payload}");
    let _ = writeln!(out, "{}", protocol::END_PROBE_DATA);
    let _ = out.flush();
}
