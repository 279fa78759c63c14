//! Round-trip latency via the system `ping` utility.

use std::time::Duration;

use chronus_core::error::{ChronusError, Result};

use super::run_command;

/// Echo requests per target.
pub const PING_COUNT: u32 = 3;

pub async fn average_rtt_ms(target: &str, limit: Duration) -> Result<f64> {
    let count = PING_COUNT.to_string();
    // let ping give up on its own before the hard kill
    let deadline = limit.as_secs().max(1).to_string();
    let out = run_command(
        "ping",
        &["-n", "-q", "-c", &count, "-w", &deadline, target],
        limit,
    )
    .await?;
    parse_summary(&out)
        .ok_or_else(|| ChronusError::Collaborator(format!("ping {target}: no rtt summary")))
}

/// Extract the average from `rtt min/avg/max/mdev = 0.04/0.05/0.06/0.01 ms`
/// (or the BSD `round-trip` spelling).
pub fn parse_summary(s: &str) -> Option<f64> {
    let line = s.lines().find(|l| l.contains("min/avg/max"))?;
    let (_, values) = line.split_once('=')?;
    values.trim().split('/').nth(1)?.trim().parse().ok()
}
