//! hddtemp daemon client.
//!
//! The daemon (`hddtemp --daemon --listen=127.0.0.1`) writes one
//! `|dev|model|temp|unit|` record per drive and closes the connection.

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};

use chronus_core::error::{ChronusError, Result};

use super::HddReading;

/// Read the full daemon reply within `limit` and at most `max_bytes`.
pub async fn fetch(addr: &str, limit: Duration, max_bytes: usize) -> Result<String> {
    let deadline = Instant::now() + limit;
    let timed_out = || ChronusError::Timeout {
        what: format!("hddtemp {addr}"),
        after_ms: limit.as_millis() as u64,
    };

    let mut stream = timeout_at(deadline, TcpStream::connect(addr))
        .await
        .map_err(|_| timed_out())?
        .map_err(|e| ChronusError::Collaborator(format!("hddtemp connect {addr}: {e}")))?;

    let mut buf = BytesMut::with_capacity(1024);
    loop {
        let n = timeout_at(deadline, stream.read_buf(&mut buf))
            .await
            .map_err(|_| timed_out())??;
        if n == 0 {
            break;
        }
        if buf.len() > max_bytes {
            return Err(ChronusError::Collaborator(format!(
                "hddtemp reply exceeds {max_bytes} bytes"
            )));
        }
    }

    String::from_utf8(buf.to_vec())
        .map_err(|e| ChronusError::Collaborator(format!("hddtemp reply is not utf-8: {e}")))
}

/// Parse a daemon reply. Drives reporting no number (`SLP`, `NA`, `UNK`) are
/// left out.
pub fn parse(reply: &str) -> Vec<HddReading> {
    let fields: Vec<&str> = reply.split('|').skip(1).collect();
    fields
        .chunks_exact(5)
        .filter_map(|rec| {
            let celsius = rec[2].trim().parse::<f64>().ok()?;
            Some(HddReading {
                device: rec[0].trim().to_string(),
                label: rec[1].trim().to_string(),
                celsius: if rec[3].trim() == "F" {
                    (celsius - 32.0) * 5.0 / 9.0
                } else {
                    celsius
                },
            })
        })
        .collect()
}
