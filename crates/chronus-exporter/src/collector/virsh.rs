//! Hypervisor collaborator backed by the `virsh` CLI.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Local, NaiveDateTime, TimeZone};
use serde::Deserialize;
use serde_json::json;
use tokio::time::{sleep, timeout};

use chronus_core::error::{ChronusError, Result};

use crate::config::VirtSection;
use crate::probe::run_command;

/// Delay between two `guest-exec-status` polls.
const GUEST_EXEC_POLL: Duration = Duration::from_millis(100);

/// Cumulative guest CPU time in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DomainCpuStats {
    pub cpu_time: f64,
    pub user_time: f64,
    pub system_time: f64,
}

/// Read-only view of a hypervisor.
#[async_trait]
pub trait Hypervisor: Send + Sync {
    /// Names of all defined domains, running or not.
    async fn domains(&self) -> Result<Vec<String>>;
    async fn is_active(&self, domain: &str) -> Result<bool>;
    async fn cpu_stats(&self, domain: &str) -> Result<DomainCpuStats>;
    async fn max_vcpus(&self, domain: &str) -> Result<u32>;
    /// Guest boot time (seconds since the epoch) via the guest agent.
    async fn guest_boot_time(&self, domain: &str) -> Result<i64>;
}

pub struct Virsh {
    program: String,
    uri: String,
    call_timeout: Duration,
}

impl Virsh {
    pub fn new(cfg: &VirtSection, call_timeout: Duration) -> Self {
        Self {
            program: cfg.virsh.clone(),
            uri: cfg.uri.clone(),
            call_timeout,
        }
    }

    async fn virsh(&self, args: &[&str]) -> Result<String> {
        let mut full = vec!["-c", self.uri.as_str()];
        full.extend_from_slice(args);
        run_command(&self.program, &full, self.call_timeout).await
    }

    async fn agent(&self, domain: &str, command: &serde_json::Value) -> Result<String> {
        let command = command.to_string();
        self.virsh(&["qemu-agent-command", domain, &command]).await
    }

    async fn guest_exec(&self, domain: &str, path: &str, args: &[&str]) -> Result<Vec<u8>> {
        let started = self
            .agent(
                domain,
                &json!({
                    "execute": "guest-exec",
                    "arguments": { "path": path, "arg": args, "capture-output": true }
                }),
            )
            .await?;
        let pid = parse_guest_exec_pid(&started)?;

        let status = json!({ "execute": "guest-exec-status", "arguments": { "pid": pid } });
        let poll = async {
            loop {
                let reply = self.agent(domain, &status).await?;
                if let Some(out) = parse_guest_exec_status(&reply)? {
                    return Ok::<_, ChronusError>(out);
                }
                sleep(GUEST_EXEC_POLL).await;
            }
        };
        timeout(self.call_timeout, poll)
            .await
            .map_err(|_| ChronusError::Timeout {
                what: format!("guest-exec {path} on {domain}"),
                after_ms: self.call_timeout.as_millis() as u64,
            })?
    }
}

#[async_trait]
impl Hypervisor for Virsh {
    async fn domains(&self) -> Result<Vec<String>> {
        Ok(parse_domain_list(&self.virsh(&["list", "--all", "--name"]).await?))
    }

    async fn is_active(&self, domain: &str) -> Result<bool> {
        let state = self.virsh(&["domstate", domain]).await?;
        Ok(matches!(state.trim(), "running" | "paused" | "idle" | "in shutdown"))
    }

    async fn cpu_stats(&self, domain: &str) -> Result<DomainCpuStats> {
        parse_cpu_stats(&self.virsh(&["cpu-stats", domain, "--total"]).await?)
    }

    async fn max_vcpus(&self, domain: &str) -> Result<u32> {
        let out = self.virsh(&["vcpucount", domain, "--maximum", "--live"]).await?;
        out.trim()
            .parse()
            .map_err(|e| ChronusError::Collaborator(format!("bad vcpucount {out:?}: {e}")))
    }

    async fn guest_boot_time(&self, domain: &str) -> Result<i64> {
        let out = self.guest_exec(domain, "uptime", &["-s"]).await?;
        parse_uptime_since(&String::from_utf8_lossy(&out))
    }
}

pub fn parse_domain_list(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `virsh cpu-stats --total`:
///
/// ```text
/// Total:
///         cpu_time        123.456789 seconds
///         user_time        12.340000 seconds
///         system_time      45.670000 seconds
/// ```
pub fn parse_cpu_stats(s: &str) -> Result<DomainCpuStats> {
    let mut stats = DomainCpuStats::default();
    let mut seen = false;
    for line in s.lines() {
        let mut cols = line.split_whitespace();
        let (Some(key), Some(value)) = (cols.next(), cols.next()) else {
            continue;
        };
        let Ok(value) = value.parse::<f64>() else {
            continue;
        };
        match key {
            "cpu_time" => stats.cpu_time = value,
            "user_time" => stats.user_time = value,
            "system_time" => stats.system_time = value,
            _ => continue,
        }
        seen = true;
    }
    if !seen {
        return Err(ChronusError::Collaborator(format!(
            "no cpu stats in virsh output: {s:?}"
        )));
    }
    Ok(stats)
}

#[derive(Deserialize)]
struct AgentReply<T> {
    #[serde(rename = "return")]
    ret: T,
}

#[derive(Deserialize)]
struct ExecStarted {
    pid: i64,
}

#[derive(Deserialize)]
struct ExecStatus {
    exited: bool,
    #[serde(rename = "out-data", default)]
    out_data: Option<String>,
}

fn agent_reply<'a, T: Deserialize<'a>>(s: &'a str) -> Result<T> {
    serde_json::from_str::<AgentReply<T>>(s.trim())
        .map(|r| r.ret)
        .map_err(|e| ChronusError::Collaborator(format!("bad guest agent reply: {e}")))
}

pub fn parse_guest_exec_pid(s: &str) -> Result<i64> {
    agent_reply::<ExecStarted>(s).map(|r| r.pid)
}

/// `Some(stdout)` once the guest process has exited.
pub fn parse_guest_exec_status(s: &str) -> Result<Option<Vec<u8>>> {
    let status: ExecStatus = agent_reply(s)?;
    if !status.exited {
        return Ok(None);
    }
    let data = status.out_data.unwrap_or_default();
    STANDARD
        .decode(data.trim())
        .map(Some)
        .map_err(|e| ChronusError::Collaborator(format!("bad guest-exec out-data: {e}")))
}

/// `uptime -s` prints the boot time in the guest's local time.
pub fn parse_uptime_since(s: &str) -> Result<i64> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S")
        .map_err(|e| ChronusError::Collaborator(format!("bad uptime -s output {s:?}: {e}")))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.timestamp())
        .ok_or_else(|| ChronusError::Collaborator(format!("ambiguous local time {s:?}")))
}
