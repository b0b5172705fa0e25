//! `l2ping` subprocess probe
//!
//! Runs `<program> [args…] -c 1 -t <secs> <address>` and classifies the
//! result. The adapter-down check is a substring match on the tool's output,
//! which differs between BlueZ versions, so the markers are configurable.

use super::traits::PresenceProbe;
use crate::context::OpContext;
use crate::error::{AtndError, AtndResult};
use crate::registry::HardwareAddress;
use async_trait::async_trait;
use std::io;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default probe utility
pub const DEFAULT_PROGRAM: &str = "l2ping";

/// Default per-probe timeout handed to the utility
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Output emitted by l2ping when the local adapter is down
pub const DEFAULT_ADAPTER_DOWN_MARKER: &str = "No route to host";

/// Probe configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L2pingConfig {
    /// Executable to run (looked up in `$PATH` when not absolute)
    pub program: String,

    /// Arguments placed before the l2ping arguments, e.g. `["l2ping"]` with
    /// `program = "sudo"`
    pub args: Vec<String>,

    /// Timeout passed to the utility via `-t` (whole seconds, at least 1)
    pub timeout: Duration,

    /// Output substrings meaning "the adapter itself is unavailable"
    pub adapter_down_markers: Vec<String>,
}

impl Default for L2pingConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            adapter_down_markers: vec![DEFAULT_ADAPTER_DOWN_MARKER.to_string()],
        }
    }
}

/// Presence probe backed by the BlueZ `l2ping` utility
#[derive(Debug, Clone, Default)]
pub struct L2pingProbe {
    config: L2pingConfig,
}

impl L2pingProbe {
    pub fn new(config: L2pingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &L2pingConfig {
        &self.config
    }

    fn command(&self, address: &HardwareAddress) -> Command {
        let timeout_secs = self.config.timeout.as_secs().max(1);

        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg("-c")
            .arg("1")
            .arg("-t")
            .arg(timeout_secs.to_string())
            .arg(address.expose())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Map a finished run to present / absent / adapter unavailable.
    fn classify(&self, output: &Output) -> AtndResult<bool> {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let adapter_down = self
            .config
            .adapter_down_markers
            .iter()
            .filter(|m| !m.is_empty())
            .any(|m| stdout.contains(m.as_str()) || stderr.contains(m.as_str()));
        if adapter_down {
            return Err(AtndError::AdapterUnavailable);
        }

        if output.status.success() {
            return Ok(true);
        }

        debug!(status = %output.status, "probe got no answer");
        Ok(false)
    }
}

#[async_trait]
impl PresenceProbe for L2pingProbe {
    async fn ping(&self, ctx: &OpContext, address: &HardwareAddress) -> AtndResult<bool> {
        ctx.check()?;

        let child = match self.command(address).spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(AtndError::ProbeUtilityMissing(self.config.program.clone()));
            }
            Err(e) => {
                warn!(program = %self.config.program, error = %e, "failed to start probe, treating as absent");
                return Ok(false);
            }
        };

        // Dropping the wait future on cancellation drops the child, and
        // kill_on_drop terminates it.
        let output = match ctx.run(child.wait_with_output()).await? {
            Ok(output) => output,
            Err(e) => {
                warn!(program = %self.config.program, error = %e, "failed to collect probe output, treating as absent");
                return Ok(false);
            }
        };

        self.classify(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn addr() -> HardwareAddress {
        HardwareAddress::parse("01:23:45:67:89:ab").unwrap()
    }

    /// Probe running an inline shell script in place of l2ping.
    ///
    /// The script sees the l2ping arguments as "$@".
    fn script_probe(script: &str) -> L2pingProbe {
        L2pingProbe::new(L2pingConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "l2ping".to_string()],
            ..L2pingConfig::default()
        })
    }

    #[tokio::test]
    async fn test_zero_exit_is_present() {
        let probe = script_probe("echo '44 bytes from 01:23:45:67:89:ab id 0 time 12.34ms'; exit 0");
        assert!(probe.ping(&OpContext::new(), &addr()).await.unwrap());
    }

    #[tokio::test]
    async fn test_unrecognized_failure_is_absent() {
        let probe = script_probe("echo 'Can not connect: Host is down' >&2; exit 1");
        assert!(!probe.ping(&OpContext::new(), &addr()).await.unwrap());
    }

    #[tokio::test]
    async fn test_adapter_down_marker_on_stdout() {
        let probe = script_probe("echo \"Can't connect: No route to host\"; exit 1");
        let result = probe.ping(&OpContext::new(), &addr()).await;
        assert!(matches!(result, Err(AtndError::AdapterUnavailable)));
    }

    #[tokio::test]
    async fn test_adapter_down_marker_on_stderr() {
        let probe = script_probe("echo \"Can't connect: No route to host\" >&2; exit 1");
        let result = probe.ping(&OpContext::new(), &addr()).await;
        assert!(matches!(result, Err(AtndError::AdapterUnavailable)));
    }

    #[tokio::test]
    async fn test_custom_marker() {
        let mut config = script_probe("echo 'hci0: adapter powered off'; exit 1").config;
        config.adapter_down_markers = vec!["powered off".to_string()];
        let probe = L2pingProbe::new(config);

        let result = probe.ping(&OpContext::new(), &addr()).await;
        assert!(matches!(result, Err(AtndError::AdapterUnavailable)));
    }

    #[tokio::test]
    async fn test_arguments_passed_to_utility() {
        // Present only if invoked exactly as `-c 1 -t 5 <address>`
        let probe = script_probe(
            "[ \"$1\" = -c ] && [ \"$2\" = 1 ] && [ \"$3\" = -t ] && [ \"$4\" = 5 ] && [ \"$5\" = 01:23:45:67:89:ab ]",
        );
        assert!(probe.ping(&OpContext::new(), &addr()).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_utility() {
        let probe = L2pingProbe::new(L2pingConfig {
            program: "/nonexistent/atnd-test/l2ping".to_string(),
            ..L2pingConfig::default()
        });

        let result = probe.ping(&OpContext::new(), &addr()).await;
        assert!(matches!(
            result,
            Err(AtndError::ProbeUtilityMissing(program)) if program == "/nonexistent/atnd-test/l2ping"
        ));
    }

    #[tokio::test]
    async fn test_deadline_kills_slow_probe() {
        let probe = script_probe("sleep 30");
        let ctx = OpContext::with_timeout(Duration::from_millis(100));

        let started = Instant::now();
        let result = probe.ping(&ctx, &addr()).await;

        assert!(matches!(result, Err(AtndError::DeadlineExceeded)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancel_stops_probe() {
        let probe = script_probe("sleep 30");
        let ctx = OpContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let result = probe.ping(&ctx, &addr()).await;
        assert!(matches!(result, Err(AtndError::Cancelled)));
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_spawn() {
        // Would report present if it ever ran
        let probe = script_probe("exit 0");
        let ctx = OpContext::new();
        ctx.cancel();

        let result = probe.ping(&ctx, &addr()).await;
        assert!(matches!(result, Err(AtndError::Cancelled)));
    }
}
