//! Tunnels backed by `kubectl port-forward`

use super::{ServiceEndpoint, TunnelHandle, TunnelOpener};
use crate::cluster::Kubectl;
use crate::error::{CatalogError, CatalogResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::sync::oneshot;
use tracing::debug;

/// Opens tunnels by running `kubectl port-forward` to a random local port.
///
/// The kubectl child lives inside the keep-alive future and is killed when
/// that future is dropped.
pub struct KubectlPortForward {
    kubectl: Kubectl,
}

impl KubectlPortForward {
    pub fn new(kubectl: Kubectl) -> Self {
        Self { kubectl }
    }
}

#[async_trait]
impl TunnelOpener for KubectlPortForward {
    async fn open(&self, service: &ServiceEndpoint) -> CatalogResult<TunnelHandle> {
        let target = format!("service/{}", service.name);
        let ports = format!(":{}", service.port);
        let args = [
            "port-forward",
            "-n",
            service.namespace.as_str(),
            target.as_str(),
            ports.as_str(),
        ];
        debug!("Opening tunnel: kubectl {:?}", args);

        let mut child = self
            .kubectl
            .command()
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.kubectl.spawn_error(&args, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CatalogError::Internal("port-forward stdout not piped".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CatalogError::Internal("port-forward stderr not piped".to_string()))?;

        let (tx, rx) = oneshot::channel();

        let keep_alive = pump(child, stdout, stderr, tx, service.to_string());

        Ok(TunnelHandle::new(service, rx, keep_alive))
    }
}

/// Stderr lines kept as the failure reason
const STDERR_TAIL: usize = 8;

/// Drive a port-forward child until it exits, reporting readiness once.
///
/// Both pipes are read continuously so kubectl never blocks on a full
/// stderr buffer.
async fn pump(
    mut child: Child,
    stdout: ChildStdout,
    stderr: ChildStderr,
    ready: oneshot::Sender<SocketAddr>,
    service: String,
) -> CatalogResult<()> {
    let mut ready = Some(ready);
    let mut stdout_reader = BufReader::new(stdout).lines();
    let mut stderr_reader = BufReader::new(stderr).lines();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL);
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            line = stdout_reader.next_line(), if !stdout_done => {
                match line {
                    Ok(Some(line)) => {
                        debug!("port-forward: {}", line);
                        if let Some(addr) = parse_forwarding_line(&line) {
                            if let Some(tx) = ready.take() {
                                let _ = tx.send(addr);
                            }
                        }
                    }
                    _ => stdout_done = true,
                }
            }
            line = stderr_reader.next_line(), if !stderr_done => {
                match line {
                    Ok(Some(line)) => {
                        debug!("port-forward stderr: {}", line);
                        if tail.len() == STDERR_TAIL {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                    _ => stderr_done = true,
                }
            }
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| CatalogError::io("waiting for port-forward", e))?;
    let output = Vec::from(tail).join("\n");
    let reason = if output.trim().is_empty() {
        format!("kubectl port-forward exited with {}", status)
    } else {
        output.trim().to_string()
    };

    if ready.is_some() {
        Err(CatalogError::TunnelSetup { service, reason })
    } else {
        Err(CatalogError::TunnelClosed { service, reason })
    }
}

/// Extract the local address from a `Forwarding from <addr> -> <port>` line
pub fn parse_forwarding_line(line: &str) -> Option<SocketAddr> {
    let rest = line.trim().strip_prefix("Forwarding from ")?;
    let addr = rest.split_whitespace().next()?;
    addr.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{CatalogdConfig, KubectlConfig};

    #[test]
    fn parses_ipv4_forwarding_line() {
        let addr = parse_forwarding_line("Forwarding from 127.0.0.1:41234 -> 8443").unwrap();
        assert_eq!(addr, "127.0.0.1:41234".parse().unwrap());
    }

    #[test]
    fn parses_ipv6_forwarding_line() {
        let addr = parse_forwarding_line("Forwarding from [::1]:41234 -> 8443").unwrap();
        assert_eq!(addr.port(), 41234);
        assert!(addr.is_ipv6());
    }

    #[test]
    fn ignores_other_output() {
        assert!(parse_forwarding_line("Handling connection for 41234").is_none());
        assert!(parse_forwarding_line("Forwarding from nowhere -> 1").is_none());
        assert!(parse_forwarding_line("").is_none());
    }

    #[tokio::test]
    async fn missing_kubectl_fails_to_open() {
        let kubectl = Kubectl::new(
            KubectlConfig {
                binary: "/nonexistent/kubectl-for-opcat-tests".to_string(),
                ..KubectlConfig::default()
            },
            CatalogdConfig::default(),
        );
        let opener = KubectlPortForward::new(kubectl);
        let svc = ServiceEndpoint::new("ns", "svc", "https");

        let err = match opener.open(&svc).await {
            Ok(_) => panic!("expected kubectl to be missing"),
            Err(e) => e,
        };
        assert!(matches!(err, CatalogError::KubectlNotFound(_)));
    }

    /// Stand-in kubectl that floods stderr well past a pipe buffer before
    /// announcing the forward, then dies
    #[cfg(unix)]
    fn chatty_kubectl(dir: &std::path::Path) -> Kubectl {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("kubectl");
        std::fs::write(
            &script,
            concat!(
                "#!/bin/sh\n",
                "i=0\n",
                "while [ $i -lt 4000 ]; do\n",
                "  echo \"E0101 portforward.go:413] an error occurred forwarding, attempt $i\" >&2\n",
                "  i=$((i+1))\n",
                "done\n",
                "echo \"Forwarding from 127.0.0.1:41234 -> 8443\"\n",
                "echo \"error: lost connection to pod\" >&2\n",
                "exit 1\n",
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        Kubectl::new(
            KubectlConfig {
                binary: script.display().to_string(),
                ..KubectlConfig::default()
            },
            CatalogdConfig::default(),
        )
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn noisy_stderr_does_not_stall_tunnel() {
        let dir = tempfile::TempDir::new().unwrap();
        let opener = KubectlPortForward::new(chatty_kubectl(dir.path()));
        let svc = ServiceEndpoint::new("ns", "svc", "https");

        let (endpoint, keep_alive) = opener.open(&svc).await.unwrap().into_parts();
        let (addr, outcome) = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            async { tokio::join!(endpoint.wait(), keep_alive) },
        )
        .await
        .expect("port-forward stalled");

        assert_eq!(addr.unwrap(), "127.0.0.1:41234".parse().unwrap());
        match outcome {
            Err(CatalogError::TunnelClosed { reason, .. }) => {
                assert!(reason.ends_with("error: lost connection to pod"));
                assert!(reason.lines().count() <= STDERR_TAIL);
            }
            other => panic!("expected the tunnel to close, got {:?}", other.err()),
        }
    }
}
