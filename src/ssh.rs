//! Remote command execution over the system `ssh` client

use crate::{PxcError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Runs a command on a remote host and returns its stdout
#[async_trait]
pub trait RemoteShell: Send + Sync {
    async fn exec(&self, user: &str, host: &str, command: &str) -> Result<String>;
}

/// `RemoteShell` that spawns `ssh` in batch mode
///
/// Authentication relies on the caller's agent or key files; no password
/// prompt is ever shown.
#[derive(Debug, Clone)]
pub struct OpenSsh {
    program: String,
    port: u16,
    connect_timeout: Duration,
    options: Vec<String>,
}

impl OpenSsh {
    pub fn new(port: u16, connect_timeout: Duration, options: Vec<String>) -> Self {
        Self {
            program: "ssh".to_string(),
            port,
            connect_timeout,
            options,
        }
    }

    /// Use a different ssh binary
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn args(&self, user: &str, host: &str, command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
            "-p".to_string(),
            self.port.to_string(),
        ];
        for option in &self.options {
            args.push("-o".to_string());
            args.push(option.clone());
        }
        args.push(format!("{}@{}", user, host));
        args.push(command.to_string());
        args
    }
}

#[async_trait]
impl RemoteShell for OpenSsh {
    async fn exec(&self, user: &str, host: &str, command: &str) -> Result<String> {
        debug!("ssh {}@{}: {}", user, host, command);

        let output = Command::new(&self.program)
            .args(self.args(user, host, command))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PxcError::Ssh {
                host: host.to_string(),
                message: format!("failed to spawn {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PxcError::Ssh {
                host: host.to_string(),
                message: format!("`{}` exited with {}: {}", command, output.status, stderr.trim()),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| PxcError::Ssh {
            host: host.to_string(),
            message: format!("`{}` returned non-UTF-8 output", command),
        })
    }
}
