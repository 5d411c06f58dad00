//! Parent process supervision
//!
//! When launched by a Terraform provider the endpoint must not outlive it.

use log::info;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Whether process `pid` is still alive
#[cfg(target_os = "linux")]
pub fn is_alive(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(not(target_os = "linux"))]
pub fn is_alive(_pid: u32) -> bool {
    true
}

/// Resolves once `pid` has exited
pub async fn wait_for_exit(pid: u32) {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        ticker.tick().await;
        if !is_alive(pid) {
            info!("Parent process {} exited", pid);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_process_is_alive() {
        assert!(is_alive(std::process::id()));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_unused_pid_is_dead() {
        // above the default pid_max
        assert!(!is_alive(u32::MAX - 1));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_wait_for_exit_returns_for_reaped_child() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();

        tokio::time::timeout(Duration::from_secs(10), wait_for_exit(pid))
            .await
            .expect("wait_for_exit resolves");
    }
}
