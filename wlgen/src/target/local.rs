//! Local host target
//!
//! Runs workload commands on the machine wlgen itself runs on, through
//! `sh -c`. Root commands are elevated with `sudo -n` unless the process is
//! already running as root.

#![allow(unsafe_code)] // geteuid() requires unsafe

use log::debug;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::{parse_cpu_list, Target};
use crate::domain::{CpuId, TargetError};

/// Where the kernel publishes the online CPU list
const CPU_ONLINE_PATH: &str = "/sys/devices/system/cpu/online";

/// Utility script providing privileged helpers such as `cgroups_run_into`
const SHUTILS: &str = "shutils";

/// Poll interval while waiting on a command with a timeout
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Target backed by the local host.
#[derive(Debug, Clone)]
pub struct LocalTarget {
    executables_dir: PathBuf,
    working_dir: PathBuf,
    cpu_online_path: PathBuf,
}

impl LocalTarget {
    pub fn new(executables_dir: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            executables_dir: executables_dir.into(),
            working_dir: working_dir.into(),
            cpu_online_path: PathBuf::from(CPU_ONLINE_PATH),
        }
    }

    /// Read the online CPU list from `path` instead of sysfs
    #[must_use]
    pub fn with_cpu_online_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cpu_online_path = path.into();
        self
    }

    /// Build the process for `command`, elevating if requested
    fn shell(command: &str, as_root: bool) -> Command {
        if as_root && !is_root() {
            let mut cmd = Command::new("sudo");
            cmd.args(["-n", "sh", "-c", command]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        }
    }

    fn run(
        &self,
        command: &str,
        as_root: bool,
        timeout: Option<Duration>,
    ) -> Result<String, TargetError> {
        debug!("local exec (root={as_root}): {command}");

        let mut cmd = Self::shell(command, as_root);
        if self.working_dir.is_dir() {
            cmd.current_dir(&self.working_dir);
        }
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| TargetError::SpawnFailed {
            command: command.to_string(),
            error: e.to_string(),
        })?;

        let (code, stdout, stderr) = match timeout {
            None => {
                let output = child.wait_with_output()?;
                (
                    output.status.code().unwrap_or(-1),
                    String::from_utf8_lossy(&output.stdout).into_owned(),
                    String::from_utf8_lossy(&output.stderr).into_owned(),
                )
            }
            Some(limit) => wait_with_timeout(child, command, limit)?,
        };

        if code == 0 {
            Ok(stdout)
        } else {
            let output = if stderr.trim().is_empty() { stdout } else { stderr };
            Err(TargetError::CommandFailed { command: command.to_string(), code, output })
        }
    }
}

impl Target for LocalTarget {
    fn list_online_cpus(&self) -> Result<Vec<CpuId>, TargetError> {
        let content = fs::read_to_string(&self.cpu_online_path)?;
        parse_cpu_list(&content).map_err(|e| {
            TargetError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
        })
    }

    fn executables_directory(&self) -> PathBuf {
        self.executables_dir.clone()
    }

    fn working_directory(&self) -> PathBuf {
        self.working_dir.clone()
    }

    fn execute(
        &self,
        command: &str,
        as_root: bool,
        timeout: Option<Duration>,
    ) -> Result<String, TargetError> {
        self.run(command, as_root, timeout)
    }

    fn kick_off(&self, command: &str, as_root: bool) -> Result<(), TargetError> {
        debug!("local kick off (root={as_root}): {command}");

        let detached = format!("nohup {command}");
        let mut cmd = Self::shell(&detached, as_root);
        if self.working_dir.is_dir() {
            cmd.current_dir(&self.working_dir);
        }
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

        let child = cmd.spawn().map_err(|e| TargetError::SpawnFailed {
            command: command.to_string(),
            error: e.to_string(),
        })?;
        reap(child);
        Ok(())
    }

    fn execute_util(&self, command: &str) -> Result<String, TargetError> {
        let util = self.executables_dir.join(SHUTILS);
        self.run(&format!("{} {command}", util.display()), true, None)
    }

    fn pull(&self, remote: &Path, local: &Path) -> Result<(), TargetError> {
        if remote != local {
            fs::copy(remote, local)?;
        }
        Ok(())
    }
}

/// Returns true when running with effective UID 0
fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Wait for `child`, killing it once `limit` elapses.
///
/// Output pipes are drained on helper threads so a chatty command cannot
/// fill the pipe and stall before the deadline.
fn wait_with_timeout(
    mut child: Child,
    command: &str,
    limit: Duration,
) -> Result<(i32, String, String), TargetError> {
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + limit;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            child.kill()?;
            child.wait()?;
            return Err(TargetError::Timeout {
                command: command.to_string(),
                seconds: limit.as_secs_f64(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();
    Ok((status.code().unwrap_or(-1), stdout, stderr))
}

/// Wait for a detached `child` on a helper thread so it does not linger as
/// a zombie once it exits
fn reap(mut child: Child) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let pid = child.id();
        match child.wait() {
            Ok(status) => debug!("background pid {pid} exited: {status}"),
            Err(e) => debug!("background pid {pid} not reaped: {e}"),
        }
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> LocalTarget {
        LocalTarget::new("/usr/bin", std::env::temp_dir())
    }

    #[test]
    fn test_execute_captures_stdout() {
        let out = target().execute("echo hi", false, None).unwrap();
        assert_eq!(out.trim(), "hi");
    }

    #[test]
    fn test_execute_reports_exit_code() {
        let err = target().execute("echo oops >&2; exit 3", false, None).unwrap_err();
        match err {
            TargetError::CommandFailed { code, output, .. } => {
                assert_eq!(code, 3);
                assert_eq!(output.trim(), "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_execute_timeout_kills_command() {
        let start = Instant::now();
        let err = target()
            .execute("sleep 5", false, Some(Duration::from_millis(100)))
            .unwrap_err();
        assert!(matches!(err, TargetError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_execute_with_timeout_returns_output() {
        let out = target().execute("echo fast", false, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(out.trim(), "fast");
    }

    #[test]
    fn test_online_cpus_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let online = dir.path().join("online");
        fs::write(&online, "0-2,4\n").unwrap();

        let cpus = target().with_cpu_online_file(&online).list_online_cpus().unwrap();
        assert_eq!(cpus, vec![CpuId(0), CpuId(1), CpuId(2), CpuId(4)]);
    }

    #[test]
    fn test_online_cpus_sysfs() {
        let result = target().list_online_cpus();

        #[cfg(target_os = "linux")]
        {
            let cpus = result.expect("Failed to read online CPUs");
            assert!(cpus.contains(&CpuId(0)));
        }

        #[cfg(not(target_os = "linux"))]
        {
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_pull_copies_file() {
        let dir = tempfile::tempdir().unwrap();
        let remote = dir.path().join("remote.dat");
        let local = dir.path().join("local.dat");
        fs::write(&remote, b"trace").unwrap();

        target().pull(&remote, &local).unwrap();
        assert_eq!(fs::read(&local).unwrap(), b"trace");
    }

    #[test]
    fn test_kick_off_returns_immediately() {
        let start = Instant::now();
        target().kick_off("sleep 2", false).unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_background_child_is_reaped() {
        let child = Command::new("true").spawn().unwrap();
        let proc_entry = PathBuf::from(format!("/proc/{}", child.id()));

        reap(child).join().unwrap();
        assert!(!proc_entry.exists());
    }
}
