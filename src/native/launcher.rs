use std::process::{ExitStatus, Stdio};

use tokio::{
    io::AsyncReadExt,
    process::Command,
    task::JoinHandle,
    time::{Instant, timeout},
};

use crate::core::{
    domain::{Completion, Invocation},
    traits::launcher::{LaunchError, Launcher},
};

/// Runs the tool as a real child process in its own process group.
///
/// Standard output goes straight to the invocation's log file so that the
/// log survives a timeout; standard error is captured in memory.
#[derive(Clone, Debug, Default)]
pub struct NativeLauncher;

impl NativeLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Launcher for NativeLauncher {
    #[tracing::instrument(skip_all, fields(program = %invocation.program.display()))]
    async fn launch(&self, invocation: &Invocation) -> Result<Completion, LaunchError> {
        let program = invocation.program.display().to_string();
        let log_file = tokio::fs::File::create(&invocation.log_path)
            .await
            .map_err(|e| LaunchError::LogFile {
                path: invocation.log_path.display().to_string(),
                msg: e.to_string(),
            })?
            .into_std()
            .await;

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        let start_time = Instant::now();
        let mut child = cmd.spawn().map_err(|e| LaunchError::FailedToLaunch {
            program: program.clone(),
            msg: e.to_string(),
        })?;
        // Declared after `child`, so it is dropped first: an abandoned launch
        // takes the tool's descendants down with the wrapper.
        let group = ProcessGroup::new(child.id());
        let stderr_reader = drain_stderr(&mut child);

        let waited = timeout(invocation.time_limit, child.wait()).await;
        match waited {
            Ok(status) => {
                let status = status.map_err(|e| LaunchError::Wait {
                    program: program.clone(),
                    msg: e.to_string(),
                })?;
                let execution_time_ms = start_time.elapsed().as_millis() as u64;
                // Leftover descendants would keep the stderr pipe open.
                drop(group);

                let stderr = match stderr_reader {
                    Some(reader) => reader.await.unwrap_or_default(),
                    None => String::new(),
                };
                let stdout = tokio::fs::read(&invocation.log_path)
                    .await
                    .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
                    .map_err(|e| LaunchError::LogFile {
                        path: invocation.log_path.display().to_string(),
                        msg: e.to_string(),
                    })?;

                Ok(Completion::Exited {
                    status: exit_code(status),
                    stdout,
                    stderr,
                    execution_time_ms,
                })
            }
            Err(_) => {
                tracing::debug!("time limit of {:?} reached, killing", invocation.time_limit);
                drop(group);
                if let Err(e) = child.kill().await {
                    tracing::warn!("failed to reap timed out process: {}", e);
                }
                if let Some(reader) = stderr_reader {
                    reader.abort();
                }

                Ok(Completion::TimedOut {
                    execution_time_ms: start_time.elapsed().as_millis() as u64,
                })
            }
        }
    }
}

/// Kills the whole process group of a spawned tool when dropped.
struct ProcessGroup {
    leader: Option<u32>,
}

impl ProcessGroup {
    fn new(leader: Option<u32>) -> Self {
        Self { leader }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        kill_process_group(self.leader.take());
    }
}

fn drain_stderr(child: &mut tokio::process::Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Err(e) = stderr.read_to_end(&mut buf).await {
            tracing::warn!("failed to read tool stderr: {}", e);
        }
        String::from_utf8_lossy(&buf).to_string()
    }))
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Some(pid) = pid {
        // ESRCH just means the group is already gone.
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Signal deaths are folded into `128 + signal`, as a shell would report.
#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
