//! Runs a rendered script through an external interpreter.
//!
//! Rendered scripts carry parameter values inline and nothing is escaped for
//! the shell, so a value containing shell syntax is executed as such. Every
//! parameter is also exported as `CREDSCRIPT_<KEY>`; templates that quote
//! `"$CREDSCRIPT_PASSWORD"` avoid the problem.

use crate::constants;
use crate::error::{Error, Result};
use crate::models::params::Parameters;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub shell: PathBuf,
    /// `None` disables the bound.
    pub timeout: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            shell: PathBuf::from(constants::DEFAULT_SHELL),
            timeout: Some(Duration::from_millis(constants::DEFAULT_TIMEOUT_MS)),
        }
    }
}

/// One script invocation.
#[derive(Debug, Clone, Copy)]
pub struct ScriptRun<'a> {
    /// Lifecycle action, used in errors and logs.
    pub action: &'a str,
    /// Unrendered statements, embedded in errors instead of the rendered text.
    pub template: &'a str,
    pub rendered: &'a str,
    pub env: &'a Parameters,
}

#[derive(Debug, Clone)]
pub struct ScriptOutput {
    pub status: ExitStatus,
    /// Stdout and stderr interleaved in arrival order.
    pub output: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptExecutor {
    config: ExecutorConfig,
}

enum Outcome {
    Finished(io::Result<(ExitStatus, Vec<u8>)>),
    TimedOut,
    Cancelled,
}

impl ScriptExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub async fn execute(
        &self,
        run: ScriptRun<'_>,
        cancel: &CancellationToken,
    ) -> Result<ScriptOutput> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                action: run.action.to_string(),
            });
        }

        let mut cmd = Command::new(&self.config.shell);
        cmd.arg("-c")
            .arg(run.rendered)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        for (name, (_, value)) in env_vars(run.env) {
            cmd.env(name, value);
        }

        debug!(
            action = run.action,
            shell = %self.config.shell.display(),
            "spawning script"
        );
        let mut child = cmd
            .spawn()
            .map_err(|e| execution_error(&run, "failed to start", &e))?;

        let outcome = {
            let finished = wait_with_output(&mut child);
            tokio::select! {
                res = finished => Outcome::Finished(res),
                _ = sleep_or_pending(self.config.timeout) => Outcome::TimedOut,
                _ = cancel.cancelled() => Outcome::Cancelled,
            }
        };

        match outcome {
            Outcome::Finished(Ok((status, bytes))) => {
                let output = String::from_utf8_lossy(&bytes).into_owned();
                if status.success() {
                    Ok(ScriptOutput { status, output })
                } else {
                    Err(Error::ScriptExecution {
                        action: run.action.to_string(),
                        script: run.template.to_string(),
                        status: status.to_string(),
                        output,
                    })
                }
            }
            Outcome::Finished(Err(e)) => {
                terminate(&mut child).await;
                Err(execution_error(&run, "io error", &e))
            }
            Outcome::TimedOut => {
                warn!(action = run.action, "script timed out, killing");
                terminate(&mut child).await;
                Err(Error::ScriptTimeout {
                    action: run.action.to_string(),
                    timeout: self.config.timeout.unwrap_or_default(),
                })
            }
            Outcome::Cancelled => {
                warn!(action = run.action, "script cancelled, killing");
                terminate(&mut child).await;
                Err(Error::Cancelled {
                    action: run.action.to_string(),
                })
            }
        }
    }
}

/// Launch and pipe failures carry the template like a failed run does.
fn execution_error(run: &ScriptRun<'_>, status: &str, err: &io::Error) -> Error {
    Error::ScriptExecution {
        action: run.action.to_string(),
        script: run.template.to_string(),
        status: status.to_string(),
        output: err.to_string(),
    }
}

async fn wait_with_output(child: &mut Child) -> io::Result<(ExitStatus, Vec<u8>)> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stdout not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stderr not captured"))?;

    let combined = Mutex::new(Vec::new());
    let (out, err) = tokio::join!(pump(stdout, &combined), pump(stderr, &combined));
    out?;
    err?;
    let status = child.wait().await?;
    let bytes = combined.into_inner().unwrap_or_else(|e| e.into_inner());
    Ok((status, bytes))
}

async fn pump<R: AsyncRead + Unpin>(mut reader: R, combined: &Mutex<Vec<u8>>) -> io::Result<()> {
    let mut buf = [0u8; 4096];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        combined
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(&buf[..n]);
    }
}

async fn sleep_or_pending(timeout: Option<Duration>) {
    match timeout {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

/// Kill the script and everything it started, then reap it.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;
        if let Ok(pgid) = i32::try_from(pid) {
            let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
        }
    }
    if let Err(e) = child.kill().await {
        debug!(error = %e, "kill after termination");
    }
}

/// Environment variables for `params`, keyed by variable name. When two
/// keys map to the same name the later key (in key order) wins, with a
/// warning.
fn env_vars(params: &Parameters) -> BTreeMap<String, (&str, &str)> {
    let mut vars: BTreeMap<String, (&str, &str)> = BTreeMap::new();
    for (key, value) in params.iter() {
        let Some(name) = env_name(key) else {
            continue;
        };
        if let Some((previous, _)) = vars.insert(name.clone(), (key, value)) {
            warn!(
                variable = %name,
                shadowed = previous,
                key,
                "parameters collide on one environment variable"
            );
        }
    }
    vars
}

/// `CREDSCRIPT_<KEY>` with the key upper-cased and non-alphanumerics as `_`.
pub fn env_name(key: &str) -> Option<String> {
    if key.is_empty() {
        return None;
    }
    let suffix: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    Some(format!("{}{}", constants::ENV_PARAM_PREFIX, suffix))
}
