use std::{
    io::Read,
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
    thread::{self, sleep},
    time::{Duration, Instant},
};

use log::trace;

use crate::{ControllerError, Result};

pub mod utils;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs `adb` as a child process against one device serial.
///
/// Every invocation is bounded by `timeout`; a command that overruns it is
/// killed and reported as [`ControllerError::Timeout`].
#[derive(Debug, Clone)]
pub struct Adb {
    program: PathBuf,
    serial: String,
    timeout: Duration,
}

impl Adb {
    pub fn new(program: impl AsRef<Path>, serial: impl AsRef<str>, timeout: Duration) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            serial: serial.as_ref().to_string(),
            timeout,
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// `adb <args>`, not bound to a device (e.g. `connect`, `devices`)
    pub fn execute_host_command(&self, args: &[&str]) -> Result<Vec<u8>> {
        self.run(args)
    }

    /// `adb -s <serial> <args>`
    pub fn execute_command(&self, args: &[&str]) -> Result<Vec<u8>> {
        let mut full = vec!["-s", self.serial.as_str()];
        full.extend_from_slice(args);
        self.run(&full)
    }

    /// `adb -s <serial> shell <command>`, stdout decoded lossily
    pub fn shell(&self, command: &str) -> Result<String> {
        let mut args = vec!["shell"];
        args.extend(command.split_whitespace());
        let stdout = self.execute_command(&args)?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        let command = format!("{} {}", self.program.display(), args.join(" "));
        trace!("executing `{command}`...");

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| ControllerError::Command {
                command: command.clone(),
                reason: err.to_string(),
            })?;

        // drain the pipes while waiting, screencap output does not fit in a pipe buffer
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_reader = thread::spawn(move || read_to_end(stdout));
        let stderr_reader = thread::spawn(move || read_to_end(stderr));

        let status = match self.wait(&mut child)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ControllerError::Timeout {
                    command,
                    timeout: self.timeout,
                });
            }
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(ControllerError::Command {
                command,
                reason: format!("exited with {status}: {}", stderr.trim()),
            });
        }
        trace!("`{command}` returned {} bytes", stdout.len());
        Ok(stdout)
    }

    /// `None` if the deadline passed before the child exited
    fn wait(&self, child: &mut std::process::Child) -> Result<Option<ExitStatus>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(POLL_INTERVAL);
        }
    }
}

fn read_to_end(source: Option<impl Read>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut source) = source {
        let _ = source.read_to_end(&mut buf);
    }
    buf
}
