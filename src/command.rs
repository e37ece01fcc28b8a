use crate::error::FilterError;
use log::debug;
use std::io::ErrorKind;
use std::process::Command;

/// Exit code a POSIX shell reports when it cannot find the program to run.
pub const EXIT_NOT_FOUND: i32 = 127;

/// What a finished child process left behind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait CommandRunner {
    /// Runs `command` to completion. A non-zero exit is not an error at this
    /// level; callers classify `ProcessOutput::code` themselves.
    fn run(
        &self,
        command: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ProcessOutput, FilterError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(
        &self,
        command: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ProcessOutput, FilterError> {
        debug!("Spawning {} with {} argument(s)", command, args.len());
        let output = match Command::new(command)
            .args(args)
            .envs(env.iter().copied())
            .output()
        {
            Ok(output) => output,
            // There is no shell in between, so mirror its "command not found" status.
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(ProcessOutput {
                    code: Some(EXIT_NOT_FOUND),
                    stdout: String::new(),
                    stderr: format!("{}: command not found", command),
                });
            }
            Err(e) => {
                return Err(FilterError::Spawn {
                    program: command.to_string(),
                    source: e,
                })
            }
        };

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
