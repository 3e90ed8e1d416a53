//! External command lines and the runners that execute them.

use std::collections::HashMap;
use std::fmt;
use std::process::Command;

use parking_lot::Mutex;

use nettopo_common::{NetTopoError, NetTopoResult};

use crate::config::DriverConfig;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandLine {
    /// Program to execute.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
}

impl CommandLine {
    /// Create a command line.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// An `ip` invocation through the configured `ip` command.
    #[must_use]
    pub fn ip(config: &DriverConfig, args: &[&str]) -> Self {
        Self::with_prefix(&config.ip_command, args)
    }

    /// A module probe through the configured `modinfo` command.
    #[must_use]
    pub fn modinfo(config: &DriverConfig, module: &str) -> Self {
        Self::with_prefix(&config.modinfo_command, &[module])
    }

    fn with_prefix(prefix: &[String], args: &[&str]) -> Self {
        let (program, leading) = prefix.split_first().map_or(("", &[][..]), |(p, rest)| {
            (p.as_str(), rest)
        });
        Self {
            program: program.to_string(),
            args: leading
                .iter()
                .cloned()
                .chain(args.iter().map(ToString::to_string))
                .collect(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Executes command lines on behalf of the driver.
pub trait CommandRunner {
    /// Run a command, succeeding iff it exits successfully.
    fn run(&self, command: &CommandLine) -> NetTopoResult<()>;

    /// Run a command and return its standard output.
    fn output(&self, command: &CommandLine) -> NetTopoResult<String>;

    /// Run a command up to `attempts` times until it succeeds.
    ///
    /// Each attempt re-issues the identical command with no delay. The error
    /// of the final attempt is returned.
    fn run_with_retry(&self, attempts: u32, command: &CommandLine) -> NetTopoResult<()> {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.run(command) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    tracing::warn!(%command, attempt, attempts, error = %e, "Command failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Runs commands as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    fn execute(command: &CommandLine) -> NetTopoResult<std::process::Output> {
        tracing::debug!(%command, "Executing");
        let output = Command::new(&command.program)
            .args(&command.args)
            .output()
            .map_err(|source| NetTopoError::CommandSpawn {
                command: command.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(NetTopoError::CommandFailed {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &CommandLine) -> NetTopoResult<()> {
        Self::execute(command).map(|_| ())
    }

    fn output(&self, command: &CommandLine) -> NetTopoResult<String> {
        let output = Self::execute(command)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[derive(Debug)]
struct Failure {
    pattern: String,
    remaining: Option<u32>,
}

/// Records commands instead of executing them.
///
/// Used for dry-run planning and tests. Commands can be scripted to fail,
/// and `output` answers from canned text.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    issued: Mutex<Vec<CommandLine>>,
    failures: Mutex<Vec<Failure>>,
    outputs: Mutex<HashMap<String, String>>,
}

impl RecordingRunner {
    /// Create a runner where every command succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` commands whose text contains `pattern`.
    #[must_use]
    pub fn fail_times(self, pattern: impl Into<String>, times: u32) -> Self {
        self.failures.lock().push(Failure {
            pattern: pattern.into(),
            remaining: Some(times),
        });
        self
    }

    /// Fail every command whose text contains `pattern`.
    #[must_use]
    pub fn fail_always(self, pattern: impl Into<String>) -> Self {
        self.failures.lock().push(Failure {
            pattern: pattern.into(),
            remaining: None,
        });
        self
    }

    /// Answer `output` for the exact command text with `stdout`.
    #[must_use]
    pub fn with_output(self, command: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.outputs.lock().insert(command.into(), stdout.into());
        self
    }

    /// Every command issued so far, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<CommandLine> {
        self.issued.lock().clone()
    }

    /// Every command issued so far, rendered as text.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.issued.lock().iter().map(ToString::to_string).collect()
    }

    /// Forget the issued commands.
    pub fn clear(&self) {
        self.issued.lock().clear();
    }

    fn record(&self, command: &CommandLine) -> NetTopoResult<()> {
        self.issued.lock().push(command.clone());
        let text = command.to_string();
        let mut failures = self.failures.lock();
        let hit = failures.iter_mut().find(|f| {
            text.contains(&f.pattern) && f.remaining.is_none_or(|remaining| remaining > 0)
        });
        match hit {
            Some(failure) => {
                if let Some(remaining) = failure.remaining.as_mut() {
                    *remaining -= 1;
                }
                Err(NetTopoError::CommandFailed {
                    command: text,
                    status: "exit status: 2".to_string(),
                    stderr: "scripted failure".to_string(),
                })
            }
            None => Ok(()),
        }
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &CommandLine) -> NetTopoResult<()> {
        self.record(command)
    }

    fn output(&self, command: &CommandLine) -> NetTopoResult<String> {
        self.record(command)?;
        let text = command.to_string();
        self.outputs
            .lock()
            .get(&text)
            .cloned()
            .ok_or_else(|| NetTopoError::CommandFailed {
                command: text.clone(),
                status: "exit status: 1".to_string(),
                stderr: "no output recorded".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_prefix() {
        let config = DriverConfig::default().with_ip_command(["goes", "ip"]);
        let cmd = CommandLine::ip(&config, &["netns", "add", "h1"]);
        assert_eq!(cmd.program, "goes");
        assert_eq!(cmd.to_string(), "goes ip netns add h1");

        let cmd = CommandLine::ip(&DriverConfig::default(), &["link", "set", "eth1", "up"]);
        assert_eq!(cmd.to_string(), "ip link set eth1 up");
    }

    #[test]
    fn retry_until_success() {
        let runner = RecordingRunner::new().fail_times("netns h1", 2);
        let cmd = CommandLine::new("ip", ["link", "set", "eth1", "up", "netns", "h1"]);
        runner.run_with_retry(3, &cmd).unwrap();
        assert_eq!(runner.commands().len(), 3);
    }

    #[test]
    fn retry_exhausted() {
        let runner = RecordingRunner::new().fail_always("address add");
        let cmd = CommandLine::new("ip", ["address", "add", "10.0.0.1/24", "dev", "eth1"]);
        let err = runner.run_with_retry(3, &cmd).unwrap_err();
        assert!(matches!(err, NetTopoError::CommandFailed { .. }));
        assert_eq!(runner.commands().len(), 3);
    }

    #[test]
    fn canned_output() {
        let runner = RecordingRunner::new().with_output("modinfo xeth", "depends: \n");
        let out = runner
            .output(&CommandLine::new("modinfo", ["xeth"]))
            .unwrap();
        assert_eq!(out, "depends: \n");
        assert!(runner.output(&CommandLine::new("modinfo", ["other"])).is_err());
    }

    #[test]
    fn process_runner_reports_spawn_failure() {
        let err = ProcessRunner
            .run(&CommandLine::new("/nonexistent/nettopo-ip", ["link"]))
            .unwrap_err();
        assert!(matches!(err, NetTopoError::CommandSpawn { .. }));
    }

    #[test]
    fn process_runner_captures_stdout() {
        let out = ProcessRunner
            .output(&CommandLine::new("echo", ["depends:", "xeth"]))
            .unwrap();
        assert_eq!(out.trim(), "depends: xeth");
        assert!(ProcessRunner.run(&CommandLine::new("false", Vec::<String>::new())).is_err());
    }
}
