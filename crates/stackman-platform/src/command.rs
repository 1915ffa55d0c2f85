//! External command execution.
//!
//! Every shell-out goes through [`CommandRunner`] so callers can swap in a
//! dry-run or scripted runner.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::error::{PlatformError, PlatformResult};

/// A program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    secret: Vec<usize>,
    cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            secret: Vec::new(),
            cwd: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append an argument that is masked as `***` when the command is
    /// displayed or logged.
    #[must_use]
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.secret.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    /// Run the program from `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments in order.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Working directory, if set.
    #[must_use]
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }
}

impl Display for CommandSpec {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.program)?;
        for (index, arg) in self.args.iter().enumerate() {
            if self.secret.contains(&index) {
                formatter.write_str(" ***")?;
            } else {
                write!(formatter, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when terminated by a signal.
    pub status: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Successful exit with the given standard output.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed exit with the given code and standard error.
    #[must_use]
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.status, Some(0))
    }
}

/// Executes external programs.
pub trait CommandRunner: Send + Sync {
    /// Run the command and capture its output regardless of exit status.
    ///
    /// # Errors
    ///
    /// Returns an error when the program cannot be started.
    fn run(&self, spec: &CommandSpec) -> PlatformResult<CommandOutput>;

    /// Run the command and treat a non-zero exit as an error.
    ///
    /// # Errors
    ///
    /// Returns an error when the program cannot be started or exits
    /// unsuccessfully.
    fn run_checked(&self, spec: &CommandSpec) -> PlatformResult<CommandOutput> {
        let output = self.run(spec)?;
        if output.success() {
            Ok(output)
        } else {
            Err(PlatformError::CommandFailed {
                command: spec.to_string(),
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// Runner backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> PlatformResult<CommandOutput> {
        debug!(command = %spec, cwd = ?spec.cwd(), "executing command");
        let mut command = Command::new(spec.program());
        command.args(spec.arguments());
        if let Some(cwd) = spec.cwd() {
            command.current_dir(cwd);
        }
        let output = command.output().map_err(|source| PlatformError::Spawn {
            program: spec.program().to_string(),
            source,
        })?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Runner that logs each command and reports success without executing it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run(&self, spec: &CommandSpec) -> PlatformResult<CommandOutput> {
        info!(command = %spec, "dry run: command not executed");
        Ok(CommandOutput::ok(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_renders_program_and_arguments() {
        let spec = CommandSpec::new("apt-get")
            .args(["install", "-y"])
            .arg("apache2")
            .current_dir("/tmp");
        assert_eq!(spec.to_string(), "apt-get install -y apache2");
        assert_eq!(spec.cwd(), Some(Path::new("/tmp")));
    }

    #[test]
    fn secret_arguments_are_masked_but_kept() {
        let spec = CommandSpec::new("mysql")
            .arg("-e")
            .secret_arg("CREATE USER 'u'@'localhost' IDENTIFIED BY 'hunter2';");
        assert_eq!(spec.to_string(), "mysql -e ***");
        assert!(spec.arguments()[1].contains("hunter2"));
    }

    #[test]
    fn dry_run_never_fails() {
        let output = DryRunRunner.run_checked(&CommandSpec::new("definitely-not-a-binary"));
        assert!(output.is_ok_and(|output| output.success()));
    }

    #[test]
    fn run_checked_surfaces_non_zero_exit() {
        struct Failing;
        impl CommandRunner for Failing {
            fn run(&self, _spec: &CommandSpec) -> PlatformResult<CommandOutput> {
                Ok(CommandOutput::failed(2, "  no such site\n"))
            }
        }

        let err = Failing.run_checked(&CommandSpec::new("a2ensite").arg("example.org"));
        match err {
            Err(PlatformError::CommandFailed {
                command,
                status,
                stderr,
            }) => {
                assert_eq!(command, "a2ensite example.org");
                assert_eq!(status, Some(2));
                assert_eq!(stderr, "no such site");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_reports_missing_program() {
        let err = SystemRunner
            .run(&CommandSpec::new("stackman-missing-program-for-test"))
            .err();
        assert!(err.is_some_and(|err| err.is_missing_program()));
    }
}
