//! Shared context, error types, and confirmation prompts for the CLI.

use std::fmt::{self, Display, Formatter, Write as _};
use std::io::{self, BufRead, Write};

use stackman_config::ConfigError;
use stackman_platform::PlatformError;
use stackman_stack::{StackError, StackManager};

use crate::cli::OutputFormat;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
    Declined,
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
            Self::Declined => 130,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
            Self::Declined => "aborted by operator".to_string(),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<StackError> for CliError {
    fn from(err: StackError) -> Self {
        let message = describe_stack_error(&err);
        match err {
            StackError::Validation { .. } | StackError::Config { .. } => Self::Validation(message),
            other => {
                tracing::debug!(error = ?other, "command failed");
                Self::Failure(anyhow::anyhow!(message))
            }
        }
    }
}

/// Render a stack error with the context carried in its fields.
pub(crate) fn describe_stack_error(err: &StackError) -> String {
    match err {
        StackError::Validation { errors } => {
            let mut message = String::from("validation failed:");
            for problem in errors {
                let _ = write!(message, "\n  - {problem}");
            }
            message
        }
        StackError::Config { source } => describe_config_error(source),
        StackError::Platform { operation, source } => {
            format!("{operation}: {}", describe_platform_error(source))
        }
        StackError::Io {
            operation,
            path,
            source,
        } => format!("{operation}: {}: {source}", path.display()),
        StackError::VhostNotFound { site, path } => format!(
            "virtual host for site '{site}' not found at {}",
            path.display()
        ),
        StackError::PhpHandlerNotFound { path } => format!(
            "no PHP-FPM SetHandler directive found in {}",
            path.display()
        ),
        StackError::Snapshot { source } => format!("snapshot directory could not be read: {source}"),
        StackError::RegexCompile { pattern, .. } => format!("invalid built-in pattern {pattern}"),
        StackError::BackupUnavailable { operation, root } => format!(
            "{operation} refused: backup directory {} is unusable and rollback.strict is enabled",
            root.display()
        ),
        StackError::RolledBack {
            operation_id,
            source,
            report,
        } => {
            let mut message = format!(
                "{operation_id} failed: {}; restored {} path(s)",
                describe_stack_error(source),
                report.restored.len()
            );
            for failure in &report.failed {
                let _ = write!(
                    message,
                    "\n  MANUAL INTERVENTION REQUIRED: restore {} from {}",
                    failure.original.display(),
                    failure.backup.display()
                );
            }
            message
        }
    }
}

fn describe_platform_error(err: &PlatformError) -> String {
    match err {
        PlatformError::Spawn { program, source } => format!("cannot run {program}: {source}"),
        PlatformError::CommandFailed {
            command,
            status,
            stderr,
        } => {
            let code = status.map_or_else(|| "signal".to_string(), |code| code.to_string());
            let stderr = stderr.trim();
            if stderr.is_empty() {
                format!("`{command}` exited with {code}")
            } else {
                format!("`{command}` exited with {code}: {stderr}")
            }
        }
        PlatformError::OsRelease { path, source } => {
            format!("cannot read {}: {source}", path.display())
        }
        PlatformError::UnsupportedDistribution { id } => {
            format!("unsupported distribution '{id}'; expected a Debian or Red Hat family host")
        }
        PlatformError::InvalidServiceAction { action } => {
            format!("invalid service action '{action}'")
        }
    }
}

fn describe_config_error(err: &ConfigError) -> String {
    match err {
        ConfigError::Read { path, source } => {
            format!("cannot read configuration {}: {source}", path.display())
        }
        ConfigError::Parse { origin, source } => {
            format!("invalid configuration in {origin}: {source}")
        }
        ConfigError::InvalidRoot { origin } => {
            format!("configuration root in {origin} must be a mapping")
        }
        ConfigError::MissingKey { key } => format!("missing configuration key {key}"),
        ConfigError::InvalidValue { key, expected } => {
            format!("configuration key {key} must be {expected}")
        }
    }
}

/// Application context passed to command handlers.
pub(crate) struct AppContext {
    pub(crate) manager: StackManager,
    pub(crate) output: OutputFormat,
    pub(crate) assume_yes: bool,
}

impl AppContext {
    pub(crate) const fn new(manager: StackManager, output: OutputFormat, assume_yes: bool) -> Self {
        Self {
            manager,
            output,
            assume_yes,
        }
    }

    /// Ask before a mutating command. Dry runs and `--yes` skip the prompt.
    pub(crate) fn confirm(&self, prompt: &str) -> CliResult<()> {
        if self.assume_yes || self.manager.is_dry_run() {
            return Ok(());
        }
        let stdin = io::stdin();
        confirm_with(prompt, &mut stdin.lock(), &mut io::stderr())
    }
}

/// Prompt on `output` and read a `y`/`yes` answer from `input`. Anything
/// else, including end of input, declines.
pub(crate) fn confirm_with(
    prompt: &str,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> CliResult<()> {
    write!(output, "{prompt} [y/N] ")
        .and_then(|()| output.flush())
        .map_err(CliError::failure)?;
    let mut answer = String::new();
    input.read_line(&mut answer).map_err(CliError::failure)?;
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(()),
        _ => Err(CliError::Declined),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    use stackman_rollback::RollbackReport;

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(CliError::validation("bad").exit_code(), 2);
        assert_eq!(CliError::failure(anyhow::anyhow!("boom")).exit_code(), 3);
        assert_eq!(CliError::Declined.exit_code(), 130);
    }

    #[test]
    fn validation_errors_list_every_problem() {
        let err = CliError::from(StackError::Validation {
            errors: vec!["first".into(), "second".into()],
        });
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.display_message(),
            "validation failed:\n  - first\n  - second"
        );
    }

    #[test]
    fn rolled_back_errors_describe_the_cause() {
        let err = CliError::from(StackError::RolledBack {
            operation_id: "switch_php_20240601_091542".into(),
            source: Box::new(StackError::VhostNotFound {
                site: "example.org".into(),
                path: PathBuf::from("/etc/apache2/sites-available/example.org.conf"),
            }),
            report: RollbackReport {
                restored: vec![PathBuf::from("/etc/apache2/sites-available/example.org.conf")],
                failed: Vec::new(),
            },
        });
        assert_eq!(err.exit_code(), 3);
        let message = err.display_message();
        assert!(message.starts_with("switch_php_20240601_091542 failed: virtual host"));
        assert!(message.contains("restored 1 path(s)"));
    }

    #[test]
    fn platform_failures_include_command_and_stderr() {
        let err = CliError::from(StackError::Platform {
            operation: "apache.reload",
            source: PlatformError::CommandFailed {
                command: "systemctl reload apache2".into(),
                status: Some(1),
                stderr: "Job failed\n".into(),
            },
        });
        assert_eq!(
            err.display_message(),
            "apache.reload: `systemctl reload apache2` exited with 1: Job failed"
        );
    }

    #[test]
    fn confirmation_accepts_only_yes() {
        for (answer, accepted) in [("y\n", true), ("YES\n", true), ("n\n", false), ("", false)] {
            let mut prompt = Vec::new();
            let result = confirm_with("Proceed?", &mut Cursor::new(answer), &mut prompt);
            assert_eq!(result.is_ok(), accepted, "{answer:?}");
            assert_eq!(String::from_utf8_lossy(&prompt), "Proceed? [y/N] ");
        }
    }
}
