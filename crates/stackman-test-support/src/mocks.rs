//! Fake command runner for exercising host integration without a host.

use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use stackman_platform::{CommandOutput, CommandRunner, CommandSpec, PlatformError, PlatformResult};

enum Scripted {
    Output(CommandOutput),
    SpawnFailure(io::ErrorKind),
}

struct Rule {
    prefix: String,
    response: Scripted,
}

/// Command runner that records every call and answers from a script.
///
/// Rules match on the rendered command line prefix; the most recently added
/// matching rule wins. Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    /// Runner with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` with `output`.
    #[must_use]
    pub fn respond(self, prefix: &str, output: CommandOutput) -> Self {
        lock(&self.rules).push(Rule {
            prefix: prefix.to_string(),
            response: Scripted::Output(output),
        });
        self
    }

    /// Fail commands starting with `prefix` with a non-zero exit.
    #[must_use]
    pub fn fail(self, prefix: &str, stderr: &str) -> Self {
        self.respond(prefix, CommandOutput::failed(1, stderr))
    }

    /// Make commands starting with `prefix` behave as if the program is missing.
    #[must_use]
    pub fn missing_program(self, prefix: &str) -> Self {
        lock(&self.rules).push(Rule {
            prefix: prefix.to_string(),
            response: Scripted::SpawnFailure(io::ErrorKind::NotFound),
        });
        self
    }

    /// Rendered command lines in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Whether any recorded call starts with `prefix`.
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        lock(&self.calls).iter().any(|call| call.starts_with(prefix))
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> PlatformResult<CommandOutput> {
        let rendered = spec.to_string();
        lock(&self.calls).push(rendered.clone());
        let rules = lock(&self.rules);
        let Some(rule) = rules.iter().rev().find(|rule| rendered.starts_with(&rule.prefix)) else {
            return Ok(CommandOutput::ok(""));
        };
        match &rule.response {
            Scripted::Output(output) => Ok(output.clone()),
            Scripted::SpawnFailure(kind) => Err(PlatformError::Spawn {
                program: spec.program().to_string(),
                source: io::Error::from(*kind),
            }),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_matching_rule_wins_and_calls_are_recorded() {
        let runner = ScriptedRunner::new()
            .fail("a2ensite", "first")
            .respond("a2ensite example", CommandOutput::ok("enabled"));

        let enabled = runner.run(&CommandSpec::new("a2ensite").arg("example.org"));
        assert!(enabled.is_ok_and(|output| output.stdout == "enabled"));
        let other = runner.run(&CommandSpec::new("a2ensite").arg("other.org"));
        assert!(other.is_ok_and(|output| !output.success()));
        let unknown = runner.run(&CommandSpec::new("true"));
        assert!(unknown.is_ok_and(|output| output.success()));

        assert_eq!(
            runner.calls(),
            vec!["a2ensite example.org", "a2ensite other.org", "true"]
        );
    }

    #[test]
    fn missing_program_reports_not_found() {
        let runner = ScriptedRunner::new().missing_program("systemctl");
        let err = runner.run(&CommandSpec::new("systemctl").args(["is-active", "apache2"]));
        assert!(err.is_err_and(|err| err.is_missing_program()));
        assert!(runner.was_called("systemctl is-active"));
    }
}
