//! systemd service control.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::command::{CommandRunner, CommandSpec};
use crate::error::{PlatformError, PlatformResult};

/// Lifecycle actions accepted by `systemctl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    /// `systemctl start`.
    Start,
    /// `systemctl stop`.
    Stop,
    /// `systemctl restart`.
    Restart,
    /// `systemctl reload`.
    Reload,
    /// `systemctl status`.
    Status,
}

impl ServiceAction {
    /// `systemctl` verb for this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Reload => "reload",
            Self::Status => "status",
        }
    }
}

impl Display for ServiceAction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ServiceAction {
    type Err = PlatformError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            "reload" => Ok(Self::Reload),
            "status" => Ok(Self::Status),
            other => Err(PlatformError::InvalidServiceAction {
                action: other.to_string(),
            }),
        }
    }
}

/// Reported state of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    /// Unit name.
    pub name: String,
    /// Output of `systemctl is-active`, or `unknown` when it could not run.
    pub state: String,
}

impl ServiceStatus {
    /// Whether the unit reported `active`.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == "active"
    }
}

/// Thin wrapper over `systemctl`.
pub struct ServiceController {
    runner: Arc<dyn CommandRunner>,
}

impl ServiceController {
    /// Controller driven by `runner`.
    #[must_use]
    pub const fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Apply `action` to `service`.
    ///
    /// # Errors
    ///
    /// Returns an error when `systemctl` cannot be run or exits unsuccessfully.
    pub fn manage(&self, service: &str, action: ServiceAction) -> PlatformResult<()> {
        info!(service = %service, action = %action, "managing service");
        self.runner
            .run_checked(&CommandSpec::new("systemctl").args([action.as_str(), service]))?;
        Ok(())
    }

    /// Query the state of `service`.
    ///
    /// An inactive unit makes `is-active` exit non-zero; that is still a valid
    /// answer, so only a missing `systemctl` maps to `unknown`.
    ///
    /// # Errors
    ///
    /// Returns an error when `systemctl` exists but cannot be started.
    pub fn query(&self, service: &str) -> PlatformResult<ServiceStatus> {
        let spec = CommandSpec::new("systemctl").args(["is-active", service]);
        let state = match self.runner.run(&spec) {
            Ok(output) => {
                let state = output.stdout.trim();
                if state.is_empty() {
                    "unknown".to_string()
                } else {
                    state.to_string()
                }
            }
            Err(err) if err.is_missing_program() => "unknown".to_string(),
            Err(err) => return Err(err),
        };
        Ok(ServiceStatus {
            name: service.to_string(),
            state,
        })
    }

    /// Whether `service` is currently active.
    ///
    /// # Errors
    ///
    /// Returns an error when `systemctl` exists but cannot be started.
    pub fn is_active(&self, service: &str) -> PlatformResult<bool> {
        Ok(self.query(service)?.is_active())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_round_trip_through_systemctl_verbs() {
        for action in [
            ServiceAction::Start,
            ServiceAction::Stop,
            ServiceAction::Restart,
            ServiceAction::Reload,
            ServiceAction::Status,
        ] {
            assert!(matches!(action.as_str().parse::<ServiceAction>(), Ok(parsed) if parsed == action));
        }
        assert!(matches!(
            "enable".parse::<ServiceAction>(),
            Err(PlatformError::InvalidServiceAction { action }) if action == "enable"
        ));
    }
}
