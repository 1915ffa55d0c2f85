//! Argument parsing, logging setup, and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use stackman_config::{CONFIG_ENV, StackConfig};
use stackman_stack::{Component, StackManager};
use stackman_telemetry::{LogFormat, LoggingConfig, init_logging, log_level};
use uuid::Uuid;

use crate::commands::{
    handle_create_site, handle_install, handle_list_sites, handle_snapshots_list,
    handle_snapshots_prune, handle_status, handle_switch_php,
};
use crate::context::{AppContext, CliError, CliResult, describe_stack_error};

/// Parses CLI arguments, executes the requested command, and reports the
/// outcome. Returns the process exit code.
#[must_use]
pub fn run() -> i32 {
    let cli = Cli::parse();
    let logging = LoggingConfig {
        level: log_level(cli.verbose),
        format: cli.log_format.map_or_else(LogFormat::infer, LogFormatArg::into_format),
        build_sha: option_env!("STACKMAN_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: logging unavailable: {err}");
    }

    let command = cli.command.label();
    let trace_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("command", command, trace_id = %trace_id);
    let _entered = span.enter();
    match dispatch(cli) {
        Ok(()) => 0,
        Err(err) => {
            let exit_code = err.exit_code();
            tracing::debug!(command, exit_code, "command finished with error");
            eprintln!("error: {}", err.display_message());
            exit_code
        }
    }
}

fn dispatch(cli: Cli) -> CliResult<()> {
    let config = StackConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::validation(describe_stack_error(&err.into())))?;
    let manager = StackManager::for_host(&config, cli.dry_run).map_err(CliError::from)?;
    let ctx = AppContext::new(manager, cli.output, cli.yes);

    match cli.command {
        Command::Install(args) => handle_install(&ctx, &args),
        Command::CreateSite(args) => handle_create_site(&ctx, &args),
        Command::ListSites => handle_list_sites(&ctx),
        Command::SwitchPhp(args) => handle_switch_php(&ctx, &args),
        Command::Status => handle_status(&ctx),
        Command::Snapshots(SnapshotsCommand::List(args)) => handle_snapshots_list(&ctx, &args),
        Command::Snapshots(SnapshotsCommand::Prune(args)) => handle_snapshots_prune(&ctx, &args),
    }
}

#[derive(Parser)]
#[command(
    name = "stackman",
    version,
    about = "Provision and manage Apache, MySQL, and PHP sites"
)]
pub(crate) struct Cli {
    #[arg(long, global = true, env = CONFIG_ENV, help = "YAML file merged over the defaults")]
    pub(crate) config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print what would happen without changing the host")]
    pub(crate) dry_run: bool,
    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub(crate) verbose: bool,
    #[arg(long, global = true, value_enum, help = "Log format (defaults by build profile)")]
    pub(crate) log_format: Option<LogFormatArg>,
    #[arg(
        long = "output",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(short = 'y', long, global = true, help = "Skip confirmation prompts")]
    pub(crate) yes: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Install stack components.
    Install(InstallArgs),
    /// Create a site: document root, vhost, database, and user.
    CreateSite(CreateSiteArgs),
    /// List configured sites.
    ListSites,
    /// Point a site at a different PHP-FPM version.
    SwitchPhp(SwitchPhpArgs),
    /// Show service state and configured paths.
    Status,
    /// Inspect or prune rollback snapshots.
    #[command(subcommand)]
    Snapshots(SnapshotsCommand),
}

impl Command {
    const fn label(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::CreateSite(_) => "create-site",
            Self::ListSites => "list-sites",
            Self::SwitchPhp(_) => "switch-php",
            Self::Status => "status",
            Self::Snapshots(SnapshotsCommand::List(_)) => "snapshots list",
            Self::Snapshots(SnapshotsCommand::Prune(_)) => "snapshots prune",
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum SnapshotsCommand {
    /// List snapshot artifacts with age and size.
    List(SnapshotListArgs),
    /// Remove snapshots past the retention window.
    Prune(SnapshotPruneArgs),
}

#[derive(Args)]
pub(crate) struct InstallArgs {
    #[arg(required = true, value_enum, help = "Components to install")]
    pub(crate) components: Vec<ComponentArg>,
}

#[derive(Args)]
pub(crate) struct CreateSiteArgs {
    #[arg(help = "Site name, e.g. example.org")]
    pub(crate) site: String,
    #[arg(long, help = "PHP version (defaults to php.default_version)")]
    pub(crate) php_version: Option<String>,
    #[arg(long, help = "Install Drupal with this composer constraint, e.g. ^11")]
    pub(crate) drupal_version: Option<String>,
}

#[derive(Args)]
pub(crate) struct SwitchPhpArgs {
    #[arg(help = "Site name")]
    pub(crate) site: String,
    #[arg(help = "Target PHP version, e.g. 8.3")]
    pub(crate) version: String,
}

#[derive(Args)]
pub(crate) struct SnapshotListArgs {
    #[arg(long, help = "Only artifacts whose name starts with this operation prefix")]
    pub(crate) operation: Option<String>,
}

#[derive(Args)]
pub(crate) struct SnapshotPruneArgs {
    #[arg(long, help = "Retention in days (defaults to rollback.retention_days)")]
    pub(crate) days: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ComponentArg {
    Apache,
    Mysql,
    Php,
    All,
}

impl ComponentArg {
    pub(crate) const fn into_component(self) -> Component {
        match self {
            Self::Apache => Component::Apache,
            Self::Mysql => Component::Mysql,
            Self::Php => Component::Php,
            Self::All => Component::All,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormatArg {
    Pretty,
    Json,
}

impl LogFormatArg {
    const fn into_format(self) -> LogFormat {
        match self {
            Self::Pretty => LogFormat::Pretty,
            Self::Json => LogFormat::Json,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};

    fn parse(args: &[&str]) -> Result<Cli> {
        Cli::try_parse_from(std::iter::once("stackman").chain(args.iter().copied()))
            .map_err(|err| anyhow!(err.to_string()))
    }

    #[test]
    fn parses_create_site_with_global_flags() -> Result<()> {
        let cli = parse(&[
            "create-site",
            "example.org",
            "--php-version",
            "8.3",
            "--drupal-version",
            "^11",
            "--dry-run",
            "--output",
            "json",
            "-y",
        ])?;
        assert!(cli.dry_run && cli.yes);
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Command::CreateSite(args) => {
                assert_eq!(args.site, "example.org");
                assert_eq!(args.php_version.as_deref(), Some("8.3"));
                assert_eq!(args.drupal_version.as_deref(), Some("^11"));
            }
            _ => return Err(anyhow!("expected create-site")),
        }
        Ok(())
    }

    #[test]
    fn install_requires_known_components() -> Result<()> {
        let cli = parse(&["install", "php", "apache"])?;
        match cli.command {
            Command::Install(args) => assert_eq!(
                args.components,
                vec![ComponentArg::Php, ComponentArg::Apache]
            ),
            _ => return Err(anyhow!("expected install")),
        }
        assert!(parse(&["install"]).is_err());
        assert!(parse(&["install", "nginx"]).is_err());
        Ok(())
    }

    #[test]
    fn snapshot_subcommands_parse_options() -> Result<()> {
        let cli = parse(&["snapshots", "list", "--operation", "switch_php"])?;
        assert_eq!(cli.command.label(), "snapshots list");
        let cli = parse(&["--log-format", "json", "-v", "snapshots", "prune", "--days", "3"])?;
        assert!(cli.verbose);
        assert_eq!(cli.log_format, Some(LogFormatArg::Json));
        match cli.command {
            Command::Snapshots(SnapshotsCommand::Prune(args)) => assert_eq!(args.days, Some(3)),
            _ => return Err(anyhow!("expected snapshots prune")),
        }
        Ok(())
    }

    #[test]
    fn switch_php_takes_positional_site_and_version() -> Result<()> {
        let cli = parse(&["switch-php", "example.org", "8.4"])?;
        assert_eq!(cli.output, OutputFormat::Table);
        match cli.command {
            Command::SwitchPhp(args) => {
                assert_eq!(args.site, "example.org");
                assert_eq!(args.version, "8.4");
            }
            _ => return Err(anyhow!("expected switch-php")),
        }
        Ok(())
    }
}
