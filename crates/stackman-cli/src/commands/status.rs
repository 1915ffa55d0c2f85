use chrono::Utc;

use crate::cli::{SnapshotListArgs, SnapshotPruneArgs};
use crate::context::{AppContext, CliResult};
use crate::output::{render_prune, render_snapshots, render_status};

pub(crate) fn handle_status(ctx: &AppContext) -> CliResult<()> {
    let status = ctx.manager.status()?;
    print!("{}", render_status(&status, ctx.output)?);
    Ok(())
}

pub(crate) fn handle_snapshots_list(ctx: &AppContext, args: &SnapshotListArgs) -> CliResult<()> {
    let artifacts = ctx.manager.list_snapshots(args.operation.as_deref())?;
    print!(
        "{}",
        render_snapshots(&artifacts, Utc::now(), ctx.output)?
    );
    Ok(())
}

pub(crate) fn handle_snapshots_prune(ctx: &AppContext, args: &SnapshotPruneArgs) -> CliResult<()> {
    let days = args
        .days
        .unwrap_or_else(|| ctx.manager.protected().retention_days());
    ctx.confirm(&format!(
        "Remove snapshots older than {days} day(s) from {}?",
        ctx.manager.protected().store().root().display()
    ))?;
    let summary = ctx.manager.prune_snapshots(Some(days));
    print!("{}", render_prune(&summary, days, ctx.output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    use anyhow::{Result, anyhow};
    use stackman_test_support::mocks::ScriptedRunner;

    use crate::commands::test_support::context;

    #[test]
    fn prune_removes_expired_snapshots() -> Result<()> {
        let (temp, ctx) = context(Arc::new(ScriptedRunner::new()))?;
        let backups = temp.path().join("backups");
        let stale = backups.join("switch_php_20240101_000000_old.conf");
        fs::write(&stale, "stale")?;
        File::open(&stale)?.set_modified(SystemTime::now() - Duration::from_secs(3 * 86_400))?;

        handle_snapshots_list(&ctx, &SnapshotListArgs { operation: None })
            .map_err(|err| anyhow!(err.display_message()))?;
        handle_snapshots_prune(&ctx, &SnapshotPruneArgs { days: Some(2) })
            .map_err(|err| anyhow!(err.display_message()))?;

        assert!(!stale.exists());
        Ok(())
    }
}
