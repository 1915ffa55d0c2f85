use crate::cli::{CreateSiteArgs, SwitchPhpArgs};
use crate::context::{AppContext, CliResult};
use crate::output::{render_php_switch, render_site, render_sites};

pub(crate) fn handle_create_site(ctx: &AppContext, args: &CreateSiteArgs) -> CliResult<()> {
    let php_version = args
        .php_version
        .as_deref()
        .unwrap_or_else(|| ctx.manager.default_php_version());
    let plan = ctx
        .manager
        .plan_site(&args.site, php_version, args.drupal_version.as_deref())?;
    ctx.confirm(&format!(
        "Create site {} (PHP {}) in {}?",
        plan.site,
        plan.php_version,
        plan.doc_root.display()
    ))?;

    let report = ctx.manager.create_site(&plan)?;
    print!("{}", render_site(&report, ctx.output)?);
    Ok(())
}

pub(crate) fn handle_list_sites(ctx: &AppContext) -> CliResult<()> {
    let sites = ctx.manager.list_sites()?;
    print!("{}", render_sites(&sites, ctx.output)?);
    Ok(())
}

pub(crate) fn handle_switch_php(ctx: &AppContext, args: &SwitchPhpArgs) -> CliResult<()> {
    ctx.confirm(&format!(
        "Switch {} to PHP {} and reload Apache?",
        args.site, args.version
    ))?;
    let report = ctx.manager.switch_php(&args.site, &args.version)?;
    print!("{}", render_php_switch(&report, ctx.output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use anyhow::{Result, anyhow};
    use stackman_stack::render_vhost;
    use stackman_test_support::mocks::ScriptedRunner;

    use crate::commands::test_support::context;

    #[test]
    fn create_site_uses_default_php_version() -> Result<()> {
        let runner = Arc::new(ScriptedRunner::new());
        let (temp, ctx) = context(runner.clone())?;
        let args = CreateSiteArgs {
            site: "example.org".into(),
            php_version: None,
            drupal_version: None,
        };

        handle_create_site(&ctx, &args).map_err(|err| anyhow!(err.display_message()))?;

        let vhost = fs::read_to_string(
            temp.path()
                .join("sites-available")
                .join("example.org.conf"),
        )?;
        assert!(vhost.contains("php8.4-fpm.sock"));
        assert!(runner.was_called("systemctl reload apache2"));
        Ok(())
    }

    #[test]
    fn switch_php_failures_map_to_exit_codes() -> Result<()> {
        let runner = Arc::new(ScriptedRunner::new().fail("systemctl reload", "broken config"));
        let (temp, ctx) = context(runner)?;
        let vhost = temp.path().join("sites-available").join("example.org.conf");
        fs::write(
            &vhost,
            render_vhost("example.org", &temp.path().join("www"), "8.2"),
        )?;

        let missing = SwitchPhpArgs {
            site: "missing.org".into(),
            version: "8.4".into(),
        };
        let err = handle_switch_php(&ctx, &missing).err();
        assert_eq!(err.map(|err| err.exit_code()), Some(3));

        let unsupported = SwitchPhpArgs {
            site: "example.org".into(),
            version: "5.6".into(),
        };
        let err = handle_switch_php(&ctx, &unsupported).err();
        assert_eq!(err.map(|err| err.exit_code()), Some(2));

        let rolled_back = SwitchPhpArgs {
            site: "example.org".into(),
            version: "8.4".into(),
        };
        let err = handle_switch_php(&ctx, &rolled_back)
            .err()
            .ok_or_else(|| anyhow!("reload failure expected"))?;
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("broken config"));
        assert!(fs::read_to_string(&vhost)?.contains("php8.2-fpm.sock"));
        Ok(())
    }
}
