use stackman_stack::Component;

use crate::cli::InstallArgs;
use crate::context::{AppContext, CliResult};
use crate::output::render_install;

pub(crate) fn handle_install(ctx: &AppContext, args: &InstallArgs) -> CliResult<()> {
    let requested: Vec<Component> = args
        .components
        .iter()
        .map(|component| component.into_component())
        .collect();
    let names: Vec<&str> = Component::resolve(&requested)
        .into_iter()
        .map(Component::as_str)
        .collect();
    ctx.confirm(&format!("Install {}?", names.join(", ")))?;

    let report = ctx.manager.install_components(&requested)?;
    print!("{}", render_install(&report, ctx.output)?);
    Ok(())
}
