//! Registry management commands
//!
//! Bodies of `addcmd`, `addext` and `updatecmd` are stored verbatim: those
//! commands postpone expansion so placeholders and subcommand references are
//! kept for the stored command to expand when it runs.

use async_trait::async_trait;
use tracing::info;

use super::{required, required_rest};
use crate::command::{Command, Implementation, NativeCommand};
use crate::config::parse_time_limit;
use crate::context::Context;
use crate::error::{CommandError, CommandResult, RegistryError};
use crate::permissions::{PermissionLevel, Platform};
use crate::state::BotState;

async fn confirm(ctx: &Context, text: String) -> CommandResult<Option<String>> {
    ctx.reply(&text).await?;
    Ok(Some(text))
}

/// `addcmd <name> <template...>`
pub struct AddTemplate;

#[async_trait]
impl NativeCommand for AddTemplate {
    async fn call(
        &self,
        state: &BotState,
        args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        const USAGE: &str = "addcmd <name> <template>";
        let name = required(&args, 1, USAGE)?;
        let body = required_rest(&args, 2, USAGE)?;

        let cmd = Command::template(name, &body).with_time_limit(state.config.default_time_limit);
        state.registry.register(cmd)?;
        info!("{} added template command {}", ctx.transport().message_author(), name);
        confirm(ctx, format!("Command `{}` added", name)).await
    }
}

/// `addext <name> <command line...>`
pub struct AddExternal;

#[async_trait]
impl NativeCommand for AddExternal {
    async fn call(
        &self,
        state: &BotState,
        args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        const USAGE: &str = "addext <name> <command line>";
        let name = required(&args, 1, USAGE)?;
        let body = required_rest(&args, 2, USAGE)?;

        let cmd = Command::external(name, &body).with_time_limit(state.config.default_time_limit);
        state.registry.register(cmd)?;
        info!("{} added external command {}", ctx.transport().message_author(), name);
        confirm(ctx, format!("External command `{}` added", name)).await
    }
}

/// `updatecmd <name> <body...>`
pub struct Update;

#[async_trait]
impl NativeCommand for Update {
    async fn call(
        &self,
        state: &BotState,
        args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        const USAGE: &str = "updatecmd <name> <body>";
        let name = required(&args, 1, USAGE)?;
        let body = required_rest(&args, 2, USAGE)?;

        state.registry.update_body(name, &body)?;
        confirm(ctx, format!("Command `{}` updated", name)).await
    }
}

/// `delcmd <name>`; built-in commands cannot be deleted
pub struct Delete;

#[async_trait]
impl NativeCommand for Delete {
    async fn call(
        &self,
        state: &BotState,
        args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        let name = required(&args, 1, "delcmd <name>")?;
        let cmd = state
            .registry
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        if matches!(cmd.implementation, Implementation::Native(_)) {
            return Err(RegistryError::NativeImmutable(cmd.name).into());
        }

        let removed = state.registry.remove(&cmd.name)?;
        confirm(ctx, format!("Command `{}` deleted", removed.name)).await
    }
}

/// `alias <alias> <name>`
pub struct Alias;

#[async_trait]
impl NativeCommand for Alias {
    async fn call(
        &self,
        state: &BotState,
        args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        const USAGE: &str = "alias <alias> <name>";
        let alias = required(&args, 1, USAGE)?;
        let target = required(&args, 2, USAGE)?;

        state.registry.add_alias(alias, target)?;
        confirm(ctx, format!("`{}` is now an alias of `{}`", alias, target)).await
    }
}

/// `setperm <name> <user|mod|admin>`
pub struct SetPermission;

#[async_trait]
impl NativeCommand for SetPermission {
    async fn call(
        &self,
        state: &BotState,
        args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        const USAGE: &str = "setperm <name> <user|mod|admin>";
        let name = required(&args, 1, USAGE)?;
        let level = required(&args, 2, USAGE)?;
        let level = PermissionLevel::parse(level)
            .ok_or_else(|| CommandError::invalid(format!("unknown permission level {:?}", level)))?;

        state.registry.set_permission(name, level)?;
        confirm(ctx, format!("Command `{}` now requires {}", name, level)).await
    }
}

/// `settimelimit <name> <seconds|-1>`
pub struct SetTimeLimit;

#[async_trait]
impl NativeCommand for SetTimeLimit {
    async fn call(
        &self,
        state: &BotState,
        args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        const USAGE: &str = "settimelimit <name> <seconds|-1>";
        let name = required(&args, 1, USAGE)?;
        let raw = required(&args, 2, USAGE)?;
        let secs: i64 = raw
            .parse()
            .map_err(|_| CommandError::invalid(format!("{:?} is not a number", raw)))?;
        let limit = parse_time_limit(secs).map_err(|e| CommandError::invalid(e.to_string()))?;

        state.registry.set_time_limit(name, limit)?;
        let text = match limit {
            Some(s) => format!("Command `{}` is limited to {}s", name, s),
            None => format!("Command `{}` has no time limit", name),
        };
        confirm(ctx, text).await
    }
}

/// `enablecmd <name> <platform>` and `disablecmd <name> <platform>`
pub struct SetPlatform {
    pub enabled: bool,
}

#[async_trait]
impl NativeCommand for SetPlatform {
    async fn call(
        &self,
        state: &BotState,
        args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        let usage = if self.enabled {
            "enablecmd <name> <platform>"
        } else {
            "disablecmd <name> <platform>"
        };
        let name = required(&args, 1, usage)?;
        let raw = required(&args, 2, usage)?;
        let platform = Platform::parse(raw)
            .ok_or_else(|| CommandError::invalid(format!("unknown platform {:?}", raw)))?;

        let text = if self.enabled {
            state.registry.enable_platform(name, platform)?;
            format!("Command `{}` enabled on {}", name, platform.as_str())
        } else {
            state.registry.disable_platform(name, platform)?;
            format!("Command `{}` disabled on {}", name, platform.as_str())
        };
        confirm(ctx, text).await
    }
}

/// `subcmd <name> <on|off>`
pub struct SetSubcommand;

#[async_trait]
impl NativeCommand for SetSubcommand {
    async fn call(
        &self,
        state: &BotState,
        args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        const USAGE: &str = "subcmd <name> <on|off>";
        let name = required(&args, 1, USAGE)?;
        let eligible = match required(&args, 2, USAGE)? {
            "on" | "true" | "yes" => true,
            "off" | "false" | "no" => false,
            _ => return Err(CommandError::usage(USAGE)),
        };

        state.registry.set_subcommand(name, eligible)?;
        let text = if eligible {
            format!("Command `{}` can be used as a subcommand", name)
        } else {
            format!("Command `{}` can no longer be used as a subcommand", name)
        };
        confirm(ctx, text).await
    }
}
