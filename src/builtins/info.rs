//! Help commands

use async_trait::async_trait;

use crate::command::{Command, NativeCommand};
use crate::context::Context;
use crate::error::{CommandResult, RegistryError};
use crate::state::BotState;

/// `help [name]`: list usable commands, or describe one
pub struct Help;

#[async_trait]
impl NativeCommand for Help {
    async fn call(
        &self,
        state: &BotState,
        args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        let text = match args.get(1) {
            Some(name) => {
                let cmd = state
                    .registry
                    .get(name)
                    .ok_or_else(|| RegistryError::NotFound(name.clone()))?;
                describe(&cmd, &state.registry.aliases_of(&cmd.name))
            }
            None => {
                let usable: Vec<String> = state
                    .registry
                    .names()
                    .into_iter()
                    .filter(|name| {
                        state.registry.get(name).is_some_and(|cmd| {
                            ctx.permission().satisfies(cmd.permission)
                                && cmd.platforms.contains(ctx.platform())
                        })
                    })
                    .collect();
                format!("Commands: {}", usable.join(", "))
            }
        };

        ctx.reply(&text).await?;
        Ok(Some(text))
    }
}

fn describe(cmd: &Command, aliases: &[String]) -> String {
    let mut flags = vec![cmd.kind().as_str().to_string(), format!("requires {}", cmd.permission)];
    if cmd.subcommand {
        flags.push("subcommand".to_string());
    }
    if let Some(secs) = cmd.time_limit {
        flags.push(format!("limit {}s", secs));
    }

    let mut text = format!("{} ({})", cmd.name, flags.join(", "));
    if !cmd.description.is_empty() {
        text.push_str(": ");
        text.push_str(&cmd.description);
    }
    if !aliases.is_empty() {
        text.push_str(&format!(" [aliases: {}]", aliases.join(", ")));
    }
    text.push_str(&format!(" [used {} times]", cmd.times_invoked));
    text
}
