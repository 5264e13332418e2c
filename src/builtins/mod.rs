//! Built-in Commands
//!
//! Commands bound at startup. They are dispatched through the engine exactly
//! like user-defined ones; all but `echo` are native.
//!
//! | Module | Commands                                                          |
//! |--------|-------------------------------------------------------------------|
//! | markov | markov, markovfind, markovdel, markovgc, markovcheck, markovstats |
//! | manage | addcmd, addext, updatecmd, delcmd, alias, setperm, settimelimit,  |
//! |        | enablecmd, disablecmd, subcmd                                     |
//! | info   | help (alias: commands), echo                                      |

pub mod info;
pub mod manage;
pub mod markov;

use tracing::{info, warn};

use crate::command::Command;
use crate::error::{CommandError, CommandResult};
use crate::permissions::PermissionLevel;
use crate::registry::CommandRegistry;

/// Bind every built-in command, returning how many were bound
pub fn register_all(registry: &CommandRegistry) -> usize {
    use PermissionLevel::{Admin, Mod};

    let commands = vec![
        // markov
        Command::native("markov", markov::Generate)
            .as_subcommand()
            .with_description("Generate a sentence, optionally from a word: markov [word]"),
        Command::native("markovfind", markov::FindWords)
            .with_permission(Mod)
            .postponed()
            .with_description("List learned words matching a regex: markovfind <regex>"),
        Command::native("markovdel", markov::DeleteWords)
            .with_permission(Admin)
            .postponed()
            .with_description("Forget words matching a regex: markovdel <regex>"),
        Command::native("markovgc", markov::CollectGarbage)
            .with_permission(Admin)
            .with_description("Remove words that can no longer be generated"),
        Command::native("markovcheck", markov::Check)
            .with_permission(Admin)
            .with_description("Verify and repair the Markov model"),
        Command::native("markovstats", markov::Stats)
            .with_description("Show the size of the Markov model"),
        // manage
        Command::native("addcmd", manage::AddTemplate)
            .with_permission(Mod)
            .postponed()
            .with_description("Add a message command: addcmd <name> <template>"),
        Command::native("addext", manage::AddExternal)
            .with_permission(Admin)
            .postponed()
            .with_description("Add an external command: addext <name> <command line>"),
        Command::native("updatecmd", manage::Update)
            .with_permission(Mod)
            .postponed()
            .with_description("Replace the body of a command: updatecmd <name> <body>"),
        Command::native("delcmd", manage::Delete)
            .with_permission(Mod)
            .with_description("Delete a command: delcmd <name>"),
        Command::native("alias", manage::Alias)
            .with_permission(Mod)
            .with_description("Add another name for a command: alias <alias> <name>"),
        Command::native("setperm", manage::SetPermission)
            .with_permission(Admin)
            .with_description("Set the required permission: setperm <name> <user|mod|admin>"),
        Command::native("settimelimit", manage::SetTimeLimit)
            .with_permission(Admin)
            .with_description("Set the time limit, -1 for none: settimelimit <name> <secs>"),
        Command::native("enablecmd", manage::SetPlatform { enabled: true })
            .with_permission(Mod)
            .with_description("Enable a command on a platform: enablecmd <name> <platform>"),
        Command::native("disablecmd", manage::SetPlatform { enabled: false })
            .with_permission(Mod)
            .with_description("Disable a command on a platform: disablecmd <name> <platform>"),
        Command::native("subcmd", manage::SetSubcommand)
            .with_permission(Mod)
            .with_description("Allow use as a subcommand: subcmd <name> <on|off>"),
        // info
        Command::native("help", info::Help)
            .with_description("List commands or describe one: help [name]"),
        Command::template("echo", "@args@")
            .as_subcommand()
            .with_description("Repeat the arguments"),
    ];

    let mut bound = 0;
    for cmd in commands {
        let module = module_of(&cmd.name);
        let name = cmd.name.clone();
        match registry.insert(cmd.with_module(module)) {
            Ok(_) => bound += 1,
            Err(e) => warn!("Failed to bind {}: {}", name, e),
        }
    }
    if let Err(e) = registry.add_alias("commands", "help") {
        warn!("Failed to alias commands: {}", e);
    }

    info!("Bound {} built-in commands", bound);
    bound
}

fn module_of(name: &str) -> &'static str {
    match name {
        n if n.starts_with("markov") => "markov",
        "help" | "echo" => "info",
        _ => "manage",
    }
}

/// Argument at `index` or a usage error
pub(crate) fn required<'a>(
    args: &'a [String],
    index: usize,
    usage: &str,
) -> CommandResult<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| CommandError::usage(usage))
}

/// Arguments from `index` on, rejoined
pub(crate) fn rest(args: &[String], index: usize) -> String {
    args.get(index..).map(|a| a.join(" ")).unwrap_or_default()
}

/// Arguments from `index` on, or a usage error if there are none
pub(crate) fn required_rest(args: &[String], index: usize, usage: &str) -> CommandResult<String> {
    let text = rest(args, index);
    if text.is_empty() {
        return Err(CommandError::usage(usage));
    }
    Ok(text)
}
