//! Command Execution Engine
//!
//! Runs one command line:
//!
//! ```text
//! lookup ──► platform/permission check ──► count invocation
//!                                               │
//!       ┌──────── deadline (if the command has a time limit) ────────┐
//!       │ expand placeholders ──► expand subcommands ──► dispatch     │
//!       └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dispatch depends on the implementation kind: native functions reply for
//! themselves, templates are sent as the reply, and external command lines
//! are executed with their stdout sent as the reply. Silent contexts compute
//! the same result but send nothing.

use futures_util::future::BoxFuture;
use std::time::Duration;
use tracing::{debug, warn};

use crate::command::{Command, Implementation};
use crate::context::Context;
use crate::error::{CommandError, CommandResult};
use crate::placeholder::{expand_placeholders, tokenize};
use crate::state::BotState;
use crate::subcommand::expand_subcommands;

/// Run a command line, reporting any failure through the context
///
/// Returns the command's textual result, or None if it produced nothing or
/// failed.
pub fn run<'a>(
    state: &'a BotState,
    line: &'a str,
    ctx: &'a Context,
) -> BoxFuture<'a, Option<String>> {
    Box::pin(async move {
        match try_run(state, line, ctx).await {
            Ok(result) => result,
            Err(e) => {
                debug!("Command line {:?} failed: {}", line, e);
                ctx.notify(&e.to_string()).await;
                None
            }
        }
    })
}

/// Run a command line, returning failures to the caller
pub fn try_run<'a>(
    state: &'a BotState,
    line: &'a str,
    ctx: &'a Context,
) -> BoxFuture<'a, CommandResult<Option<String>>> {
    Box::pin(async move {
        let tokens = tokenize(line);
        let Some(name) = tokens.first() else {
            return Ok(None);
        };

        let cmd = state
            .registry
            .get(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.clone()))?;

        if !cmd.platforms.contains(ctx.platform()) {
            return Err(CommandError::UnsupportedPlatform(cmd.name));
        }
        if !ctx.permission().satisfies(cmd.permission) {
            return Err(CommandError::PermissionDenied {
                name: cmd.name,
                required: cmd.permission,
            });
        }

        let count = state.registry.record_invocation(&cmd.name).unwrap_or_default();
        debug!(
            "Running {} (#{}, depth {}, silent: {})",
            cmd.name,
            count,
            ctx.depth(),
            ctx.is_silent()
        );

        match cmd.time_limit {
            None => execute(state, &cmd, line, tokens.clone(), ctx).await,
            Some(seconds) => {
                let work = execute(state, &cmd, line, tokens.clone(), ctx);
                match tokio::time::timeout(Duration::from_secs(seconds), work).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("Command {} exceeded its {}s limit", cmd.name, seconds);
                        Err(CommandError::Timeout {
                            name: cmd.name.clone(),
                            seconds,
                        })
                    }
                }
            }
        }
    })
}

/// Expansion and dispatch; everything here is covered by the deadline
async fn execute(
    state: &BotState,
    cmd: &Command,
    line: &str,
    mut tokens: Vec<String>,
    ctx: &Context,
) -> CommandResult<Option<String>> {
    if !cmd.postpone_expansion {
        let expanded = expand_placeholders(line, &tokens, ctx, false);
        let expanded = expand_subcommands(state, &expanded, ctx, false).await;
        tokens = tokenize(&expanded);
        if tokens.is_empty() {
            return Ok(None);
        }
    }

    match &cmd.implementation {
        Implementation::Native(function) => function.call(state, tokens, ctx).await,
        Implementation::Template(template) => {
            let text = expand_placeholders(template, &tokens, ctx, false);
            let text = expand_subcommands(state, &text, ctx, false).await;
            ctx.reply(&text).await?;
            Ok(Some(text))
        }
        Implementation::External(command_line) => {
            let command_line = expand_placeholders(command_line, &tokens, ctx, true);
            let command_line = expand_subcommands(state, &command_line, ctx, true).await;
            debug!("Executing external command {}: {}", cmd.name, command_line);
            let output = state.runner().run(&command_line).await?;
            ctx.reply(&output).await?;
            Ok(Some(output))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::NativeCommand;
    use crate::config::Config;
    use crate::context::BufferTransport;
    use crate::permissions::{PermissionLevel, Platform, PlatformSet};
    use crate::process::ProcessRunner;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records the command lines it is asked to run
    #[derive(Default)]
    struct FakeRunner {
        lines: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ProcessRunner for FakeRunner {
        async fn run(&self, command_line: &str) -> CommandResult<String> {
            self.lines.lock().push(command_line.to_string());
            if command_line.starts_with("fail") {
                return Err(CommandError::Process("exit status: 1".to_string()));
            }
            Ok(format!("ran {}", command_line))
        }
    }

    /// Echoes its raw arguments back
    struct RawArgs;

    #[async_trait]
    impl NativeCommand for RawArgs {
        async fn call(
            &self,
            _state: &BotState,
            args: Vec<String>,
            ctx: &Context,
        ) -> CommandResult<Option<String>> {
            let text = args[1..].join(" ");
            ctx.reply(&text).await?;
            Ok(Some(text))
        }
    }

    fn setup(
        permission: PermissionLevel,
    ) -> (BotState, Arc<FakeRunner>, Arc<BufferTransport>, Context) {
        let runner = Arc::new(FakeRunner::default());
        let state = BotState::bare(Config::default()).with_runner(runner.clone());
        state
            .registry
            .register(Command::template("echo", "@args@").as_subcommand())
            .unwrap();
        let transport = Arc::new(BufferTransport::new(Platform::Console).with_author("bob"));
        let ctx = Context::new(transport.clone(), permission);
        (state, runner, transport, ctx)
    }

    #[tokio::test]
    async fn test_template_reply() {
        let (state, _, transport, ctx) = setup(PermissionLevel::User);
        state
            .registry
            .register(Command::template("greet", "hello @author@, you said @args@"))
            .unwrap();

        let out = run(&state, "greet nice day", &ctx).await;
        assert_eq!(out.as_deref(), Some("hello bob, you said nice day"));
        assert_eq!(transport.sent(), vec!["hello bob, you said nice day"]);
    }

    #[tokio::test]
    async fn test_blank_line_is_noop() {
        let (state, _, transport, ctx) = setup(PermissionLevel::User);
        assert_eq!(run(&state, "   ", &ctx).await, None);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_command_reported() {
        let (state, _, transport, ctx) = setup(PermissionLevel::User);
        assert_eq!(run(&state, "nope arg", &ctx).await, None);
        assert_eq!(transport.sent(), vec!["Unknown command: nope"]);

        let err = try_run(&state, "nope", &ctx).await.unwrap_err();
        assert!(matches!(err, CommandError::UnknownCommand(_)));
    }

    #[tokio::test]
    async fn test_platform_gate() {
        let (state, _, transport, ctx) = setup(PermissionLevel::Admin);
        state
            .registry
            .register(
                Command::template("dc", "x").with_platforms(PlatformSet::only(Platform::Discord)),
            )
            .unwrap();

        assert_eq!(run(&state, "dc", &ctx).await, None);
        assert!(transport.sent()[0].contains("not available"));
        assert_eq!(state.registry.get("dc").unwrap().times_invoked, 0);
    }

    #[tokio::test]
    async fn test_line_arguments_expanded_before_dispatch() {
        let (state, _, _, ctx) = setup(PermissionLevel::User);
        state
            .registry
            .register(Command::native("raw", RawArgs))
            .unwrap();
        state
            .registry
            .register(Command::native("rawlater", RawArgs).postponed())
            .unwrap();

        let out = run(&state, "raw $(echo hi) @author@", &ctx).await;
        assert_eq!(out.as_deref(), Some("hi bob"));

        let out = run(&state, "rawlater $(echo hi) @author@", &ctx).await;
        assert_eq!(out.as_deref(), Some("$(echo hi) @author@"));
    }

    #[tokio::test]
    async fn test_silent_template_returns_without_sending() {
        let (state, _, transport, ctx) = setup(PermissionLevel::User);
        let out = run(&state, "echo quiet", &ctx.silenced()).await;
        assert_eq!(out.as_deref(), Some("quiet"));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_external_uses_safe_expansion() {
        let (state, runner, transport, ctx) = setup(PermissionLevel::User);
        state
            .registry
            .register(Command::external("weather", "curl wttr.in/@arg1@"))
            .unwrap();

        let out = run(&state, "weather Berlin", &ctx).await;
        assert_eq!(out.as_deref(), Some("ran curl wttr.in/Berlin"));
        assert_eq!(transport.sent(), vec!["ran curl wttr.in/Berlin"]);

        run(&state, "weather ;reboot", &ctx).await;
        assert_eq!(runner.lines.lock()[1], "curl wttr.in/@arg1@");
    }

    #[tokio::test]
    async fn test_process_failure_reported() {
        let (state, _, transport, ctx) = setup(PermissionLevel::User);
        state.registry.register(Command::external("bad", "fail")).unwrap();

        assert_eq!(run(&state, "bad", &ctx).await, None);
        assert_eq!(transport.sent(), vec!["Process failed: exit status: 1"]);
        assert_eq!(state.registry.get("bad").unwrap().times_invoked, 1);
    }
}
