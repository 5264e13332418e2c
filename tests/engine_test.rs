//! Command Engine Integration Tests
//!
//! End-to-end runs through BotState: placeholders, subcommands, permission
//! gates, time limits and the message loop entry point.

use async_trait::async_trait;
use cmdbot::placeholder::expand_placeholders;
use cmdbot::subcommand::expand_subcommands;
use cmdbot::{
    engine, BotState, BufferTransport, Command, CommandError, CommandResult, Config, Context,
    NativeCommand, PermissionLevel, Platform,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_test::{assert_err, assert_ok};

/// Native command that sleeps before answering
struct Sleeper(Duration);

#[async_trait]
impl NativeCommand for Sleeper {
    async fn call(
        &self,
        _state: &BotState,
        _args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        tokio::time::sleep(self.0).await;
        ctx.reply("woke up").await?;
        Ok(Some("woke up".to_string()))
    }
}

fn create_test_bot(config: Config) -> BotState {
    BotState::new(config)
}

fn context(permission: PermissionLevel) -> (Context, Arc<BufferTransport>) {
    let transport = Arc::new(
        BufferTransport::new(Platform::Discord)
            .with_author("max")
            .with_server("guild"),
    );
    (Context::new(transport.clone(), permission), transport)
}

fn tokens(line: &str) -> Vec<String> {
    line.split_whitespace().map(String::from).collect()
}

#[test]
fn test_placeholder_free_text_is_unchanged() {
    let (ctx, _) = context(PermissionLevel::User);
    let args = tokens("cmd one two");
    for text in ["plain text", "email@example.com", "@unknown@", "@@", "50% off @ noon"] {
        assert_eq!(expand_placeholders(text, &args, &ctx, false), text);
    }
}

#[test]
fn test_ranged_placeholder_out_of_bounds_stays_literal() {
    let (ctx, _) = context(PermissionLevel::User);
    let args = tokens("cmd one two");
    assert_eq!(expand_placeholders("@arg2-5@", &args, &ctx, false), "@arg2-5@");
    assert_eq!(expand_placeholders("@arg1-2@", &args, &ctx, false), "one two");
    assert_eq!(
        expand_placeholders("@author@ in @channel@ on @server@", &args, &ctx, false),
        "max in general on guild"
    );
}

#[tokio::test]
async fn test_subcommands_reach_fixed_point() {
    let bot = create_test_bot(Config::default());
    let (ctx, transport) = context(PermissionLevel::User);

    assert_eq!(expand_subcommands(&bot, "a $(echo b) c", &ctx, false).await, "a b c");
    assert_eq!(expand_subcommands(&bot, "$(echo $(echo x))", &ctx, false).await, "x");
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_unknown_subcommand_reports_without_failing() {
    let bot = create_test_bot(Config::default());
    let (ctx, transport) = context(PermissionLevel::User);

    let out = expand_subcommands(&bot, "$(bogus)", &ctx, false).await;
    assert_eq!(out, "");
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].to_lowercase().contains("unknown command"));
}

#[tokio::test]
async fn test_permission_gate() {
    let bot = create_test_bot(Config::default());
    bot.registry
        .register(Command::template("modonly", "secret").with_permission(PermissionLevel::Mod))
        .unwrap();

    let (user, transport) = context(PermissionLevel::User);
    assert_eq!(engine::run(&bot, "modonly", &user).await, None);
    assert!(transport.sent()[0].contains("mod"));
    assert_eq!(bot.registry.get("modonly").unwrap().times_invoked, 0);

    let err = assert_err!(engine::try_run(&bot, "modonly", &user).await);
    assert!(matches!(err, CommandError::PermissionDenied { .. }));
    assert_eq!(bot.registry.get("modonly").unwrap().times_invoked, 0);

    let (admin, _) = context(PermissionLevel::Admin);
    let out = assert_ok!(engine::try_run(&bot, "modonly", &admin).await);
    assert_eq!(out.as_deref(), Some("secret"));
    assert_eq!(bot.registry.get("modonly").unwrap().times_invoked, 1);
}

#[tokio::test]
async fn test_time_limit_cancels_slow_command() {
    let bot = create_test_bot(Config::default());
    bot.registry
        .register(Command::native("slow", Sleeper(Duration::from_secs(5))).with_time_limit(Some(1)))
        .unwrap();
    let (ctx, transport) = context(PermissionLevel::User);

    let started = Instant::now();
    assert_eq!(engine::run(&bot, "slow", &ctx).await, None);
    assert!(started.elapsed() < Duration::from_secs(4));

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("took too long"));
    assert_eq!(bot.registry.get("slow").unwrap().times_invoked, 1);
}

#[tokio::test]
async fn test_time_limit_kills_external_process() {
    let bot = create_test_bot(Config::default());
    let marker = std::env::temp_dir().join(format!("cmdbot-{}", uuid::Uuid::new_v4()));
    let line = format!("sleep 3; touch {}", marker.display());
    bot.registry
        .register(Command::external("ext", &line).with_time_limit(Some(1)))
        .unwrap();
    let (ctx, transport) = context(PermissionLevel::User);

    assert_eq!(engine::run(&bot, "ext", &ctx).await, None);
    assert!(transport.sent()[0].contains("took too long"));
    assert_eq!(bot.registry.get("ext").unwrap().times_invoked, 1);

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(!marker.exists(), "process outlived its deadline");
}

#[tokio::test]
async fn test_fast_command_within_limit() {
    let bot = create_test_bot(Config::default());
    bot.registry
        .register(
            Command::native("nap", Sleeper(Duration::from_millis(10))).with_time_limit(Some(2)),
        )
        .unwrap();
    let (ctx, transport) = context(PermissionLevel::User);

    assert_eq!(engine::run(&bot, "nap", &ctx).await.as_deref(), Some("woke up"));
    assert_eq!(transport.sent(), vec!["woke up"]);
}

#[tokio::test]
async fn test_handle_message_routes_and_learns() {
    let bot = create_test_bot(Config::default());
    let (ctx, transport) = context(PermissionLevel::User);

    assert_eq!(bot.handle_message("the cat sat", &ctx).await, None);
    assert_eq!(bot.markov.stats().words, 3);
    assert!(transport.sent().is_empty());

    let out = bot.handle_message("!echo hi @author@", &ctx).await;
    assert_eq!(out.as_deref(), Some("hi max"));
    assert_eq!(bot.markov.stats().words, 3);
}

#[tokio::test]
async fn test_learning_can_be_disabled() {
    let bot = create_test_bot(Config {
        learn: false,
        command_prefix: "?".to_string(),
        ..Config::default()
    });
    let (ctx, _) = context(PermissionLevel::User);

    bot.handle_message("nothing to see", &ctx).await;
    assert!(bot.markov.stats().words == 0);
    assert_eq!(bot.handle_message("?echo ok", &ctx).await.as_deref(), Some("ok"));
}

#[tokio::test]
async fn test_user_commands_compose() {
    let bot = create_test_bot(Config::default());
    let (ctx, transport) = context(PermissionLevel::Mod);

    engine::run(&bot, "addcmd greet hello @arg1@", &ctx).await;
    engine::run(&bot, "subcmd greet on", &ctx).await;
    engine::run(&bot, "addcmd twice $(greet @arg1@) and $[greet @arg2@]", &ctx).await;
    transport.clear();

    let out = engine::run(&bot, "twice ann bo", &ctx).await;
    assert_eq!(out.as_deref(), Some("hello ann and hello bo"));
    assert_eq!(transport.sent(), vec!["hello ann and hello bo"]);
}

#[tokio::test]
async fn test_registry_export_import() {
    let bot = create_test_bot(Config::default());
    let (ctx, _) = context(PermissionLevel::Mod);
    engine::run(&bot, "addcmd greet hello @arg1@", &ctx).await;
    engine::run(&bot, "setperm greet admin", &context(PermissionLevel::Admin).0).await;

    let records = bot.registry.export();
    assert_eq!(records.len(), 2);
    let json = serde_json::to_string(&records).unwrap();

    let fresh = create_test_bot(Config::default());
    let loaded = fresh.registry.import(serde_json::from_str(&json).unwrap());
    assert_eq!(loaded, 2);
    let greet = fresh.registry.get("greet").unwrap();
    assert_eq!(greet.permission, PermissionLevel::Admin);
    assert_eq!(greet.implementation.body(), Some("hello @arg1@"));
}
