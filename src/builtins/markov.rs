//! Markov model commands

use async_trait::async_trait;

use super::{required_rest, rest};
use crate::command::NativeCommand;
use crate::context::Context;
use crate::error::{CommandError, CommandResult};
use crate::state::BotState;

/// Words shown by `markovfind` before truncating
const MAX_LISTED: usize = 50;

/// Reply with `text` and hand it back as the command result
async fn answer(ctx: &Context, text: String) -> CommandResult<Option<String>> {
    ctx.reply(&text).await?;
    Ok(Some(text))
}

fn list_words(words: &[String]) -> String {
    let shown = words.iter().take(MAX_LISTED).map(String::as_str).collect::<Vec<_>>().join(", ");
    if words.len() > MAX_LISTED {
        format!("{} (and {} more)", shown, words.len() - MAX_LISTED)
    } else {
        shown
    }
}

/// `markov [seed]`
pub struct Generate;

#[async_trait]
impl NativeCommand for Generate {
    async fn call(
        &self,
        state: &BotState,
        args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        let seed = args.get(1).map(String::as_str);
        let sentence = state.markov.generate(seed);
        answer(ctx, sentence).await
    }
}

/// `markovfind <regex>`
pub struct FindWords;

#[async_trait]
impl NativeCommand for FindWords {
    async fn call(
        &self,
        state: &BotState,
        args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        let pattern = required_rest(&args, 1, "markovfind <regex>")?;
        let words = state.markov.find_words(&pattern)?;
        let text = if words.is_empty() {
            format!("No words match {}", pattern)
        } else {
            format!("{} words: {}", words.len(), list_words(&words))
        };
        answer(ctx, text).await
    }
}

/// `markovdel <regex>`, followed by a collection pass
pub struct DeleteWords;

#[async_trait]
impl NativeCommand for DeleteWords {
    async fn call(
        &self,
        state: &BotState,
        args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        let pattern = required_rest(&args, 1, "markovdel <regex>")?;
        let deleted = state.markov.del_words(&pattern)?;
        let collected = state.markov.gc();
        let text = format!(
            "Deleted {} words, collected {} unreachable words",
            deleted.len(),
            collected.len()
        );
        answer(ctx, text).await
    }
}

/// `markovgc`
pub struct CollectGarbage;

#[async_trait]
impl NativeCommand for CollectGarbage {
    async fn call(
        &self,
        state: &BotState,
        _args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        let collected = state.markov.gc();
        let text = if collected.is_empty() {
            "Nothing to collect".to_string()
        } else {
            format!("Collected {} words: {}", collected.len(), list_words(&collected))
        };
        answer(ctx, text).await
    }
}

/// `markovcheck`
pub struct Check;

#[async_trait]
impl NativeCommand for Check {
    async fn call(
        &self,
        state: &BotState,
        _args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        let text = if state.markov.check() {
            "Markov model is consistent"
        } else {
            "Markov model was inconsistent and has been repaired"
        };
        answer(ctx, text.to_string()).await
    }
}

/// `markovstats`
pub struct Stats;

#[async_trait]
impl NativeCommand for Stats {
    async fn call(
        &self,
        state: &BotState,
        args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>> {
        let stats = state.markov.stats();
        let text = if rest(&args, 1) == "json" {
            serde_json::to_string(&stats).map_err(|e| CommandError::invalid(e.to_string()))?
        } else {
            format!(
                "{} words, {} edges, learned from {} messages",
                stats.words, stats.edges, stats.messages
            )
        };
        answer(ctx, text).await
    }
}
