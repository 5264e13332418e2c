//! Subcommand evaluation
//!
//! Rewrites `$(cmd args)`, `$[cmd args]`, `` $`cmd args` `` and `${cmd args}`
//! references with the output of the nested command. References are
//! evaluated innermost-first, left to right, in a single scan: when a closing
//! delimiter completes the innermost open reference, that reference is run in
//! a silent child context and its output is spliced in as literal text.
//!
//! Plain `(`, `[` and `{` inside a reference must balance before its closing
//! delimiter counts. A bare backtick is ordinary text unless it closes a
//! `` $` `` reference, since it cannot be told apart as an opener.
//!
//! Unbalanced or mismatched delimiters never fail; they stay in the output
//! unchanged.

use tracing::debug;

use crate::context::Context;
use crate::engine;
use crate::error::CommandError;
use crate::placeholder::{is_safe, tokenize};
use crate::state::BotState;

const ESCAPE: char = '$';

/// Closing delimiter for an opening one
fn closer(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        '{' => Some('}'),
        '`' => Some('`'),
        _ => None,
    }
}

struct Frame {
    close: char,
    /// Byte offset in the output where the frame's opening text begins
    start: usize,
    /// `$`-prefixed reference rather than a plain bracket
    reference: bool,
}

/// Replace every subcommand reference in `text` with its output
///
/// In safe mode a non-empty output that is not purely alphanumeric is
/// replaced with nothing.
pub async fn expand_subcommands(state: &BotState, text: &str, ctx: &Context, safe: bool) -> String {
    if !text.contains(ESCAPE) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut stack: Vec<Frame> = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if stack.last().is_some_and(|top| top.close == c) {
            let Some(frame) = stack.pop() else { continue };
            if frame.reference {
                // Skip the escape marker and the opening delimiter (both ASCII)
                let line = out[frame.start + 2..].to_string();
                out.truncate(frame.start);
                let value = evaluate(state, &line, ctx, safe).await;
                out.push_str(&value);
            } else {
                out.push(c);
            }
            continue;
        }

        if c == ESCAPE {
            if let Some(close) = chars.peek().copied().and_then(closer) {
                let open = chars.next().unwrap_or_default();
                stack.push(Frame {
                    close,
                    start: out.len(),
                    reference: true,
                });
                out.push(c);
                out.push(open);
                continue;
            }
        }

        if let Some(close) = closer(c).filter(|_| c != '`') {
            stack.push(Frame {
                close,
                start: out.len(),
                reference: false,
            });
        }
        out.push(c);
    }

    out
}

/// Run one referenced command line and return the text to splice in
async fn evaluate(state: &BotState, line: &str, ctx: &Context, safe: bool) -> String {
    let tokens = tokenize(line);
    let Some(name) = tokens.first() else {
        return String::new();
    };

    let Some(cmd) = state.registry.get(name) else {
        ctx.notify(&CommandError::UnknownCommand(name.clone()).to_string()).await;
        return String::new();
    };
    if !cmd.subcommand {
        ctx.notify(&CommandError::NotSubcommand(cmd.name).to_string()).await;
        return String::new();
    }
    if ctx.depth() >= state.config.max_subcommand_depth {
        ctx.notify(&CommandError::DepthExceeded(state.config.max_subcommand_depth).to_string())
            .await;
        return String::new();
    }

    let child = ctx.silenced();
    let value = engine::run(state, line, &child).await.unwrap_or_default();

    if safe && !value.is_empty() && !is_safe(&value) {
        debug!("Dropping unsafe output of subcommand {}", name);
        return String::new();
    }
    value
}
