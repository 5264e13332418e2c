//! Placeholder expansion
//!
//! Substitutes `@name@` placeholders in a template:
//!
//! | Placeholder       | Value                                   |
//! |-------------------|-----------------------------------------|
//! | `@author@`        | display name of the message author      |
//! | `@authorid@`      | platform id of the author               |
//! | `@channel@`       | channel name                            |
//! | `@channelid@`     | channel id                              |
//! | `@server@`        | server name (platforms with servers)    |
//! | `@command@`       | the whole command line                  |
//! | `@args@`          | every token after the command name      |
//! | `@argN@`          | token N (token 0 is the command name)   |
//! | `@argN-M@`        | tokens N..=M joined by spaces           |
//! | `@argN-@`         | tokens N..=last                         |
//! | `@arg-M@`         | tokens 1..=M                            |
//!
//! Anything that cannot be expanded (unknown name, index out of range) is left
//! as literal text. Substituted values are never re-scanned.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::context::Context;

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@(authorid|author|channelid|channel|server|command|args|arg(\d*)(-)?(\d*))@")
        .expect("placeholder pattern is valid")
});

/// Values allowed through in safe mode
pub static SAFE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("safe pattern is valid"));

/// Whether every whitespace-separated token of `value` is alphanumeric
pub fn is_safe(value: &str) -> bool {
    let mut tokens = value.split_whitespace().peekable();
    tokens.peek().is_some() && tokens.all(|t| SAFE_PATTERN.is_match(t))
}

/// Expand placeholders in `template` for the command line `tokens`
///
/// In safe mode a substitution only happens when every substituted token is
/// alphanumeric; otherwise the placeholder stays in place.
pub fn expand_placeholders(template: &str, tokens: &[String], ctx: &Context, safe: bool) -> String {
    if !template.contains('@') {
        return template.to_string();
    }

    PLACEHOLDER_PATTERN
        .replace_all(template, |caps: &Captures<'_>| {
            let whole = caps[0].to_string();
            match resolve(caps, tokens, ctx) {
                Some(value) if !safe || is_safe(&value) => value,
                _ => whole,
            }
        })
        .into_owned()
}

fn resolve(caps: &Captures<'_>, tokens: &[String], ctx: &Context) -> Option<String> {
    let transport = ctx.transport();
    match &caps[1] {
        "author" => Some(transport.message_author()),
        "authorid" => Some(transport.message_author_id()),
        "channel" => Some(transport.channel_name()),
        "channelid" => Some(transport.channel_id()),
        "server" if ctx.platform().has_servers() => transport.server_name(),
        "server" => None,
        "command" => Some(tokens.join(" ")),
        "args" => Some(tokens.get(1..).map(|rest| rest.join(" ")).unwrap_or_default()),
        _ => resolve_arg(caps, tokens),
    }
}

fn resolve_arg(caps: &Captures<'_>, tokens: &[String]) -> Option<String> {
    let start = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let ranged = caps.get(3).is_some();
    let end = caps.get(4).map(|m| m.as_str()).unwrap_or("");

    if !ranged {
        let index: usize = start.parse().ok()?;
        return tokens.get(index).cloned();
    }

    let last = tokens.len().checked_sub(1)?;
    let (start, end) = match (start.is_empty(), end.is_empty()) {
        (true, true) => return None,
        (false, true) => (start.parse().ok()?, last),
        (true, false) => (1, end.parse().ok()?),
        (false, false) => (start.parse().ok()?, end.parse().ok()?),
    };

    if start < 1 || start > end || end > last {
        return None;
    }
    Some(tokens[start..=end].join(" "))
}

/// Split a command line into tokens
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}
