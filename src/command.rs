//! Command definitions
//!
//! A [`Command`] is a named, permissioned unit of behavior. What it does is
//! decided by its [`Implementation`]: a native Rust function, a message
//! template, or an external process command line.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::CommandResult;
use crate::permissions::{PermissionLevel, PlatformSet};
use crate::state::BotState;

/// A command implemented in Rust
///
/// The function receives the (possibly expanded) token vector, with the
/// command name at index 0, and is responsible for its own reply.
#[async_trait]
pub trait NativeCommand: Send + Sync {
    async fn call(
        &self,
        state: &BotState,
        args: Vec<String>,
        ctx: &Context,
    ) -> CommandResult<Option<String>>;
}

/// How a command is carried out
#[derive(Clone)]
pub enum Implementation {
    /// Bound Rust function
    Native(Arc<dyn NativeCommand>),
    /// Message template, expanded and sent as the reply
    Template(String),
    /// Shell command line, expanded in safe mode and executed
    External(String),
}

impl Implementation {
    pub fn kind(&self) -> ImplementationKind {
        match self {
            Implementation::Native(_) => ImplementationKind::Native,
            Implementation::Template(_) => ImplementationKind::Template,
            Implementation::External(_) => ImplementationKind::External,
        }
    }

    /// Backing text of template and external commands
    pub fn body(&self) -> Option<&str> {
        match self {
            Implementation::Native(_) => None,
            Implementation::Template(body) | Implementation::External(body) => Some(body),
        }
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Implementation::Native(_) => f.write_str("Native(..)"),
            Implementation::Template(body) => f.debug_tuple("Template").field(body).finish(),
            Implementation::External(body) => f.debug_tuple("External").field(body).finish(),
        }
    }
}

/// Implementation kind without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImplementationKind {
    Native,
    Template,
    External,
}

impl ImplementationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImplementationKind::Native => "native",
            ImplementationKind::Template => "template",
            ImplementationKind::External => "external",
        }
    }
}

/// A registered command
#[derive(Debug, Clone)]
pub struct Command {
    /// Owning feature group, None for user-added commands
    pub module: Option<String>,
    pub name: String,
    pub permission: PermissionLevel,
    pub implementation: Implementation,
    pub platforms: PlatformSet,
    /// May be nested inside other commands as `$(name ...)`
    pub subcommand: bool,
    /// Skip placeholder/subcommand expansion of the command line
    pub postpone_expansion: bool,
    /// Wall-clock limit for expansion plus dispatch (None = unlimited)
    pub time_limit: Option<u64>,
    pub times_invoked: u64,
    /// One-line help text
    pub description: String,
}

impl Command {
    fn new(name: &str, implementation: Implementation) -> Self {
        Self {
            module: None,
            name: name.to_string(),
            permission: PermissionLevel::User,
            implementation,
            platforms: PlatformSet::all(),
            subcommand: false,
            postpone_expansion: false,
            time_limit: None,
            times_invoked: 0,
            description: String::new(),
        }
    }

    /// Command backed by a Rust function
    pub fn native(name: &str, function: impl NativeCommand + 'static) -> Self {
        Self::new(name, Implementation::Native(Arc::new(function)))
    }

    /// Command replying with an expanded template
    pub fn template(name: &str, template: &str) -> Self {
        Self::new(name, Implementation::Template(template.to_string()))
    }

    /// Command running an external process
    pub fn external(name: &str, command_line: &str) -> Self {
        Self::new(name, Implementation::External(command_line.to_string()))
    }

    pub fn with_module(mut self, module: &str) -> Self {
        self.module = Some(module.to_string());
        self
    }

    pub fn with_permission(mut self, permission: PermissionLevel) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_platforms(mut self, platforms: PlatformSet) -> Self {
        self.platforms = platforms;
        self
    }

    pub fn as_subcommand(mut self) -> Self {
        self.subcommand = true;
        self
    }

    pub fn postponed(mut self) -> Self {
        self.postpone_expansion = true;
        self
    }

    pub fn with_time_limit(mut self, seconds: Option<u64>) -> Self {
        self.time_limit = seconds;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn kind(&self) -> ImplementationKind {
        self.implementation.kind()
    }

    /// Time limit in the `-1 = unlimited` convention
    pub fn time_limit_secs(&self) -> i64 {
        self.time_limit.map(|s| s as i64).unwrap_or(-1)
    }
}

/// Serializable form of a user-defined command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub name: String,
    #[serde(default)]
    pub module: Option<String>,
    pub kind: ImplementationKind,
    pub body: String,
    #[serde(default)]
    pub permission: PermissionLevel,
    #[serde(default)]
    pub platforms: PlatformSet,
    #[serde(default)]
    pub subcommand: bool,
    #[serde(default)]
    pub postpone_expansion: bool,
    #[serde(default)]
    pub time_limit: Option<u64>,
    #[serde(default)]
    pub times_invoked: u64,
    #[serde(default)]
    pub description: String,
}

impl CommandRecord {
    /// Record for a template or external command, None for native ones
    pub fn from_command(cmd: &Command) -> Option<Self> {
        let body = cmd.implementation.body()?.to_string();
        Some(Self {
            name: cmd.name.clone(),
            module: cmd.module.clone(),
            kind: cmd.kind(),
            body,
            permission: cmd.permission,
            platforms: cmd.platforms,
            subcommand: cmd.subcommand,
            postpone_expansion: cmd.postpone_expansion,
            time_limit: cmd.time_limit,
            times_invoked: cmd.times_invoked,
            description: cmd.description.clone(),
        })
    }

    /// Rebuild the command, None for native records (they are rebound at startup)
    pub fn into_command(self) -> Option<Command> {
        let implementation = match self.kind {
            ImplementationKind::Native => return None,
            ImplementationKind::Template => Implementation::Template(self.body),
            ImplementationKind::External => Implementation::External(self.body),
        };
        Some(Command {
            module: self.module,
            name: self.name,
            permission: self.permission,
            implementation,
            platforms: self.platforms,
            subcommand: self.subcommand,
            postpone_expansion: self.postpone_expansion,
            time_limit: self.time_limit,
            times_invoked: self.times_invoked,
            description: self.description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Platform;

    #[test]
    fn test_builder() {
        let cmd = Command::template("hi", "hello @author@")
            .with_permission(PermissionLevel::Mod)
            .with_platforms(PlatformSet::only(Platform::Discord))
            .as_subcommand()
            .with_time_limit(Some(5));

        assert_eq!(cmd.kind(), ImplementationKind::Template);
        assert_eq!(cmd.implementation.body(), Some("hello @author@"));
        assert_eq!(cmd.permission, PermissionLevel::Mod);
        assert!(cmd.subcommand);
        assert!(!cmd.platforms.contains(Platform::Console));
        assert_eq!(cmd.time_limit_secs(), 5);
        assert_eq!(Command::external("x", "date").time_limit_secs(), -1);
    }

    #[test]
    fn test_record_keeps_counters() {
        let mut cmd = Command::external("date", "date +%s").with_module("custom");
        cmd.times_invoked = 7;

        let record = CommandRecord::from_command(&cmd).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let back: CommandRecord = serde_json::from_str(&json).unwrap();
        let rebuilt = back.into_command().unwrap();

        assert_eq!(rebuilt.kind(), ImplementationKind::External);
        assert_eq!(rebuilt.times_invoked, 7);
        assert_eq!(rebuilt.module.as_deref(), Some("custom"));
    }
}
