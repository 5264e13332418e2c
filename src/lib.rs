//! cmdbot
//!
//! Command engine for a multi-platform chat bot.
//!
//! # Features
//!
//! - **Commands**: native, template and external-process commands in one registry
//! - **Placeholders**: `@author@`, `@args@`, `@arg2-3@` and friends
//! - **Subcommands**: `$(cmd)`, `$[cmd]`, `` $`cmd` `` and `${cmd}` nest command output
//! - **Permissions**: per-command minimum level and platform set
//! - **Time limits**: per-command deadline covering expansion and dispatch
//! - **Markov model**: word-level text generation learned from chat
//!
//! # Architecture
//!
//! ```text
//! Transport ──► BotState::handle_message ──┬─► engine ──► registry
//!                                          │     │
//!                                          │     ├── placeholder
//!                                          │     ├── subcommand ──► engine (child)
//!                                          │     ├── process (external commands)
//!                                          │     └── builtins ──► markov / registry
//!                                          │
//!                                          └─► markov (learn)
//! ```

pub mod builtins;
pub mod command;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod markov;
pub mod permissions;
pub mod placeholder;
pub mod process;
pub mod registry;
pub mod state;
pub mod subcommand;

pub use command::{Command, CommandRecord, Implementation, ImplementationKind, NativeCommand};
pub use config::Config;
pub use context::{BufferTransport, Context, MessageHandle, Transport};
pub use error::{CommandError, CommandResult, MarkovError, RegistryError};
pub use markov::{MarkovChain, MarkovGraph, MarkovStats};
pub use permissions::{PermissionLevel, Platform, PlatformSet};
pub use process::{ProcessRunner, ShellConfig, ShellRunner};
pub use registry::CommandRegistry;
pub use state::BotState;
