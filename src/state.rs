//! Shared bot state
//!
//! One [`BotState`] per process, handed explicitly to the engine and to every
//! native command. It owns the command registry, the Markov model and the
//! process-execution capability.

use std::sync::Arc;
use tracing::debug;

use crate::builtins;
use crate::config::Config;
use crate::context::Context;
use crate::engine;
use crate::markov::{GenerateOptions, MarkovChain};
use crate::process::{ProcessRunner, ShellConfig, ShellRunner};
use crate::registry::CommandRegistry;

/// Process-wide state
pub struct BotState {
    pub config: Config,
    pub registry: CommandRegistry,
    pub markov: MarkovChain,
    runner: Arc<dyn ProcessRunner>,
}

impl BotState {
    /// State with every built-in command registered
    pub fn new(config: Config) -> Self {
        let state = Self::bare(config);
        builtins::register_all(&state.registry);
        state
    }

    /// State with an empty registry
    pub fn bare(config: Config) -> Self {
        let runner = ShellRunner::new(ShellConfig {
            timeout_secs: config.process_timeout_secs,
            max_output_bytes: config.process_max_output_bytes,
        });
        let markov = MarkovChain::new(GenerateOptions {
            seed_attempts: config.markov_seed_attempts,
            max_words: config.markov_max_words,
        });

        Self {
            config,
            registry: CommandRegistry::new(),
            markov,
            runner: Arc::new(runner),
        }
    }

    /// Swap the process-execution capability
    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn runner(&self) -> &dyn ProcessRunner {
        self.runner.as_ref()
    }

    /// Handle one inbound chat message
    ///
    /// Prefixed messages run as commands; everything else is learned by the
    /// Markov model when learning is enabled.
    pub async fn handle_message(&self, text: &str, ctx: &Context) -> Option<String> {
        match text.strip_prefix(self.config.command_prefix.as_str()) {
            Some(line) => engine::run(self, line, ctx).await,
            None => {
                if self.config.learn {
                    let words = self.markov.add_string(text);
                    debug!("Learned {} words", words);
                }
                None
            }
        }
    }
}

impl std::fmt::Debug for BotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotState")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("markov", &self.markov)
            .finish()
    }
}
