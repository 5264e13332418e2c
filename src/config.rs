//! Configuration management

use anyhow::Result;

/// Bot configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Prefix that marks a message as a command
    pub command_prefix: String,

    /// Maximum nesting of subcommands before evaluation fails closed
    pub max_subcommand_depth: usize,

    /// Time limit given to user-added commands (None = unlimited)
    pub default_time_limit: Option<u64>,

    /// Timeout for external processes in seconds
    pub process_timeout_secs: u64,

    /// Maximum captured stdout of an external process in bytes
    pub process_max_output_bytes: usize,

    /// How often a seeded generation retries before giving up on the seed
    pub markov_seed_attempts: usize,

    /// Upper bound on generated sentence length
    pub markov_max_words: usize,

    /// Learn from non-command messages
    pub learn: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_prefix: "!".to_string(),
            max_subcommand_depth: 16,
            default_time_limit: None,
            process_timeout_secs: 30,
            process_max_output_bytes: 64 * 1024,
            markov_seed_attempts: 100,
            markov_max_words: 200,
            learn: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let command_prefix = std::env::var("CMDBOT_PREFIX")
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or(defaults.command_prefix);

        let max_subcommand_depth = env_parse("CMDBOT_MAX_DEPTH")?
            .unwrap_or(defaults.max_subcommand_depth);

        let default_time_limit = match env_parse::<i64>("CMDBOT_DEFAULT_TIME_LIMIT")? {
            Some(secs) => parse_time_limit(secs)?,
            None => defaults.default_time_limit,
        };

        let process_timeout_secs = env_parse("CMDBOT_PROCESS_TIMEOUT")?
            .unwrap_or(defaults.process_timeout_secs);

        let process_max_output_bytes = env_parse("CMDBOT_PROCESS_MAX_OUTPUT")?
            .unwrap_or(defaults.process_max_output_bytes);

        let markov_seed_attempts = env_parse("CMDBOT_MARKOV_SEED_ATTEMPTS")?
            .unwrap_or(defaults.markov_seed_attempts);

        let markov_max_words = env_parse("CMDBOT_MARKOV_MAX_WORDS")?
            .unwrap_or(defaults.markov_max_words);

        let learn = std::env::var("CMDBOT_LEARN")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.learn);

        Ok(Self {
            command_prefix,
            max_subcommand_depth,
            default_time_limit,
            process_timeout_secs,
            process_max_output_bytes,
            markov_seed_attempts,
            markov_max_words,
            learn,
        })
    }
}

/// Time limit outside the `-1 or non-negative` range
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("time limit must be -1 or non-negative, got {0}")]
pub struct InvalidTimeLimit(pub i64);

/// Convert the `-1 = unlimited` convention into an optional limit
pub fn parse_time_limit(secs: i64) -> std::result::Result<Option<u64>, InvalidTimeLimit> {
    match secs {
        -1 => Ok(None),
        s if s >= 0 => Ok(Some(s as u64)),
        s => Err(InvalidTimeLimit(s)),
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has invalid value {:?}: {}", key, raw, e)),
        Err(_) => Ok(None),
    }
}
