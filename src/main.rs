//! cmdbot - Entry Point
//!
//! Runs the command engine against a console transport: every stdin line is
//! handled as an inbound chat message and replies are printed to stdout.
//! Logs go to stderr.

use async_trait::async_trait;
use cmdbot::{
    BotState, CommandResult, Config, Context, MessageHandle, PermissionLevel, Platform, Transport,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Transport for the interactive console
struct ConsoleTransport {
    author: String,
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn platform(&self) -> Platform {
        Platform::Console
    }

    async fn send_message(&self, text: &str) -> CommandResult<MessageHandle> {
        println!("{}", text);
        Ok(MessageHandle(uuid::Uuid::new_v4().to_string()))
    }

    fn message_author(&self) -> String {
        self.author.clone()
    }

    fn message_author_id(&self) -> String {
        self.author.clone()
    }

    fn channel_name(&self) -> String {
        "console".to_string()
    }

    fn channel_id(&self) -> String {
        "console".to_string()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Parse args
    let args: Vec<String> = std::env::args().collect();
    let help_mode = args.iter().any(|a| a == "--help" || a == "-h");
    let json_logs = args.iter().any(|a| a == "--json-logs");
    let permission = args
        .iter()
        .position(|a| a == "--level" || a == "-l")
        .and_then(|i| args.get(i + 1))
        .map(|level| {
            PermissionLevel::parse(level)
                .ok_or_else(|| anyhow::anyhow!("unknown permission level {:?}", level))
        })
        .transpose()?
        .unwrap_or(PermissionLevel::Admin);

    if help_mode {
        println!("cmdbot v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: cmdbot [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --level, -l <LEVEL>  Console user level: user|mod|admin (default: admin)");
        println!("  --json-logs          Log to stderr as JSON");
        println!("  --help, -h           Show this help");
        println!();
        println!("Environment variables:");
        println!("  CMDBOT_PREFIX                Command prefix (default: !)");
        println!("  CMDBOT_MAX_DEPTH             Maximum subcommand nesting (default: 16)");
        println!("  CMDBOT_DEFAULT_TIME_LIMIT    Added command limit, -1 for none (default: -1)");
        println!("  CMDBOT_PROCESS_TIMEOUT       Process timeout in seconds (default: 30)");
        println!("  CMDBOT_PROCESS_MAX_OUTPUT    Process output cap in bytes (default: 65536)");
        println!("  CMDBOT_MARKOV_SEED_ATTEMPTS  Draws spent on a seed word (default: 100)");
        println!("  CMDBOT_MARKOV_MAX_WORDS      Longest generated sentence (default: 200)");
        println!("  CMDBOT_LEARN                 Learn from non-command messages (default: true)");
        return Ok(());
    }

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::WARN);

    // stdout belongs to the console transport
    if json_logs {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    info!("cmdbot v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let state = BotState::new(config);
    if state.markov.check() {
        info!("Markov model consistent ({} words)", state.markov.stats().words);
    }
    let author = std::env::var("USER").unwrap_or_else(|_| "console".to_string());
    let ctx = Context::new(Arc::new(ConsoleTransport { author }), permission);
    info!("Console ready at {} level, prefix {:?}", permission, state.config.command_prefix);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    state.handle_message(&line, &ctx).await;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    let stats = state.markov.stats();
    info!(
        "Shutting down: {} commands, {} learned words",
        state.registry.len(),
        stats.words
    );
    Ok(())
}
