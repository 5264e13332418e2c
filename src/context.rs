//! Execution context and transport capability
//!
//! The core never talks to a chat platform directly. Each adapter implements
//! [`Transport`], and every invocation gets a [`Context`] wrapping it together
//! with the caller's permission level and the silent flag.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

use crate::error::CommandResult;
use crate::permissions::{PermissionLevel, Platform};

/// Opaque id of a delivered message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub String);

/// Platform adapter capability, one per inbound message
#[async_trait]
pub trait Transport: Send + Sync {
    /// Platform this message arrived on
    fn platform(&self) -> Platform;

    /// Deliver a reply to the channel the message came from
    async fn send_message(&self, text: &str) -> CommandResult<MessageHandle>;

    /// Display name of the author
    fn message_author(&self) -> String;

    /// Platform id of the author
    fn message_author_id(&self) -> String;

    fn channel_name(&self) -> String;

    fn channel_id(&self) -> String;

    /// Server (guild) name, only meaningful on platforms with servers
    fn server_name(&self) -> Option<String> {
        None
    }

    /// Neutralize mentions so replies cannot ping everyone
    fn disable_pings(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Per-invocation context
#[derive(Clone)]
pub struct Context {
    transport: Arc<dyn Transport>,
    permission: PermissionLevel,
    silent: bool,
    depth: usize,
}

impl Context {
    pub fn new(transport: Arc<dyn Transport>, permission: PermissionLevel) -> Self {
        Self {
            transport,
            permission,
            silent: false,
            depth: 0,
        }
    }

    /// Child context for a nested subcommand: always silent, one level deeper
    pub fn silenced(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            permission: self.permission,
            silent: true,
            depth: self.depth + 1,
        }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn platform(&self) -> Platform {
        self.transport.platform()
    }

    pub fn permission(&self) -> PermissionLevel {
        self.permission
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Send a reply unless this invocation is silent
    pub async fn reply(&self, text: &str) -> CommandResult<Option<MessageHandle>> {
        if self.silent || text.is_empty() {
            return Ok(None);
        }
        let text = self.transport.disable_pings(text);
        self.transport.send_message(&text).await.map(Some)
    }

    /// Best-effort notice; delivery failures are only logged
    pub async fn notify(&self, text: &str) {
        if let Err(e) = self.reply(text).await {
            warn!("Failed to deliver notice: {}", e);
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("platform", &self.platform())
            .field("permission", &self.permission)
            .field("silent", &self.silent)
            .field("depth", &self.depth)
            .finish()
    }
}

/// Transport that keeps every sent message in memory
#[derive(Debug)]
pub struct BufferTransport {
    platform: Platform,
    author: String,
    channel: String,
    server: Option<String>,
    sent: Mutex<Vec<String>>,
}

impl BufferTransport {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            author: "tester".to_string(),
            channel: "general".to_string(),
            server: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = author.to_string();
        self
    }

    pub fn with_channel(mut self, channel: &str) -> Self {
        self.channel = channel.to_string();
        self
    }

    pub fn with_server(mut self, server: &str) -> Self {
        self.server = Some(server.to_string());
        self
    }

    /// Messages sent so far
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl Transport for BufferTransport {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn send_message(&self, text: &str) -> CommandResult<MessageHandle> {
        let mut sent = self.sent.lock();
        sent.push(text.to_string());
        Ok(MessageHandle(sent.len().to_string()))
    }

    fn message_author(&self) -> String {
        self.author.clone()
    }

    fn message_author_id(&self) -> String {
        format!("{}#id", self.author)
    }

    fn channel_name(&self) -> String {
        self.channel.clone()
    }

    fn channel_id(&self) -> String {
        format!("{}#id", self.channel)
    }

    fn server_name(&self) -> Option<String> {
        self.server.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommandError;

    /// Transport whose deliveries always fail
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ClosedTransport;

    #[async_trait]
    impl Transport for ClosedTransport {
        fn platform(&self) -> Platform {
            Platform::Console
        }

        async fn send_message(&self, _text: &str) -> CommandResult<MessageHandle> {
            Err(CommandError::Delivery("transport closed".to_string()))
        }

        fn message_author(&self) -> String {
            String::new()
        }

        fn message_author_id(&self) -> String {
            String::new()
        }

        fn channel_name(&self) -> String {
            String::new()
        }

        fn channel_id(&self) -> String {
            String::new()
        }
    }

    #[tokio::test]
    async fn test_silenced_child_suppresses_replies() {
        let transport = Arc::new(BufferTransport::new(Platform::Console));
        let ctx = Context::new(transport.clone(), PermissionLevel::User);

        let child = ctx.silenced();
        assert!(child.is_silent());
        assert_eq!(child.depth(), 1);
        assert_eq!(child.reply("hidden").await.unwrap(), None);

        ctx.reply("visible").await.unwrap();
        assert_eq!(transport.sent(), vec!["visible"]);
        assert!(!ctx.is_silent());
    }

    #[tokio::test]
    async fn test_empty_reply_not_sent() {
        let transport = Arc::new(BufferTransport::new(Platform::Console));
        let ctx = Context::new(transport.clone(), PermissionLevel::User);

        assert_eq!(ctx.reply("").await.unwrap(), None);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_notify_swallows_delivery_failure() {
        let ctx = Context::new(Arc::new(ClosedTransport), PermissionLevel::User);
        assert!(ctx.reply("x").await.is_err());
        ctx.notify("x").await;
    }
}
