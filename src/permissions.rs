//! Permission levels and platform scoping
//!
//! Commands carry a minimum [`PermissionLevel`] and the set of platforms they
//! are enabled on:
//! - **User**: anyone who can talk to the bot
//! - **Mod**: channel moderators
//! - **Admin**: bot owners

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission level of a caller or a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    #[default]
    User,
    Mod,
    Admin,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::User => "user",
            PermissionLevel::Mod => "mod",
            PermissionLevel::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(PermissionLevel::User),
            "mod" | "moderator" => Some(PermissionLevel::Mod),
            "admin" | "owner" => Some(PermissionLevel::Admin),
            _ => None,
        }
    }

    /// Whether a caller at this level may run something requiring `required`
    pub fn satisfies(&self, required: PermissionLevel) -> bool {
        *self >= required
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chat platforms a command can be enabled on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Discord,
    Telegram,
    Console,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Discord, Platform::Telegram, Platform::Console];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Discord => "discord",
            Platform::Telegram => "telegram",
            Platform::Console => "console",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "discord" => Some(Platform::Discord),
            "telegram" => Some(Platform::Telegram),
            "console" | "repl" => Some(Platform::Console),
            _ => None,
        }
    }

    fn bit(&self) -> u8 {
        match self {
            Platform::Discord => 1,
            Platform::Telegram => 1 << 1,
            Platform::Console => 1 << 2,
        }
    }

    /// Platforms with a notion of servers (guilds)
    pub fn has_servers(&self) -> bool {
        matches!(self, Platform::Discord)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitmask of supported platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformSet(u8);

impl PlatformSet {
    pub fn all() -> Self {
        Platform::ALL.iter().fold(Self::empty(), |set, p| set.with(*p))
    }

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn only(platform: Platform) -> Self {
        Self::empty().with(platform)
    }

    pub fn with(mut self, platform: Platform) -> Self {
        self.insert(platform);
        self
    }

    pub fn contains(&self, platform: Platform) -> bool {
        self.0 & platform.bit() != 0
    }

    pub fn insert(&mut self, platform: Platform) {
        self.0 |= platform.bit();
    }

    pub fn remove(&mut self, platform: Platform) {
        self.0 &= !platform.bit();
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Platform> + '_ {
        Platform::ALL.into_iter().filter(|p| self.contains(*p))
    }
}

impl Default for PlatformSet {
    fn default() -> Self {
        Self::all()
    }
}
