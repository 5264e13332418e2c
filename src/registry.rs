//! Command Registry
//!
//! Process-wide map of command name to definition, plus aliases. All
//! mutations go through a single write lock; readers get cloned snapshots so
//! no lock is ever held while a command runs.

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::command::{Command, CommandRecord, Implementation};
use crate::error::RegistryError;
use crate::permissions::{PermissionLevel, Platform};

type RemoveHook = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Inner {
    commands: HashMap<String, Command>,
    /// alias -> command name
    aliases: HashMap<String, String>,
}

impl Inner {
    fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    fn taken(&self, name: &str) -> bool {
        self.commands.contains_key(name) || self.aliases.contains_key(name)
    }
}

/// Registry of all known commands
#[derive(Default)]
pub struct CommandRegistry {
    inner: RwLock<Inner>,
    remove_hooks: RwLock<Vec<RemoveHook>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new command, failing if the name is taken
    pub fn register(&self, cmd: Command) -> Result<(), RegistryError> {
        validate_name(&cmd.name)?;
        let mut inner = self.inner.write();
        if inner.taken(&cmd.name) {
            return Err(RegistryError::AlreadyExists(cmd.name));
        }
        info!("Command registered: {} ({})", cmd.name, cmd.kind().as_str());
        inner.commands.insert(cmd.name.clone(), cmd);
        Ok(())
    }

    /// Insert or replace a command, returning the previous definition
    pub fn insert(&self, cmd: Command) -> Result<Option<Command>, RegistryError> {
        validate_name(&cmd.name)?;
        let mut inner = self.inner.write();
        inner.aliases.remove(&cmd.name);
        debug!("Command bound: {}", cmd.name);
        Ok(inner.commands.insert(cmd.name.clone(), cmd))
    }

    /// Replace the body of a template or external command
    pub fn update_body(&self, name: &str, body: &str) -> Result<(), RegistryError> {
        self.modify(name, |cmd| {
            cmd.implementation = match &cmd.implementation {
                Implementation::Native(_) => {
                    return Err(RegistryError::NativeImmutable(cmd.name.clone()))
                }
                Implementation::Template(_) => Implementation::Template(body.to_string()),
                Implementation::External(_) => Implementation::External(body.to_string()),
            };
            Ok(())
        })
    }

    /// Delete a command and its aliases, then notify removal hooks
    pub fn remove(&self, name: &str) -> Result<Command, RegistryError> {
        let removed = {
            let mut inner = self.inner.write();
            let key = inner.resolve(name).to_string();
            let removed = inner
                .commands
                .remove(&key)
                .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
            inner.aliases.retain(|_, target| *target != key);
            removed
        };

        info!("Command removed: {}", removed.name);
        for hook in self.remove_hooks.read().iter() {
            hook(&removed.name);
        }
        Ok(removed)
    }

    /// Add an alias for an existing command
    pub fn add_alias(&self, alias: &str, target: &str) -> Result<(), RegistryError> {
        validate_name(alias)?;
        let mut inner = self.inner.write();
        if inner.taken(alias) {
            return Err(RegistryError::AlreadyExists(alias.to_string()));
        }
        let target = inner.resolve(target).to_string();
        if !inner.commands.contains_key(&target) {
            return Err(RegistryError::NotFound(target));
        }
        debug!("Alias added: {} -> {}", alias, target);
        inner.aliases.insert(alias.to_string(), target);
        Ok(())
    }

    pub fn set_permission(&self, name: &str, level: PermissionLevel) -> Result<(), RegistryError> {
        self.modify(name, |cmd| {
            cmd.permission = level;
            Ok(())
        })
    }

    pub fn set_time_limit(&self, name: &str, seconds: Option<u64>) -> Result<(), RegistryError> {
        self.modify(name, |cmd| {
            cmd.time_limit = seconds;
            Ok(())
        })
    }

    pub fn enable_platform(&self, name: &str, platform: Platform) -> Result<(), RegistryError> {
        self.modify(name, |cmd| {
            cmd.platforms.insert(platform);
            Ok(())
        })
    }

    pub fn disable_platform(&self, name: &str, platform: Platform) -> Result<(), RegistryError> {
        self.modify(name, |cmd| {
            cmd.platforms.remove(platform);
            Ok(())
        })
    }

    pub fn set_subcommand(&self, name: &str, eligible: bool) -> Result<(), RegistryError> {
        self.modify(name, |cmd| {
            cmd.subcommand = eligible;
            Ok(())
        })
    }

    /// Bump the invocation counter, returning the new count
    pub fn record_invocation(&self, name: &str) -> Option<u64> {
        let mut inner = self.inner.write();
        let key = inner.resolve(name).to_string();
        let cmd = inner.commands.get_mut(&key)?;
        cmd.times_invoked += 1;
        Some(cmd.times_invoked)
    }

    /// Snapshot of a command by name or alias
    pub fn get(&self, name: &str) -> Option<Command> {
        let inner = self.inner.read();
        inner.commands.get(inner.resolve(name)).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        let inner = self.inner.read();
        inner.commands.contains_key(inner.resolve(name))
    }

    /// Sorted command names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// Aliases pointing at `name`
    pub fn aliases_of(&self, name: &str) -> Vec<String> {
        let inner = self.inner.read();
        let mut aliases: Vec<String> = inner
            .aliases
            .iter()
            .filter(|(_, target)| *target == name)
            .map(|(alias, _)| alias.clone())
            .collect();
        aliases.sort();
        aliases
    }

    pub fn len(&self) -> usize {
        self.inner.read().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Called with the command name whenever a command is deleted
    pub fn on_remove(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        self.remove_hooks.write().push(Box::new(hook));
    }

    /// Serializable records of every template and external command
    pub fn export(&self) -> Vec<CommandRecord> {
        let inner = self.inner.read();
        let mut records: Vec<CommandRecord> =
            inner.commands.values().filter_map(CommandRecord::from_command).collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Load exported records; native records and invalid names are skipped
    pub fn import(&self, records: Vec<CommandRecord>) -> usize {
        let mut loaded = 0;
        for record in records {
            if let Some(cmd) = record.into_command() {
                if self.insert(cmd).is_ok() {
                    loaded += 1;
                }
            }
        }
        info!("Imported {} commands", loaded);
        loaded
    }

    fn modify<F>(&self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut Command) -> Result<(), RegistryError>,
    {
        let mut inner = self.inner.write();
        let key = inner.resolve(name).to_string();
        let cmd = inner
            .commands
            .get_mut(&key)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        f(cmd)?;
        debug!("Command modified: {}", key);
        Ok(())
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.len())
            .field("remove_hooks", &self.remove_hooks.read().len())
            .finish()
    }
}

fn validate_name(name: &str) -> Result<(), RegistryError> {
    let delimiters = ['$', '(', ')', '[', ']', '{', '}', '`', '@'];
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || delimiters.contains(&c)) {
        return Err(RegistryError::InvalidName(name.to_string()));
    }
    Ok(())
}
