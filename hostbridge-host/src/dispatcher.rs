use std::collections::HashMap;
use std::sync::Arc;

use hostbridge_core::{codec, Value};

/// Outcome of a host command: response text, or the message to reject with.
pub type HostResult = Result<String, String>;

/// A command implementation over raw payload text.
pub type CommandHandler = Arc<dyn Fn(&str) -> HostResult + Send + Sync + 'static>;

pub fn unknown_command(command: &str) -> String {
    format!("Unknown command: {command}")
}

/// Registry of the commands a host answers.
///
/// Registering a name again replaces the earlier handler.
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: HashMap<String, CommandHandler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler over raw payload text.
    pub fn register<F>(&mut self, command: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&str) -> HostResult + Send + Sync + 'static,
    {
        let command = command.into();
        if self.handlers.insert(command.clone(), Arc::new(handler)).is_some() {
            log::debug!("replaced handler for '{command}'");
        }
        self
    }

    /// Register a handler over structured values.
    ///
    /// The payload is decoded before the handler runs and the result is
    /// encoded canonically. An empty payload decodes to `null`.
    pub fn register_json<F>(&mut self, command: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        let command = command.into();
        let name = command.clone();
        self.register(command, move |payload: &str| {
            let value = if payload.trim().is_empty() {
                Value::Null
            } else {
                codec::decode(payload).map_err(|e| format!("invalid payload for '{name}': {e}"))?
            };
            let result = handler(value)?;
            codec::encode(&result).map_err(|e| format!("'{name}' produced an unencodable result: {e}"))
        })
    }

    /// Builder form of [`Dispatcher::register_json`].
    pub fn command<F>(mut self, command: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.register_json(command, handler);
        self
    }

    pub fn handler(&self, command: &str) -> Option<CommandHandler> {
        self.handlers.get(command).cloned()
    }

    /// Run `command` on the calling thread.
    pub fn dispatch(&self, command: &str, payload: &str) -> HostResult {
        match self.handlers.get(command) {
            Some(handler) => handler(payload),
            None => Err(unknown_command(command)),
        }
    }

    pub fn contains(&self, command: &str) -> bool {
        self.handlers.contains_key(command)
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
