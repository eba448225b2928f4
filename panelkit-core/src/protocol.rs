use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::emitter::EventEmitter;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

pub type CommandHandler =
    Arc<dyn Fn(serde_json::Value) -> BoxFuture<Result<serde_json::Value, String>> + Send + Sync>;

/// Built-in command the UI calls after first paint to fetch its bootstrap data.
pub const INIT_COMMAND: &str = "init";
/// Built-in command the UI calls to hand back its result and close the panel.
pub const SUBMIT_COMMAND: &str = "submit";

pub const RESERVED_NAMES: &[&str] = &[INIT_COMMAND, SUBMIT_COMMAND];

/// Named command handlers declared by a webview descriptor.
#[derive(Clone, Default)]
pub struct CommandTable {
    handlers: HashMap<String, CommandHandler>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed handler. Arguments are decoded from the JSON
    /// params (`()` for zero-argument commands, which decodes from `null`)
    /// and the return value is encoded back to JSON.
    pub fn register<A, T, F, Fut>(&mut self, name: &str, handler: F)
    where
        A: DeserializeOwned + Send + 'static,
        T: Serialize + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, String>> + Send + 'static,
    {
        let command = name.to_string();
        let handler = Arc::new(handler);
        let raw: CommandHandler = Arc::new(
            move |params: serde_json::Value| -> BoxFuture<Result<serde_json::Value, String>> {
                let args = match serde_json::from_value::<A>(params) {
                    Ok(a) => a,
                    Err(e) => {
                        let msg = format!("Invalid arguments for command '{}': {}", command, e);
                        return Box::pin(async move { Err(msg) });
                    }
                };
                let fut = handler(args);
                let command = command.clone();
                Box::pin(async move {
                    let value = fut.await?;
                    serde_json::to_value(value).map_err(|e| {
                        format!("Failed to serialize result of command '{}': {}", command, e)
                    })
                })
            },
        );
        self.insert(name, raw);
    }

    pub fn insert(&mut self, name: &str, handler: CommandHandler) {
        if self.handlers.insert(name.to_string(), handler).is_some() {
            log::debug!("Command '{}' re-registered, replacing previous handler", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&CommandHandler> {
        self.handlers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("CommandTable").field("commands", &names).finish()
    }
}

/// Static description of what a compiled webview supports: the built-in
/// `init`/`submit` commands, the declared commands, and the declared events.
///
/// Never dispatched through; the live table is [`LiveProtocol`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    pub commands: BTreeSet<String>,
    pub events: BTreeSet<String>,
}

impl Protocol {
    pub fn new<'a>(
        commands: impl IntoIterator<Item = &'a str>,
        events: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut all: BTreeSet<String> = RESERVED_NAMES.iter().map(|s| s.to_string()).collect();
        all.extend(commands.into_iter().map(str::to_string));
        Self {
            commands: all,
            events: events.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains(name)
    }

    pub fn has_event(&self, name: &str) -> bool {
        self.events.contains(name)
    }

    pub fn supports(&self, name: &str) -> bool {
        self.has_command(name) || self.has_event(name)
    }
}

/// The dispatch table registered for one session: command handlers plus
/// the emitters whose events get pushed to the UI.
#[derive(Clone, Default)]
pub struct LiveProtocol {
    commands: HashMap<String, CommandHandler>,
    events: HashMap<String, Arc<EventEmitter>>,
}

impl LiveProtocol {
    pub fn builder() -> ProtocolBuilder {
        ProtocolBuilder::default()
    }

    pub fn command(&self, name: &str) -> Option<&CommandHandler> {
        self.commands.get(name)
    }

    pub fn events(&self) -> impl Iterator<Item = (&str, &Arc<EventEmitter>)> {
        self.events.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn command_names(&self) -> BTreeSet<&str> {
        self.commands.keys().map(String::as_str).collect()
    }

    pub fn event_names(&self) -> BTreeSet<&str> {
        self.events.keys().map(String::as_str).collect()
    }

    /// Invoke a command by name.
    pub async fn call(
        &self,
        name: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, String> {
        let handler = self
            .commands
            .get(name)
            .cloned()
            .ok_or_else(|| format!("Unknown command '{}'", name))?;
        handler(params).await
    }
}

impl std::fmt::Debug for LiveProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveProtocol")
            .field("commands", &self.command_names())
            .field("events", &self.event_names())
            .finish()
    }
}

/// Composes a [`LiveProtocol`]. Built-ins are added last so a declared
/// command can never shadow `init` or `submit`.
#[derive(Default)]
pub struct ProtocolBuilder {
    init: Option<CommandHandler>,
    submit: Option<CommandHandler>,
    commands: HashMap<String, CommandHandler>,
    events: HashMap<String, Arc<EventEmitter>>,
}

impl ProtocolBuilder {
    pub fn init(mut self, handler: CommandHandler) -> Self {
        self.init = Some(handler);
        self
    }

    pub fn submit(mut self, handler: CommandHandler) -> Self {
        self.submit = Some(handler);
        self
    }

    pub fn commands(mut self, table: &CommandTable) -> Self {
        self.commands
            .extend(table.handlers.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn events<'a>(
        mut self,
        emitters: impl IntoIterator<Item = (&'a String, &'a Arc<EventEmitter>)>,
    ) -> Self {
        self.events
            .extend(emitters.into_iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn build(self) -> LiveProtocol {
        let mut commands = self.commands;
        for (name, handler) in [(INIT_COMMAND, self.init), (SUBMIT_COMMAND, self.submit)] {
            if let Some(handler) = handler {
                commands.insert(name.to_string(), handler);
            }
        }
        LiveProtocol {
            commands,
            events: self.events,
        }
    }
}
