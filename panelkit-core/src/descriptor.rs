use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::host::PanelOptions;
use crate::protocol::{BoxFuture, CommandTable, RESERVED_NAMES};

/// Advisory pre-check run on the initial data before the panel opens.
/// `Err` aborts `show()`; `Ok(false)` is logged but does not block.
pub type DataValidator<D> = Arc<dyn Fn(Option<D>) -> BoxFuture<Result<bool, String>> + Send + Sync>;

/// Gate on a submitted result. Only `Ok(true)` ends the session.
pub type SubmitValidator<R> = Arc<dyn Fn(R) -> BoxFuture<Result<bool, String>> + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Static declaration of a webview: identity, UI resources, commands,
/// events and validation hooks. Immutable once built.
pub struct WebviewDescriptor<D, R> {
    pub(crate) options: PanelOptions,
    pub(crate) commands: Option<CommandTable>,
    pub(crate) events: BTreeMap<String, EventDescriptor>,
    pub(crate) validate_data: Option<DataValidator<D>>,
    pub(crate) validate_submit: Option<SubmitValidator<R>>,
}

impl<D, R> WebviewDescriptor<D, R>
where
    D: Clone + Send + 'static,
    R: DeserializeOwned + Clone + Send + 'static,
{
    pub fn builder(id: &str, name: &str, webview_js: &str) -> DescriptorBuilder<D, R> {
        DescriptorBuilder {
            options: PanelOptions {
                id: id.to_string(),
                name: name.to_string(),
                webview_js: webview_js.to_string(),
                scripts: Vec::new(),
                styles: Vec::new(),
                retain_context_when_hidden: false,
            },
            commands: None,
            events: BTreeMap::new(),
            validate_data: None,
            validate_submit: None,
        }
    }
}

impl<D, R> WebviewDescriptor<D, R> {
    pub fn options(&self) -> &PanelOptions {
        &self.options
    }

    pub fn id(&self) -> &str {
        &self.options.id
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn commands(&self) -> Option<&CommandTable> {
        self.commands.as_ref()
    }

    pub fn events(&self) -> &BTreeMap<String, EventDescriptor> {
        &self.events
    }

    pub fn has_data_validator(&self) -> bool {
        self.validate_data.is_some()
    }

    pub fn has_submit_validator(&self) -> bool {
        self.validate_submit.is_some()
    }
}

impl<D, R> std::fmt::Debug for WebviewDescriptor<D, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebviewDescriptor")
            .field("options", &self.options)
            .field("commands", &self.commands)
            .field("events", &self.events)
            .field("validate_data", &self.validate_data.is_some())
            .field("validate_submit", &self.validate_submit.is_some())
            .finish()
    }
}

pub struct DescriptorBuilder<D, R> {
    options: PanelOptions,
    commands: Option<CommandTable>,
    events: BTreeMap<String, EventDescriptor>,
    validate_data: Option<DataValidator<D>>,
    validate_submit: Option<SubmitValidator<R>>,
}

impl<D, R> DescriptorBuilder<D, R>
where
    D: Clone + Send + 'static,
    R: DeserializeOwned + Clone + Send + 'static,
{
    /// Additional script loaded before the main bundle.
    pub fn script(mut self, name: &str) -> Self {
        self.options.scripts.push(name.to_string());
        self
    }

    pub fn style(mut self, name: &str) -> Self {
        self.options.styles.push(name.to_string());
        self
    }

    pub fn retain_context_when_hidden(mut self, retain: bool) -> Self {
        self.options.retain_context_when_hidden = retain;
        self
    }

    /// Declare a command table, even an empty one. Without any declared
    /// commands no protocol is registered for the panel.
    pub fn commands(mut self, table: CommandTable) -> Self {
        self.commands = Some(table);
        self
    }

    pub fn command<A, T, F, Fut>(mut self, name: &str, handler: F) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        T: Serialize + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, String>> + Send + 'static,
    {
        self.commands
            .get_or_insert_with(CommandTable::new)
            .register(name, handler);
        self
    }

    pub fn event(mut self, name: &str) -> Self {
        self.events
            .insert(name.to_string(), EventDescriptor::default());
        self
    }

    pub fn event_with(mut self, name: &str, descriptor: EventDescriptor) -> Self {
        self.events.insert(name.to_string(), descriptor);
        self
    }

    pub fn validate_data<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Option<D>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, String>> + Send + 'static,
    {
        self.validate_data = Some(Arc::new(
            move |data: Option<D>| -> BoxFuture<Result<bool, String>> { Box::pin(hook(data)) },
        ));
        self
    }

    pub fn validate_submit<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(R) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, String>> + Send + 'static,
    {
        self.validate_submit = Some(Arc::new(
            move |result: R| -> BoxFuture<Result<bool, String>> { Box::pin(hook(result)) },
        ));
        self
    }

    pub fn build(self) -> Result<WebviewDescriptor<D, R>, String> {
        let id = self.options.id.as_str();
        if id.is_empty() {
            return Err("Webview id must not be empty".to_string());
        }
        if !id.chars().all(is_id_char) {
            return Err(format!(
                "Invalid webview id '{}': only letters, digits, '.', '_' and '-' are allowed",
                id
            ));
        }
        if self.options.name.trim().is_empty() {
            return Err(format!("Webview '{}' must have a display name", id));
        }
        if self.options.webview_js.trim().is_empty() {
            return Err(format!("Webview '{}' has no UI entry script", id));
        }

        let mut seen: BTreeSet<&str> = RESERVED_NAMES.iter().copied().collect();
        let command_names = self.commands.iter().flat_map(|t| t.names());
        for name in command_names.chain(self.events.keys().map(String::as_str)) {
            if !seen.insert(name) {
                return Err(format!(
                    "Webview '{}' declares '{}' more than once or shadows a built-in",
                    id, name
                ));
            }
        }

        Ok(WebviewDescriptor {
            options: self.options,
            commands: self.commands,
            events: self.events,
            validate_data: self.validate_data,
            validate_submit: self.validate_submit,
        })
    }
}

// Ids become host view types, which must be plain identifiers
fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}
