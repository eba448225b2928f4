use std::collections::HashMap;
use std::sync::{Arc, Weak};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::descriptor::{SubmitValidator, WebviewDescriptor};
use crate::emitter::EventEmitter;
use crate::host::{ExtensionContext, Panel};
use crate::protocol::{BoxFuture, CommandHandler, CommandTable, LiveProtocol, Protocol};
use crate::session::{PendingResult, Resolution, Session};

/// Turn a descriptor into a reusable webview type. No panel is created
/// until [`WebviewInstance::show`].
pub fn compile<D, R>(descriptor: WebviewDescriptor<D, R>) -> WebviewClass<D, R> {
    let protocol = Protocol::new(
        descriptor.commands.iter().flat_map(|t| t.names()),
        descriptor.events.keys().map(String::as_str),
    );
    WebviewClass {
        descriptor: Arc::new(descriptor),
        protocol: Arc::new(protocol),
    }
}

pub struct WebviewClass<D, R> {
    descriptor: Arc<WebviewDescriptor<D, R>>,
    protocol: Arc<Protocol>,
}

impl<D, R> Clone for WebviewClass<D, R> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            protocol: self.protocol.clone(),
        }
    }
}

impl<D, R> WebviewClass<D, R> {
    pub fn descriptor(&self) -> &WebviewDescriptor<D, R> {
        &self.descriptor
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// Bind the webview to a backend context. Every instance gets its own
    /// emitters, one per declared event.
    pub fn instantiate(&self, context: Arc<ExtensionContext>) -> WebviewInstance<D, R> {
        let emitters = self
            .descriptor
            .events
            .keys()
            .map(|name| (name.clone(), Arc::new(EventEmitter::new(name))))
            .collect();
        WebviewInstance {
            descriptor: self.descriptor.clone(),
            protocol: self.protocol.clone(),
            context,
            emitters,
        }
    }
}

impl<D, R> std::fmt::Debug for WebviewClass<D, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebviewClass")
            .field("id", &self.descriptor.id())
            .field("protocol", &self.protocol)
            .finish()
    }
}

pub struct WebviewInstance<D, R> {
    descriptor: Arc<WebviewDescriptor<D, R>>,
    protocol: Arc<Protocol>,
    context: Arc<ExtensionContext>,
    emitters: HashMap<String, Arc<EventEmitter>>,
}

impl<D, R> WebviewInstance<D, R>
where
    D: Serialize + Clone + Send + 'static,
    R: DeserializeOwned + Clone + Send + 'static,
{
    /// Open a panel and wait for it to either submit a result or close.
    pub async fn show(&self, initial_data: Option<D>) -> Result<Option<R>, String> {
        let pending = self.open(initial_data).await?;
        Ok(pending.wait().await)
    }

    /// Open a panel and return the pending result without waiting on it.
    pub async fn open(&self, initial_data: Option<D>) -> Result<PendingResult<R>, String> {
        let desc = &self.descriptor;

        if let Some(validate) = &desc.validate_data {
            if !validate(initial_data.clone()).await? {
                log::warn!(
                    "Initial data for webview '{}' failed validation; opening anyway",
                    desc.id()
                );
            }
        }

        // Serialized up front so `init` always returns exactly what was passed in
        let init_value = serde_json::to_value(&initial_data).map_err(|e| {
            format!(
                "Failed to serialize initial data for webview '{}': {}",
                desc.id(),
                e
            )
        })?;

        let (session, pending) = Session::new();
        let panel = self
            .context
            .panels()
            .create_panel(&desc.options, &self.context)
            .map_err(|e| format!("Failed to create panel '{}': {}", desc.id(), e))?;
        session.mark_open()?;
        log::debug!("Webview '{}' opened session {}", desc.id(), session.id());

        // The panel keeps the session alive until it closes or a submit
        // detaches this observer
        let observed = session.clone();
        let listener = panel.on_dispose(Box::new(move || {
            observed.resolve(Resolution::Disposed);
        }));
        session.set_dispose_listener(listener);

        if let Some(commands) = &desc.commands {
            let protocol = self.live_protocol(commands, &session, &panel, init_value);
            let registration = match self.context.server().register(&panel, protocol) {
                Ok(r) => r,
                Err(e) => {
                    panel.dispose();
                    return Err(format!(
                        "Failed to register protocol for webview '{}': {}",
                        desc.id(),
                        e
                    ));
                }
            };
            // Dropping this handle leaves the release attached to the panel,
            // so the channel bindings live exactly as long as it does
            let _release_on_close = panel.on_dispose(Box::new(move || registration.dispose()));
        }

        Ok(pending)
    }

    fn live_protocol(
        &self,
        commands: &CommandTable,
        session: &Arc<Session<R>>,
        panel: &Arc<dyn Panel>,
        init_value: serde_json::Value,
    ) -> LiveProtocol {
        let init: CommandHandler = Arc::new(
            move |_: serde_json::Value| -> BoxFuture<Result<serde_json::Value, String>> {
                let value = init_value.clone();
                Box::pin(async move { Ok(value) })
            },
        );

        let submit = submit_handler(
            self.descriptor.id().to_string(),
            session.clone(),
            Arc::downgrade(panel),
            self.descriptor.validate_submit.clone(),
        );

        LiveProtocol::builder()
            .init(init)
            .submit(submit)
            .commands(commands)
            .events(&self.emitters)
            .build()
    }
}

impl<D, R> WebviewInstance<D, R> {
    pub fn id(&self) -> &str {
        self.descriptor.id()
    }

    pub fn context(&self) -> &Arc<ExtensionContext> {
        &self.context
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn emitter(&self, event: &str) -> Option<&Arc<EventEmitter>> {
        self.emitters.get(event)
    }

    pub fn emitters(&self) -> &HashMap<String, Arc<EventEmitter>> {
        &self.emitters
    }
}

impl<D, R> std::fmt::Debug for WebviewInstance<D, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebviewInstance")
            .field("id", &self.descriptor.id())
            .field("emitters", &self.emitters.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn submit_handler<R>(
    webview_id: String,
    session: Arc<Session<R>>,
    panel: Weak<dyn Panel>,
    validate: Option<SubmitValidator<R>>,
) -> CommandHandler
where
    R: DeserializeOwned + Clone + Send + 'static,
{
    Arc::new(
        move |params: serde_json::Value| -> BoxFuture<Result<serde_json::Value, String>> {
            let webview_id = webview_id.clone();
            let session = session.clone();
            let panel = panel.clone();
            let validate = validate.clone();
            Box::pin(async move {
                let result: R = serde_json::from_value(params).map_err(|e| {
                    format!("Invalid result submitted to webview '{}': {}", webview_id, e)
                })?;
                if !session.is_open() {
                    return Ok(serde_json::Value::Bool(false));
                }

                let accepted = match &validate {
                    Some(validate) => validate(result.clone()).await?,
                    None => true,
                };
                if !accepted {
                    log::debug!(
                        "Webview '{}' rejected submitted result; session {} stays open",
                        webview_id,
                        session.id()
                    );
                    return Ok(serde_json::Value::Bool(false));
                }

                session.release_dispose_listener();
                if let Some(panel) = panel.upgrade() {
                    panel.dispose();
                }
                let resolved = session.resolve(Resolution::Submitted(result));
                Ok(serde_json::Value::Bool(resolved))
            })
        },
    )
}
