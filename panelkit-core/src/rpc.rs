use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::disposable::Disposable;
use crate::host::{MessageChannel, MessageListener, Panel, ProtocolServer};
use crate::protocol::LiveProtocol;

// ---------------------------------------------------------------------------
// Messages: UI → backend (posted by the webview script)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UiMessage {
    Request {
        id: u64,
        method: String,
        #[serde(default)]
        params: serde_json::Value,
    },
    /// Close the panel from inside the UI.
    Dispose,
}

// ---------------------------------------------------------------------------
// Messages: backend → UI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BackendMessage {
    Response {
        id: u64,
        result: serde_json::Value,
    },
    Error {
        id: u64,
        message: String,
    },
    Event {
        name: String,
        payload: serde_json::Value,
    },
}

/// Serves a [`LiveProtocol`] over a panel's message channel using
/// request ids to pair replies with calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRpcServer;

impl JsonRpcServer {
    pub fn new() -> Self {
        Self
    }
}

impl ProtocolServer for JsonRpcServer {
    fn register(
        &self,
        panel: &Arc<dyn Panel>,
        protocol: LiveProtocol,
    ) -> Result<Disposable, String> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            log::error!("Cannot serve webview protocol outside a tokio runtime: {}", e);
            format!("No async runtime available to serve webview protocol: {}", e)
        })?;

        let channel = panel.channel();
        let protocol = Arc::new(protocol);
        let mut subscriptions = Vec::new();

        // Listeners hold the channel until the returned Disposable detaches
        // them; hosts may hand out a fresh channel handle per call
        for (name, emitter) in protocol.events() {
            let channel = channel.clone();
            let event = name.to_string();
            subscriptions.push(emitter.subscribe(Arc::new(move |payload: &serde_json::Value| {
                post(
                    channel.as_ref(),
                    &BackendMessage::Event {
                        name: event.clone(),
                        payload: payload.clone(),
                    },
                );
            })));
        }

        let reply_channel = channel.clone();
        let weak_panel = Arc::downgrade(panel);
        let dispatch = protocol.clone();
        let listener: MessageListener = Arc::new(move |raw: serde_json::Value| {
            let message = match serde_json::from_value::<UiMessage>(raw) {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("Ignoring malformed webview message: {}", e);
                    return;
                }
            };
            match message {
                UiMessage::Request { id, method, params } => {
                    let channel = reply_channel.clone();
                    let protocol = dispatch.clone();
                    runtime.spawn(async move {
                        let reply = match protocol.call(&method, params).await {
                            Ok(result) => BackendMessage::Response { id, result },
                            Err(message) => {
                                log::warn!("Webview command '{}' failed: {}", method, message);
                                BackendMessage::Error { id, message }
                            }
                        };
                        post(channel.as_ref(), &reply);
                    });
                }
                UiMessage::Dispose => {
                    if let Some(panel) = weak_panel.upgrade() {
                        panel.dispose();
                    }
                }
            }
        });
        subscriptions.push(channel.on_message(listener));

        log::debug!(
            "Registered webview protocol: commands={:?} events={:?}",
            protocol.command_names(),
            protocol.event_names()
        );
        Ok(Disposable::from_all(subscriptions))
    }
}

fn post(channel: &dyn MessageChannel, message: &BackendMessage) {
    let value = match serde_json::to_value(message) {
        Ok(v) => v,
        Err(e) => {
            log::error!("Failed to serialize BackendMessage: {}", e);
            return;
        }
    };
    if let Err(e) = channel.post_message(value) {
        log::warn!("Failed to post message to webview: {}", e);
    }
}
