//! Capabilities the embedding IDE provides: panels, their messaging
//! channels, and the server that exposes a protocol over a channel.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::disposable::Disposable;
use crate::protocol::LiveProtocol;

pub type MessageListener = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

/// Identity and resources of a webview, as handed to the panel factory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelOptions {
    pub id: String,
    pub name: String,
    /// Main UI bundle, relative to the bundle directory.
    pub webview_js: String,
    #[serde(default)]
    pub scripts: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub retain_context_when_hidden: bool,
}

/// Bidirectional message pipe between backend and the rendered UI.
pub trait MessageChannel: Send + Sync {
    fn post_message(&self, message: serde_json::Value) -> Result<(), String>;
    fn on_message(&self, listener: MessageListener) -> Disposable;
}

/// A host-owned embedded UI surface.
pub trait Panel: Send + Sync {
    /// Register a callback for when the panel closes, by the user or via
    /// [`Panel::dispose`]. Hosts fire each listener at most once.
    fn on_dispose(&self, listener: Box<dyn FnOnce() + Send>) -> Disposable;
    /// Close the panel. Calling this on an already disposed panel is a no-op.
    fn dispose(&self);
    fn set_title(&self, title: &str);
    fn set_html(&self, html: &str);
    /// Message channel to the panel's UI. Each call may return a new handle
    /// onto the same channel.
    fn channel(&self) -> Arc<dyn MessageChannel>;
    /// Map a file under one of the panel's resource roots to a URI the
    /// panel is allowed to load.
    fn resolve_local_resource_uri(&self, path: &Path) -> Url;
    /// Origin token to place in the document's content-security-policy.
    fn csp_source(&self) -> String;
}

pub trait PanelFactory: Send + Sync {
    fn create_panel(
        &self,
        options: &PanelOptions,
        context: &ExtensionContext,
    ) -> Result<Arc<dyn Panel>, String>;
}

/// Binds every command and event of a protocol onto a panel's channel.
pub trait ProtocolServer: Send + Sync {
    fn register(&self, panel: &Arc<dyn Panel>, protocol: LiveProtocol)
        -> Result<Disposable, String>;
}

/// Backend execution context a webview instance is bound to.
#[derive(Clone)]
pub struct ExtensionContext {
    extension_path: PathBuf,
    panels: Arc<dyn PanelFactory>,
    server: Arc<dyn ProtocolServer>,
}

impl ExtensionContext {
    pub fn new(
        extension_path: impl Into<PathBuf>,
        panels: Arc<dyn PanelFactory>,
        server: Arc<dyn ProtocolServer>,
    ) -> Self {
        Self {
            extension_path: extension_path.into(),
            panels,
            server,
        }
    }

    pub fn extension_path(&self) -> &Path {
        &self.extension_path
    }

    pub fn panels(&self) -> &Arc<dyn PanelFactory> {
        &self.panels
    }

    pub fn server(&self) -> &Arc<dyn ProtocolServer> {
        &self.server
    }
}

impl std::fmt::Debug for ExtensionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionContext")
            .field("extension_path", &self.extension_path)
            .finish_non_exhaustive()
    }
}
