//! In-memory stand-ins for the host panel, its channel and the factories.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use url::Url;

use crate::disposable::Disposable;
use crate::host::{
    ExtensionContext, MessageChannel, MessageListener, Panel, PanelFactory, PanelOptions,
    ProtocolServer,
};
use crate::protocol::LiveProtocol;
use crate::rpc::JsonRpcServer;

type Listeners<T> = Arc<Mutex<Vec<(u64, T)>>>;

pub(crate) struct FakeChannel {
    next_id: AtomicU64,
    listeners: Listeners<MessageListener>,
    posted_tx: mpsc::UnboundedSender<serde_json::Value>,
    posted_rx: Mutex<Option<mpsc::UnboundedReceiver<serde_json::Value>>>,
}

impl FakeChannel {
    fn new() -> Arc<Self> {
        let (posted_tx, posted_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            listeners: Arc::new(Mutex::new(Vec::new())),
            posted_tx,
            posted_rx: Mutex::new(Some(posted_rx)),
        })
    }

    /// Simulate the UI posting a message to the backend.
    pub(crate) fn deliver(&self, message: serde_json::Value) {
        let snapshot: Vec<MessageListener> =
            self.listeners.lock().iter().map(|(_, l)| l.clone()).collect();
        for listener in snapshot {
            listener(message.clone());
        }
    }

    pub(crate) fn take_posted(&self) -> mpsc::UnboundedReceiver<serde_json::Value> {
        self.posted_rx.lock().take().expect("posted receiver already taken")
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl MessageChannel for FakeChannel {
    fn post_message(&self, message: serde_json::Value) -> Result<(), String> {
        self.posted_tx.send(message).map_err(|e| e.to_string())
    }

    fn on_message(&self, listener: MessageListener) -> Disposable {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, listener));
        let listeners = Arc::downgrade(&self.listeners);
        Disposable::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.lock().retain(|(lid, _)| *lid != id);
            }
        })
    }
}

pub(crate) struct FakePanel {
    pub(crate) options: PanelOptions,
    channel: Arc<FakeChannel>,
    next_id: AtomicU64,
    dispose_listeners: Listeners<Box<dyn FnOnce() + Send>>,
    disposed: AtomicBool,
}

impl FakePanel {
    pub(crate) fn new(options: PanelOptions) -> Arc<Self> {
        Arc::new(Self {
            options,
            channel: FakeChannel::new(),
            next_id: AtomicU64::new(1),
            dispose_listeners: Arc::new(Mutex::new(Vec::new())),
            disposed: AtomicBool::new(false),
        })
    }

    pub(crate) fn fake_channel(&self) -> &Arc<FakeChannel> {
        &self.channel
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn dispose_listener_count(&self) -> usize {
        self.dispose_listeners.lock().len()
    }

    /// Fire every disposal listener still attached, as the host would if
    /// the user closed the tab. Ignores the disposed flag so tests can
    /// replay a late close event.
    pub(crate) fn emit_dispose(&self) {
        let drained: Vec<_> = self.dispose_listeners.lock().drain(..).collect();
        for (_, listener) in drained {
            listener();
        }
    }
}

impl Panel for FakePanel {
    fn on_dispose(&self, listener: Box<dyn FnOnce() + Send>) -> Disposable {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.dispose_listeners.lock().push((id, listener));
        let listeners = Arc::downgrade(&self.dispose_listeners);
        Disposable::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.lock().retain(|(lid, _)| *lid != id);
            }
        })
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.emit_dispose();
    }

    fn set_title(&self, _title: &str) {}

    fn set_html(&self, _html: &str) {}

    fn channel(&self) -> Arc<dyn MessageChannel> {
        self.channel.clone()
    }

    fn resolve_local_resource_uri(&self, path: &Path) -> Url {
        Url::parse(&format!(
            "panel-resource://{}{}",
            self.options.id,
            path.to_string_lossy()
        ))
        .expect("valid resource url")
    }

    fn csp_source(&self) -> String {
        format!("panel-resource://{}", self.options.id)
    }
}

#[derive(Default)]
pub(crate) struct FakeFactory {
    pub(crate) fail: bool,
    panels: Mutex<Vec<Arc<FakePanel>>>,
}

impl FakeFactory {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn created(&self) -> usize {
        self.panels.lock().len()
    }

    pub(crate) fn last(&self) -> Arc<FakePanel> {
        self.panels.lock().last().cloned().expect("no panel created")
    }
}

impl PanelFactory for FakeFactory {
    fn create_panel(
        &self,
        options: &PanelOptions,
        _context: &ExtensionContext,
    ) -> Result<Arc<dyn Panel>, String> {
        if self.fail {
            return Err(format!("host refused to open '{}'", options.id));
        }
        let panel = FakePanel::new(options.clone());
        self.panels.lock().push(panel.clone());
        Ok(panel)
    }
}

/// Captures registered protocols so tests can call commands directly.
#[derive(Default)]
pub(crate) struct RecordingServer {
    pub(crate) fail: bool,
    protocols: Mutex<Vec<LiveProtocol>>,
    released: Arc<AtomicUsize>,
}

impl RecordingServer {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn registered(&self) -> usize {
        self.protocols.lock().len()
    }

    pub(crate) fn last(&self) -> LiveProtocol {
        self.protocols.lock().last().cloned().expect("no protocol registered")
    }

    pub(crate) fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl ProtocolServer for RecordingServer {
    fn register(
        &self,
        _panel: &Arc<dyn Panel>,
        protocol: LiveProtocol,
    ) -> Result<Disposable, String> {
        if self.fail {
            return Err("channel unavailable".to_string());
        }
        self.protocols.lock().push(protocol);
        let released = self.released.clone();
        Ok(Disposable::new(move || {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

pub(crate) fn context(
    factory: Arc<FakeFactory>,
    server: Arc<dyn ProtocolServer>,
) -> Arc<ExtensionContext> {
    Arc::new(ExtensionContext::new("/ext", factory, server))
}

pub(crate) fn rpc_context(factory: Arc<FakeFactory>) -> Arc<ExtensionContext> {
    context(factory, Arc::new(JsonRpcServer::new()))
}
